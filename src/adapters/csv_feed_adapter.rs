//! CSV state feed adapter.
//!
//! Loads one evaluation snapshot from a CSV file with the columns
//! `category,key,field,value`:
//!
//! ```text
//! category,key,field,value
//! market,NIFTY,ltp,22510.5
//! market,NIFTY,close,22480.0
//! live,available_margin,,40000
//! indicator,rsi,NIFTY,61.0
//! metric,net_pnl,,420.0
//! execution,last_fill_price,,22490.25
//! trigger,webhook_a,,1
//! node_var,entry-1,fills,2
//! global,risk_budget,,0.02
//! ```
//!
//! Every row is parsed strictly; a bad category, field, or value is a typed
//! feed error naming the offending row, not a skipped line.

use crate::domain::context::EvalContext;
use crate::domain::error::FlowtraderError;
use crate::ports::config_port::ConfigPort;
use crate::ports::feed_port::StateFeed;
use chrono::NaiveDateTime;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const CLOCK_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Deserialize)]
struct SnapshotRow {
    category: String,
    key: String,
    #[serde(default)]
    field: String,
    value: f64,
}

pub struct CsvFeedAdapter {
    path: PathBuf,
    clock: Option<NaiveDateTime>,
}

impl CsvFeedAdapter {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        CsvFeedAdapter {
            path: path.as_ref().to_path_buf(),
            clock: None,
        }
    }

    /// Pin the snapshot clock instead of reading the wall clock, for
    /// reproducible evaluation runs.
    pub fn with_clock(mut self, clock: NaiveDateTime) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, FlowtraderError> {
        let path = config
            .get_string("feed", "path")
            .ok_or_else(|| FlowtraderError::ConfigMissing {
                section: "feed".into(),
                key: "path".into(),
            })?;
        let mut adapter = CsvFeedAdapter::new(path);
        if let Some(raw) = config.get_string("feed", "clock") {
            let clock = NaiveDateTime::parse_from_str(&raw, CLOCK_FORMAT).map_err(|e| {
                FlowtraderError::ConfigInvalid {
                    section: "feed".into(),
                    key: "clock".into(),
                    reason: e.to_string(),
                }
            })?;
            adapter.clock = Some(clock);
        }
        Ok(adapter)
    }

    fn apply_row(ctx: &mut EvalContext, row: SnapshotRow) -> Result<(), FlowtraderError> {
        let SnapshotRow {
            category,
            key,
            field,
            value,
        } = row;
        match category.as_str() {
            "market" => {
                let quote = ctx.quotes.entry(key.clone()).or_default();
                match field.as_str() {
                    "open" => quote.open = value,
                    "high" => quote.high = value,
                    "low" => quote.low = value,
                    "close" => quote.close = value,
                    "volume" => quote.volume = value,
                    "ltp" => quote.ltp = value,
                    other => {
                        return Err(FlowtraderError::Feed {
                            reason: format!("unknown market field {other} for {key}"),
                        });
                    }
                }
            }
            "live" => {
                ctx.live.insert(key, value);
            }
            "indicator" => {
                ctx.indicators.insert((key, field), value);
            }
            "metric" => {
                ctx.metrics.insert(key, value);
            }
            "execution" => {
                ctx.execution.insert(key, value);
            }
            "trigger" => {
                ctx.triggers.insert(key, value);
            }
            "node_var" => {
                ctx.node_vars.insert((key, field), value);
            }
            "global" => {
                ctx.globals.insert(key, value);
            }
            other => {
                return Err(FlowtraderError::Feed {
                    reason: format!("unknown snapshot category {other}"),
                });
            }
        }
        Ok(())
    }
}

impl StateFeed for CsvFeedAdapter {
    fn snapshot(&self) -> Result<EvalContext, FlowtraderError> {
        let clock = self
            .clock
            .unwrap_or_else(|| chrono::Local::now().naive_local());
        let mut ctx = EvalContext::at(clock);

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(&self.path)
            .map_err(|e| FlowtraderError::Feed {
                reason: format!("{}: {e}", self.path.display()),
            })?;

        for (index, result) in reader.deserialize::<SnapshotRow>().enumerate() {
            let row = result.map_err(|e| FlowtraderError::Feed {
                reason: format!("row {}: {e}", index + 2),
            })?;
            Self::apply_row(&mut ctx, row)?;
        }

        Ok(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn clock() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 4)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap()
    }

    fn write_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{content}").unwrap();
        file
    }

    #[test]
    fn snapshot_loads_all_categories() {
        let file = write_csv(
            "category,key,field,value\n\
             market,NIFTY,ltp,22510.5\n\
             market,NIFTY,close,22480.0\n\
             live,available_margin,,40000\n\
             indicator,rsi,NIFTY,61.0\n\
             metric,net_pnl,,420.0\n\
             execution,last_fill_price,,22490.25\n\
             trigger,webhook_a,,1\n\
             node_var,entry-1,fills,2\n\
             global,risk_budget,,0.02\n",
        );
        let feed = CsvFeedAdapter::new(file.path()).with_clock(clock());
        let ctx = feed.snapshot().unwrap();

        assert_eq!(ctx.clock, clock());
        let quote = &ctx.quotes["NIFTY"];
        assert_eq!(quote.ltp, 22510.5);
        assert_eq!(quote.close, 22480.0);
        assert_eq!(ctx.live["available_margin"], 40000.0);
        assert_eq!(ctx.indicators[&("rsi".to_string(), "NIFTY".to_string())], 61.0);
        assert_eq!(ctx.metrics["net_pnl"], 420.0);
        assert_eq!(ctx.execution["last_fill_price"], 22490.25);
        assert_eq!(ctx.triggers["webhook_a"], 1.0);
        assert_eq!(
            ctx.node_vars[&("entry-1".to_string(), "fills".to_string())],
            2.0
        );
        assert_eq!(ctx.globals["risk_budget"], 0.02);
    }

    #[test]
    fn unknown_category_is_feed_error() {
        let file = write_csv("category,key,field,value\ntelemetry,x,,1\n");
        let feed = CsvFeedAdapter::new(file.path()).with_clock(clock());
        assert!(matches!(
            feed.snapshot(),
            Err(FlowtraderError::Feed { .. })
        ));
    }

    #[test]
    fn unknown_market_field_is_feed_error() {
        let file = write_csv("category,key,field,value\nmarket,NIFTY,vwap,1\n");
        let feed = CsvFeedAdapter::new(file.path()).with_clock(clock());
        let err = feed.snapshot().unwrap_err();
        assert!(err.to_string().contains("vwap"));
    }

    #[test]
    fn bad_value_names_the_row() {
        let file = write_csv("category,key,field,value\nlive,margin,,not_a_number\n");
        let feed = CsvFeedAdapter::new(file.path()).with_clock(clock());
        let err = feed.snapshot().unwrap_err();
        assert!(err.to_string().contains("row 2"));
    }

    #[test]
    fn missing_file_is_feed_error() {
        let feed = CsvFeedAdapter::new("/nonexistent/snapshot.csv");
        assert!(matches!(
            feed.snapshot(),
            Err(FlowtraderError::Feed { .. })
        ));
    }

    #[test]
    fn from_config_reads_path_and_clock() {
        use crate::adapters::file_config_adapter::FileConfigAdapter;
        let config = FileConfigAdapter::from_string(
            "[feed]\npath = snapshot.csv\nclock = 2024-06-04 09:30:00\n",
        )
        .unwrap();
        let feed = CsvFeedAdapter::from_config(&config).unwrap();
        assert_eq!(feed.clock, Some(clock()));

        let missing = FileConfigAdapter::from_string("[feed]\n").unwrap();
        assert!(CsvFeedAdapter::from_config(&missing).is_err());
    }
}
