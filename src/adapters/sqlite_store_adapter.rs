//! SQLite strategy store adapter.
//!
//! Strategies are rows keyed by `(user_id, id)`; the graph itself is stored
//! as a JSON document column, the same representation `import`/`export` use.

use crate::domain::error::FlowtraderError;
use crate::domain::graph::StrategyGraph;
use crate::ports::config_port::ConfigPort;
use crate::ports::store_port::{StrategyRecord, StrategyStore, StrategySummary};
use chrono::NaiveDateTime;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct SqliteStoreAdapter {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteStoreAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, FlowtraderError> {
        let db_path =
            config
                .get_string("sqlite", "path")
                .ok_or_else(|| FlowtraderError::ConfigMissing {
                    section: "sqlite".into(),
                    key: "path".into(),
                })?;

        let pool_size = config.get_int("sqlite", "pool_size", 4) as u32;

        let manager = SqliteConnectionManager::file(&db_path);
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(|e: r2d2::Error| FlowtraderError::Storage {
                reason: e.to_string(),
            })?;

        let adapter = Self { pool };
        adapter.initialize_schema()?;
        Ok(adapter)
    }

    pub fn in_memory() -> Result<Self, FlowtraderError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e: r2d2::Error| FlowtraderError::Storage {
                reason: e.to_string(),
            })?;

        let adapter = Self { pool };
        adapter.initialize_schema()?;
        Ok(adapter)
    }

    pub fn initialize_schema(&self) -> Result<(), FlowtraderError> {
        let conn = self.conn()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS strategies (
                user_id TEXT NOT NULL,
                id TEXT NOT NULL,
                created_at TEXT NOT NULL,
                graph TEXT NOT NULL,
                PRIMARY KEY (user_id, id)
            );
            CREATE INDEX IF NOT EXISTS idx_strategies_user ON strategies(user_id);",
        )
        .map_err(|e: rusqlite::Error| FlowtraderError::StorageQuery {
            reason: e.to_string(),
        })?;
        Ok(())
    }

    fn conn(
        &self,
    ) -> Result<r2d2::PooledConnection<SqliteConnectionManager>, FlowtraderError> {
        self.pool
            .get()
            .map_err(|e: r2d2::Error| FlowtraderError::Storage {
                reason: e.to_string(),
            })
    }
}

fn query_error(e: rusqlite::Error) -> FlowtraderError {
    FlowtraderError::StorageQuery {
        reason: e.to_string(),
    }
}

fn parse_datetime(raw: &str) -> Result<NaiveDateTime, FlowtraderError> {
    NaiveDateTime::parse_from_str(raw, DATETIME_FORMAT).map_err(|e| {
        FlowtraderError::StorageQuery {
            reason: format!("bad created_at {raw}: {e}"),
        }
    })
}

impl StrategyStore for SqliteStoreAdapter {
    fn save(&self, user_id: &str, record: &StrategyRecord) -> Result<(), FlowtraderError> {
        let graph_json = serde_json::to_string(&record.graph)?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO strategies (user_id, id, created_at, graph)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                user_id,
                record.id,
                record.created_at.format(DATETIME_FORMAT).to_string(),
                graph_json
            ],
        )
        .map_err(query_error)?;
        Ok(())
    }

    fn load(
        &self,
        user_id: &str,
        strategy_id: &str,
    ) -> Result<Option<StrategyRecord>, FlowtraderError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT created_at, graph FROM strategies
                 WHERE user_id = ?1 AND id = ?2",
            )
            .map_err(query_error)?;

        let mut rows = stmt
            .query_map(params![user_id, strategy_id], |row| {
                let created_at: String = row.get(0)?;
                let graph: String = row.get(1)?;
                Ok((created_at, graph))
            })
            .map_err(query_error)?;

        match rows.next() {
            None => Ok(None),
            Some(row) => {
                let (created_at_raw, graph_json) = row.map_err(query_error)?;
                let graph: StrategyGraph = serde_json::from_str(&graph_json)?;
                Ok(Some(StrategyRecord {
                    id: strategy_id.to_string(),
                    created_at: parse_datetime(&created_at_raw)?,
                    graph,
                }))
            }
        }
    }

    fn list(&self, user_id: &str) -> Result<Vec<StrategySummary>, FlowtraderError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, created_at FROM strategies
                 WHERE user_id = ?1
                 ORDER BY created_at ASC, id ASC",
            )
            .map_err(query_error)?;

        let rows = stmt
            .query_map(params![user_id], |row| {
                let id: String = row.get(0)?;
                let created_at: String = row.get(1)?;
                Ok((id, created_at))
            })
            .map_err(query_error)?;

        let mut summaries = Vec::new();
        for row in rows {
            let (id, created_at_raw) = row.map_err(query_error)?;
            summaries.push(StrategySummary {
                id,
                created_at: parse_datetime(&created_at_raw)?,
            });
        }
        Ok(summaries)
    }

    fn delete(&self, user_id: &str, strategy_id: &str) -> Result<(), FlowtraderError> {
        let conn = self.conn()?;
        let deleted = conn
            .execute(
                "DELETE FROM strategies WHERE user_id = ?1 AND id = ?2",
                params![user_id, strategy_id],
            )
            .map_err(query_error)?;
        if deleted == 0 {
            return Err(FlowtraderError::StrategyNotFound {
                id: strategy_id.to_string(),
            });
        }
        Ok(())
    }
}
