//! Engine configuration: typed defaults plus per-field validation over a
//! [`ConfigPort`].

use crate::domain::error::FlowtraderError;
use crate::ports::config_port::ConfigPort;

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub max_re_entries: usize,
    pub history_limit: usize,
    pub start_node_id: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            max_re_entries: 1,
            history_limit: 100,
            start_node_id: "start".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, FlowtraderError> {
        validate_engine_config(config)?;
        let defaults = EngineConfig::default();
        Ok(EngineConfig {
            max_re_entries: config.get_int(
                "engine",
                "max_re_entries",
                defaults.max_re_entries as i64,
            ) as usize,
            history_limit: config.get_int("engine", "history_limit", defaults.history_limit as i64)
                as usize,
            start_node_id: config
                .get_string("engine", "start_node_id")
                .unwrap_or(defaults.start_node_id),
        })
    }
}

pub fn validate_engine_config(config: &dyn ConfigPort) -> Result<(), FlowtraderError> {
    validate_max_re_entries(config)?;
    validate_history_limit(config)?;
    Ok(())
}

fn validate_max_re_entries(config: &dyn ConfigPort) -> Result<(), FlowtraderError> {
    let value = config.get_int("engine", "max_re_entries", 1);
    if value < 1 {
        return Err(FlowtraderError::ConfigInvalid {
            section: "engine".to_string(),
            key: "max_re_entries".to_string(),
            reason: "max_re_entries must be at least 1".to_string(),
        });
    }
    Ok(())
}

fn validate_history_limit(config: &dyn ConfigPort) -> Result<(), FlowtraderError> {
    let value = config.get_int("engine", "history_limit", 100);
    if value < 1 {
        return Err(FlowtraderError::ConfigInvalid {
            section: "engine".to_string(),
            key: "history_limit".to_string(),
            reason: "history_limit must be at least 1".to_string(),
        });
    }
    Ok(())
}

/// Check the `[sqlite]` section used by the store adapter.
pub fn validate_store_config(config: &dyn ConfigPort) -> Result<(), FlowtraderError> {
    match config.get_string("sqlite", "path") {
        Some(path) if !path.trim().is_empty() => Ok(()),
        _ => Err(FlowtraderError::ConfigMissing {
            section: "sqlite".to_string(),
            key: "path".to_string(),
        }),
    }
}

/// Check the `[feed]` section used by the CSV snapshot adapter.
pub fn validate_feed_config(config: &dyn ConfigPort) -> Result<(), FlowtraderError> {
    match config.get_string("feed", "path") {
        Some(path) if !path.trim().is_empty() => Ok(()),
        _ => Err(FlowtraderError::ConfigMissing {
            section: "feed".to_string(),
            key: "path".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    fn config_from(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    #[test]
    fn defaults_apply_for_empty_config() {
        let config = config_from("[engine]\n");
        let engine = EngineConfig::from_config(&config).unwrap();
        assert_eq!(engine, EngineConfig::default());
    }

    #[test]
    fn explicit_values_override_defaults() {
        let config = config_from(
            "[engine]\nmax_re_entries = 3\nhistory_limit = 25\nstart_node_id = root\n",
        );
        let engine = EngineConfig::from_config(&config).unwrap();
        assert_eq!(engine.max_re_entries, 3);
        assert_eq!(engine.history_limit, 25);
        assert_eq!(engine.start_node_id, "root");
    }

    #[test]
    fn zero_max_re_entries_rejected() {
        let config = config_from("[engine]\nmax_re_entries = 0\n");
        let err = EngineConfig::from_config(&config).unwrap_err();
        assert!(matches!(
            err,
            FlowtraderError::ConfigInvalid { ref key, .. } if key == "max_re_entries"
        ));
    }

    #[test]
    fn zero_history_limit_rejected() {
        let config = config_from("[engine]\nhistory_limit = 0\n");
        assert!(EngineConfig::from_config(&config).is_err());
    }

    #[test]
    fn store_config_requires_path() {
        let config = config_from("[sqlite]\npath = strategies.db\n");
        assert!(validate_store_config(&config).is_ok());

        let config = config_from("[sqlite]\n");
        assert!(matches!(
            validate_store_config(&config),
            Err(FlowtraderError::ConfigMissing { ref key, .. }) if key == "path"
        ));
    }

    #[test]
    fn feed_config_requires_path() {
        let config = config_from("[feed]\npath = snapshot.csv\n");
        assert!(validate_feed_config(&config).is_ok());
        assert!(validate_feed_config(&config_from("[feed]\n")).is_err());
    }
}
