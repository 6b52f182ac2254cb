//! Current-user capability implementations.

use crate::ports::config_port::ConfigPort;
use crate::ports::store_port::CurrentUserProvider;

/// A fixed user id, resolved once at construction. Used by the CLI, where the
/// acting user comes from `[store] user` in the config file.
pub struct StaticUserProvider {
    user_id: Option<String>,
}

impl StaticUserProvider {
    pub fn new(user_id: impl Into<String>) -> Self {
        StaticUserProvider {
            user_id: Some(user_id.into()),
        }
    }

    pub fn anonymous() -> Self {
        StaticUserProvider { user_id: None }
    }

    pub fn from_config(config: &dyn ConfigPort) -> Self {
        match config.get_string("store", "user") {
            Some(user) if !user.trim().is_empty() => StaticUserProvider::new(user),
            _ => StaticUserProvider::anonymous(),
        }
    }
}

impl CurrentUserProvider for StaticUserProvider {
    fn current_user_id(&self) -> Option<String> {
        self.user_id.clone()
    }
}
