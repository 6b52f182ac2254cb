//! Persistence sink port.
//!
//! The engine treats storage as a key-value store of serialized graphs keyed
//! by `(user_id, strategy_id)`; it does not depend on the transport. The
//! current user is an injected capability ([`CurrentUserProvider`]), not
//! ambient global state.

use crate::domain::error::FlowtraderError;
use crate::domain::graph::StrategyGraph;
use chrono::NaiveDateTime;

/// One persisted strategy: the `(nodes, edges)` pair plus metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyRecord {
    pub id: String,
    pub created_at: NaiveDateTime,
    pub graph: StrategyGraph,
}

/// Per-user index entry returned by [`StrategyStore::list`].
#[derive(Debug, Clone, PartialEq)]
pub struct StrategySummary {
    pub id: String,
    pub created_at: NaiveDateTime,
}

pub trait CurrentUserProvider {
    fn current_user_id(&self) -> Option<String>;
}

pub trait StrategyStore {
    fn save(&self, user_id: &str, record: &StrategyRecord) -> Result<(), FlowtraderError>;

    fn load(
        &self,
        user_id: &str,
        strategy_id: &str,
    ) -> Result<Option<StrategyRecord>, FlowtraderError>;

    fn list(&self, user_id: &str) -> Result<Vec<StrategySummary>, FlowtraderError>;

    fn delete(&self, user_id: &str, strategy_id: &str) -> Result<(), FlowtraderError>;
}
