//! State feed port: supplies the evaluation snapshot.

use crate::domain::context::EvalContext;
use crate::domain::error::FlowtraderError;

/// A source of market/account/strategy state snapshots. Each call produces a
/// fresh immutable [`EvalContext`]; the engine never evaluates against a
/// snapshot that a feed could mutate underneath it.
pub trait StateFeed {
    fn snapshot(&self) -> Result<EvalContext, FlowtraderError>;
}
