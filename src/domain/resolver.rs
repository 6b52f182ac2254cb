//! Virtual position identifier (VPI) resolution.
//!
//! A `position_data` expression names one position in the owning node's set,
//! or the sentinel [`ANY_VPI`] for all of them. The aggregation rule for the
//! sentinel is fixed per field and used everywhere `_any` appears:
//!
//! - `pnl`, `quantity`: **sum** across open positions
//! - `entry_price`, `current_price`: **last-opened** position's value
//!
//! Resolution never mutates the position set.

use crate::domain::error::EvalError;
use crate::domain::graph::StrategyGraph;
use crate::domain::position::{Position, PositionField};

/// Unfiltered sentinel: aggregate across every position open on the node.
pub const ANY_VPI: &str = "_any";

/// Resolve a `position_data` reference against the owning node's current
/// position set and extract `field`.
///
/// A concrete vpi must match exactly one position; no match (for example a
/// position that already closed) is [`EvalError::PositionNotFound`], never a
/// default value. The sentinel over an empty set is also `PositionNotFound`:
/// with nothing open the reference is not yet satisfiable, and a silent zero
/// would let pnl comparisons fire spuriously.
pub fn resolve(field: PositionField, vpi: &str, positions: &[Position]) -> Result<f64, EvalError> {
    if vpi == ANY_VPI {
        return aggregate(field, positions);
    }

    positions
        .iter()
        .find(|p| p.vpi == vpi)
        .map(|p| field.extract(p))
        .ok_or_else(|| EvalError::PositionNotFound {
            vpi: vpi.to_string(),
        })
}

fn aggregate(field: PositionField, positions: &[Position]) -> Result<f64, EvalError> {
    let last = positions
        .last()
        .ok_or_else(|| EvalError::PositionNotFound {
            vpi: ANY_VPI.to_string(),
        })?;
    let value = match field {
        PositionField::Pnl | PositionField::Quantity => {
            positions.iter().map(|p| field.extract(p)).sum()
        }
        PositionField::EntryPrice | PositionField::CurrentPrice => field.extract(last),
    };
    Ok(value)
}

/// Enumerate the distinct non-empty vpi values across all nodes carrying
/// positions, in first-appearance order (node order, then position order),
/// for selection UIs.
pub fn vpi_options(graph: &StrategyGraph) -> Vec<String> {
    let mut seen = Vec::new();
    for node in &graph.nodes {
        for position in &node.data.positions {
            if position.vpi.is_empty() {
                continue;
            }
            if !seen.iter().any(|v| v == &position.vpi) {
                seen.push(position.vpi.clone());
            }
        }
    }
    seen
}
