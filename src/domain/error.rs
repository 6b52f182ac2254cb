//! Domain error types.
//!
//! Two layers: [`EvalError`] covers expression evaluation and is attached to
//! the failing sub-expression rather than aborting the whole pass;
//! [`FlowtraderError`] is the top-level type everything else funnels into.

use crate::domain::graph::GraphInvariantViolation;

/// Errors produced while evaluating an expression tree.
///
/// These are local to the offending sub-expression: a parent composite that
/// depends on a failed child resolves to the same error instead of
/// substituting a default number.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    #[error("invalid expression shape: {reason}")]
    InvalidExpressionShape { reason: String },

    #[error("unknown operator: {symbol}")]
    UnknownOperator { symbol: String },

    #[error("division by zero")]
    DivisionByZero,

    #[error("modulo by zero")]
    ModuloByZero,

    #[error("empty operand set for {function}")]
    EmptyOperandSet { function: String },

    #[error("no open position with vpi {vpi}")]
    PositionNotFound { vpi: String },

    #[error("no data in snapshot for {key}")]
    MissingData { key: String },
}

/// Top-level error type for flowtrader.
#[derive(Debug, thiserror::Error)]
pub enum FlowtraderError {
    #[error("storage error: {reason}")]
    Storage { reason: String },

    #[error("storage query error: {reason}")]
    StorageQuery { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error("graph is invalid: {} violation(s)", violations.len())]
    GraphInvalid {
        violations: Vec<GraphInvariantViolation>,
    },

    #[error("mutation failed: {reason}")]
    MutationFailed { reason: String },

    #[error("re-entry limit of {max} reached on node {node_id}")]
    ReEntryLimitExceeded { node_id: String, max: usize },

    #[error("no node with id {node_id}")]
    NodeNotFound { node_id: String },

    #[error("no stored strategy with id {id}")]
    StrategyNotFound { id: String },

    #[error("serialization error: {reason}")]
    Serialization { reason: String },

    #[error("feed error: {reason}")]
    Feed { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for FlowtraderError {
    fn from(err: serde_json::Error) -> Self {
        FlowtraderError::Serialization {
            reason: err.to_string(),
        }
    }
}

impl From<&FlowtraderError> for std::process::ExitCode {
    fn from(err: &FlowtraderError) -> Self {
        let code: u8 = match err {
            FlowtraderError::Io(_) => 1,
            FlowtraderError::ConfigParse { .. }
            | FlowtraderError::ConfigMissing { .. }
            | FlowtraderError::ConfigInvalid { .. } => 2,
            FlowtraderError::Storage { .. }
            | FlowtraderError::StorageQuery { .. }
            | FlowtraderError::StrategyNotFound { .. } => 3,
            FlowtraderError::Eval(_) => 4,
            FlowtraderError::GraphInvalid { .. }
            | FlowtraderError::MutationFailed { .. }
            | FlowtraderError::NodeNotFound { .. }
            | FlowtraderError::ReEntryLimitExceeded { .. } => 5,
            FlowtraderError::Serialization { .. } | FlowtraderError::Feed { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::graph::GraphRule;

    #[test]
    fn eval_error_display() {
        let err = EvalError::UnknownOperator { symbol: "^".into() };
        assert_eq!(err.to_string(), "unknown operator: ^");

        let err = EvalError::PositionNotFound { vpi: "p3".into() };
        assert_eq!(err.to_string(), "no open position with vpi p3");
    }

    #[test]
    fn eval_error_is_comparable() {
        assert_eq!(EvalError::DivisionByZero, EvalError::DivisionByZero);
        assert_ne!(EvalError::DivisionByZero, EvalError::ModuloByZero);
    }

    #[test]
    fn graph_invalid_counts_violations() {
        let err = FlowtraderError::GraphInvalid {
            violations: vec![
                GraphInvariantViolation {
                    rule: GraphRule::SingleStart,
                    message: "no start node".into(),
                },
                GraphInvariantViolation {
                    rule: GraphRule::EdgeEndpointsExist,
                    message: "edge e-a-b references missing node a".into(),
                },
            ],
        };
        assert_eq!(err.to_string(), "graph is invalid: 2 violation(s)");
    }

    #[test]
    fn eval_error_wraps_transparently() {
        let err: FlowtraderError = EvalError::DivisionByZero.into();
        assert_eq!(err.to_string(), "division by zero");
    }

    #[test]
    fn exit_code_conversions_exist() {
        use std::process::ExitCode;
        let config = FlowtraderError::ConfigMissing {
            section: "engine".into(),
            key: "max_re_entries".into(),
        };
        let _: ExitCode = (&config).into();
        let _: ExitCode = (&FlowtraderError::Eval(EvalError::DivisionByZero)).into();
        let _: ExitCode = (&FlowtraderError::MutationFailed {
            reason: "duplicate node id".into(),
        })
            .into();
    }
}
