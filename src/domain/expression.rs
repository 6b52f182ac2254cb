//! Typed expression model.
//!
//! An [`Expression`] is a closed sum type, one variant per data source a node
//! condition can read, plus a nested composite. The serde `type` tag carries
//! the variant name, so an unknown tag is rejected at deserialization instead
//! of falling through to a default branch. Shape problems that serde cannot
//! see (blank symbols, bad composite arity) are caught by [`Expression::validate`].

use crate::domain::error::EvalError;
use crate::domain::operation::Combinator;
use crate::domain::position::PositionField;
use serde::{Deserialize, Serialize};

/// Quote field selector for `market_data`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketField {
    Open,
    High,
    Low,
    Close,
    Volume,
    Ltp,
}

/// Clock-derived value for `time_function`, read from the snapshot clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeFn {
    HourOfDay,
    MinuteOfHour,
    /// Monday = 0 .. Sunday = 6.
    DayOfWeek,
    SecondsSinceMidnight,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Expression {
    MarketData {
        symbol: String,
        field: MarketField,
    },
    LiveData {
        key: String,
    },
    Indicator {
        name: String,
        symbol: String,
    },
    Constant {
        value: f64,
    },
    TimeFunction {
        function: TimeFn,
    },
    PositionData {
        field: PositionField,
        vpi: String,
    },
    StrategyMetric {
        metric: String,
    },
    ExecutionData {
        key: String,
    },
    ExternalTrigger {
        key: String,
    },
    #[serde(rename = "expression")]
    Composite {
        op: Combinator,
        operands: Vec<Expression>,
    },
    NodeVariable {
        node_id: String,
        name: String,
    },
    GlobalVariable {
        name: String,
    },
}

impl Expression {
    pub fn constant(value: f64) -> Self {
        Expression::Constant { value }
    }

    pub fn market(symbol: impl Into<String>, field: MarketField) -> Self {
        Expression::MarketData {
            symbol: symbol.into(),
            field,
        }
    }

    pub fn position(field: PositionField, vpi: impl Into<String>) -> Self {
        Expression::PositionData {
            field,
            vpi: vpi.into(),
        }
    }

    pub fn composite(op: Combinator, operands: Vec<Expression>) -> Self {
        Expression::Composite { op, operands }
    }

    /// Check that every required field of the declared variant is populated,
    /// recursing into composite operands.
    pub fn validate(&self) -> Result<(), EvalError> {
        match self {
            Expression::MarketData { symbol, .. } => {
                require_non_blank(symbol, "market_data.symbol")
            }
            Expression::LiveData { key } => require_non_blank(key, "live_data.key"),
            Expression::Indicator { name, symbol } => {
                require_non_blank(name, "indicator.name")?;
                require_non_blank(symbol, "indicator.symbol")
            }
            Expression::Constant { value } => {
                if value.is_finite() {
                    Ok(())
                } else {
                    Err(shape_error("constant.value must be finite"))
                }
            }
            Expression::TimeFunction { .. } => Ok(()),
            Expression::PositionData { vpi, .. } => require_non_blank(vpi, "position_data.vpi"),
            Expression::StrategyMetric { metric } => {
                require_non_blank(metric, "strategy_metric.metric")
            }
            Expression::ExecutionData { key } => require_non_blank(key, "execution_data.key"),
            Expression::ExternalTrigger { key } => require_non_blank(key, "external_trigger.key"),
            Expression::Composite { operands, .. } => {
                for operand in operands {
                    operand.validate()?;
                }
                Ok(())
            }
            Expression::NodeVariable { node_id, name } => {
                require_non_blank(node_id, "node_variable.node_id")?;
                require_non_blank(name, "node_variable.name")
            }
            Expression::GlobalVariable { name } => require_non_blank(name, "global_variable.name"),
        }
    }
}

fn require_non_blank(value: &str, field: &str) -> Result<(), EvalError> {
    if value.trim().is_empty() {
        Err(shape_error(&format!("{field} must not be blank")))
    } else {
        Ok(())
    }
}

fn shape_error(reason: &str) -> EvalError {
    EvalError::InvalidExpressionShape {
        reason: reason.to_string(),
    }
}
