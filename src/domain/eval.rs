//! Expression tree evaluation.
//!
//! The sole entry point for condition/value computation: an exhaustive match
//! over every [`Expression`] variant, reducing composites recursively through
//! the operation evaluator and resolving `position_data` through the VPI
//! resolver. A key absent from the snapshot is a typed
//! [`EvalError::MissingData`], never a default number; a failed child makes
//! the parent composite fail with the same error.

use crate::domain::context::EvalContext;
use crate::domain::error::EvalError;
use crate::domain::expression::{Expression, TimeFn};
use crate::domain::operation::{self, Combinator};
use crate::domain::resolver;
use chrono::{Datelike, Timelike};

pub fn evaluate(expr: &Expression, ctx: &EvalContext) -> Result<f64, EvalError> {
    match expr {
        Expression::MarketData { symbol, field } => ctx
            .quotes
            .get(symbol)
            .map(|q| q.field(*field))
            .ok_or_else(|| missing(format!("market_data:{symbol}"))),

        Expression::LiveData { key } => lookup(&ctx.live, key, || format!("live_data:{key}")),

        Expression::Indicator { name, symbol } => ctx
            .indicators
            .get(&(name.clone(), symbol.clone()))
            .copied()
            .ok_or_else(|| missing(format!("indicator:{name}:{symbol}"))),

        Expression::Constant { value } => Ok(*value),

        Expression::TimeFunction { function } => Ok(evaluate_time_fn(*function, ctx)),

        Expression::PositionData { field, vpi } => resolver::resolve(*field, vpi, &ctx.positions),

        Expression::StrategyMetric { metric } => {
            lookup(&ctx.metrics, metric, || format!("strategy_metric:{metric}"))
        }

        Expression::ExecutionData { key } => {
            lookup(&ctx.execution, key, || format!("execution_data:{key}"))
        }

        Expression::ExternalTrigger { key } => {
            lookup(&ctx.triggers, key, || format!("external_trigger:{key}"))
        }

        Expression::Composite { op, operands } => {
            let mut values = Vec::with_capacity(operands.len());
            for operand in operands {
                values.push(evaluate(operand, ctx)?);
            }
            match op {
                Combinator::Op(op) => operation::fold_operation(&values, *op),
                Combinator::Fn(f) => operation::evaluate_function(&values, *f),
            }
        }

        Expression::NodeVariable { node_id, name } => ctx
            .node_vars
            .get(&(node_id.clone(), name.clone()))
            .copied()
            .ok_or_else(|| missing(format!("node_variable:{node_id}:{name}"))),

        Expression::GlobalVariable { name } => {
            lookup(&ctx.globals, name, || format!("global_variable:{name}"))
        }
    }
}

fn lookup(
    map: &std::collections::HashMap<String, f64>,
    key: &str,
    describe: impl FnOnce() -> String,
) -> Result<f64, EvalError> {
    map.get(key).copied().ok_or_else(|| missing(describe()))
}

fn missing(key: String) -> EvalError {
    EvalError::MissingData { key }
}

fn evaluate_time_fn(function: TimeFn, ctx: &EvalContext) -> f64 {
    match function {
        TimeFn::HourOfDay => ctx.clock.hour() as f64,
        TimeFn::MinuteOfHour => ctx.clock.minute() as f64,
        TimeFn::DayOfWeek => ctx.clock.weekday().num_days_from_monday() as f64,
        TimeFn::SecondsSinceMidnight => ctx.clock.num_seconds_from_midnight() as f64,
    }
}
