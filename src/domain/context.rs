//! Evaluation context: the immutable snapshot an expression tree is read
//! against.
//!
//! A context is assembled once per evaluation batch (from the state feed plus
//! the owning node's positions) and never mutated by the evaluator, so
//! independent trees can be evaluated in parallel against the same snapshot.

use crate::domain::expression::MarketField;
use crate::domain::position::Position;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One symbol's quote in the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Quote {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub ltp: f64,
}

impl Quote {
    pub fn field(&self, field: MarketField) -> f64 {
        match field {
            MarketField::Open => self.open,
            MarketField::High => self.high,
            MarketField::Low => self.low,
            MarketField::Close => self.close,
            MarketField::Volume => self.volume,
            MarketField::Ltp => self.ltp,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvalContext {
    pub quotes: HashMap<String, Quote>,
    pub live: HashMap<String, f64>,
    /// Keyed by (indicator name, symbol).
    pub indicators: HashMap<(String, String), f64>,
    pub metrics: HashMap<String, f64>,
    pub execution: HashMap<String, f64>,
    pub triggers: HashMap<String, f64>,
    /// Keyed by (node id, variable name).
    pub node_vars: HashMap<(String, String), f64>,
    pub globals: HashMap<String, f64>,
    /// The owning node's position set, attached per evaluation.
    pub positions: Vec<Position>,
    /// Snapshot clock for time functions.
    pub clock: NaiveDateTime,
}

impl EvalContext {
    pub fn at(clock: NaiveDateTime) -> Self {
        EvalContext {
            quotes: HashMap::new(),
            live: HashMap::new(),
            indicators: HashMap::new(),
            metrics: HashMap::new(),
            execution: HashMap::new(),
            triggers: HashMap::new(),
            node_vars: HashMap::new(),
            globals: HashMap::new(),
            positions: Vec::new(),
            clock,
        }
    }

    pub fn with_quote(mut self, symbol: impl Into<String>, quote: Quote) -> Self {
        self.quotes.insert(symbol.into(), quote);
        self
    }

    pub fn with_live(mut self, key: impl Into<String>, value: f64) -> Self {
        self.live.insert(key.into(), value);
        self
    }

    pub fn with_indicator(
        mut self,
        name: impl Into<String>,
        symbol: impl Into<String>,
        value: f64,
    ) -> Self {
        self.indicators.insert((name.into(), symbol.into()), value);
        self
    }

    pub fn with_metric(mut self, metric: impl Into<String>, value: f64) -> Self {
        self.metrics.insert(metric.into(), value);
        self
    }

    pub fn with_execution(mut self, key: impl Into<String>, value: f64) -> Self {
        self.execution.insert(key.into(), value);
        self
    }

    pub fn with_trigger(mut self, key: impl Into<String>, value: f64) -> Self {
        self.triggers.insert(key.into(), value);
        self
    }

    pub fn with_node_var(
        mut self,
        node_id: impl Into<String>,
        name: impl Into<String>,
        value: f64,
    ) -> Self {
        self.node_vars.insert((node_id.into(), name.into()), value);
        self
    }

    pub fn with_global(mut self, name: impl Into<String>, value: f64) -> Self {
        self.globals.insert(name.into(), value);
        self
    }

    /// Attach the owning node's position set, replacing whatever was there.
    pub fn with_positions(mut self, positions: Vec<Position>) -> Self {
        self.positions = positions;
        self
    }
}
