#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use flowtrader::domain::context::{EvalContext, Quote};
use flowtrader::domain::error::FlowtraderError;
use flowtrader::domain::expression::{Expression, MarketField};
use flowtrader::domain::graph::{Node, NodeKind, StrategyGraph, DEFAULT_EDGE_TYPE};
use flowtrader::domain::position::{Position, Side};
use flowtrader::ports::store_port::{
    CurrentUserProvider, StrategyRecord, StrategyStore, StrategySummary,
};
use std::cell::RefCell;
use std::collections::HashMap;

/// In-memory strategy store keyed like the real adapters, for flows that do
/// not need a database.
pub struct MockStore {
    pub records: RefCell<HashMap<(String, String), StrategyRecord>>,
    pub fail_saves: bool,
}

impl MockStore {
    pub fn new() -> Self {
        Self {
            records: RefCell::new(HashMap::new()),
            fail_saves: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            records: RefCell::new(HashMap::new()),
            fail_saves: true,
        }
    }
}

impl StrategyStore for MockStore {
    fn save(&self, user_id: &str, record: &StrategyRecord) -> Result<(), FlowtraderError> {
        if self.fail_saves {
            return Err(FlowtraderError::Storage {
                reason: "mock store rejects saves".into(),
            });
        }
        self.records
            .borrow_mut()
            .insert((user_id.to_string(), record.id.clone()), record.clone());
        Ok(())
    }

    fn load(
        &self,
        user_id: &str,
        strategy_id: &str,
    ) -> Result<Option<StrategyRecord>, FlowtraderError> {
        Ok(self
            .records
            .borrow()
            .get(&(user_id.to_string(), strategy_id.to_string()))
            .cloned())
    }

    fn list(&self, user_id: &str) -> Result<Vec<StrategySummary>, FlowtraderError> {
        let mut summaries: Vec<StrategySummary> = self
            .records
            .borrow()
            .iter()
            .filter(|((uid, _), _)| uid == user_id)
            .map(|(_, record)| StrategySummary {
                id: record.id.clone(),
                created_at: record.created_at,
            })
            .collect();
        summaries.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(summaries)
    }

    fn delete(&self, user_id: &str, strategy_id: &str) -> Result<(), FlowtraderError> {
        let removed = self
            .records
            .borrow_mut()
            .remove(&(user_id.to_string(), strategy_id.to_string()));
        match removed {
            Some(_) => Ok(()),
            None => Err(FlowtraderError::StrategyNotFound {
                id: strategy_id.to_string(),
            }),
        }
    }
}

pub struct FixedUser(pub Option<String>);

impl CurrentUserProvider for FixedUser {
    fn current_user_id(&self) -> Option<String> {
        self.0.clone()
    }
}

pub fn trader() -> FixedUser {
    FixedUser(Some("trader-1".into()))
}

pub fn clock() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, 4)
        .unwrap()
        .and_hms_opt(9, 30, 0)
        .unwrap()
}

pub fn make_position(vpi: &str, quantity: f64, pnl: f64) -> Position {
    Position {
        vpi: vpi.to_string(),
        symbol: "NIFTY".to_string(),
        side: Side::Long,
        quantity,
        entry_price: 100.0,
        current_price: 100.0 + pnl / quantity.max(1.0),
        pnl,
    }
}

pub fn make_quote(ltp: f64) -> Quote {
    Quote {
        open: ltp - 10.0,
        high: ltp + 5.0,
        low: ltp - 15.0,
        close: ltp - 2.0,
        volume: 10_000.0,
        ltp,
    }
}

pub fn node_with_expression(id: &str, kind: NodeKind, expr: Expression) -> Node {
    let mut node = Node::new(id, kind);
    node.data.expression = Some(expr);
    node
}

/// start -> entry-1 -> exit-1, with a market condition on the entry node.
pub fn sample_graph() -> StrategyGraph {
    let mut graph = StrategyGraph::seeded("start");
    graph.nodes.push(node_with_expression(
        "entry-1",
        NodeKind::EntryAction,
        Expression::market("NIFTY", MarketField::Ltp),
    ));
    graph.nodes.push(Node::new("exit-1", NodeKind::Exit));
    graph.add_edge("start", "entry-1", DEFAULT_EDGE_TYPE).unwrap();
    graph.add_edge("entry-1", "exit-1", DEFAULT_EDGE_TYPE).unwrap();
    graph
}

pub fn sample_context() -> EvalContext {
    EvalContext::at(clock())
        .with_quote("NIFTY", make_quote(22_510.5))
        .with_live("available_margin", 40_000.0)
        .with_indicator("rsi", "NIFTY", 61.0)
        .with_metric("net_pnl", 420.0)
        .with_global("risk_budget", 0.02)
}
