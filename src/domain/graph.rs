//! Strategy graph model: typed nodes, control-flow edges, structural
//! validation.
//!
//! Edge ids are derived deterministically as `e-{source}-{target}`, so
//! creating the same connection twice yields the same logical edge and
//! [`StrategyGraph::add_edge`] is idempotent. Validation reports one
//! [`GraphInvariantViolation`] per broken rule instance so an editor can
//! pinpoint what to fix.

use crate::domain::error::FlowtraderError;
use crate::domain::expression::Expression;
use crate::domain::position::Position;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

pub const DEFAULT_EDGE_TYPE: &str = "default";

/// The fixed set of node kinds a strategy graph is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
    Start,
    EntryAction,
    Exit,
    Modify,
    ReEntry,
    SquareOff,
}

/// Layout coordinate. Carried through serialization for the editor UI,
/// ignored by evaluation and validation.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LayoutPoint {
    pub x: f64,
    pub y: f64,
}

fn default_max_re_entries() -> usize {
    1
}

/// Kind-specific node payload: an optional condition expression and the
/// position set the node has opened so far.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeData {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub expression: Option<Expression>,
    #[serde(default)]
    pub positions: Vec<Position>,
    #[serde(default = "default_max_re_entries")]
    pub max_re_entries: usize,
}

impl Default for NodeData {
    fn default() -> Self {
        NodeData {
            label: None,
            expression: None,
            positions: Vec::new(),
            max_re_entries: default_max_re_entries(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(default)]
    pub position: LayoutPoint,
    #[serde(default)]
    pub data: NodeData,
}

impl Node {
    pub fn new(id: impl Into<String>, kind: NodeKind) -> Self {
        Node {
            id: id.into(),
            kind,
            position: LayoutPoint::default(),
            data: NodeData::default(),
        }
    }

    /// Append a re-entry position, enforcing the node's cap and per-node vpi
    /// uniqueness. On failure the position set is left unchanged.
    pub fn record_re_entry(&mut self, position: Position) -> Result<(), FlowtraderError> {
        if self.data.positions.len() >= self.data.max_re_entries {
            return Err(FlowtraderError::ReEntryLimitExceeded {
                node_id: self.id.clone(),
                max: self.data.max_re_entries,
            });
        }
        if self.data.positions.iter().any(|p| p.vpi == position.vpi) {
            return Err(FlowtraderError::MutationFailed {
                reason: format!("duplicate vpi {} on node {}", position.vpi, self.id),
            });
        }
        self.data.positions.push(position);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(rename = "type", default = "default_edge_type")]
    pub edge_type: String,
}

fn default_edge_type() -> String {
    DEFAULT_EDGE_TYPE.to_string()
}

/// Build an edge with the deterministic id `e-{source}-{target}`.
pub fn create_edge(source: &str, target: &str, edge_type: &str) -> Edge {
    Edge {
        id: format!("e-{source}-{target}"),
        source: source.to_string(),
        target: target.to_string(),
        edge_type: edge_type.to_string(),
    }
}

/// Structural rules checked by [`StrategyGraph::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphRule {
    SingleStart,
    EdgeEndpointsExist,
    UniqueNodeIds,
    UniqueEdgeIds,
}

impl fmt::Display for GraphRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GraphRule::SingleStart => "single-start",
            GraphRule::EdgeEndpointsExist => "edge-endpoints-exist",
            GraphRule::UniqueNodeIds => "unique-node-ids",
            GraphRule::UniqueEdgeIds => "unique-edge-ids",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphInvariantViolation {
    pub rule: GraphRule,
    pub message: String,
}

impl fmt::Display for GraphInvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.rule, self.message)
    }
}

fn violation(rule: GraphRule, message: String) -> GraphInvariantViolation {
    GraphInvariantViolation { rule, message }
}

/// The aggregate node/edge state of one strategy. Node order is insertion
/// order and only matters for serialization determinism.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StrategyGraph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl StrategyGraph {
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        StrategyGraph { nodes, edges }
    }

    /// A minimal known-good graph: a single start node.
    pub fn seeded(start_id: &str) -> Self {
        StrategyGraph {
            nodes: vec![Node::new(start_id, NodeKind::Start)],
            edges: Vec::new(),
        }
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    pub fn edge(&self, id: &str) -> Option<&Edge> {
        self.edges.iter().find(|e| e.id == id)
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.node(id).is_some()
    }

    /// Add an edge between two existing nodes. Re-adding an edge with the
    /// same derived id is a no-op; the return value reports whether the edge
    /// set changed.
    pub fn add_edge(
        &mut self,
        source: &str,
        target: &str,
        edge_type: &str,
    ) -> Result<bool, FlowtraderError> {
        if !self.contains_node(source) {
            return Err(FlowtraderError::NodeNotFound {
                node_id: source.to_string(),
            });
        }
        if !self.contains_node(target) {
            return Err(FlowtraderError::NodeNotFound {
                node_id: target.to_string(),
            });
        }
        let edge = create_edge(source, target, edge_type);
        if self.edges.iter().any(|e| e.id == edge.id) {
            return Ok(false);
        }
        self.edges.push(edge);
        Ok(true)
    }

    /// Check every structural invariant, returning one violation per broken
    /// rule instance. An empty list means the graph may be persisted.
    pub fn validate(&self) -> Vec<GraphInvariantViolation> {
        let mut violations = Vec::new();

        let start_count = self
            .nodes
            .iter()
            .filter(|n| n.kind == NodeKind::Start)
            .count();
        if start_count != 1 {
            violations.push(violation(
                GraphRule::SingleStart,
                format!("expected exactly one start node, found {start_count}"),
            ));
        }

        let mut seen_nodes: HashSet<&str> = HashSet::new();
        for node in &self.nodes {
            if !seen_nodes.insert(node.id.as_str()) {
                violations.push(violation(
                    GraphRule::UniqueNodeIds,
                    format!("duplicate node id {}", node.id),
                ));
            }
        }

        let mut seen_edges: HashSet<&str> = HashSet::new();
        for edge in &self.edges {
            if !seen_edges.insert(edge.id.as_str()) {
                violations.push(violation(
                    GraphRule::UniqueEdgeIds,
                    format!("duplicate edge id {}", edge.id),
                ));
            }
            if !self.contains_node(&edge.source) {
                violations.push(violation(
                    GraphRule::EdgeEndpointsExist,
                    format!("edge {} references missing source {}", edge.id, edge.source),
                ));
            }
            if !self.contains_node(&edge.target) {
                violations.push(violation(
                    GraphRule::EdgeEndpointsExist,
                    format!("edge {} references missing target {}", edge.id, edge.target),
                ));
            }
        }

        violations
    }
}
