//! Graph edit & history coordinator.
//!
//! [`GraphEditor`] exclusively owns the live [`StrategyGraph`] and its
//! history. Mutations are applied to a working copy and committed only on
//! success, so a failed edit leaves the graph exactly as it was. History is a
//! bounded snapshot vector with a cursor; undo/redo step the cursor and
//! stepping past either end is a no-op. Requiring `&mut self` for every
//! mutation is the single-writer lock: concurrent edits against one graph
//! cannot compile, while read-only evaluation works on context snapshots.

use crate::domain::context::EvalContext;
use crate::domain::error::FlowtraderError;
use crate::domain::eval;
use crate::domain::expression::Expression;
use crate::domain::graph::{Node, StrategyGraph};
use crate::domain::position::Position;
use crate::ports::store_port::{CurrentUserProvider, StrategyRecord, StrategyStore};

pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Advisory status for observers (a UI progress indicator); not a
/// concurrency primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditStatus {
    #[default]
    Idle,
    Saving,
    Resetting,
    Importing,
}

/// A structural change to the graph. Multi-object changes (node removal with
/// its touching edges) are applied atomically.
#[derive(Debug, Clone)]
pub enum GraphMutation {
    AddNode(Node),
    RemoveNode {
        node_id: String,
    },
    AddEdge {
        source: String,
        target: String,
        edge_type: String,
    },
    RemoveEdge {
        edge_id: String,
    },
    SetExpression {
        node_id: String,
        expression: Option<Expression>,
    },
    RecordReEntry {
        node_id: String,
        position: Position,
    },
}

pub struct GraphEditor {
    graph: StrategyGraph,
    history: Vec<StrategyGraph>,
    cursor: usize,
    history_limit: usize,
    status: EditStatus,
    current_strategy: Option<String>,
}

impl GraphEditor {
    pub fn new(initial: StrategyGraph, history_limit: usize) -> Self {
        let history_limit = history_limit.max(1);
        GraphEditor {
            history: vec![initial.clone()],
            graph: initial,
            cursor: 0,
            history_limit,
            status: EditStatus::Idle,
            current_strategy: None,
        }
    }

    pub fn seeded(start_id: &str) -> Self {
        GraphEditor::new(StrategyGraph::seeded(start_id), DEFAULT_HISTORY_LIMIT)
    }

    pub fn graph(&self) -> &StrategyGraph {
        &self.graph
    }

    pub fn status(&self) -> EditStatus {
        self.status
    }

    pub fn current_strategy(&self) -> Option<&str> {
        self.current_strategy.as_deref()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.history.len()
    }

    /// Apply one mutation atomically. Returns whether the graph changed;
    /// idempotent no-ops (re-adding an existing edge) succeed without
    /// recording a history entry. On any error the live graph is untouched.
    pub fn apply(&mut self, mutation: GraphMutation) -> Result<bool, FlowtraderError> {
        let mut working = self.graph.clone();
        let changed = apply_mutation(&mut working, mutation)?;
        if changed {
            self.commit(working);
        }
        Ok(changed)
    }

    /// Replace everything with `initial_nodes`, clear edges and history, and
    /// reseed history with the reset snapshot as entry zero. Also forgets the
    /// persisted current-strategy pointer. This is the canonical way back to
    /// a known-good graph.
    pub fn reset(&mut self, initial_nodes: Vec<Node>) {
        self.status = EditStatus::Resetting;
        self.graph = StrategyGraph::new(initial_nodes, Vec::new());
        self.history = vec![self.graph.clone()];
        self.cursor = 0;
        self.current_strategy = None;
        self.status = EditStatus::Idle;
    }

    /// Step back one history entry. Undoing past the oldest entry is a
    /// no-op; the return value reports whether anything moved.
    pub fn undo(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        self.graph = self.history[self.cursor].clone();
        true
    }

    /// Step forward one history entry; no-op past the newest.
    pub fn redo(&mut self) -> bool {
        if self.cursor + 1 >= self.history.len() {
            return false;
        }
        self.cursor += 1;
        self.graph = self.history[self.cursor].clone();
        true
    }

    /// Parse and validate an external graph representation, installing it as
    /// a normal history-recorded edit. On a validation failure the current
    /// graph is left untouched and the violation list is returned.
    pub fn import(&mut self, serialized: &str) -> Result<(), FlowtraderError> {
        self.status = EditStatus::Importing;
        let result = self.import_inner(serialized);
        self.status = EditStatus::Idle;
        result
    }

    fn import_inner(&mut self, serialized: &str) -> Result<(), FlowtraderError> {
        let graph: StrategyGraph = serde_json::from_str(serialized)?;
        let violations = graph.validate();
        if !violations.is_empty() {
            return Err(FlowtraderError::GraphInvalid { violations });
        }
        for node in &graph.nodes {
            if let Some(expr) = &node.data.expression {
                expr.validate()?;
            }
        }
        self.commit(graph);
        Ok(())
    }

    /// Serialize the current `(nodes, edges)` pair.
    pub fn export(&self) -> Result<String, FlowtraderError> {
        Ok(serde_json::to_string_pretty(&self.graph)?)
    }

    /// Validate and persist the current graph through the store, keyed by the
    /// injected user. Sets the current-strategy pointer on success.
    pub fn save(
        &mut self,
        store: &dyn StrategyStore,
        users: &dyn CurrentUserProvider,
        strategy_id: &str,
    ) -> Result<(), FlowtraderError> {
        self.status = EditStatus::Saving;
        let result = self.save_inner(store, users, strategy_id);
        self.status = EditStatus::Idle;
        result
    }

    fn save_inner(
        &mut self,
        store: &dyn StrategyStore,
        users: &dyn CurrentUserProvider,
        strategy_id: &str,
    ) -> Result<(), FlowtraderError> {
        let violations = self.graph.validate();
        if !violations.is_empty() {
            return Err(FlowtraderError::GraphInvalid { violations });
        }
        let user_id = users.current_user_id().ok_or(FlowtraderError::Storage {
            reason: "no current user".to_string(),
        })?;
        let record = StrategyRecord {
            id: strategy_id.to_string(),
            created_at: chrono::Local::now().naive_local(),
            graph: self.graph.clone(),
        };
        store.save(&user_id, &record)?;
        self.current_strategy = Some(strategy_id.to_string());
        Ok(())
    }

    /// Evaluate the expression attached to one node against a snapshot,
    /// attaching that node's position set to the context first.
    pub fn evaluate_node(
        &self,
        node_id: &str,
        ctx: &EvalContext,
    ) -> Result<f64, FlowtraderError> {
        let node = self
            .graph
            .node(node_id)
            .ok_or_else(|| FlowtraderError::NodeNotFound {
                node_id: node_id.to_string(),
            })?;
        let expr = node
            .data
            .expression
            .as_ref()
            .ok_or_else(|| FlowtraderError::MutationFailed {
                reason: format!("node {node_id} carries no expression"),
            })?;
        let ctx = ctx.clone().with_positions(node.data.positions.clone());
        Ok(eval::evaluate(expr, &ctx)?)
    }

    fn commit(&mut self, next: StrategyGraph) {
        self.history.truncate(self.cursor + 1);
        self.history.push(next.clone());
        self.cursor += 1;
        while self.history.len() > self.history_limit {
            self.history.remove(0);
            self.cursor -= 1;
        }
        self.graph = next;
    }
}

fn apply_mutation(
    graph: &mut StrategyGraph,
    mutation: GraphMutation,
) -> Result<bool, FlowtraderError> {
    match mutation {
        GraphMutation::AddNode(node) => {
            if graph.contains_node(&node.id) {
                return Err(FlowtraderError::MutationFailed {
                    reason: format!("duplicate node id {}", node.id),
                });
            }
            if let Some(expr) = &node.data.expression {
                expr.validate()?;
            }
            graph.nodes.push(node);
            Ok(true)
        }
        GraphMutation::RemoveNode { node_id } => {
            if !graph.contains_node(&node_id) {
                return Err(FlowtraderError::NodeNotFound { node_id });
            }
            graph.nodes.retain(|n| n.id != node_id);
            graph
                .edges
                .retain(|e| e.source != node_id && e.target != node_id);
            Ok(true)
        }
        GraphMutation::AddEdge {
            source,
            target,
            edge_type,
        } => graph.add_edge(&source, &target, &edge_type),
        GraphMutation::RemoveEdge { edge_id } => {
            if graph.edge(&edge_id).is_none() {
                return Err(FlowtraderError::MutationFailed {
                    reason: format!("no edge with id {edge_id}"),
                });
            }
            graph.edges.retain(|e| e.id != edge_id);
            Ok(true)
        }
        GraphMutation::SetExpression {
            node_id,
            expression,
        } => {
            if let Some(expr) = &expression {
                expr.validate()?;
            }
            let node = graph
                .node_mut(&node_id)
                .ok_or(FlowtraderError::NodeNotFound { node_id })?;
            node.data.expression = expression;
            Ok(true)
        }
        GraphMutation::RecordReEntry { node_id, position } => {
            let node = graph
                .node_mut(&node_id)
                .ok_or(FlowtraderError::NodeNotFound { node_id })?;
            node.record_re_entry(position)?;
            Ok(true)
        }
    }
}
