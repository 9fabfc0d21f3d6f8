// SPDX-License-Identifier: MIT OR Apache-2.0
//! Tick-driven execution of a behavior graph.
//!
//! A [`GraphRunner`] owns one running instance of a graph: a behavior object
//! per node, a cursor per entry chain, the published outputs of control-path
//! nodes, and the instance's blackboard and parameter stores. The host calls
//! [`GraphRunner::drive`] with a category and a tick duration; the runner
//! advances every chain of that category until it suspends or runs off its
//! end.
//!
//! Chains are advanced strictly single-threaded. Within one evaluation the
//! runner resolves the node's data inputs first: a connected input pulls its
//! producer (data nodes are re-evaluated on every pull, never cached; other
//! producers are read from their last published outputs), an unconnected
//! input falls back to its field binding, and an unbound one to the kind's
//! default value.

use crate::behavior::{Behavior, BehaviorRegistry, EvalContext, EvalError};
use crate::schedule::{Schedule, ScheduleError};
use crate::status::{AbortPolicy, CategoryStatus, NodeStatus};
use indexmap::IndexMap;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tickweave_graph::binding::Binding;
use tickweave_graph::connection::Connection;
use tickweave_graph::graph::Graph;
use tickweave_graph::node::{EntryKind, Node, NodeId, NodeRole};
use tickweave_graph::port::{Value, ValueKind};
use tickweave_graph::variable::{instantiate_parameters, SharedStore, VariableError, VariableId};
use tracing::{debug, info, warn};

/// Structural failure constructing or driving a runner
///
/// Evaluation-time failures never surface here; they are logged and turned
/// into chain aborts instead.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// A node names a behavior type with no registered factory
    #[error("Node '{node}' uses unregistered behavior '{behavior}'")]
    UnknownBehavior {
        /// Display name of the node
        node: String,
        /// Behavior type name that failed to resolve
        behavior: String,
    },

    /// Compute-order construction for a category failed
    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    /// A parameter assignment was rejected by the store
    #[error(transparent)]
    Variable(#[from] VariableError),
}

/// Where a runner's blackboard state lives
#[derive(Debug, Clone, Default)]
pub enum BlackboardMode {
    /// Private copy instantiated from the graph's authored store
    #[default]
    Instanced,
    /// Caller-provided store, shared with other runners or the host
    Shared(SharedStore),
}

/// Construction options for a [`GraphRunner`]
#[derive(Debug, Clone, Default)]
pub struct RunnerOptions {
    /// How chains advance past aborted nodes
    pub abort_policy: AbortPolicy,
    /// Blackboard placement
    pub blackboard: BlackboardMode,
}

/// Resume point of one entry chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cursor {
    /// The next drive starts a fresh cycle from the entry node
    AtEntry,
    /// The next drive resumes mid-chain by re-evaluating this node
    Suspended(NodeId),
}

struct CategoryState {
    schedule: Schedule,
    // One cursor per schedule entry, same order.
    cursors: Vec<Cursor>,
}

/// A running instance of a behavior graph
pub struct GraphRunner {
    graph: Arc<Graph>,
    behaviors: HashMap<NodeId, Box<dyn Behavior>>,
    categories: HashMap<EntryKind, CategoryState>,
    published: HashMap<NodeId, IndexMap<String, Value>>,
    blackboard: SharedStore,
    parameters: SharedStore,
    abort_policy: AbortPolicy,
    tick: u64,
}

impl GraphRunner {
    /// Create a runner for `graph`, instantiating one behavior per node
    ///
    /// Parameters are instantiated from the graph's blueprint; override them
    /// with [`apply_parameters`] before the first drive.
    ///
    /// # Errors
    /// Returns [`RuntimeError::UnknownBehavior`] when a node's behavior type
    /// is not in `registry`.
    ///
    /// [`apply_parameters`]: GraphRunner::apply_parameters
    pub fn new(
        graph: impl Into<Arc<Graph>>,
        registry: &BehaviorRegistry,
        options: RunnerOptions,
    ) -> Result<Self, RuntimeError> {
        let graph = graph.into();
        let mut behaviors = HashMap::new();
        for node in graph.nodes() {
            let behavior =
                registry
                    .instantiate(node)
                    .ok_or_else(|| RuntimeError::UnknownBehavior {
                        node: node.name.clone(),
                        behavior: node.behavior.clone(),
                    })?;
            behaviors.insert(node.id, behavior);
        }
        let blackboard = match options.blackboard {
            BlackboardMode::Instanced => graph.instantiate_blackboard(),
            BlackboardMode::Shared(store) => store,
        };
        let parameters = instantiate_parameters(graph.parameter_defs()).into_shared();
        info!(graph = %graph.name, nodes = graph.node_count(), "Graph runner ready");
        Ok(Self {
            graph,
            behaviors,
            categories: HashMap::new(),
            published: HashMap::new(),
            blackboard,
            parameters,
            abort_policy: options.abort_policy,
            tick: 0,
        })
    }

    /// Advance every chain of one entry category by one tick
    ///
    /// The category's compute order is built and validated on its first
    /// drive. Each chain resumes from its cursor: a suspended node is
    /// re-evaluated with freshly resolved inputs, and a chain that completed
    /// last drive starts a new cycle from its entry node. The call returns
    /// [`CategoryStatus::Unfinished`] while any chain of the category is
    /// suspended mid-chain, and [`CategoryStatus::Finished`] otherwise; a
    /// category with no entry nodes finishes trivially.
    ///
    /// # Errors
    /// Returns an error only for structural problems found while building
    /// the category's schedule. Node evaluation failures are logged and
    /// handled per the runner's [`AbortPolicy`].
    pub fn drive(&mut self, category: EntryKind, dt: f64) -> Result<CategoryStatus, RuntimeError> {
        let state = match self.categories.entry(category) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let schedule = Schedule::build(&self.graph, category)?;
                let cursors = vec![Cursor::AtEntry; schedule.entry_count()];
                entry.insert(CategoryState { schedule, cursors })
            }
        };
        let entries = state.schedule.entries().to_vec();
        let mut cursors = std::mem::take(&mut state.cursors);

        for (index, entry) in entries.iter().enumerate() {
            cursors[index] = self.run_chain(category, *entry, cursors[index], dt);
        }

        let status = if cursors.iter().any(|c| matches!(c, Cursor::Suspended(_))) {
            CategoryStatus::Unfinished
        } else {
            CategoryStatus::Finished
        };
        if let Some(state) = self.categories.get_mut(&category) {
            state.cursors = cursors;
        }
        debug!(category = %category, tick = self.tick, status = ?status, "Drive complete");
        self.tick += 1;
        Ok(status)
    }

    /// Walk one chain from its cursor until it suspends or ends
    fn run_chain(
        &mut self,
        category: EntryKind,
        entry: NodeId,
        start: Cursor,
        dt: f64,
    ) -> Cursor {
        let graph = Arc::clone(&self.graph);
        let mut current = match start {
            Cursor::AtEntry => entry,
            Cursor::Suspended(node) => node,
        };
        loop {
            let node = graph.expect_node(current);
            let (status, selected) = match self.evaluate_node(&graph, node, category, dt) {
                Ok(result) => result,
                Err(err) => {
                    warn!(node = %node.name, error = %err, "Node evaluation failed");
                    (NodeStatus::Abort, None)
                }
            };
            if status == NodeStatus::Unfinished {
                return Cursor::Suspended(current);
            }
            // Finished or Abort: control leaves the node either way.
            self.reset_node(current);
            if status == NodeStatus::Abort {
                debug!(node = %node.name, "Node aborted");
                if self.abort_policy == AbortPolicy::Halt {
                    return Cursor::AtEntry;
                }
            }
            match successor(&graph, node, status, selected.as_deref()) {
                Some(next) => current = next,
                None => return Cursor::AtEntry,
            }
        }
    }

    /// Evaluate one node: resolve inputs, run the behavior, publish outputs
    ///
    /// Nothing is published when the behavior fails.
    fn evaluate_node(
        &mut self,
        graph: &Graph,
        node: &Node,
        category: EntryKind,
        dt: f64,
    ) -> Result<(NodeStatus, Option<String>), EvalError> {
        let inputs = self.resolve_inputs(graph, node, category, dt)?;
        let mut ctx = EvalContext::new(
            inputs,
            &self.blackboard,
            &self.parameters,
            self.tick,
            dt,
            category,
        );
        let Some(behavior) = self.behaviors.get_mut(&node.id) else {
            return Err(EvalError::Message(format!(
                "No behavior instance for '{}'",
                node.name
            )));
        };
        let status = behavior.evaluate(&mut ctx)?;
        let (outputs, selected) = ctx.finish();
        if !outputs.is_empty() {
            self.published.entry(node.id).or_default().extend(outputs);
        }
        Ok((status, selected))
    }

    /// Fill a node's input slots: connection, then binding, then kind default
    fn resolve_inputs(
        &mut self,
        graph: &Graph,
        node: &Node,
        category: EntryKind,
        dt: f64,
    ) -> Result<IndexMap<String, Value>, EvalError> {
        let mut inputs = IndexMap::new();
        for port in node.data_inputs() {
            let value = if let Some(connection) = graph.connection_into(node.id, &port.name) {
                self.pull_connection(graph, connection, port.kind, category, dt)?
            } else if let Some(binding) = node.binding(&port.name) {
                self.resolve_binding(binding)?
            } else if let Some(default) = port.kind.default_value() {
                default
            } else {
                continue;
            };
            inputs.insert(port.name.clone(), value);
        }
        Ok(inputs)
    }

    fn resolve_binding(&self, binding: &Binding) -> Result<Value, EvalError> {
        match binding {
            Binding::Literal(value) => Ok(value.clone()),
            Binding::Blackboard(id) => self
                .blackboard
                .read()
                .get(*id)
                .cloned()
                .ok_or(EvalError::UnknownVariable(*id)),
            Binding::Parameter(id) => self
                .parameters
                .read()
                .get(*id)
                .cloned()
                .ok_or(EvalError::UnknownVariable(*id)),
        }
    }

    /// Resolve the value arriving over a data connection
    ///
    /// A data-node producer is evaluated on the spot; any other producer is
    /// read from its last published outputs. The value is then converted to
    /// the consuming port's kind.
    fn pull_connection(
        &mut self,
        graph: &Graph,
        connection: &Connection,
        target_kind: ValueKind,
        category: EntryKind,
        dt: f64,
    ) -> Result<Value, EvalError> {
        let producer = graph.expect_node(connection.source_node);
        let Some(source_port) = producer.port(&connection.source_port) else {
            return Err(EvalError::Message(format!(
                "Connection out of '{}' names a missing source port",
                producer.name
            )));
        };

        if producer.role == NodeRole::Data {
            let (status, _) = self.evaluate_node(graph, producer, category, dt)?;
            if status != NodeStatus::Finished {
                return Err(EvalError::Message(format!(
                    "Data node '{}' did not finish when pulled",
                    producer.name
                )));
            }
        }

        let value = self
            .published
            .get(&producer.id)
            .and_then(|outputs| outputs.get(&source_port.name))
            .cloned()
            .ok_or_else(|| EvalError::OutputNotReady {
                producer: producer.name.clone(),
                port: source_port.name.clone(),
            })?;

        if value.kind() != source_port.kind {
            return Err(EvalError::KindMismatch {
                port: source_port.name.clone(),
                expected: source_port.kind,
                got: value.kind(),
            });
        }
        graph
            .conversions()
            .convert(&value, target_kind)
            .ok_or(EvalError::NoConversion {
                from: value.kind(),
                to: target_kind,
            })
    }

    /// Clear a node's activation state when control leaves it
    fn reset_node(&mut self, node: NodeId) {
        if let Some(behavior) = self.behaviors.get_mut(&node) {
            behavior.reset();
        }
    }

    // === Instance state ===

    /// The graph this runner executes
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// The instance's blackboard store
    pub fn blackboard(&self) -> &SharedStore {
        &self.blackboard
    }

    /// The instance's parameter store
    pub fn parameters(&self) -> &SharedStore {
        &self.parameters
    }

    /// Assign a parameter by its blueprint ID
    ///
    /// # Errors
    /// Rejected for unknown IDs and kind mismatches.
    pub fn set_parameter(&mut self, id: VariableId, value: Value) -> Result<(), RuntimeError> {
        self.parameters.write().set(id, value)?;
        Ok(())
    }

    /// Assign a batch of parameters by blueprint ID, the run-initialization
    /// call a host makes before the first drive
    ///
    /// Assignments apply in order; on the first rejected value the rest of
    /// the batch is not applied.
    ///
    /// # Errors
    /// Rejected for unknown IDs and kind mismatches.
    pub fn apply_parameters(
        &mut self,
        values: impl IntoIterator<Item = (VariableId, Value)>,
    ) -> Result<(), RuntimeError> {
        let mut store = self.parameters.write();
        for (id, value) in values {
            store.set(id, value)?;
        }
        Ok(())
    }

    /// Number of completed drive calls
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Cursor of an entry's chain, once its category has been driven
    pub fn cursor(&self, category: EntryKind, entry: NodeId) -> Option<Cursor> {
        let state = self.categories.get(&category)?;
        let index = state.schedule.entries().iter().position(|id| *id == entry)?;
        state.cursors.get(index).copied()
    }

    /// Compute-order index of a node, once its category has been driven
    ///
    /// `None` both for categories not driven yet and for nodes outside the
    /// category's order.
    pub fn order_of(&self, category: EntryKind, node: NodeId) -> Option<u32> {
        self.categories.get(&category)?.schedule.order_of(node)
    }

    /// Last published value of a node's data output
    pub fn last_output(&self, node: NodeId, port: &str) -> Option<&Value> {
        self.published.get(&node)?.get(port)
    }

    /// Current diagnostic of a node's behavior, if it reports one
    pub fn node_diagnostic(&self, node: NodeId) -> Option<&str> {
        self.behaviors.get(&node)?.diagnostic()
    }

    /// Forget all execution state: cursors, published outputs, the tick
    /// counter, and per-node activation state
    ///
    /// Blackboard and parameter values are instance data and keep their
    /// current contents.
    pub fn reset(&mut self) {
        for behavior in self.behaviors.values_mut() {
            behavior.reset();
        }
        for state in self.categories.values_mut() {
            for cursor in &mut state.cursors {
                *cursor = Cursor::AtEntry;
            }
        }
        self.published.clear();
        self.tick = 0;
        debug!(graph = %self.graph.name, "Runner reset");
    }
}

/// Control successor after an evaluation that did not suspend
///
/// Branch nodes follow their selected output; anything else follows its
/// sole control output. A branch that reports no selection (an abort, or a
/// missing `select_output` call) ends its chain.
fn successor(
    graph: &Graph,
    node: &Node,
    status: NodeStatus,
    selected: Option<&str>,
) -> Option<NodeId> {
    if node.role != NodeRole::Branch {
        return graph.control_successor(node.id, None);
    }
    match selected {
        Some(name) if node.output(name).is_some_and(|p| p.is_exec()) => {
            graph.control_successor(node.id, Some(name))
        }
        Some(name) => {
            warn!(
                node = %node.name,
                output = name,
                "Branch selected a control output it does not have"
            );
            None
        }
        None => {
            if status == NodeStatus::Finished {
                warn!(node = %node.name, "Branch finished without selecting an output");
            }
            None
        }
    }
}

impl std::fmt::Debug for GraphRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphRunner")
            .field("graph", &self.graph.name)
            .field("behaviors", &self.behaviors.len())
            .field("tick", &self.tick)
            .finish()
    }
}
