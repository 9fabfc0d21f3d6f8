// SPDX-License-Identifier: MIT OR Apache-2.0
//! Compute-order scheduling.
//!
//! A schedule covers one entry category. Every node reachable from the
//! category's entry nodes gets a monotonic order index: entry nodes in
//! ascending authoring y (ties broken by graph insertion order), then each
//! control chain walked forward with transitive data producers numbered
//! depth-first before their consumer. The indices are advisory, used for
//! authoring-time consistency checks and diagnostics; the runner re-resolves
//! data dependencies fresh on every evaluation and never replays a schedule
//! as a cache.

use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tickweave_graph::binding::Binding;
use tickweave_graph::graph::Graph;
use tickweave_graph::node::{EntryKind, NodeId, NodeRole};
use tickweave_graph::variable::VariableId;

/// Error that fails a scheduling pass
#[derive(Debug, Error)]
pub enum ScheduleError {
    /// Control or data connections loop back on themselves
    #[error("Cycle detected at node {0:?}")]
    CycleDetected(NodeId),

    /// A data input pulls from a control node that never runs before it
    #[error("Node {consumer:?} pulls data from control node {producer:?} that is not ordered before it")]
    UnorderedProducer {
        /// Producing control node
        producer: NodeId,
        /// Consuming node
        consumer: NodeId,
    },

    /// A field binding references a variable the stores no longer declare
    #[error("Binding '{field}' of node {node:?} references missing variable {variable:?}")]
    DanglingBinding {
        /// Node owning the binding
        node: NodeId,
        /// Bound field name
        field: String,
        /// Missing variable ID
        variable: VariableId,
    },

    /// A branch node has nothing to select between
    #[error("Branch node {0:?} has no control outputs")]
    BranchWithoutOutputs(NodeId),
}

/// Node ordering for one entry category
///
/// Built fresh per pass; a node absent from the order table is unreachable
/// from this category's entries (the sentinel state).
#[derive(Debug, Clone)]
pub struct Schedule {
    category: EntryKind,
    entries: Vec<NodeId>,
    orders: HashMap<NodeId, u32>,
}

impl Schedule {
    /// Run a scheduling pass over one category of the graph
    pub fn build(graph: &Graph, category: EntryKind) -> Result<Self, ScheduleError> {
        let mut sorted = graph.entry_nodes(category).collect::<Vec<_>>();
        sorted.sort_by(|a, b| a.position[1].total_cmp(&b.position[1]));
        let entries: Vec<NodeId> = sorted.iter().map(|n| n.id).collect();

        let mut schedule = Self {
            category,
            entries,
            orders: HashMap::new(),
        };
        let mut counter = 0u32;
        let mut stack = HashSet::new();
        for entry in schedule.entries.clone() {
            schedule.walk_control(graph, entry, &mut counter, &mut stack)?;
        }

        tracing::debug!(
            category = %category,
            entries = schedule.entries.len(),
            ordered = schedule.orders.len(),
            "Computed schedule"
        );
        Ok(schedule)
    }

    /// Category this schedule covers
    pub fn category(&self) -> EntryKind {
        self.category
    }

    /// Entry nodes in drive order
    pub fn entries(&self) -> &[NodeId] {
        &self.entries
    }

    /// Number of entry nodes
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Order index of a node, if it is reachable from this category
    pub fn order_of(&self, node: NodeId) -> Option<u32> {
        self.orders.get(&node).copied()
    }

    /// Number of nodes the pass ordered
    pub fn ordered_count(&self) -> usize {
        self.orders.len()
    }

    /// Check if the category has no entry nodes and every drive is a no-op
    pub fn is_inert(&self) -> bool {
        self.entries.is_empty()
    }

    fn walk_control(
        &mut self,
        graph: &Graph,
        node_id: NodeId,
        counter: &mut u32,
        stack: &mut HashSet<NodeId>,
    ) -> Result<(), ScheduleError> {
        if stack.contains(&node_id) {
            return Err(ScheduleError::CycleDetected(node_id));
        }
        if self.orders.contains_key(&node_id) {
            // Converging chains keep the first numbering.
            return Ok(());
        }
        stack.insert(node_id);

        self.number_data_deps(graph, node_id, counter, stack)?;
        self.check_bindings(graph, node_id)?;
        self.assign(node_id, counter);

        let node = graph.expect_node(node_id);
        if node.role == NodeRole::Branch && node.control_outputs().count() == 0 {
            return Err(ScheduleError::BranchWithoutOutputs(node_id));
        }
        let output_names: Vec<String> =
            node.control_outputs().map(|p| p.name.clone()).collect();
        for name in output_names {
            if let Some(next) = graph.control_successor(node_id, Some(&name)) {
                self.walk_control(graph, next, counter, stack)?;
            }
        }

        stack.remove(&node_id);
        Ok(())
    }

    fn walk_data(
        &mut self,
        graph: &Graph,
        node_id: NodeId,
        counter: &mut u32,
        stack: &mut HashSet<NodeId>,
    ) -> Result<(), ScheduleError> {
        if stack.contains(&node_id) {
            return Err(ScheduleError::CycleDetected(node_id));
        }
        if self.orders.contains_key(&node_id) {
            return Ok(());
        }
        stack.insert(node_id);

        self.number_data_deps(graph, node_id, counter, stack)?;
        self.check_bindings(graph, node_id)?;
        self.assign(node_id, counter);

        stack.remove(&node_id);
        Ok(())
    }

    /// Number the transitive data producers of a node before the node itself
    ///
    /// Producers that are control nodes are not renumbered; they must already
    /// carry an order from their own chain, which also guarantees the
    /// producer-before-consumer invariant since the counter only grows.
    fn number_data_deps(
        &mut self,
        graph: &Graph,
        consumer: NodeId,
        counter: &mut u32,
        stack: &mut HashSet<NodeId>,
    ) -> Result<(), ScheduleError> {
        let consumer_node = graph.expect_node(consumer);
        let pulled: Vec<NodeId> = graph
            .input_connections(consumer)
            .filter(|c| {
                consumer_node
                    .port(&c.target_port)
                    .map_or(false, |p| !p.is_exec())
            })
            .map(|c| c.source_node)
            .collect();

        for producer in pulled {
            let role = graph.expect_node(producer).role;
            if role == NodeRole::Data {
                self.walk_data(graph, producer, counter, stack)?;
            } else if !self.orders.contains_key(&producer) {
                return Err(ScheduleError::UnorderedProducer { producer, consumer });
            }
        }
        Ok(())
    }

    fn check_bindings(&self, graph: &Graph, node_id: NodeId) -> Result<(), ScheduleError> {
        let node = graph.expect_node(node_id);
        for (field, binding) in &node.bindings {
            let missing = match binding {
                Binding::Literal(_) => None,
                Binding::Blackboard(id) => {
                    graph.blackboard().kind_of(*id).is_none().then_some(*id)
                }
                Binding::Parameter(id) => graph.parameter_def(*id).is_none().then_some(*id),
            };
            if let Some(variable) = missing {
                return Err(ScheduleError::DanglingBinding {
                    node: node_id,
                    field: field.clone(),
                    variable,
                });
            }
        }
        Ok(())
    }

    fn assign(&mut self, node_id: NodeId, counter: &mut u32) {
        self.orders.insert(node_id, *counter);
        *counter += 1;
    }
}
