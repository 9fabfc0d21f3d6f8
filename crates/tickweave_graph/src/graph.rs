// SPDX-License-Identifier: MIT OR Apache-2.0
//! The graph asset: node and connection arenas plus structural queries.
//!
//! Topology is authored up front and treated as immutable while runners
//! execute it. Nodes, ports and connections reference each other by ID only,
//! so the graph can be cloned, serialized and shared freely.

use crate::binding::Binding;
use crate::connection::{Connection, ConnectionId};
use crate::convert::ConversionRegistry;
use crate::node::{port_names_unique, EntryKind, Node, NodeId, NodeRole};
use crate::port::{Port, PortDirection, PortId, Value, ValueKind};
use crate::variable::{ParameterDef, SharedStore, VariableError, VariableId, VariableStore};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Current graph asset format version
pub const FORMAT_VERSION: u32 = 1;

/// Error raised by graph authoring and asset operations
#[derive(Debug, Error)]
pub enum GraphError {
    /// Node not found
    #[error("Node not found: {0:?}")]
    NodeNotFound(NodeId),

    /// Named port not found on the node
    #[error("Node {node:?} has no port named '{port}'")]
    PortNotFound {
        /// Owning node
        node: NodeId,
        /// Requested port name
        port: String,
    },

    /// Port kinds differ and no conversion is registered for the pair
    #[error("Cannot connect {from:?} to {to:?}: no conversion registered")]
    IncompatibleKinds {
        /// Source port kind
        from: ValueKind,
        /// Target port kind
        to: ValueKind,
    },

    /// Single-connection port already has a connection
    #[error("Port '{port}' on {node:?} is already connected")]
    PortOccupied {
        /// Owning node
        node: NodeId,
        /// Occupied port name
        port: String,
    },

    /// Connection would loop a node back to itself
    #[error("A node cannot connect to itself")]
    SelfLoop,

    /// Field bindings only apply to data inputs
    #[error("'{0}' is a control port and cannot take a field binding")]
    CannotBindExec(String),

    /// Binding kind differs from the field's declared kind
    #[error("Binding for '{port}' is {bound:?} but the field is {field:?}")]
    BindingKindMismatch {
        /// Field (input port) name
        port: String,
        /// Declared field kind
        field: ValueKind,
        /// Kind of the rejected binding
        bound: ValueKind,
    },

    /// Binding references a variable the store does not declare
    #[error("Unknown variable: {0:?}")]
    UnknownVariable(VariableId),

    /// Variable store operation failed
    #[error(transparent)]
    Variable(#[from] VariableError),

    /// Asset was written by a newer format version
    #[error("Unsupported graph format version {found} (supported: {supported})")]
    UnsupportedVersion {
        /// Version found in the asset
        found: u32,
        /// Newest version this build reads
        supported: u32,
    },

    /// RON serialization failed
    #[error("Serialization error: {0}")]
    Ser(#[from] ron::Error),

    /// RON deserialization failed
    #[error("Deserialization error: {0}")]
    De(#[from] ron::error::SpannedError),

    /// File io failed
    #[error("Io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A behavior graph asset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Graph {
    /// Graph name
    pub name: String,
    /// Format version for asset compatibility
    pub version: u32,
    nodes: IndexMap<NodeId, Node>,
    connections: IndexMap<ConnectionId, Connection>,
    blackboard: VariableStore,
    parameters: Vec<ParameterDef>,
    #[serde(skip, default)]
    conversions: ConversionRegistry,
}

impl Graph {
    /// Create a new empty graph
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: FORMAT_VERSION,
            nodes: IndexMap::new(),
            connections: IndexMap::new(),
            blackboard: VariableStore::new(),
            parameters: Vec::new(),
            conversions: ConversionRegistry::with_builtins(),
        }
    }

    // === Nodes ===

    /// Add a node to the graph
    pub fn add_node(&mut self, node: Node) -> NodeId {
        debug_assert!(port_names_unique(&node.inputs, PortDirection::Input));
        debug_assert!(port_names_unique(&node.outputs, PortDirection::Output));
        debug_assert!(node.ports_match_role(), "ports of '{}' break its role", node.name);
        let id = node.id;
        self.nodes.insert(id, node);
        id
    }

    /// Remove a node and every connection touching it
    pub fn remove_node(&mut self, node_id: NodeId) -> Option<Node> {
        self.connections.retain(|_, c| !c.involves_node(node_id));
        self.nodes.swap_remove(&node_id)
    }

    /// Get a node by ID
    pub fn node(&self, node_id: NodeId) -> Option<&Node> {
        self.nodes.get(&node_id)
    }

    /// Get a mutable node by ID
    pub fn node_mut(&mut self, node_id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&node_id)
    }

    /// Get a node by ID, treating absence as a caller bug
    ///
    /// # Panics
    ///
    /// Panics when the node is not part of this graph. Structural queries go
    /// through this accessor: asking about a foreign node is a programming
    /// error, not a recoverable condition.
    pub fn expect_node(&self, node_id: NodeId) -> &Node {
        self.nodes
            .get(&node_id)
            .unwrap_or_else(|| panic!("node {node_id:?} is not part of graph '{}'", self.name))
    }

    /// All nodes in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// All node IDs in insertion order
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// Number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Nodes with a given structural role, in insertion order
    pub fn nodes_of_role(&self, role: NodeRole) -> impl Iterator<Item = &Node> {
        self.nodes.values().filter(move |n| n.role == role)
    }

    /// Entry nodes of one trigger family, in insertion order
    pub fn entry_nodes(&self, kind: EntryKind) -> impl Iterator<Item = &Node> {
        self.nodes_of_role(NodeRole::Entry(kind))
    }

    // === Connections ===

    /// Connect an output port to an input port, both addressed by name
    pub fn connect(
        &mut self,
        source: NodeId,
        source_port: &str,
        target: NodeId,
        target_port: &str,
    ) -> Result<ConnectionId, GraphError> {
        let source_node = self
            .nodes
            .get(&source)
            .ok_or(GraphError::NodeNotFound(source))?;
        let target_node = self
            .nodes
            .get(&target)
            .ok_or(GraphError::NodeNotFound(target))?;

        let from = source_node
            .output(source_port)
            .ok_or_else(|| GraphError::PortNotFound {
                node: source,
                port: source_port.to_string(),
            })?;
        let to = target_node
            .input(target_port)
            .ok_or_else(|| GraphError::PortNotFound {
                node: target,
                port: target_port.to_string(),
            })?;

        if !self.conversions.compatible(from.kind, to.kind) {
            return Err(GraphError::IncompatibleKinds {
                from: from.kind,
                to: to.kind,
            });
        }

        if !from.allows_multiple() && self.connections.values().any(|c| c.source_port == from.id) {
            return Err(GraphError::PortOccupied {
                node: source,
                port: source_port.to_string(),
            });
        }
        if !to.allows_multiple() && self.connections.values().any(|c| c.target_port == to.id) {
            return Err(GraphError::PortOccupied {
                node: target,
                port: target_port.to_string(),
            });
        }

        if source == target {
            return Err(GraphError::SelfLoop);
        }

        let connection = Connection::new(source, from.id, target, to.id);
        let id = connection.id;
        self.connections.insert(id, connection);
        Ok(id)
    }

    /// Remove a connection
    pub fn disconnect(&mut self, connection_id: ConnectionId) -> Option<Connection> {
        self.connections.swap_remove(&connection_id)
    }

    /// Get a connection by ID
    pub fn connection(&self, connection_id: ConnectionId) -> Option<&Connection> {
        self.connections.get(&connection_id)
    }

    /// All connections in insertion order
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.values()
    }

    /// Number of connections
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    // === Structural queries (fail fast on foreign nodes) ===

    /// Connections arriving at a node's input ports
    ///
    /// # Panics
    ///
    /// Panics when the node is not part of this graph.
    pub fn input_connections(&self, node: NodeId) -> impl Iterator<Item = &Connection> {
        let _ = self.expect_node(node);
        self.connections.values().filter(move |c| c.target_node == node)
    }

    /// Connections leaving a node, optionally restricted to one output port
    ///
    /// # Panics
    ///
    /// Panics when the node is not part of this graph, or when `port` names
    /// an output the node does not have.
    pub fn output_connections(
        &self,
        node: NodeId,
        port: Option<&str>,
    ) -> impl Iterator<Item = &Connection> {
        let node_ref = self.expect_node(node);
        let port_id = port.map(|name| {
            node_ref
                .output(name)
                .map(|p| p.id)
                .unwrap_or_else(|| {
                    panic!("node '{}' has no output port '{name}'", node_ref.name)
                })
        });
        self.connections.values().filter(move |c| {
            c.source_node == node && port_id.map_or(true, |id| c.source_port == id)
        })
    }

    /// Producing node and port feeding an input port, if connected
    pub fn producer_of(&self, input_port: PortId) -> Option<(&Node, &Port)> {
        let connection = self
            .connections
            .values()
            .find(|c| c.target_port == input_port)?;
        let node = self.nodes.get(&connection.source_node)?;
        let port = node.port(&connection.source_port)?;
        Some((node, port))
    }

    /// Connection feeding a named input of a node, if any
    ///
    /// # Panics
    ///
    /// Panics when the node is not part of this graph.
    pub fn connection_into(&self, node: NodeId, input: &str) -> Option<&Connection> {
        let node_ref = self.expect_node(node);
        let port = node_ref.input(input)?;
        self.connections.values().find(|c| c.target_port == port.id)
    }

    /// Control-flow successor of a node
    ///
    /// With `output: Some(name)` follows that named control output; with
    /// `None` follows the node's sole control output. Returns `None` when
    /// the chosen output is unconnected or missing.
    ///
    /// # Panics
    ///
    /// Panics when the node is not part of this graph.
    pub fn control_successor(&self, node: NodeId, output: Option<&str>) -> Option<NodeId> {
        let node_ref = self.expect_node(node);
        let port = match output {
            Some(name) => node_ref.output(name).filter(|p| p.is_exec())?,
            None => node_ref.control_outputs().next()?,
        };
        self.connections
            .values()
            .find(|c| c.source_port == port.id)
            .map(|c| c.target_node)
    }

    // === Field bindings ===

    /// Bind a data input field, checking kinds against the store declaration
    ///
    /// Kind mismatches are authoring errors caught here, when the binding is
    /// created, never deferred to resolution time.
    pub fn bind_input(
        &mut self,
        node: NodeId,
        field: &str,
        binding: Binding,
    ) -> Result<(), GraphError> {
        let node_ref = self
            .nodes
            .get_mut(&node)
            .ok_or(GraphError::NodeNotFound(node))?;
        let port = node_ref
            .input(field)
            .ok_or_else(|| GraphError::PortNotFound {
                node,
                port: field.to_string(),
            })?;
        if port.is_exec() {
            return Err(GraphError::CannotBindExec(field.to_string()));
        }
        let field_kind = port.kind;

        let bound_kind = match &binding {
            Binding::Literal(value) => value.kind(),
            Binding::Blackboard(id) => self
                .blackboard
                .kind_of(*id)
                .ok_or(GraphError::UnknownVariable(*id))?,
            Binding::Parameter(id) => self
                .parameters
                .iter()
                .find(|def| def.id == *id)
                .map(|def| def.kind)
                .ok_or(GraphError::UnknownVariable(*id))?,
        };
        if bound_kind != field_kind {
            return Err(GraphError::BindingKindMismatch {
                port: field.to_string(),
                field: field_kind,
                bound: bound_kind,
            });
        }

        node_ref.bindings.insert(field.to_string(), binding);
        Ok(())
    }

    // === Variable stores ===

    /// Declare a blackboard entry
    pub fn declare_blackboard(
        &mut self,
        name: impl Into<String>,
        initial: Value,
    ) -> Result<VariableId, GraphError> {
        Ok(self.blackboard.declare(name, initial)?)
    }

    /// Declare a parameter blueprint entry
    pub fn declare_parameter(
        &mut self,
        name: impl Into<String>,
        default: Value,
    ) -> Result<VariableId, GraphError> {
        let name = name.into();
        if self.parameters.iter().any(|def| def.name == name) {
            return Err(VariableError::DuplicateName(name).into());
        }
        let def = ParameterDef::new(name, default);
        let id = def.id;
        self.parameters.push(def);
        Ok(id)
    }

    /// The authored blackboard store
    pub fn blackboard(&self) -> &VariableStore {
        &self.blackboard
    }

    /// Mutable access to the authored blackboard store
    pub fn blackboard_mut(&mut self) -> &mut VariableStore {
        &mut self.blackboard
    }

    /// Parameter blueprint entries in declaration order
    pub fn parameter_defs(&self) -> &[ParameterDef] {
        &self.parameters
    }

    /// Parameter blueprint entry by ID
    pub fn parameter_def(&self, id: VariableId) -> Option<&ParameterDef> {
        self.parameters.iter().find(|def| def.id == id)
    }

    /// Clone the authored blackboard into a shared handle
    ///
    /// Hand the same handle to several runners to make them share blackboard
    /// state; runners default to a private copy otherwise.
    pub fn instantiate_blackboard(&self) -> SharedStore {
        self.blackboard.clone().into_shared()
    }

    /// The conversion registry used to validate and propagate connections
    pub fn conversions(&self) -> &ConversionRegistry {
        &self.conversions
    }

    /// Mutable access to the conversion registry
    ///
    /// Custom registrations are not serialized; re-register them after
    /// loading an asset.
    pub fn conversions_mut(&mut self) -> &mut ConversionRegistry {
        &mut self.conversions
    }

    // === Asset io ===

    /// Serialize to RON
    pub fn to_ron(&self) -> Result<String, ron::Error> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
    }

    /// Deserialize from RON, rejecting assets from newer format versions
    pub fn from_ron(s: &str) -> Result<Self, GraphError> {
        let graph: Self = ron::from_str(s)?;
        if graph.version > FORMAT_VERSION {
            return Err(GraphError::UnsupportedVersion {
                found: graph.version,
                supported: FORMAT_VERSION,
            });
        }
        Ok(graph)
    }

    /// Save the graph to a RON file
    pub fn save_to_file(&self, path: &Path) -> Result<(), GraphError> {
        let ron_str = self.to_ron()?;
        std::fs::write(path, ron_str)?;
        Ok(())
    }

    /// Load a graph from a RON file
    pub fn load_from_file(path: &Path) -> Result<Self, GraphError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron(&contents)
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new("Untitled")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(kind: EntryKind) -> Node {
        Node::new(NodeRole::Entry(kind), "start").with_output(Port::exec_output("out"))
    }

    fn action(behavior: &str) -> Node {
        Node::new(NodeRole::Action, behavior)
            .with_input(Port::exec_input("in"))
            .with_output(Port::exec_output("out"))
    }

    fn data_number(behavior: &str) -> Node {
        Node::new(NodeRole::Data, behavior).with_output(Port::output("value", ValueKind::Number))
    }

    #[test]
    fn test_connect_and_query() {
        let mut graph = Graph::new("test");
        let e = graph.add_node(entry(EntryKind::Start));
        let a = graph.add_node(action("log"));

        graph.connect(e, "out", a, "in").unwrap();

        assert_eq!(graph.connection_count(), 1);
        assert_eq!(graph.output_connections(e, Some("out")).count(), 1);
        assert_eq!(graph.input_connections(a).count(), 1);
        assert_eq!(graph.control_successor(e, None), Some(a));
        assert_eq!(graph.control_successor(a, None), None);
    }

    #[test]
    fn test_connect_rejects_incompatible_kinds() {
        let mut graph = Graph::new("test");
        let text = graph.add_node(
            Node::new(NodeRole::Data, "constant_text")
                .with_output(Port::output("value", ValueKind::Text)),
        );
        let consumer = graph.add_node(
            Node::new(NodeRole::Data, "negate")
                .with_input(Port::input("value", ValueKind::Number))
                .with_output(Port::output("out", ValueKind::Number)),
        );

        let err = graph.connect(text, "value", consumer, "value").unwrap_err();
        assert!(matches!(err, GraphError::IncompatibleKinds { .. }));
    }

    #[test]
    fn test_connect_applies_conversion_compatibility() {
        let mut graph = Graph::new("test");
        let number = graph.add_node(data_number("constant"));
        let consumer = graph.add_node(
            Node::new(NodeRole::Data, "display")
                .with_input(Port::input("text", ValueKind::Text))
                .with_output(Port::output("out", ValueKind::Text)),
        );

        // Number feeds Text through the builtin conversion.
        assert!(graph.connect(number, "value", consumer, "text").is_ok());
    }

    #[test]
    fn test_exec_output_is_single_connection() {
        let mut graph = Graph::new("test");
        let e = graph.add_node(entry(EntryKind::Start));
        let a = graph.add_node(action("log"));
        let b = graph.add_node(action("log"));

        graph.connect(e, "out", a, "in").unwrap();
        let err = graph.connect(e, "out", b, "in").unwrap_err();
        assert!(matches!(err, GraphError::PortOccupied { .. }));
    }

    #[test]
    fn test_data_output_fans_out() {
        let mut graph = Graph::new("test");
        let producer = graph.add_node(data_number("constant"));
        let consumer_ports = || {
            Node::new(NodeRole::Data, "negate")
                .with_input(Port::input("value", ValueKind::Number))
                .with_output(Port::output("out", ValueKind::Number))
        };
        let c1 = graph.add_node(consumer_ports());
        let c2 = graph.add_node(consumer_ports());

        assert!(graph.connect(producer, "value", c1, "value").is_ok());
        assert!(graph.connect(producer, "value", c2, "value").is_ok());
    }

    #[test]
    fn test_self_loop_rejected() {
        let mut graph = Graph::new("test");
        let a = graph.add_node(
            Node::new(NodeRole::Data, "negate")
                .with_input(Port::input("value", ValueKind::Number))
                .with_output(Port::output("out", ValueKind::Number)),
        );

        let err = graph.connect(a, "out", a, "value").unwrap_err();
        assert!(matches!(err, GraphError::SelfLoop));
    }

    #[test]
    #[should_panic(expected = "is not part of graph")]
    fn test_foreign_node_query_panics() {
        let graph = Graph::new("test");
        let _ = graph.input_connections(NodeId::new()).count();
    }

    #[test]
    fn test_producer_of() {
        let mut graph = Graph::new("test");
        let producer = graph.add_node(data_number("constant"));
        let consumer = graph.add_node(
            Node::new(NodeRole::Data, "negate")
                .with_input(Port::input("value", ValueKind::Number))
                .with_output(Port::output("out", ValueKind::Number)),
        );
        graph.connect(producer, "value", consumer, "value").unwrap();

        let input_id = graph.expect_node(consumer).input("value").unwrap().id;
        let (node, port) = graph.producer_of(input_id).unwrap();
        assert_eq!(node.id, producer);
        assert_eq!(port.name, "value");
    }

    #[test]
    fn test_bind_input_checks_kinds() {
        let mut graph = Graph::new("test");
        let speed = graph
            .declare_blackboard("speed", Value::Number(1.0))
            .unwrap();
        let flag = graph.declare_blackboard("flag", Value::Bool(false)).unwrap();
        let node = graph.add_node(
            Node::new(NodeRole::Data, "negate")
                .with_input(Port::input("value", ValueKind::Number))
                .with_output(Port::output("out", ValueKind::Number)),
        );

        assert!(graph
            .bind_input(node, "value", Binding::Blackboard(speed))
            .is_ok());
        let err = graph
            .bind_input(node, "value", Binding::Blackboard(flag))
            .unwrap_err();
        assert!(matches!(err, GraphError::BindingKindMismatch { .. }));

        let err = graph
            .bind_input(node, "value", Binding::Blackboard(VariableId::new()))
            .unwrap_err();
        assert!(matches!(err, GraphError::UnknownVariable(_)));
    }

    #[test]
    fn test_parameter_blueprint_declarations() {
        let mut graph = Graph::new("test");
        let p = graph.declare_parameter("Speed", Value::Number(3.5)).unwrap();

        assert_eq!(graph.parameter_defs().len(), 1);
        assert_eq!(graph.parameter_def(p).unwrap().kind, ValueKind::Number);
        assert!(graph.declare_parameter("Speed", Value::Number(0.0)).is_err());
    }

    #[test]
    fn test_ron_round_trip() {
        let mut graph = Graph::new("asset");
        let e = graph.add_node(entry(EntryKind::Update));
        let a = graph.add_node(action("log"));
        graph.connect(e, "out", a, "in").unwrap();
        graph.declare_blackboard("hits", Value::Number(0.0)).unwrap();

        let ron_str = graph.to_ron().unwrap();
        let loaded = Graph::from_ron(&ron_str).unwrap();
        assert_eq!(loaded.name, "asset");
        assert_eq!(loaded.node_count(), 2);
        assert_eq!(loaded.connection_count(), 1);
        assert_eq!(loaded.blackboard().len(), 1);
        // Conversions are rebuilt, not serialized.
        assert!(loaded
            .conversions()
            .compatible(ValueKind::Number, ValueKind::Text));
    }

    #[test]
    fn test_newer_format_version_rejected() {
        let mut graph = Graph::new("asset");
        graph.version = FORMAT_VERSION + 1;
        let ron_str = graph.to_ron().unwrap();

        let err = Graph::from_ron(&ron_str).unwrap_err();
        assert!(matches!(err, GraphError::UnsupportedVersion { .. }));
    }
}
