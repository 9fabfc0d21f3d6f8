// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node definitions and the structural role taxonomy.

use crate::binding::Binding;
use crate::port::{Port, PortDirection, PortId, ValueKind};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub Uuid);

impl NodeId {
    /// Create a new random node ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

/// Trigger family an entry node belongs to
///
/// Each kind is scheduled and driven independently: the host drives `Start`
/// once, `Update` every frame and `Trigger` whenever an external event fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryKind {
    /// Runs when the graph instance starts
    Start,
    /// Runs every tick
    Update,
    /// Runs on an external trigger event
    Trigger,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::Update => write!(f, "update"),
            Self::Trigger => write!(f, "trigger"),
        }
    }
}

/// Structural role of a node in the graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeRole {
    /// Begins a control-flow chain; no control input
    Entry(EntryKind),
    /// One control input, one control output; performs a side effect
    Action,
    /// No control ports; pulled on demand to produce values
    Data,
    /// One control input, several named control outputs; selects one per
    /// evaluation
    Branch,
}

impl NodeRole {
    /// Check if this is an entry role
    pub fn is_entry(&self) -> bool {
        matches!(self, Self::Entry(_))
    }

    /// The entry kind, if this is an entry role
    pub fn entry_kind(&self) -> Option<EntryKind> {
        match self {
            Self::Entry(kind) => Some(*kind),
            _ => None,
        }
    }

    /// Check if nodes of this role participate in control flow
    pub fn has_control_ports(&self) -> bool {
        !matches!(self, Self::Data)
    }
}

/// A node instance in the graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Unique instance ID
    pub id: NodeId,
    /// Structural role
    pub role: NodeRole,
    /// Behavior type ID, resolved against a behavior registry at run start
    pub behavior: String,
    /// Display name
    pub name: String,
    /// Authoring position; y orders entry nodes at scheduling time
    pub position: [f32; 2],
    /// Input ports
    pub inputs: Vec<Port>,
    /// Output ports
    pub outputs: Vec<Port>,
    /// Field bindings for data inputs, keyed by port name
    pub bindings: IndexMap<String, Binding>,
}

impl Node {
    /// Create a new node with no ports
    pub fn new(role: NodeRole, behavior: impl Into<String>) -> Self {
        let behavior = behavior.into();
        Self {
            id: NodeId::new(),
            role,
            name: behavior.clone(),
            behavior,
            position: [0.0, 0.0],
            inputs: Vec::new(),
            outputs: Vec::new(),
            bindings: IndexMap::new(),
        }
    }

    /// Set the display name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the authoring position
    pub fn with_position(mut self, x: f32, y: f32) -> Self {
        self.position = [x, y];
        self
    }

    /// Add an input port
    pub fn with_input(mut self, port: Port) -> Self {
        self.inputs.push(port);
        self
    }

    /// Add an output port
    pub fn with_output(mut self, port: Port) -> Self {
        self.outputs.push(port);
        self
    }

    /// Store a literal binding for a data input field
    ///
    /// # Panics
    ///
    /// Panics when the field does not exist or the literal's kind differs
    /// from the field's declared kind; both are authoring contract breaches.
    /// Use [`Graph::bind_input`] for fallible, store-checked binding.
    ///
    /// [`Graph::bind_input`]: crate::graph::Graph::bind_input
    pub fn with_literal(mut self, field: &str, value: crate::port::Value) -> Self {
        let port = self
            .input(field)
            .unwrap_or_else(|| panic!("node '{}' has no input field '{field}'", self.name));
        assert!(
            port.kind == value.kind(),
            "literal for '{field}' on '{}' is {:?} but the field is {:?}",
            self.name,
            value.kind(),
            port.kind
        );
        self.bindings.insert(field.to_string(), Binding::Literal(value));
        self
    }

    /// Get an input port by name
    pub fn input(&self, name: &str) -> Option<&Port> {
        self.inputs.iter().find(|p| p.name == name)
    }

    /// Get an output port by name
    pub fn output(&self, name: &str) -> Option<&Port> {
        self.outputs.iter().find(|p| p.name == name)
    }

    /// Get a port by ID
    pub fn port(&self, port_id: &PortId) -> Option<&Port> {
        self.ports().find(|p| p.id == *port_id)
    }

    /// All ports, inputs first
    pub fn ports(&self) -> impl Iterator<Item = &Port> {
        self.inputs.iter().chain(self.outputs.iter())
    }

    /// Control-flow input ports
    pub fn control_inputs(&self) -> impl Iterator<Item = &Port> {
        self.inputs.iter().filter(|p| p.is_exec())
    }

    /// Control-flow output ports
    pub fn control_outputs(&self) -> impl Iterator<Item = &Port> {
        self.outputs.iter().filter(|p| p.is_exec())
    }

    /// Data input ports
    pub fn data_inputs(&self) -> impl Iterator<Item = &Port> {
        self.inputs.iter().filter(|p| !p.is_exec())
    }

    /// Data output ports
    pub fn data_outputs(&self) -> impl Iterator<Item = &Port> {
        self.outputs.iter().filter(|p| !p.is_exec())
    }

    /// Binding for a data input field, if one is set
    pub fn binding(&self, field: &str) -> Option<&Binding> {
        self.bindings.get(field)
    }

    /// Check that the node's ports are consistent with its role
    ///
    /// Entries have no control input, actions exactly one control output,
    /// branches more than one, data nodes none at all.
    pub fn ports_match_role(&self) -> bool {
        let control_in = self.control_inputs().count();
        let control_out = self.control_outputs().count();
        match self.role {
            NodeRole::Entry(_) => control_in == 0 && control_out == 1,
            NodeRole::Action => control_in == 1 && control_out == 1,
            NodeRole::Branch => control_in == 1 && control_out > 1,
            NodeRole::Data => control_in == 0 && control_out == 0,
        }
    }

    /// Kind of a named input field, if the field exists
    pub fn field_kind(&self, field: &str) -> Option<ValueKind> {
        self.input(field).map(|p| p.kind)
    }

    /// Check whether a port with this ID is one of the node's inputs
    pub fn owns_input(&self, port_id: PortId) -> bool {
        self.inputs.iter().any(|p| p.id == port_id)
    }
}

/// Validate that a port list has unique names per direction
pub fn port_names_unique(ports: &[Port], direction: PortDirection) -> bool {
    let names: Vec<&str> = ports
        .iter()
        .filter(|p| p.direction == direction)
        .map(|p| p.name.as_str())
        .collect();
    let mut seen = std::collections::HashSet::new();
    names.iter().all(|n| seen.insert(*n))
}
