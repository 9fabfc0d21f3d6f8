// SPDX-License-Identifier: MIT OR Apache-2.0
//! Ports and the values that move through them.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortId(pub Uuid);

impl PortId {
    /// Create a new random port ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PortId {
    fn default() -> Self {
        Self::new()
    }
}

/// Port direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortDirection {
    /// Input port
    Input,
    /// Output port
    Output,
}

/// Kind of value a port moves
///
/// `Exec` marks control-flow ports; every other kind is data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    /// Execution link (control flow)
    Exec,
    /// Boolean value
    Bool,
    /// Floating point number
    Number,
    /// Text value
    Text,
    /// 3D vector
    Vec3,
}

impl ValueKind {
    /// Check if this kind carries data (everything except `Exec`)
    pub fn is_data(&self) -> bool {
        !matches!(self, Self::Exec)
    }

    /// Default value for a data kind, `None` for `Exec`
    pub fn default_value(&self) -> Option<Value> {
        match self {
            Self::Exec => None,
            Self::Bool => Some(Value::Bool(false)),
            Self::Number => Some(Value::Number(0.0)),
            Self::Text => Some(Value::Text(String::new())),
            Self::Vec3 => Some(Value::Vec3([0.0; 3])),
        }
    }
}

/// A value held in a variable slot or carried along a data connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Boolean
    Bool(bool),
    /// Floating point number
    Number(f64),
    /// Text
    Text(String),
    /// 3D vector
    Vec3([f64; 3]),
}

impl Value {
    /// Get the kind of this value
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Bool(_) => ValueKind::Bool,
            Self::Number(_) => ValueKind::Number,
            Self::Text(_) => ValueKind::Text,
            Self::Vec3(_) => ValueKind::Vec3,
        }
    }

    /// Boolean payload, if this is a `Bool`
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Numeric payload, if this is a `Number`
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Text payload, if this is a `Text`
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Vector payload, if this is a `Vec3`
    pub fn as_vec3(&self) -> Option<[f64; 3]> {
        match self {
            Self::Vec3(v) => Some(*v),
            _ => None,
        }
    }
}

/// A port on a node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Port {
    /// Unique port ID
    pub id: PortId,
    /// Port name, unique per node and direction
    pub name: String,
    /// Port direction
    pub direction: PortDirection,
    /// Kind of value moved through this port
    pub kind: ValueKind,
}

impl Port {
    /// Create a new input port
    pub fn input(name: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            id: PortId::new(),
            name: name.into(),
            direction: PortDirection::Input,
            kind,
        }
    }

    /// Create a new output port
    pub fn output(name: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            id: PortId::new(),
            name: name.into(),
            direction: PortDirection::Output,
            kind,
        }
    }

    /// Create a control-flow input port
    pub fn exec_input(name: impl Into<String>) -> Self {
        Self::input(name, ValueKind::Exec)
    }

    /// Create a control-flow output port
    pub fn exec_output(name: impl Into<String>) -> Self {
        Self::output(name, ValueKind::Exec)
    }

    /// Check if this is a control-flow port
    pub fn is_exec(&self) -> bool {
        self.kind == ValueKind::Exec
    }

    /// Check if this port accepts more than one connection
    ///
    /// Control flow fans in (several chains may converge on one node) while
    /// data fans out (one producer may feed several consumers). The opposite
    /// pairings are single-connection: a control output names one successor
    /// and a data input has one producer.
    pub fn allows_multiple(&self) -> bool {
        match self.direction {
            PortDirection::Input => self.is_exec(),
            PortDirection::Output => !self.is_exec(),
        }
    }
}
