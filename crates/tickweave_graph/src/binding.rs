// SPDX-License-Identifier: MIT OR Apache-2.0
//! Field bindings: where a data input gets its value before evaluation.

use crate::port::Value;
use crate::variable::VariableId;
use serde::{Deserialize, Serialize};

/// Source of a node input field's value
///
/// Every bound data input is in exactly one of these states. Store-backed
/// bindings are re-read immediately before each evaluation of the node; a
/// field fed by a data connection takes the pulled connection value instead,
/// so connected fields always see the freshest producer output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Binding {
    /// Fixed value stored on the node
    Literal(Value),
    /// Live reference into the graph-scoped blackboard
    Blackboard(VariableId),
    /// Live reference into the per-run parameter store
    Parameter(VariableId),
}

impl Binding {
    /// Check if this is a literal binding
    pub fn is_literal(&self) -> bool {
        matches!(self, Self::Literal(_))
    }

    /// The referenced store entry, for store-backed bindings
    pub fn variable_id(&self) -> Option<VariableId> {
        match self {
            Self::Literal(_) => None,
            Self::Blackboard(id) | Self::Parameter(id) => Some(*id),
        }
    }
}
