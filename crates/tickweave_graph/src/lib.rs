// SPDX-License-Identifier: MIT OR Apache-2.0
//! Behavior graph model for Tickweave.
//!
//! This crate defines the authored side of a behavior graph:
//! - Typed nodes with control and data ports
//! - Connection validation with kind conversions
//! - Blackboard and parameter variable stores
//! - Field bindings from data inputs to literals or variables
//! - RON serialization for graph assets
//!
//! Execution lives in `tickweave_runtime`; this crate never ticks anything.
//! A [`graph::Graph`] is plain data that runners borrow, so one asset can
//! drive any number of concurrent runs.

pub mod binding;
pub mod connection;
pub mod convert;
pub mod graph;
pub mod node;
pub mod port;
pub mod variable;

pub use binding::Binding;
pub use connection::{Connection, ConnectionId};
pub use convert::ConversionRegistry;
pub use graph::{Graph, GraphError, FORMAT_VERSION};
pub use node::{EntryKind, Node, NodeId, NodeRole};
pub use port::{Port, PortDirection, PortId, Value, ValueKind};
pub use variable::{
    instantiate_parameters, ParameterDef, SharedStore, VariableError, VariableId, VariableSlot,
    VariableStore,
};
