// SPDX-License-Identifier: MIT OR Apache-2.0
//! Connections: directed edges between a producing and a consuming port.

use crate::node::NodeId;
use crate::port::PortId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    /// Create a new random connection ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

/// A directed edge from an output port to an input port
///
/// Carries either control flow (both ports `Exec`) or data (both ports data
/// kinds, possibly differing when a conversion is registered for the pair).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connection {
    /// Unique connection ID
    pub id: ConnectionId,
    /// Producing node
    pub source_node: NodeId,
    /// Producing output port
    pub source_port: PortId,
    /// Consuming node
    pub target_node: NodeId,
    /// Consuming input port
    pub target_port: PortId,
}

impl Connection {
    /// Create a new connection
    pub fn new(
        source_node: NodeId,
        source_port: PortId,
        target_node: NodeId,
        target_port: PortId,
    ) -> Self {
        Self {
            id: ConnectionId::new(),
            source_node,
            source_port,
            target_node,
            target_port,
        }
    }

    /// Check if this connection touches a specific node
    pub fn involves_node(&self, node_id: NodeId) -> bool {
        self.source_node == node_id || self.target_node == node_id
    }

    /// The node on the other end, if `node_id` is one of the endpoints
    pub fn other_end(&self, node_id: NodeId) -> Option<NodeId> {
        if self.source_node == node_id {
            Some(self.target_node)
        } else if self.target_node == node_id {
            Some(self.source_node)
        } else {
            None
        }
    }
}
