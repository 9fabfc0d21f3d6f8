// SPDX-License-Identifier: MIT OR Apache-2.0
//! Execution status types shared by behaviors and the tick runner.

use serde::{Deserialize, Serialize};

/// Result of one node evaluation
///
/// Suspension is observable data, not a language construct: a behavior that
/// spans ticks returns `Unfinished` and is re-evaluated from the same chain
/// position on the next drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeStatus {
    /// The node completed; control may advance this tick
    Finished,
    /// The node needs more ticks; its chain suspends here
    Unfinished,
    /// The node failed; advancement follows the runner's abort policy
    Abort,
}

impl NodeStatus {
    /// Check if this status suspends the chain
    pub fn suspends(&self) -> bool {
        matches!(self, NodeStatus::Unfinished)
    }
}

/// Aggregate status of one entry family after a drive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CategoryStatus {
    /// Every chain of the family ran to completion this tick
    Finished,
    /// At least one chain is suspended mid-execution
    Unfinished,
}

impl CategoryStatus {
    /// Check if every chain completed
    pub fn is_finished(&self) -> bool {
        matches!(self, CategoryStatus::Finished)
    }
}

/// How the runner advances past a node that aborted
///
/// An abort is always logged and always clears the node's activation state;
/// the policy decides whether the chain keeps walking. Other chains of the
/// category run regardless.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AbortPolicy {
    /// Follow the aborted node's control successor as if it had finished
    #[default]
    Continue,
    /// End the chain and restart it from its entry node next tick
    Halt,
}
