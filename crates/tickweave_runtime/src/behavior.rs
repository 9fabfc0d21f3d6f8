// SPDX-License-Identifier: MIT OR Apache-2.0
//! The node contract: per-node evaluation logic behind a trait object.
//!
//! Structure (roles, ports) lives in `tickweave_graph`; behavior lives here.
//! Each node names a registered behavior type, and the runner instantiates
//! one behavior object per node so per-node state (timers, counters) persists
//! across ticks until the reset hook clears it.

use crate::status::NodeStatus;
use indexmap::IndexMap;
use thiserror::Error;
use tickweave_graph::node::{EntryKind, Node};
use tickweave_graph::port::{Value, ValueKind};
use tickweave_graph::variable::{SharedStore, VariableId};

/// Error raised inside a node evaluation
///
/// These never fail the drive call: the runner logs them and treats the node
/// as having returned [`NodeStatus::Abort`].
#[derive(Debug, Error)]
pub enum EvalError {
    /// A required input slot has no value
    #[error("Missing input '{0}'")]
    MissingInput(String),

    /// An input slot holds a different kind than the behavior expects
    #[error("Input '{port}' is {got:?}, expected {expected:?}")]
    KindMismatch {
        /// Input slot name
        port: String,
        /// Kind the behavior expects
        expected: ValueKind,
        /// Kind actually present
        got: ValueKind,
    },

    /// A connected producer has not published the pulled output yet
    #[error("Output '{port}' of node '{producer}' is not available yet")]
    OutputNotReady {
        /// Producing node name
        producer: String,
        /// Pulled output port name
        port: String,
    },

    /// A registered conversion disappeared between connect and propagation
    #[error("No conversion from {from:?} to {to:?}")]
    NoConversion {
        /// Produced kind
        from: ValueKind,
        /// Consumed kind
        to: ValueKind,
    },

    /// A store lookup by stable ID found nothing
    #[error("Unknown variable: {0:?}")]
    UnknownVariable(VariableId),

    /// A store lookup by display name found nothing
    #[error("Unknown variable name: '{0}'")]
    UnknownName(String),

    /// Behavior-specific failure
    #[error("{0}")]
    Message(String),
}

/// Everything a behavior sees while evaluating one node for one tick
///
/// Input slots are filled by the runner immediately before evaluation, from
/// connections (pulled depth-first), field bindings, or kind defaults, in
/// that order of precedence. Outputs written here are published for
/// downstream consumers after the evaluation returns.
pub struct EvalContext<'run> {
    inputs: IndexMap<String, Value>,
    outputs: IndexMap<String, Value>,
    active_output: Option<String>,
    /// Blackboard store of the run
    pub blackboard: &'run SharedStore,
    /// Parameter store of the run
    pub parameters: &'run SharedStore,
    /// Tick index within the driving category, starting at 0
    pub tick: u64,
    /// Seconds advanced by this tick
    pub dt: f64,
    /// Entry family being driven
    pub category: EntryKind,
}

impl<'run> EvalContext<'run> {
    /// Create a context with pre-resolved input slots
    pub fn new(
        inputs: IndexMap<String, Value>,
        blackboard: &'run SharedStore,
        parameters: &'run SharedStore,
        tick: u64,
        dt: f64,
        category: EntryKind,
    ) -> Self {
        Self {
            inputs,
            outputs: IndexMap::new(),
            active_output: None,
            blackboard,
            parameters,
            tick,
            dt,
            category,
        }
    }

    /// Resolved value of an input slot
    pub fn input(&self, name: &str) -> Option<&Value> {
        self.inputs.get(name)
    }

    /// Number value of an input slot
    pub fn number(&self, name: &str) -> Result<f64, EvalError> {
        match self.inputs.get(name) {
            Some(Value::Number(n)) => Ok(*n),
            Some(other) => Err(EvalError::KindMismatch {
                port: name.to_string(),
                expected: ValueKind::Number,
                got: other.kind(),
            }),
            None => Err(EvalError::MissingInput(name.to_string())),
        }
    }

    /// Bool value of an input slot
    pub fn boolean(&self, name: &str) -> Result<bool, EvalError> {
        match self.inputs.get(name) {
            Some(Value::Bool(b)) => Ok(*b),
            Some(other) => Err(EvalError::KindMismatch {
                port: name.to_string(),
                expected: ValueKind::Bool,
                got: other.kind(),
            }),
            None => Err(EvalError::MissingInput(name.to_string())),
        }
    }

    /// Text value of an input slot
    pub fn text(&self, name: &str) -> Result<&str, EvalError> {
        match self.inputs.get(name) {
            Some(Value::Text(s)) => Ok(s),
            Some(other) => Err(EvalError::KindMismatch {
                port: name.to_string(),
                expected: ValueKind::Text,
                got: other.kind(),
            }),
            None => Err(EvalError::MissingInput(name.to_string())),
        }
    }

    /// Publish a value on a named data output
    pub fn set_output(&mut self, name: impl Into<String>, value: Value) {
        self.outputs.insert(name.into(), value);
    }

    /// Select the control output to follow after this evaluation
    ///
    /// Branch behaviors must call this exactly once per evaluation; nodes
    /// with a single control output may skip it and the runner follows the
    /// sole output.
    pub fn select_output(&mut self, name: impl Into<String>) {
        self.active_output = Some(name.into());
    }

    /// Consume the context, yielding produced outputs and the selected
    /// control output
    pub fn finish(self) -> (IndexMap<String, Value>, Option<String>) {
        (self.outputs, self.active_output)
    }
}

/// Evaluation logic for one node kind
///
/// Implementations are stateful per node instance: the runner creates one
/// object per node and keeps it alive for the lifetime of the run.
///
/// Failures expressible as [`EvalError`] abort the chain. Anything else a
/// node swallows internally should log and return Finished rather than
/// stall its chain.
pub trait Behavior: Send {
    /// Evaluate the node for this tick
    fn evaluate(&mut self, ctx: &mut EvalContext) -> Result<NodeStatus, EvalError>;

    /// Clear per-activation state when control leaves the node
    ///
    /// Called after the node returns Finished or Abort, so a later activation
    /// in the same run starts fresh. Persistent instance state (activation
    /// counters) may survive; timers must not.
    fn reset(&mut self) {}

    /// Node-local diagnostic text, if the behavior is in an error state
    fn diagnostic(&self) -> Option<&str> {
        None
    }
}

/// Factory producing one behavior instance for one node
pub type BehaviorFactory = Box<dyn Fn(&Node) -> Box<dyn Behavior> + Send + Sync>;

/// Registry mapping behavior type names to factories
///
/// The counterpart of the graph-side node catalog: a node's `behavior` string
/// is looked up here when a runner is constructed. Hosts extend the builtin
/// set by registering their own factories.
#[derive(Default)]
pub struct BehaviorRegistry {
    factories: IndexMap<String, BehaviorFactory>,
}

impl BehaviorRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            factories: IndexMap::new(),
        }
    }

    /// Create a registry with the builtin behaviors registered
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        crate::nodes::register_builtins(&mut registry);
        registry
    }

    /// Register a behavior factory under a type name
    pub fn register<F>(&mut self, behavior: impl Into<String>, factory: F)
    where
        F: Fn(&Node) -> Box<dyn Behavior> + Send + Sync + 'static,
    {
        self.factories.insert(behavior.into(), Box::new(factory));
    }

    /// Instantiate the behavior for a node, if its type name is registered
    pub fn instantiate(&self, node: &Node) -> Option<Box<dyn Behavior>> {
        self.factories.get(&node.behavior).map(|factory| factory(node))
    }

    /// Check whether a behavior type name is registered
    pub fn contains(&self, behavior: &str) -> bool {
        self.factories.contains_key(behavior)
    }

    /// Registered type names in registration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for BehaviorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BehaviorRegistry")
            .field("behaviors", &self.factories.len())
            .finish()
    }
}
