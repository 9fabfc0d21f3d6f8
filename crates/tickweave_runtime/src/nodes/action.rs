// SPDX-License-Identifier: MIT OR Apache-2.0
//! Action nodes, the side-effecting steps on a control-flow chain.

use crate::behavior::{Behavior, BehaviorRegistry, EvalContext, EvalError};
use crate::status::NodeStatus;
use tickweave_graph::node::{Node, NodeRole};
use tickweave_graph::port::{Port, Value, ValueKind};
use tickweave_graph::variable::VariableError;
use tracing::info;

/// Action that writes its `message` input to the log.
pub fn log(message: &str) -> Node {
    Node::new(NodeRole::Action, "log")
        .with_input(Port::exec_input("in"))
        .with_input(Port::input("message", ValueKind::Text))
        .with_output(Port::exec_output("out"))
        .with_literal("message", Value::Text(message.to_string()))
}

/// Action that suspends its chain until `seconds` of tick time have passed.
pub fn wait(seconds: f64) -> Node {
    Node::new(NodeRole::Action, "wait")
        .with_input(Port::exec_input("in"))
        .with_input(Port::input("duration", ValueKind::Number))
        .with_output(Port::exec_output("out"))
        .with_literal("duration", Value::Number(seconds))
}

/// Action that writes its `value` input to the blackboard entry named by its
/// `name` input.
pub fn set_variable(name: &str, kind: ValueKind) -> Node {
    Node::new(NodeRole::Action, "set_variable")
        .with_input(Port::exec_input("in"))
        .with_input(Port::input("name", ValueKind::Text))
        .with_input(Port::input("value", kind))
        .with_output(Port::exec_output("out"))
        .with_literal("name", Value::Text(name.to_string()))
}

/// Action that counts its activations and publishes the running count.
pub fn counter_bump() -> Node {
    Node::new(NodeRole::Action, "counter_bump")
        .with_input(Port::exec_input("in"))
        .with_output(Port::exec_output("out"))
        .with_output(Port::output("count", ValueKind::Number))
}

/// Logs the resolved `message` input at info level.
#[derive(Debug, Default)]
pub struct LogBehavior;

impl Behavior for LogBehavior {
    fn evaluate(&mut self, ctx: &mut EvalContext) -> Result<NodeStatus, EvalError> {
        let message = ctx.text("message")?;
        info!(tick = ctx.tick, category = %ctx.category, "{message}");
        Ok(NodeStatus::Finished)
    }
}

/// Accumulates tick time until the `duration` input is reached.
///
/// The timer is activation state: it restarts from zero whenever control
/// re-enters the node.
#[derive(Debug, Default)]
pub struct WaitBehavior {
    elapsed: f64,
}

impl Behavior for WaitBehavior {
    fn evaluate(&mut self, ctx: &mut EvalContext) -> Result<NodeStatus, EvalError> {
        let duration = ctx.number("duration")?;
        self.elapsed += ctx.dt;
        if self.elapsed >= duration {
            Ok(NodeStatus::Finished)
        } else {
            Ok(NodeStatus::Unfinished)
        }
    }

    fn reset(&mut self) {
        self.elapsed = 0.0;
    }
}

/// Writes the `value` input to the blackboard slot named by `name`.
///
/// A name with no slot behind it is an evaluation error, which the runner
/// turns into an abort of the chain.
#[derive(Debug, Default)]
pub struct SetVariableBehavior;

impl Behavior for SetVariableBehavior {
    fn evaluate(&mut self, ctx: &mut EvalContext) -> Result<NodeStatus, EvalError> {
        let name = ctx.text("name")?;
        let value = ctx
            .input("value")
            .cloned()
            .ok_or_else(|| EvalError::MissingInput("value".to_string()))?;
        ctx.blackboard
            .write()
            .set_named(name, value)
            .map_err(|err| match err {
                VariableError::UnknownName(unknown) => EvalError::UnknownName(unknown),
                other => EvalError::Message(other.to_string()),
            })?;
        Ok(NodeStatus::Finished)
    }
}

/// Counts activations; the count is instance history and survives reset.
#[derive(Debug, Default)]
pub struct CounterBehavior {
    count: u64,
}

impl Behavior for CounterBehavior {
    fn evaluate(&mut self, ctx: &mut EvalContext) -> Result<NodeStatus, EvalError> {
        self.count += 1;
        ctx.set_output("count", Value::Number(self.count as f64));
        Ok(NodeStatus::Finished)
    }
}

pub(crate) fn register(registry: &mut BehaviorRegistry) {
    registry.register("log", |_node| Box::new(LogBehavior));
    registry.register("wait", |_node| Box::new(WaitBehavior::default()));
    registry.register("set_variable", |_node| Box::new(SetVariableBehavior));
    registry.register("counter_bump", |_node| Box::new(CounterBehavior::default()));
}
