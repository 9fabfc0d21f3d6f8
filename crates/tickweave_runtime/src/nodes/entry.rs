// SPDX-License-Identifier: MIT OR Apache-2.0
//! Entry nodes, the roots control-flow chains start from.

use crate::behavior::{Behavior, BehaviorRegistry, EvalContext, EvalError};
use crate::status::NodeStatus;
use tickweave_graph::node::{EntryKind, Node, NodeRole};
use tickweave_graph::port::{Port, Value, ValueKind};

/// Entry node driven once when the instance starts.
pub fn start() -> Node {
    entry_node(EntryKind::Start, "start")
}

/// Entry node driven every tick.
pub fn update() -> Node {
    entry_node(EntryKind::Update, "update")
}

/// Entry node driven when the host fires a trigger event.
pub fn trigger() -> Node {
    entry_node(EntryKind::Trigger, "trigger")
}

fn entry_node(kind: EntryKind, behavior: &str) -> Node {
    Node::new(NodeRole::Entry(kind), behavior)
        .with_output(Port::exec_output("out"))
        .with_output(Port::output("tick", ValueKind::Number))
}

/// Behavior shared by all entry kinds: publish the driving tick and hand
/// control straight to the successor.
#[derive(Debug, Default)]
pub struct EntryBehavior;

impl Behavior for EntryBehavior {
    fn evaluate(&mut self, ctx: &mut EvalContext) -> Result<NodeStatus, EvalError> {
        ctx.set_output("tick", Value::Number(ctx.tick as f64));
        Ok(NodeStatus::Finished)
    }
}

pub(crate) fn register(registry: &mut BehaviorRegistry) {
    registry.register("start", |_node| Box::new(EntryBehavior));
    registry.register("update", |_node| Box::new(EntryBehavior));
    registry.register("trigger", |_node| Box::new(EntryBehavior));
}
