// SPDX-License-Identifier: MIT OR Apache-2.0
//! Branch nodes, each selecting one control successor per evaluation.

use crate::behavior::{Behavior, BehaviorRegistry, EvalContext, EvalError};
use crate::status::NodeStatus;
use tickweave_graph::node::{Node, NodeRole};
use tickweave_graph::port::{Port, ValueKind};

/// Two-way branch on a boolean `condition` input.
pub fn branch() -> Node {
    Node::new(NodeRole::Branch, "branch")
        .with_input(Port::exec_input("in"))
        .with_input(Port::input("condition", ValueKind::Bool))
        .with_output(Port::exec_output("true"))
        .with_output(Port::exec_output("false"))
}

/// Multi-way branch on a text `selector` input.
///
/// One control output per case, plus a `default` output taken when no case
/// matches.
pub fn switch_text(cases: &[&str]) -> Node {
    let mut node = Node::new(NodeRole::Branch, "switch_text")
        .with_input(Port::exec_input("in"))
        .with_input(Port::input("selector", ValueKind::Text));
    for case in cases {
        node = node.with_output(Port::exec_output(*case));
    }
    node.with_output(Port::exec_output("default"))
}

/// Selects the `true` or `false` output from the `condition` input.
#[derive(Debug, Default)]
pub struct BranchBehavior;

impl Behavior for BranchBehavior {
    fn evaluate(&mut self, ctx: &mut EvalContext) -> Result<NodeStatus, EvalError> {
        let condition = ctx.boolean("condition")?;
        ctx.select_output(if condition { "true" } else { "false" });
        Ok(NodeStatus::Finished)
    }
}

/// Selects the case output matching the `selector` input, or `default`.
#[derive(Debug)]
pub struct SwitchTextBehavior {
    cases: Vec<String>,
}

impl SwitchTextBehavior {
    /// Build from a node; the cases are its control output names.
    pub fn from_node(node: &Node) -> Self {
        Self {
            cases: node.control_outputs().map(|p| p.name.clone()).collect(),
        }
    }
}

impl Behavior for SwitchTextBehavior {
    fn evaluate(&mut self, ctx: &mut EvalContext) -> Result<NodeStatus, EvalError> {
        let selector = ctx.text("selector")?;
        let matched = self
            .cases
            .iter()
            .find(|case| case.as_str() == selector && case.as_str() != "default");
        match matched {
            Some(case) => ctx.select_output(case.as_str()),
            None => ctx.select_output("default"),
        }
        Ok(NodeStatus::Finished)
    }
}

pub(crate) fn register(registry: &mut BehaviorRegistry) {
    registry.register("branch", |_node| Box::new(BranchBehavior));
    registry.register("switch_text", |node| {
        Box::new(SwitchTextBehavior::from_node(node))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use tickweave_graph::node::EntryKind;
    use tickweave_graph::port::Value;
    use tickweave_graph::variable::VariableStore;

    fn selection(behavior: &mut dyn Behavior, inputs: IndexMap<String, Value>) -> Option<String> {
        let blackboard = VariableStore::new().into_shared();
        let parameters = VariableStore::new().into_shared();
        let mut ctx = EvalContext::new(
            inputs,
            &blackboard,
            &parameters,
            0,
            1.0,
            EntryKind::Update,
        );
        behavior.evaluate(&mut ctx).unwrap();
        let (_, active) = ctx.finish();
        active
    }

    #[test]
    fn test_branch_constructor_matches_role() {
        let node = branch();
        assert!(node.ports_match_role());
        assert_eq!(node.control_outputs().count(), 2);
    }

    #[test]
    fn test_branch_selects_by_condition() {
        let mut behavior = BranchBehavior;
        for (condition, expected) in [(true, "true"), (false, "false")] {
            let mut inputs = IndexMap::new();
            inputs.insert("condition".to_string(), Value::Bool(condition));
            assert_eq!(selection(&mut behavior, inputs).as_deref(), Some(expected));
        }
    }

    #[test]
    fn test_branch_without_condition_is_error() {
        let blackboard = VariableStore::new().into_shared();
        let parameters = VariableStore::new().into_shared();
        let mut ctx = EvalContext::new(
            IndexMap::new(),
            &blackboard,
            &parameters,
            0,
            1.0,
            EntryKind::Update,
        );
        let err = BranchBehavior.evaluate(&mut ctx).unwrap_err();
        assert!(matches!(err, EvalError::MissingInput(_)));
    }

    #[test]
    fn test_switch_selects_case_or_default() {
        let node = switch_text(&["red", "blue"]);
        assert!(node.ports_match_role());
        assert_eq!(node.control_outputs().count(), 3);

        let mut behavior = SwitchTextBehavior::from_node(&node);
        for (selector, expected) in [("blue", "blue"), ("green", "default")] {
            let mut inputs = IndexMap::new();
            inputs.insert("selector".to_string(), Value::Text(selector.to_string()));
            assert_eq!(selection(&mut behavior, inputs).as_deref(), Some(expected));
        }
    }
}
