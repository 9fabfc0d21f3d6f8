// SPDX-License-Identifier: MIT OR Apache-2.0
//! Data nodes, pulled on demand from off the control path.

use crate::behavior::{Behavior, BehaviorRegistry, EvalContext, EvalError};
use crate::formula::{Formula, FormulaError};
use crate::status::NodeStatus;
use tickweave_graph::node::{Node, NodeRole};
use tickweave_graph::port::{Port, Value, ValueKind};

/// Data node holding a fixed value.
pub fn constant(value: Value) -> Node {
    let kind = value.kind();
    Node::new(NodeRole::Data, "constant")
        .with_input(Port::input("value", kind))
        .with_output(Port::output("value", kind))
        .with_literal("value", value)
}

/// Data node reading a blackboard or parameter slot.
///
/// The constructor only declares the ports; bind the `value` input to a
/// store slot with [`Graph::bind_input`] once the node is in a graph.
///
/// [`Graph::bind_input`]: tickweave_graph::graph::Graph::bind_input
pub fn get_variable(kind: ValueKind) -> Node {
    Node::new(NodeRole::Data, "get_variable")
        .with_input(Port::input("value", kind))
        .with_output(Port::output("value", kind))
}

/// Data node reporting the current tick and its own pull count.
pub fn tick_probe() -> Node {
    Node::new(NodeRole::Data, "tick_probe")
        .with_output(Port::output("tick", ValueKind::Number))
        .with_output(Port::output("evaluations", ValueKind::Number))
}

/// Data node evaluating a numeric formula.
///
/// Free variables of the formula become `Number` inputs in first-use order.
/// The text itself is stored as a literal binding on the `formula` input, so
/// it can be rewritten like any other field; the behavior recompiles when
/// the resolved text changes.
///
/// # Errors
/// Returns the compile error when `text` does not parse.
pub fn formula(text: &str) -> Result<Node, FormulaError> {
    formula_node(text, ValueKind::Number)
}

/// Data node evaluating a formula down to a boolean.
///
/// Same contract as [`formula`], with a `Bool` result port for feeding
/// branch conditions.
///
/// # Errors
/// Returns the compile error when `text` does not parse.
pub fn predicate(text: &str) -> Result<Node, FormulaError> {
    formula_node(text, ValueKind::Bool)
}

fn formula_node(text: &str, result: ValueKind) -> Result<Node, FormulaError> {
    let compiled = Formula::compile(text)?;
    let mut node = Node::new(NodeRole::Data, "formula")
        .with_input(Port::input("formula", ValueKind::Text))
        .with_output(Port::output("value", result));
    for variable in compiled.variables() {
        // "formula" is the text field itself and cannot double as a variable
        // port; such a variable stays unresolvable.
        if variable != "formula" {
            node = node.with_input(Port::input(variable.clone(), ValueKind::Number));
        }
    }
    Ok(node.with_literal("formula", Value::Text(text.to_string())))
}

/// Forwards the resolved `value` input to the `value` output.
///
/// Serves both `constant` and `get_variable`; the two differ only in how
/// the input is bound.
#[derive(Debug, Default)]
pub struct PassthroughBehavior;

impl Behavior for PassthroughBehavior {
    fn evaluate(&mut self, ctx: &mut EvalContext) -> Result<NodeStatus, EvalError> {
        let value = ctx
            .input("value")
            .cloned()
            .ok_or_else(|| EvalError::MissingInput("value".to_string()))?;
        ctx.set_output("value", value);
        Ok(NodeStatus::Finished)
    }
}

/// Publishes the current tick and how many times the node has been pulled.
///
/// The pull count makes evaluation visible: two consumers pulling in the
/// same tick observe different `evaluations` values, since data nodes are
/// never cached.
#[derive(Debug, Default)]
pub struct TickProbeBehavior {
    evaluations: u64,
}

impl Behavior for TickProbeBehavior {
    fn evaluate(&mut self, ctx: &mut EvalContext) -> Result<NodeStatus, EvalError> {
        self.evaluations += 1;
        ctx.set_output("tick", Value::Number(ctx.tick as f64));
        ctx.set_output("evaluations", Value::Number(self.evaluations as f64));
        Ok(NodeStatus::Finished)
    }
}

/// Compiles and evaluates the `formula` input text.
///
/// The compiled form is kept per instance and refreshed when the text
/// changes. A compile failure aborts the node and stays visible as its
/// diagnostic until a later compile clears it.
#[derive(Debug, Default)]
pub struct FormulaBehavior {
    compiled: Option<Formula>,
    diagnostic: Option<String>,
}

impl Behavior for FormulaBehavior {
    fn evaluate(&mut self, ctx: &mut EvalContext) -> Result<NodeStatus, EvalError> {
        let text = ctx.text("formula")?;
        if self.compiled.as_ref().map_or(true, |f| f.text() != text) {
            match Formula::compile(text) {
                Ok(compiled) => {
                    self.compiled = Some(compiled);
                    self.diagnostic = None;
                }
                Err(err) => {
                    let message = err.to_string();
                    self.compiled = None;
                    self.diagnostic = Some(message.clone());
                    return Err(EvalError::Message(message));
                }
            }
        }
        let formula = match self.compiled.as_ref() {
            Some(formula) => formula,
            None => return Err(EvalError::Message("formula is not compiled".to_string())),
        };
        let value = formula
            .evaluate(&|name| ctx.input(name).cloned())
            .map_err(|err| EvalError::Message(err.to_string()))?;
        ctx.set_output("value", value);
        Ok(NodeStatus::Finished)
    }

    fn diagnostic(&self) -> Option<&str> {
        self.diagnostic.as_deref()
    }
}

pub(crate) fn register(registry: &mut BehaviorRegistry) {
    registry.register("constant", |_node| Box::new(PassthroughBehavior));
    registry.register("get_variable", |_node| Box::new(PassthroughBehavior));
    registry.register("tick_probe", |_node| Box::new(TickProbeBehavior::default()));
    registry.register("formula", |_node| Box::new(FormulaBehavior::default()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use tickweave_graph::node::EntryKind;
    use tickweave_graph::variable::{SharedStore, VariableStore};

    fn context<'a>(
        inputs: IndexMap<String, Value>,
        blackboard: &'a SharedStore,
        parameters: &'a SharedStore,
        tick: u64,
    ) -> EvalContext<'a> {
        EvalContext::new(inputs, blackboard, parameters, tick, 1.0, EntryKind::Update)
    }

    #[test]
    fn test_data_constructors_match_role() {
        for node in [
            constant(Value::Number(1.0)),
            get_variable(ValueKind::Text),
            tick_probe(),
            formula("a + 1").unwrap(),
            predicate("a > 0").unwrap(),
        ] {
            assert!(node.ports_match_role(), "bad ports on '{}'", node.name);
        }
    }

    #[test]
    fn test_constant_forwards_its_literal_kind() {
        let node = constant(Value::Text("ready".to_string()));
        assert_eq!(node.field_kind("value"), Some(ValueKind::Text));
        assert_eq!(node.output("value").map(|p| p.kind), Some(ValueKind::Text));
    }

    #[test]
    fn test_passthrough_copies_input_to_output() {
        let blackboard = VariableStore::new().into_shared();
        let parameters = VariableStore::new().into_shared();
        let mut inputs = IndexMap::new();
        inputs.insert("value".to_string(), Value::Vec3([1.0, 2.0, 3.0]));
        let mut ctx = context(inputs, &blackboard, &parameters, 0);

        PassthroughBehavior.evaluate(&mut ctx).unwrap();
        let (outputs, _) = ctx.finish();
        assert_eq!(outputs.get("value"), Some(&Value::Vec3([1.0, 2.0, 3.0])));
    }

    #[test]
    fn test_tick_probe_counts_every_pull() {
        let blackboard = VariableStore::new().into_shared();
        let parameters = VariableStore::new().into_shared();
        let mut behavior = TickProbeBehavior::default();

        for expected in 1..=3 {
            let mut ctx = context(IndexMap::new(), &blackboard, &parameters, 7);
            behavior.evaluate(&mut ctx).unwrap();
            let (outputs, _) = ctx.finish();
            assert_eq!(outputs.get("tick"), Some(&Value::Number(7.0)));
            assert_eq!(
                outputs.get("evaluations"),
                Some(&Value::Number(f64::from(expected)))
            );
        }
    }

    #[test]
    fn test_formula_constructor_grows_variable_ports() {
        let node = formula("b + a * b").unwrap();
        let inputs: Vec<&str> = node.inputs.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(inputs, ["formula", "b", "a"]);
        assert_eq!(node.field_kind("a"), Some(ValueKind::Number));
    }

    #[test]
    fn test_formula_rejects_bad_text() {
        assert!(formula("1 +").is_err());
        assert!(formula("blorp(2)").is_err());
    }

    #[test]
    fn test_formula_evaluates_with_inputs() {
        let blackboard = VariableStore::new().into_shared();
        let parameters = VariableStore::new().into_shared();
        let mut behavior = FormulaBehavior::default();

        let mut inputs = IndexMap::new();
        inputs.insert("formula".to_string(), Value::Text("x * 2 + 1".to_string()));
        inputs.insert("x".to_string(), Value::Number(3.0));
        let mut ctx = context(inputs, &blackboard, &parameters, 0);

        behavior.evaluate(&mut ctx).unwrap();
        let (outputs, _) = ctx.finish();
        assert_eq!(outputs.get("value"), Some(&Value::Number(7.0)));
        assert!(behavior.diagnostic().is_none());
    }

    #[test]
    fn test_formula_recompiles_when_text_changes() {
        let blackboard = VariableStore::new().into_shared();
        let parameters = VariableStore::new().into_shared();
        let mut behavior = FormulaBehavior::default();

        for (text, expected) in [("x + 1", 4.0), ("x * 10", 30.0)] {
            let mut inputs = IndexMap::new();
            inputs.insert("formula".to_string(), Value::Text(text.to_string()));
            inputs.insert("x".to_string(), Value::Number(3.0));
            let mut ctx = context(inputs, &blackboard, &parameters, 0);

            behavior.evaluate(&mut ctx).unwrap();
            let (outputs, _) = ctx.finish();
            assert_eq!(outputs.get("value"), Some(&Value::Number(expected)));
        }
    }

    #[test]
    fn test_formula_compile_failure_keeps_diagnostic() {
        let blackboard = VariableStore::new().into_shared();
        let parameters = VariableStore::new().into_shared();
        let mut behavior = FormulaBehavior::default();

        let mut inputs = IndexMap::new();
        inputs.insert("formula".to_string(), Value::Text("1 +".to_string()));
        let mut ctx = context(inputs, &blackboard, &parameters, 0);

        assert!(behavior.evaluate(&mut ctx).is_err());
        assert!(behavior.diagnostic().is_some());
    }
}
