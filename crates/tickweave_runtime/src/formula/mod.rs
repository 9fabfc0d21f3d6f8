// SPDX-License-Identifier: MIT OR Apache-2.0
//! Arithmetic/logic formulas evaluated by data nodes.
//!
//! A formula is authored as plain text (`"speed * dt + 1"`), compiled once
//! into an AST, and evaluated against whatever values the surrounding node
//! resolves for its free variables. Compilation also reports those free
//! variables so the node can grow one input port per name.

pub mod eval;
pub mod lexer;
pub mod parser;

use thiserror::Error;
use tickweave_graph::port::{Value, ValueKind};

use self::parser::Expr;

/// Compilation or evaluation failure for a formula.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormulaError {
    /// Input contained characters no token matches
    #[error("Unrecognized input '{0}'")]
    Lex(String),
    /// A token appeared where the grammar does not allow it
    #[error("Unexpected token '{0}'")]
    UnexpectedToken(String),
    /// Source ended in the middle of an expression
    #[error("Unexpected end of formula")]
    UnexpectedEnd,
    /// Call to a name outside the builtin function set
    #[error("Unknown function '{0}'")]
    UnknownFunction(String),
    /// Call with the wrong number of arguments
    #[error("Function '{function}' takes {expected} argument(s), got {got}")]
    WrongArity {
        /// Function name
        function: &'static str,
        /// Declared parameter count
        expected: usize,
        /// Arguments supplied at the call site
        got: usize,
    },
    /// A complete expression was followed by more tokens
    #[error("Trailing input after expression: '{0}'")]
    TrailingInput(String),
    /// A free variable had no value at evaluation time
    #[error("Unknown variable '{0}'")]
    UnknownVariable(String),
    /// An operator was applied to a value kind it does not accept
    #[error("Operator '{op}' cannot take a {kind:?} operand")]
    BadOperand {
        /// Operator or function name
        op: &'static str,
        /// Kind of the offending operand
        kind: ValueKind,
    },
}

/// A compiled formula: source text, AST, and discovered free variables.
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    text: String,
    ast: Expr,
    variables: Vec<String>,
}

impl Formula {
    /// Compile `text` into an evaluable formula.
    ///
    /// # Errors
    /// Returns a [`FormulaError`] describing the first lex or parse failure.
    pub fn compile(text: &str) -> Result<Self, FormulaError> {
        let tokens = lexer::lex(text)?;
        let ast = parser::parse(&tokens)?;
        let variables = parser::free_variables(&ast);
        Ok(Self {
            text: text.to_string(),
            ast,
            variables,
        })
    }

    /// Source text the formula was compiled from.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Free variables in first-use order. Each becomes an input of the
    /// hosting node.
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    /// Evaluate against `lookup`, which supplies a value per free variable.
    ///
    /// # Errors
    /// Returns [`FormulaError::UnknownVariable`] when `lookup` has no value
    /// for a variable the formula reaches, or [`FormulaError::BadOperand`]
    /// on a kind mismatch.
    pub fn evaluate(
        &self,
        lookup: &dyn Fn(&str) -> Option<Value>,
    ) -> Result<Value, FormulaError> {
        eval::evaluate(&self.ast, lookup)
    }
}
