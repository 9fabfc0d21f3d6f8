// SPDX-License-Identifier: MIT OR Apache-2.0
//! Formula AST evaluation against a variable-lookup callback.

use super::parser::{BinaryOp, Expr, Function, UnaryOp};
use super::FormulaError;
use tickweave_graph::port::Value;

/// Evaluate an expression, resolving free variables through `lookup`
///
/// `&&` and `||` short-circuit: the right operand is not evaluated (and its
/// variables not looked up) when the left operand decides the result.
pub fn evaluate(
    expr: &Expr,
    lookup: &dyn Fn(&str) -> Option<Value>,
) -> Result<Value, FormulaError> {
    match expr {
        Expr::Number(n) => Ok(Value::Number(*n)),
        Expr::Bool(b) => Ok(Value::Bool(*b)),
        Expr::Var(name) => {
            lookup(name).ok_or_else(|| FormulaError::UnknownVariable(name.clone()))
        }
        Expr::Unary { op, operand } => {
            let value = evaluate(operand, lookup)?;
            apply_unary(*op, &value)
        }
        Expr::Binary { op, lhs, rhs } => match op {
            BinaryOp::And => {
                if !truth(&evaluate(lhs, lookup)?, "&&")? {
                    return Ok(Value::Bool(false));
                }
                Ok(Value::Bool(truth(&evaluate(rhs, lookup)?, "&&")?))
            }
            BinaryOp::Or => {
                if truth(&evaluate(lhs, lookup)?, "||")? {
                    return Ok(Value::Bool(true));
                }
                Ok(Value::Bool(truth(&evaluate(rhs, lookup)?, "||")?))
            }
            _ => {
                let left = evaluate(lhs, lookup)?;
                let right = evaluate(rhs, lookup)?;
                apply_binary(*op, &left, &right)
            }
        },
        Expr::Call { function, args } => {
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                values.push(number(&evaluate(arg, lookup)?, function.name())?);
            }
            Ok(Value::Number(apply_function(*function, &values)))
        }
    }
}

fn apply_unary(op: UnaryOp, value: &Value) -> Result<Value, FormulaError> {
    match op {
        UnaryOp::Neg => Ok(Value::Number(-number(value, "-")?)),
        UnaryOp::Not => Ok(Value::Bool(!truth(value, "!")?)),
    }
}

fn apply_binary(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value, FormulaError> {
    match op {
        BinaryOp::Add => numeric(lhs, rhs, "+", |a, b| a + b),
        BinaryOp::Sub => numeric(lhs, rhs, "-", |a, b| a - b),
        BinaryOp::Mul => numeric(lhs, rhs, "*", |a, b| a * b),
        BinaryOp::Div => numeric(lhs, rhs, "/", |a, b| a / b),
        BinaryOp::Rem => numeric(lhs, rhs, "%", |a, b| a % b),
        BinaryOp::Less => comparison(lhs, rhs, "<", |a, b| a < b),
        BinaryOp::LessEq => comparison(lhs, rhs, "<=", |a, b| a <= b),
        BinaryOp::Greater => comparison(lhs, rhs, ">", |a, b| a > b),
        BinaryOp::GreaterEq => comparison(lhs, rhs, ">=", |a, b| a >= b),
        BinaryOp::Eq => equality(lhs, rhs, "==").map(Value::Bool),
        BinaryOp::NotEq => equality(lhs, rhs, "!=").map(|eq| Value::Bool(!eq)),
        BinaryOp::And | BinaryOp::Or => unreachable!("short-circuited by the caller"),
    }
}

fn apply_function(function: Function, args: &[f64]) -> f64 {
    match function {
        Function::Min => args[0].min(args[1]),
        Function::Max => args[0].max(args[1]),
        Function::Abs => args[0].abs(),
        Function::Floor => args[0].floor(),
        Function::Ceil => args[0].ceil(),
        Function::Sqrt => args[0].sqrt(),
        // max/min instead of f64::clamp, which panics on inverted bounds
        Function::Clamp => args[0].max(args[1]).min(args[2]),
    }
}

fn numeric(
    lhs: &Value,
    rhs: &Value,
    op: &'static str,
    apply: fn(f64, f64) -> f64,
) -> Result<Value, FormulaError> {
    Ok(Value::Number(apply(number(lhs, op)?, number(rhs, op)?)))
}

fn comparison(
    lhs: &Value,
    rhs: &Value,
    op: &'static str,
    apply: fn(f64, f64) -> bool,
) -> Result<Value, FormulaError> {
    Ok(Value::Bool(apply(number(lhs, op)?, number(rhs, op)?)))
}

fn equality(lhs: &Value, rhs: &Value, op: &'static str) -> Result<bool, FormulaError> {
    match (lhs, rhs) {
        (Value::Number(a), Value::Number(b)) => Ok(a == b),
        (Value::Bool(a), Value::Bool(b)) => Ok(a == b),
        _ => Err(FormulaError::BadOperand {
            op,
            kind: rhs.kind(),
        }),
    }
}

fn number(value: &Value, op: &'static str) -> Result<f64, FormulaError> {
    match value {
        Value::Number(n) => Ok(*n),
        other => Err(FormulaError::BadOperand {
            op,
            kind: other.kind(),
        }),
    }
}

fn truth(value: &Value, op: &'static str) -> Result<bool, FormulaError> {
    match value {
        Value::Bool(b) => Ok(*b),
        other => Err(FormulaError::BadOperand {
            op,
            kind: other.kind(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::super::lexer::lex;
    use super::super::parser::parse;
    use super::*;

    fn eval_with(source: &str, lookup: &dyn Fn(&str) -> Option<Value>) -> Result<Value, FormulaError> {
        let expr = parse(&lex(source).unwrap()).unwrap();
        evaluate(&expr, lookup)
    }

    fn eval(source: &str) -> Result<Value, FormulaError> {
        eval_with(source, &|_| None)
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval("2 + 3 * 4").unwrap(), Value::Number(14.0));
        assert_eq!(eval("(2 + 3) * 4").unwrap(), Value::Number(20.0));
        assert_eq!(eval("7 % 4").unwrap(), Value::Number(3.0));
        assert_eq!(eval("-2 * -3").unwrap(), Value::Number(6.0));
    }

    #[test]
    fn test_comparisons_and_logic() {
        assert_eq!(eval("1 < 2 && 3 >= 3").unwrap(), Value::Bool(true));
        assert_eq!(eval("1 == 2 || !false").unwrap(), Value::Bool(true));
        assert_eq!(eval("2 != 2").unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_variable_lookup() {
        let lookup = |name: &str| match name {
            "speed" => Some(Value::Number(4.0)),
            "armed" => Some(Value::Bool(true)),
            _ => None,
        };
        assert_eq!(
            eval_with("speed * 2 + 1", &lookup).unwrap(),
            Value::Number(9.0)
        );
        assert_eq!(eval_with("armed && speed > 3", &lookup).unwrap(), Value::Bool(true));
        assert!(matches!(
            eval_with("missing + 1", &lookup),
            Err(FormulaError::UnknownVariable(name)) if name == "missing"
        ));
    }

    #[test]
    fn test_short_circuit_skips_rhs_lookup() {
        // "undefined" must never be looked up.
        assert_eq!(eval("false && undefined").unwrap(), Value::Bool(false));
        assert_eq!(eval("true || undefined").unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_functions() {
        assert_eq!(eval("min(3, 8)").unwrap(), Value::Number(3.0));
        assert_eq!(eval("max(3, 8)").unwrap(), Value::Number(8.0));
        assert_eq!(eval("abs(-5)").unwrap(), Value::Number(5.0));
        assert_eq!(eval("clamp(12, 0, 10)").unwrap(), Value::Number(10.0));
        assert_eq!(eval("floor(2.9) + ceil(2.1)").unwrap(), Value::Number(5.0));
        assert_eq!(eval("sqrt(16)").unwrap(), Value::Number(4.0));
    }

    #[test]
    fn test_kind_errors() {
        assert!(matches!(
            eval("true + 1"),
            Err(FormulaError::BadOperand { op: "+", .. })
        ));
        assert!(matches!(
            eval("!3"),
            Err(FormulaError::BadOperand { op: "!", .. })
        ));
        assert!(matches!(
            eval("1 == true"),
            Err(FormulaError::BadOperand { op: "==", .. })
        ));
    }
}
