// SPDX-License-Identifier: MIT OR Apache-2.0
//! Recursive descent parser for the formula grammar.
//!
//! Operates on the token stream from the lexer. Binary operators are parsed
//! with precedence climbing:
//! 1. Logical OR (`||`), lowest
//! 2. Logical AND (`&&`)
//! 3. Equality (`==`, `!=`)
//! 4. Comparison (`<`, `<=`, `>`, `>=`)
//! 5. Addition/Subtraction (`+`, `-`)
//! 6. Multiplication/Division/Remainder (`*`, `/`, `%`), highest
//!
//! Unary `-` and `!` bind tighter than any binary operator, and calls to the
//! fixed function set are recognized at primary level.

use super::lexer::Token;
use super::FormulaError;

/// Parsed formula expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Number literal
    Number(f64),
    /// Bool literal
    Bool(bool),
    /// Free variable reference
    Var(String),
    /// Unary operation
    Unary {
        /// Operator
        op: UnaryOp,
        /// Operand expression
        operand: Box<Expr>,
    },
    /// Binary operation
    Binary {
        /// Operator
        op: BinaryOp,
        /// Left operand
        lhs: Box<Expr>,
        /// Right operand
        rhs: Box<Expr>,
    },
    /// Call to a builtin function
    Call {
        /// Called function
        function: Function,
        /// Argument expressions
        args: Vec<Expr>,
    },
}

/// Unary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// Numeric negation
    Neg,
    /// Logical not
    Not,
}

/// Binary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Rem,
    /// `==`
    Eq,
    /// `!=`
    NotEq,
    /// `<`
    Less,
    /// `<=`
    LessEq,
    /// `>`
    Greater,
    /// `>=`
    GreaterEq,
    /// `&&`
    And,
    /// `||`
    Or,
}

/// Builtin formula function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    /// Smaller of two numbers
    Min,
    /// Larger of two numbers
    Max,
    /// Absolute value
    Abs,
    /// Round down
    Floor,
    /// Round up
    Ceil,
    /// Square root
    Sqrt,
    /// Clamp a number into a range
    Clamp,
}

impl Function {
    /// Look a function up by its source name
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "min" => Some(Self::Min),
            "max" => Some(Self::Max),
            "abs" => Some(Self::Abs),
            "floor" => Some(Self::Floor),
            "ceil" => Some(Self::Ceil),
            "sqrt" => Some(Self::Sqrt),
            "clamp" => Some(Self::Clamp),
            _ => None,
        }
    }

    /// Source name of the function
    pub fn name(self) -> &'static str {
        match self {
            Self::Min => "min",
            Self::Max => "max",
            Self::Abs => "abs",
            Self::Floor => "floor",
            Self::Ceil => "ceil",
            Self::Sqrt => "sqrt",
            Self::Clamp => "clamp",
        }
    }

    /// Number of arguments the function takes
    pub fn arity(self) -> usize {
        match self {
            Self::Min | Self::Max => 2,
            Self::Abs | Self::Floor | Self::Ceil | Self::Sqrt => 1,
            Self::Clamp => 3,
        }
    }
}

/// Parse a complete formula from its tokens
pub fn parse(tokens: &[Token]) -> Result<Expr, FormulaError> {
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.or_expr()?;
    match parser.peek() {
        None => Ok(expr),
        Some(extra) => Err(FormulaError::TrailingInput(extra.to_string())),
    }
}

/// Free variable names of an expression, in first-use order, deduplicated
pub fn free_variables(expr: &Expr) -> Vec<String> {
    let mut vars = Vec::new();
    collect_vars(expr, &mut vars);
    vars
}

fn collect_vars(expr: &Expr, out: &mut Vec<String>) {
    match expr {
        Expr::Number(_) | Expr::Bool(_) => {}
        Expr::Var(name) => {
            if !out.iter().any(|v| v == name) {
                out.push(name.clone());
            }
        }
        Expr::Unary { operand, .. } => collect_vars(operand, out),
        Expr::Binary { lhs, rhs, .. } => {
            collect_vars(lhs, out);
            collect_vars(rhs, out);
        }
        Expr::Call { args, .. } => {
            for arg in args {
                collect_vars(arg, out);
            }
        }
    }
}

struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn eat(&mut self, wanted: &Token) -> bool {
        if self.peek() == Some(wanted) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, wanted: &Token) -> Result<(), FormulaError> {
        match self.bump() {
            Some(token) if &token == wanted => Ok(()),
            Some(token) => Err(FormulaError::UnexpectedToken(token.to_string())),
            None => Err(FormulaError::UnexpectedEnd),
        }
    }

    fn or_expr(&mut self) -> Result<Expr, FormulaError> {
        let mut lhs = self.and_expr()?;
        while self.eat(&Token::OrOr) {
            let rhs = self.and_expr()?;
            lhs = binary(BinaryOp::Or, lhs, rhs);
        }
        Ok(lhs)
    }

    fn and_expr(&mut self) -> Result<Expr, FormulaError> {
        let mut lhs = self.equality()?;
        while self.eat(&Token::AndAnd) {
            let rhs = self.equality()?;
            lhs = binary(BinaryOp::And, lhs, rhs);
        }
        Ok(lhs)
    }

    fn equality(&mut self) -> Result<Expr, FormulaError> {
        let mut lhs = self.comparison()?;
        loop {
            let op = match self.peek() {
                Some(Token::EqEq) => BinaryOp::Eq,
                Some(Token::NotEq) => BinaryOp::NotEq,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.comparison()?;
            lhs = binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn comparison(&mut self) -> Result<Expr, FormulaError> {
        let mut lhs = self.additive()?;
        loop {
            let op = match self.peek() {
                Some(Token::Less) => BinaryOp::Less,
                Some(Token::LessEq) => BinaryOp::LessEq,
                Some(Token::Greater) => BinaryOp::Greater,
                Some(Token::GreaterEq) => BinaryOp::GreaterEq,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.additive()?;
            lhs = binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn additive(&mut self) -> Result<Expr, FormulaError> {
        let mut lhs = self.term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.term()?;
            lhs = binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn term(&mut self) -> Result<Expr, FormulaError> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                Some(Token::Percent) => BinaryOp::Rem,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, FormulaError> {
        if self.eat(&Token::Minus) {
            let operand = self.unary()?;
            return Ok(Expr::Unary {
                op: UnaryOp::Neg,
                operand: Box::new(operand),
            });
        }
        if self.eat(&Token::Bang) {
            let operand = self.unary()?;
            return Ok(Expr::Unary {
                op: UnaryOp::Not,
                operand: Box::new(operand),
            });
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr, FormulaError> {
        match self.bump() {
            Some(Token::Number(n)) => Ok(Expr::Number(n)),
            Some(Token::Bool(b)) => Ok(Expr::Bool(b)),
            Some(Token::Ident(name)) => {
                if self.eat(&Token::LParen) {
                    self.call(&name)
                } else {
                    Ok(Expr::Var(name))
                }
            }
            Some(Token::LParen) => {
                let inner = self.or_expr()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Some(token) => Err(FormulaError::UnexpectedToken(token.to_string())),
            None => Err(FormulaError::UnexpectedEnd),
        }
    }

    fn call(&mut self, name: &str) -> Result<Expr, FormulaError> {
        let function = Function::from_name(name)
            .ok_or_else(|| FormulaError::UnknownFunction(name.to_string()))?;
        let mut args = Vec::new();
        if !self.eat(&Token::RParen) {
            loop {
                args.push(self.or_expr()?);
                if self.eat(&Token::RParen) {
                    break;
                }
                self.expect(&Token::Comma)?;
            }
        }
        if args.len() != function.arity() {
            return Err(FormulaError::WrongArity {
                function: function.name(),
                expected: function.arity(),
                got: args.len(),
            });
        }
        Ok(Expr::Call { function, args })
    }
}

fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}

#[cfg(test)]
mod tests {
    use super::super::lexer::lex;
    use super::*;

    fn parse_text(source: &str) -> Result<Expr, FormulaError> {
        parse(&lex(source).unwrap())
    }

    #[test]
    fn test_multiplication_binds_tighter_than_addition() {
        let expr = parse_text("2 + 3 * 4").unwrap();
        assert_eq!(
            expr,
            binary(
                BinaryOp::Add,
                Expr::Number(2.0),
                binary(BinaryOp::Mul, Expr::Number(3.0), Expr::Number(4.0)),
            )
        );
    }

    #[test]
    fn test_parentheses_override_precedence() {
        let expr = parse_text("(2 + 3) * 4").unwrap();
        assert_eq!(
            expr,
            binary(
                BinaryOp::Mul,
                binary(BinaryOp::Add, Expr::Number(2.0), Expr::Number(3.0)),
                Expr::Number(4.0),
            )
        );
    }

    #[test]
    fn test_unary_chains() {
        let expr = parse_text("--x").unwrap();
        assert_eq!(
            expr,
            Expr::Unary {
                op: UnaryOp::Neg,
                operand: Box::new(Expr::Unary {
                    op: UnaryOp::Neg,
                    operand: Box::new(Expr::Var("x".to_string())),
                }),
            }
        );
    }

    #[test]
    fn test_comparison_feeds_logic() {
        let expr = parse_text("a < 3 && b >= 1 || !c").unwrap();
        // (|| ((&& (< a 3) (>= b 1)) (! c)))
        let Expr::Binary { op: BinaryOp::Or, lhs, rhs } = expr else {
            panic!("expected top-level ||");
        };
        assert!(matches!(*lhs, Expr::Binary { op: BinaryOp::And, .. }));
        assert!(matches!(*rhs, Expr::Unary { op: UnaryOp::Not, .. }));
    }

    #[test]
    fn test_call_arity_checked() {
        assert!(parse_text("clamp(x, 0, 1)").is_ok());
        let err = parse_text("clamp(x, 0)").unwrap_err();
        assert!(matches!(
            err,
            FormulaError::WrongArity {
                function: "clamp",
                expected: 3,
                got: 2,
            }
        ));
    }

    #[test]
    fn test_unknown_function_rejected() {
        let err = parse_text("slurp(1)").unwrap_err();
        assert!(matches!(err, FormulaError::UnknownFunction(name) if name == "slurp"));
    }

    #[test]
    fn test_trailing_input_rejected() {
        let err = parse_text("1 + 2 3").unwrap_err();
        assert!(matches!(err, FormulaError::TrailingInput(_)));
    }

    #[test]
    fn test_free_variables_in_first_use_order() {
        let expr = parse_text("b + a * b - min(c, a)").unwrap();
        assert_eq!(free_variables(&expr), vec!["b", "a", "c"]);
    }
}
