// SPDX-License-Identifier: MIT OR Apache-2.0
//! Formula tokenizer built on `logos`.

use super::FormulaError;
use logos::Logos;
use std::fmt;

/// Token of the formula grammar
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
pub enum Token {
    /// Number literal
    #[regex(r"[0-9]+(\.[0-9]+)?([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    Number(f64),

    /// Bool literal
    #[token("true", |_| true)]
    #[token("false", |_| false)]
    Bool(bool),

    /// Variable or function name
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_owned())]
    Ident(String),

    /// Operator `+`
    #[token("+")]
    Plus,
    /// Operator `-`
    #[token("-")]
    Minus,
    /// Operator `*`
    #[token("*")]
    Star,
    /// Operator `/`
    #[token("/")]
    Slash,
    /// Operator `%`
    #[token("%")]
    Percent,

    /// Operator `==`
    #[token("==")]
    EqEq,
    /// Operator `!=`
    #[token("!=")]
    NotEq,
    /// Operator `<`
    #[token("<")]
    Less,
    /// Operator `<=`
    #[token("<=")]
    LessEq,
    /// Operator `>`
    #[token(">")]
    Greater,
    /// Operator `>=`
    #[token(">=")]
    GreaterEq,

    /// Operator `&&`
    #[token("&&")]
    AndAnd,
    /// Operator `||`
    #[token("||")]
    OrOr,
    /// Operator `!`
    #[token("!")]
    Bang,

    /// Delimiter `(`
    #[token("(")]
    LParen,
    /// Delimiter `)`
    #[token(")")]
    RParen,
    /// Delimiter `,`
    #[token(",")]
    Comma,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(n) => write!(f, "{n}"),
            Token::Bool(b) => write!(f, "{b}"),
            Token::Ident(name) => write!(f, "{name}"),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Percent => write!(f, "%"),
            Token::EqEq => write!(f, "=="),
            Token::NotEq => write!(f, "!="),
            Token::Less => write!(f, "<"),
            Token::LessEq => write!(f, "<="),
            Token::Greater => write!(f, ">"),
            Token::GreaterEq => write!(f, ">="),
            Token::AndAnd => write!(f, "&&"),
            Token::OrOr => write!(f, "||"),
            Token::Bang => write!(f, "!"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::Comma => write!(f, ","),
        }
    }
}

/// Tokenize a formula into a vector of tokens
pub fn lex(source: &str) -> Result<Vec<Token>, FormulaError> {
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();
    while let Some(result) = lexer.next() {
        match result {
            Ok(token) => tokens.push(token),
            Err(()) => return Err(FormulaError::Lex(lexer.slice().to_string())),
        }
    }
    Ok(tokens)
}
