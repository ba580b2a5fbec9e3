//! The small expression language behind expression tools.
//!
//! Expressions combine literals and named variables with arithmetic,
//! comparison and boolean operators. There are no function calls, no
//! assignment and no loops, so evaluation always terminates and has no
//! side effects.
//!
//! ```text
//! a * b
//! (#price - discount) * 1.2
//! 'Hello, ' + name
//! ```

mod eval;
mod lexer;
mod parser;
mod value;

use serde_json::{Map, Value as Json};
use thiserror::Error;

pub use parser::MAX_DEPTH;
pub use value::Value;

/// Failure to parse or evaluate an expression.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EvalError {
    #[error("syntax error at offset {pos}: {message}")]
    Syntax { pos: usize, message: String },

    #[error("unknown variable '{0}'")]
    UnknownVariable(String),

    #[error("argument '{0}' is an array or object and cannot be used in an expression")]
    UnsupportedArgument(String),

    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("integer overflow")]
    Overflow,

    #[error("result is not a finite number")]
    NonFinite,

    #[error("expression nests deeper than {0} levels")]
    TooDeep(usize),

    #[error("expression is {len} bytes long, the limit is {max}")]
    TooLong { len: usize, max: usize },
}

impl EvalError {
    pub(crate) fn syntax(pos: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            pos,
            message: message.into(),
        }
    }

    pub(crate) fn type_mismatch(message: impl Into<String>) -> Self {
        Self::TypeMismatch(message.into())
    }
}

/// A parsed expression, ready to be evaluated any number of times.
#[derive(Debug, Clone)]
pub struct Expression {
    root: parser::Expr,
}

impl Expression {
    /// Parse `source`, rejecting text longer than `max_len` bytes.
    pub fn parse(source: &str, max_len: usize) -> Result<Self, EvalError> {
        if source.len() > max_len {
            return Err(EvalError::TooLong {
                len: source.len(),
                max: max_len,
            });
        }
        let tokens = lexer::tokenize(source)?;
        let root = parser::parse(&tokens, source.len())?;
        Ok(Self { root })
    }

    /// Evaluate against named JSON arguments.
    pub fn evaluate(&self, bindings: &Map<String, Json>) -> Result<Value, EvalError> {
        eval::evaluate(&self.root, &eval::Scope::new(bindings))
    }
}

/// Parse and evaluate in one step, converting the result to JSON.
pub fn evaluate(source: &str, bindings: &Map<String, Json>, max_len: usize) -> Result<Json, EvalError> {
    Expression::parse(source, max_len)?
        .evaluate(bindings)?
        .into_json()
}
