//! Runtime values of the expression language.

use std::fmt;

use serde_json::{Number, Value as Json};

use super::EvalError;

/// A value produced while evaluating an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    Null,
}

impl Value {
    /// Human-readable type name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Int(_) => "integer",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
            Self::Bool(_) => "boolean",
            Self::Null => "null",
        }
    }

    /// Bind a JSON argument. Arrays and objects cannot be represented and
    /// are rejected; the caller decides when that becomes an error.
    pub fn from_json(value: &Json) -> Option<Self> {
        match value {
            Json::Null => Some(Self::Null),
            Json::Bool(b) => Some(Self::Bool(*b)),
            Json::Number(n) => n
                .as_i64()
                .map(Self::Int)
                .or_else(|| n.as_f64().map(Self::Float)),
            Json::String(s) => Some(Self::Str(s.clone())),
            Json::Array(_) | Json::Object(_) => None,
        }
    }

    /// Convert an evaluation result back to JSON.
    pub fn into_json(self) -> Result<Json, EvalError> {
        Ok(match self {
            Self::Int(i) => Json::Number(i.into()),
            Self::Float(f) => Json::Number(Number::from_f64(f).ok_or(EvalError::NonFinite)?),
            Self::Str(s) => Json::String(s),
            Self::Bool(b) => Json::Bool(b),
            Self::Null => Json::Null,
        })
    }

    pub(crate) fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Str(s) => f.write_str(s),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Null => f.write_str("null"),
        }
    }
}
