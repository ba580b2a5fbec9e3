//! Tree-walking evaluator.

use serde_json::{Map, Value as Json};

use super::EvalError;
use super::parser::{BinaryOp, Expr, UnaryOp};
use super::value::Value;

/// Variable bindings for a single evaluation, borrowed from the caller's
/// argument map.
pub struct Scope<'a> {
    bindings: &'a Map<String, Json>,
}

impl<'a> Scope<'a> {
    pub fn new(bindings: &'a Map<String, Json>) -> Self {
        Self { bindings }
    }

    fn lookup(&self, name: &str) -> Result<Value, EvalError> {
        let raw = self
            .bindings
            .get(name)
            .ok_or_else(|| EvalError::UnknownVariable(name.to_string()))?;
        Value::from_json(raw).ok_or_else(|| EvalError::UnsupportedArgument(name.to_string()))
    }
}

pub fn evaluate(expr: &Expr, scope: &Scope<'_>) -> Result<Value, EvalError> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Variable(name) => scope.lookup(name),
        Expr::Unary(op, operand) => {
            let value = evaluate(operand, scope)?;
            unary(*op, value)
        }
        Expr::Chain(first, rest) => {
            let mut acc = evaluate(first, scope)?;
            for (op, rhs) in rest {
                acc = match op {
                    // One level only ever holds one of these, so a decided
                    // chain is decided as a whole.
                    BinaryOp::And => {
                        if !truth(*op, acc)? {
                            return Ok(Value::Bool(false));
                        }
                        Value::Bool(truth(*op, evaluate(rhs, scope)?)?)
                    }
                    BinaryOp::Or => {
                        if truth(*op, acc)? {
                            return Ok(Value::Bool(true));
                        }
                        Value::Bool(truth(*op, evaluate(rhs, scope)?)?)
                    }
                    _ => binary(*op, acc, evaluate(rhs, scope)?)?,
                };
            }
            Ok(acc)
        }
    }
}

fn truth(op: BinaryOp, value: Value) -> Result<bool, EvalError> {
    match value {
        Value::Bool(b) => Ok(b),
        other => Err(EvalError::type_mismatch(format!(
            "'{}' expects booleans, got {}",
            op.symbol(),
            other.type_name()
        ))),
    }
}

fn unary(op: UnaryOp, value: Value) -> Result<Value, EvalError> {
    match (op, value) {
        (UnaryOp::Neg, Value::Int(i)) => i.checked_neg().map(Value::Int).ok_or(EvalError::Overflow),
        (UnaryOp::Neg, Value::Float(f)) => Ok(Value::Float(-f)),
        (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
        (UnaryOp::Neg, other) => Err(EvalError::type_mismatch(format!(
            "cannot negate {}",
            other.type_name()
        ))),
        (UnaryOp::Not, other) => Err(EvalError::type_mismatch(format!(
            "'!' expects a boolean, got {}",
            other.type_name()
        ))),
    }
}

fn binary(op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value, EvalError> {
    match op {
        BinaryOp::Add => match (lhs, rhs) {
            (l @ Value::Str(_), r) | (l, r @ Value::Str(_)) => Ok(Value::Str(format!("{l}{r}"))),
            (l, r) => arithmetic(op, l, r),
        },
        BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => arithmetic(op, lhs, rhs),
        BinaryOp::Eq => Ok(Value::Bool(equals(&lhs, &rhs))),
        BinaryOp::Ne => Ok(Value::Bool(!equals(&lhs, &rhs))),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => compare(op, &lhs, &rhs),
        BinaryOp::And | BinaryOp::Or => {
            let l = truth(op, lhs)?;
            let r = truth(op, rhs)?;
            Ok(Value::Bool(if op == BinaryOp::And { l && r } else { l || r }))
        }
    }
}

fn arithmetic(op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value, EvalError> {
    if let (Value::Int(a), Value::Int(b)) = (&lhs, &rhs) {
        let (a, b) = (*a, *b);
        if matches!(op, BinaryOp::Div | BinaryOp::Rem) && b == 0 {
            return Err(EvalError::DivisionByZero);
        }
        let result = match op {
            BinaryOp::Add => a.checked_add(b),
            BinaryOp::Sub => a.checked_sub(b),
            BinaryOp::Mul => a.checked_mul(b),
            BinaryOp::Div => a.checked_div(b),
            BinaryOp::Rem => a.checked_rem(b),
            _ => None,
        };
        return result.map(Value::Int).ok_or(EvalError::Overflow);
    }

    let (Some(a), Some(b)) = (lhs.as_f64(), rhs.as_f64()) else {
        return Err(EvalError::type_mismatch(format!(
            "cannot apply '{}' to {} and {}",
            op.symbol(),
            lhs.type_name(),
            rhs.type_name()
        )));
    };
    if matches!(op, BinaryOp::Div | BinaryOp::Rem) && b == 0.0 {
        return Err(EvalError::DivisionByZero);
    }
    let result = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => a / b,
        _ => a % b,
    };
    if result.is_finite() {
        Ok(Value::Float(result))
    } else {
        Err(EvalError::NonFinite)
    }
}

fn equals(lhs: &Value, rhs: &Value) -> bool {
    match (lhs.as_f64(), rhs.as_f64()) {
        (Some(a), Some(b)) if lhs.type_name() != rhs.type_name() => a == b,
        _ => lhs == rhs,
    }
}

fn compare(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value, EvalError> {
    let ordering = match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        _ => match (lhs.as_f64(), rhs.as_f64()) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => {
                return Err(EvalError::type_mismatch(format!(
                    "cannot compare {} with {}",
                    lhs.type_name(),
                    rhs.type_name()
                )));
            }
        },
    };
    let Some(ordering) = ordering else {
        return Ok(Value::Bool(false));
    };
    Ok(Value::Bool(match op {
        BinaryOp::Lt => ordering.is_lt(),
        BinaryOp::Le => ordering.is_le(),
        BinaryOp::Gt => ordering.is_gt(),
        _ => ordering.is_ge(),
    }))
}
