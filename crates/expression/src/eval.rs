use serde_json::Value;

use crate::ast::{CompareOp, Expr, Lit};
use crate::error::ExpressionError;

/// Evaluates a parsed expression against a JSON context. Dotted [`Expr::Path`]
/// segments are resolved via [`Value::get`]; a missing path is an error
/// rather than a silent `null`, so a typo in a condition expression fails
/// loudly at evaluation time instead of silently taking the false branch.
pub fn evaluate(expr: &Expr, context: &Value) -> Result<Value, ExpressionError> {
    match expr {
        Expr::Literal(Lit::String(s)) => Ok(Value::String(s.clone())),
        Expr::Literal(Lit::Number(n)) => Ok(serde_json::json!(n)),
        Expr::Literal(Lit::Bool(b)) => Ok(Value::Bool(*b)),
        Expr::Path(segments) => resolve_path(context, segments),
        Expr::Not(inner) => {
            let value = evaluate(inner, context)?;
            match value {
                Value::Bool(b) => Ok(Value::Bool(!b)),
                other => Err(ExpressionError::NotBoolean { value: other }),
            }
        }
        Expr::And(l, r) => {
            let left = as_bool(evaluate(l, context)?)?;
            if !left {
                return Ok(Value::Bool(false));
            }
            Ok(Value::Bool(as_bool(evaluate(r, context)?)?))
        }
        Expr::Or(l, r) => {
            let left = as_bool(evaluate(l, context)?)?;
            if left {
                return Ok(Value::Bool(true));
            }
            Ok(Value::Bool(as_bool(evaluate(r, context)?)?))
        }
        Expr::Compare(op, l, r) => {
            let left = evaluate(l, context)?;
            let right = evaluate(r, context)?;
            compare(*op, &left, &right)
        }
    }
}

fn as_bool(value: Value) -> Result<bool, ExpressionError> {
    match value {
        Value::Bool(b) => Ok(b),
        other => Err(ExpressionError::NotBoolean { value: other }),
    }
}

fn resolve_path(context: &Value, segments: &[String]) -> Result<Value, ExpressionError> {
    let mut current = context;
    for segment in segments {
        match current.get(segment) {
            Some(next) => current = next,
            None => {
                return Err(ExpressionError::UnresolvedPath { path: segments.join(".") });
            }
        }
    }
    Ok(current.clone())
}

fn compare(op: CompareOp, left: &Value, right: &Value) -> Result<Value, ExpressionError> {
    match op {
        CompareOp::Eq => Ok(Value::Bool(left == right)),
        CompareOp::Ne => Ok(Value::Bool(left != right)),
        CompareOp::Gt | CompareOp::Ge | CompareOp::Lt | CompareOp::Le => {
            let ordering = match (left, right) {
                (Value::Number(a), Value::Number(b)) => {
                    a.as_f64().unwrap_or(f64::NAN).partial_cmp(&b.as_f64().unwrap_or(f64::NAN))
                }
                (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
                _ => None,
            };
            let Some(ordering) = ordering else {
                return Err(ExpressionError::TypeMismatch {
                    op: format!("{op:?}"),
                    left: left.clone(),
                    right: right.clone(),
                });
            };
            let result = match op {
                CompareOp::Gt => ordering.is_gt(),
                CompareOp::Ge => ordering.is_ge(),
                CompareOp::Lt => ordering.is_lt(),
                CompareOp::Le => ordering.is_le(),
                CompareOp::Eq | CompareOp::Ne => unreachable!(),
            };
            Ok(Value::Bool(result))
        }
    }
}
