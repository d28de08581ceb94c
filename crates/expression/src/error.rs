use serde_json::Value;
use thiserror::Error;

/// Everything that can go wrong parsing or evaluating an expression.
#[derive(Debug, Clone, Error)]
pub enum ExpressionError {
    #[error("syntax error at position {position}: {message}")]
    Syntax { position: usize, message: String },

    #[error("path '{path}' did not resolve in the context")]
    UnresolvedPath { path: String },

    #[error("expression result was not a boolean: {value}")]
    NotBoolean { value: Value },

    #[error("type mismatch applying '{op}' to {left} and {right}")]
    TypeMismatch { op: String, left: Value, right: Value },
}
