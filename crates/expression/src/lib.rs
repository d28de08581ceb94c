//! A small, audited expression language for `condition` nodes and a
//! template substitution engine for `prompt`/`tool_args` strings.
//!
//! Deliberately narrow: dotted context access, string/number/bool literals,
//! comparison and boolean operators. No function calls, no lambdas, no
//! arbitrary code — every path this module can take is enumerable by
//! reading the grammar in [`parser`].

mod ast;
mod error;
mod eval;
mod lexer;
mod parser;
mod template;
mod token;

pub use ast::Expr;
pub use error::ExpressionError;
pub use eval::evaluate;
pub use template::render_template;

use serde_json::Value;

/// A parsed, reusable condition expression.
#[derive(Debug, Clone)]
pub struct Expression {
    source: String,
    ast: Expr,
}

impl Expression {
    /// Parses `source` into a reusable expression. Fails on any syntax the
    /// grammar does not recognize.
    pub fn parse(source: &str) -> Result<Self, ExpressionError> {
        let tokens = lexer::tokenize(source)?;
        let ast = parser::parse(&tokens)?;
        Ok(Self { source: source.to_owned(), ast })
    }

    /// Evaluates the expression against a JSON context, returning its
    /// boolean result per spec's "safe boolean DSL" contract.
    pub fn evaluate_bool(&self, context: &Value) -> Result<bool, ExpressionError> {
        match evaluate(&self.ast, context)? {
            Value::Bool(b) => Ok(b),
            other => Err(ExpressionError::NotBoolean { value: other }),
        }
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case("x > 3", json!({"x": 5}), true)]
    #[case("x > 3", json!({"x": 1}), false)]
    #[case("x >= 3 && y == \"ok\"", json!({"x": 3, "y": "ok"}), true)]
    #[case("x < 3 || y == \"ok\"", json!({"x": 10, "y": "ok"}), true)]
    #[case("!(x == 1)", json!({"x": 2}), true)]
    #[case("n1.echo == \"hi\"", json!({"n1": {"echo": "hi"}}), true)]
    fn evaluates_expected_boolean(#[case] src: &str, #[case] ctx: Value, #[case] expected: bool) {
        let expr = Expression::parse(src).unwrap();
        assert_eq!(expr.evaluate_bool(&ctx).unwrap(), expected);
    }

    #[test]
    fn rejects_arithmetic_syntax() {
        let err = Expression::parse("x + 1").unwrap_err();
        assert!(matches!(err, ExpressionError::Syntax { .. }));
    }

    #[test]
    fn rejects_non_boolean_result() {
        let expr = Expression::parse("x").unwrap();
        let err = expr.evaluate_bool(&json!({"x": 5})).unwrap_err();
        assert!(matches!(err, ExpressionError::NotBoolean { .. }));
    }

    #[test]
    fn rejects_function_call_syntax() {
        let err = Expression::parse("len(x)").unwrap_err();
        assert!(matches!(err, ExpressionError::Syntax { .. }));
    }
}
