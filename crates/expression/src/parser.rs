use crate::ast::{CompareOp, Expr, Lit};
use crate::error::ExpressionError;
use crate::token::Token;

/// Recursive-descent parser for the condition grammar:
///
/// ```text
/// expr       := or_expr
/// or_expr    := and_expr ( "||" and_expr )*
/// and_expr   := unary ( "&&" unary )*
/// unary      := "!" unary | comparison
/// comparison := primary ( compare_op primary )?
/// primary    := literal | path | "(" expr ")"
/// ```
struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

pub(crate) fn parse(tokens: &[Token]) -> Result<Expr, ExpressionError> {
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_or()?;
    if parser.pos != parser.tokens.len() {
        return Err(ExpressionError::Syntax {
            position: parser.pos,
            message: "unexpected trailing tokens".into(),
        });
    }
    Ok(expr)
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&Token> {
        let tok = self.tokens.get(self.pos);
        self.pos += 1;
        tok
    }

    fn parse_or(&mut self) -> Result<Expr, ExpressionError> {
        let mut left = self.parse_and()?;
        while matches!(self.peek(), Some(Token::Or)) {
            self.advance();
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ExpressionError> {
        let mut left = self.parse_unary()?;
        while matches!(self.peek(), Some(Token::And)) {
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ExpressionError> {
        if matches!(self.peek(), Some(Token::Not)) {
            self.advance();
            let inner = self.parse_unary()?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, ExpressionError> {
        let left = self.parse_primary()?;
        let op = match self.peek() {
            Some(Token::Eq) => Some(CompareOp::Eq),
            Some(Token::Ne) => Some(CompareOp::Ne),
            Some(Token::Gt) => Some(CompareOp::Gt),
            Some(Token::Ge) => Some(CompareOp::Ge),
            Some(Token::Lt) => Some(CompareOp::Lt),
            Some(Token::Le) => Some(CompareOp::Le),
            _ => None,
        };
        let Some(op) = op else { return Ok(left) };
        self.advance();
        let right = self.parse_primary()?;
        Ok(Expr::Compare(op, Box::new(left), Box::new(right)))
    }

    fn parse_primary(&mut self) -> Result<Expr, ExpressionError> {
        match self.advance().cloned() {
            Some(Token::Number(n)) => Ok(Expr::Literal(Lit::Number(n))),
            Some(Token::String(s)) => Ok(Expr::Literal(Lit::String(s.clone()))),
            Some(Token::Bool(b)) => Ok(Expr::Literal(Lit::Bool(b))),
            Some(Token::Path(p)) => {
                if matches!(self.peek(), Some(Token::LParen)) {
                    return Err(ExpressionError::Syntax {
                        position: self.pos,
                        message: "function calls are not supported".into(),
                    });
                }
                Ok(Expr::Path(p.split('.').map(str::to_owned).collect()))
            }
            Some(Token::LParen) => {
                let inner = self.parse_or()?;
                match self.advance() {
                    Some(Token::RParen) => Ok(inner),
                    _ => Err(ExpressionError::Syntax {
                        position: self.pos,
                        message: "expected closing ')'".into(),
                    }),
                }
            }
            other => Err(ExpressionError::Syntax {
                position: self.pos,
                message: format!("unexpected token: {other:?}"),
            }),
        }
    }
}
