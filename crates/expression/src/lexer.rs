use crate::error::ExpressionError;
use crate::token::Token;

/// Turns a source string into a flat token stream. No lookahead beyond a
/// single character is ever needed by this grammar.
pub(crate) fn tokenize(source: &str) -> Result<Vec<Token>, ExpressionError> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '!' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Ne);
                    i += 2;
                } else {
                    tokens.push(Token::Not);
                    i += 1;
                }
            }
            '=' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Eq);
                    i += 2;
                } else {
                    return Err(ExpressionError::Syntax {
                        position: i,
                        message: "expected '==' got single '='".into(),
                    });
                }
            }
            '>' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Ge);
                    i += 2;
                } else {
                    tokens.push(Token::Gt);
                    i += 1;
                }
            }
            '<' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Le);
                    i += 2;
                } else {
                    tokens.push(Token::Lt);
                    i += 1;
                }
            }
            '&' => {
                if chars.get(i + 1) == Some(&'&') {
                    tokens.push(Token::And);
                    i += 2;
                } else {
                    return Err(ExpressionError::Syntax { position: i, message: "expected '&&'".into() });
                }
            }
            '|' => {
                if chars.get(i + 1) == Some(&'|') {
                    tokens.push(Token::Or);
                    i += 2;
                } else {
                    return Err(ExpressionError::Syntax { position: i, message: "expected '||'".into() });
                }
            }
            '"' => {
                let start = i + 1;
                let mut j = start;
                while j < chars.len() && chars[j] != '"' {
                    j += 1;
                }
                if j >= chars.len() {
                    return Err(ExpressionError::Syntax {
                        position: i,
                        message: "unterminated string literal".into(),
                    });
                }
                let literal: String = chars[start..j].iter().collect();
                tokens.push(Token::String(literal));
                i = j + 1;
            }
            c if c.is_ascii_digit() => {
                let start = i;
                let mut j = i;
                while j < chars.len() && (chars[j].is_ascii_digit() || chars[j] == '.') {
                    j += 1;
                }
                let literal: String = chars[start..j].iter().collect();
                let value: f64 = literal.parse().map_err(|_| ExpressionError::Syntax {
                    position: start,
                    message: format!("invalid number literal '{literal}'"),
                })?;
                tokens.push(Token::Number(value));
                i = j;
            }
            c if c.is_alphabetic() || c == '_' || c == '$' => {
                let start = i;
                let mut j = i;
                while j < chars.len()
                    && (chars[j].is_alphanumeric() || chars[j] == '_' || chars[j] == '.' || chars[j] == '$')
                {
                    j += 1;
                }
                let word: String = chars[start..j].iter().collect();
                match word.as_str() {
                    "true" => tokens.push(Token::Bool(true)),
                    "false" => tokens.push(Token::Bool(false)),
                    _ => tokens.push(Token::Path(word)),
                }
                i = j;
            }
            other => {
                return Err(ExpressionError::Syntax {
                    position: i,
                    message: format!("unexpected character '{other}'"),
                })
            }
        }
    }

    Ok(tokens)
}
