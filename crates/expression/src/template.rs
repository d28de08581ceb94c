use serde_json::Value;

use crate::error::ExpressionError;

/// Renders `{{ dotted.path }}` placeholders in `template` against `context`.
/// Shared by the `tool`, `llm`, and `agent` executors. Dotted access only —
/// there is no way to reach this function's output from anything but a
/// literal path lookup, matching the "no arbitrary code" design note.
pub fn render_template(template: &str, context: &Value) -> Result<String, ExpressionError> {
    let mut output = String::with_capacity(template.len());
    let bytes: Vec<char> = template.chars().collect();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == '{' && bytes.get(i + 1) == Some(&'{') {
            let start = i + 2;
            let Some(end) = find_close(&bytes, start) else {
                return Err(ExpressionError::Syntax {
                    position: i,
                    message: "unterminated '{{' placeholder".into(),
                });
            };
            let path: String = bytes[start..end].iter().collect();
            let path = path.trim();
            let value = resolve(context, path)?;
            output.push_str(&stringify(&value));
            i = end + 2;
        } else {
            output.push(bytes[i]);
            i += 1;
        }
    }

    Ok(output)
}

fn find_close(chars: &[char], from: usize) -> Option<usize> {
    let mut j = from;
    while j + 1 < chars.len() {
        if chars[j] == '}' && chars[j + 1] == '}' {
            return Some(j);
        }
        j += 1;
    }
    None
}

fn resolve(context: &Value, path: &str) -> Result<Value, ExpressionError> {
    if path.is_empty() || path == "." {
        return Ok(context.clone());
    }
    let mut current = context;
    for segment in path.split('.') {
        match current.get(segment) {
            Some(next) => current = next,
            None => return Err(ExpressionError::UnresolvedPath { path: path.to_owned() }),
        }
    }
    Ok(current.clone())
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn substitutes_dotted_path() {
        let ctx = json!({"n1": {"echo": "hi"}});
        let rendered = render_template("say {{ n1.echo }}", &ctx).unwrap();
        assert_eq!(rendered, "say hi");
    }

    #[test]
    fn substitutes_numbers_without_quotes() {
        let ctx = json!({"x": 5});
        let rendered = render_template("value={{x}}", &ctx).unwrap();
        assert_eq!(rendered, "value=5");
    }

    #[test]
    fn leaves_non_placeholder_text_untouched() {
        let ctx = json!({});
        let rendered = render_template("no placeholders here", &ctx).unwrap();
        assert_eq!(rendered, "no placeholders here");
    }

    #[test]
    fn errors_on_missing_path() {
        let ctx = json!({"x": 1});
        assert!(render_template("{{ y }}", &ctx).is_err());
    }

    #[test]
    fn errors_on_unterminated_placeholder() {
        let ctx = json!({});
        assert!(render_template("say {{ x", &ctx).is_err());
    }

    #[test]
    fn empty_path_returns_whole_context_stringified() {
        let ctx = json!({"a": 1});
        let rendered = render_template("{{.}}", &ctx).unwrap();
        assert_eq!(rendered, "{\"a\":1}");
    }
}
