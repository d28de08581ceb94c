use iceos_error::IceError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Either a simple scalar/list type literal or a full JSON-Schema object.
/// Union types and function schemas are rejected at parse time by
/// [`SchemaDecl::validate_literal`] never producing them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SchemaDecl {
    Simple(String),
    Json(Value),
}

impl SchemaDecl {
    /// Parses the `"str"|"int"|"float"|"bool"|"dict"|"list[str]"` grammar,
    /// rejecting anything else when given as a bare string.
    pub fn validate_literal(&self) -> Result<(), IceError> {
        let Self::Simple(literal) = self else { return Ok(()) };
        if is_known_scalar(literal) || parse_list(literal).is_some() || literal == "dict" {
            Ok(())
        } else {
            Err(IceError::validation(format!("unknown schema literal '{literal}'")))
        }
    }

    /// Checks `value` against this declaration. Only the subset needed for
    /// node input/output validation is implemented: scalar type names, list
    /// element types, and `dict`; for a JSON-Schema object, `type`,
    /// `required`, `properties`, and `items` are honored.
    pub fn check(&self, value: &Value) -> Result<(), IceError> {
        match self {
            Self::Simple(literal) => check_simple(literal, value),
            Self::Json(schema) => check_json_schema(schema, value),
        }
    }
}

fn is_known_scalar(s: &str) -> bool {
    matches!(s, "str" | "int" | "float" | "bool")
}

fn parse_list(s: &str) -> Option<&str> {
    s.strip_prefix("list[").and_then(|rest| rest.strip_suffix(']'))
}

fn check_simple(literal: &str, value: &Value) -> Result<(), IceError> {
    if let Some(elem) = parse_list(literal) {
        let Value::Array(items) = value else {
            return Err(IceError::validation(format!("expected list[{elem}], got {value}")));
        };
        for item in items {
            check_scalar(elem, item)?;
        }
        return Ok(());
    }
    if literal == "dict" {
        return if value.is_object() {
            Ok(())
        } else {
            Err(IceError::validation(format!("expected dict, got {value}")))
        };
    }
    check_scalar(literal, value)
}

fn check_scalar(scalar: &str, value: &Value) -> Result<(), IceError> {
    let ok = match scalar {
        "str" => value.is_string(),
        "int" => value.is_i64() || value.is_u64(),
        "float" => value.is_number(),
        "bool" => value.is_boolean(),
        other => return Err(IceError::validation(format!("unknown scalar type '{other}'"))),
    };
    if ok {
        Ok(())
    } else {
        Err(IceError::validation(format!("value {value} does not match type '{scalar}'")))
    }
}

fn check_json_schema(schema: &Value, value: &Value) -> Result<(), IceError> {
    if let Some(ty) = schema.get("type").and_then(Value::as_str) {
        let ok = match ty {
            "string" => value.is_string(),
            "integer" => value.is_i64() || value.is_u64(),
            "number" => value.is_number(),
            "boolean" => value.is_boolean(),
            "object" => value.is_object(),
            "array" => value.is_array(),
            "null" => value.is_null(),
            other => return Err(IceError::validation(format!("unsupported json-schema type '{other}'"))),
        };
        if !ok {
            return Err(IceError::validation(format!("value {value} does not match type '{ty}'")));
        }
    }

    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for key in required {
            let Some(key) = key.as_str() else { continue };
            if value.get(key).is_none() {
                return Err(IceError::validation(format!("missing required property '{key}'")));
            }
        }
    }

    if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
        for (key, sub_schema) in properties {
            if let Some(sub_value) = value.get(key) {
                check_json_schema(sub_schema, sub_value)?;
            }
        }
    }

    if let (Some(items_schema), Value::Array(items)) = (schema.get("items"), value) {
        for item in items {
            check_json_schema(items_schema, item)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_known_scalar_literals() {
        for literal in ["str", "int", "float", "bool", "dict", "list[str]"] {
            assert!(SchemaDecl::Simple(literal.into()).validate_literal().is_ok());
        }
    }

    #[test]
    fn rejects_unknown_literal() {
        assert!(SchemaDecl::Simple("tuple".into()).validate_literal().is_err());
    }

    #[test]
    fn checks_scalar_value() {
        let schema = SchemaDecl::Simple("int".into());
        assert!(schema.check(&json!(5)).is_ok());
        assert!(schema.check(&json!("nope")).is_err());
    }

    #[test]
    fn checks_list_element_type() {
        let schema = SchemaDecl::Simple("list[str]".into());
        assert!(schema.check(&json!(["a", "b"])).is_ok());
        assert!(schema.check(&json!(["a", 1])).is_err());
    }

    #[test]
    fn checks_json_schema_required_properties() {
        let schema = SchemaDecl::Json(json!({
            "type": "object",
            "required": ["a"],
            "properties": {"a": {"type": "integer"}}
        }));
        assert!(schema.check(&json!({"a": 1})).is_ok());
        assert!(schema.check(&json!({})).is_err());
        assert!(schema.check(&json!({"a": "no"})).is_err());
    }
}
