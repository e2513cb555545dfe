//! Input validation against a feature's JSON Schema.
//!
//! Covers the subset features declare in practice: `type` (single or list),
//! `required`, `properties`, `additionalProperties: false`, `enum` and
//! `items`, plus the boolean schemas `true` and `false`. Unknown keywords are
//! ignored, so a richer schema still validates on the parts understood here.

use serde_json::{Map, Value};

/// Validate `input` against `schema`.
///
/// On failure the message names the offending path, rooted at `input`
/// (e.g. `input.q: expected string, got number`).
pub fn validate_input(schema: &Value, input: &Value) -> Result<(), String> {
    validate_at(schema, input, "input")
}

fn validate_at(schema: &Value, value: &Value, path: &str) -> Result<(), String> {
    let schema = match schema {
        Value::Object(schema) => schema,
        Value::Bool(false) => return Err(format!("{path}: no value is allowed here")),
        // `true` and non-schema values accept anything
        _ => return Ok(()),
    };

    if let Some(expected) = schema.get("type") {
        check_type(expected, value, path)?;
    }

    if let Some(Value::Array(allowed)) = schema.get("enum") {
        if !allowed.contains(value) {
            return Err(format!("{path}: {value} is not one of {}", Value::Array(allowed.clone())));
        }
    }

    if let Value::Object(fields) = value {
        check_object(schema, fields, path)?;
    }

    if let (Value::Array(elements), Some(items)) = (value, schema.get("items")) {
        for (i, element) in elements.iter().enumerate() {
            validate_at(items, element, &format!("{path}[{i}]"))?;
        }
    }

    Ok(())
}

fn check_object(schema: &Map<String, Value>, fields: &Map<String, Value>, path: &str) -> Result<(), String> {
    if let Some(Value::Array(required)) = schema.get("required") {
        for key in required.iter().filter_map(Value::as_str) {
            if !fields.contains_key(key) {
                return Err(format!("{path}: missing required field '{key}'"));
            }
        }
    }

    let properties = schema.get("properties").and_then(Value::as_object);
    let closed = matches!(schema.get("additionalProperties"), Some(Value::Bool(false)));

    for (key, field) in fields {
        match properties.and_then(|p| p.get(key)) {
            Some(sub) => validate_at(sub, field, &format!("{path}.{key}"))?,
            None if closed => return Err(format!("{path}: unexpected field '{key}'")),
            None => {}
        }
    }

    Ok(())
}

fn check_type(expected: &Value, value: &Value, path: &str) -> Result<(), String> {
    let matches = match expected {
        Value::String(name) => type_matches(name, value),
        Value::Array(names) => names
            .iter()
            .filter_map(Value::as_str)
            .any(|name| type_matches(name, value)),
        _ => true,
    };

    if matches {
        Ok(())
    } else {
        Err(format!("{path}: expected {}, got {}", type_label(expected), json_type(value)))
    }
}

fn type_matches(name: &str, value: &Value) -> bool {
    match name {
        "object" => value.is_object(),
        "array" => value.is_array(),
        "string" => value.is_string(),
        "boolean" => value.is_boolean(),
        "null" => value.is_null(),
        "number" => value.is_number(),
        "integer" => {
            value.is_i64()
                || value.is_u64()
                || value.as_f64().is_some_and(|f| f.fract() == 0.0)
        }
        // unknown type names are not ours to reject
        _ => true,
    }
}

fn type_label(expected: &Value) -> String {
    match expected {
        Value::String(name) => name.clone(),
        Value::Array(names) => names
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(" or "),
        other => other.to_string(),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
