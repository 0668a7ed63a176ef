//! Lightweight structural checks of call parameters against a JSON Schema.
//!
//! Only the shape the model is most likely to get wrong is checked:
//! required fields, primitive property types, and `enum` membership.
//! Anything the checker does not understand passes.

use serde_json::Value;

use crate::message::Params;

/// Check `params` against `schema`, returning a model-facing reason on failure.
pub(crate) fn validate_params(params: &Params, schema: &Value) -> Result<(), String> {
    let Some(schema) = schema.as_object() else {
        return Ok(());
    };

    if let Some(Value::Array(required)) = schema.get("required") {
        for field in required.iter().filter_map(Value::as_str) {
            if !params.contains_key(field) {
                return Err(format!("missing required field: {field}"));
            }
        }
    }

    let Some(Value::Object(properties)) = schema.get("properties") else {
        return Ok(());
    };
    for (field, prop) in properties {
        let Some(value) = params.get(field) else {
            continue;
        };
        if let Some(Value::String(expected)) = prop.get("type")
            && !type_matches(value, expected)
        {
            return Err(format!(
                "field '{field}' expected type '{expected}', got {}",
                type_name(value)
            ));
        }
        if let Some(Value::Array(allowed)) = prop.get("enum")
            && !allowed.contains(value)
        {
            return Err(format!("field '{field}' must be one of {}", Value::Array(allowed.clone())));
        }
    }

    Ok(())
}

fn type_matches(value: &Value, expected: &str) -> bool {
    match expected {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        "null" => value.is_null(),
        _ => true,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
