//! Argument validation against a tool's declared JSON schema
//!
//! Checks the subset of JSON Schema the built-in tools declare: object type,
//! required fields, property types, and string enums.

use serde_json::Value;

/// Validate tool arguments against a JSON Schema.
///
/// Returns the first violated constraint as a human-readable message.
pub fn validate_arguments(args: &Value, schema: &Value) -> std::result::Result<(), String> {
    if let Some(schema_type) = schema.get("type").and_then(|v| v.as_str()) {
        if schema_type == "object" && !args.is_object() {
            return Err(format!(
                "expected object arguments, got {}",
                json_type_name(args)
            ));
        }
    }

    let Some(obj) = args.as_object() else {
        return Ok(());
    };

    if let Some(required) = schema.get("required").and_then(|v| v.as_array()) {
        for name in required.iter().filter_map(|f| f.as_str()) {
            match obj.get(name) {
                None | Some(Value::Null) => {
                    return Err(format!("missing required field '{name}'"));
                }
                Some(_) => {}
            }
        }
    }

    if let Some(properties) = schema.get("properties").and_then(|v| v.as_object()) {
        for (key, value) in obj {
            let Some(prop_schema) = properties.get(key) else {
                continue;
            };

            if let Some(expected) = prop_schema.get("type").and_then(|v| v.as_str()) {
                if !value_matches_type(value, expected) {
                    return Err(format!(
                        "field '{}' expected type '{}', got {}",
                        key,
                        expected,
                        json_type_name(value)
                    ));
                }
            }

            if let Some(allowed) = prop_schema.get("enum").and_then(|v| v.as_array()) {
                if !allowed.contains(value) {
                    let options: Vec<String> = allowed.iter().map(|v| v.to_string()).collect();
                    return Err(format!(
                        "field '{}' must be one of [{}], got {}",
                        key,
                        options.join(", "),
                        value
                    ));
                }
            }
        }
    }

    Ok(())
}

fn value_matches_type(value: &Value, expected: &str) -> bool {
    match expected {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        "null" => value.is_null(),
        _ => true,
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
