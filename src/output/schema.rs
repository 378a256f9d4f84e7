//! Strict-mode schema transformation and compatibility checks.

use serde_json::Value;

/// Constraints dropped when a schema is presented to the model in strict form.
const UNSUPPORTED_PROPERTIES: &[&str] = &[
    "minimum",
    "maximum",
    "exclusiveMinimum",
    "exclusiveMaximum",
    "multipleOf",
    "minLength",
    "maxLength",
    "minItems",
    "maxItems",
    "minProperties",
    "maxProperties",
];

/// Keywords whose value is a map of name to sub-schema.
const SCHEMA_MAPS: &[&str] = &["properties", "$defs", "definitions"];

/// Transform a schema for strict mode.
///
/// - Adds `additionalProperties: false` to all objects
/// - Makes every property required when no `required` list is present
/// - Removes unsupported constraints (see `UNSUPPORTED_PROPERTIES`)
///
/// Callers that need to know whether the result still means the same thing
/// should run [`check_strict_compatible`] on the input first.
pub fn transform_for_strict(schema: Value) -> Value {
    transform_object(schema)
}

fn transform_object(mut value: Value) -> Value {
    if let Value::Object(ref mut map) = value {
        for prop in UNSUPPORTED_PROPERTIES {
            map.remove(*prop);
        }

        if map.get("type") == Some(&Value::String("object".to_string())) {
            map.insert("additionalProperties".to_string(), Value::Bool(false));

            if !map.contains_key("required")
                && let Some(Value::Object(props)) = map.get("properties")
            {
                let keys: Vec<Value> = props.keys().map(|k| Value::String(k.clone())).collect();
                if !keys.is_empty() {
                    map.insert("required".to_string(), Value::Array(keys));
                }
            }
        }

        for (_, v) in map.iter_mut() {
            *v = transform_object(std::mem::take(v));
        }
    }

    if let Value::Array(ref mut arr) = value {
        for v in arr.iter_mut() {
            *v = transform_object(std::mem::take(v));
        }
    }

    value
}

/// Check that `schema` can be expressed in strict mode without changing its meaning.
///
/// Strict mode closes every object, so open maps (`additionalProperties` given as a
/// schema or `true`), `patternProperties` and unconstrained `true` sub-schemas are
/// rejected. The error names the offending JSON pointer.
pub fn check_strict_compatible(schema: &Value) -> Result<(), String> {
    check_node(schema, "#")
}

fn check_node(value: &Value, path: &str) -> Result<(), String> {
    match value {
        Value::Bool(true) if path != "#" => Err(format!(
            "{path}: an unconstrained value cannot be represented in strict mode"
        )),
        Value::Object(map) => {
            if let Some(extra) = map.get("additionalProperties")
                && extra != &Value::Bool(false)
            {
                return Err(format!(
                    "{path}: additionalProperties must be false in strict mode"
                ));
            }
            if map.contains_key("patternProperties") {
                return Err(format!(
                    "{path}: patternProperties is not supported in strict mode"
                ));
            }

            for (key, child) in map {
                let child_path = format!("{path}/{key}");
                if SCHEMA_MAPS.contains(&key.as_str()) {
                    if let Value::Object(entries) = child {
                        for (name, sub) in entries {
                            check_node(sub, &format!("{child_path}/{name}"))?;
                        }
                    }
                } else if matches!(key.as_str(), "enum" | "const" | "default" | "examples") {
                    continue;
                } else {
                    check_node(child, &child_path)?;
                }
            }
            Ok(())
        }
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                check_node(item, &format!("{path}/{i}"))?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}
