//! Argument parsing and schema validation for tool calls.

use serde_json::Value;

use crate::types::ToolError;

/// Parse the model's raw argument text and validate it against `schema`.
///
/// Empty argument text is treated as an empty object.
pub fn validate_arguments(tool: &str, schema: &Value, raw: &str) -> Result<Value, ToolError> {
    let args: Value = if raw.trim().is_empty() {
        Value::Object(serde_json::Map::new())
    } else {
        serde_json::from_str(raw)
            .map_err(|e| ToolError::invalid_input(tool, format!("arguments are not JSON: {e}")))?
    };
    validate_against_schema(tool, schema, &args)?;
    Ok(args)
}

/// Validate an already-parsed value against a JSON schema.
pub fn validate_against_schema(tool: &str, schema: &Value, args: &Value) -> Result<(), ToolError> {
    let validator = jsonschema::Validator::new(schema)
        .map_err(|e| ToolError::invalid_input(tool, format!("invalid tool schema: {e}")))?;
    if validator.is_valid(args) {
        return Ok(());
    }
    let errors: Vec<String> = validator.iter_errors(args).map(|e| e.to_string()).collect();
    Err(ToolError::invalid_input(tool, errors.join("; ")))
}
