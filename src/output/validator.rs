//! Declared output type of an agent and validation of final outputs.

use schemars::JsonSchema;
use serde_json::{Map, Value, json};

use super::schema::{check_strict_compatible, transform_for_strict};
use crate::{Error, Result};

/// Key under which non-object outputs are wrapped for the model.
const WRAPPER_KEY: &str = "response";

/// JSON schema an agent's final output must satisfy.
///
/// Strict mode is on by default. Object schemas are sent to the model as-is;
/// any other non-text type is wrapped in a single-field object and unwrapped
/// again before validation.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSchema {
    name: String,
    schema: Value,
    strict: bool,
}

impl OutputSchema {
    pub fn new(name: impl Into<String>, schema: Value) -> Self {
        Self {
            name: name.into(),
            schema,
            strict: true,
        }
    }

    pub fn for_type<T: JsonSchema>() -> Self {
        let mut schema = serde_json::to_value(schemars::schema_for!(T))
            .unwrap_or_else(|_| json!({"type": "object"}));
        if let Some(map) = schema.as_object_mut() {
            map.remove("$schema");
        }
        Self::new(T::schema_name(), schema)
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn schema(&self) -> &Value {
        &self.schema
    }

    /// Output is free text; the model gets no schema at all.
    pub fn is_plain_text(&self) -> bool {
        root_type(&self.schema) == Some("string")
    }

    fn is_wrapped(&self) -> bool {
        !self.is_plain_text() && root_type(&self.schema) != Some("object")
    }

    /// Fails with [`Error::StrictSchema`] when strict mode was requested for a
    /// schema that strict mode cannot express.
    pub fn ensure_strict_compatible(&self) -> Result<()> {
        if !self.strict || self.is_plain_text() {
            return Ok(());
        }
        check_strict_compatible(&self.schema).map_err(|reason| Error::StrictSchema {
            schema: self.name.clone(),
            reason,
        })
    }

    /// Schema presented to the model, or `None` for plain text.
    pub fn model_schema(&self) -> Option<Value> {
        if self.is_plain_text() {
            return None;
        }
        let schema = if self.is_wrapped() {
            wrap(self.schema.clone())
        } else {
            self.schema.clone()
        };
        Some(if self.strict {
            transform_for_strict(schema)
        } else {
            schema
        })
    }

    /// Parse and validate a candidate final output produced by `agent`.
    ///
    /// String candidates are parsed as JSON unless the declared type is text.
    pub fn coerce(&self, agent: &str, value: Value) -> Result<Value> {
        let invalid = |message: String| Error::OutputValidation {
            agent: agent.to_string(),
            message,
        };

        let mut value = match value {
            Value::String(text) if !self.is_plain_text() => serde_json::from_str(&text)
                .map_err(|e| invalid(format!("output is not valid JSON: {e}")))?,
            other => other,
        };

        if self.is_wrapped() {
            value = unwrap(value);
        }

        let validator = jsonschema::Validator::new(&self.schema)
            .map_err(|e| invalid(format!("invalid output schema `{}`: {e}", self.name)))?;
        if !validator.is_valid(&value) {
            let errors: Vec<String> = validator.iter_errors(&value).map(|e| e.to_string()).collect();
            return Err(invalid(errors.join("; ")));
        }
        Ok(value)
    }
}

fn root_type(schema: &Value) -> Option<&str> {
    schema.get("type").and_then(Value::as_str)
}

fn unwrap(value: Value) -> Value {
    match value {
        Value::Object(mut map) if map.len() == 1 && map.contains_key(WRAPPER_KEY) => {
            map.remove(WRAPPER_KEY).unwrap_or_default()
        }
        other => other,
    }
}

fn wrap(mut inner: Value) -> Value {
    let mut wrapper = Map::new();
    if let Some(defs) = inner.as_object_mut().and_then(|m| m.remove("$defs")) {
        wrapper.insert("$defs".into(), defs);
    }
    wrapper.insert("type".into(), json!("object"));
    wrapper.insert("properties".into(), json!({ WRAPPER_KEY: inner }));
    wrapper.insert("required".into(), json!([WRAPPER_KEY]));
    wrapper.insert("additionalProperties".into(), json!(false));
    Value::Object(wrapper)
}
