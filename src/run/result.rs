//! Outcome of a run.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::RunMetrics;
use crate::Error;
use crate::types::{ResponseItem, RunItem, text_message_outputs};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// A final output was produced.
    Completed,
    /// The cancellation token fired; there is no final output.
    Cancelled,
    /// The run timeout elapsed; there is no final output.
    TimedOut,
}

impl RunStatus {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

#[derive(Debug, Clone)]
pub struct RunResult {
    pub final_output: Option<Value>,
    /// Every item produced during the run, in production order.
    pub items: Vec<RunItem>,
    /// The input the run started from.
    pub input: Vec<ResponseItem>,
    /// Agent that was active when the run ended.
    pub last_agent: String,
    pub status: RunStatus,
    pub metrics: RunMetrics,
    pub trace_id: String,
}

impl RunResult {
    /// Original input followed by every produced item, ready to feed a follow-up run
    /// started at [`last_agent`](Self::last_agent).
    pub fn to_input_list(&self) -> Vec<ResponseItem> {
        self.input
            .iter()
            .cloned()
            .chain(self.items.iter().map(RunItem::to_input_item))
            .collect()
    }

    /// Deserialize the final output into `T`.
    pub fn final_output_as<T: DeserializeOwned>(&self) -> crate::Result<T> {
        let value = self
            .final_output
            .clone()
            .ok_or_else(|| Error::OutputValidation {
                agent: self.last_agent.clone(),
                message: format!("run ended {:?} without a final output", self.status),
            })?;
        Ok(serde_json::from_value(value)?)
    }

    /// Final output as text: strings verbatim, other values JSON-encoded.
    pub fn final_output_text(&self) -> Option<String> {
        self.final_output.as_ref().map(crate::types::value_to_text)
    }

    /// Concatenated assistant message text across the run.
    pub fn message_text(&self) -> String {
        text_message_outputs(&self.items)
    }

    pub fn is_completed(&self) -> bool {
        self.status.is_completed()
    }
}

/// A fatal error together with the history accumulated before it.
#[derive(Debug)]
pub struct RunError {
    pub error: Error,
    pub items: Vec<RunItem>,
    pub last_agent: String,
    /// Turns started before the failure.
    pub turns: u32,
}

impl RunError {
    pub fn into_error(self) -> Error {
        self.error
    }
}

impl std::fmt::Display for RunError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (agent `{}`, turn {})",
            self.error, self.last_agent, self.turns
        )
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}
