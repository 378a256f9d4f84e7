//! Counters collected over one run.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::observability::duration_ms;
use crate::types::Usage;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunMetrics {
    pub turns: u32,
    pub model_calls: u32,
    pub tool_calls: usize,
    pub tool_errors: usize,
    pub handoffs: usize,
    pub usage: Usage,
    pub tool_stats: HashMap<String, ToolStats>,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolStats {
    pub calls: usize,
    pub errors: usize,
    pub total_time_ms: u64,
}

impl RunMetrics {
    pub fn record_model_call(&mut self, usage: &Usage) {
        self.model_calls += 1;
        self.usage.add(usage);
    }

    pub fn record_tool(&mut self, name: &str, duration: Duration, is_error: bool) {
        self.tool_calls += 1;
        let stats = self.tool_stats.entry(name.to_string()).or_default();
        stats.calls += 1;
        stats.total_time_ms += duration_ms(duration);
        if is_error {
            stats.errors += 1;
            self.tool_errors += 1;
        }
    }

    pub fn record_handoff(&mut self) {
        self.handoffs += 1;
    }

    pub fn total_tokens(&self) -> u32 {
        self.usage.total()
    }

    pub fn avg_tool_time_ms(&self) -> f64 {
        if self.tool_calls == 0 {
            return 0.0;
        }
        let total: u64 = self.tool_stats.values().map(|s| s.total_time_ms).sum();
        total as f64 / self.tool_calls as f64
    }
}
