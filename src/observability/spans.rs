//! Structured span definitions for tracing.

use std::time::{Duration, Instant};

use tracing::{Level, Span, field, span};

/// Per-run tracing settings.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    pub enabled: bool,
    pub workflow_name: String,
    /// Generated per run when absent.
    pub trace_id: Option<String>,
    /// Links several runs of one conversation.
    pub group_id: Option<String>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            workflow_name: "Agent workflow".to_string(),
            trace_id: None,
            group_id: None,
        }
    }
}

impl TracingConfig {
    pub fn new(workflow_name: impl Into<String>) -> Self {
        Self {
            workflow_name: workflow_name.into(),
            ..Default::default()
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }

    pub fn with_group_id(mut self, group_id: impl Into<String>) -> Self {
        self.group_id = Some(group_id.into());
        self
    }
}

/// Whole milliseconds, saturating at `u64::MAX`.
pub(crate) fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// `trace_` followed by 32 lowercase hex characters.
pub fn gen_trace_id() -> String {
    format!("trace_{}", uuid::Uuid::new_v4().simple())
}

/// Span factory for one run. Every span carries the run's trace id and workflow name.
#[derive(Debug, Clone)]
pub struct RunSpans {
    trace_id: String,
    workflow_name: String,
    group_id: Option<String>,
    enabled: bool,
}

impl RunSpans {
    pub fn new(config: &TracingConfig) -> Self {
        Self {
            trace_id: config.trace_id.clone().unwrap_or_else(gen_trace_id),
            workflow_name: config.workflow_name.clone(),
            group_id: config.group_id.clone(),
            enabled: config.enabled,
        }
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn run_span(&self, starting_agent: &str) -> Span {
        if !self.enabled {
            return Span::none();
        }
        span!(
            Level::INFO,
            "agent.run",
            trace_id = %self.trace_id,
            workflow_name = %self.workflow_name,
            group_id = self.group_id.as_deref(),
            starting_agent = starting_agent,
            last_agent = field::Empty,
            turns = field::Empty,
        )
    }

    pub fn turn_span(&self, turn: u32, agent: &str) -> Span {
        if !self.enabled {
            return Span::none();
        }
        span!(
            Level::INFO,
            "agent.turn",
            trace_id = %self.trace_id,
            workflow_name = %self.workflow_name,
            turn = turn,
            agent = agent,
        )
    }

    pub fn tool_span(&self, tool_name: &str, call_id: &str) -> Span {
        if !self.enabled {
            return Span::none();
        }
        span!(
            Level::INFO,
            "tool.execute",
            trace_id = %self.trace_id,
            workflow_name = %self.workflow_name,
            tool_name = tool_name,
            call_id = call_id,
            is_error = field::Empty,
            duration_ms = field::Empty,
        )
    }

    pub fn handoff_span(&self, source: &str, target: &str) -> Span {
        if !self.enabled {
            return Span::none();
        }
        span!(
            Level::INFO,
            "agent.handoff",
            trace_id = %self.trace_id,
            workflow_name = %self.workflow_name,
            source = source,
            target = target,
        )
    }

    pub fn model_span(&self, agent: &str, model: Option<&str>) -> ModelCallSpan {
        let span = if self.enabled {
            span!(
                Level::DEBUG,
                "model.call",
                trace_id = %self.trace_id,
                agent = agent,
                model = model,
                input_tokens = field::Empty,
                output_tokens = field::Empty,
                latency_ms = field::Empty,
            )
        } else {
            Span::none()
        };
        ModelCallSpan {
            span,
            start: Instant::now(),
        }
    }
}

/// Tracks usage and latency of one model call.
pub struct ModelCallSpan {
    span: Span,
    start: Instant,
}

impl ModelCallSpan {
    pub fn record_usage(&self, input_tokens: u32, output_tokens: u32) {
        self.span.record("input_tokens", input_tokens);
        self.span.record("output_tokens", output_tokens);
    }

    pub fn finish(self) {
        let latency_ms = duration_ms(self.start.elapsed());
        self.span.record("latency_ms", latency_ms);
    }

    pub fn span(&self) -> &Span {
        &self.span
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_id_format() {
        let id = gen_trace_id();
        assert!(id.starts_with("trace_"));
        let hex = &id["trace_".len()..];
        assert_eq!(hex.len(), 32);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(id, gen_trace_id());
    }

    #[test]
    fn test_configured_trace_id_is_kept() {
        let spans = RunSpans::new(&TracingConfig::new("Support").with_trace_id("trace_fixed"));
        assert_eq!(spans.trace_id(), "trace_fixed");
    }

    #[test]
    fn test_disabled_spans_are_none() {
        let spans = RunSpans::new(&TracingConfig::disabled());
        assert!(!spans.is_enabled());
        assert!(spans.run_span("A").is_none());
        assert!(spans.turn_span(1, "A").is_none());
        assert!(spans.tool_span("t", "c").is_none());
        assert!(spans.handoff_span("A", "B").is_none());
        spans.model_span("A", None).finish();
    }

    #[test]
    fn test_duration_ms_saturates() {
        assert_eq!(duration_ms(Duration::from_millis(1500)), 1500);
        assert_eq!(duration_ms(Duration::MAX), u64::MAX);
    }
}
