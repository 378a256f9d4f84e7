//! Per-run settings.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::Result;
use crate::agent::ModelSettings;
use crate::config::{ConfigProvider, ConfigProviderExt, keys};
use crate::observability::TracingConfig;

pub const DEFAULT_MAX_TURNS: u32 = 10;

/// Settings for a single [`Runner::run`](crate::Runner::run) call.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Model calls allowed before the run fails with `MaxTurnsExceeded`.
    pub max_turns: u32,
    /// Model name sent with every request, overriding each agent's own.
    pub model: Option<String>,
    /// Merged over each agent's settings; set fields win.
    pub model_settings: ModelSettings,
    /// Abort on the first tool or hand-off failure instead of reporting it to the model.
    pub fail_fast: bool,
    pub tracing: TracingConfig,
    /// Wall-clock limit for the whole run, checked between turns.
    pub timeout: Option<Duration>,
    /// Limit applied to every individual tool call.
    pub tool_timeout: Option<Duration>,
    pub cancellation: CancellationToken,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_turns: DEFAULT_MAX_TURNS,
            model: None,
            model_settings: ModelSettings::default(),
            fail_fast: false,
            tracing: TracingConfig::default(),
            timeout: None,
            tool_timeout: None,
            cancellation: CancellationToken::new(),
        }
    }
}

impl RunConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overlaid with every key `provider` defines.
    pub async fn load<P>(provider: &P) -> Result<Self>
    where
        P: ConfigProvider + ?Sized,
    {
        let mut config = Self::default();

        if let Some(max_turns) = provider.get::<u32>(keys::MAX_TURNS).await? {
            config.max_turns = max_turns;
        }
        if let Some(fail_fast) = provider.get::<bool>(keys::FAIL_FAST).await? {
            config.fail_fast = fail_fast;
        }
        if let Some(model) = provider.get_string(keys::MODEL).await? {
            config.model = Some(model);
        }
        if let Some(name) = provider.get_string(keys::WORKFLOW_NAME).await? {
            config.tracing.workflow_name = name;
        }
        if let Some(enabled) = provider.get::<bool>(keys::TRACING_ENABLED).await? {
            config.tracing.enabled = enabled;
        }
        if let Some(secs) = provider.get::<u64>(keys::TIMEOUT_SECS).await? {
            config.timeout = Some(Duration::from_secs(secs));
        }
        if let Some(secs) = provider.get::<u64>(keys::TOOL_TIMEOUT_SECS).await? {
            config.tool_timeout = Some(Duration::from_secs(secs));
        }

        tracing::debug!(
            provider = provider.name(),
            max_turns = config.max_turns,
            fail_fast = config.fail_fast,
            "Loaded run configuration"
        );
        Ok(config)
    }

    pub fn with_max_turns(mut self, max_turns: u32) -> Self {
        self.max_turns = max_turns;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_model_settings(mut self, settings: ModelSettings) -> Self {
        self.model_settings = settings;
        self
    }

    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    pub fn with_tracing(mut self, tracing: TracingConfig) -> Self {
        self.tracing = tracing;
        self
    }

    pub fn with_workflow_name(mut self, name: impl Into<String>) -> Self {
        self.tracing.workflow_name = name.into();
        self
    }

    pub fn without_tracing(mut self) -> Self {
        self.tracing.enabled = false;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = Some(timeout);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }
}
