//! Pluggable configuration providers for run settings.
//!
//! Keys are dotted lowercase names (see [`keys`]). The environment provider maps
//! them to `AGENT_RELAY_`-prefixed variables, so `tool.timeout.secs` is read from
//! `AGENT_RELAY_TOOL_TIMEOUT_SECS`.
//!
//! ```rust,no_run
//! use agent_relay::RunConfig;
//! use agent_relay::config::{ConfigBuilder, MemoryConfigProvider};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigBuilder::new()
//!     .env()
//!     .memory(MemoryConfigProvider::new().value("max_turns", "8"))
//!     .build();
//! let run_config = RunConfig::load(&config).await?;
//! # Ok(())
//! # }
//! ```

pub mod composite;
pub mod env;
pub mod memory;
pub mod provider;

pub use composite::CompositeConfigProvider;
pub use env::EnvConfigProvider;
pub use memory::MemoryConfigProvider;
pub use provider::{ConfigProvider, ConfigProviderExt};

use thiserror::Error;

/// Prefix of environment variables read by [`EnvConfigProvider::new`].
pub const ENV_PREFIX: &str = "AGENT_RELAY_";

/// Configuration keys understood by [`RunConfig::load`](crate::RunConfig::load).
pub mod keys {
    pub const MAX_TURNS: &str = "max_turns";
    pub const FAIL_FAST: &str = "fail_fast";
    pub const MODEL: &str = "model";
    pub const WORKFLOW_NAME: &str = "workflow.name";
    pub const TRACING_ENABLED: &str = "tracing.enabled";
    pub const TIMEOUT_SECS: &str = "timeout.secs";
    pub const TOOL_TIMEOUT_SECS: &str = "tool.timeout.secs";

    pub const ALL: &[&str] = &[
        MAX_TURNS,
        FAIL_FAST,
        MODEL,
        WORKFLOW_NAME,
        TRACING_ENABLED,
        TIMEOUT_SECS,
        TOOL_TIMEOUT_SECS,
    ];
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Key not found: {key}")]
    NotFound { key: String },

    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Environment error: {0}")]
    Env(#[from] std::env::VarError),

    #[error("Provider error: {message}")]
    Provider { message: String },
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Builds a [`CompositeConfigProvider`]; providers added first take priority.
pub struct ConfigBuilder {
    providers: Vec<Box<dyn ConfigProvider>>,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    /// `AGENT_RELAY_`-prefixed environment variables.
    pub fn env(mut self) -> Self {
        self.providers.push(Box::new(EnvConfigProvider::new()));
        self
    }

    pub fn env_with_prefix(mut self, prefix: &str) -> Self {
        self.providers
            .push(Box::new(EnvConfigProvider::prefixed(prefix)));
        self
    }

    pub fn memory(mut self, provider: MemoryConfigProvider) -> Self {
        self.providers.push(Box::new(provider));
        self
    }

    pub fn provider(mut self, provider: Box<dyn ConfigProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn build(self) -> CompositeConfigProvider {
        self.providers
            .into_iter()
            .fold(CompositeConfigProvider::new(), |c, p| c.provider(p))
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
