//! Tracing spans for runs, turns, tool calls and hand-offs.
//!
//! Spans are emitted through `tracing`; exporting them is the subscriber's job.
//! With the `subscriber` feature, [`init_tracing`] installs a console subscriber
//! filtered by `RUST_LOG`.

mod spans;

pub(crate) use spans::duration_ms;
pub use spans::{ModelCallSpan, RunSpans, TracingConfig, gen_trace_id};

/// Install a formatted console subscriber honoring `RUST_LOG` (default `info`).
///
/// Returns `false` when a global subscriber was already set.
#[cfg(feature = "subscriber")]
#[cfg_attr(docsrs, doc(cfg(feature = "subscriber")))]
pub fn init_tracing() -> bool {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .try_init()
        .is_ok()
}
