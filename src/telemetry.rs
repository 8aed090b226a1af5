//! Tracing subscriber setup.
//!
//! Structured, async-aware logging via `tracing` and `tracing-subscriber`.
//! The filter honors `RUST_LOG` when set and otherwise falls back to the
//! configured application log level.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{AppResult, FlowError};

/// Initialize the global tracing subscriber.
///
/// Safe to call once per process; a second call reports a configuration
/// error instead of panicking.
pub fn init(level: &str) -> AppResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| FlowError::Configuration(format!("invalid log filter: {e}")))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .try_init()
        .map_err(|e| FlowError::Configuration(format!("tracing init failed: {e}")))?;

    Ok(())
}
