//! Logging for cadence
//!
//! Installs a `tracing-subscriber` registry with an `EnvFilter` and a text or
//! JSON formatting layer.

use cadence_config::{LogFormat, LoggingConfig};
use tracing_subscriber::EnvFilter;

/// Filter used when the configured directive does not parse
const FALLBACK_FILTER: &str = "info";

/// Initialize the global subscriber from configuration
///
/// `RUST_LOG` takes precedence over `logging.filter` when set.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed
pub fn init(config: &LoggingConfig) -> anyhow::Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let (filter, rejected) = build_filter(config);

    let (text_layer, json_layer) = match config.format {
        LogFormat::Text => (
            Some(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            ),
            None,
        ),
        LogFormat::Json => (
            None,
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_current_span(false),
            ),
        ),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(text_layer)
        .with(json_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install log subscriber: {e}"))?;

    if let Some(directive) = rejected {
        tracing::warn!(filter = %directive, fallback = FALLBACK_FILTER, "invalid log filter, using fallback");
    }

    Ok(())
}

/// Resolve the active filter, returning the rejected directive if any
fn build_filter(config: &LoggingConfig) -> (EnvFilter, Option<String>) {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return (filter, None);
    }

    match EnvFilter::try_new(&config.filter) {
        Ok(filter) => (filter, None),
        Err(_) => (EnvFilter::new(FALLBACK_FILTER), Some(config.filter.clone())),
    }
}
