//! Tracing subscriber setup for binaries and services embedding cadence.

use anyhow::Result;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LoggingConfig;

/// ## Summary
/// Installs a global fmt subscriber filtered by the configured level.
///
/// An invalid filter directive falls back to `info` with a warning.
///
/// ## Errors
/// Returns an error if a global subscriber is already installed.
pub fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let (filter, rejected) = match EnvFilter::try_new(logging.level.as_str()) {
        Ok(filter) => (filter, false),
        Err(_) => (EnvFilter::new("info"), true),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_file(true)
                .with_line_number(true),
        )
        .try_init()?;

    if rejected {
        tracing::warn!(level = %logging.level, "Invalid log level in config, using info");
    }
    Ok(())
}
