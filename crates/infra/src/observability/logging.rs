//! Structured logging initialization
//!
//! Installs a `tracing-subscriber` registry with an [`EnvFilter`] and either
//! a compact human-readable or a JSON fmt layer. `RUST_LOG` takes precedence
//! over the configured level.

use jobwarden_domain::LoggingConfig;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Filter from `RUST_LOG`, falling back to the configured level
///
/// An unparsable level falls back to `info`.
pub fn build_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber
///
/// Returns `false` when a global subscriber was already installed; that is
/// not an error, so tests and embedding hosts can call this freely.
pub fn init_logging(config: &LoggingConfig) -> bool {
    let filter = build_filter(config);

    let layer = if config.json {
        fmt::layer()
            .json()
            .with_target(true)
            .with_current_span(true)
            .with_filter(filter)
            .boxed()
    } else {
        fmt::layer().compact().with_target(true).with_filter(filter).boxed()
    };

    let installed = tracing_subscriber::registry().with(layer).try_init().is_ok();
    if installed {
        tracing::info!(
            component = "logging",
            event = "initialized",
            level = %config.level,
            json = config.json,
            "Logging initialized"
        );
    } else {
        tracing::debug!("Global tracing subscriber already initialized - continuing with existing subscriber");
    }
    installed
}
