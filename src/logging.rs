//! Tracing setup with configurable verbosity.
//!
//! - Minimal: warnings and errors only
//! - Compact: poll results and requests
//! - Verbose: every outbound call, including response excerpts
//!
//! `RUST_LOG` overrides the verbosity when set.

use crate::config::{LogVerbosity, LoggingConfig};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Default filter directive for a verbosity level.
pub fn default_directive(verbosity: LogVerbosity) -> &'static str {
    match verbosity {
        LogVerbosity::Minimal => "warn",
        LogVerbosity::Compact => "info,tower_http=info",
        LogVerbosity::Verbose => "debug,hyper=info,reqwest=info",
    }
}

fn build_filter(verbosity: LogVerbosity) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)))
}

/// Install the global subscriber. Safe to call more than once; later calls are ignored.
pub fn init(config: &LoggingConfig) {
    let filter = build_filter(config.verbosity);

    let result = if config.json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_target(false))
            .with(filter)
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_target(false))
            .with(filter)
            .try_init()
    };

    if let Err(e) = result {
        tracing::debug!(error = %e, "tracing subscriber already installed");
    }
}
