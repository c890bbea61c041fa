//! Logging utilities for the check service.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Initialize tracing with human-readable output.
///
/// `RUST_LOG` takes precedence over `level` when it is set.
pub fn init(level: &str) {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter(level))
        .init();
}

/// Initialize tracing with JSON formatting (useful for structured logging).
pub fn init_json(level: &str) {
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(filter(level))
        .init();
}
