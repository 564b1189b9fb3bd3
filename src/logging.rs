//! Tracing subscriber setup shared by every subcommand.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Set to `1` for one JSON object per log line.
pub const LOG_JSON_ENV: &str = "QUICKBOARD_LOG_JSON";

/// Install the global subscriber. `RUST_LOG` wins over `default_level`.
/// Logs go to stderr so command output on stdout stays clean.
pub fn init(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let json = std::env::var(LOG_JSON_ENV).is_ok_and(|v| v == "1");

    let registry = tracing_subscriber::registry().with(filter);
    let result = if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init()
    };
    if let Err(e) = result {
        eprintln!("tracing already initialised: {}", e);
    }
}
