// SPDX-License-Identifier: MIT OR Apache-2.0
//! Tracing subscriber setup driven by the `[logging]` config section.

use qeb_config::{LogFormat, LoggingConfig};
use tracing_subscriber::EnvFilter;

/// Build the filter for `config`.
///
/// `RUST_LOG` wins when set; otherwise the configured level applies to the
/// `qeb` targets.
pub fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("qeb={}", config.level())))
}

/// Install a global fmt subscriber for `config`, writing to stderr.
///
/// Returns `false` if a global subscriber was already installed, in which
/// case nothing changes.
pub fn init_tracing(config: &LoggingConfig) -> bool {
    let filter = env_filter(config);
    match config.format() {
        LogFormat::Text => tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(filter)
            .try_init()
            .is_ok(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_writer(std::io::stderr)
            .with_env_filter(filter)
            .try_init()
            .is_ok(),
    }
}
