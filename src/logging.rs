// ABOUTME: Logging configuration and tracing subscriber setup for the CLI
// ABOUTME: Env-filter based levels with pretty, compact, and JSON output formats
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Meridian Labs

//! Structured logging setup. Library code only emits `tracing` events;
//! the binary calls [`init`] once at startup.

use std::env;

use tracing_subscriber::EnvFilter;

use crate::errors::{ClientError, ClientResult};

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log filter directive (`RUST_LOG` syntax)
    pub level: String,
    /// Output format
    pub format: LogFormat,
}

/// Log output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON format for machine-readable output
    Json,
    /// Pretty format for development
    Pretty,
    /// Compact single-line format
    Compact,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: LogFormat::Pretty,
        }
    }
}

impl LoggingConfig {
    /// Create logging configuration from `RUST_LOG` and `LOG_FORMAT`
    #[must_use]
    pub fn from_env() -> Self {
        let level = env::var("RUST_LOG").unwrap_or_else(|_| "info".into());
        let format = match env::var("LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            Ok("compact") => LogFormat::Compact,
            _ => LogFormat::Pretty,
        };
        Self { level, format }
    }
}

/// Initialize the global tracing subscriber
///
/// # Errors
///
/// Returns an error if the filter directive is invalid or a subscriber
/// is already installed.
pub fn init(config: &LoggingConfig) -> ClientResult<()> {
    let filter = EnvFilter::try_new(&config.level)
        .map_err(|e| ClientError::config(format!("invalid log filter '{}': {e}", config.level)))?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let result = match config.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Compact => builder.compact().try_init(),
    };

    result.map_err(|e| ClientError::config(format!("failed to install logger: {e}")))
}
