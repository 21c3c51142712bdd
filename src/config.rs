// ABOUTME: Environment-based configuration for the Meridian client
// ABOUTME: Base URL and timeout settings with logged fallbacks to defaults
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Meridian Labs

use std::env;
use std::time::Duration;

use tracing::warn;

use crate::constants::{defaults, env_config};

/// Connection settings for the Meridian backend
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the backend, without a trailing path
    pub base_url: String,
    /// TCP connect timeout
    pub connect_timeout: Duration,
    /// Whole-request timeout; streaming reads are not bounded by this
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::API_URL.to_owned(),
            connect_timeout: Duration::from_secs(defaults::CONNECT_TIMEOUT_SECS),
            request_timeout: Duration::from_secs(defaults::REQUEST_TIMEOUT_SECS),
        }
    }
}

impl ClientConfig {
    /// Create configuration from environment variables
    ///
    /// Reads `MERIDIAN_API_URL`, `MERIDIAN_CONNECT_TIMEOUT_SECS`, and
    /// `MERIDIAN_REQUEST_TIMEOUT_SECS`. Unset or unparseable values fall
    /// back to defaults with a logged warning.
    #[must_use]
    pub fn from_env() -> Self {
        let base_url = env::var(env_config::API_URL)
            .ok()
            .filter(|raw| {
                if raw.is_empty() {
                    return false;
                }
                if url::Url::parse(raw).is_err() {
                    warn!(
                        "{}={raw} is not a valid URL, using {}",
                        env_config::API_URL,
                        defaults::API_URL
                    );
                    return false;
                }
                true
            })
            .unwrap_or_else(|| defaults::API_URL.to_owned());

        Self {
            base_url,
            connect_timeout: Duration::from_secs(parse_secs(
                env_config::CONNECT_TIMEOUT_SECS,
                defaults::CONNECT_TIMEOUT_SECS,
            )),
            request_timeout: Duration::from_secs(parse_secs(
                env_config::REQUEST_TIMEOUT_SECS,
                defaults::REQUEST_TIMEOUT_SECS,
            )),
        }
    }

    /// Override the backend base URL
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// Parse a seconds value from the environment, falling back to a default
fn parse_secs(var: &str, default: u64) -> u64 {
    match env::var(var) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("{var}={raw} is not a valid number of seconds, using {default}");
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        env::remove_var(env_config::API_URL);
        env::remove_var(env_config::CONNECT_TIMEOUT_SECS);
        env::remove_var(env_config::REQUEST_TIMEOUT_SECS);

        let config = ClientConfig::from_env();
        assert_eq!(config.base_url, defaults::API_URL);
        assert_eq!(
            config.connect_timeout,
            Duration::from_secs(defaults::CONNECT_TIMEOUT_SECS)
        );
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        env::set_var(env_config::API_URL, "https://api.meridian.dev");
        env::set_var(env_config::REQUEST_TIMEOUT_SECS, "42");

        let config = ClientConfig::from_env();
        assert_eq!(config.base_url, "https://api.meridian.dev");
        assert_eq!(config.request_timeout, Duration::from_secs(42));

        env::remove_var(env_config::API_URL);
        env::remove_var(env_config::REQUEST_TIMEOUT_SECS);
    }

    #[test]
    #[serial]
    fn test_invalid_url_falls_back() {
        env::set_var(env_config::API_URL, "not a url");
        let config = ClientConfig::from_env();
        assert_eq!(config.base_url, defaults::API_URL);
        env::remove_var(env_config::API_URL);
    }

    #[test]
    #[serial]
    fn test_invalid_timeout_falls_back() {
        env::set_var(env_config::CONNECT_TIMEOUT_SECS, "soon");
        let config = ClientConfig::from_env();
        assert_eq!(
            config.connect_timeout,
            Duration::from_secs(defaults::CONNECT_TIMEOUT_SECS)
        );
        env::remove_var(env_config::CONNECT_TIMEOUT_SECS);
    }
}
