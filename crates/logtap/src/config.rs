// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::error::AgentError;
use std::env;
use std::time::Duration;

/// Startup configuration supplied by the host application.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Collector endpoint accepting `POST {"logs": [...]}`.
    pub endpoint: String,
    /// Install a process-wide capture layer over the host's `tracing` output.
    pub intercept_output: bool,
    /// Install the panic hook.
    pub capture_panics: bool,
    /// Period of the timer-driven flush.
    pub flush_interval: Duration,
    /// Master switch; a disabled agent wires nothing and drops every call.
    pub enabled: bool,
    /// Entry buffer bound; the oldest entry is evicted at capacity.
    pub buffer_capacity: usize,
    /// Per-request timeout for collector deliveries.
    pub request_timeout: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8000/api/logs/agent".to_string(),
            intercept_output: true,
            capture_panics: true,
            flush_interval: Duration::from_millis(3000),
            enabled: true,
            buffer_capacity: 1024,
            request_timeout: Duration::from_secs(5),
        }
    }
}

impl AgentConfig {
    /// Create configuration from `LOGTAP_*` environment variables, falling
    /// back to the defaults for anything unset or unparsable.
    pub fn from_env() -> Result<Self, AgentError> {
        let defaults = Self::default();

        let endpoint = env::var("LOGTAP_ENDPOINT").unwrap_or(defaults.endpoint);
        let intercept_output = env::var("LOGTAP_INTERCEPT_OUTPUT")
            .map(|val| val.to_lowercase() != "false")
            .unwrap_or(defaults.intercept_output);
        let capture_panics = env::var("LOGTAP_CAPTURE_PANICS")
            .map(|val| val.to_lowercase() != "false")
            .unwrap_or(defaults.capture_panics);
        let flush_interval = env::var("LOGTAP_FLUSH_INTERVAL_MS")
            .ok()
            .and_then(|val| val.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.flush_interval);
        let enabled = env::var("LOGTAP_ENABLED")
            .map(|val| val.to_lowercase() != "false")
            .unwrap_or(defaults.enabled);
        let buffer_capacity = env::var("LOGTAP_BUFFER_CAPACITY")
            .ok()
            .and_then(|val| val.parse::<usize>().ok())
            .unwrap_or(defaults.buffer_capacity);
        let request_timeout = env::var("LOGTAP_REQUEST_TIMEOUT_MS")
            .ok()
            .and_then(|val| val.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.request_timeout);

        let config = Self {
            endpoint,
            intercept_output,
            capture_panics,
            flush_interval,
            enabled,
            buffer_capacity,
            request_timeout,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), AgentError> {
        if self.endpoint.trim().is_empty() {
            return Err(AgentError::InvalidConfig(
                "collector endpoint cannot be empty".to_string(),
            ));
        }

        if reqwest::Url::parse(&self.endpoint).is_err() {
            return Err(AgentError::InvalidConfig(format!(
                "collector endpoint '{}' is not a valid URL",
                self.endpoint
            )));
        }

        if self.flush_interval.is_zero() {
            return Err(AgentError::InvalidConfig(
                "flush interval must be greater than zero".to_string(),
            ));
        }

        if self.buffer_capacity == 0 {
            return Err(AgentError::InvalidConfig(
                "buffer capacity must be greater than zero".to_string(),
            ));
        }

        if self.request_timeout.is_zero() {
            return Err(AgentError::InvalidConfig(
                "request timeout must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AgentConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_endpoint() {
        let config = AgentConfig {
            endpoint: "".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = AgentConfig {
            endpoint: "   ".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_malformed_endpoint() {
        let config = AgentConfig {
            endpoint: "not a url".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_zero_flush_interval() {
        let config = AgentConfig {
            flush_interval: Duration::ZERO,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_zero_buffer_capacity() {
        let config = AgentConfig {
            buffer_capacity: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_zero_request_timeout() {
        let config = AgentConfig {
            request_timeout: Duration::ZERO,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
