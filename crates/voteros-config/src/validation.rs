// SPDX-FileCopyrightText: 2026 VoterOS Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.

use crate::diagnostic::ConfigError;
use crate::model::VoterosConfig;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration, collecting every failure.
pub fn validate_config(config: &VoterosConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if !LOG_LEVELS.contains(&config.app.log_level.to_ascii_lowercase().as_str()) {
        fail(format!(
            "app.log_level `{}` must be one of {}",
            config.app.log_level,
            LOG_LEVELS.join(", ")
        ));
    }

    if let Some(url) = &config.backend.url {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            fail(format!("backend.url `{url}` must start with http:// or https://"));
        }
        if config.backend.api_key.as_deref().is_none_or(|k| k.trim().is_empty()) {
            fail("backend.api_key must be set when backend.url is set".to_string());
        }
    }

    if config.backend.schema.trim().is_empty() {
        fail("backend.schema must not be empty".to_string());
    }

    if config.backend.request_timeout_secs == 0 {
        fail("backend.request_timeout_secs must be at least 1".to_string());
    }

    if config.backend.communications_limit == 0 {
        fail("backend.communications_limit must be at least 1".to_string());
    }

    if config.realtime.heartbeat_secs == 0 {
        fail("realtime.heartbeat_secs must be at least 1".to_string());
    }

    if config.realtime.channel_capacity == 0 {
        fail("realtime.channel_capacity must be at least 1".to_string());
    }

    let host = config.functions.host.trim();
    if host.is_empty() {
        fail("functions.host must not be empty".to_string());
    } else if host.parse::<std::net::IpAddr>().is_err()
        && !host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
    {
        fail(format!(
            "functions.host `{host}` is not a valid IP address or hostname"
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
