// SPDX-FileCopyrightText: 2026 VoterOS Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Top-level VoterOS configuration. Every section defaults sensibly.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct VoterosConfig {
    /// Process-wide settings.
    #[serde(default)]
    pub app: AppConfig,

    /// Backend-as-a-service REST access.
    #[serde(default)]
    pub backend: BackendConfig,

    /// Realtime change-feed connection.
    #[serde(default)]
    pub realtime: RealtimeConfig,

    /// Reconciliation policies.
    #[serde(default)]
    pub sync: SyncConfig,

    /// Suggestion endpoint server.
    #[serde(default)]
    pub functions: FunctionsConfig,
}

/// Process-wide settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Display name used in logs.
    #[serde(default = "default_app_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_app_name() -> String {
    "voteros".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Backend REST settings.
#[derive(Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BackendConfig {
    /// Project base URL, e.g. `https://abc.supabase.co`. Required to build a
    /// gateway; only the functions server runs without it.
    #[serde(default)]
    pub url: Option<String>,

    /// Anonymous or service API key sent as `apikey` and bearer token.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Postgres schema the tables live in.
    #[serde(default = "default_schema")]
    pub schema: String,

    /// Per-request timeout for REST calls.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Row limit for the initial communications fetch.
    #[serde(default = "default_communications_limit")]
    pub communications_limit: usize,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            schema: default_schema(),
            request_timeout_secs: default_request_timeout_secs(),
            communications_limit: default_communications_limit(),
        }
    }
}

impl fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendConfig")
            .field("url", &self.url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[redacted]"))
            .field("schema", &self.schema)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("communications_limit", &self.communications_limit)
            .finish()
    }
}

fn default_schema() -> String {
    "public".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_communications_limit() -> usize {
    20
}

/// Realtime websocket settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RealtimeConfig {
    /// Open change-feed subscriptions. When false, caches only reflect the
    /// initial fetch.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Interval between `phoenix` heartbeat frames.
    #[serde(default = "default_heartbeat_secs")]
    pub heartbeat_secs: u64,

    /// Buffered events per subscription before the socket reader waits.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            heartbeat_secs: default_heartbeat_secs(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_heartbeat_secs() -> u64 {
    30
}

fn default_channel_capacity() -> usize {
    256
}

/// What to do with a change-feed record whose `message_type` is not one of
/// sms, whatsapp, telegram, ussd.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownTagPolicy {
    /// Merge the record, keeping the raw tag.
    #[default]
    Accept,
    /// Drop the record and log a warning.
    Reject,
}

/// Reconciliation policies.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SyncConfig {
    #[serde(default)]
    pub unknown_message_type: UnknownTagPolicy,

    /// Remove an existing entry with the same id before prepending an insert.
    #[serde(default)]
    pub dedupe_inserts: bool,

    /// Serve placeholder data on fetch failure and demo acknowledgments on
    /// write failure instead of surfacing the error.
    #[serde(default = "default_true")]
    pub mask_backend_failures: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            unknown_message_type: UnknownTagPolicy::default(),
            dedupe_inserts: false,
            mask_backend_failures: true,
        }
    }
}

/// Suggestion endpoint server settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FunctionsConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for FunctionsConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    54321
}
