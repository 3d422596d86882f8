// SPDX-FileCopyrightText: 2026 VoterOS Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for VoterOS messaging sync.

use thiserror::Error;

/// The primary error type used across all VoterOS adapter traits and core operations.
#[derive(Debug, Error)]
pub enum VoterosError {
    /// Configuration errors (invalid TOML, missing required fields, bad URLs).
    #[error("configuration error: {0}")]
    Config(String),

    /// Backend REST errors (connection failure, non-success status, bad body).
    #[error("gateway error: {message}")]
    Gateway {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Realtime change-feed errors (websocket connect, join rejected, socket closed).
    #[error("realtime error: {message}")]
    Realtime {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A record returned by the backend could not be decoded into an entity.
    #[error("could not decode {table} record: {reason}")]
    Decode { table: String, reason: String },

    /// No row with the given id exists in the table.
    #[error("no row with id {id} in {table}")]
    NotFound { table: String, id: String },

    /// A change-stream subscription could not be opened or was already closed.
    #[error("subscription error: {0}")]
    Subscription(String),

    /// Caller-supplied input was rejected before reaching the backend.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl VoterosError {
    /// Shorthand for a gateway error without an underlying source.
    pub fn gateway(message: impl Into<String>) -> Self {
        Self::Gateway {
            message: message.into(),
            source: None,
        }
    }

    /// Shorthand for a realtime error without an underlying source.
    pub fn realtime(message: impl Into<String>) -> Self {
        Self::Realtime {
            message: message.into(),
            source: None,
        }
    }
}
