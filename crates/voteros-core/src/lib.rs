// SPDX-FileCopyrightText: 2026 VoterOS Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for VoterOS messaging sync.
//!
//! This crate provides the domain types (message templates, scheduled
//! messages, communications), the workspace error type, and the adapter
//! traits every backend implementation plugs into.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::VoterosError;
pub use types::{
    AdapterType, ChangeEvent, ChangeEventKind, Communication, EntityKind, FetchQuery,
    HealthStatus, MessageTemplate, MessageType, NewCommunication, NewScheduledMessage,
    NewTemplate, RecipientFilter, Record, ScheduleStatus, ScheduledMessage, SortOrder,
};

pub use traits::{DataGateway, PluginAdapter, Subscription, SubscriptionId};
