// SPDX-FileCopyrightText: 2026 VoterOS Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Realtime state reconciliation for VoterOS messaging.
//!
//! Keeps three locally cached collections (message templates, scheduled
//! messages, communications) consistent with the backend's change feed:
//!
//! - [`cache::EntityCache`] holds one collection plus its loading flag and
//!   hands out read-only snapshots.
//! - [`normalize`] turns raw change-feed records into typed entities or a
//!   rejection with a reason.
//! - [`merge`] holds the ordering rules (prepend on insert, replace in place
//!   on update).
//! - [`reconciler::Reconciler`] runs one long-lived task per entity kind,
//!   each owning its scoped subscriptions.
//! - [`service::MessagingService`] is the write-through mutation path.

pub mod cache;
pub mod entity;
pub mod merge;
pub mod normalize;
pub mod placeholder;
pub mod reconciler;
pub mod service;

pub use cache::{CacheSnapshot, DataSource, EntityCache};
pub use entity::Entity;
pub use normalize::{Normalized, normalize};
pub use reconciler::Reconciler;
pub use service::{Ack, AckMode, MessagingService};
