// SPDX-FileCopyrightText: 2026 VoterOS Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Remote data gateway trait: table access plus change-feed subscriptions.

use std::fmt;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::VoterosError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ChangeEvent, ChangeEventKind, FetchQuery, Record};

/// Opaque identifier of an open change-feed subscription.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub String);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

type Release = Box<dyn FnOnce(&SubscriptionId) + Send + Sync>;

/// A scoped change-feed subscription.
///
/// Events arrive in the order the gateway emits them. Dropping the
/// subscription releases it on the gateway side, so a task that owns one
/// tears the feed down on every exit path.
pub struct Subscription {
    id: SubscriptionId,
    table: String,
    event: ChangeEventKind,
    rx: mpsc::Receiver<ChangeEvent>,
    release: Option<Release>,
}

impl Subscription {
    /// Wraps a receiver; `release` runs exactly once when the subscription is
    /// closed or dropped.
    pub fn new(
        id: SubscriptionId,
        table: impl Into<String>,
        event: ChangeEventKind,
        rx: mpsc::Receiver<ChangeEvent>,
        release: impl FnOnce(&SubscriptionId) + Send + Sync + 'static,
    ) -> Self {
        Self {
            id,
            table: table.into(),
            event,
            rx,
            release: Some(Box::new(release)),
        }
    }

    pub fn id(&self) -> &SubscriptionId {
        &self.id
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn event(&self) -> ChangeEventKind {
        self.event
    }

    /// Waits for the next event. `None` once the gateway side has gone away.
    ///
    /// Cancel-safe: dropping the future loses no events.
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        self.rx.recv().await
    }

    /// Releases the subscription now instead of at drop.
    pub fn close(mut self) {
        self.release_once();
    }

    fn release_once(&mut self) {
        if let Some(release) = self.release.take() {
            self.rx.close();
            release(&self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release_once();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("table", &self.table)
            .field("event", &self.event)
            .field("released", &self.release.is_none())
            .finish()
    }
}

/// Access to the backend-as-a-service: point-in-time reads, writes, and
/// push-based change notifications per (table, event kind).
#[async_trait]
pub trait DataGateway: PluginAdapter {
    /// Fetches a full collection, in the order the backend returns it.
    async fn fetch_all(&self, query: &FetchQuery) -> Result<Vec<Record>, VoterosError>;

    /// Inserts one row and returns the stored representation.
    async fn insert(&self, table: &str, record: Record) -> Result<Record, VoterosError>;

    /// Applies a partial update to the row with `id` and returns the stored row.
    async fn update(&self, table: &str, id: &str, patch: Record)
    -> Result<Record, VoterosError>;

    /// Deletes the row with `id`. Deletions are not delivered on the change
    /// feed, so caches keep the row until their next full fetch.
    async fn delete(&self, table: &str, id: &str) -> Result<(), VoterosError>;

    /// Opens a change-feed subscription for one table and event kind.
    async fn subscribe(
        &self,
        table: &str,
        event: ChangeEventKind,
    ) -> Result<Subscription, VoterosError>;

    /// Tears down a subscription. Unknown or already-released ids are ignored.
    fn unsubscribe(&self, id: &SubscriptionId);
}
