// SPDX-FileCopyrightText: 2026 VoterOS Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock data gateway for deterministic testing.
//!
//! `MockGateway` implements `DataGateway` over in-memory tables. Tests seed
//! rows with [`MockGateway::set_rows`], push change notifications with
//! [`MockGateway::emit`], flip failure switches, and inspect captured writes
//! and open subscriptions.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use tokio::sync::mpsc;
use tracing::debug;

use voteros_core::{
    AdapterType, ChangeEvent, ChangeEventKind, DataGateway, FetchQuery, HealthStatus,
    PluginAdapter, Record, Subscription, SubscriptionId, VoterosError,
};

const SUBSCRIPTION_CAPACITY: usize = 64;

#[derive(Default)]
struct State {
    tables: HashMap<String, Vec<Record>>,
    failing_fetch: HashSet<String>,
    fail_writes: bool,
    fail_subscribe: bool,
    echo_writes: bool,
    during_fetch: HashMap<String, Vec<(ChangeEventKind, Record)>>,
    fetch_counts: HashMap<String, usize>,
    inserted: Vec<(String, Record)>,
    updated: Vec<(String, String, Record)>,
    deleted: Vec<(String, String)>,
}

struct Subscriber {
    table: String,
    event: ChangeEventKind,
    tx: mpsc::Sender<ChangeEvent>,
}

type Subscribers = Arc<Mutex<HashMap<SubscriptionId, Subscriber>>>;

/// An in-memory gateway for tests.
pub struct MockGateway {
    state: Mutex<State>,
    subscribers: Subscribers,
    next_id: AtomicU64,
}

impl MockGateway {
    /// Create a gateway with empty tables and every switch off.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            subscribers: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(0),
        }
    }

    /// Replace the rows `fetch_all` returns for `table`, in order.
    pub fn set_rows(&self, table: &str, rows: Vec<Record>) {
        lock(&self.state).tables.insert(table.to_string(), rows);
    }

    /// Current rows of `table`.
    pub fn rows(&self, table: &str) -> Vec<Record> {
        lock(&self.state)
            .tables
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    /// Make every `fetch_all` on `table` fail.
    pub fn fail_fetch(&self, table: &str) {
        lock(&self.state).failing_fetch.insert(table.to_string());
    }

    pub fn restore_fetch(&self, table: &str) {
        lock(&self.state).failing_fetch.remove(table);
    }

    /// Make insert, update and delete fail.
    pub fn set_fail_writes(&self, fail: bool) {
        lock(&self.state).fail_writes = fail;
    }

    pub fn set_fail_subscribe(&self, fail: bool) {
        lock(&self.state).fail_subscribe = fail;
    }

    /// Deliver successful inserts and updates to matching subscribers, the
    /// way the backend's change feed echoes writes.
    pub fn set_echo_writes(&self, echo: bool) {
        lock(&self.state).echo_writes = echo;
    }

    /// Emit a notification from inside the next `fetch_all` on `table`,
    /// after the rows are read and before they are returned. The fetch then
    /// waits briefly so subscribers can merge it first.
    pub fn emit_during_fetch(&self, table: &str, kind: ChangeEventKind, record: Record) {
        lock(&self.state)
            .during_fetch
            .entry(table.to_string())
            .or_default()
            .push((kind, record));
    }

    /// Deliver a change notification to every open subscription on
    /// (`table`, `kind`). Returns how many subscriptions received it.
    pub async fn emit(&self, table: &str, kind: ChangeEventKind, record: Record) -> usize {
        let targets: Vec<mpsc::Sender<ChangeEvent>> = lock(&self.subscribers)
            .values()
            .filter(|sub| sub.table == table && sub.event == kind)
            .map(|sub| sub.tx.clone())
            .collect();

        let mut delivered = 0;
        for tx in targets {
            let event = ChangeEvent {
                table: table.to_string(),
                kind,
                record: record.clone(),
                commit_timestamp: Some(Utc::now()),
            };
            if tx.send(event).await.is_ok() {
                delivered += 1;
            }
        }
        debug!(table, %kind, delivered, "mock change emitted");
        delivered
    }

    /// Number of open subscriptions across all tables.
    pub fn open_subscriptions(&self) -> usize {
        lock(&self.subscribers).len()
    }

    /// Number of open subscriptions on `table`.
    pub fn open_subscriptions_for(&self, table: &str) -> usize {
        lock(&self.subscribers)
            .values()
            .filter(|sub| sub.table == table)
            .count()
    }

    /// How many times `table` was fetched.
    pub fn fetch_count(&self, table: &str) -> usize {
        lock(&self.state)
            .fetch_counts
            .get(table)
            .copied()
            .unwrap_or(0)
    }

    /// Every successful insert as (table, stored row).
    pub fn inserted(&self) -> Vec<(String, Record)> {
        lock(&self.state).inserted.clone()
    }

    /// Every successful update as (table, id, patch).
    pub fn updated(&self) -> Vec<(String, String, Record)> {
        lock(&self.state).updated.clone()
    }

    /// Every successful delete as (table, id).
    pub fn deleted(&self) -> Vec<(String, String)> {
        lock(&self.state).deleted.clone()
    }

    fn write_failure(&self, operation: &str, table: &str) -> Option<VoterosError> {
        lock(&self.state)
            .fail_writes
            .then(|| VoterosError::gateway(format!("mock {operation} on {table} failed")))
    }

    fn echo_writes(&self) -> bool {
        lock(&self.state).echo_writes
    }
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockGateway {
    fn name(&self) -> &str {
        "mock-gateway"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Gateway
    }

    async fn health_check(&self) -> Result<HealthStatus, VoterosError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), VoterosError> {
        lock(&self.subscribers).clear();
        Ok(())
    }
}

#[async_trait]
impl DataGateway for MockGateway {
    async fn fetch_all(&self, query: &FetchQuery) -> Result<Vec<Record>, VoterosError> {
        let (rows, concurrent) = {
            let mut state = lock(&self.state);
            *state.fetch_counts.entry(query.table.clone()).or_default() += 1;
            if state.failing_fetch.contains(&query.table) {
                return Err(VoterosError::gateway(format!(
                    "mock fetch of {} failed",
                    query.table
                )));
            }
            let mut rows = state.tables.get(&query.table).cloned().unwrap_or_default();
            if let Some(limit) = query.limit {
                rows.truncate(limit);
            }
            (rows, state.during_fetch.remove(&query.table).unwrap_or_default())
        };

        if !concurrent.is_empty() {
            for (kind, record) in concurrent {
                self.emit(&query.table, kind, record).await;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        Ok(rows)
    }

    /// Stores `record`, filling `id`, `created_at` and `updated_at` (and a
    /// pending `status` on scheduled messages) when absent, like the
    /// backend's column defaults.
    async fn insert(&self, table: &str, mut record: Record) -> Result<Record, VoterosError> {
        if let Some(err) = self.write_failure("insert", table) {
            return Err(err);
        }
        let Some(row) = record.as_object_mut() else {
            return Err(VoterosError::InvalidInput("insert body must be an object".into()));
        };
        let now = json!(Utc::now().to_rfc3339());
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        row.entry("id").or_insert_with(|| json!(format!("mock-{id}")));
        row.entry("created_at").or_insert_with(|| now.clone());
        row.entry("updated_at").or_insert(now);
        if table == "scheduled_messages" {
            row.entry("status").or_insert_with(|| json!("pending"));
        }

        {
            let mut state = lock(&self.state);
            state
                .tables
                .entry(table.to_string())
                .or_default()
                .insert(0, record.clone());
            state.inserted.push((table.to_string(), record.clone()));
        }
        if self.echo_writes() {
            self.emit(table, ChangeEventKind::Insert, record.clone()).await;
        }
        Ok(record)
    }

    async fn update(&self, table: &str, id: &str, patch: Record) -> Result<Record, VoterosError> {
        if let Some(err) = self.write_failure("update", table) {
            return Err(err);
        }
        let stored = {
            let mut state = lock(&self.state);
            let row = state
                .tables
                .get_mut(table)
                .and_then(|rows| rows.iter_mut().find(|row| row["id"] == id))
                .ok_or_else(|| VoterosError::NotFound {
                    table: table.to_string(),
                    id: id.to_string(),
                })?;
            if let (Some(target), Some(fields)) = (row.as_object_mut(), patch.as_object()) {
                for (key, value) in fields {
                    target.insert(key.clone(), value.clone());
                }
                target.insert("updated_at".into(), json!(Utc::now().to_rfc3339()));
            }
            let stored = row.clone();
            state
                .updated
                .push((table.to_string(), id.to_string(), patch));
            stored
        };
        if self.echo_writes() {
            self.emit(table, ChangeEventKind::Update, stored.clone()).await;
        }
        Ok(stored)
    }

    async fn delete(&self, table: &str, id: &str) -> Result<(), VoterosError> {
        if let Some(err) = self.write_failure("delete", table) {
            return Err(err);
        }
        let mut state = lock(&self.state);
        if let Some(rows) = state.tables.get_mut(table) {
            rows.retain(|row| row["id"] != id);
        }
        state.deleted.push((table.to_string(), id.to_string()));
        Ok(())
    }

    async fn subscribe(
        &self,
        table: &str,
        event: ChangeEventKind,
    ) -> Result<Subscription, VoterosError> {
        if lock(&self.state).fail_subscribe {
            return Err(VoterosError::Subscription(format!(
                "mock subscribe to {table} {event} failed"
            )));
        }

        let n = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let id = SubscriptionId(format!("mock-sub-{n}"));
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_CAPACITY);
        lock(&self.subscribers).insert(
            id.clone(),
            Subscriber {
                table: table.to_string(),
                event,
                tx,
            },
        );

        let subscribers = Arc::clone(&self.subscribers);
        Ok(Subscription::new(id, table, event, rx, move |id| {
            lock(&subscribers).remove(id);
        }))
    }

    fn unsubscribe(&self, id: &SubscriptionId) {
        lock(&self.subscribers).remove(id);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
