// SPDX-FileCopyrightText: 2026 VoterOS Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The reconciliation layer.
//!
//! Owns the three entity caches. [`Reconciler::initialize`] loads a cache from
//! a full fetch; [`Reconciler::observe`] spawns the long-lived task for one
//! entity kind, which owns that kind's subscriptions and merges every
//! notification into the cache as it arrives. Tasks are independent:
//! stopping one leaves the others running.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use futures::stream::{self, StreamExt};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use voteros_config::model::SyncConfig;
use voteros_core::{
    AdapterType, ChangeEvent, ChangeEventKind, Communication, DataGateway, EntityKind,
    HealthStatus, MessageTemplate, PluginAdapter, ScheduledMessage, Subscription, VoterosError,
};

use crate::cache::{DataSource, EntityCache};
use crate::entity::Entity;
use crate::normalize::{Normalized, normalize};

/// Handle to one running per-kind task.
struct KindTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Keeps the entity caches consistent with the gateway's change feed.
pub struct Reconciler {
    gateway: Arc<dyn DataGateway>,
    config: SyncConfig,
    communications_limit: usize,
    templates: Arc<EntityCache<MessageTemplate>>,
    scheduled: Arc<EntityCache<ScheduledMessage>>,
    communications: Arc<EntityCache<Communication>>,
    tasks: DashMap<EntityKind, KindTask>,
}

impl Reconciler {
    /// `communications_limit` caps the initial communications fetch.
    pub fn new(
        gateway: Arc<dyn DataGateway>,
        config: SyncConfig,
        communications_limit: usize,
    ) -> Self {
        Self {
            gateway,
            config,
            communications_limit,
            templates: Arc::new(EntityCache::new()),
            scheduled: Arc::new(EntityCache::new()),
            communications: Arc::new(EntityCache::new()),
            tasks: DashMap::new(),
        }
    }

    pub fn templates(&self) -> &EntityCache<MessageTemplate> {
        &self.templates
    }

    pub fn scheduled_messages(&self) -> &EntityCache<ScheduledMessage> {
        &self.scheduled
    }

    pub fn communications(&self) -> &EntityCache<Communication> {
        &self.communications
    }

    pub fn is_loading(&self, kind: EntityKind) -> bool {
        match kind {
            EntityKind::Templates => self.templates.is_loading(),
            EntityKind::ScheduledMessages => self.scheduled.is_loading(),
            EntityKind::Communications => self.communications.is_loading(),
        }
    }

    pub fn source(&self, kind: EntityKind) -> DataSource {
        match kind {
            EntityKind::Templates => self.templates.source(),
            EntityKind::ScheduledMessages => self.scheduled.source(),
            EntityKind::Communications => self.communications.source(),
        }
    }

    /// Number of cached entries for `kind`.
    pub fn count(&self, kind: EntityKind) -> usize {
        match kind {
            EntityKind::Templates => self.templates.len(),
            EntityKind::ScheduledMessages => self.scheduled.len(),
            EntityKind::Communications => self.communications.len(),
        }
    }

    /// Replaces the cache for `kind` with a full fetch, in the order the
    /// gateway returns it.
    ///
    /// On fetch failure with `mask_backend_failures` set, the cache holds the
    /// kind's single placeholder entry and `Ok` is returned. Otherwise the
    /// previous contents are kept and the error is returned. An empty
    /// communications fetch is also served as the placeholder while masking.
    ///
    /// Notifications merged while the fetch is in flight are replayed onto
    /// the fetched rows.
    pub async fn initialize(&self, kind: EntityKind) -> Result<(), VoterosError> {
        match kind {
            EntityKind::Templates => self.load(&self.templates).await,
            EntityKind::ScheduledMessages => self.load(&self.scheduled).await,
            EntityKind::Communications => self.load(&self.communications).await,
        }
    }

    /// Initializes all three caches concurrently.
    pub async fn initialize_all(&self) -> Result<(), VoterosError> {
        let (templates, scheduled, communications) = tokio::join!(
            self.initialize(EntityKind::Templates),
            self.initialize(EntityKind::ScheduledMessages),
            self.initialize(EntityKind::Communications),
        );
        templates?;
        scheduled?;
        communications?;
        Ok(())
    }

    /// Opens the subscriptions for `kind` and spawns its merge task.
    ///
    /// A no-op when `kind` is already observed.
    pub async fn observe(&self, kind: EntityKind) -> Result<(), VoterosError> {
        if self.is_observing(kind) {
            return Ok(());
        }

        let mut subscriptions = Vec::with_capacity(kind.observed_events().len());
        for &event in kind.observed_events() {
            // On error, the subscriptions opened so far drop here and release.
            subscriptions.push(self.gateway.subscribe(kind.table(), event).await?);
        }

        let cancel = CancellationToken::new();
        let config = self.config.clone();
        let handle = match kind {
            EntityKind::Templates => tokio::spawn(run_kind(
                self.templates.clone(),
                subscriptions,
                config,
                cancel.clone(),
            )),
            EntityKind::ScheduledMessages => tokio::spawn(run_kind(
                self.scheduled.clone(),
                subscriptions,
                config,
                cancel.clone(),
            )),
            EntityKind::Communications => tokio::spawn(run_kind(
                self.communications.clone(),
                subscriptions,
                config,
                cancel.clone(),
            )),
        };

        if let Some(previous) = self.tasks.insert(kind, KindTask { cancel, handle }) {
            previous.cancel.cancel();
        }
        info!(kind = %kind, "observing change feed");
        Ok(())
    }

    /// Whether a merge task for `kind` is running.
    pub fn is_observing(&self, kind: EntityKind) -> bool {
        self.tasks
            .get(&kind)
            .is_some_and(|task| !task.handle.is_finished())
    }

    /// Stops observing `kind` and waits for its task to exit.
    ///
    /// Once this returns, the kind's subscriptions are released and no further
    /// notifications reach its cache.
    pub async fn stop(&self, kind: EntityKind) {
        let Some((_, task)) = self.tasks.remove(&kind) else {
            return;
        };
        task.cancel.cancel();
        if let Err(e) = task.handle.await {
            warn!(kind = %kind, error = %e, "reconciliation task ended abnormally");
        }
        info!(kind = %kind, "stopped observing change feed");
    }

    /// Observes every kind, then initializes every cache.
    ///
    /// Subscribing first means a row inserted while the fetch is in flight
    /// reaches the cache, since the load replays it onto the fetched rows. A
    /// kind whose subscriptions cannot be opened is still initialized; its
    /// cache then only reflects the fetch.
    pub async fn start(&self) -> Result<(), VoterosError> {
        for kind in EntityKind::ALL {
            if let Err(e) = self.observe(kind).await {
                warn!(kind = %kind, error = %e, "change feed unavailable");
            }
        }
        self.initialize_all().await
    }

    /// Stops every per-kind task.
    pub async fn stop_all(&self) {
        for kind in EntityKind::ALL {
            self.stop(kind).await;
        }
    }

    async fn load<T: Entity>(&self, cache: &EntityCache<T>) -> Result<(), VoterosError> {
        let kind = T::KIND;
        let mut query = kind.default_query();
        if kind == EntityKind::Communications {
            query = query.limit(self.communications_limit);
        }

        cache.begin_load();
        match self.gateway.fetch_all(&query).await {
            Ok(rows)
                if rows.is_empty()
                    && kind == EntityKind::Communications
                    && self.config.mask_backend_failures =>
            {
                warn!(kind = %kind, "no rows returned, serving placeholder data");
                cache.finish_load(vec![T::placeholder(Utc::now())], DataSource::Placeholder);
                Ok(())
            }
            Ok(rows) => {
                let fetched = rows.len();
                let items: Vec<T> = rows
                    .iter()
                    .filter_map(|row| match normalize(row, self.config.unknown_message_type) {
                        Normalized::Valid(item) => Some(item),
                        Normalized::Rejected { reason } => {
                            warn!(kind = %kind, %reason, "skipping fetched row");
                            None
                        }
                    })
                    .collect();
                info!(kind = %kind, fetched, cached = items.len(), "cache initialized");
                cache.finish_load(items, DataSource::Live);
                Ok(())
            }
            Err(e) if self.config.mask_backend_failures => {
                warn!(kind = %kind, error = %e, "fetch failed, serving placeholder data");
                cache.finish_load(vec![T::placeholder(Utc::now())], DataSource::Placeholder);
                Ok(())
            }
            Err(e) => {
                cache.abort_load();
                Err(e)
            }
        }
    }
}

impl Drop for Reconciler {
    fn drop(&mut self) {
        for task in self.tasks.iter() {
            task.cancel.cancel();
        }
    }
}

#[async_trait]
impl PluginAdapter for Reconciler {
    fn name(&self) -> &str {
        "reconciler"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Sync
    }

    /// `Degraded` while any cache holds placeholder data or any started
    /// change feed has closed.
    async fn health_check(&self) -> Result<HealthStatus, VoterosError> {
        let placeholder: Vec<String> = EntityKind::ALL
            .into_iter()
            .filter(|&kind| self.source(kind) == DataSource::Placeholder)
            .map(|kind| kind.to_string())
            .collect();
        if !placeholder.is_empty() {
            return Ok(HealthStatus::Degraded(format!(
                "serving placeholder data for {}",
                placeholder.join(", ")
            )));
        }

        let closed: Vec<String> = self
            .tasks
            .iter()
            .filter(|task| task.handle.is_finished())
            .map(|task| task.key().to_string())
            .collect();
        if !closed.is_empty() {
            return Ok(HealthStatus::Degraded(format!(
                "change feed closed for {}",
                closed.join(", ")
            )));
        }

        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), VoterosError> {
        self.stop_all().await;
        Ok(())
    }
}

/// Merges notifications from `subscriptions` into `cache` until cancelled or
/// every subscription ends. The subscriptions are released on return.
async fn run_kind<T: Entity>(
    cache: Arc<EntityCache<T>>,
    subscriptions: Vec<Subscription>,
    config: SyncConfig,
    cancel: CancellationToken,
) {
    let kind = T::KIND;
    let mut events = stream::select_all(subscriptions.into_iter().map(|subscription| {
        stream::unfold(subscription, |mut subscription| async move {
            let event = subscription.recv().await?;
            Some((event, subscription))
        })
        .boxed()
    }));

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(kind = %kind, "reconciliation task cancelled");
                break;
            }
            next = events.next() => match next {
                Some(event) => apply(&cache, event, &config),
                None => {
                    warn!(kind = %kind, "change feed closed");
                    break;
                }
            },
        }
    }
}

/// Normalizes one notification and merges it.
fn apply<T: Entity>(cache: &EntityCache<T>, event: ChangeEvent, config: &SyncConfig) {
    let kind = T::KIND;
    if !kind.observed_events().contains(&event.kind) {
        debug!(kind = %kind, event = %event.kind, "ignoring unobserved change kind");
        return;
    }

    let item: T = match normalize(&event.record, config.unknown_message_type) {
        Normalized::Valid(item) => item,
        Normalized::Rejected { reason } => {
            warn!(kind = %kind, event = %event.kind, %reason, "rejected change notification");
            return;
        }
    };

    match event.kind {
        ChangeEventKind::Insert => {
            debug!(kind = %kind, id = item.id(), "merged insert");
            cache.prepend(item, config.dedupe_inserts);
        }
        ChangeEventKind::Update => {
            let id = item.id().to_string();
            if cache.replace_by_id(item) {
                debug!(kind = %kind, %id, "merged update");
            } else {
                debug!(kind = %kind, %id, "dropped update for uncached id");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tracing_test::traced_test;
    use voteros_config::model::UnknownTagPolicy;
    use voteros_core::ScheduleStatus;
    use voteros_test_utils::MockGateway;

    fn scheduled_row(id: &str, status: &str, tag: &str) -> serde_json::Value {
        json!({
            "id": id,
            "content": "Vote tomorrow",
            "message_type": tag,
            "scheduled_for": "2026-11-02T06:00:00Z",
            "recipient_filter": {},
            "status": status,
            "language": "en",
            "created_at": "2026-10-01T00:00:00Z",
            "updated_at": "2026-10-01T00:00:00Z"
        })
    }

    fn event(kind: ChangeEventKind, record: serde_json::Value) -> ChangeEvent {
        ChangeEvent {
            table: "scheduled_messages".into(),
            kind,
            record,
            commit_timestamp: None,
        }
    }

    #[test]
    fn insert_then_update_merges_in_place() {
        let cache = EntityCache::<ScheduledMessage>::new();
        let config = SyncConfig::default();

        apply(&cache, event(ChangeEventKind::Insert, scheduled_row("m1", "pending", "sms")), &config);
        apply(&cache, event(ChangeEventKind::Insert, scheduled_row("m2", "pending", "sms")), &config);
        apply(&cache, event(ChangeEventKind::Update, scheduled_row("m1", "sent", "sms")), &config);

        let items = cache.get_all();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, "m2");
        assert_eq!(items[1].id, "m1");
        assert_eq!(items[1].status, ScheduleStatus::Sent);
    }

    #[test]
    fn rejected_notification_leaves_cache_untouched() {
        let cache = EntityCache::<ScheduledMessage>::new();
        let config = SyncConfig {
            unknown_message_type: UnknownTagPolicy::Reject,
            ..SyncConfig::default()
        };
        apply(&cache, event(ChangeEventKind::Insert, scheduled_row("m1", "pending", "fax")), &config);
        apply(&cache, event(ChangeEventKind::Insert, json!({ "id": "broken" })), &config);
        assert!(cache.is_empty());
    }

    #[test]
    fn updates_are_ignored_for_insert_only_kinds() {
        let cache = EntityCache::<Communication>::new();
        let mut row = serde_json::to_value(Communication::placeholder(Utc::now())).unwrap();
        apply(
            &cache,
            ChangeEvent {
                table: "communications".into(),
                kind: ChangeEventKind::Insert,
                record: row.clone(),
                commit_timestamp: None,
            },
            &SyncConfig::default(),
        );
        row["content"] = json!("edited");
        apply(
            &cache,
            ChangeEvent {
                table: "communications".into(),
                kind: ChangeEventKind::Update,
                record: row,
                commit_timestamp: None,
            },
            &SyncConfig::default(),
        );
        assert_ne!(cache.get_all()[0].content, "edited");
    }

    #[tokio::test]
    #[traced_test]
    async fn placeholder_fallback_is_logged() {
        let gateway = Arc::new(MockGateway::new());
        gateway.fail_fetch("communications");
        let reconciler = Reconciler::new(gateway, SyncConfig::default(), 20);

        reconciler
            .initialize(EntityKind::Communications)
            .await
            .unwrap();

        assert!(logs_contain("fetch failed, serving placeholder data"));
        assert_eq!(reconciler.count(EntityKind::Communications), 1);
    }

    #[tokio::test]
    #[traced_test]
    async fn empty_communications_fetch_serves_placeholder() {
        let gateway = Arc::new(MockGateway::new());
        let reconciler = Reconciler::new(gateway, SyncConfig::default(), 20);

        reconciler
            .initialize(EntityKind::Communications)
            .await
            .unwrap();

        assert!(logs_contain("no rows returned, serving placeholder data"));
        assert_eq!(reconciler.source(EntityKind::Communications), DataSource::Placeholder);
        assert_eq!(reconciler.count(EntityKind::Communications), 1);
    }

    #[tokio::test]
    #[traced_test]
    async fn rejected_fetched_rows_are_logged_and_skipped() {
        let gateway = Arc::new(MockGateway::new());
        gateway.set_rows(
            "scheduled_messages",
            vec![
                scheduled_row("m1", "pending", "sms"),
                scheduled_row("m2", "pending", "pigeon"),
            ],
        );
        let config = SyncConfig {
            unknown_message_type: UnknownTagPolicy::Reject,
            ..SyncConfig::default()
        };
        let reconciler = Reconciler::new(gateway, config, 20);

        reconciler
            .initialize(EntityKind::ScheduledMessages)
            .await
            .unwrap();

        assert_eq!(reconciler.count(EntityKind::ScheduledMessages), 1);
        assert!(logs_contain("skipping fetched row"));
        assert!(logs_contain("pigeon"));
    }
}
