// SPDX-FileCopyrightText: 2026 VoterOS Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Hosted-backend implementation of the DataGateway trait.

use async_trait::async_trait;
use tracing::debug;

use voteros_config::model::{BackendConfig, RealtimeConfig};
use voteros_core::{
    AdapterType, ChangeEventKind, DataGateway, FetchQuery, HealthStatus, PluginAdapter, Record,
    Subscription, SubscriptionId, VoterosError,
};

use crate::realtime::RealtimeClient;
use crate::rest::RestClient;

/// Gateway backed by the REST table surface and, when enabled, the realtime
/// websocket.
///
/// The websocket is not opened until the first [`DataGateway::subscribe`].
pub struct SupabaseGateway {
    rest: RestClient,
    realtime: Option<RealtimeClient>,
}

impl SupabaseGateway {
    pub fn new(backend: &BackendConfig, realtime: &RealtimeConfig) -> Result<Self, VoterosError> {
        let rest = RestClient::new(backend)?;
        let realtime = if realtime.enabled {
            Some(RealtimeClient::new(backend, realtime)?)
        } else {
            debug!("realtime disabled; subscriptions will be refused");
            None
        };
        Ok(Self { rest, realtime })
    }

    /// Whether change-feed subscriptions are available.
    pub fn realtime_enabled(&self) -> bool {
        self.realtime.is_some()
    }
}

#[async_trait]
impl PluginAdapter for SupabaseGateway {
    fn name(&self) -> &str {
        "supabase"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Gateway
    }

    async fn health_check(&self) -> Result<HealthStatus, VoterosError> {
        match &self.realtime {
            Some(realtime) if realtime.active_topics() > 0 && !realtime.is_connected() => Ok(
                HealthStatus::Unhealthy("realtime socket disconnected".into()),
            ),
            Some(_) => Ok(HealthStatus::Healthy),
            None => Ok(HealthStatus::Degraded("realtime disabled".into())),
        }
    }

    async fn shutdown(&self) -> Result<(), VoterosError> {
        if let Some(realtime) = &self.realtime {
            realtime.close();
            debug!("shutdown: realtime socket closed");
        }
        Ok(())
    }
}

#[async_trait]
impl DataGateway for SupabaseGateway {
    async fn fetch_all(&self, query: &FetchQuery) -> Result<Vec<Record>, VoterosError> {
        self.rest.select(query).await
    }

    async fn insert(&self, table: &str, record: Record) -> Result<Record, VoterosError> {
        self.rest.insert(table, record).await
    }

    async fn update(&self, table: &str, id: &str, patch: Record) -> Result<Record, VoterosError> {
        self.rest.update(table, id, patch).await
    }

    async fn delete(&self, table: &str, id: &str) -> Result<(), VoterosError> {
        self.rest.delete(table, id).await
    }

    async fn subscribe(
        &self,
        table: &str,
        event: ChangeEventKind,
    ) -> Result<Subscription, VoterosError> {
        let realtime = self.realtime.as_ref().ok_or_else(|| {
            VoterosError::Subscription(format!(
                "cannot subscribe to {table} {event}: realtime is disabled"
            ))
        })?;
        realtime.subscribe(table, event).await
    }

    fn unsubscribe(&self, id: &SubscriptionId) {
        if let Some(realtime) = &self.realtime {
            realtime.unsubscribe(id);
        }
    }
}
