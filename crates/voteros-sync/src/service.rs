// SPDX-FileCopyrightText: 2026 VoterOS Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Write-through messaging operations.
//!
//! Every mutation goes straight to the gateway. Caches are not touched here:
//! the new row becomes visible once its change notification is merged. When
//! `mask_backend_failures` is set, a failed write is logged and answered with
//! a demo acknowledgment instead of an error. A write the backend accepted is
//! never reported as demo, even when the returned row cannot be decoded.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use voteros_config::model::SyncConfig;
use voteros_core::{
    Communication, DataGateway, EntityKind, MessageTemplate, MessageType, NewCommunication,
    NewScheduledMessage, NewTemplate, Record, ScheduleStatus, ScheduledMessage, VoterosError,
};

use crate::entity::Entity;

/// How a mutation was acknowledged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckMode {
    /// The backend stored the write.
    Live,
    /// The backend write failed and was masked.
    Demo,
}

/// A successful (or masked) mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct Ack<T> {
    pub mode: AckMode,
    pub value: T,
}

impl<T> Ack<T> {
    fn live(value: T) -> Self {
        Self {
            mode: AckMode::Live,
            value,
        }
    }

    fn demo(value: T) -> Self {
        Self {
            mode: AckMode::Demo,
            value,
        }
    }

    pub fn is_demo(&self) -> bool {
        self.mode == AckMode::Demo
    }
}

/// Mutation entry point for the messaging screens.
pub struct MessagingService {
    gateway: Arc<dyn DataGateway>,
    mask_backend_failures: bool,
}

impl MessagingService {
    pub fn new(gateway: Arc<dyn DataGateway>, config: &SyncConfig) -> Self {
        Self {
            gateway,
            mask_backend_failures: config.mask_backend_failures,
        }
    }

    /// Records a message sent now to `recipients`.
    ///
    /// The live acknowledgment carries the stored communication, or `None`
    /// when the stored row could not be decoded; the demo one carries `None`.
    pub async fn send_message(
        &self,
        content: &str,
        message_type: MessageType,
        recipients: &[String],
    ) -> Result<Ack<Option<Communication>>, VoterosError> {
        required("content", content)?;
        let recipient_count = u32::try_from(recipients.len())
            .map_err(|_| VoterosError::InvalidInput("too many recipients".into()))?;

        let row = NewCommunication {
            content: content.to_string(),
            message_type,
            recipient_count,
            status: "sent".to_string(),
            tags: None,
            sent_at: Utc::now(),
        };
        let stored = match self.insert::<Communication>(&row).await {
            Ok(stored) => stored,
            Err(e) => return self.masked("send_message", e, || None),
        };
        match decode::<Communication>(stored) {
            Ok(communication) => {
                info!(id = %communication.id, recipient_count, "message sent");
                Ok(Ack::live(Some(communication)))
            }
            Err(e) => {
                warn!(error = %e, recipient_count, "message sent, stored row unreadable");
                Ok(Ack::live(None))
            }
        }
    }

    /// A stored row that cannot be decoded is returned as a `Decode` error,
    /// never masked.
    pub async fn create_template(
        &self,
        template: NewTemplate,
    ) -> Result<Ack<MessageTemplate>, VoterosError> {
        required("title", &template.title)?;
        required("content", &template.content)?;

        let outcome = self.insert::<MessageTemplate>(&template).await;
        match outcome {
            Ok(stored) => {
                let stored: MessageTemplate = decode(stored)?;
                info!(id = %stored.id, "template created");
                Ok(Ack::live(stored))
            }
            Err(e) => self.masked("create_template", e, || {
                let now = Utc::now();
                MessageTemplate {
                    id: demo_id(),
                    title: template.title,
                    content: template.content,
                    message_type: template.message_type,
                    language: template.language,
                    tags: template.tags,
                    created_at: now,
                    updated_at: now,
                    created_by: None,
                }
            }),
        }
    }

    /// Queues a message; `scheduled_for` must be in the future. Decoding
    /// errors on the stored row are returned as for
    /// [`create_template`](Self::create_template).
    pub async fn schedule_message(
        &self,
        message: NewScheduledMessage,
    ) -> Result<Ack<ScheduledMessage>, VoterosError> {
        required("content", &message.content)?;
        let now = Utc::now();
        if message.scheduled_for <= now {
            return Err(VoterosError::InvalidInput(
                "scheduled_for must be in the future".into(),
            ));
        }

        let outcome = self.insert::<ScheduledMessage>(&message).await;
        match outcome {
            Ok(stored) => {
                let stored: ScheduledMessage = decode(stored)?;
                info!(id = %stored.id, scheduled_for = %stored.scheduled_for, "message scheduled");
                Ok(Ack::live(stored))
            }
            Err(e) => self.masked("schedule_message", e, || ScheduledMessage {
                id: demo_id(),
                content: message.content,
                message_type: message.message_type,
                scheduled_for: message.scheduled_for,
                recipient_filter: message.recipient_filter,
                estimated_recipients: message.estimated_recipients,
                status: ScheduleStatus::Pending,
                language: message.language,
                created_at: now,
                updated_at: now,
                created_by: None,
            }),
        }
    }

    /// Marks a scheduled message cancelled.
    ///
    /// An unknown id is always an error, masked or not. The live
    /// acknowledgment carries `None` when the patched row cannot be decoded.
    pub async fn cancel_scheduled(
        &self,
        id: &str,
    ) -> Result<Ack<Option<ScheduledMessage>>, VoterosError> {
        required("id", id)?;
        let table = EntityKind::ScheduledMessages.table();
        let patch = json!({ "status": ScheduleStatus::Cancelled });

        let row = match self.gateway.update(table, id, patch).await {
            Ok(row) => row,
            Err(e @ VoterosError::NotFound { .. }) => return Err(e),
            Err(e) => return self.masked("cancel_scheduled", e, || None),
        };
        info!(%id, "scheduled message cancelled");
        match decode::<ScheduledMessage>(row) {
            Ok(stored) => Ok(Ack::live(Some(stored))),
            Err(e) => {
                warn!(%id, error = %e, "cancelled row unreadable");
                Ok(Ack::live(None))
            }
        }
    }

    /// Deletes a template on the backend.
    ///
    /// Deletions are not on the change feed; cached copies remain until the
    /// next [`Reconciler::initialize`](crate::Reconciler::initialize).
    pub async fn delete_template(&self, id: &str) -> Result<Ack<()>, VoterosError> {
        required("id", id)?;
        match self
            .gateway
            .delete(EntityKind::Templates.table(), id)
            .await
        {
            Ok(()) => {
                info!(%id, "template deleted");
                Ok(Ack::live(()))
            }
            Err(e) => self.masked("delete_template", e, || ()),
        }
    }

    /// Writes `row` to `T`'s table and returns the stored record undecoded.
    async fn insert<T: Entity>(&self, row: &impl Serialize) -> Result<Record, VoterosError> {
        let table = T::KIND.table();
        let record = serde_json::to_value(row)
            .map_err(|e| VoterosError::Internal(format!("failed to encode {table} row: {e}")))?;
        self.gateway.insert(table, record).await
    }

    fn masked<T>(
        &self,
        operation: &str,
        error: VoterosError,
        fallback: impl FnOnce() -> T,
    ) -> Result<Ack<T>, VoterosError> {
        if !self.mask_backend_failures {
            return Err(error);
        }
        warn!(operation, %error, "backend write failed, acknowledging in demo mode");
        Ok(Ack::demo(fallback()))
    }
}

fn decode<T: Entity>(row: Record) -> Result<T, VoterosError> {
    serde_json::from_value(row).map_err(|e| VoterosError::Decode {
        table: T::KIND.table().to_string(),
        reason: e.to_string(),
    })
}

/// Rejects blank input. The value itself is stored as given.
fn required(field: &str, value: &str) -> Result<(), VoterosError> {
    if value.trim().is_empty() {
        return Err(VoterosError::InvalidInput(format!("{field} must not be empty")));
    }
    Ok(())
}

/// Short random id for demo acknowledgments.
fn demo_id() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(7);
    format!("demo-{id}")
}
