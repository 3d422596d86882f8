// SPDX-FileCopyrightText: 2026 VoterOS Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The common surface of the three cached entity types.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;

use voteros_core::{Communication, EntityKind, MessageTemplate, MessageType, ScheduledMessage};

use crate::placeholder;

/// A cacheable row type.
pub trait Entity: Clone + fmt::Debug + DeserializeOwned + Send + Sync + 'static {
    /// Which collection this type lives in.
    const KIND: EntityKind;

    fn id(&self) -> &str;

    fn message_type(&self) -> &MessageType;

    /// The fixed stand-in served when the initial fetch fails.
    fn placeholder(now: DateTime<Utc>) -> Self;
}

impl Entity for MessageTemplate {
    const KIND: EntityKind = EntityKind::Templates;

    fn id(&self) -> &str {
        &self.id
    }

    fn message_type(&self) -> &MessageType {
        &self.message_type
    }

    fn placeholder(now: DateTime<Utc>) -> Self {
        placeholder::template(now)
    }
}

impl Entity for ScheduledMessage {
    const KIND: EntityKind = EntityKind::ScheduledMessages;

    fn id(&self) -> &str {
        &self.id
    }

    fn message_type(&self) -> &MessageType {
        &self.message_type
    }

    fn placeholder(now: DateTime<Utc>) -> Self {
        placeholder::scheduled_message(now)
    }
}

impl Entity for Communication {
    const KIND: EntityKind = EntityKind::Communications;

    fn id(&self) -> &str {
        &self.id
    }

    fn message_type(&self) -> &MessageType {
        &self.message_type
    }

    fn placeholder(now: DateTime<Utc>) -> Self {
        placeholder::communication(now)
    }
}
