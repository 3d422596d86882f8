// SPDX-FileCopyrightText: 2026 VoterOS Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared by the gateway, the reconciliation layer and the binary.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum::{Display, EnumString};

/// A raw row as carried on the wire (REST bodies and change-feed payloads).
pub type Record = serde_json::Value;

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but serving degraded data.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter behind a [`PluginAdapter`](crate::PluginAdapter).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Gateway,
    Sync,
    Function,
}

/// Delivery channel of a message.
///
/// The backend stores the tag as free text. Tags outside the four known
/// channels are kept verbatim in [`MessageType::Unrecognized`] so they
/// round-trip; whether such records are accepted is a reconciliation policy.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MessageType {
    Sms,
    Whatsapp,
    Telegram,
    Ussd,
    Unrecognized(String),
}

impl MessageType {
    /// Parses a wire tag, coercing case and surrounding whitespace.
    pub fn parse(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "sms" => Self::Sms,
            "whatsapp" => Self::Whatsapp,
            "telegram" => Self::Telegram,
            "ussd" => Self::Ussd,
            _ => Self::Unrecognized(tag.to_string()),
        }
    }

    /// The canonical wire tag.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Sms => "sms",
            Self::Whatsapp => "whatsapp",
            Self::Telegram => "telegram",
            Self::Ussd => "ussd",
            Self::Unrecognized(tag) => tag,
        }
    }

    /// Whether this is one of the four known channels.
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unrecognized(_))
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl Serialize for MessageType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for MessageType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        Ok(Self::parse(&tag))
    }
}

/// Lifecycle state of a scheduled message. Transitions happen on the backend.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ScheduleStatus {
    Pending,
    Sent,
    Cancelled,
    Failed,
}

/// Audience predicate attached to a scheduled message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wards: Option<Vec<String>>,
    #[serde(
        default,
        rename = "voterStatus",
        skip_serializing_if = "Option::is_none"
    )]
    pub voter_status: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<Vec<String>>,
}

/// A reusable message body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageTemplate {
    pub id: String,
    pub title: String,
    pub content: String,
    pub message_type: MessageType,
    pub language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
}

/// A message queued for delivery at a future time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledMessage {
    pub id: String,
    pub content: String,
    pub message_type: MessageType,
    pub scheduled_for: DateTime<Utc>,
    #[serde(default)]
    pub recipient_filter: RecipientFilter,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_recipients: Option<u32>,
    pub status: ScheduleStatus,
    pub language: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
}

/// A message that has already gone out. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Communication {
    pub id: String,
    pub content: String,
    pub message_type: MessageType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_count: Option<u32>,
    pub sent_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sent_by: Option<String>,
}

/// Insert payload for `message_templates`; the backend assigns id and timestamps.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewTemplate {
    pub title: String,
    pub content: String,
    pub message_type: MessageType,
    pub language: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

/// Insert payload for `scheduled_messages`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewScheduledMessage {
    pub content: String,
    pub message_type: MessageType,
    pub scheduled_for: DateTime<Utc>,
    pub recipient_filter: RecipientFilter,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_recipients: Option<u32>,
    pub language: String,
}

/// Insert payload for `communications`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewCommunication {
    pub content: String,
    pub message_type: MessageType,
    pub recipient_count: u32,
    pub status: String,
    pub tags: Option<Vec<String>>,
    pub sent_at: DateTime<Utc>,
}

/// The three cached collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum EntityKind {
    Templates,
    ScheduledMessages,
    Communications,
}

impl EntityKind {
    /// All kinds, in startup order.
    pub const ALL: [EntityKind; 3] = [
        EntityKind::Templates,
        EntityKind::ScheduledMessages,
        EntityKind::Communications,
    ];

    /// Backend table holding this kind.
    pub fn table(self) -> &'static str {
        match self {
            Self::Templates => "message_templates",
            Self::ScheduledMessages => "scheduled_messages",
            Self::Communications => "communications",
        }
    }

    /// Change events the reconciliation layer consumes for this kind.
    pub fn observed_events(self) -> &'static [ChangeEventKind] {
        match self {
            Self::Templates | Self::Communications => &[ChangeEventKind::Insert],
            Self::ScheduledMessages => &[ChangeEventKind::Insert, ChangeEventKind::Update],
        }
    }

    /// Full-collection query used for the initial load, newest first.
    pub fn default_query(self) -> FetchQuery {
        let column = match self {
            Self::Communications => "sent_at",
            Self::Templates | Self::ScheduledMessages => "created_at",
        };
        FetchQuery::table(self.table()).order_by(column, SortOrder::Descending)
    }
}

/// Row-level change kinds delivered by the change feed.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum ChangeEventKind {
    Insert,
    Update,
}

/// One notification from a change-feed subscription.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    pub table: String,
    pub kind: ChangeEventKind,
    /// The row after the change.
    pub record: Record,
    pub commit_timestamp: Option<DateTime<Utc>>,
}

/// Sort direction for [`FetchQuery`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// A full-collection fetch request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchQuery {
    pub table: String,
    pub order_by: Option<(String, SortOrder)>,
    pub limit: Option<usize>,
}

impl FetchQuery {
    /// Fetch every row of `table` in backend order.
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            order_by: None,
            limit: None,
        }
    }

    pub fn order_by(mut self, column: impl Into<String>, order: SortOrder) -> Self {
        self.order_by = Some((column.into(), order));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}
