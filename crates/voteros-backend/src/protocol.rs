// SPDX-FileCopyrightText: 2026 VoterOS Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Realtime wire frames (Phoenix channel protocol, JSON serializer v1).
//!
//! Every frame is a JSON object `{topic, event, payload, ref}`. A client
//! joins `realtime:<name>` with a `postgres_changes` filter, keeps the socket
//! alive with `heartbeat` frames on the `phoenix` topic, and leaves with
//! `phx_leave`. Row changes arrive as `postgres_changes` frames.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use voteros_core::{ChangeEvent, ChangeEventKind, VoterosError};

pub const PHOENIX_TOPIC: &str = "phoenix";

pub mod events {
    pub const JOIN: &str = "phx_join";
    pub const LEAVE: &str = "phx_leave";
    pub const REPLY: &str = "phx_reply";
    pub const ERROR: &str = "phx_error";
    pub const CLOSE: &str = "phx_close";
    pub const HEARTBEAT: &str = "heartbeat";
    pub const POSTGRES_CHANGES: &str = "postgres_changes";
}

/// One websocket text frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub topic: String,
    pub event: String,
    #[serde(default)]
    pub payload: Value,
    #[serde(rename = "ref", default)]
    pub reference: Option<String>,
}

impl Frame {
    /// Join `topic`, asking for `event` changes on `schema.table`.
    pub fn join(
        topic: &str,
        schema: &str,
        table: &str,
        event: ChangeEventKind,
        reference: u64,
    ) -> Self {
        Self {
            topic: topic.to_string(),
            event: events::JOIN.to_string(),
            payload: json!({
                "config": {
                    "broadcast": { "self": false },
                    "presence": { "key": "" },
                    "postgres_changes": [
                        { "event": event.to_string(), "schema": schema, "table": table }
                    ]
                }
            }),
            reference: Some(reference.to_string()),
        }
    }

    pub fn leave(topic: &str, reference: u64) -> Self {
        Self {
            topic: topic.to_string(),
            event: events::LEAVE.to_string(),
            payload: json!({}),
            reference: Some(reference.to_string()),
        }
    }

    pub fn heartbeat(reference: u64) -> Self {
        Self {
            topic: PHOENIX_TOPIC.to_string(),
            event: events::HEARTBEAT.to_string(),
            payload: json!({}),
            reference: Some(reference.to_string()),
        }
    }

    pub fn encode(&self) -> Result<String, VoterosError> {
        serde_json::to_string(self)
            .map_err(|e| VoterosError::realtime(format!("failed to encode frame: {e}")))
    }

    pub fn decode(text: &str) -> Result<Self, VoterosError> {
        serde_json::from_str(text)
            .map_err(|e| VoterosError::realtime(format!("malformed frame: {e}")))
    }

    /// `status` of a `phx_reply`, e.g. `"ok"` or `"error"`.
    pub fn reply_status(&self) -> Option<&str> {
        if self.event != events::REPLY {
            return None;
        }
        self.payload.get("status").and_then(Value::as_str)
    }
}

/// Extracts a row change from a frame, if it carries one.
///
/// Understands the current `postgres_changes` shape (`payload.data`) and the
/// older shape where the event name is the change type and the payload holds
/// `type`, `table`, `record` directly. Change types other than INSERT and
/// UPDATE yield `None`.
pub fn change_event(frame: &Frame) -> Option<ChangeEvent> {
    let data = if frame.event == events::POSTGRES_CHANGES {
        frame.payload.get("data")?
    } else if frame.event.parse::<ChangeEventKind>().is_ok() {
        &frame.payload
    } else {
        return None;
    };

    let kind = data.get("type")?.as_str()?.parse::<ChangeEventKind>().ok()?;
    let table = data.get("table")?.as_str()?.to_string();
    let record = data.get("record")?.clone();
    let commit_timestamp = data
        .get("commit_timestamp")
        .and_then(Value::as_str)
        .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
        .map(|ts| ts.with_timezone(&Utc));

    Some(ChangeEvent {
        table,
        kind,
        record,
        commit_timestamp,
    })
}
