// SPDX-FileCopyrightText: 2026 VoterOS Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row builders matching the backend table shapes.

use serde_json::{Value, json};

pub fn template(id: &str, title: &str) -> Value {
    json!({
        "id": id,
        "title": title,
        "content": format!("{title} body"),
        "message_type": "sms",
        "language": "en",
        "tags": null,
        "created_at": "2026-10-01T08:00:00+00:00",
        "updated_at": "2026-10-01T08:00:00+00:00",
        "created_by": null
    })
}

pub fn scheduled(id: &str, status: &str) -> Value {
    json!({
        "id": id,
        "content": "Remember to vote",
        "message_type": "sms",
        "scheduled_for": "2026-11-02T06:00:00+00:00",
        "recipient_filter": { "regions": ["Mtaa Ward"] },
        "estimated_recipients": 300,
        "status": status,
        "language": "en",
        "created_at": "2026-10-01T08:00:00+00:00",
        "updated_at": "2026-10-01T08:00:00+00:00",
        "created_by": null
    })
}

pub fn communication(id: &str, content: &str) -> Value {
    json!({
        "id": id,
        "content": content,
        "message_type": "sms",
        "recipient_count": 25,
        "sent_at": "2026-10-15T15:00:00+00:00",
        "status": "sent",
        "tags": null,
        "sent_by": null
    })
}

/// `row` with its `message_type` replaced by `tag`.
pub fn with_message_type(mut row: Value, tag: &str) -> Value {
    row["message_type"] = json!(tag);
    row
}
