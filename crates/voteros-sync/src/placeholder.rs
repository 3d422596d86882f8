// SPDX-FileCopyrightText: 2026 VoterOS Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fixed placeholder rows, one per entity kind.
//!
//! Served in place of live data when the initial fetch fails and backend
//! failures are masked. Everything except the timestamps is constant.

use chrono::{DateTime, Duration, Utc};

use voteros_core::{
    Communication, MessageTemplate, MessageType, RecipientFilter, ScheduleStatus, ScheduledMessage,
};

pub const PLACEHOLDER_ID: &str = "1";

pub fn template(now: DateTime<Utc>) -> MessageTemplate {
    MessageTemplate {
        id: PLACEHOLDER_ID.to_string(),
        title: "Election Day Reminder".to_string(),
        content: "Habari! Tunataka kukumbusha kuhusu uchaguzi kesho. Kura yako ni muhimu."
            .to_string(),
        message_type: MessageType::Sms,
        language: "sw".to_string(),
        tags: None,
        created_at: now,
        updated_at: now,
        created_by: None,
    }
}

/// Due one day after `now`.
pub fn scheduled_message(now: DateTime<Utc>) -> ScheduledMessage {
    ScheduledMessage {
        id: PLACEHOLDER_ID.to_string(),
        content: "Remember to vote tomorrow at your designated polling station!".to_string(),
        message_type: MessageType::Sms,
        scheduled_for: now + Duration::days(1),
        recipient_filter: RecipientFilter {
            regions: Some(vec!["Mtaa Ward".to_string()]),
            voter_status: Some(vec!["supporter".to_string()]),
            ..RecipientFilter::default()
        },
        estimated_recipients: Some(1200),
        status: ScheduleStatus::Pending,
        language: "en".to_string(),
        created_at: now,
        updated_at: now,
        created_by: None,
    }
}

/// Sent one day before `now`.
pub fn communication(now: DateTime<Utc>) -> Communication {
    Communication {
        id: PLACEHOLDER_ID.to_string(),
        content: "Campaign rally happening today at Central Park at 3PM!".to_string(),
        message_type: MessageType::Sms,
        recipient_count: Some(2500),
        sent_at: now - Duration::days(1),
        status: Some("sent".to_string()),
        tags: None,
        sent_by: None,
    }
}
