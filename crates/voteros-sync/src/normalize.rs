// SPDX-FileCopyrightText: 2026 VoterOS Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Parse step between raw records and typed cache entries.

use voteros_config::model::UnknownTagPolicy;
use voteros_core::Record;

use crate::entity::Entity;

/// Outcome of normalizing one raw record.
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized<T> {
    Valid(T),
    Rejected { reason: String },
}

impl<T> Normalized<T> {
    pub fn valid(self) -> Option<T> {
        match self {
            Self::Valid(item) => Some(item),
            Self::Rejected { .. } => None,
        }
    }
}

/// Decodes `record` as a `T`.
///
/// `message_type` is coerced to a known channel regardless of case. A tag
/// outside the four channels is rejected under [`UnknownTagPolicy::Reject`]
/// and kept verbatim under [`UnknownTagPolicy::Accept`].
pub fn normalize<T: Entity>(record: &Record, policy: UnknownTagPolicy) -> Normalized<T> {
    let item: T = match serde_json::from_value(record.clone()) {
        Ok(item) => item,
        Err(e) => {
            return Normalized::Rejected {
                reason: format!("malformed {} record: {e}", T::KIND),
            };
        }
    };

    if !item.message_type().is_known() && policy == UnknownTagPolicy::Reject {
        return Normalized::Rejected {
            reason: format!("unrecognized message_type `{}`", item.message_type()),
        };
    }

    Normalized::Valid(item)
}
