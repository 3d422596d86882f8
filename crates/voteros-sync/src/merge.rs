// SPDX-FileCopyrightText: 2026 VoterOS Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Merge rules for change notifications. Collections are newest-first.

use crate::entity::Entity;

/// Puts `item` at the front.
///
/// With `dedupe`, an existing entry with the same id is removed first, so the
/// most recent arrival wins and the id stays unique. Without it, a repeated
/// id appears twice.
pub fn prepend<T: Entity>(items: &mut Vec<T>, item: T, dedupe: bool) {
    if dedupe {
        items.retain(|existing| existing.id() != item.id());
    }
    items.insert(0, item);
}

/// Replaces the entry whose id matches `item` without moving it.
///
/// Returns `false`, leaving `items` untouched, when no entry matches.
pub fn replace_by_id<T: Entity>(items: &mut [T], item: T) -> bool {
    match items.iter_mut().find(|existing| existing.id() == item.id()) {
        Some(slot) => {
            *slot = item;
            true
        }
        None => false,
    }
}
