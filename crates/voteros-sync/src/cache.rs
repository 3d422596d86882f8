// SPDX-FileCopyrightText: 2026 VoterOS Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory entity caches.
//!
//! A cache is a `watch` channel over a [`CacheSnapshot`]. Reads never block
//! on writers; consumers get clones or a receiver and cannot mutate the
//! collection. Writes are crate-private and come from the reconciler.
//!
//! Notifications merged while a fetch is in flight are replayed onto the
//! fetched rows, so a load never discards them.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;

use crate::entity::Entity;
use crate::merge;

/// Where the current contents came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    /// Nothing loaded yet.
    Empty,
    /// The backend's rows plus any merged notifications.
    Live,
    /// The fixed placeholder served after a failed fetch.
    Placeholder,
}

impl DataSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Live => "live",
            Self::Placeholder => "placeholder",
        }
    }
}

/// One point-in-time view of a cache.
#[derive(Debug, Clone)]
pub struct CacheSnapshot<T> {
    /// Newest first.
    pub items: Vec<T>,
    pub loading: bool,
    pub source: DataSource,
}

impl<T> Default for CacheSnapshot<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            loading: false,
            source: DataSource::Empty,
        }
    }
}

/// A merge recorded between `begin_load` and `finish_load`.
#[derive(Debug)]
enum Replay<T> {
    Insert(T),
    Update(T),
}

/// The cached collection for one entity kind.
#[derive(Debug)]
pub struct EntityCache<T> {
    tx: watch::Sender<CacheSnapshot<T>>,
    /// `Some` while a load is in flight. Always locked before `tx` is written.
    in_flight: Mutex<Option<Vec<Replay<T>>>>,
}

impl<T: Entity> EntityCache<T> {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(CacheSnapshot::default());
        Self {
            tx,
            in_flight: Mutex::new(None),
        }
    }

    /// The current ordered contents.
    pub fn get_all(&self) -> Vec<T> {
        self.tx.borrow().items.clone()
    }

    pub fn snapshot(&self) -> CacheSnapshot<T> {
        self.tx.borrow().clone()
    }

    pub fn is_loading(&self) -> bool {
        self.tx.borrow().loading
    }

    pub fn source(&self) -> DataSource {
        self.tx.borrow().source
    }

    pub fn len(&self) -> usize {
        self.tx.borrow().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A receiver notified after every change.
    pub fn watch(&self) -> watch::Receiver<CacheSnapshot<T>> {
        self.tx.subscribe()
    }

    fn in_flight(&self) -> MutexGuard<'_, Option<Vec<Replay<T>>>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn begin_load(&self) {
        let mut in_flight = self.in_flight();
        in_flight.get_or_insert_with(Vec::new);
        self.tx.send_modify(|snapshot| snapshot.loading = true);
    }

    /// Replaces the contents and clears the loading flag.
    ///
    /// For a live load, merges recorded since `begin_load` are replayed onto
    /// `items` in arrival order. An insert whose id the fetch already returned
    /// is skipped.
    pub(crate) fn finish_load(&self, mut items: Vec<T>, source: DataSource) {
        let mut in_flight = self.in_flight();
        let replay = in_flight.take().unwrap_or_default();
        if source == DataSource::Live {
            for entry in replay {
                match entry {
                    Replay::Insert(item) => {
                        if !items.iter().any(|existing| existing.id() == item.id()) {
                            merge::prepend(&mut items, item, false);
                        }
                    }
                    Replay::Update(item) => {
                        merge::replace_by_id(&mut items, item);
                    }
                }
            }
        }
        self.tx.send_modify(|snapshot| {
            snapshot.items = items;
            snapshot.loading = false;
            snapshot.source = source;
        });
    }

    /// Clears the loading flag, keeping whatever was there.
    pub(crate) fn abort_load(&self) {
        let mut in_flight = self.in_flight();
        in_flight.take();
        self.tx.send_modify(|snapshot| snapshot.loading = false);
    }

    pub(crate) fn prepend(&self, item: T, dedupe: bool) {
        let mut in_flight = self.in_flight();
        if let Some(replay) = in_flight.as_mut() {
            replay.push(Replay::Insert(item.clone()));
        }
        self.tx
            .send_modify(|snapshot| merge::prepend(&mut snapshot.items, item, dedupe));
    }

    /// Returns whether an entry was replaced. Receivers are only notified
    /// when one was.
    ///
    /// During a load the update is recorded even when no entry matches yet,
    /// since the fetched rows may contain it.
    pub(crate) fn replace_by_id(&self, item: T) -> bool {
        let mut in_flight = self.in_flight();
        if let Some(replay) = in_flight.as_mut() {
            replay.push(Replay::Update(item.clone()));
        }
        self.tx
            .send_if_modified(|snapshot| merge::replace_by_id(&mut snapshot.items, item))
    }
}

impl<T: Entity> Default for EntityCache<T> {
    fn default() -> Self {
        Self::new()
    }
}
