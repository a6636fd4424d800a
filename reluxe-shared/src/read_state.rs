//! Read/unread reconciliation across the three signal sources: the local
//! session map, live-pushed items, and persisted `read_at` history.

use std::hash::Hash;

use chrono::{DateTime, Utc};
use dashmap::DashMap;

/// A local read mark for one chatroom or notification.
///
/// The map value is richer than a boolean because the three sources disagree
/// in predictable ways and the precedence between them is load-bearing:
///
/// - `ReadAt`: the user opened the item during this session. Beats a stale
///   `read_at: null` from history.
/// - `ForcedUnread`: new activity arrived for an item the user is not
///   looking at. Beats everything, including a persisted `read_at` and an
///   earlier `ReadAt` that it overwrote.
/// - `Pending`: a live-pushed item that has not been acted on. Unread until
///   explicitly marked.
///
/// A missing entry means the session knows nothing; only then does the
/// persisted `read_at` decide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMark {
    ReadAt(DateTime<Utc>),
    ForcedUnread,
    Pending,
}

/// Resolve one item's read state. An explicit local entry always wins;
/// absence falls back to the persisted timestamp.
pub fn resolve(mark: Option<&ReadMark>, persisted_read_at: Option<DateTime<Utc>>) -> bool {
    match mark {
        Some(ReadMark::ReadAt(_)) => true,
        Some(ReadMark::ForcedUnread) => false,
        Some(ReadMark::Pending) => false,
        None => persisted_read_at.is_some(),
    }
}

/// Session-wide read-mark map, shared between the owner and push tasks.
#[derive(Debug)]
pub struct ReadMap<K: Eq + Hash> {
    inner: DashMap<K, ReadMark>,
}

impl<K: Eq + Hash> ReadMap<K> {
    pub fn new() -> Self {
        Self { inner: DashMap::new() }
    }

    /// Stamp the item read as of now. Returns the timestamp written, so
    /// callers can relay it to the backend's idempotent mark-read call.
    pub fn mark_read(&self, key: K) -> DateTime<Utc> {
        let now = Utc::now();
        self.inner.insert(key, ReadMark::ReadAt(now));
        now
    }

    /// New activity arrived for an item the user is not viewing.
    pub fn force_unread(&self, key: K) {
        self.inner.insert(key, ReadMark::ForcedUnread);
    }

    /// A live-pushed item landed; unread until explicitly marked.
    pub fn mark_pending(&self, key: K) {
        self.inner.insert(key, ReadMark::Pending);
    }

    /// Forget the local mark, falling back to persisted state.
    pub fn clear(&self, key: &K) {
        self.inner.remove(key);
    }

    pub fn get(&self, key: &K) -> Option<ReadMark> {
        self.inner.get(key).map(|entry| *entry.value())
    }

    pub fn is_read(&self, key: &K, persisted_read_at: Option<DateTime<Utc>>) -> bool {
        resolve(self.get(key).as_ref(), persisted_read_at)
    }
}
