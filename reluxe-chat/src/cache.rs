//! Per-chatroom message cache with transactional optimistic mutation.
//!
//! Socket deliveries never merge into cached pages in place; the affected
//! room is invalidated and refetched instead, which sidesteps duplicate and
//! out-of-order entries entirely.

use std::collections::HashMap;

use uuid::Uuid;

use crate::models::{ChatroomKey, Message};

#[derive(Debug, Default)]
struct RoomCache {
    messages: Vec<Message>,
    stale: bool,
}

#[derive(Debug, Default)]
pub struct MessageCache {
    rooms: HashMap<ChatroomKey, RoomCache>,
}

impl MessageCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a freshly fetched history page, clearing staleness.
    pub fn replace(&mut self, room: &ChatroomKey, messages: Vec<Message>) {
        let entry = self.rooms.entry(room.clone()).or_default();
        entry.messages = messages;
        entry.stale = false;
    }

    /// Current entries for a room. May be stale; check `is_stale`.
    pub fn messages(&self, room: &ChatroomKey) -> &[Message] {
        self.rooms
            .get(room)
            .map(|cache| cache.messages.as_slice())
            .unwrap_or(&[])
    }

    /// A room with no cached page counts as stale.
    pub fn is_stale(&self, room: &ChatroomKey) -> bool {
        self.rooms.get(room).map(|cache| cache.stale).unwrap_or(true)
    }

    /// Force the next read of this room to refetch.
    pub fn invalidate(&mut self, room: &ChatroomKey) {
        self.rooms.entry(room.clone()).or_default().stale = true;
    }

    /// Open a transaction on one room. The room's entries are snapshotted;
    /// dropping the transaction uncommitted restores them exactly.
    pub fn begin(&mut self, room: &ChatroomKey) -> CacheTxn<'_> {
        let snapshot = self.rooms.get(room).map(|cache| cache.messages.clone());
        CacheTxn {
            cache: self,
            room: room.clone(),
            snapshot,
            committed: false,
        }
    }
}

/// One optimistic mutation in flight. `apply` the local echo, then either
/// commit (swapping in the persisted row) or drop to roll back.
#[derive(Debug)]
pub struct CacheTxn<'a> {
    cache: &'a mut MessageCache,
    room: ChatroomKey,
    snapshot: Option<Vec<Message>>,
    committed: bool,
}

impl CacheTxn<'_> {
    pub fn apply(&mut self, message: Message) {
        self.cache
            .rooms
            .entry(self.room.clone())
            .or_default()
            .messages
            .push(message);
    }

    /// Keep the applied entries as-is.
    pub fn commit(mut self) {
        self.committed = true;
    }

    /// Replace the optimistic echo with the backend's persisted row, then
    /// commit.
    pub fn commit_replacing(mut self, echo_id: Uuid, persisted: Message) {
        if let Some(entry) = self.cache.rooms.get_mut(&self.room) {
            match entry.messages.iter_mut().find(|m| m.id == echo_id) {
                Some(slot) => *slot = persisted,
                None => entry.messages.push(persisted),
            }
        }
        self.committed = true;
    }
}

impl Drop for CacheTxn<'_> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        match self.snapshot.take() {
            Some(messages) => {
                if let Some(entry) = self.cache.rooms.get_mut(&self.room) {
                    entry.messages = messages;
                }
            }
            // The room had no cache entry before the transaction.
            None => {
                self.cache.rooms.remove(&self.room);
            }
        }
    }
}
