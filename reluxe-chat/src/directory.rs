use std::collections::HashMap;

use chrono::{DateTime, Utc};

use reluxe_shared::read_state::{self, ReadMark};

use crate::models::{ChatroomKey, ChatroomSummary};

/// Unread derivation for one chatroom: the open room is never unread, and
/// otherwise the session read mark takes precedence over persisted history.
pub fn room_unread(
    key: &ChatroomKey,
    active: Option<&ChatroomKey>,
    mark: Option<&ReadMark>,
    persisted_read_at: Option<DateTime<Utc>>,
) -> bool {
    if active == Some(key) {
        return false;
    }
    !read_state::resolve(mark, persisted_read_at)
}

/// Sidebar projections, keyed by chatroom. Rooms appear implicitly with
/// their first recorded message.
#[derive(Debug, Default)]
pub struct RoomDirectory {
    rooms: HashMap<ChatroomKey, ChatroomSummary>,
}

impl RoomDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a room fetched from history.
    pub fn install(
        &mut self,
        key: ChatroomKey,
        last_message: String,
        updated_at: DateTime<Utc>,
        avatar_url: Option<String>,
    ) {
        self.rooms.insert(
            key.clone(),
            ChatroomSummary {
                key,
                last_message,
                updated_at,
                avatar_url,
                peer_online: false,
            },
        );
    }

    pub fn record_outgoing(&mut self, key: &ChatroomKey, text: &str, at: DateTime<Utc>) {
        self.touch(key, text, at);
    }

    pub fn record_incoming(&mut self, key: &ChatroomKey, text: &str, at: DateTime<Utc>) {
        self.touch(key, text, at);
    }

    fn touch(&mut self, key: &ChatroomKey, text: &str, at: DateTime<Utc>) {
        let entry = self
            .rooms
            .entry(key.clone())
            .or_insert_with(|| ChatroomSummary {
                key: key.clone(),
                last_message: String::new(),
                updated_at: at,
                avatar_url: None,
                peer_online: false,
            });
        entry.last_message = text.to_string();
        entry.updated_at = at;
    }

    pub fn set_peer_online(&mut self, key: &ChatroomKey, online: bool) {
        if let Some(entry) = self.rooms.get_mut(key) {
            entry.peer_online = online;
        }
    }

    pub fn get(&self, key: &ChatroomKey) -> Option<&ChatroomSummary> {
        self.rooms.get(key)
    }

    /// All rooms, most recently active first.
    pub fn summaries(&self) -> Vec<&ChatroomSummary> {
        let mut all: Vec<&ChatroomSummary> = self.rooms.values().collect();
        all.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        all
    }
}
