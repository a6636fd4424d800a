//! Wire protocol for the chat socket. JSON frames tagged by `event`, with
//! camelCase payloads matching the chat server.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::ChatroomKey;

/// Connection query parameters; the server scopes the socket to one
/// chatroom context from these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocketQuery {
    pub user: String,
    pub listing_owner: String,
    pub product_id: u64,
}

impl SocketQuery {
    pub fn for_room(user: impl Into<String>, room: &ChatroomKey) -> Self {
        Self {
            user: user.into(),
            listing_owner: room.listing_owner.clone(),
            product_id: room.product_id,
        }
    }

    pub fn query_pairs(&self) -> [(&'static str, String); 3] {
        [
            ("user", self.user.clone()),
            ("listingOwner", self.listing_owner.clone()),
            ("productId", self.product_id.to_string()),
        ]
    }
}

/// A message landing in a chatroom; carries the persisted id so receivers
/// invalidate their cache instead of merging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePosted {
    pub product_id: u64,
    pub listing_owner: String,
    pub buyer: String,
    pub message_id: Uuid,
    pub sender_name: String,
    #[serde(default)]
    pub preview: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl MessagePosted {
    pub fn room(&self) -> ChatroomKey {
        ChatroomKey::new(self.product_id, self.listing_owner.clone(), self.buyer.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Presence {
    pub user: String,
}

/// Client-to-server events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientEvent {
    #[serde(rename = "message")]
    Message(MessagePosted),
    #[serde(rename = "join")]
    Join(Presence),
    #[serde(rename = "leave")]
    Leave(Presence),
}

/// Server-to-client events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    #[serde(rename = "getMessage")]
    GetMessage(MessagePosted),
    #[serde(rename = "clientNew")]
    ClientNew(Presence),
    #[serde(rename = "userLeft")]
    UserLeft(Presence),
}
