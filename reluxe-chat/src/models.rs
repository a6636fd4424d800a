use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Composite chatroom identity: one conversation per listing between its
/// seller and one buyer. Identity is structural; chatrooms are never stored
/// as rows of their own, they exist once a first message does.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatroomKey {
    pub product_id: u64,
    pub listing_owner: String,
    pub buyer: String,
}

impl ChatroomKey {
    pub fn new(product_id: u64, listing_owner: impl Into<String>, buyer: impl Into<String>) -> Self {
        Self {
            product_id,
            listing_owner: listing_owner.into(),
            buyer: buyer.into(),
        }
    }

    /// The party opposite `user` in this conversation.
    pub fn counterpart<'a>(&'a self, user: &str) -> &'a str {
        if user == self.listing_owner {
            &self.buyer
        } else {
            &self.listing_owner
        }
    }
}

/// Renders the legacy joined id used on the wire. Never parsed back:
/// usernames may contain hyphens, so the joined form is not invertible.
impl std::fmt::Display for ChatroomKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}-{}", self.product_id, self.listing_owner, self.buyer)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub text: String,
    pub sender_name: String,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Local echo inserted before the backend confirms the send.
    pub fn local_echo(text: impl Into<String>, sender_name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            sender_name: sender_name.into(),
            created_at: Utc::now(),
        }
    }
}

/// Sidebar projection of one chatroom.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatroomSummary {
    pub key: ChatroomKey,
    pub last_message: String,
    pub updated_at: DateTime<Utc>,
    pub avatar_url: Option<String>,
    pub peer_online: bool,
}
