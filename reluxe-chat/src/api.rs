//! REST surface of the chat backend, behind a seam so the session can be
//! driven against an in-memory backend in tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::Validate;

use reluxe_shared::clients::proxy::ProxyClient;
use reluxe_shared::errors::AppResult;
use reluxe_shared::types::{Paginated, PaginationParams};

use crate::models::{ChatroomKey, Message};

/// One chatroom row from paginated history, carrying the persisted
/// `read_at` the unread derivation falls back to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomRecord {
    pub product_id: u64,
    pub listing_owner: String,
    pub buyer: String,
    pub last_message: String,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub read_at: Option<DateTime<Utc>>,
}

impl RoomRecord {
    pub fn key(&self) -> ChatroomKey {
        ChatroomKey::new(self.product_id, self.listing_owner.clone(), self.buyer.clone())
    }
}

#[derive(Debug, Clone, Serialize, Validate)]
pub struct SendMessageRequest {
    #[validate(length(min = 1, max = 2000, message = "message must be 1-2000 characters"))]
    pub text: String,
    pub sender_name: String,
}

#[async_trait]
pub trait ChatApi: Send + Sync {
    /// All of the user's chatrooms, newest activity first.
    async fn rooms(&self) -> AppResult<Vec<RoomRecord>>;

    /// One page of a room's message history.
    async fn history(
        &self,
        room: &ChatroomKey,
        page: &PaginationParams,
    ) -> AppResult<Paginated<Message>>;

    /// Persist a message; returns the stored row.
    async fn create_message(
        &self,
        room: &ChatroomKey,
        request: &SendMessageRequest,
    ) -> AppResult<Message>;

    /// Idempotent: mark the room read up to now.
    async fn mark_read(&self, room: &ChatroomKey) -> AppResult<()>;
}

/// Production implementation over the `/api/proxy` REST surface.
#[derive(Debug, Clone)]
pub struct HttpChatApi {
    client: ProxyClient,
}

impl HttpChatApi {
    pub fn new(client: ProxyClient) -> Self {
        Self { client }
    }

    fn room_query(room: &ChatroomKey) -> String {
        format!(
            "productId={}&listingOwner={}&buyer={}",
            room.product_id, room.listing_owner, room.buyer
        )
    }
}

#[async_trait]
impl ChatApi for HttpChatApi {
    async fn rooms(&self) -> AppResult<Vec<RoomRecord>> {
        self.client.get("chat/rooms").await
    }

    async fn history(
        &self,
        room: &ChatroomKey,
        page: &PaginationParams,
    ) -> AppResult<Paginated<Message>> {
        let uri = format!(
            "chat/messages?{}&{}",
            Self::room_query(room),
            page.to_query()
        );
        self.client.get(&uri).await
    }

    async fn create_message(
        &self,
        room: &ChatroomKey,
        request: &SendMessageRequest,
    ) -> AppResult<Message> {
        let body = json!({
            "productId": room.product_id,
            "listingOwner": room.listing_owner,
            "buyer": room.buyer,
            "text": request.text,
            "senderName": request.sender_name,
        });
        self.client.post("chat/messages", &body).await
    }

    async fn mark_read(&self, room: &ChatroomKey) -> AppResult<()> {
        let body = json!({
            "productId": room.product_id,
            "listingOwner": room.listing_owner,
            "buyer": room.buyer,
        });
        let _: serde_json::Value = self.client.put("chat/read", &body).await?;
        Ok(())
    }
}
