use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Common notification payload. Offline rows carry a persisted `read_at`;
/// live-pushed ones arrive with it null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    pub id: Uuid,
    pub sender: String,
    pub content: String,
    #[serde(default)]
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Notification variants, discriminated by the wire `type` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NotificationEvent {
    #[serde(rename = "notification.message")]
    Message(Notice),
    #[serde(rename = "notification.like")]
    Like(Notice),
    #[serde(rename = "notification.follow")]
    Follow(Notice),
    #[serde(rename = "notification.upload")]
    Upload(Notice),
}

impl NotificationEvent {
    pub fn notice(&self) -> &Notice {
        match self {
            Self::Message(n) | Self::Like(n) | Self::Follow(n) | Self::Upload(n) => n,
        }
    }

    pub fn id(&self) -> Uuid {
        self.notice().id
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Message(_) => "notification.message",
            Self::Like(_) => "notification.like",
            Self::Follow(_) => "notification.follow",
            Self::Upload(_) => "notification.upload",
        }
    }
}
