pub mod api;
pub mod cache;
pub mod directory;
pub mod models;
pub mod session;
pub mod socket;

pub use api::{ChatApi, HttpChatApi, RoomRecord, SendMessageRequest};
pub use cache::{CacheTxn, MessageCache};
pub use directory::{room_unread, RoomDirectory};
pub use models::{ChatroomKey, ChatroomSummary, Message};
pub use session::ChatSession;
