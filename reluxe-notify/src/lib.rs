pub mod api;
pub mod inbox;
pub mod model;
pub mod sse;

pub use api::{HttpNotifyApi, NotifyApi};
pub use inbox::NotificationInbox;
pub use model::{Notice, NotificationEvent};
pub use sse::NotificationStream;
