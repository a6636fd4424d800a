pub mod manager;
pub mod transport;
pub mod wire;

pub use manager::{MarkReadFn, SocketManager};
pub use transport::{Connection, Transport, TungsteniteTransport};
pub use wire::{ClientEvent, MessagePosted, Presence, ServerEvent, SocketQuery};
