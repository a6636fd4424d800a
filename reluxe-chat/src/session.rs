//! The chat session: one user's live messaging state. Owns the cache, the
//! sidebar projections, and the socket binding; mirrors the original
//! single-threaded event loop by funneling every mutation through `&mut
//! self`.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

use reluxe_shared::errors::{AppError, AppResult, ErrorCode};
use reluxe_shared::read_state::ReadMap;
use reluxe_shared::types::PaginationParams;

use crate::api::{ChatApi, SendMessageRequest};
use crate::cache::MessageCache;
use crate::directory::{room_unread, RoomDirectory};
use crate::models::{ChatroomKey, ChatroomSummary, Message};
use crate::socket::manager::{MarkReadFn, SocketManager};
use crate::socket::transport::Transport;
use crate::socket::wire::{ClientEvent, MessagePosted, ServerEvent};

pub struct ChatSession {
    user: String,
    api: Arc<dyn ChatApi>,
    socket: SocketManager,
    cache: MessageCache,
    directory: RoomDirectory,
    read_marks: Arc<ReadMap<ChatroomKey>>,
    persisted_read_at: HashMap<ChatroomKey, Option<DateTime<Utc>>>,
    active: Option<ChatroomKey>,
}

impl ChatSession {
    pub fn new(user: impl Into<String>, api: Arc<dyn ChatApi>, transport: Box<dyn Transport>) -> Self {
        let user = user.into();
        let mark_read_api = api.clone();
        let mark_read: MarkReadFn = Arc::new(move |room| {
            let api = mark_read_api.clone();
            Box::pin(async move { api.mark_read(&room).await })
        });
        Self {
            socket: SocketManager::new(transport, user.clone(), mark_read),
            user,
            api,
            cache: MessageCache::new(),
            directory: RoomDirectory::new(),
            read_marks: Arc::new(ReadMap::new()),
            persisted_read_at: HashMap::new(),
            active: None,
        }
    }

    /// Load the chatroom list and its persisted read state from history.
    pub async fn refresh_rooms(&mut self) -> AppResult<()> {
        let records = self.api.rooms().await?;
        for record in records {
            let key = record.key();
            self.persisted_read_at.insert(key.clone(), record.read_at);
            self.directory
                .install(key, record.last_message, record.updated_at, record.avatar_url);
        }
        Ok(())
    }

    /// Open a chatroom: stamp it read locally before anything awaits, then
    /// bind the socket and refresh stale history.
    pub async fn open_room(&mut self, room: ChatroomKey) -> AppResult<()> {
        self.active = Some(room.clone());
        // Synchronous: the room must read as seen before any server round
        // trip completes.
        self.read_marks.mark_read(room.clone());

        self.socket.bind(room.clone()).await?;

        if self.cache.is_stale(&room) {
            self.refresh_history(&room).await?;
        }
        Ok(())
    }

    async fn refresh_history(&mut self, room: &ChatroomKey) -> AppResult<()> {
        let page = self
            .api
            .history(room, &PaginationParams::first_page())
            .await?;
        self.cache.replace(room, page.items);
        Ok(())
    }

    /// Send a message in the open chatroom: optimistic insert, REST create,
    /// socket fan-out on success, rollback on failure.
    pub async fn send(&mut self, text: impl Into<String>) -> AppResult<Uuid> {
        let room = self
            .active
            .clone()
            .ok_or_else(|| AppError::new(ErrorCode::ChatroomNotFound, "no chatroom is open"))?;

        let request = SendMessageRequest {
            text: text.into(),
            sender_name: self.user.clone(),
        };
        request
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        let echo = Message::local_echo(&request.text, &self.user);
        let echo_id = echo.id;

        let mut txn = self.cache.begin(&room);
        txn.apply(echo);

        match self.api.create_message(&room, &request).await {
            Ok(persisted) => {
                let message_id = persisted.id;
                let preview = persisted.text.clone();
                let created_at = persisted.created_at;
                txn.commit_replacing(echo_id, persisted);

                self.directory.record_outgoing(&room, &preview, created_at);

                let posted = MessagePosted {
                    product_id: room.product_id,
                    listing_owner: room.listing_owner.clone(),
                    buyer: room.buyer.clone(),
                    message_id,
                    sender_name: self.user.clone(),
                    preview: Some(preview),
                    created_at,
                };
                if let Err(e) = self.socket.emit(ClientEvent::Message(posted)).await {
                    // The message is persisted; peers will catch up from
                    // history even if the live fan-out misses.
                    tracing::warn!(room = %room, error = %e, "socket emit after send failed");
                }
                Ok(message_id)
            }
            Err(e) => {
                // Dropping the uncommitted transaction restores the exact
                // pre-send message list.
                drop(txn);
                tracing::warn!(room = %room, error = %e, "message send failed, rolled back");
                Err(e)
            }
        }
    }

    /// Pull the next socket event, if any.
    pub async fn next_event(&mut self) -> Option<ServerEvent> {
        self.socket.recv().await
    }

    /// Apply one server event to local state.
    pub async fn handle_event(&mut self, event: ServerEvent) -> AppResult<()> {
        match event {
            ServerEvent::GetMessage(posted) => {
                let room = posted.room();
                // Invalidate rather than merge: refetching cannot produce
                // duplicates or reordered entries.
                self.cache.invalidate(&room);

                let preview = posted.preview.as_deref().unwrap_or("[new message]");
                self.directory
                    .record_incoming(&room, preview, posted.created_at);

                if self.active.as_ref() == Some(&room) {
                    self.read_marks.mark_read(room.clone());
                    self.refresh_history(&room).await?;
                } else {
                    self.read_marks.force_unread(room);
                }
            }
            ServerEvent::ClientNew(presence) => {
                if let Some(active) = self.active.clone() {
                    self.directory.set_peer_online(&active, true);
                }
                tracing::debug!(user = %presence.user, "peer joined chatroom");
            }
            ServerEvent::UserLeft(presence) => {
                if let Some(active) = self.active.clone() {
                    self.directory.set_peer_online(&active, false);
                }
                tracing::debug!(user = %presence.user, "peer left chatroom");
            }
        }
        Ok(())
    }

    pub fn is_unread(&self, room: &ChatroomKey) -> bool {
        let persisted = self
            .persisted_read_at
            .get(room)
            .copied()
            .flatten();
        room_unread(
            room,
            self.active.as_ref(),
            self.read_marks.get(room).as_ref(),
            persisted,
        )
    }

    pub fn unread_count(&self) -> usize {
        self.directory
            .summaries()
            .iter()
            .filter(|summary| self.is_unread(&summary.key))
            .count()
    }

    pub fn messages(&self, room: &ChatroomKey) -> &[Message] {
        self.cache.messages(room)
    }

    pub fn summaries(&self) -> Vec<&ChatroomSummary> {
        self.directory.summaries()
    }

    pub fn active_room(&self) -> Option<&ChatroomKey> {
        self.active.as_ref()
    }

    pub fn read_marks(&self) -> &ReadMap<ChatroomKey> {
        &self.read_marks
    }

    /// Close the message panel: drop the socket (which marks the open room
    /// read one final time) and clear the active room.
    pub async fn close(&mut self) {
        self.socket.release().await;
        self.active = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::RoomRecord;
    use crate::socket::transport::Connection;
    use crate::socket::wire::SocketQuery;
    use async_trait::async_trait;
    use reluxe_shared::read_state::ReadMark;
    use reluxe_shared::types::Paginated;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    #[derive(Default)]
    struct MockApi {
        rooms: Mutex<Vec<RoomRecord>>,
        history: Mutex<HashMap<ChatroomKey, Vec<Message>>>,
        fail_create: AtomicBool,
        mark_read_calls: Mutex<Vec<ChatroomKey>>,
    }

    #[async_trait]
    impl ChatApi for MockApi {
        async fn rooms(&self) -> AppResult<Vec<RoomRecord>> {
            Ok(self.rooms.lock().unwrap().clone())
        }

        async fn history(
            &self,
            room: &ChatroomKey,
            page: &PaginationParams,
        ) -> AppResult<Paginated<Message>> {
            let items = self
                .history
                .lock()
                .unwrap()
                .get(room)
                .cloned()
                .unwrap_or_default();
            let total = items.len() as u64;
            Ok(Paginated::new(items, total, page))
        }

        async fn create_message(
            &self,
            _room: &ChatroomKey,
            request: &SendMessageRequest,
        ) -> AppResult<Message> {
            if self.fail_create.load(Ordering::SeqCst) {
                return Err(AppError::new(ErrorCode::SendRejected, "backend rejected"));
            }
            Ok(Message {
                id: Uuid::new_v4(),
                text: request.text.clone(),
                sender_name: request.sender_name.clone(),
                created_at: Utc::now(),
            })
        }

        async fn mark_read(&self, room: &ChatroomKey) -> AppResult<()> {
            self.mark_read_calls.lock().unwrap().push(room.clone());
            Ok(())
        }
    }

    struct Link {
        client_rx: mpsc::Receiver<ClientEvent>,
    }

    #[derive(Default)]
    struct MockSocket {
        fail: AtomicBool,
        links: Mutex<Vec<Link>>,
    }

    #[async_trait]
    impl Transport for MockSocket {
        async fn connect(&self, _query: &SocketQuery) -> AppResult<Connection> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(AppError::new(ErrorCode::SocketClosed, "refused"));
            }
            let (out_tx, out_rx) = mpsc::channel(16);
            let (_in_tx, in_rx) = mpsc::channel(16);
            self.links.lock().unwrap().push(Link { client_rx: out_rx });
            Ok(Connection::from_channels(
                out_tx,
                in_rx,
                Arc::new(AtomicBool::new(false)),
            ))
        }
    }

    struct SharedSocket(Arc<MockSocket>);

    #[async_trait]
    impl Transport for SharedSocket {
        async fn connect(&self, query: &SocketQuery) -> AppResult<Connection> {
            self.0.connect(query).await
        }
    }

    fn room(buyer: &str) -> ChatroomKey {
        ChatroomKey::new(21, "atelier", buyer)
    }

    fn session(api: Arc<MockApi>, socket: Arc<MockSocket>) -> ChatSession {
        ChatSession::new("nina", api, Box::new(SharedSocket(socket)))
    }

    fn posted_for(key: &ChatroomKey, preview: &str) -> MessagePosted {
        MessagePosted {
            product_id: key.product_id,
            listing_owner: key.listing_owner.clone(),
            buyer: key.buyer.clone(),
            message_id: Uuid::new_v4(),
            sender_name: key.buyer.clone(),
            preview: Some(preview.to_string()),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn open_room_stamps_read_before_any_round_trip() {
        let api = Arc::new(MockApi::default());
        let socket = Arc::new(MockSocket::default());
        socket.fail.store(true, Ordering::SeqCst);
        let mut session = session(api, socket);

        let k = room("nina");
        // The connect fails, but the local read stamp must already exist.
        assert!(session.open_room(k.clone()).await.is_err());
        assert!(matches!(
            session.read_marks().get(&k),
            Some(ReadMark::ReadAt(_))
        ));
        assert!(!session.is_unread(&k));
    }

    #[tokio::test]
    async fn send_commits_persisted_row_and_emits() {
        let api = Arc::new(MockApi::default());
        let socket = Arc::new(MockSocket::default());
        let mut session = session(api.clone(), socket.clone());

        let k = room("nina");
        session.open_room(k.clone()).await.unwrap();

        let message_id = session.send("is this still available?").await.unwrap();

        let messages = session.messages(&k);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].id, message_id);
        assert_eq!(messages[0].text, "is this still available?");

        // First frame is the join on bind, second is the fan-out emit.
        let mut link = socket.links.lock().unwrap().remove(0);
        let first = link.client_rx.try_recv().unwrap();
        assert!(matches!(first, ClientEvent::Join(_)));
        match link.client_rx.try_recv().unwrap() {
            ClientEvent::Message(posted) => {
                assert_eq!(posted.message_id, message_id);
                assert_eq!(posted.room(), k);
            }
            other => panic!("expected message event, got {other:?}"),
        }

        // Last-message projection follows the send.
        let summaries = session.summaries();
        assert_eq!(summaries[0].last_message, "is this still available?");
    }

    #[tokio::test]
    async fn failed_send_restores_the_exact_snapshot() {
        let api = Arc::new(MockApi::default());
        let k = room("nina");
        api.history.lock().unwrap().insert(
            k.clone(),
            vec![
                Message::local_echo("hello", "nina"),
                Message::local_echo("hi! yes it is", "atelier"),
            ],
        );
        let socket = Arc::new(MockSocket::default());
        let mut session = session(api.clone(), socket);

        session.open_room(k.clone()).await.unwrap();
        let before = session.messages(&k).to_vec();

        api.fail_create.store(true, Ordering::SeqCst);
        assert!(session.send("never persisted").await.is_err());

        assert_eq!(session.messages(&k), before.as_slice());
    }

    #[tokio::test]
    async fn empty_send_is_rejected_without_touching_the_cache() {
        let api = Arc::new(MockApi::default());
        let socket = Arc::new(MockSocket::default());
        let mut session = session(api, socket);

        let k = room("nina");
        session.open_room(k.clone()).await.unwrap();
        assert!(session.send("").await.is_err());
        assert!(session.messages(&k).is_empty());
    }

    #[tokio::test]
    async fn incoming_message_for_another_room_flips_it_unread() {
        let api = Arc::new(MockApi::default());
        let socket = Arc::new(MockSocket::default());
        let mut session = session(api, socket);

        let open = room("nina");
        let other = room("marc");
        session.open_room(open.clone()).await.unwrap();

        session
            .handle_event(ServerEvent::GetMessage(posted_for(&other, "offer?")))
            .await
            .unwrap();

        assert!(session.is_unread(&other));
        assert!(!session.is_unread(&open));
        assert_eq!(session.unread_count(), 1);

        // The projection picked up the preview even though the cache was
        // only invalidated.
        let summary = session
            .summaries()
            .into_iter()
            .find(|s| s.key == other)
            .cloned()
            .unwrap();
        assert_eq!(summary.last_message, "offer?");
    }

    #[tokio::test]
    async fn incoming_message_for_the_open_room_refetches_and_stays_read() {
        let api = Arc::new(MockApi::default());
        let k = room("nina");
        let socket = Arc::new(MockSocket::default());
        let mut session = session(api.clone(), socket);

        session.open_room(k.clone()).await.unwrap();

        // The peer's message lands in history before the socket ping.
        api.history.lock().unwrap().insert(
            k.clone(),
            vec![Message::local_echo("new offer", "atelier")],
        );
        session
            .handle_event(ServerEvent::GetMessage(posted_for(&k, "new offer")))
            .await
            .unwrap();

        assert_eq!(session.messages(&k).len(), 1);
        assert_eq!(session.messages(&k)[0].text, "new offer");
        assert!(!session.is_unread(&k));
    }

    #[tokio::test]
    async fn unread_falls_back_to_persisted_read_at() {
        let api = Arc::new(MockApi::default());
        let read_room = room("nina");
        let unread_room = room("marc");
        {
            let mut rooms = api.rooms.lock().unwrap();
            rooms.push(RoomRecord {
                product_id: read_room.product_id,
                listing_owner: read_room.listing_owner.clone(),
                buyer: read_room.buyer.clone(),
                last_message: "thanks!".into(),
                updated_at: Utc::now(),
                avatar_url: None,
                read_at: Some(Utc::now()),
            });
            rooms.push(RoomRecord {
                product_id: unread_room.product_id,
                listing_owner: unread_room.listing_owner.clone(),
                buyer: unread_room.buyer.clone(),
                last_message: "any discount?".into(),
                updated_at: Utc::now(),
                avatar_url: None,
                read_at: None,
            });
        }
        let socket = Arc::new(MockSocket::default());
        let mut session = session(api, socket);

        session.refresh_rooms().await.unwrap();
        assert!(!session.is_unread(&read_room));
        assert!(session.is_unread(&unread_room));
        assert_eq!(session.unread_count(), 1);
    }

    #[tokio::test]
    async fn open_room_marks_read_via_rest_on_connect() {
        let api = Arc::new(MockApi::default());
        let socket = Arc::new(MockSocket::default());
        let mut session = session(api.clone(), socket);

        let k = room("nina");
        session.open_room(k.clone()).await.unwrap();
        session.close().await;

        // Once on connect, once on disconnect; both idempotent.
        let calls = api.mark_read_calls.lock().unwrap();
        assert_eq!(calls.as_slice(), &[k.clone(), k]);
    }
}
