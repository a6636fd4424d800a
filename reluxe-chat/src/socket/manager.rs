//! Socket lifecycle: at most one live connection, rebound whenever the open
//! chatroom changes.

use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::mpsc;

use reluxe_shared::errors::{AppError, AppResult, ErrorCode};

use crate::models::ChatroomKey;

use super::transport::{Connection, Transport};
use super::wire::{ClientEvent, Presence, ServerEvent, SocketQuery};

/// Caller-supplied idempotent REST call marking a room read up to now.
/// Invoked on both connect and disconnect.
pub type MarkReadFn =
    Arc<dyn Fn(ChatroomKey) -> BoxFuture<'static, AppResult<()>> + Send + Sync>;

struct ActiveSocket {
    room: ChatroomKey,
    query: SocketQuery,
    conn: Connection,
    events: Option<mpsc::Receiver<ServerEvent>>,
}

pub struct SocketManager {
    transport: Box<dyn Transport>,
    user: String,
    mark_read: MarkReadFn,
    active: Option<ActiveSocket>,
}

impl SocketManager {
    pub fn new(transport: Box<dyn Transport>, user: impl Into<String>, mark_read: MarkReadFn) -> Self {
        Self {
            transport,
            user: user.into(),
            mark_read,
            active: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.active
            .as_ref()
            .map(|active| active.conn.is_connected())
            .unwrap_or(false)
    }

    pub fn current_room(&self) -> Option<&ChatroomKey> {
        self.active.as_ref().map(|active| &active.room)
    }

    /// Bind the socket to `room`, rebinding the query parameters first.
    ///
    /// If the connection for this exact room is already live, this is a
    /// no-op: connect() is never called on a connected socket. Otherwise
    /// the old connection is torn down (pump tasks aborted, so stale
    /// handlers cannot fire twice) before the new one is established.
    ///
    /// Connect failures are logged and returned; there is no retry or
    /// backoff here.
    pub async fn bind(&mut self, room: ChatroomKey) -> AppResult<()> {
        let query = SocketQuery::for_room(self.user.clone(), &room);

        if let Some(active) = &self.active {
            if active.query == query && active.room == room && active.conn.is_connected() {
                return Ok(());
            }
        }

        self.teardown().await;

        match self.transport.connect(&query).await {
            Ok(mut conn) => {
                let events = conn.take_events();
                let _ = conn
                    .emit(ClientEvent::Join(Presence {
                        user: self.user.clone(),
                    }))
                    .await;
                self.active = Some(ActiveSocket {
                    room: room.clone(),
                    query,
                    conn,
                    events,
                });
                if let Err(e) = (self.mark_read)(room.clone()).await {
                    tracing::warn!(room = %room, error = %e, "mark-read on connect failed");
                }
                tracing::debug!(room = %room, "chat socket connected");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(room = %room, error = %e, "chat socket connect failed");
                Err(e)
            }
        }
    }

    /// Receive the next server event from the live connection. Returns
    /// `None` when no connection is bound or the connection ended.
    pub async fn recv(&mut self) -> Option<ServerEvent> {
        let active = self.active.as_mut()?;
        let events = active.events.as_mut()?;
        events.recv().await
    }

    pub async fn emit(&self, event: ClientEvent) -> AppResult<()> {
        match &self.active {
            Some(active) => active.conn.emit(event).await,
            None => Err(AppError::new(
                ErrorCode::SocketClosed,
                "no chatroom socket bound",
            )),
        }
    }

    /// Disconnect entirely, e.g. when the message panel closes.
    pub async fn release(&mut self) {
        self.teardown().await;
    }

    async fn teardown(&mut self) {
        if let Some(mut active) = self.active.take() {
            let _ = active
                .conn
                .emit(ClientEvent::Leave(Presence {
                    user: self.user.clone(),
                }))
                .await;
            active.conn.close();
            if let Err(e) = (self.mark_read)(active.room.clone()).await {
                tracing::warn!(room = %active.room, error = %e, "mark-read on disconnect failed");
            }
            tracing::debug!(room = %active.room, "chat socket released");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::socket::wire::Presence;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct Link {
        server_tx: mpsc::Sender<ServerEvent>,
        client_rx: mpsc::Receiver<ClientEvent>,
        closed: Arc<AtomicBool>,
    }

    #[derive(Default)]
    struct MockTransport {
        connects: AtomicUsize,
        fail: AtomicBool,
        links: Mutex<Vec<Link>>,
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn connect(&self, _query: &SocketQuery) -> AppResult<Connection> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(AppError::new(ErrorCode::SocketClosed, "refused"));
            }
            let (out_tx, out_rx) = mpsc::channel(16);
            let (in_tx, in_rx) = mpsc::channel(16);
            let closed = Arc::new(AtomicBool::new(false));
            self.links.lock().unwrap().push(Link {
                server_tx: in_tx,
                client_rx: out_rx,
                closed: closed.clone(),
            });
            Ok(Connection::from_channels(out_tx, in_rx, closed))
        }
    }

    fn recorder() -> (MarkReadFn, Arc<Mutex<Vec<ChatroomKey>>>) {
        let calls: Arc<Mutex<Vec<ChatroomKey>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = calls.clone();
        let mark_read: MarkReadFn = Arc::new(move |room| {
            let sink = sink.clone();
            Box::pin(async move {
                sink.lock().unwrap().push(room);
                Ok(())
            })
        });
        (mark_read, calls)
    }

    fn room(buyer: &str) -> ChatroomKey {
        ChatroomKey::new(1, "atelier", buyer)
    }

    #[tokio::test]
    async fn rebinding_same_room_never_reconnects() {
        let transport = Arc::new(MockTransport::default());
        let (mark_read, _) = recorder();
        let mut manager =
            SocketManager::new(Box::new(SharedTransport(transport.clone())), "nina", mark_read);

        manager.bind(room("nina")).await.unwrap();
        manager.bind(room("nina")).await.unwrap();
        assert_eq!(transport.connects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn switching_rooms_closes_the_old_connection() {
        let transport = Arc::new(MockTransport::default());
        let (mark_read, calls) = recorder();
        let mut manager =
            SocketManager::new(Box::new(SharedTransport(transport.clone())), "nina", mark_read);

        manager.bind(room("nina")).await.unwrap();
        manager.bind(room("marc")).await.unwrap();

        assert_eq!(transport.connects.load(Ordering::SeqCst), 2);
        {
            let links = transport.links.lock().unwrap();
            assert!(links[0].closed.load(Ordering::SeqCst));
            assert!(!links[1].closed.load(Ordering::SeqCst));
        }

        // connect(nina), disconnect(nina), connect(marc)
        let calls = calls.lock().unwrap();
        assert_eq!(calls.as_slice(), &[room("nina"), room("nina"), room("marc")]);
    }

    #[tokio::test]
    async fn connect_failure_leaves_no_active_socket() {
        let transport = Arc::new(MockTransport::default());
        transport.fail.store(true, Ordering::SeqCst);
        let (mark_read, calls) = recorder();
        let mut manager =
            SocketManager::new(Box::new(SharedTransport(transport.clone())), "nina", mark_read);

        assert!(manager.bind(room("nina")).await.is_err());
        assert!(!manager.is_connected());
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn release_marks_the_room_read() {
        let transport = Arc::new(MockTransport::default());
        let (mark_read, calls) = recorder();
        let mut manager =
            SocketManager::new(Box::new(SharedTransport(transport.clone())), "nina", mark_read);

        manager.bind(room("nina")).await.unwrap();
        manager.release().await;

        let calls = calls.lock().unwrap();
        assert_eq!(calls.as_slice(), &[room("nina"), room("nina")]);
        assert!(!manager.is_connected());
    }

    #[tokio::test]
    async fn events_flow_from_the_live_connection() {
        let transport = Arc::new(MockTransport::default());
        let (mark_read, _) = recorder();
        let mut manager =
            SocketManager::new(Box::new(SharedTransport(transport.clone())), "nina", mark_read);

        manager.bind(room("nina")).await.unwrap();
        let server_tx = transport.links.lock().unwrap()[0].server_tx.clone();
        server_tx
            .send(ServerEvent::ClientNew(Presence { user: "atelier".into() }))
            .await
            .unwrap();

        let event = manager.recv().await.unwrap();
        assert_eq!(event, ServerEvent::ClientNew(Presence { user: "atelier".into() }));
    }

    /// Adapter so tests can keep a handle on the mock while the manager
    /// owns a boxed transport.
    struct SharedTransport(Arc<MockTransport>);

    #[async_trait]
    impl Transport for SharedTransport {
        async fn connect(&self, query: &SocketQuery) -> AppResult<Connection> {
            self.0.connect(query).await
        }
    }
}
