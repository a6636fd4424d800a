//! Transport seam for the chat socket. Production uses a WebSocket via
//! tokio-tungstenite; tests bridge the same `Connection` over plain
//! channels.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;

use reluxe_shared::errors::{AppError, AppResult, ErrorCode};

use super::wire::{ClientEvent, ServerEvent, SocketQuery};

const CHANNEL_CAPACITY: usize = 64;

#[async_trait]
pub trait Transport: Send + Sync {
    async fn connect(&self, query: &SocketQuery) -> AppResult<Connection>;
}

/// A live socket: an outbound sink, an inbound event receiver, and the
/// pump tasks that service them. Closing aborts the tasks, which is what
/// removes every attached listener before a rebind.
#[derive(Debug)]
pub struct Connection {
    outbound: mpsc::Sender<ClientEvent>,
    inbound: Option<mpsc::Receiver<ServerEvent>>,
    closed: Arc<AtomicBool>,
    tasks: Vec<JoinHandle<()>>,
}

impl Connection {
    /// Bridge a connection over raw channels; used by in-memory transports
    /// in tests.
    pub fn from_channels(
        outbound: mpsc::Sender<ClientEvent>,
        inbound: mpsc::Receiver<ServerEvent>,
        closed: Arc<AtomicBool>,
    ) -> Self {
        Self {
            outbound,
            inbound: Some(inbound),
            closed,
            tasks: Vec::new(),
        }
    }

    pub fn is_connected(&self) -> bool {
        !self.closed.load(Ordering::SeqCst)
    }

    pub async fn emit(&self, event: ClientEvent) -> AppResult<()> {
        if !self.is_connected() {
            return Err(AppError::new(ErrorCode::SocketClosed, "socket is closed"));
        }
        self.outbound
            .send(event)
            .await
            .map_err(|_| AppError::new(ErrorCode::SocketClosed, "socket writer is gone"))
    }

    /// Hand the inbound event stream to the single consumer.
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<ServerEvent>> {
        self.inbound.take()
    }

    pub fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}

/// WebSocket transport against the chat server endpoint.
#[derive(Debug, Clone)]
pub struct TungsteniteTransport {
    endpoint: String,
}

impl TungsteniteTransport {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }

    fn url_for(&self, query: &SocketQuery) -> AppResult<reqwest::Url> {
        let mut url = reqwest::Url::parse(&self.endpoint)
            .map_err(|e| AppError::new(ErrorCode::SocketClosed, format!("bad endpoint: {e}")))?;
        url.query_pairs_mut()
            .clear()
            .extend_pairs(query.query_pairs());
        Ok(url)
    }
}

#[async_trait]
impl Transport for TungsteniteTransport {
    async fn connect(&self, query: &SocketQuery) -> AppResult<Connection> {
        let url = self.url_for(query)?;
        let (socket, _response) = connect_async(url.as_str())
            .await
            .map_err(|e| AppError::new(ErrorCode::SocketClosed, format!("connect failed: {e}")))?;

        let (mut sink, mut stream) = socket.split();
        let closed = Arc::new(AtomicBool::new(false));

        let (out_tx, mut out_rx) = mpsc::channel::<ClientEvent>(CHANNEL_CAPACITY);
        let (in_tx, in_rx) = mpsc::channel::<ServerEvent>(CHANNEL_CAPACITY);

        let writer_closed = closed.clone();
        let writer = tokio::spawn(async move {
            while let Some(event) = out_rx.recv().await {
                let frame = match serde_json::to_string(&event) {
                    Ok(json) => json,
                    Err(e) => {
                        tracing::warn!(error = %e, "failed to serialize client event");
                        continue;
                    }
                };
                if let Err(e) = sink.send(WsMessage::Text(frame)).await {
                    tracing::warn!(error = %e, "socket write failed");
                    break;
                }
            }
            writer_closed.store(true, Ordering::SeqCst);
        });

        let reader_closed = closed.clone();
        let reader = tokio::spawn(async move {
            while let Some(frame) = stream.next().await {
                match frame {
                    Ok(WsMessage::Text(text)) => match serde_json::from_str::<ServerEvent>(&text) {
                        Ok(event) => {
                            if in_tx.send(event).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "skipping malformed socket frame");
                        }
                    },
                    Ok(WsMessage::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!(error = %e, "socket read failed");
                        break;
                    }
                }
            }
            reader_closed.store(true, Ordering::SeqCst);
        });

        Ok(Connection {
            outbound: out_tx,
            inbound: Some(in_rx),
            closed,
            tasks: vec![writer, reader],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChatroomKey;
    use crate::socket::wire::Presence;

    #[test]
    fn url_carries_rebound_query() {
        let transport = TungsteniteTransport::new("ws://chat.example/socket");
        let room = ChatroomKey::new(77, "atelier", "nina");
        let url = transport
            .url_for(&SocketQuery::for_room("nina", &room))
            .unwrap();
        assert_eq!(
            url.as_str(),
            "ws://chat.example/socket?user=nina&listingOwner=atelier&productId=77"
        );
    }

    #[tokio::test]
    async fn emit_after_close_is_rejected() {
        let (out_tx, _out_rx) = mpsc::channel(4);
        let (_in_tx, in_rx) = mpsc::channel(4);
        let mut conn = Connection::from_channels(out_tx, in_rx, Arc::new(AtomicBool::new(false)));

        conn.close();
        let err = conn
            .emit(ClientEvent::Leave(Presence { user: "nina".into() }))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::SocketClosed);
    }
}
