//! Consumer for the notification server's SSE endpoint.
//!
//! Frames follow the usual shape:
//!
//! ```text
//! event: notification.like
//! id: 8c7f9e66-...
//! data: {"type":"notification.like", ...}
//! ```
//!
//! The `data` JSON is self-describing via its `type` field, so the `event:`
//! and `id:` lines are informational here. Comment lines (`:heartbeat`)
//! keep proxies from dropping the connection and are ignored.

use futures::StreamExt;
use reqwest::header::{ACCEPT, COOKIE};
use tokio::sync::mpsc;

use reluxe_shared::errors::{AppError, AppResult, ErrorCode};

use crate::model::NotificationEvent;

const CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
pub struct NotificationStream {
    http: reqwest::Client,
    endpoint: String,
    session_cookie: Option<String>,
}

impl NotificationStream {
    pub fn new(endpoint: impl Into<String>, session_cookie: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
            session_cookie,
        }
    }

    /// Open the credentialed event stream and spawn the reader. Parsed
    /// events arrive on the returned channel; malformed payloads are
    /// skipped with a log line. When the stream ends the channel closes —
    /// there is no reconnect attempt here.
    pub async fn subscribe(&self) -> AppResult<mpsc::Receiver<NotificationEvent>> {
        let url = format!("{}/events", self.endpoint.trim_end_matches('/'));
        let mut request = self.http.get(&url).header(ACCEPT, "text/event-stream");
        if let Some(cookie) = &self.session_cookie {
            request = request.header(COOKIE, cookie.clone());
        }

        let response = request.send().await?;
        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(AppError::session_expired());
        }
        if !response.status().is_success() {
            return Err(AppError::new(
                ErrorCode::StreamEnded,
                format!("notification server returned {}", response.status()),
            ));
        }

        tracing::info!(url = %url, "notification stream connected");

        let mut body = response.bytes_stream();
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);

        tokio::spawn(async move {
            let mut pending = String::new();
            let mut data = String::new();

            while let Some(chunk) = body.next().await {
                let bytes = match chunk {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        tracing::warn!(error = %e, "notification stream read failed");
                        break;
                    }
                };
                pending.push_str(&String::from_utf8_lossy(&bytes));

                while let Some(newline) = pending.find('\n') {
                    let line = pending[..newline].trim_end_matches('\r').to_string();
                    pending.drain(..=newline);

                    if line.is_empty() {
                        if data.is_empty() {
                            continue;
                        }
                        match serde_json::from_str::<NotificationEvent>(&data) {
                            Ok(event) => {
                                if tx.send(event).await.is_err() {
                                    return;
                                }
                            }
                            Err(e) => {
                                tracing::warn!(error = %e, "skipping malformed notification payload");
                            }
                        }
                        data.clear();
                    } else if let Some(rest) = line.strip_prefix("data:") {
                        if !data.is_empty() {
                            data.push('\n');
                        }
                        data.push_str(rest.trim_start());
                    }
                    // `event:`, `id:`, `retry:` and comment lines carry
                    // nothing the payload does not already say.
                }
            }

            tracing::warn!("notification stream ended");
        });

        Ok(rx)
    }
}
