use std::sync::Arc;

use reluxe_chat::api::HttpChatApi;
use reluxe_chat::socket::transport::TungsteniteTransport;
use reluxe_chat::ChatSession;
use reluxe_notify::{HttpNotifyApi, NotificationInbox, NotificationStream};
use reluxe_shared::clients::proxy::ProxyClient;

mod config;

use config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    reluxe_shared::middleware::init_tracing("reluxe-agent");

    let config = AppConfig::load()?;

    let client = ProxyClient::new(&config.gateway_url, Some(config.session_token.clone()));

    // Chat state: room list plus unread badge derivation.
    let chat_api = Arc::new(HttpChatApi::new(client.clone()));
    let transport = Box::new(TungsteniteTransport::new(&config.chat_socket_url));
    let mut session = ChatSession::new(&config.user, chat_api, transport);
    match session.refresh_rooms().await {
        Ok(()) => tracing::info!(
            rooms = session.summaries().len(),
            unread = session.unread_count(),
            "chatrooms loaded"
        ),
        Err(e) => tracing::warn!(error = %e, "could not load chatrooms"),
    }

    // Notification inbox: persisted history first, then the live stream.
    let notify_api = Arc::new(HttpNotifyApi::new(client));
    let mut inbox = NotificationInbox::new(notify_api);
    match inbox.load_offline().await {
        Ok(()) => tracing::info!(unread = inbox.unread_count(), "notification history loaded"),
        Err(e) => tracing::warn!(error = %e, "could not load notification history"),
    }

    let stream = NotificationStream::new(
        &config.notification_server_url,
        Some(config.session_cookie()),
    );
    let mut events = stream.subscribe().await?;

    let mut last_unread = inbox.unread_count();
    loop {
        tokio::select! {
            maybe_event = events.recv() => match maybe_event {
                Some(event) => {
                    tracing::info!(
                        kind = event.kind(),
                        sender = %event.notice().sender,
                        "notification received"
                    );
                    inbox.push_online(event);
                    let unread = inbox.unread_count();
                    if unread != last_unread {
                        tracing::info!(unread, "unread notifications");
                        last_unread = unread;
                    }
                }
                None => {
                    tracing::warn!("notification stream closed");
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutting down");
                break;
            }
        }
    }

    session.close().await;
    Ok(())
}
