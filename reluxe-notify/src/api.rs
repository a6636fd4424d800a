use async_trait::async_trait;
use uuid::Uuid;

use reluxe_shared::clients::proxy::ProxyClient;
use reluxe_shared::errors::AppResult;
use reluxe_shared::types::{Paginated, PaginationParams};

use crate::model::NotificationEvent;

#[async_trait]
pub trait NotifyApi: Send + Sync {
    /// One page of persisted notification history.
    async fn offline(&self, page: &PaginationParams) -> AppResult<Paginated<NotificationEvent>>;

    /// Idempotent: stamp one notification read.
    async fn mark_read(&self, id: Uuid) -> AppResult<()>;

    /// Idempotent: stamp every unread notification read.
    async fn mark_all_read(&self) -> AppResult<()>;
}

#[derive(Debug, Clone)]
pub struct HttpNotifyApi {
    client: ProxyClient,
}

impl HttpNotifyApi {
    pub fn new(client: ProxyClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl NotifyApi for HttpNotifyApi {
    async fn offline(&self, page: &PaginationParams) -> AppResult<Paginated<NotificationEvent>> {
        let uri = format!("notification?{}", page.to_query());
        self.client.get(&uri).await
    }

    async fn mark_read(&self, id: Uuid) -> AppResult<()> {
        let uri = format!("notification/{id}/read");
        let _: serde_json::Value = self.client.put(&uri, &serde_json::json!({})).await?;
        Ok(())
    }

    async fn mark_all_read(&self) -> AppResult<()> {
        let _: serde_json::Value = self
            .client
            .put("notification/read-all", &serde_json::json!({}))
            .await?;
        Ok(())
    }
}
