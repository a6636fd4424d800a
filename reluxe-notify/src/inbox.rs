//! The notification inbox: one merged view over live-pushed items and
//! persisted history, with read state reconciled through the shared map.

use std::sync::Arc;

use uuid::Uuid;

use reluxe_shared::errors::AppResult;
use reluxe_shared::read_state::ReadMap;
use reluxe_shared::types::PaginationParams;

use crate::api::NotifyApi;
use crate::model::NotificationEvent;

pub struct NotificationInbox {
    api: Arc<dyn NotifyApi>,
    online: Vec<NotificationEvent>,
    offline: Vec<NotificationEvent>,
    read_marks: Arc<ReadMap<Uuid>>,
}

impl NotificationInbox {
    pub fn new(api: Arc<dyn NotifyApi>) -> Self {
        Self {
            api,
            online: Vec::new(),
            offline: Vec::new(),
            read_marks: Arc::new(ReadMap::new()),
        }
    }

    /// A live item landed on the push stream: unread until acted on.
    pub fn push_online(&mut self, event: NotificationEvent) {
        self.read_marks.mark_pending(event.id());
        self.online.insert(0, event);
    }

    /// Install one page of persisted history.
    pub async fn load_offline(&mut self) -> AppResult<()> {
        let page = self.api.offline(&PaginationParams::first_page()).await?;
        self.offline = page.items;
        Ok(())
    }

    /// Merged view, newest first. A live item shadows the history row with
    /// the same id.
    pub fn merged(&self) -> Vec<&NotificationEvent> {
        let mut all: Vec<&NotificationEvent> = self.online.iter().collect();
        for event in &self.offline {
            if !self.online.iter().any(|o| o.id() == event.id()) {
                all.push(event);
            }
        }
        all.sort_by(|a, b| b.notice().created_at.cmp(&a.notice().created_at));
        all
    }

    pub fn is_unread(&self, id: Uuid) -> bool {
        let persisted = self
            .merged()
            .into_iter()
            .find(|event| event.id() == id)
            .and_then(|event| event.notice().read_at);
        !self.read_marks.is_read(&id, persisted)
    }

    pub fn unread_count(&self) -> usize {
        self.merged()
            .into_iter()
            .filter(|event| {
                !self
                    .read_marks
                    .is_read(&event.id(), event.notice().read_at)
            })
            .count()
    }

    /// Stamp one notification read locally, then persist the stamp.
    pub async fn mark_read(&mut self, id: Uuid) -> AppResult<()> {
        self.read_marks.mark_read(id);
        self.api.mark_read(id).await
    }

    /// Stamp everything read, locally first.
    pub async fn mark_all_read(&mut self) -> AppResult<()> {
        let ids: Vec<Uuid> = self.merged().into_iter().map(|e| e.id()).collect();
        for id in ids {
            self.read_marks.mark_read(id);
        }
        self.api.mark_all_read().await
    }

    pub fn read_marks(&self) -> &ReadMap<Uuid> {
        &self.read_marks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use reluxe_shared::types::Paginated;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use crate::model::Notice;

    #[derive(Default)]
    struct MockApi {
        offline: Mutex<Vec<NotificationEvent>>,
        marked: Mutex<Vec<Uuid>>,
        mark_all_calls: AtomicUsize,
    }

    #[async_trait]
    impl NotifyApi for MockApi {
        async fn offline(
            &self,
            page: &PaginationParams,
        ) -> AppResult<Paginated<NotificationEvent>> {
            let items = self.offline.lock().unwrap().clone();
            let total = items.len() as u64;
            Ok(Paginated::new(items, total, page))
        }

        async fn mark_read(&self, id: Uuid) -> AppResult<()> {
            self.marked.lock().unwrap().push(id);
            Ok(())
        }

        async fn mark_all_read(&self) -> AppResult<()> {
            self.mark_all_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn like(read_at: Option<chrono::DateTime<Utc>>, age_minutes: i64) -> NotificationEvent {
        NotificationEvent::Like(Notice {
            id: Uuid::new_v4(),
            sender: "nina".into(),
            content: "liked your listing".into(),
            read_at,
            created_at: Utc::now() - Duration::minutes(age_minutes),
        })
    }

    #[tokio::test]
    async fn live_items_default_to_unread_until_marked() {
        let api = Arc::new(MockApi::default());
        let mut inbox = NotificationInbox::new(api.clone());

        let event = like(None, 0);
        let id = event.id();
        inbox.push_online(event);

        assert!(inbox.is_unread(id));
        assert_eq!(inbox.unread_count(), 1);

        inbox.mark_read(id).await.unwrap();
        assert!(!inbox.is_unread(id));
        assert_eq!(api.marked.lock().unwrap().as_slice(), &[id]);
    }

    #[tokio::test]
    async fn persisted_read_at_is_authoritative_for_history() {
        let api = Arc::new(MockApi::default());
        let read = like(Some(Utc::now()), 10);
        let unread = like(None, 5);
        let (read_id, unread_id) = (read.id(), unread.id());
        *api.offline.lock().unwrap() = vec![read, unread];

        let mut inbox = NotificationInbox::new(api);
        inbox.load_offline().await.unwrap();

        assert!(!inbox.is_unread(read_id));
        assert!(inbox.is_unread(unread_id));
        assert_eq!(inbox.unread_count(), 1);
    }

    #[tokio::test]
    async fn live_item_shadows_its_history_row() {
        let api = Arc::new(MockApi::default());
        let mut history_row = like(Some(Utc::now()), 30);
        let id = history_row.id();
        *api.offline.lock().unwrap() = vec![history_row.clone()];

        let mut inbox = NotificationInbox::new(api);
        inbox.load_offline().await.unwrap();

        // The same notification arrives live (e.g. redelivered on
        // reconnect): the pushed copy wins and reads as pending.
        if let NotificationEvent::Like(notice) = &mut history_row {
            notice.read_at = None;
        }
        inbox.push_online(history_row);

        assert_eq!(inbox.merged().len(), 1);
        assert!(inbox.is_unread(id));
    }

    #[tokio::test]
    async fn merged_orders_newest_first() {
        let api = Arc::new(MockApi::default());
        let older = like(None, 60);
        *api.offline.lock().unwrap() = vec![older.clone()];

        let mut inbox = NotificationInbox::new(api);
        inbox.load_offline().await.unwrap();
        let newer = like(None, 0);
        let newer_id = newer.id();
        inbox.push_online(newer);

        let merged = inbox.merged();
        assert_eq!(merged[0].id(), newer_id);
        assert_eq!(merged[1].id(), older.id());
    }

    #[tokio::test]
    async fn mark_all_read_clears_every_source() {
        let api = Arc::new(MockApi::default());
        *api.offline.lock().unwrap() = vec![like(None, 10)];

        let mut inbox = NotificationInbox::new(api.clone());
        inbox.load_offline().await.unwrap();
        inbox.push_online(like(None, 0));
        assert_eq!(inbox.unread_count(), 2);

        inbox.mark_all_read().await.unwrap();
        assert_eq!(inbox.unread_count(), 0);
        assert_eq!(api.mark_all_calls.load(Ordering::SeqCst), 1);
    }
}
