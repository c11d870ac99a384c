use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use heapless::String as HeaplessString;
use loan_engine_api::domain::{Notification, NotificationKind, NotificationStatus};
use loan_engine_api::error::{EngineError, EngineResult};
use loan_engine_api::service::NotificationHub;
use loan_engine_db::Store;
use serde_json::Value;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Capacity of the live-delivery channel. A slow or absent subscriber simply
/// misses the oldest buffered notifications and falls back to the durable
/// store on reconnect (§4.6: "push is best-effort; persistence is not").
const LIVE_CHANNEL_CAPACITY: usize = 256;

/// Persist-then-push delivery with a subscriber presence map (§4.6). The
/// presence map is an in-process `RwLock<HashMap<_, _>>`, the same
/// granularity the teacher uses for its own in-memory registries — it
/// never has to survive a store call, so it is never held across one (§5).
///
/// Live delivery itself rides a single process-wide `broadcast` channel
/// (`tokio::sync::broadcast`, already in the workspace's ambient stack):
/// every subscriber gets its own `Receiver` via [`NotificationHubImpl::listen`],
/// and `notify`/`notify_operators` publish to it after the store write
/// succeeds. This is an inherent API, not part of the `NotificationHub`
/// trait — callers that only need presence/fan-out semantics keep depending
/// on `Arc<dyn NotificationHub>`; only the transport layer that terminates a
/// live connection needs the concrete type.
pub struct NotificationHubImpl {
    store: Arc<dyn Store>,
    subscribers: RwLock<HashMap<Uuid, Vec<Uuid>>>,
    live: broadcast::Sender<Notification>,
}

impl NotificationHubImpl {
    pub fn new(store: Arc<dyn Store>) -> Self {
        let (live, _) = broadcast::channel(LIVE_CHANNEL_CAPACITY);
        Self {
            store,
            subscribers: RwLock::new(HashMap::new()),
            live,
        }
    }

    /// Opens a receiver onto the live-delivery channel. Intended for a
    /// transport-layer SSE/WebSocket handler, which filters the stream down
    /// to the notifications addressed to its own connected account.
    pub fn listen(&self) -> broadcast::Receiver<Notification> {
        self.live.subscribe()
    }

    fn build(account_id: Uuid, kind: NotificationKind, title: &str, body: &str, data: Option<Value>) -> EngineResult<Notification> {
        Ok(Notification {
            id: Uuid::new_v4(),
            account_id,
            kind,
            title: HeaplessString::try_from(title).map_err(|_| EngineError::Validation {
                field: "title".into(),
                message: "too long".into(),
            })?,
            body: HeaplessString::try_from(body).map_err(|_| EngineError::Validation {
                field: "body".into(),
                message: "too long".into(),
            })?,
            data,
            status: NotificationStatus::Sent,
            sent_at: Some(Utc::now()),
            read_at: None,
            created_at: Utc::now(),
        })
    }
}

#[async_trait]
impl NotificationHub for NotificationHubImpl {
    async fn notify(
        &self,
        account_id: Uuid,
        kind: NotificationKind,
        title: &str,
        body: &str,
        data: Option<Value>,
    ) -> EngineResult<Notification> {
        let notification = Self::build(account_id, kind, title, body, data)?;
        // Persist first: an offline subscriber must still find this on reconnect.
        let notification = self.store.notifications().insert(notification).await?;
        tracing::debug!(account_id = %account_id, kind = kind.as_str(), "notification persisted");
        if self.is_online(account_id) {
            // `send` only errors when there are zero receivers, which races
            // harmlessly with a subscriber disconnecting between the
            // presence check above and this call.
            let _ = self.live.send(notification.clone());
            tracing::debug!(account_id = %account_id, "pushed notification to live subscriber");
        }
        Ok(notification)
    }

    async fn notify_operators(
        &self,
        kind: NotificationKind,
        title: &str,
        body: &str,
        data: Option<Value>,
    ) -> EngineResult<Vec<Notification>> {
        let operators = self.store.accounts().list_operators().await?;
        let mut delivered = Vec::with_capacity(operators.len());
        for operator in operators {
            delivered.push(self.notify(operator.id, kind, title, body, data.clone()).await?);
        }
        Ok(delivered)
    }

    async fn subscribe(&self, account_id: Uuid, bearer_token: &str) -> EngineResult<Uuid> {
        if bearer_token.is_empty() {
            return Err(EngineError::Authentication("missing bearer token".into()));
        }
        let subscription_id = Uuid::new_v4();
        let mut subscribers = self.subscribers.write().unwrap();
        subscribers.entry(account_id).or_default().push(subscription_id);
        Ok(subscription_id)
    }

    fn unsubscribe(&self, account_id: Uuid, subscription_id: Uuid) {
        let mut subscribers = self.subscribers.write().unwrap();
        if let Some(ids) = subscribers.get_mut(&account_id) {
            ids.retain(|id| *id != subscription_id);
            if ids.is_empty() {
                subscribers.remove(&account_id);
            }
        }
    }

    fn is_online(&self, account_id: Uuid) -> bool {
        self.subscribers
            .read()
            .unwrap()
            .get(&account_id)
            .map(|ids| !ids.is_empty())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loan_engine_api::domain::{Account, AccountRole};
    use loan_engine_db::MemoryStore;

    fn seed_borrower(store: &MemoryStore) -> Uuid {
        let now = Utc::now();
        let id = Uuid::new_v4();
        store.seed_account(Account {
            id,
            email: HeaplessString::try_from("borrower@example.com").unwrap(),
            credential_hash: HeaplessString::try_from("hash").unwrap(),
            role: AccountRole::Borrower,
            active: true,
            encrypted_national_id: None,
            credit_score: None,
            version: 0,
            created_at: now,
            updated_at: now,
        });
        id
    }

    #[tokio::test]
    async fn online_subscriber_receives_live_push() {
        let memory = MemoryStore::new();
        let account_id = seed_borrower(&memory);
        let store: Arc<dyn Store> = Arc::new(memory);
        let hub = NotificationHubImpl::new(store);
        let mut rx = hub.listen();
        hub.subscribe(account_id, "token").await.unwrap();

        hub.notify(account_id, NotificationKind::LoanApproved, "Approved", "Your loan was approved", None)
            .await
            .unwrap();

        let pushed = rx.try_recv().expect("live push expected for online subscriber");
        assert_eq!(pushed.account_id, account_id);
    }

    #[tokio::test]
    async fn offline_subscriber_gets_no_push_but_notification_persists() {
        let memory = MemoryStore::new();
        let account_id = seed_borrower(&memory);
        let store: Arc<dyn Store> = Arc::new(memory);
        let hub = NotificationHubImpl::new(store.clone());
        let mut rx = hub.listen();

        let notification = hub
            .notify(account_id, NotificationKind::LoanRejected, "Rejected", "Your loan was rejected", None)
            .await
            .unwrap();

        assert!(rx.try_recv().is_err());
        let stored = store.notifications().list_by_account(account_id, 10, 0).await.unwrap();
        assert!(stored.iter().any(|n| n.id == notification.id));
    }
}
