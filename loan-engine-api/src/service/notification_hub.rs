use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::domain::{Notification, NotificationKind};
use crate::error::EngineResult;

/// Persists-then-pushes notification delivery with subscriber presence
/// tracking (§4.6). The hub MUST persist before pushing so an offline
/// subscriber can retrieve history on reconnect — no message is lost.
#[async_trait]
pub trait NotificationHub: Send + Sync {
    async fn notify(
        &self,
        account_id: Uuid,
        kind: NotificationKind,
        title: &str,
        body: &str,
        data: Option<Value>,
    ) -> EngineResult<Notification>;

    /// Resolve every account with role `operator` and deliver to each.
    async fn notify_operators(
        &self,
        kind: NotificationKind,
        title: &str,
        body: &str,
        data: Option<Value>,
    ) -> EngineResult<Vec<Notification>>;

    /// Register a live subscription for `account_id`, authenticated with the
    /// caller's bearer credential. Returns an opaque subscription id the
    /// caller later passes to `unsubscribe`.
    async fn subscribe(&self, account_id: Uuid, bearer_token: &str) -> EngineResult<Uuid>;

    fn unsubscribe(&self, account_id: Uuid, subscription_id: Uuid);

    fn is_online(&self, account_id: Uuid) -> bool;
}
