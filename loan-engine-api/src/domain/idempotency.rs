use chrono::{DateTime, Utc};
use heapless::String as HeaplessString;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Transport-level idempotency record — replays the verbatim response for a
/// caller-supplied `Idempotency-Key` until `expires_at`. This is the outer
/// of the two idempotency layers described in §9: it nests around whatever
/// a protocol's own `Payment.idempotency_key` provides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdempotencyRecord {
    pub key: HeaplessString<128>,
    pub endpoint: HeaplessString<120>,
    pub method: HeaplessString<10>,
    pub status_code: u16,
    pub response_body: Value,
    pub account_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl IdempotencyRecord {
    pub fn default_ttl() -> chrono::Duration {
        chrono::Duration::hours(24)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
