use chrono::{DateTime, Utc};
use heapless::String as HeaplessString;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Append-only record of a state-changing action. Never edited after
/// creation — see `AuditLogService::append`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub entity_type: HeaplessString<40>,
    pub entity_id: Uuid,
    pub action: HeaplessString<60>,
    pub actor: Uuid,
    pub previous_snapshot: Option<Value>,
    pub new_snapshot: Option<Value>,
    /// Free-text note for cases where the change has a documented side
    /// effect the snapshots alone don't capture (e.g. the full-refund /
    /// installment drift noted in DESIGN.md).
    pub note: Option<HeaplessString<300>>,
    pub created_at: DateTime<Utc>,
}
