use chrono::Utc;
use heapless::String as HeaplessString;
use loan_engine_api::domain::AuditEntry;
use loan_engine_api::error::EngineResult;
use loan_engine_db::Store;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

/// Snapshot a value to JSON for an `AuditEntry`. Falls back to `Value::Null`
/// rather than failing the whole operation over a serialization hiccup —
/// the audit trail is secondary to the state change it's recording.
fn snapshot<T: Serialize>(value: &T) -> Option<Value> {
    serde_json::to_value(value).ok()
}

/// Append one `AuditEntry` for a state-changing action (§4.1, §8: "exactly
/// one AuditEntry with matching previous/new snapshots").
#[allow(clippy::too_many_arguments)]
pub async fn record<P: Serialize, N: Serialize>(
    store: &dyn Store,
    entity_type: &str,
    entity_id: Uuid,
    action: &str,
    actor: Uuid,
    previous: Option<&P>,
    new: Option<&N>,
    note: Option<&str>,
) -> EngineResult<AuditEntry> {
    let entry = AuditEntry {
        id: Uuid::new_v4(),
        entity_type: HeaplessString::try_from(entity_type)
            .unwrap_or_else(|_| HeaplessString::try_from("entity").unwrap()),
        entity_id,
        action: HeaplessString::try_from(action)
            .unwrap_or_else(|_| HeaplessString::try_from("action").unwrap()),
        actor,
        previous_snapshot: previous.and_then(snapshot),
        new_snapshot: new.and_then(snapshot),
        note: note.and_then(|n| HeaplessString::try_from(n).ok()),
        created_at: Utc::now(),
    };
    store.audit_log().append(entry).await
}
