use async_trait::async_trait;
use loan_engine_api::domain::AuditEntry;
use loan_engine_api::error::{EngineError, EngineResult};
use loan_engine_db::AuditLogRepository;
use sqlx::Row;
use uuid::Uuid;

use crate::error::map_sqlx_error;
use crate::store::PgStore;
use crate::utils::{get_heapless_string, get_optional_heapless_string, get_optional_json, TryFromRow};

impl TryFromRow for AuditEntry {
    fn try_from_row(row: &sqlx::postgres::PgRow) -> Result<Self, EngineError> {
        let decode = |e: sqlx::Error| EngineError::Internal(e.to_string());
        Ok(AuditEntry {
            id: row.try_get("id").map_err(decode)?,
            entity_type: get_heapless_string(row, "entity_type")?,
            entity_id: row.try_get("entity_id").map_err(decode)?,
            action: get_heapless_string(row, "action")?,
            actor: row.try_get("actor").map_err(decode)?,
            previous_snapshot: get_optional_json(row, "previous_snapshot")?,
            new_snapshot: get_optional_json(row, "new_snapshot")?,
            note: get_optional_heapless_string(row, "note")?,
            created_at: row.try_get("created_at").map_err(decode)?,
        })
    }
}

/// Append-only (§4.1): no `update`/`delete` method exists on this impl,
/// same as the in-memory store.
#[async_trait]
impl AuditLogRepository for PgStore {
    async fn append(&self, entry: AuditEntry) -> EngineResult<AuditEntry> {
        let row = sqlx::query(
            r#"
            INSERT INTO audit_entries (
                id, entity_type, entity_id, action, actor, previous_snapshot,
                new_snapshot, note, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(entry.id)
        .bind(entry.entity_type.as_str())
        .bind(entry.entity_id)
        .bind(entry.action.as_str())
        .bind(entry.actor)
        .bind(&entry.previous_snapshot)
        .bind(&entry.new_snapshot)
        .bind(entry.note.as_ref().map(|v| v.as_str()))
        .bind(entry.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        AuditEntry::try_from_row(&row)
    }

    async fn list_by_entity(&self, entity_type: &str, entity_id: Uuid) -> EngineResult<Vec<AuditEntry>> {
        let rows = sqlx::query(
            "SELECT * FROM audit_entries WHERE entity_type = $1 AND entity_id = $2 ORDER BY created_at ASC",
        )
        .bind(entity_type)
        .bind(entity_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        rows.iter().map(AuditEntry::try_from_row).collect()
    }
}
