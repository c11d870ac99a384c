use async_trait::async_trait;
use loan_engine_api::domain::IdempotencyRecord;
use loan_engine_api::error::{EngineError, EngineResult};
use loan_engine_db::IdempotencyRepository;
use sqlx::Row;

use crate::error::map_sqlx_error;
use crate::store::PgStore;
use crate::utils::{get_heapless_string, get_json, TryFromRow};

impl TryFromRow for IdempotencyRecord {
    fn try_from_row(row: &sqlx::postgres::PgRow) -> Result<Self, EngineError> {
        let decode = |e: sqlx::Error| EngineError::Internal(e.to_string());
        Ok(IdempotencyRecord {
            key: get_heapless_string(row, "key")?,
            endpoint: get_heapless_string(row, "endpoint")?,
            method: get_heapless_string(row, "method")?,
            status_code: row.try_get::<i16, _>("status_code").map_err(decode)? as u16,
            response_body: get_json(row, "response_body")?,
            account_id: row.try_get("account_id").map_err(decode)?,
            created_at: row.try_get("created_at").map_err(decode)?,
            expires_at: row.try_get("expires_at").map_err(decode)?,
        })
    }
}

/// One record per key, enforced by the `idempotency_records.key` primary
/// key (§3). `insert` surfaces the resulting unique-violation as
/// `EngineError::Conflict`, same as `loan_engine_db::MemoryStore`.
#[async_trait]
impl IdempotencyRepository for PgStore {
    async fn find(&self, key: &str) -> EngineResult<Option<IdempotencyRecord>> {
        let row = sqlx::query("SELECT * FROM idempotency_records WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        row.as_ref().map(IdempotencyRecord::try_from_row).transpose()
    }

    async fn insert(&self, record: IdempotencyRecord) -> EngineResult<IdempotencyRecord> {
        let row = sqlx::query(
            r#"
            INSERT INTO idempotency_records (
                key, endpoint, method, status_code, response_body, account_id,
                created_at, expires_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(record.key.as_str())
        .bind(record.endpoint.as_str())
        .bind(record.method.as_str())
        .bind(record.status_code as i16)
        .bind(&record.response_body)
        .bind(record.account_id)
        .bind(record.created_at)
        .bind(record.expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        IdempotencyRecord::try_from_row(&row)
    }
}
