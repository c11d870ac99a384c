use async_trait::async_trait;
use chrono::{DateTime, Utc};
use loan_engine_api::domain::{Notification, NotificationStatus};
use loan_engine_api::error::{EngineError, EngineResult};
use loan_engine_db::NotificationRepository;
use sqlx::Row;
use uuid::Uuid;

use crate::error::map_sqlx_error;
use crate::store::PgStore;
use crate::utils::{get_heapless_string, notification_kind_from_str, notification_kind_to_str, notification_status_from_str, TryFromRow};

impl TryFromRow for Notification {
    fn try_from_row(row: &sqlx::postgres::PgRow) -> Result<Self, EngineError> {
        let decode = |e: sqlx::Error| EngineError::Internal(e.to_string());
        Ok(Notification {
            id: row.try_get("id").map_err(decode)?,
            account_id: row.try_get("account_id").map_err(decode)?,
            kind: notification_kind_from_str(row.try_get::<String, _>("kind").map_err(decode)?.as_str())?,
            title: get_heapless_string(row, "title")?,
            body: get_heapless_string(row, "body")?,
            data: row.try_get("data").map_err(decode)?,
            status: notification_status_from_str(row.try_get::<String, _>("status").map_err(decode)?.as_str())?,
            sent_at: row.try_get("sent_at").map_err(decode)?,
            read_at: row.try_get("read_at").map_err(decode)?,
            created_at: row.try_get("created_at").map_err(decode)?,
        })
    }
}

#[async_trait]
impl NotificationRepository for PgStore {
    async fn insert(&self, notification: Notification) -> EngineResult<Notification> {
        let row = sqlx::query(
            r#"
            INSERT INTO notifications (
                id, account_id, kind, title, body, data, status, sent_at, read_at, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(notification.id)
        .bind(notification.account_id)
        .bind(notification_kind_to_str(notification.kind))
        .bind(notification.title.as_str())
        .bind(notification.body.as_str())
        .bind(&notification.data)
        .bind(match notification.status {
            NotificationStatus::Pending => "pending",
            NotificationStatus::Sent => "sent",
            NotificationStatus::Failed => "failed",
        })
        .bind(notification.sent_at)
        .bind(notification.read_at)
        .bind(notification.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Notification::try_from_row(&row)
    }

    async fn find_by_id(&self, id: Uuid) -> EngineResult<Option<Notification>> {
        let row = sqlx::query("SELECT * FROM notifications WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        row.as_ref().map(Notification::try_from_row).transpose()
    }

    async fn list_by_account(&self, account_id: Uuid, limit: usize, offset: usize) -> EngineResult<Vec<Notification>> {
        let rows = sqlx::query(
            "SELECT * FROM notifications WHERE account_id = $1 \
             ORDER BY created_at DESC LIMIT $2 OFFSET $3",
        )
        .bind(account_id)
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        rows.iter().map(Notification::try_from_row).collect()
    }

    async fn unread_count(&self, account_id: Uuid) -> EngineResult<u64> {
        let row = sqlx::query("SELECT count(*) AS n FROM notifications WHERE account_id = $1 AND read_at IS NULL")
            .bind(account_id)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        let n: i64 = row.try_get("n").map_err(|e| EngineError::Internal(e.to_string()))?;
        Ok(n as u64)
    }

    async fn mark_read(&self, id: Uuid, read_at: DateTime<Utc>) -> EngineResult<Notification> {
        let row = sqlx::query("UPDATE notifications SET read_at = $1 WHERE id = $2 RETURNING *")
            .bind(read_at)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?
            .ok_or_else(|| EngineError::NotFound(format!("notification {id}")))?;
        Notification::try_from_row(&row)
    }

    async fn mark_all_read(&self, account_id: Uuid, read_at: DateTime<Utc>) -> EngineResult<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET read_at = $1 WHERE account_id = $2 AND read_at IS NULL",
        )
        .bind(read_at)
        .bind(account_id)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(result.rows_affected())
    }
}
