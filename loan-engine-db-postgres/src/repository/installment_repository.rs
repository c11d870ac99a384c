use async_trait::async_trait;
use loan_engine_api::domain::Installment;
use loan_engine_api::error::{EngineError, EngineResult};
use loan_engine_db::InstallmentRepository;
use sqlx::Row;
use uuid::Uuid;

use crate::error::map_sqlx_error;
use crate::store::PgStore;
use crate::utils::{installment_status_from_str, installment_status_to_str, TryFromRow};

impl TryFromRow for Installment {
    fn try_from_row(row: &sqlx::postgres::PgRow) -> Result<Self, EngineError> {
        let decode = |e: sqlx::Error| EngineError::Internal(e.to_string());
        Ok(Installment {
            id: row.try_get("id").map_err(decode)?,
            loan_id: row.try_get("loan_id").map_err(decode)?,
            installment_number: row.try_get::<i32, _>("installment_number").map_err(decode)? as u32,
            due_date: row.try_get("due_date").map_err(decode)?,
            principal_share: row.try_get("principal_share").map_err(decode)?,
            interest_share: row.try_get("interest_share").map_err(decode)?,
            total_due: row.try_get("total_due").map_err(decode)?,
            paid_amount: row.try_get("paid_amount").map_err(decode)?,
            status: installment_status_from_str(row.try_get::<String, _>("status").map_err(decode)?.as_str())?,
            paid_at: row.try_get("paid_at").map_err(decode)?,
            version: row.try_get("version").map_err(decode)?,
        })
    }
}

#[async_trait]
impl InstallmentRepository for PgStore {
    async fn insert_schedule(&self, installments: Vec<Installment>) -> EngineResult<Vec<Installment>> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        let mut inserted = Vec::with_capacity(installments.len());
        for installment in installments {
            let row = sqlx::query(
                r#"
                INSERT INTO installments (
                    id, loan_id, installment_number, due_date, principal_share,
                    interest_share, total_due, paid_amount, status, paid_at, version
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                RETURNING *
                "#,
            )
            .bind(installment.id)
            .bind(installment.loan_id)
            .bind(installment.installment_number as i32)
            .bind(installment.due_date)
            .bind(installment.principal_share)
            .bind(installment.interest_share)
            .bind(installment.total_due)
            .bind(installment.paid_amount)
            .bind(installment_status_to_str(installment.status))
            .bind(installment.paid_at)
            .bind(installment.version)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
            inserted.push(Installment::try_from_row(&row)?);
        }
        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(inserted)
    }

    async fn find_by_loan(&self, loan_id: Uuid) -> EngineResult<Vec<Installment>> {
        let rows = sqlx::query("SELECT * FROM installments WHERE loan_id = $1 ORDER BY installment_number ASC")
            .bind(loan_id)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        rows.iter().map(Installment::try_from_row).collect()
    }

    async fn find_outstanding_by_loan(&self, loan_id: Uuid) -> EngineResult<Vec<Installment>> {
        let rows = sqlx::query(
            "SELECT * FROM installments WHERE loan_id = $1 \
             AND status IN ('pending', 'partial', 'overdue') ORDER BY installment_number ASC",
        )
        .bind(loan_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        rows.iter().map(Installment::try_from_row).collect()
    }

    async fn update_cas(&self, installment: Installment) -> EngineResult<Installment> {
        let updated = sqlx::query(
            r#"
            UPDATE installments SET
                paid_amount = $1, status = $2, paid_at = $3, version = version + 1
            WHERE loan_id = $4 AND installment_number = $5 AND version = $6
            RETURNING *
            "#,
        )
        .bind(installment.paid_amount)
        .bind(installment_status_to_str(installment.status))
        .bind(installment.paid_at)
        .bind(installment.loan_id)
        .bind(installment.installment_number as i32)
        .bind(installment.version)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        match updated {
            Some(row) => Installment::try_from_row(&row),
            None => {
                let current = sqlx::query("SELECT version FROM installments WHERE loan_id = $1 AND installment_number = $2")
                    .bind(installment.loan_id)
                    .bind(installment.installment_number as i32)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;
                match current {
                    Some(row) => {
                        let actual_version: i64 = row.try_get("version").unwrap_or(-1);
                        Err(EngineError::Concurrency {
                            entity: "Installment".to_string(),
                            id: installment.id,
                            expected_version: installment.version,
                            actual_version,
                        })
                    }
                    None => Err(EngineError::NotFound(format!(
                        "installment {} for loan {}",
                        installment.installment_number, installment.loan_id
                    ))),
                }
            }
        }
    }
}
