use async_trait::async_trait;
use loan_engine_api::domain::Payment;
use loan_engine_api::error::{EngineError, EngineResult};
use loan_engine_db::PaymentRepository;
use sqlx::Row;
use uuid::Uuid;

use crate::error::map_sqlx_error;
use crate::store::PgStore;
use crate::utils::{get_heapless_string, get_optional_heapless_string, get_optional_json, payment_status_from_str, payment_status_to_str, payment_type_from_str, payment_type_to_str, TryFromRow};

impl TryFromRow for Payment {
    fn try_from_row(row: &sqlx::postgres::PgRow) -> Result<Self, EngineError> {
        let decode = |e: sqlx::Error| EngineError::Internal(e.to_string());
        Ok(Payment {
            id: row.try_get("id").map_err(decode)?,
            loan_id: row.try_get("loan_id").map_err(decode)?,
            account_id: row.try_get("account_id").map_err(decode)?,
            idempotency_key: get_heapless_string(row, "idempotency_key")?,
            reference: get_heapless_string(row, "reference")?,
            kind: payment_type_from_str(row.try_get::<String, _>("kind").map_err(decode)?.as_str())?,
            amount: row.try_get("amount").map_err(decode)?,
            status: payment_status_from_str(row.try_get::<String, _>("status").map_err(decode)?.as_str())?,
            failure_reason: get_optional_heapless_string(row, "failure_reason")?,
            provider_reference: get_optional_heapless_string(row, "provider_reference")?,
            reconciled: row.try_get("reconciled").map_err(decode)?,
            reconciled_at: row.try_get("reconciled_at").map_err(decode)?,
            allocation: get_optional_json(row, "allocation")?,
            manual_proof: get_optional_json(row, "manual_proof")?,
            verified_by: row.try_get("verified_by").map_err(decode)?,
            verified_at: row.try_get("verified_at").map_err(decode)?,
            overpayment_refunded: row.try_get("overpayment_refunded").map_err(decode)?,
            refund_source_payment_id: row.try_get("refund_source_payment_id").map_err(decode)?,
            version: row.try_get("version").map_err(decode)?,
            created_at: row.try_get("created_at").map_err(decode)?,
            updated_at: row.try_get("updated_at").map_err(decode)?,
        })
    }
}

#[async_trait]
impl PaymentRepository for PgStore {
    async fn insert(&self, payment: Payment) -> EngineResult<Payment> {
        let row = sqlx::query(
            r#"
            INSERT INTO payments (
                id, loan_id, account_id, idempotency_key, reference, kind, amount,
                status, failure_reason, provider_reference, reconciled, reconciled_at,
                allocation, manual_proof, verified_by, verified_at, overpayment_refunded,
                refund_source_payment_id, version, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15,
                      $16, $17, $18, $19, $20, $21)
            RETURNING *
            "#,
        )
        .bind(payment.id)
        .bind(payment.loan_id)
        .bind(payment.account_id)
        .bind(payment.idempotency_key.as_str())
        .bind(payment.reference.as_str())
        .bind(payment_type_to_str(payment.kind))
        .bind(payment.amount)
        .bind(payment_status_to_str(payment.status))
        .bind(payment.failure_reason.as_ref().map(|v| v.as_str()))
        .bind(payment.provider_reference.as_ref().map(|v| v.as_str()))
        .bind(payment.reconciled)
        .bind(payment.reconciled_at)
        .bind(serde_json::to_value(&payment.allocation).ok())
        .bind(serde_json::to_value(&payment.manual_proof).ok())
        .bind(payment.verified_by)
        .bind(payment.verified_at)
        .bind(payment.overpayment_refunded)
        .bind(payment.refund_source_payment_id)
        .bind(payment.version)
        .bind(payment.created_at)
        .bind(payment.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Payment::try_from_row(&row)
    }

    async fn find_by_id(&self, payment_id: Uuid) -> EngineResult<Option<Payment>> {
        let row = sqlx::query("SELECT * FROM payments WHERE id = $1")
            .bind(payment_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        row.as_ref().map(Payment::try_from_row).transpose()
    }

    async fn find_by_idempotency_key(&self, key: &str) -> EngineResult<Option<Payment>> {
        let row = sqlx::query("SELECT * FROM payments WHERE idempotency_key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        row.as_ref().map(Payment::try_from_row).transpose()
    }

    async fn list_by_loan(&self, loan_id: Uuid) -> EngineResult<Vec<Payment>> {
        let rows = sqlx::query("SELECT * FROM payments WHERE loan_id = $1 ORDER BY created_at ASC")
            .bind(loan_id)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        rows.iter().map(Payment::try_from_row).collect()
    }

    async fn list_by_account(&self, account_id: Uuid) -> EngineResult<Vec<Payment>> {
        let rows = sqlx::query("SELECT * FROM payments WHERE account_id = $1 ORDER BY created_at DESC")
            .bind(account_id)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        rows.iter().map(Payment::try_from_row).collect()
    }

    async fn update_cas(&self, payment: Payment) -> EngineResult<Payment> {
        let updated = sqlx::query(
            r#"
            UPDATE payments SET
                status = $1, failure_reason = $2, provider_reference = $3,
                reconciled = $4, reconciled_at = $5, allocation = $6, manual_proof = $7,
                verified_by = $8, verified_at = $9, overpayment_refunded = $10,
                version = version + 1, updated_at = now()
            WHERE id = $11 AND version = $12
            RETURNING *
            "#,
        )
        .bind(payment_status_to_str(payment.status))
        .bind(payment.failure_reason.as_ref().map(|v| v.as_str()))
        .bind(payment.provider_reference.as_ref().map(|v| v.as_str()))
        .bind(payment.reconciled)
        .bind(payment.reconciled_at)
        .bind(serde_json::to_value(&payment.allocation).ok())
        .bind(serde_json::to_value(&payment.manual_proof).ok())
        .bind(payment.verified_by)
        .bind(payment.verified_at)
        .bind(payment.overpayment_refunded)
        .bind(payment.id)
        .bind(payment.version)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        match updated {
            Some(row) => Payment::try_from_row(&row),
            None => Err(self.cas_conflict("Payment", payment.id, payment.version, "payments").await),
        }
    }
}
