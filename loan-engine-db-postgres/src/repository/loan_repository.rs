use async_trait::async_trait;
use loan_engine_api::domain::Loan;
use loan_engine_api::error::{EngineError, EngineResult};
use loan_engine_db::LoanRepository;
use sqlx::Row;
use uuid::Uuid;

use crate::error::map_sqlx_error;
use crate::store::PgStore;
use crate::utils::{get_heapless_string, get_json, get_optional_json, loan_status_from_str, loan_status_to_str, TryFromRow};

impl TryFromRow for Loan {
    fn try_from_row(row: &sqlx::postgres::PgRow) -> Result<Self, EngineError> {
        let decode = |e: sqlx::Error| EngineError::Internal(e.to_string());
        Ok(Loan {
            id: row.try_get("id").map_err(decode)?,
            application_number: get_heapless_string(row, "application_number")?,
            borrower_id: row.try_get("borrower_id").map_err(decode)?,
            purpose: get_heapless_string(row, "purpose")?,
            annual_interest_rate: row.try_get("annual_interest_rate").map_err(decode)?,
            requested_amount: row.try_get("requested_amount").map_err(decode)?,
            tenor_months: row.try_get::<i32, _>("tenor_months").map_err(decode)? as u32,
            status: loan_status_from_str(row.try_get::<String, _>("status").map_err(decode)?.as_str())?,
            principal: row.try_get("principal").map_err(decode)?,
            total_interest: row.try_get("total_interest").map_err(decode)?,
            total_repayable: row.try_get("total_repayable").map_err(decode)?,
            monthly_payment: row.try_get("monthly_payment").map_err(decode)?,
            total_repaid: row.try_get("total_repaid").map_err(decode)?,
            outstanding_balance: row.try_get("outstanding_balance").map_err(decode)?,
            approval: get_optional_json(row, "approval")?,
            rejection: get_optional_json(row, "rejection")?,
            disbursement: get_optional_json(row, "disbursement")?,
            status_history: get_json(row, "status_history")?,
            version: row.try_get("version").map_err(decode)?,
            created_at: row.try_get("created_at").map_err(decode)?,
            updated_at: row.try_get("updated_at").map_err(decode)?,
        })
    }
}

fn disbursement_reference(loan: &Loan) -> Option<&str> {
    loan.disbursement.as_ref().map(|d| d.reference.as_str())
}

#[async_trait]
impl LoanRepository for PgStore {
    async fn insert(&self, loan: Loan) -> EngineResult<Loan> {
        let status = loan_status_to_str(loan.status);
        let row = sqlx::query(
            r#"
            INSERT INTO loans (
                id, application_number, borrower_id, purpose, annual_interest_rate,
                requested_amount, tenor_months, status, principal, total_interest,
                total_repayable, monthly_payment, total_repaid, outstanding_balance,
                approval, rejection, disbursement, disbursement_reference,
                status_history, version, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                      $15, $16, $17, $18, $19, $20, $21, $22)
            RETURNING *
            "#,
        )
        .bind(loan.id)
        .bind(loan.application_number.as_str())
        .bind(loan.borrower_id)
        .bind(loan.purpose.as_str())
        .bind(loan.annual_interest_rate)
        .bind(loan.requested_amount)
        .bind(loan.tenor_months as i32)
        .bind(status)
        .bind(loan.principal)
        .bind(loan.total_interest)
        .bind(loan.total_repayable)
        .bind(loan.monthly_payment)
        .bind(loan.total_repaid)
        .bind(loan.outstanding_balance)
        .bind(serde_json::to_value(&loan.approval).ok())
        .bind(serde_json::to_value(&loan.rejection).ok())
        .bind(serde_json::to_value(&loan.disbursement).ok())
        .bind(disbursement_reference(&loan))
        .bind(serde_json::to_value(&loan.status_history).unwrap_or(serde_json::Value::Array(vec![])))
        .bind(loan.version)
        .bind(loan.created_at)
        .bind(loan.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Loan::try_from_row(&row)
    }

    async fn find_by_id(&self, loan_id: Uuid) -> EngineResult<Option<Loan>> {
        let row = sqlx::query("SELECT * FROM loans WHERE id = $1")
            .bind(loan_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        row.as_ref().map(Loan::try_from_row).transpose()
    }

    async fn find_by_application_number(&self, application_number: &str) -> EngineResult<Option<Loan>> {
        let row = sqlx::query("SELECT * FROM loans WHERE application_number = $1")
            .bind(application_number)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        row.as_ref().map(Loan::try_from_row).transpose()
    }

    async fn find_active_for_borrower(&self, borrower_id: Uuid) -> EngineResult<Option<Loan>> {
        let row = sqlx::query(
            "SELECT * FROM loans WHERE borrower_id = $1 \
             AND status IN ('pending', 'under_review', 'approved', 'active') LIMIT 1",
        )
        .bind(borrower_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        row.as_ref().map(Loan::try_from_row).transpose()
    }

    async fn list_by_borrower(&self, borrower_id: Uuid) -> EngineResult<Vec<Loan>> {
        let rows = sqlx::query("SELECT * FROM loans WHERE borrower_id = $1 ORDER BY created_at DESC")
            .bind(borrower_id)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        rows.iter().map(Loan::try_from_row).collect()
    }

    async fn update_cas(&self, loan: Loan) -> EngineResult<Loan> {
        let status = loan_status_to_str(loan.status);
        let updated = sqlx::query(
            r#"
            UPDATE loans SET
                status = $1, principal = $2, total_interest = $3, total_repayable = $4,
                monthly_payment = $5, total_repaid = $6, outstanding_balance = $7,
                approval = $8, rejection = $9, disbursement = $10,
                disbursement_reference = $11, status_history = $12,
                version = version + 1, updated_at = now()
            WHERE id = $13 AND version = $14
            RETURNING *
            "#,
        )
        .bind(status)
        .bind(loan.principal)
        .bind(loan.total_interest)
        .bind(loan.total_repayable)
        .bind(loan.monthly_payment)
        .bind(loan.total_repaid)
        .bind(loan.outstanding_balance)
        .bind(serde_json::to_value(&loan.approval).ok())
        .bind(serde_json::to_value(&loan.rejection).ok())
        .bind(serde_json::to_value(&loan.disbursement).ok())
        .bind(disbursement_reference(&loan))
        .bind(serde_json::to_value(&loan.status_history).unwrap_or(serde_json::Value::Array(vec![])))
        .bind(loan.id)
        .bind(loan.version)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        match updated {
            Some(row) => Loan::try_from_row(&row),
            None => Err(self.cas_conflict("Loan", loan.id, loan.version, "loans").await),
        }
    }
}
