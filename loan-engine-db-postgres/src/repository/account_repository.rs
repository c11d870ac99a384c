use async_trait::async_trait;
use loan_engine_api::domain::{Account, AccountRole};
use loan_engine_api::error::{EngineError, EngineResult};
use loan_engine_db::AccountRepository;
use sqlx::Row;
use uuid::Uuid;

use crate::error::map_sqlx_error;
use crate::store::PgStore;
use crate::utils::{account_role_from_str, account_role_to_str, get_heapless_string, get_optional_heapless_string, TryFromRow};

impl TryFromRow for Account {
    fn try_from_row(row: &sqlx::postgres::PgRow) -> Result<Self, EngineError> {
        Ok(Account {
            id: row.try_get("id").map_err(|e| EngineError::Internal(e.to_string()))?,
            email: get_heapless_string(row, "email")?,
            credential_hash: get_heapless_string(row, "credential_hash")?,
            role: account_role_from_str(row.try_get::<String, _>("role").map_err(|e| EngineError::Internal(e.to_string()))?.as_str())?,
            active: row.try_get("active").map_err(|e| EngineError::Internal(e.to_string()))?,
            encrypted_national_id: get_optional_heapless_string(row, "encrypted_national_id")?,
            credit_score: row.try_get("credit_score").map_err(|e| EngineError::Internal(e.to_string()))?,
            version: row.try_get("version").map_err(|e| EngineError::Internal(e.to_string()))?,
            created_at: row.try_get("created_at").map_err(|e| EngineError::Internal(e.to_string()))?,
            updated_at: row.try_get("updated_at").map_err(|e| EngineError::Internal(e.to_string()))?,
        })
    }
}

#[async_trait]
impl AccountRepository for PgStore {
    async fn find_by_id(&self, account_id: Uuid) -> EngineResult<Option<Account>> {
        let row = sqlx::query("SELECT * FROM accounts WHERE id = $1")
            .bind(account_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        row.as_ref().map(Account::try_from_row).transpose()
    }

    async fn list_operators(&self) -> EngineResult<Vec<Account>> {
        let rows = sqlx::query("SELECT * FROM accounts WHERE role = 'operator' AND active")
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        rows.iter().map(Account::try_from_row).collect()
    }

    async fn update_cas(&self, account: Account) -> EngineResult<Account> {
        let role: &str = account_role_to_str(account.role);
        let updated = sqlx::query(
            r#"
            UPDATE accounts SET
                email = $1, credential_hash = $2, role = $3, active = $4,
                encrypted_national_id = $5, credit_score = $6,
                version = version + 1, updated_at = now()
            WHERE id = $7 AND version = $8
            RETURNING *
            "#,
        )
        .bind(account.email.as_str())
        .bind(account.credential_hash.as_str())
        .bind(role)
        .bind(account.active)
        .bind(account.encrypted_national_id.as_ref().map(|v| v.as_str()))
        .bind(account.credit_score)
        .bind(account.id)
        .bind(account.version)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        match updated {
            Some(row) => Account::try_from_row(&row),
            None => Err(self.cas_conflict("Account", account.id, account.version, "accounts").await),
        }
    }
}
