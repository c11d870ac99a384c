use loan_engine_api::error::EngineError;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::error::map_sqlx_error;

/// Bundles one `sqlx::PgPool` behind the same `Store` contract
/// `loan_engine_db::MemoryStore` implements in-process (§2, §5: "a single
/// logical data store with compare-and-set semantics"). Every
/// `*Repository` impl lives in `crate::repository` and is implemented
/// directly on this type, mirroring the sibling in-memory store's shape.
#[derive(Clone)]
pub struct PgStore {
    pub(crate) pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    /// Exposes the underlying pool for callers (tests, maintenance scripts)
    /// that need to seed or inspect rows the repository traits don't cover.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// A CAS `UPDATE ... RETURNING *` that matched zero rows is ambiguous
    /// between "no such row" and "stale version" (§4.1). Disambiguate with
    /// a follow-up read, the same two-step diagnosis
    /// `DisbursementProtocol::disburse` performs at the domain layer when a
    /// reservation's precondition fails.
    pub(crate) async fn cas_conflict(
        &self,
        entity: &str,
        id: Uuid,
        expected_version: i64,
        table: &str,
    ) -> EngineError {
        let current = sqlx::query(&format!("SELECT version FROM {table} WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await;
        match current {
            Ok(Some(row)) => {
                let actual_version: i64 = row.try_get("version").unwrap_or(-1);
                EngineError::Concurrency {
                    entity: entity.to_string(),
                    id,
                    expected_version,
                    actual_version,
                }
            }
            Ok(None) => EngineError::NotFound(format!("{entity} {id}")),
            Err(err) => map_sqlx_error(err),
        }
    }
}
