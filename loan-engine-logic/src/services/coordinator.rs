use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use heapless::String as HeaplessString;
use loan_engine_api::domain::IdempotencyRecord;
use loan_engine_api::error::{EngineError, EngineResult};
use loan_engine_db::Store;
use moka::future::Cache;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Cache sizing for the in-process idempotency fast path: same
/// `max_capacity`/`time_to_live` shape the teacher uses for its
/// `ProductCatalogClient` HTTP cache, narrowed to the idempotency record's
/// own 24h TTL (`IdempotencyRecord::default_ttl`) so a cached entry never
/// outlives the record it fronts.
const IDEMPOTENCY_CACHE_CAPACITY: u64 = 50_000;
const IDEMPOTENCY_CACHE_TTL: Duration = Duration::from_secs(60 * 60 * 24);

/// The single pattern every mutating operation runs through (§4.7): consult
/// the transport-level idempotency cache before invoking a protocol, and
/// record the outcome in it afterward, so a caller-supplied `Idempotency-Key`
/// nests around whatever idempotency a protocol (e.g. `Payment.idempotencyKey`)
/// provides on its own.
///
/// The cache itself is a `moka::future::Cache` in front of the durable
/// `IdempotencyRepository` (§2's `IdempotencyCache` component, distinct from
/// `Store`): a hit avoids a store round-trip entirely, a miss falls through
/// to the repository and backfills the cache, same two-tier shape as the
/// teacher's `ProductCatalogClient`.
pub struct Coordinator {
    store: Arc<dyn Store>,
    cache: Cache<String, IdempotencyRecord>,
}

#[derive(Serialize, Deserialize)]
enum StoredOutcome<T> {
    Ok(T),
    Err(EngineError),
}

fn status_code_for(kind_success: bool, error: Option<&EngineError>) -> u16 {
    if kind_success {
        return 200;
    }
    match error.map(EngineError::kind).unwrap_or("internal") {
        "validation" => 400,
        "authentication" => 401,
        "authorization" => 403,
        "not_found" => 404,
        "conflict" | "concurrency" | "idempotency_in_flight" | "already_refunded" => 409,
        "invalid_transition" | "active_loan_exists" | "already_disbursed" | "not_owned" | "not_active" => 400,
        "provider_failure" => 502,
        _ => 500,
    }
}

impl Coordinator {
    pub fn new(store: Arc<dyn Store>) -> Self {
        let cache = Cache::builder()
            .max_capacity(IDEMPOTENCY_CACHE_CAPACITY)
            .time_to_live(IDEMPOTENCY_CACHE_TTL)
            .build();
        Self { store, cache }
    }

    async fn lookup(&self, key: &str) -> EngineResult<Option<IdempotencyRecord>> {
        if let Some(record) = self.cache.get(key).await {
            return Ok(Some(record));
        }
        let record = self.store.idempotency().find(key).await?;
        if let Some(record) = &record {
            self.cache.insert(key.to_string(), record.clone()).await;
        }
        Ok(record)
    }

    /// Run `op` under idempotency key `key`. `endpoint`/`method` are recorded
    /// on the `IdempotencyRecord` for diagnostics only; they play no role in
    /// matching (the key alone is the uniqueness constraint, §3).
    pub async fn execute<T, F, Fut>(
        &self,
        key: &str,
        endpoint: &str,
        method: &str,
        account_id: Option<Uuid>,
        op: F,
    ) -> EngineResult<T>
    where
        T: Serialize + DeserializeOwned + Clone,
        F: FnOnce() -> Fut,
        Fut: Future<Output = EngineResult<T>>,
    {
        let now = chrono::Utc::now();
        if let Some(existing) = self.lookup(key).await? {
            if !existing.is_expired(now) {
                let outcome: StoredOutcome<T> = serde_json::from_value(existing.response_body)
                    .map_err(|e| EngineError::Internal(format!("corrupt idempotency record: {e}")))?;
                return match outcome {
                    StoredOutcome::Ok(value) => Ok(value),
                    StoredOutcome::Err(error) => Err(error),
                };
            }
            self.cache.invalidate(key).await;
        }

        let result = op().await;

        let (outcome, status_code) = match &result {
            Ok(value) => (StoredOutcome::Ok(value.clone()), status_code_for(true, None)),
            Err(error) => (StoredOutcome::Err(error.clone()), status_code_for(false, Some(error))),
        };
        let response_body = serde_json::to_value(&outcome)
            .map_err(|e| EngineError::Internal(format!("failed to serialize idempotency record: {e}")))?;

        let record = IdempotencyRecord {
            key: HeaplessString::try_from(key)
                .map_err(|_| EngineError::Validation {
                    field: "idempotency_key".into(),
                    message: "too long".into(),
                })?,
            endpoint: HeaplessString::try_from(endpoint).unwrap_or_default(),
            method: HeaplessString::try_from(method).unwrap_or_default(),
            status_code,
            response_body,
            account_id,
            created_at: now,
            expires_at: now + IdempotencyRecord::default_ttl(),
        };
        // A losing race on `insert` means a concurrent caller already recorded
        // the outcome; that's fine, the result we computed here is still
        // correct for the caller that triggered it.
        if self.store.idempotency().insert(record.clone()).await.is_ok() {
            self.cache.insert(key.to_string(), record).await;
        }

        result
    }
}
