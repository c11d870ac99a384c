use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use loan_engine_api::domain::BankDestination;
use loan_engine_api::error::{EngineError, EngineResult};
use loan_engine_api::service::{PaymentProvider, ProviderResult};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
struct TransferRequest<'a> {
    amount: Decimal,
    account_number: &'a str,
    bank_code: &'a str,
    narration: &'a str,
    reference: &'a str,
}

#[derive(Debug, Deserialize)]
struct TransferResponse {
    success: bool,
    provider_reference: Option<String>,
    message: Option<String>,
}

/// `reqwest`-backed call to an external payment provider, with the same
/// bounded-timeout client construction as the teacher's `ProductCatalogClient`
/// (§5: "every provider call has a bounded timeout, implementer chooses,
/// ≤30s").
#[derive(Debug, Clone)]
pub struct HttpPaymentProvider {
    http_client: Client,
    base_url: String,
}

impl HttpPaymentProvider {
    pub fn new(base_url: String, timeout: Duration) -> EngineResult<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EngineError::Internal(e.to_string()))?;
        Ok(Self { http_client, base_url })
    }

    async fn call(&self, path: &str, request: &TransferRequest<'_>) -> EngineResult<ProviderResult> {
        let url = format!("{}/{}", self.base_url, path);
        let started = Instant::now();

        let response = self.http_client.post(&url).json(request).send().await;
        let observed_at = Utc::now();
        let latency = started.elapsed();

        let response = match response {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                return Err(EngineError::ProviderFailure {
                    message: format!("provider timed out after {latency:?}"),
                    retryable: true,
                });
            }
            Err(e) => {
                return Err(EngineError::ProviderFailure {
                    message: e.to_string(),
                    retryable: true,
                });
            }
        };

        let body: TransferResponse = response.json().await.map_err(|e| EngineError::ProviderFailure {
            message: format!("failed to parse provider response: {e}"),
            retryable: false,
        })?;

        Ok(ProviderResult {
            success: body.success,
            provider_reference: body.provider_reference,
            message: body.message,
            latency,
            observed_at,
        })
    }
}

#[async_trait]
impl PaymentProvider for HttpPaymentProvider {
    async fn transfer(
        &self,
        amount: Decimal,
        destination: &BankDestination,
        narration: &str,
        reference: &str,
    ) -> EngineResult<ProviderResult> {
        let request = TransferRequest {
            amount,
            account_number: destination.account_number.as_str(),
            bank_code: destination.bank_code.as_str(),
            narration,
            reference,
        };
        self.call("transfers", &request).await
    }

    async fn debit(
        &self,
        amount: Decimal,
        source: &BankDestination,
        narration: &str,
        reference: &str,
    ) -> EngineResult<ProviderResult> {
        let request = TransferRequest {
            amount,
            account_number: source.account_number.as_str(),
            bank_code: source.bank_code.as_str(),
            narration,
            reference,
        };
        self.call("debits", &request).await
    }
}

/// Deterministic in-process stand-in used by tests, so provider behavior
/// never depends on network availability. Always succeeds unless
/// constructed with `always_fail`, or toggled at runtime with `set_failing`
/// to simulate a provider recovering between a disbursement attempt and its
/// retry.
#[derive(Debug)]
pub struct MockPaymentProvider {
    always_fail: std::sync::atomic::AtomicBool,
}

impl MockPaymentProvider {
    pub fn new() -> Self {
        Self {
            always_fail: std::sync::atomic::AtomicBool::new(false),
        }
    }

    pub fn always_failing() -> Self {
        Self {
            always_fail: std::sync::atomic::AtomicBool::new(true),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.always_fail.store(failing, std::sync::atomic::Ordering::SeqCst);
    }

    fn result(&self, reference: &str) -> ProviderResult {
        let failing = self.always_fail.load(std::sync::atomic::Ordering::SeqCst);
        ProviderResult {
            success: !failing,
            provider_reference: (!failing).then(|| format!("MOCK-{reference}")),
            message: failing.then(|| "mock provider configured to fail".to_string()),
            latency: Duration::from_millis(5),
            observed_at: Utc::now(),
        }
    }
}

impl Default for MockPaymentProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PaymentProvider for MockPaymentProvider {
    async fn transfer(
        &self,
        _amount: Decimal,
        _destination: &BankDestination,
        _narration: &str,
        reference: &str,
    ) -> EngineResult<ProviderResult> {
        Ok(self.result(reference))
    }

    async fn debit(
        &self,
        _amount: Decimal,
        _source: &BankDestination,
        _narration: &str,
        reference: &str,
    ) -> EngineResult<ProviderResult> {
        Ok(self.result(reference))
    }
}
