use std::sync::Arc;
use std::time::Duration;

use loan_engine_db::Store;
use loan_engine_db_postgres::PgStore;
use loan_engine_http::state::AppState;
use loan_engine_logic::services::{
    Coordinator, DeterministicCreditScorer, DisbursementProtocolImpl, HttpPaymentProvider, NotificationHubImpl,
    RefundProtocolImpl, RepaymentEngineImpl, LoanStateMachineImpl,
};
use loan_engine_logic::EngineConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = EngineConfig::load()?;
    let store = PgStore::connect(&config.database_url).await?;
    store.migrate().await?;
    let store: Arc<dyn Store> = Arc::new(store);

    let provider = Arc::new(HttpPaymentProvider::new(
        config.payment_provider_url.clone(),
        Duration::from_secs(config.provider_timeout_seconds),
    )?);
    let notifications = Arc::new(NotificationHubImpl::new(store.clone()));

    let state = AppState {
        store: store.clone(),
        coordinator: Arc::new(Coordinator::new(store.clone())),
        loans: Arc::new(LoanStateMachineImpl::new(store.clone())),
        disbursement: Arc::new(DisbursementProtocolImpl::new(store.clone(), provider.clone(), notifications.clone())),
        repayment: Arc::new(RepaymentEngineImpl::new(
            store.clone(),
            provider.clone(),
            notifications.clone(),
            config.cas_retry_limit,
        )),
        refund: Arc::new(RefundProtocolImpl::new(store.clone(), provider, notifications.clone())),
        credit: Arc::new(DeterministicCreditScorer),
        notifications,
        token_signing_secret: Arc::from(config.token_signing_secret.as_str()),
    };

    let router = loan_engine_http::build_router(state);
    let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
    tracing::info!("loan-engine-http listening on 0.0.0.0:8080");
    axum::serve(listener, router).await?;
    Ok(())
}
