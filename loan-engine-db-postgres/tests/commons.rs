use loan_engine_db_postgres::PgStore;

/// Connects to `DATABASE_URL` and runs migrations, or returns `None` so
/// callers can skip cleanly on a machine without Postgres available,
/// following the `dinahmaccodes-InheritX` `TestContext::from_env` convention.
#[allow(dead_code)]
pub async fn test_store() -> Option<PgStore> {
    let database_url = std::env::var("DATABASE_URL").ok()?;
    let store = PgStore::connect(&database_url).await.expect("connect to DATABASE_URL");
    store.migrate().await.expect("run migrations");
    Some(store)
}
