//! `sqlx::PgPool`-backed `Store` implementation (SPEC_FULL §10.1): versioned
//! `UPDATE ... WHERE version = $n RETURNING *`, migrations under
//! `migrations/`, and the unique-constraint-to-`EngineError` mapping the
//! in-memory store (`loan_engine_db::MemoryStore`) enforces in-process.

pub mod error;
pub mod repository;
pub mod store;
pub mod utils;

pub use store::PgStore;
