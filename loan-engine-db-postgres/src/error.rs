use loan_engine_api::error::EngineError;

/// Maps a driver-level failure onto the engine's taxonomy (spec §7). A
/// unique-constraint violation becomes `Conflict`; anything else that isn't
/// a recognized not-found is `Internal` — the engine never leaks a raw
/// `sqlx::Error` past this boundary.
pub fn map_sqlx_error(err: sqlx::Error) -> EngineError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return EngineError::Conflict(db_err.message().to_string());
        }
    }
    EngineError::Internal(err.to_string())
}
