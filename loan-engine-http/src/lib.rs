//! Illustrative HTTP front door (SPEC_FULL §10.6): wires the engine's
//! protocols to the route table of spec §6. Non-authoritative — the
//! library API in `loan-engine-logic` is what every testable property is
//! verified against. This crate's job is request parsing and response
//! shaping only: no credential verification, rate limiting, CORS policy,
//! or encryption, which remain external collaborators per §1.

pub mod app;
pub mod auth;
pub mod envelope;
pub mod routes;
pub mod state;

pub use app::build_router;
pub use state::AppState;
