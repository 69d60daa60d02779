//! # Mintpass Web
//!
//! Thin axum REST layer over the mintpass core: request validation as a
//! pure pipeline, an authenticated-wallet extractor, lifecycle and claim
//! handlers, and the server binary that wires configuration, store,
//! gateway, orchestrator, and the background sweeper together.

pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod metadata;
pub mod routes;
pub mod state;
pub mod validate;

pub use config::Config;
pub use error::AppError;
pub use routes::build_router;
pub use state::AppState;
