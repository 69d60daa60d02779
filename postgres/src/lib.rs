//! # Mintpass Postgres
//!
//! `PostgreSQL` implementation of the core [`Store`] boundary using sqlx:
//! connection pooling, embedded migrations, the uniqueness constraints the
//! orchestrator leans on, and row-locked status transitions.
//!
//! [`Store`]: mintpass_core::providers::Store

mod store;

pub use store::{PgStore, PgStoreConfig};
