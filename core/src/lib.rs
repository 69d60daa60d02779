//! # Mintpass Core
//!
//! Event lifecycle core for the mintpass proof-of-attendance service: an
//! organizer creates an event, the system reserves ledger resources and
//! batch-mints a fixed token supply, attendees claim one token each via
//! sell offers, and the organizer closes or cancels the event with deposit
//! accounting settled on-chain.
//!
//! The crate coordinates a relational store (events, users, claims, cached
//! NFT rows) with an external, eventually-finalizing ledger (submit a
//! transaction, poll for validation, reconcile local state) without
//! double-spending reserved resources or double-counting fees.
//!
//! ## Layout
//!
//! - [`types`]: identifiers, integer amounts, entities
//! - [`error`]: the domain/internal error taxonomy
//! - [`providers`]: boundaries: store, ledger client/gateway, metadata
//!   uploader, clock
//! - [`accounting`]: deposit computation, payment verification, refunds
//! - [`submission`]: reliable submission (submit + finality polling)
//! - [`tickets`]: ticket reservation
//! - [`events`]: the lifecycle orchestrator ([`EventService`])
//! - [`sweeper`]: background claim reconciliation
//! - [`mocks`]: in-memory providers for tests and development
//!
//! Concurrency model: single-process cooperative async. The store's
//! row-level guards are the only cross-request synchronization; concurrent
//! orchestrator calls against the same network are not internally
//! serialized.

pub mod accounting;
mod claims;
pub mod error;
pub mod events;
pub mod mocks;
pub mod providers;
pub mod submission;
pub mod sweeper;
pub mod tickets;
pub mod types;

pub use error::{Error, LedgerError, MetadataError, Result, StoreError};
pub use events::EventService;
pub use sweeper::Sweeper;
