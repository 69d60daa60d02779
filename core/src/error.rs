//! Error taxonomy for the mintpass core.
//!
//! Business-rule violations are domain errors: they carry a human-readable
//! reason, are never retried, and map to client errors at the API boundary.
//! Everything else (ledger transport, store, metadata upload) propagates as
//! an internal failure.

use crate::types::{Drops, NetworkId, TokenId, TxHash, WalletAddress};
use thiserror::Error;

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error for orchestrator operations.
#[derive(Debug, Error)]
pub enum Error {
    // ═══════════════════════════════════════════════════════════
    // Domain errors (user-facing, 4xx at the API boundary)
    // ═══════════════════════════════════════════════════════════

    /// A business rule was violated (full event, wrong status, …).
    #[error("{0}")]
    Domain(String),

    /// A referenced entity does not exist.
    #[error("{entity} {key} not found")]
    NotFound {
        /// Entity kind, e.g. `"event"`.
        entity: &'static str,
        /// Lookup key that missed.
        key: String,
    },

    /// No configuration exists for the requested network.
    #[error("unsupported ledger network: {0}")]
    UnsupportedNetwork(NetworkId),

    /// Ticket reservation target exceeds the network hard cap.
    #[error("requested {requested} tickets, the network cap is {cap}")]
    TooManyTickets {
        /// Requested ticket count.
        requested: u32,
        /// Network hard cap.
        cap: u32,
    },

    /// The vault cannot cover the reserve for new ticket objects.
    #[error("insufficient vault reserve: {required} drops required, {available} spendable")]
    InsufficientReserve {
        /// Reserve required for the shortfall.
        required: Drops,
        /// Spendable balance above the base reserve.
        available: Drops,
    },

    /// The deposit was already refunded (idempotency guard).
    #[error("deposit refund already processed")]
    RefundAlreadyProcessed,

    // ═══════════════════════════════════════════════════════════
    // Internal errors
    // ═══════════════════════════════════════════════════════════

    /// A validated sell-offer submission left no offer to look up.
    #[error("sell offer for token {0} missing after validated submission")]
    OfferLookup(TokenId),

    /// Local bookkeeping disagrees with ledger truth.
    ///
    /// Should never happen unless the store is out of sync; not recovered.
    #[error("store out of sync with ledger: {0}")]
    OutOfSync(String),

    /// Ledger client failure.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Persistent store failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Metadata upload failure.
    #[error(transparent)]
    Metadata(#[from] MetadataError),
}

impl Error {
    /// Shorthand for a domain error with a reason string.
    #[must_use]
    pub fn domain(reason: impl Into<String>) -> Self {
        Self::Domain(reason.into())
    }

    /// `true` if this error reflects a business-rule violation the caller
    /// can act on, as opposed to an internal failure.
    #[must_use]
    pub const fn is_domain(&self) -> bool {
        matches!(
            self,
            Self::Domain(_)
                | Self::NotFound { .. }
                | Self::UnsupportedNetwork(_)
                | Self::TooManyTickets { .. }
                | Self::InsufficientReserve { .. }
                | Self::RefundAlreadyProcessed
        )
    }
}

/// Errors surfaced by a ledger client.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Transport-level failure talking to the ledger endpoint.
    #[error("ledger connection failed: {0}")]
    Connection(String),

    /// The endpoint answered with an RPC-level error.
    #[error("ledger rpc {method} failed: {message}")]
    Rpc {
        /// RPC method name.
        method: String,
        /// Error message from the endpoint.
        message: String,
    },

    /// The account does not exist on the ledger.
    #[error("account {0} not found on ledger")]
    AccountNotFound(WalletAddress),

    /// Submission was rejected before entering a ledger.
    #[error("transaction rejected on submission: {code}")]
    Submission {
        /// Preliminary engine result code.
        code: String,
    },

    /// The transaction validated with a failure result.
    #[error("transaction {hash} failed with {code}")]
    Failed {
        /// Transaction hash.
        hash: TxHash,
        /// Final result code.
        code: String,
    },

    /// The ledger passed the transaction's expiry sequence without
    /// including it.
    #[error("transaction {hash} expired after ledger {last_ledger_sequence}")]
    Expired {
        /// Transaction hash.
        hash: TxHash,
        /// Expiry ledger sequence that was exceeded.
        last_ledger_sequence: u32,
    },

    /// The optional poll-attempt guard fired before finality.
    #[error("gave up waiting for transaction {hash} after {attempts} polls")]
    Deadline {
        /// Transaction hash.
        hash: TxHash,
        /// Polls performed before giving up.
        attempts: u32,
    },

    /// The endpoint returned a response the client could not interpret.
    #[error("malformed ledger response: {0}")]
    Malformed(String),
}

/// Errors surfaced by the persistent store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying database failure.
    #[error("database error: {0}")]
    Database(String),

    /// A row that must exist is missing.
    #[error("{entity} {key} not found in store")]
    NotFound {
        /// Entity kind.
        entity: &'static str,
        /// Lookup key.
        key: String,
    },

    /// A uniqueness or referential constraint rejected the write.
    #[error("constraint violated: {0}")]
    Conflict(String),
}

/// Errors surfaced by the metadata uploader.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// The upload did not yield a usable resource URI.
    #[error("metadata upload failed: {0}")]
    Upload(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_classification() {
        assert!(Error::domain("event is full").is_domain());
        assert!(Error::RefundAlreadyProcessed.is_domain());
        assert!(
            Error::UnsupportedNetwork(NetworkId::new("nonet")).is_domain()
        );
        assert!(!Error::OutOfSync("claims exceed tokens".into()).is_domain());
        assert!(
            !Error::Ledger(LedgerError::Connection("refused".into())).is_domain()
        );
    }

    #[test]
    fn reason_strings_surface_in_display() {
        let err = Error::domain("wallet already joined this event");
        assert_eq!(err.to_string(), "wallet already joined this event");
    }
}
