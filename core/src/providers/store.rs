//! Persistent store boundary.
//!
//! The store is a relational cache of ledger truth plus the system's own
//! bookkeeping. Implementations must provide the uniqueness constraints the
//! orchestrator leans on (one claim per token, one accounting row per
//! event, one attendee row per wallet and event) and row-locked
//! read-modify-write semantics for status transitions.

use crate::error::StoreError;
use crate::types::{
    Accounting, Claim, Drops, Event, EventId, EventStatus, NetworkId, Nft, TxHash, User,
    WalletAddress,
};
use async_trait::async_trait;
use uuid::Uuid;

/// Relational store for users, events, accounting, NFTs, and claims.
#[async_trait]
pub trait Store: Send + Sync {
    // ═══════════════════════════════════════════════════════════════════════
    // Users
    // ═══════════════════════════════════════════════════════════════════════

    /// Insert a user row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] if the wallet is already known.
    async fn insert_user(&self, user: &User) -> Result<(), StoreError>;

    /// Look up a user by wallet.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    async fn find_user(&self, wallet: &WalletAddress) -> Result<Option<User>, StoreError>;

    /// Replace a user row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the wallet is unknown.
    async fn update_user(&self, user: &User) -> Result<(), StoreError>;

    // ═══════════════════════════════════════════════════════════════════════
    // Events & accounting
    // ═══════════════════════════════════════════════════════════════════════

    /// Insert an event and its accounting row atomically.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] if the event id is already taken.
    async fn insert_event(&self, event: &Event, accounting: &Accounting)
    -> Result<(), StoreError>;

    /// Look up an event by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    async fn find_event(&self, id: EventId) -> Result<Option<Event>, StoreError>;

    /// List events, newest first, optionally filtered by status.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    async fn list_events(
        &self,
        status: Option<EventStatus>,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Event>, StoreError>;

    /// Highest event id ever assigned, if any.
    ///
    /// Seeds the orchestrator's id counter at startup.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    async fn max_event_id(&self) -> Result<Option<EventId>, StoreError>;

    /// Record the metadata URI after a successful mint.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the event is unknown.
    async fn set_event_uri(&self, id: EventId, uri: &str) -> Result<(), StoreError>;

    /// Move an event to `next` iff its current status is in `expected`,
    /// under a row lock.
    ///
    /// Returns the updated event, or `None` if the guard did not match;
    /// the caller decides whether that is a domain error. This
    /// compare-and-set is the only synchronization between concurrent
    /// status changes.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the event is unknown.
    async fn transition_status(
        &self,
        id: EventId,
        expected: &[EventStatus],
        next: EventStatus,
    ) -> Result<Option<Event>, StoreError>;

    /// Total token count across a wallet's open (draft/paid/active) events.
    ///
    /// Backs the owner slots-quota check.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    async fn open_token_count(&self, owner: &WalletAddress) -> Result<u64, StoreError>;

    /// Accounting row for an event.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    async fn accounting_for(&self, id: EventId) -> Result<Option<Accounting>, StoreError>;

    /// Record the verified deposit payment hash.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the accounting row is missing.
    async fn record_deposit(&self, id: EventId, tx: &TxHash) -> Result<(), StoreError>;

    /// Record the refund value and transaction hash.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the accounting row is missing.
    async fn record_refund(
        &self,
        id: EventId,
        value: Drops,
        tx: &TxHash,
    ) -> Result<(), StoreError>;

    /// Atomically add a network fee to the event's running total.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the accounting row is missing.
    async fn add_tx_fee(&self, id: EventId, fee: Drops) -> Result<(), StoreError>;

    // ═══════════════════════════════════════════════════════════════════════
    // NFTs
    // ═══════════════════════════════════════════════════════════════════════

    /// Insert an NFT row if the token is not yet known (idempotent).
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    async fn upsert_nft(&self, nft: &Nft) -> Result<(), StoreError>;

    /// All cached NFT rows for an event, in stable iteration order.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    async fn nfts_for_event(&self, id: EventId) -> Result<Vec<Nft>, StoreError>;

    // ═══════════════════════════════════════════════════════════════════════
    // Claims
    // ═══════════════════════════════════════════════════════════════════════

    /// Insert a claim.
    ///
    /// The unique token constraint here is the linearization point for
    /// concurrent joins: the second claim on a token must fail, never
    /// overwrite.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] if the token already has a claim.
    async fn insert_claim(&self, claim: &Claim) -> Result<(), StoreError>;

    /// A wallet's claim on an event, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    async fn claim_for(
        &self,
        wallet: &WalletAddress,
        event: EventId,
    ) -> Result<Option<Claim>, StoreError>;

    /// All claims for an event.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    async fn claims_for_event(&self, event: EventId) -> Result<Vec<Claim>, StoreError>;

    /// Record the sell-offer index on a claim.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the claim is unknown.
    async fn set_claim_offer(
        &self,
        id: Uuid,
        offer: &crate::types::OfferIndex,
    ) -> Result<(), StoreError>;

    /// Flip a claim to claimed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the claim is unknown.
    async fn mark_claimed(&self, id: Uuid) -> Result<(), StoreError>;

    /// Claims with an offer recorded but not yet accepted, paired with
    /// their event's network. Feeds the background sweeper.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    async fn pending_claims(&self) -> Result<Vec<(Claim, NetworkId)>, StoreError>;

    // ═══════════════════════════════════════════════════════════════════════
    // Attendees
    // ═══════════════════════════════════════════════════════════════════════

    /// Add a wallet to an event's attendee list.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] if the wallet already joined.
    async fn add_attendee(&self, event: EventId, wallet: &WalletAddress)
    -> Result<(), StoreError>;

    /// Remove a wallet from an event's attendee list.
    ///
    /// Used to roll back a join whose claim insert lost the token race.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    async fn remove_attendee(
        &self,
        event: EventId,
        wallet: &WalletAddress,
    ) -> Result<(), StoreError>;

    /// Number of attendees on an event.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    async fn count_attendees(&self, event: EventId) -> Result<u32, StoreError>;

    /// Whether a wallet already joined an event.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    async fn is_attendee(
        &self,
        event: EventId,
        wallet: &WalletAddress,
    ) -> Result<bool, StoreError>;

    /// All attendee wallets of an event.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    async fn attendees(&self, event: EventId) -> Result<Vec<WalletAddress>, StoreError>;
}
