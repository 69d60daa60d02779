//! Domain types for the mintpass proof-of-attendance system.
//!
//! This module contains the identifier newtypes, the integer money type used
//! for ledger amounts, the event lifecycle status enum, and the entity
//! structs the persistent store round-trips.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Identifier of a configured ledger network (e.g. `mainnet`, `testnet`).
///
/// Normalized to lowercase so config lookup is case-insensitive.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NetworkId(String);

impl NetworkId {
    /// Creates a network id, normalizing to lowercase.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into().to_lowercase())
    }

    /// The normalized identifier string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A ledger account address. Doubles as the user identity.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WalletAddress(String);

impl WalletAddress {
    /// Wraps an address string.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    /// The raw address string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Orchestrator-assigned event identifier.
///
/// Monotonic and never reused; also used verbatim as the on-chain taxon tag
/// that links a minted token back to its event, which is why it must fit in
/// 32 bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventId(u32);

impl EventId {
    /// Creates an event id from its integer value.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// The integer value.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ledger-assigned token identifier (string form, primary key for NFT rows).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenId(String);

impl TokenId {
    /// Wraps a token id string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw token id string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hash of a submitted ledger transaction.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxHash(String);

impl TxHash {
    /// Wraps a transaction hash string.
    #[must_use]
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    /// The raw hash string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A reserved sequence-independent transaction slot on the ledger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TicketSequence(u32);

impl TicketSequence {
    /// Creates a ticket sequence from its number.
    #[must_use]
    pub const fn new(sequence: u32) -> Self {
        Self(sequence)
    }

    /// The sequence number.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for TicketSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ledger index of a sell-offer object.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OfferIndex(String);

impl OfferIndex {
    /// Wraps an offer index string.
    #[must_use]
    pub fn new(index: impl Into<String>) -> Self {
        Self(index.into())
    }

    /// The raw index string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OfferIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Drops (integer ledger amounts; no floating point, string-serialized)
// ============================================================================

/// An amount in the ledger's smallest unit (drops).
///
/// Ledger amounts are integer-denominated; this type never touches floating
/// point and serializes as a decimal string so no precision is lost crossing
/// the store or API boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Drops(u128);

impl Drops {
    /// Zero drops.
    pub const ZERO: Self = Self(0);

    /// Creates an amount from a raw drop count.
    #[must_use]
    pub const fn new(drops: u128) -> Self {
        Self(drops)
    }

    /// The raw drop count.
    #[must_use]
    pub const fn get(self) -> u128 {
        self.0
    }

    /// Saturating addition.
    #[must_use]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    /// Saturating subtraction (floors at zero).
    #[must_use]
    pub const fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    /// Checked subtraction.
    #[must_use]
    pub const fn checked_sub(self, other: Self) -> Option<Self> {
        match self.0.checked_sub(other.0) {
            Some(value) => Some(Self(value)),
            None => None,
        }
    }

    /// Saturating multiplication by a count.
    #[must_use]
    pub const fn times(self, count: u32) -> Self {
        Self(self.0.saturating_mul(count as u128))
    }

    /// `true` if the amount is zero.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Drops {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Drops {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

impl Serialize for Drops {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Drops {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Event lifecycle status
// ============================================================================

/// Lifecycle state of an event.
///
/// Persisted as a numeric code; transitions are monotonic along
/// `Draft → Paid → Active → Canceled | Closed → Refunded` (minting happens
/// between `Paid` and `Active` and is never persisted as its own state).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    /// Created, awaiting deposit payment.
    Draft,
    /// Deposit verified, awaiting mint.
    Paid,
    /// Minted and open for claims.
    Active,
    /// Terminal failure path (organizer cancel or failed mint).
    Canceled,
    /// Organizer-ended; no longer joinable.
    Closed,
    /// Closed with the deposit returned.
    Refunded,
}

impl EventStatus {
    /// Numeric code persisted by the store.
    #[must_use]
    pub const fn code(self) -> i16 {
        match self {
            Self::Draft => 0,
            Self::Paid => 1,
            Self::Active => 2,
            Self::Canceled => 3,
            Self::Closed => 4,
            Self::Refunded => 5,
        }
    }

    /// Parse a persisted status code.
    #[must_use]
    pub const fn from_code(code: i16) -> Option<Self> {
        match code {
            0 => Some(Self::Draft),
            1 => Some(Self::Paid),
            2 => Some(Self::Active),
            3 => Some(Self::Canceled),
            4 => Some(Self::Closed),
            5 => Some(Self::Refunded),
            _ => None,
        }
    }

    /// `true` while the event still holds vault resources and counts
    /// against its owner's slots quota.
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Draft | Self::Paid | Self::Active)
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Draft => "draft",
            Self::Paid => "paid",
            Self::Active => "active",
            Self::Canceled => "canceled",
            Self::Closed => "closed",
            Self::Refunded => "refunded",
        };
        write!(f, "{name}")
    }
}

// ============================================================================
// Entities
// ============================================================================

/// A known wallet and its profile.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Wallet address (primary key).
    pub wallet: WalletAddress,
    /// Optional first name.
    pub first_name: Option<String>,
    /// Optional last name.
    pub last_name: Option<String>,
    /// Optional contact email.
    pub email: Option<String>,
    /// Whether the wallet may create events.
    pub is_organizer: bool,
    /// Whether the wallet has admin rights.
    pub is_admin: bool,
    /// Maximum concurrent token count across this wallet's open events.
    pub slots: u32,
}

impl User {
    /// A bare user record with no profile and no privileges.
    #[must_use]
    pub const fn bare(wallet: WalletAddress) -> Self {
        Self {
            wallet,
            first_name: None,
            last_name: None,
            email: None,
            is_organizer: false,
            is_admin: false,
            slots: 0,
        }
    }
}

/// Organizer-supplied fields of a new event.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EventDraft {
    /// Event title.
    pub title: String,
    /// Event description.
    pub description: String,
    /// Venue or location text.
    pub location: String,
    /// Optional image URL for the token metadata.
    pub image_url: Option<String>,
    /// Number of tokens to mint; immutable once minting starts.
    pub token_count: u32,
    /// Start of the event.
    pub starts_at: DateTime<Utc>,
    /// End of the event; must not precede the start.
    pub ends_at: DateTime<Utc>,
}

/// A proof-of-attendance event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Orchestrator-assigned id; doubles as the on-chain taxon.
    pub id: EventId,
    /// Owning organizer wallet.
    pub owner: WalletAddress,
    /// Network the event's tokens live on.
    pub network: NetworkId,
    /// Lifecycle status.
    pub status: EventStatus,
    /// Event title.
    pub title: String,
    /// Event description.
    pub description: String,
    /// Venue or location text.
    pub location: String,
    /// Optional image URL.
    pub image_url: Option<String>,
    /// Token supply; immutable once minting starts.
    pub token_count: u32,
    /// Metadata URI, set after a successful mint.
    pub uri: Option<String>,
    /// Start of the event.
    pub starts_at: DateTime<Utc>,
    /// End of the event.
    pub ends_at: DateTime<Utc>,
    /// Invite-only flag; managed events reject open signup.
    pub is_managed: bool,
}

/// Deposit bookkeeping for one event (1:1).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Accounting {
    /// Owning event.
    pub event_id: EventId,
    /// Address the organizer pays the deposit to.
    pub deposit_address: WalletAddress,
    /// Reserve portion of the required deposit.
    pub deposit_reserve: Drops,
    /// Fee-cushion portion of the required deposit.
    pub deposit_fee: Drops,
    /// Hash of the observed deposit payment, once verified.
    pub deposit_tx_hash: Option<TxHash>,
    /// Amount returned to the organizer, once refunded.
    pub refund_value: Option<Drops>,
    /// Hash of the refund payment, once refunded.
    pub refund_tx_hash: Option<TxHash>,
    /// Running total of network fees spent on this event's transactions.
    pub accumulated_tx_fees: Drops,
}

/// Local cache row for a minted token.
///
/// The ledger is the source of truth for token existence; rows appear lazily
/// when a minted token is first observed on-chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nft {
    /// Ledger-assigned token id (primary key).
    pub token_id: TokenId,
    /// Issuing (vault) account.
    pub issuer: WalletAddress,
    /// Owning event.
    pub event_id: EventId,
}

/// An attendee's claim on one token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    /// Claim id.
    pub id: Uuid,
    /// Claiming wallet.
    pub wallet: WalletAddress,
    /// Claimed token (unique: at most one claim per token).
    pub token_id: TokenId,
    /// Owning event.
    pub event_id: EventId,
    /// Sell-offer index, once an offer has been created.
    pub offer_index: Option<OfferIndex>,
    /// `true` once the offer has been accepted on-chain.
    pub claimed: bool,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn network_id_normalizes_case() {
        assert_eq!(NetworkId::new("TestNet"), NetworkId::new("testnet"));
    }

    #[test]
    fn drops_round_trips_as_string() {
        let value = Drops::new(2_126_000_000);
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, "\"2126000000\"");
        let back: Drops = serde_json::from_str(&json).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn drops_arithmetic_saturates() {
        assert_eq!(Drops::new(5).saturating_sub(Drops::new(9)), Drops::ZERO);
        assert_eq!(Drops::new(3).times(4), Drops::new(12));
        assert_eq!(Drops::new(10).checked_sub(Drops::new(20)), None);
    }

    #[test]
    fn status_codes_round_trip() {
        for status in [
            EventStatus::Draft,
            EventStatus::Paid,
            EventStatus::Active,
            EventStatus::Canceled,
            EventStatus::Closed,
            EventStatus::Refunded,
        ] {
            assert_eq!(EventStatus::from_code(status.code()), Some(status));
        }
        assert_eq!(EventStatus::from_code(42), None);
    }

    #[test]
    fn open_statuses_hold_resources() {
        assert!(EventStatus::Draft.is_open());
        assert!(EventStatus::Active.is_open());
        assert!(!EventStatus::Closed.is_open());
        assert!(!EventStatus::Canceled.is_open());
    }
}
