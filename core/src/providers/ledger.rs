//! Ledger client boundary.
//!
//! The ledger network itself (consensus, wire protocol) is an external
//! dependency; the core only requires the operations below, per network.

use crate::error::LedgerError;
use crate::types::{Drops, OfferIndex, TicketSequence, TokenId, TxHash, WalletAddress};
use async_trait::async_trait;

/// An unsigned transaction intent.
///
/// Signing happens inside the client, which holds the network's vault
/// credential; callers describe only the effect they want.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TxSpec {
    /// Reserve `count` sequence-independent transaction slots.
    TicketCreate {
        /// Reserving account (the vault).
        account: WalletAddress,
        /// Number of tickets to create.
        count: u32,
    },
    /// Mint one token tagged with an event's taxon.
    NftMint {
        /// Minting account (the vault).
        account: WalletAddress,
        /// Taxon tag: the owning event id.
        taxon: u32,
        /// Metadata URI to embed.
        uri: String,
        /// Ticket slot consumed by this transaction.
        ticket_sequence: TicketSequence,
    },
    /// Offer one token to a specific recipient.
    SellOfferCreate {
        /// Offering account (the vault).
        account: WalletAddress,
        /// Token being offered.
        token_id: TokenId,
        /// Only this wallet may accept.
        destination: WalletAddress,
        /// Offer price (zero for attendance claims).
        amount: Drops,
    },
    /// Burn one token.
    NftBurn {
        /// Burning account (the vault).
        account: WalletAddress,
        /// Token to burn.
        token_id: TokenId,
    },
    /// Send a plain payment.
    Payment {
        /// Paying account.
        source: WalletAddress,
        /// Receiving account.
        destination: WalletAddress,
        /// Amount to deliver.
        amount: Drops,
    },
}

/// Result of handing a transaction to the network.
#[derive(Clone, Debug)]
pub struct Submission {
    /// Hash identifying the transaction from now on.
    pub hash: TxHash,
    /// Ledger sequence after which the transaction can no longer validate.
    pub last_ledger_sequence: u32,
    /// Whether the preliminary engine result was a success.
    pub engine_ok: bool,
    /// Preliminary engine result code.
    pub engine_result: String,
}

/// One entry of a validated transaction's effect log, in ledger order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TxEffect {
    /// A ticket object was created.
    TicketCreated(TicketSequence),
    /// A token was minted.
    TokenMinted(TokenId),
    /// A sell offer was created.
    OfferCreated(OfferIndex),
}

/// Final, validated outcome of a transaction.
#[derive(Clone, Debug)]
pub struct TxOutcome {
    /// Transaction hash.
    pub hash: TxHash,
    /// Whether the transaction applied successfully.
    pub success: bool,
    /// Final result code.
    pub result_code: String,
    /// Network fee the transaction burned.
    pub fee: Drops,
    /// Delivered amount, for payments.
    pub delivered: Option<Drops>,
    /// Destination account, for payments.
    pub destination: Option<WalletAddress>,
    /// Effect log in ledger order.
    pub effects: Vec<TxEffect>,
}

/// Poll result for a submitted transaction.
#[derive(Clone, Debug)]
pub enum TxStatus {
    /// Not yet validated. The expected pre-finality state, not an error.
    Pending,
    /// Validated with the given outcome.
    Validated(TxOutcome),
}

/// Current reserve economics of the network.
#[derive(Clone, Copy, Debug)]
pub struct ReserveParams {
    /// Base reserve every account must hold.
    pub base: Drops,
    /// Additional reserve per owned ledger object.
    pub per_item: Drops,
}

/// A token as enumerated from an account's holdings.
#[derive(Clone, Debug)]
pub struct LedgerToken {
    /// Token id.
    pub token_id: TokenId,
    /// Issuing account.
    pub issuer: WalletAddress,
    /// Taxon tag (the owning event id, for tokens this system minted).
    pub taxon: u32,
}

/// A sell offer attached to a token.
#[derive(Clone, Debug)]
pub struct SellOffer {
    /// Offer index.
    pub index: OfferIndex,
    /// Restricted recipient, if any.
    pub destination: Option<WalletAddress>,
    /// Offer price.
    pub amount: Drops,
}

/// One page of a paginated enumeration.
#[derive(Clone, Debug)]
pub struct Page<T> {
    /// Items on this page.
    pub items: Vec<T>,
    /// Continuation marker; `None` means this was the last page.
    pub marker: Option<String>,
}

/// Client bound to one ledger network and its vault signing credential.
///
/// Clients are stateless between calls: every I/O sequence owns its own
/// connect/use/disconnect lifecycle (see
/// [`with_client`](crate::providers::with_client)). No pooling.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Open the connection.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Connection`] if the endpoint is unreachable.
    async fn connect(&self) -> Result<(), LedgerError>;

    /// Close the connection. Safe to call after a failed operation.
    ///
    /// # Errors
    ///
    /// Returns an error if teardown fails; callers may log and ignore.
    async fn disconnect(&self) -> Result<(), LedgerError>;

    /// Sign and submit a transaction intent (fire-and-forget).
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or malformed response; a
    /// rejected transaction is reported through
    /// [`Submission::engine_ok`], not an `Err`.
    async fn submit(&self, tx: &TxSpec) -> Result<Submission, LedgerError>;

    /// Look up a transaction's validation status.
    ///
    /// "Not found yet" is [`TxStatus::Pending`], not an error.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or malformed response.
    async fn tx_status(&self, hash: &TxHash) -> Result<TxStatus, LedgerError>;

    /// Current validated ledger index.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure.
    async fn ledger_index(&self) -> Result<u32, LedgerError>;

    /// Current reserve parameters.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure.
    async fn reserve_params(&self) -> Result<ReserveParams, LedgerError>;

    /// Spendable balance of an account.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::AccountNotFound`] for unknown accounts.
    async fn balance(&self, account: &WalletAddress) -> Result<Drops, LedgerError>;

    /// Whether an account exists on the ledger.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure.
    async fn account_exists(&self, account: &WalletAddress) -> Result<bool, LedgerError>;

    /// One page of an account's live ticket objects.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure.
    async fn tickets(
        &self,
        account: &WalletAddress,
        marker: Option<String>,
    ) -> Result<Page<TicketSequence>, LedgerError>;

    /// One page of an account's tokens.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure.
    async fn account_tokens(
        &self,
        account: &WalletAddress,
        marker: Option<String>,
    ) -> Result<Page<LedgerToken>, LedgerError>;

    /// All sell offers currently attached to a token.
    ///
    /// A token with no offers yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure.
    async fn sell_offers(&self, token: &TokenId) -> Result<Vec<SellOffer>, LedgerError>;
}
