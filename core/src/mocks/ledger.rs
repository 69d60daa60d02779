//! Simulated ledger for tests.
//!
//! Models the slice of ledger behavior the core depends on: accounts with
//! balances, ticket objects, tokens with taxon tags, destination-restricted
//! sell offers, per-transaction fee charging, ledger-index progression, and
//! a pending window before validation. Failure knobs let tests drive the
//! unhappy paths without a network.

use crate::error::LedgerError;
use crate::providers::{
    LedgerClient, LedgerToken, Page, ReserveParams, SellOffer, Submission, TxEffect, TxOutcome,
    TxSpec, TxStatus,
};
use crate::types::{Drops, OfferIndex, TicketSequence, TokenId, TxHash, WalletAddress};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

const BASE_RESERVE: Drops = Drops::new(10_000_000);
const PER_ITEM_RESERVE: Drops = Drops::new(2_000_000);

#[derive(Debug)]
struct PendingTx {
    spec: TxSpec,
    polls_left: u32,
    outcome: Option<TxOutcome>,
}

#[derive(Debug, Default)]
struct Inner {
    balances: HashMap<WalletAddress, Drops>,
    tickets: HashMap<WalletAddress, Vec<TicketSequence>>,
    tokens: HashMap<WalletAddress, Vec<LedgerToken>>,
    offers: HashMap<TokenId, Vec<SellOffer>>,
    txs: HashMap<TxHash, PendingTx>,
    ledger_index: u32,
    submissions: u32,
    connects: u32,
    disconnects: u32,
    next_ticket: u32,
    next_token: u32,
    next_offer: u32,
    next_hash: u32,
    // Knobs
    fee: Drops,
    pending_polls: u32,
    never_validate: bool,
    engine_result: Option<String>,
    mint_result: Option<String>,
    page_size: Option<usize>,
}

/// In-memory ledger client.
///
/// Clones share state, so a test can hand a clone to the gateway and keep
/// one for assertions and scripting.
#[derive(Clone, Debug)]
pub struct MockLedger {
    inner: Arc<Mutex<Inner>>,
}

impl Default for MockLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLedger {
    /// Creates an empty ledger with a 12-drop transaction fee.
    #[must_use]
    pub fn new() -> Self {
        let inner = Inner {
            fee: Drops::new(12),
            ledger_index: 100,
            next_ticket: 1000,
            ..Inner::default()
        };
        Self {
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Test scripting
    // ═══════════════════════════════════════════════════════════════════════

    /// Create (or top up) an account and return its address.
    #[must_use]
    pub fn funded_wallet(&self, address: &str, balance: Drops) -> WalletAddress {
        let wallet = WalletAddress::new(address);
        self.lock().balances.insert(wallet.clone(), balance);
        wallet
    }

    /// Every submission stays pending for this many status polls.
    pub fn set_pending_polls(&self, polls: u32) {
        self.lock().pending_polls = polls;
    }

    /// Submissions never validate; the ledger index keeps advancing until
    /// the expiry sequence passes.
    pub fn set_never_validate(&self, never: bool) {
        self.lock().never_validate = never;
    }

    /// Force the preliminary engine result for subsequent submissions.
    pub fn set_engine_result(&self, code: &str) {
        self.lock().engine_result = Some(code.to_string());
    }

    /// Make mint transactions validate with the given failure code.
    pub fn set_mint_failure(&self, code: &str) {
        self.lock().mint_result = Some(code.to_string());
    }

    /// Paginate enumerations at this page size.
    pub fn set_page_size(&self, size: usize) {
        self.lock().page_size = Some(size);
    }

    /// Number of transactions submitted so far.
    #[must_use]
    pub fn submission_count(&self) -> u32 {
        self.lock().submissions
    }

    /// Connect/disconnect call counts, for lifecycle assertions.
    #[must_use]
    pub fn connection_counts(&self) -> (u32, u32) {
        let inner = self.lock();
        (inner.connects, inner.disconnects)
    }

    /// Simulate an offer being accepted: the offer object disappears.
    pub fn accept_offer(&self, token: &TokenId, index: &OfferIndex) {
        let mut inner = self.lock();
        if let Some(offers) = inner.offers.get_mut(token) {
            offers.retain(|offer| &offer.index != index);
        }
    }

    /// Record an already-validated external payment and return its hash,
    /// as if the organizer had paid the deposit from their own wallet.
    #[must_use]
    pub fn make_payment(
        &self,
        source: &WalletAddress,
        destination: &WalletAddress,
        amount: Drops,
    ) -> TxHash {
        let mut inner = self.lock();
        let hash = inner.fresh_hash();
        let spec = TxSpec::Payment {
            source: source.clone(),
            destination: destination.clone(),
            amount,
        };
        let outcome = inner.apply(&hash, &spec);
        inner.txs.insert(
            hash.clone(),
            PendingTx {
                spec,
                polls_left: 0,
                outcome: Some(outcome),
            },
        );
        hash
    }

    /// Tokens currently held by an account (for assertions).
    #[must_use]
    pub fn tokens_of(&self, account: &WalletAddress) -> Vec<LedgerToken> {
        self.lock().tokens.get(account).cloned().unwrap_or_default()
    }
}

impl Inner {
    fn fresh_hash(&mut self) -> TxHash {
        self.next_hash += 1;
        TxHash::new(format!("{:064X}", u128::from(self.next_hash)))
    }

    fn charge_fee(&mut self, account: &WalletAddress) -> Drops {
        let fee = self.fee;
        if let Some(balance) = self.balances.get_mut(account) {
            *balance = balance.saturating_sub(fee);
        }
        fee
    }

    /// Apply a transaction's effects and produce its validated outcome.
    fn apply(&mut self, hash: &TxHash, spec: &TxSpec) -> TxOutcome {
        let mut outcome = TxOutcome {
            hash: hash.clone(),
            success: true,
            result_code: "tesSUCCESS".to_string(),
            fee: Drops::ZERO,
            delivered: None,
            destination: None,
            effects: Vec::new(),
        };

        match spec {
            TxSpec::TicketCreate { account, count } => {
                outcome.fee = self.charge_fee(account);
                for _ in 0..*count {
                    self.next_ticket += 1;
                    let sequence = TicketSequence::new(self.next_ticket);
                    self.tickets.entry(account.clone()).or_default().push(sequence);
                    outcome.effects.push(TxEffect::TicketCreated(sequence));
                }
            }
            TxSpec::NftMint {
                account,
                taxon,
                ticket_sequence,
                ..
            } => {
                outcome.fee = self.charge_fee(account);
                if let Some(code) = self.mint_result.clone() {
                    outcome.success = false;
                    outcome.result_code = code;
                    return outcome;
                }
                if let Some(tickets) = self.tickets.get_mut(account) {
                    tickets.retain(|ticket| ticket != ticket_sequence);
                }
                self.next_token += 1;
                let token_id = TokenId::new(format!("0008{:08X}{:08X}", taxon, self.next_token));
                self.tokens.entry(account.clone()).or_default().push(LedgerToken {
                    token_id: token_id.clone(),
                    issuer: account.clone(),
                    taxon: *taxon,
                });
                outcome.effects.push(TxEffect::TokenMinted(token_id));
            }
            TxSpec::SellOfferCreate {
                account,
                token_id,
                destination,
                amount,
            } => {
                outcome.fee = self.charge_fee(account);
                self.next_offer += 1;
                let index = OfferIndex::new(format!("OFFER{:08X}", self.next_offer));
                self.offers.entry(token_id.clone()).or_default().push(SellOffer {
                    index: index.clone(),
                    destination: Some(destination.clone()),
                    amount: *amount,
                });
                outcome.effects.push(TxEffect::OfferCreated(index));
            }
            TxSpec::NftBurn { account, token_id } => {
                outcome.fee = self.charge_fee(account);
                if let Some(tokens) = self.tokens.get_mut(account) {
                    tokens.retain(|token| &token.token_id != token_id);
                }
                self.offers.remove(token_id);
            }
            TxSpec::Payment {
                source,
                destination,
                amount,
            } => {
                outcome.fee = self.charge_fee(source);
                if let Some(balance) = self.balances.get_mut(source) {
                    *balance = balance.saturating_sub(*amount);
                }
                if let Some(balance) = self.balances.get_mut(destination) {
                    *balance = balance.saturating_add(*amount);
                }
                outcome.delivered = Some(*amount);
                outcome.destination = Some(destination.clone());
            }
        }

        outcome
    }

    fn paginate<T: Clone>(&self, items: &[T], marker: Option<&String>) -> Page<T> {
        let offset = marker.and_then(|m| m.parse::<usize>().ok()).unwrap_or(0);
        match self.page_size {
            Some(size) => {
                let start = usize::min(offset, items.len());
                let end = usize::min(start + size, items.len());
                let next = if end < items.len() {
                    Some(end.to_string())
                } else {
                    None
                };
                Page {
                    items: items.get(start..end).unwrap_or_default().to_vec(),
                    marker: next,
                }
            }
            None => Page {
                items: items.to_vec(),
                marker: None,
            },
        }
    }
}

#[async_trait]
impl LedgerClient for MockLedger {
    async fn connect(&self) -> Result<(), LedgerError> {
        self.lock().connects += 1;
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), LedgerError> {
        self.lock().disconnects += 1;
        Ok(())
    }

    async fn submit(&self, tx: &TxSpec) -> Result<Submission, LedgerError> {
        let mut inner = self.lock();
        inner.submissions += 1;

        if let Some(code) = inner.engine_result.clone() {
            return Ok(Submission {
                hash: inner.fresh_hash(),
                last_ledger_sequence: inner.ledger_index + 20,
                engine_ok: false,
                engine_result: code,
            });
        }

        let hash = inner.fresh_hash();
        let polls_left = if inner.never_validate {
            u32::MAX
        } else {
            inner.pending_polls
        };
        inner.txs.insert(
            hash.clone(),
            PendingTx {
                spec: tx.clone(),
                polls_left,
                outcome: None,
            },
        );

        Ok(Submission {
            hash,
            last_ledger_sequence: inner.ledger_index + 20,
            engine_ok: true,
            engine_result: "tesSUCCESS".to_string(),
        })
    }

    async fn tx_status(&self, hash: &TxHash) -> Result<TxStatus, LedgerError> {
        let mut inner = self.lock();
        // One status poll per ledger close, roughly.
        inner.ledger_index += 1;

        let (polls_left, cached, spec) = match inner.txs.get(hash) {
            None => return Ok(TxStatus::Pending),
            Some(entry) => (
                entry.polls_left,
                entry.outcome.clone(),
                entry.spec.clone(),
            ),
        };

        if let Some(outcome) = cached {
            return Ok(TxStatus::Validated(outcome));
        }
        if polls_left > 0 {
            if let Some(entry) = inner.txs.get_mut(hash) {
                entry.polls_left = entry.polls_left.saturating_sub(1);
            }
            return Ok(TxStatus::Pending);
        }

        let outcome = inner.apply(hash, &spec);
        if let Some(entry) = inner.txs.get_mut(hash) {
            entry.outcome = Some(outcome.clone());
        }
        Ok(TxStatus::Validated(outcome))
    }

    async fn ledger_index(&self) -> Result<u32, LedgerError> {
        Ok(self.lock().ledger_index)
    }

    async fn reserve_params(&self) -> Result<ReserveParams, LedgerError> {
        Ok(ReserveParams {
            base: BASE_RESERVE,
            per_item: PER_ITEM_RESERVE,
        })
    }

    async fn balance(&self, account: &WalletAddress) -> Result<Drops, LedgerError> {
        self.lock()
            .balances
            .get(account)
            .copied()
            .ok_or_else(|| LedgerError::AccountNotFound(account.clone()))
    }

    async fn account_exists(&self, account: &WalletAddress) -> Result<bool, LedgerError> {
        Ok(self.lock().balances.contains_key(account))
    }

    async fn tickets(
        &self,
        account: &WalletAddress,
        marker: Option<String>,
    ) -> Result<Page<TicketSequence>, LedgerError> {
        let inner = self.lock();
        let tickets = inner.tickets.get(account).cloned().unwrap_or_default();
        Ok(inner.paginate(&tickets, marker.as_ref()))
    }

    async fn account_tokens(
        &self,
        account: &WalletAddress,
        marker: Option<String>,
    ) -> Result<Page<LedgerToken>, LedgerError> {
        let inner = self.lock();
        let tokens = inner.tokens.get(account).cloned().unwrap_or_default();
        Ok(inner.paginate(&tokens, marker.as_ref()))
    }

    async fn sell_offers(&self, token: &TokenId) -> Result<Vec<SellOffer>, LedgerError> {
        Ok(self.lock().offers.get(token).cloned().unwrap_or_default())
    }
}
