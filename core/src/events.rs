//! Event lifecycle orchestrator.
//!
//! Owns the state machine for one event
//! (`Draft → Paid → Active → Canceled | Closed → Refunded`) and coordinates
//! the persistent store with the ledger gateway: create, payment
//! confirmation, batch mint, cancel, close, refund.
//!
//! The mint path is the failure-sensitive one. It issues up to
//! `token_count` independent transactions and decides event fate as one
//! logical outcome even though the underlying operations are not atomic:
//! any failure cancels the whole event (fail-fast, no partial-mint repair).

use crate::accounting::{calc_deposit_values, refund_value, verify_payment};
use crate::error::{Error, Result};
use crate::providers::{
    Clock, LedgerClient, LedgerGateway, MetadataUploader, NetworkConfig, Store, Submission,
    TxEffect, TxSpec, TxStatus, with_client,
};
use crate::submission::{self, SubmitOptions};
use crate::tickets::prepare_tickets;
use crate::types::{
    Accounting, Event, EventDraft, EventId, EventStatus, Nft, NetworkId, TxHash, User,
    WalletAddress,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

/// The event lifecycle orchestrator.
///
/// Constructed with explicit handles to its collaborators; nothing global.
/// Use [`EventService::open`] so the event-id counter is seeded from the
/// store before the first creation.
pub struct EventService {
    pub(crate) store: Arc<dyn Store>,
    pub(crate) gateway: Arc<dyn LedgerGateway>,
    pub(crate) metadata: Arc<dyn MetadataUploader>,
    pub(crate) clock: Arc<dyn Clock>,
    next_event_id: AtomicU32,
}

impl EventService {
    /// Open the orchestrator, seeding the event-id counter from
    /// `max(existing id) + 1`.
    ///
    /// Ids are reserved with a fetch-and-increment before the store write,
    /// so an id consumed by a failed creation is burned, never reused: a
    /// reused id could alias the taxon binding of another event's tokens.
    ///
    /// # Errors
    ///
    /// Returns a store error if the seed query fails.
    pub async fn open(
        store: Arc<dyn Store>,
        gateway: Arc<dyn LedgerGateway>,
        metadata: Arc<dyn MetadataUploader>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let seed = store
            .max_event_id()
            .await?
            .map_or(1, |id| id.get().saturating_add(1));

        tracing::info!(next_event_id = seed, "event service opened");

        Ok(Self {
            store,
            gateway,
            metadata,
            clock,
            next_event_id: AtomicU32::new(seed),
        })
    }

    fn reserve_event_id(&self) -> EventId {
        EventId::new(self.next_event_id.fetch_add(1, Ordering::SeqCst))
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Lookups
    // ═══════════════════════════════════════════════════════════════════════

    /// An event by id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for unknown ids.
    pub async fn get_event(&self, id: EventId) -> Result<Event> {
        self.store
            .find_event(id)
            .await?
            .ok_or_else(|| Error::NotFound {
                entity: "event",
                key: id.to_string(),
            })
    }

    /// Events, newest first, optionally filtered by status.
    ///
    /// # Errors
    ///
    /// Returns a store error if the query fails.
    pub async fn list_events(
        &self,
        status: Option<EventStatus>,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Event>> {
        Ok(self.store.list_events(status, limit, offset).await?)
    }

    /// The accounting record of an event.
    ///
    /// # Errors
    ///
    #[allow(dead_code)]
    fn _assert_mint_send(&self, id: EventId) {
        fn req_send<T: Send>(_: &T) {}
        let fut = self.mint_event(id);
        req_send(&fut);
    }

    /// Returns [`Error::NotFound`] for unknown ids.
    pub async fn get_accounting(&self, id: EventId) -> Result<Accounting> {
        self.store
            .accounting_for(id)
            .await?
            .ok_or_else(|| Error::NotFound {
                entity: "accounting for event",
                key: id.to_string(),
            })
    }

    /// Attendee wallets of an event.
    ///
    /// # Errors
    ///
    /// Returns a store error if the query fails.
    pub async fn attendees(&self, id: EventId) -> Result<Vec<WalletAddress>> {
        // Surface unknown events as such rather than an empty list.
        let event = self.get_event(id).await?;
        Ok(self.store.attendees(event.id).await?)
    }

    /// A user by wallet.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for unknown wallets.
    pub async fn get_user(&self, wallet: &WalletAddress) -> Result<User> {
        self.store
            .find_user(wallet)
            .await?
            .ok_or_else(|| Error::NotFound {
                entity: "user",
                key: wallet.to_string(),
            })
    }

    /// Create or update a user's profile fields.
    ///
    /// Role flags and the slots quota are not touchable through this path.
    ///
    /// # Errors
    ///
    /// Returns a store error if the write fails.
    pub async fn upsert_profile(
        &self,
        wallet: &WalletAddress,
        first_name: Option<String>,
        last_name: Option<String>,
        email: Option<String>,
    ) -> Result<User> {
        let mut user = match self.store.find_user(wallet).await? {
            Some(user) => user,
            None => {
                let user = User::bare(wallet.clone());
                self.store.insert_user(&user).await?;
                user
            }
        };

        user.first_name = first_name;
        user.last_name = last_name;
        user.email = email;
        self.store.update_user(&user).await?;
        Ok(user)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Lifecycle operations
    // ═══════════════════════════════════════════════════════════════════════

    /// Create an event in `Draft` state and its accounting record.
    ///
    /// Validates the owner on-chain and against the slots quota, reserves
    /// the next event id, and computes the required deposit. Minting is
    /// deferred until the deposit is confirmed, because it costs on-chain
    /// resources and must never happen speculatively.
    ///
    /// # Errors
    ///
    /// Domain errors for unknown networks/owners, missing organizer
    /// rights, invalid dates, or an exhausted slots quota.
    pub async fn create_event(
        &self,
        network: &NetworkId,
        owner: &WalletAddress,
        draft: EventDraft,
        is_managed: bool,
    ) -> Result<Event> {
        let config = self.gateway.network(network)?;

        if draft.token_count == 0 {
            return Err(Error::domain("token count must be at least 1"));
        }
        if draft.ends_at < draft.starts_at {
            return Err(Error::domain("event end date precedes its start date"));
        }

        let user = self.get_user(owner).await?;
        if !user.is_organizer {
            return Err(Error::domain(format!(
                "wallet {owner} is not an organizer"
            )));
        }

        let in_use = self.store.open_token_count(owner).await?;
        if in_use.saturating_add(u64::from(draft.token_count)) > u64::from(user.slots) {
            return Err(Error::domain(format!(
                "insufficient slots: {in_use} of {} in use, {} requested",
                user.slots, draft.token_count
            )));
        }

        let exists = with_client(self.gateway.as_ref(), network, async |client| {
            Ok(client.account_exists(owner).await?)
        })
        .await?;
        if !exists {
            return Err(Error::domain(format!(
                "account {owner} not found on the {network} ledger"
            )));
        }

        let values = calc_deposit_values(draft.token_count);
        let id = self.reserve_event_id();

        let event = Event {
            id,
            owner: owner.clone(),
            network: network.clone(),
            status: EventStatus::Draft,
            title: draft.title,
            description: draft.description,
            location: draft.location,
            image_url: draft.image_url,
            token_count: draft.token_count,
            uri: None,
            starts_at: draft.starts_at,
            ends_at: draft.ends_at,
            is_managed,
        };
        let accounting = Accounting {
            event_id: id,
            deposit_address: config.vault.clone(),
            deposit_reserve: values.reserve,
            deposit_fee: values.fee,
            deposit_tx_hash: None,
            refund_value: None,
            refund_tx_hash: None,
            accumulated_tx_fees: crate::types::Drops::ZERO,
        };

        self.store.insert_event(&event, &accounting).await?;

        tracing::info!(
            event = %id,
            owner = %owner,
            network = %network,
            tokens = event.token_count,
            deposit = %values.total(),
            "event created"
        );

        Ok(event)
    }

    /// Verify the organizer's deposit payment and move `Draft → Paid`.
    ///
    /// # Errors
    ///
    /// Domain errors if the event is not awaiting payment or the
    /// transaction does not match the expected deposit.
    pub async fn confirm_payment(&self, id: EventId, tx: &TxHash) -> Result<Event> {
        let event = self.get_event(id).await?;
        if event.status != EventStatus::Draft {
            return Err(Error::domain(format!(
                "event {id} is not awaiting a deposit payment"
            )));
        }
        let accounting = self.get_accounting(id).await?;

        let expected = calc_deposit_values(event.token_count);
        let delivered = with_client(self.gateway.as_ref(), &event.network, async |client| {
            match client.tx_status(tx).await? {
                TxStatus::Validated(outcome) => {
                    verify_payment(&outcome, &accounting.deposit_address, expected)
                }
                TxStatus::Pending => Err(Error::domain(format!(
                    "payment transaction {tx} is not validated yet"
                ))),
            }
        })
        .await?;

        self.store.record_deposit(id, tx).await?;
        let event = self
            .transition(id, &[EventStatus::Draft], EventStatus::Paid)
            .await?;

        tracing::info!(event = %id, tx = %tx, delivered = %delivered, "deposit confirmed");
        Ok(event)
    }

    /// Mint the event's full token supply and move `Paid → Active`.
    ///
    /// Reserves tickets, uploads metadata, then submits one mint
    /// transaction per ticket tagged with `taxon = event id`, the only
    /// on-chain linkage between a token and its event. Submissions go out
    /// in ticket-list order without waiting for finality in between
    /// (fire-and-collect); outcomes are then gathered and fees accumulated
    /// best-effort. Any failure moves the event to `Canceled`.
    ///
    /// # Errors
    ///
    /// A domain error if the event is not in `Paid`; otherwise the first
    /// ledger/metadata error encountered, with the event canceled.
    pub async fn mint_event(&self, id: EventId) -> Result<Event> {
        let event = self.get_event(id).await?;
        if event.status != EventStatus::Paid {
            return Err(Error::domain(format!(
                "event {id} is not authorized to mint"
            )));
        }

        let config = self.gateway.network(&event.network)?;
        let minted = with_client(self.gateway.as_ref(), &event.network, async |client| {
            self.mint_supply(client, &config, &event).await
        })
        .await;

        match minted {
            Ok(uri) => {
                self.store.set_event_uri(id, &uri).await?;
                let event = self
                    .transition(id, &[EventStatus::Paid], EventStatus::Active)
                    .await?;
                tracing::info!(event = %id, uri = %uri, "event minted");
                Ok(event)
            }
            Err(err) => {
                // Fail-fast: no partial-mint repair. Already-minted tokens
                // stay orphaned on-chain; spent fees remain recorded.
                tracing::error!(event = %id, error = %err, "mint failed, canceling event");
                if let Err(cancel_err) = self
                    .store
                    .transition_status(id, &[EventStatus::Paid], EventStatus::Canceled)
                    .await
                {
                    tracing::error!(
                        event = %id,
                        error = %cancel_err,
                        "failed to mark event canceled after mint failure"
                    );
                }
                Err(err)
            }
        }
    }

    /// The mint body, run inside one scoped client connection.
    async fn mint_supply(
        &self,
        client: &dyn LedgerClient,
        config: &NetworkConfig,
        event: &Event,
    ) -> Result<String> {
        let allocation = prepare_tickets(client, self.clock.as_ref(), config, event.token_count)
            .await?;
        if !allocation.fee_spent.is_zero() {
            self.record_fee(event.id, allocation.fee_spent).await;
        }

        let uri = self.metadata.upload(&event_metadata(event)).await?;

        // Fire: submit every mint before collecting any outcome.
        let options = SubmitOptions::for_network(config);
        let mut submitted: Vec<Submission> = Vec::with_capacity(event.token_count as usize);
        for ticket in allocation.sequences.iter().take(event.token_count as usize) {
            let spec = TxSpec::NftMint {
                account: config.vault.clone(),
                taxon: event.id.get(),
                uri: uri.clone(),
                ticket_sequence: *ticket,
            };
            submitted.push(submission::submit(client, &spec).await?);
        }

        // Collect: wait out each submission, accumulate fees, record tokens.
        for entry in &submitted {
            let outcome =
                submission::wait_for_outcome(client, self.clock.as_ref(), entry, &options).await?;
            self.record_fee(event.id, outcome.fee).await;

            let token_id = outcome
                .effects
                .iter()
                .find_map(|effect| match effect {
                    TxEffect::TokenMinted(token) => Some(token.clone()),
                    _ => None,
                })
                .ok_or_else(|| {
                    Error::OutOfSync(format!(
                        "validated mint {} reported no minted token",
                        outcome.hash
                    ))
                })?;

            self.store
                .upsert_nft(&Nft {
                    token_id,
                    issuer: config.vault.clone(),
                    event_id: event.id,
                })
                .await?;
        }

        Ok(uri)
    }

    /// Cancel a paid-but-unminted event.
    ///
    /// The failed-mint path cancels internally; this is the
    /// organizer-facing operation.
    ///
    /// # Errors
    ///
    /// A domain error unless the event is in `Paid`.
    pub async fn cancel_event(&self, id: EventId) -> Result<Event> {
        let event = self
            .transition(id, &[EventStatus::Paid], EventStatus::Canceled)
            .await?;
        tracing::info!(event = %id, "event canceled");
        Ok(event)
    }

    /// Close an active event and move `Active → Closed`.
    ///
    /// Burns every token without an accepted claim (closing spends fees),
    /// so unclaimed supply does not linger on the vault. Tokens whose
    /// offers were accepted stay with their owners.
    ///
    /// # Errors
    ///
    /// A domain error unless the event is in `Active`.
    pub async fn close_event(&self, id: EventId) -> Result<Event> {
        let event = self.get_event(id).await?;
        if event.status != EventStatus::Active {
            return Err(Error::domain(format!(
                "event {id} is not active and cannot be closed"
            )));
        }

        let config = self.gateway.network(&event.network)?;
        let burned = with_client(self.gateway.as_ref(), &event.network, async |client| {
            self.burn_unclaimed(client, &config, &event).await
        })
        .await?;

        let event = self
            .transition(id, &[EventStatus::Active], EventStatus::Closed)
            .await?;
        tracing::info!(event = %id, burned, "event closed");
        Ok(event)
    }

    /// Burn every event token whose claim was never accepted.
    async fn burn_unclaimed(
        &self,
        client: &dyn LedgerClient,
        config: &NetworkConfig,
        event: &Event,
    ) -> Result<u32> {
        let claims = self.store.claims_for_event(event.id).await?;
        let kept: std::collections::HashSet<_> = claims
            .iter()
            .filter(|claim| claim.claimed)
            .map(|claim| claim.token_id.clone())
            .collect();

        let options = SubmitOptions::for_network(config);
        let mut burned = 0u32;
        for nft in self.store.nfts_for_event(event.id).await? {
            if kept.contains(&nft.token_id) {
                continue;
            }
            let outcome = submission::submit_and_wait(
                client,
                self.clock.as_ref(),
                &TxSpec::NftBurn {
                    account: config.vault.clone(),
                    token_id: nft.token_id,
                },
                &options,
            )
            .await?;
            self.record_fee(event.id, outcome.fee).await;
            burned += 1;
        }

        Ok(burned)
    }

    /// Return the deposit to the owner and move `Closed → Refunded`.
    ///
    /// The refund is `reserve + fee − fallback_fee`, keeping enough on the
    /// deposit address to pay for the refund transaction itself.
    ///
    /// # Errors
    ///
    /// A domain error unless the event is in `Closed`;
    /// [`Error::RefundAlreadyProcessed`] if a refund hash is already
    /// recorded.
    pub async fn refund_deposit(&self, id: EventId) -> Result<Event> {
        let event = self.get_event(id).await?;
        if event.status != EventStatus::Closed {
            return Err(Error::domain(format!(
                "event {id} is not closed and cannot be refunded"
            )));
        }

        let accounting = self.get_accounting(id).await?;
        if accounting.refund_tx_hash.is_some() {
            return Err(Error::RefundAlreadyProcessed);
        }

        let config = self.gateway.network(&event.network)?;
        let amount = refund_value(
            crate::accounting::DepositValues {
                reserve: accounting.deposit_reserve,
                fee: accounting.deposit_fee,
            },
            config.fallback_fee,
        );

        let outcome = with_client(self.gateway.as_ref(), &event.network, async |client| {
            Ok(submission::submit_and_wait(
                client,
                self.clock.as_ref(),
                &TxSpec::Payment {
                    source: accounting.deposit_address.clone(),
                    destination: event.owner.clone(),
                    amount,
                },
                &SubmitOptions::for_network(&config),
            )
            .await?)
        })
        .await?;

        self.store.record_refund(id, amount, &outcome.hash).await?;
        let event = self
            .transition(id, &[EventStatus::Closed], EventStatus::Refunded)
            .await?;

        tracing::info!(event = %id, refund = %amount, tx = %outcome.hash, "deposit refunded");
        Ok(event)
    }

    /// Guarded status transition; a failed guard is a domain error.
    pub(crate) async fn transition(
        &self,
        id: EventId,
        expected: &[EventStatus],
        next: EventStatus,
    ) -> Result<Event> {
        self.store
            .transition_status(id, expected, next)
            .await?
            .ok_or_else(|| {
                Error::domain(format!(
                    "event {id} cannot move to {next} from its current status"
                ))
            })
    }

    /// Best-effort fee accumulation; a failed write is logged, not fatal.
    pub(crate) async fn record_fee(&self, id: EventId, fee: crate::types::Drops) {
        if let Err(err) = self.store.add_tx_fee(id, fee).await {
            tracing::warn!(event = %id, fee = %fee, error = %err, "failed to accumulate tx fee");
        }
    }
}

/// Token-metadata blob uploaded at mint time.
fn event_metadata(event: &Event) -> serde_json::Value {
    serde_json::json!({
        "name": event.title,
        "description": event.description,
        "location": event.location,
        "image": event.image_url,
        "startsAt": event.starts_at.to_rfc3339(),
        "endsAt": event.ends_at.to_rfc3339(),
        "tokenCount": event.token_count,
    })
}
