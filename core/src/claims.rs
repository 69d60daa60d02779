//! Claim/offer management: joining an event, assigning a token, creating
//! and reconciling sell offers.
//!
//! The store is a cache of ledger truth for tokens: discovery lazily
//! creates NFT rows for minted tokens that have no local record. Claimed
//! state is reconciled on read (and by the background sweeper) from
//! sell-offer existence: a disappeared offer means it was accepted.

use crate::error::{Error, Result};
use crate::events::EventService;
use crate::providers::{LedgerClient, NetworkConfig, TxSpec, with_client};
use crate::submission::{self, SubmitOptions};
use crate::types::{
    Claim, Drops, Event, EventId, EventStatus, Nft, OfferIndex, TokenId, WalletAddress,
};
use std::collections::HashSet;
use uuid::Uuid;

impl EventService {
    /// Join `wallet` to an event, claiming one available token.
    ///
    /// With `create_offer`, a zero-price sell offer restricted to the
    /// joining wallet is created immediately; otherwise offer creation is
    /// deferred to the first [`EventService::get_claim`] call.
    /// `enforce_join_policy` applies the invite-only rule for managed
    /// events; organizer-driven invites pass `false`.
    ///
    /// Token selection is race-prone by design across concurrent joins:
    /// the store's unique claim-per-token constraint is the linearization
    /// point, and the losing joiner fails rather than overwriting.
    ///
    /// # Errors
    ///
    /// Domain errors for inactive/full/private events, unknown users, and
    /// duplicate participants; [`Error::OutOfSync`] when no claimable
    /// token exists although the attendee count says capacity remains.
    pub async fn join_event(
        &self,
        event_id: EventId,
        wallet: &WalletAddress,
        create_offer: bool,
        enforce_join_policy: bool,
    ) -> Result<Claim> {
        let event = self.get_event(event_id).await?;
        if event.status != EventStatus::Active {
            return Err(Error::domain(format!(
                "event {event_id} is not open for participants"
            )));
        }

        // The user must already be known; first login creates the row.
        self.get_user(wallet).await?;

        let attendees = self.store.count_attendees(event_id).await?;
        if attendees >= event.token_count {
            return Err(Error::domain(format!("event {event_id} is full")));
        }
        if self.store.is_attendee(event_id, wallet).await? {
            return Err(Error::domain(format!(
                "wallet {wallet} already joined event {event_id}"
            )));
        }
        if enforce_join_policy && event.is_managed {
            return Err(Error::domain(format!(
                "event {event_id} is invite-only"
            )));
        }

        let config = self.gateway.network(&event.network)?;
        let (token_id, offer_index) =
            with_client(self.gateway.as_ref(), &event.network, async |client| {
                self.discover_event_tokens(client, &config, &event).await?;
                let token_id = self.pick_unclaimed_token(&event).await?;

                let offer_index = if create_offer {
                    Some(
                        self.create_sell_offer(client, &config, &event, &token_id, wallet)
                            .await?,
                    )
                } else {
                    None
                };
                Ok((token_id, offer_index))
            })
            .await?;

        self.store
            .add_attendee(event_id, wallet)
            .await
            .map_err(|err| match err {
                crate::error::StoreError::Conflict(_) => Error::domain(format!(
                    "wallet {wallet} already joined event {event_id}"
                )),
                other => other.into(),
            })?;

        let claim = Claim {
            id: Uuid::new_v4(),
            wallet: wallet.clone(),
            token_id,
            event_id,
            offer_index,
            claimed: false,
        };
        if let Err(err) = self.store.insert_claim(&claim).await {
            // Lost the token race: undo the attendee row so the count
            // invariant holds, then surface the conflict.
            if let Err(cleanup) = self.store.remove_attendee(event_id, wallet).await {
                tracing::warn!(
                    event = %event_id,
                    wallet = %wallet,
                    error = %cleanup,
                    "failed to roll back attendee after claim conflict"
                );
            }
            return Err(match err {
                crate::error::StoreError::Conflict(_) => Error::domain(format!(
                    "token {} was claimed concurrently, retry joining",
                    claim.token_id
                )),
                other => other.into(),
            });
        }

        metrics::counter!("mintpass.claims.created").increment(1);
        tracing::info!(
            event = %event_id,
            wallet = %wallet,
            token = %claim.token_id,
            "participant joined"
        );

        Ok(claim)
    }

    /// A wallet's claim on an event, reconciled against ledger truth.
    ///
    /// If an offer is recorded and has disappeared on-chain it was
    /// accepted: the claim flips to claimed. If no offer exists yet, one
    /// is created now (lazy offer creation). This on-read reconciliation
    /// avoids a ledger event subscription.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the wallet holds no claim on the
    /// event.
    pub async fn get_claim(&self, wallet: &WalletAddress, event_id: EventId) -> Result<Claim> {
        let mut claim = self
            .store
            .claim_for(wallet, event_id)
            .await?
            .ok_or_else(|| Error::NotFound {
                entity: "claim",
                key: format!("{wallet} on event {event_id}"),
            })?;

        if claim.claimed {
            return Ok(claim);
        }

        let event = self.get_event(event_id).await?;
        let config = self.gateway.network(&event.network)?;

        match claim.offer_index.clone() {
            Some(offer_index) => {
                let gone = with_client(self.gateway.as_ref(), &event.network, async |client| {
                    let offers = client.sell_offers(&claim.token_id).await?;
                    Ok(!offers.iter().any(|offer| offer.index == offer_index))
                })
                .await?;

                if gone {
                    self.store.mark_claimed(claim.id).await?;
                    claim.claimed = true;
                    tracing::info!(
                        event = %event_id,
                        wallet = %wallet,
                        token = %claim.token_id,
                        "sell offer consumed, claim settled"
                    );
                }
            }
            None => {
                let offer_index =
                    with_client(self.gateway.as_ref(), &event.network, async |client| {
                        self.create_sell_offer(client, &config, &event, &claim.token_id, wallet)
                            .await
                    })
                    .await?;
                self.store.set_claim_offer(claim.id, &offer_index).await?;
                claim.offer_index = Some(offer_index);
            }
        }

        Ok(claim)
    }

    /// Cache every on-chain token of this event that has no local row yet.
    async fn discover_event_tokens(
        &self,
        client: &dyn LedgerClient,
        config: &NetworkConfig,
        event: &Event,
    ) -> Result<()> {
        let known: HashSet<TokenId> = self
            .store
            .nfts_for_event(event.id)
            .await?
            .into_iter()
            .map(|nft| nft.token_id)
            .collect();

        let mut marker = None;
        loop {
            let page = client.account_tokens(&config.vault, marker).await?;
            for token in page.items {
                if token.taxon != event.id.get() || known.contains(&token.token_id) {
                    continue;
                }
                self.store
                    .upsert_nft(&Nft {
                        token_id: token.token_id,
                        issuer: token.issuer,
                        event_id: event.id,
                    })
                    .await?;
            }
            match page.marker {
                Some(next) => marker = Some(next),
                None => break,
            }
        }

        Ok(())
    }

    /// First cached token, in store iteration order, with no claim.
    async fn pick_unclaimed_token(&self, event: &Event) -> Result<TokenId> {
        let claimed: HashSet<TokenId> = self
            .store
            .claims_for_event(event.id)
            .await?
            .into_iter()
            .map(|claim| claim.token_id)
            .collect();

        self.store
            .nfts_for_event(event.id)
            .await?
            .into_iter()
            .map(|nft| nft.token_id)
            .find(|token| !claimed.contains(token))
            .ok_or_else(|| {
                Error::OutOfSync(format!(
                    "no claimable token for event {} although attendee capacity remains",
                    event.id
                ))
            })
    }

    /// Create a zero-price sell offer restricted to `destination` and
    /// return its on-chain index.
    ///
    /// A validated submission whose offer cannot be found afterwards is a
    /// hard failure, not retried.
    async fn create_sell_offer(
        &self,
        client: &dyn LedgerClient,
        config: &NetworkConfig,
        event: &Event,
        token_id: &TokenId,
        destination: &WalletAddress,
    ) -> Result<OfferIndex> {
        let outcome = submission::submit_and_wait(
            client,
            self.clock.as_ref(),
            &TxSpec::SellOfferCreate {
                account: config.vault.clone(),
                token_id: token_id.clone(),
                destination: destination.clone(),
                amount: Drops::ZERO,
            },
            &SubmitOptions::for_network(config),
        )
        .await?;
        self.record_fee(event.id, outcome.fee).await;

        let offers = client.sell_offers(token_id).await?;
        offers
            .into_iter()
            .find(|offer| offer.destination.as_ref() == Some(destination))
            .map(|offer| offer.index)
            .ok_or_else(|| Error::OfferLookup(token_id.clone()))
    }
}
