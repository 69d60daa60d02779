//! In-memory store with the same uniqueness semantics as the relational
//! implementation.

use crate::error::StoreError;
use crate::providers::Store;
use crate::types::{
    Accounting, Claim, Drops, Event, EventId, EventStatus, NetworkId, Nft, OfferIndex, TxHash,
    User, WalletAddress,
};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

#[derive(Debug, Default)]
struct Inner {
    users: HashMap<WalletAddress, User>,
    events: BTreeMap<u32, Event>,
    accounting: HashMap<u32, Accounting>,
    nfts: Vec<Nft>,
    claims: Vec<Claim>,
    attendees: Vec<(EventId, WalletAddress)>,
}

/// In-memory [`Store`] implementation.
///
/// Clones share state, so tests can keep a handle for direct inspection
/// while the orchestrator owns another.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Test seam: force an event's status without transition guards.
    pub fn force_status(&self, id: EventId, status: EventStatus) {
        if let Some(event) = self.lock().events.get_mut(&id.get()) {
            event.status = status;
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if inner.users.contains_key(&user.wallet) {
            return Err(StoreError::Conflict(format!(
                "user {} already exists",
                user.wallet
            )));
        }
        inner.users.insert(user.wallet.clone(), user.clone());
        Ok(())
    }

    async fn find_user(&self, wallet: &WalletAddress) -> Result<Option<User>, StoreError> {
        Ok(self.lock().users.get(wallet).cloned())
    }

    async fn update_user(&self, user: &User) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if !inner.users.contains_key(&user.wallet) {
            return Err(StoreError::NotFound {
                entity: "user",
                key: user.wallet.to_string(),
            });
        }
        inner.users.insert(user.wallet.clone(), user.clone());
        Ok(())
    }

    async fn insert_event(
        &self,
        event: &Event,
        accounting: &Accounting,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if inner.events.contains_key(&event.id.get()) {
            return Err(StoreError::Conflict(format!(
                "event {} already exists",
                event.id
            )));
        }
        inner.events.insert(event.id.get(), event.clone());
        inner.accounting.insert(event.id.get(), accounting.clone());
        Ok(())
    }

    async fn find_event(&self, id: EventId) -> Result<Option<Event>, StoreError> {
        Ok(self.lock().events.get(&id.get()).cloned())
    }

    async fn list_events(
        &self,
        status: Option<EventStatus>,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Event>, StoreError> {
        Ok(self
            .lock()
            .events
            .values()
            .rev()
            .filter(|event| status.is_none_or(|wanted| event.status == wanted))
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn max_event_id(&self) -> Result<Option<EventId>, StoreError> {
        Ok(self
            .lock()
            .events
            .keys()
            .next_back()
            .copied()
            .map(EventId::new))
    }

    async fn set_event_uri(&self, id: EventId, uri: &str) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let event = inner.events.get_mut(&id.get()).ok_or(StoreError::NotFound {
            entity: "event",
            key: id.to_string(),
        })?;
        event.uri = Some(uri.to_string());
        Ok(())
    }

    async fn transition_status(
        &self,
        id: EventId,
        expected: &[EventStatus],
        next: EventStatus,
    ) -> Result<Option<Event>, StoreError> {
        let mut inner = self.lock();
        let event = inner.events.get_mut(&id.get()).ok_or(StoreError::NotFound {
            entity: "event",
            key: id.to_string(),
        })?;
        if !expected.contains(&event.status) {
            return Ok(None);
        }
        event.status = next;
        Ok(Some(event.clone()))
    }

    async fn open_token_count(&self, owner: &WalletAddress) -> Result<u64, StoreError> {
        Ok(self
            .lock()
            .events
            .values()
            .filter(|event| &event.owner == owner && event.status.is_open())
            .map(|event| u64::from(event.token_count))
            .sum())
    }

    async fn accounting_for(&self, id: EventId) -> Result<Option<Accounting>, StoreError> {
        Ok(self.lock().accounting.get(&id.get()).cloned())
    }

    async fn record_deposit(&self, id: EventId, tx: &TxHash) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let accounting = inner
            .accounting
            .get_mut(&id.get())
            .ok_or(StoreError::NotFound {
                entity: "accounting for event",
                key: id.to_string(),
            })?;
        accounting.deposit_tx_hash = Some(tx.clone());
        Ok(())
    }

    async fn record_refund(
        &self,
        id: EventId,
        value: Drops,
        tx: &TxHash,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let accounting = inner
            .accounting
            .get_mut(&id.get())
            .ok_or(StoreError::NotFound {
                entity: "accounting for event",
                key: id.to_string(),
            })?;
        accounting.refund_value = Some(value);
        accounting.refund_tx_hash = Some(tx.clone());
        Ok(())
    }

    async fn add_tx_fee(&self, id: EventId, fee: Drops) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let accounting = inner
            .accounting
            .get_mut(&id.get())
            .ok_or(StoreError::NotFound {
                entity: "accounting for event",
                key: id.to_string(),
            })?;
        accounting.accumulated_tx_fees = accounting.accumulated_tx_fees.saturating_add(fee);
        Ok(())
    }

    async fn upsert_nft(&self, nft: &Nft) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if inner.nfts.iter().any(|known| known.token_id == nft.token_id) {
            return Ok(());
        }
        inner.nfts.push(nft.clone());
        Ok(())
    }

    async fn nfts_for_event(&self, id: EventId) -> Result<Vec<Nft>, StoreError> {
        Ok(self
            .lock()
            .nfts
            .iter()
            .filter(|nft| nft.event_id == id)
            .cloned()
            .collect())
    }

    async fn insert_claim(&self, claim: &Claim) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if inner
            .claims
            .iter()
            .any(|known| known.token_id == claim.token_id)
        {
            return Err(StoreError::Conflict(format!(
                "token {} already has a claim",
                claim.token_id
            )));
        }
        inner.claims.push(claim.clone());
        Ok(())
    }

    async fn claim_for(
        &self,
        wallet: &WalletAddress,
        event: EventId,
    ) -> Result<Option<Claim>, StoreError> {
        Ok(self
            .lock()
            .claims
            .iter()
            .find(|claim| &claim.wallet == wallet && claim.event_id == event)
            .cloned())
    }

    async fn claims_for_event(&self, event: EventId) -> Result<Vec<Claim>, StoreError> {
        Ok(self
            .lock()
            .claims
            .iter()
            .filter(|claim| claim.event_id == event)
            .cloned()
            .collect())
    }

    async fn set_claim_offer(&self, id: Uuid, offer: &OfferIndex) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let claim = inner
            .claims
            .iter_mut()
            .find(|claim| claim.id == id)
            .ok_or(StoreError::NotFound {
                entity: "claim",
                key: id.to_string(),
            })?;
        claim.offer_index = Some(offer.clone());
        Ok(())
    }

    async fn mark_claimed(&self, id: Uuid) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let claim = inner
            .claims
            .iter_mut()
            .find(|claim| claim.id == id)
            .ok_or(StoreError::NotFound {
                entity: "claim",
                key: id.to_string(),
            })?;
        claim.claimed = true;
        Ok(())
    }

    async fn pending_claims(&self) -> Result<Vec<(Claim, NetworkId)>, StoreError> {
        let inner = self.lock();
        Ok(inner
            .claims
            .iter()
            .filter(|claim| claim.offer_index.is_some() && !claim.claimed)
            .filter_map(|claim| {
                inner
                    .events
                    .get(&claim.event_id.get())
                    .map(|event| (claim.clone(), event.network.clone()))
            })
            .collect())
    }

    async fn add_attendee(
        &self,
        event: EventId,
        wallet: &WalletAddress,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if inner
            .attendees
            .iter()
            .any(|(id, attendee)| *id == event && attendee == wallet)
        {
            return Err(StoreError::Conflict(format!(
                "wallet {wallet} already attends event {event}"
            )));
        }
        inner.attendees.push((event, wallet.clone()));
        Ok(())
    }

    async fn remove_attendee(
        &self,
        event: EventId,
        wallet: &WalletAddress,
    ) -> Result<(), StoreError> {
        self.lock()
            .attendees
            .retain(|(id, attendee)| !(*id == event && attendee == wallet));
        Ok(())
    }

    async fn count_attendees(&self, event: EventId) -> Result<u32, StoreError> {
        let count = self
            .lock()
            .attendees
            .iter()
            .filter(|(id, _)| *id == event)
            .count();
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    async fn is_attendee(
        &self,
        event: EventId,
        wallet: &WalletAddress,
    ) -> Result<bool, StoreError> {
        Ok(self
            .lock()
            .attendees
            .iter()
            .any(|(id, attendee)| *id == event && attendee == wallet))
    }

    async fn attendees(&self, event: EventId) -> Result<Vec<WalletAddress>, StoreError> {
        Ok(self
            .lock()
            .attendees
            .iter()
            .filter(|(id, _)| *id == event)
            .map(|(_, wallet)| wallet.clone())
            .collect())
    }
}
