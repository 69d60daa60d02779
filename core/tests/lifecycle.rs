//! End-to-end lifecycle scenarios against the in-memory providers.

#![allow(clippy::unwrap_used)]

use chrono::{TimeZone, Utc};
use mintpass_core::accounting::calc_deposit_values;
use mintpass_core::error::Error;
use mintpass_core::mocks::{MemoryStore, MockClock, MockGateway, MockLedger, MockUploader};
use mintpass_core::providers::{NetworkConfig, Store as _};
use mintpass_core::sweeper::Sweeper;
use mintpass_core::types::{
    Drops, Event, EventDraft, EventStatus, NetworkId, User, WalletAddress,
};
use mintpass_core::EventService;
use std::sync::Arc;
use std::time::Duration;

struct Harness {
    service: EventService,
    store: MemoryStore,
    ledger: MockLedger,
    gateway: MockGateway,
    network: NetworkId,
    vault: WalletAddress,
}

async fn harness() -> Harness {
    let store = MemoryStore::new();
    let ledger = MockLedger::new();
    let vault = ledger.funded_wallet("rVaultCustody", Drops::new(1_000_000_000));
    let network = NetworkId::new("testnet");
    let config = NetworkConfig::standard(network.clone(), vault.clone());
    let gateway = MockGateway::new().with_network(config, ledger.clone());

    let service = EventService::open(
        Arc::new(store.clone()),
        Arc::new(gateway.clone()),
        Arc::new(MockUploader::new()),
        Arc::new(MockClock::new()),
    )
    .await
    .unwrap();

    Harness {
        service,
        store,
        ledger,
        gateway,
        network,
        vault,
    }
}

impl Harness {
    async fn organizer(&self, address: &str) -> WalletAddress {
        let wallet = self.ledger.funded_wallet(address, Drops::new(200_000_000));
        let user = User {
            is_organizer: true,
            slots: 100,
            ..User::bare(wallet.clone())
        };
        self.store.insert_user(&user).await.unwrap();
        wallet
    }

    async fn attendee(&self, address: &str) -> WalletAddress {
        let wallet = self.ledger.funded_wallet(address, Drops::new(50_000_000));
        self.store
            .insert_user(&User::bare(wallet.clone()))
            .await
            .unwrap();
        wallet
    }

    async fn create_event(&self, owner: &WalletAddress, token_count: u32) -> Event {
        let draft = EventDraft {
            title: "RustFest Ledger Track".to_string(),
            description: "Two days of ledger plumbing".to_string(),
            location: "Berlin".to_string(),
            image_url: None,
            token_count,
            starts_at: Utc.with_ymd_and_hms(2026, 9, 1, 9, 0, 0).unwrap(),
            ends_at: Utc.with_ymd_and_hms(2026, 9, 2, 18, 0, 0).unwrap(),
        };
        self.service
            .create_event(&self.network, owner, draft, false)
            .await
            .unwrap()
    }

    async fn fees(&self, event: &Event) -> Drops {
        self.service
            .get_accounting(event.id)
            .await
            .unwrap()
            .accumulated_tx_fees
    }
}

// ════════════════════════════════════════════════════════════════════════
// Scenario A: create → premature mint fails → paid → mint succeeds
// ════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn scenario_a_mint_lifecycle() {
    let h = harness().await;
    let owner = h.organizer("rOrganizerA").await;
    let event = h.create_event(&owner, 8).await;
    assert_eq!(event.status, EventStatus::Draft);

    // Minting before payment is a business-rule violation.
    let err = h.service.mint_event(event.id).await.unwrap_err();
    assert!(err.is_domain());

    h.store.force_status(event.id, EventStatus::Paid);
    let minted = h.service.mint_event(event.id).await.unwrap();

    assert_eq!(minted.status, EventStatus::Active);
    assert!(minted.uri.as_deref().unwrap().starts_with("ipfs://"));

    let nfts = h.store.nfts_for_event(event.id).await.unwrap();
    assert_eq!(nfts.len(), 8);

    // Ticket reservation plus eight mints at 12 drops each.
    let fees = h.fees(&minted).await;
    assert!(fees > Drops::new((8 + 2) * 10), "fees were {fees}");
}

// ════════════════════════════════════════════════════════════════════════
// Scenario B: cancel-from-active fails, close burns and spends fees
// ════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn scenario_b_close_doubles_fees() {
    let h = harness().await;
    let owner = h.organizer("rOrganizerB").await;
    let event = h.create_event(&owner, 8).await;
    h.store.force_status(event.id, EventStatus::Paid);
    h.service.mint_event(event.id).await.unwrap();
    let fees_after_mint = h.fees(&event).await;

    // Active events cannot be canceled, only closed.
    let err = h.service.cancel_event(event.id).await.unwrap_err();
    assert!(err.is_domain());

    let closed = h.service.close_event(event.id).await.unwrap();
    assert_eq!(closed.status, EventStatus::Closed);

    // All eight tokens were unclaimed, so closing burned each of them.
    assert!(h.ledger.tokens_of(&h.vault).is_empty());

    let fees_after_close = h.fees(&event).await;
    assert!(
        fees_after_close.get() >= fees_after_mint.get() * 9 / 5,
        "close spent too little: {fees_after_mint} -> {fees_after_close}"
    );
}

// ════════════════════════════════════════════════════════════════════════
// Scenario C: refund accounting
// ════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn scenario_c_refund_accounting() {
    let h = harness().await;
    let owner = h.organizer("rOrganizerC").await;
    let event = h.create_event(&owner, 8).await;

    let values = calc_deposit_values(8);
    let _deposit = h.ledger.make_payment(&owner, &h.vault, values.total());
    h.store.force_status(event.id, EventStatus::Closed);

    let refunded = h.service.refund_deposit(event.id).await.unwrap();
    assert_eq!(refunded.status, EventStatus::Refunded);

    let accounting = h.service.get_accounting(event.id).await.unwrap();
    let expected_refund = values.total().saturating_sub(Drops::new(12));
    assert_eq!(accounting.refund_value, Some(expected_refund));
    assert!(accounting.refund_tx_hash.is_some());

    // Idempotency guard: the second refund attempt must fail.
    let err = h.service.refund_deposit(event.id).await.unwrap_err();
    assert!(matches!(err, Error::RefundAlreadyProcessed));
}

// ════════════════════════════════════════════════════════════════════════
// Unauthorized mint
// ════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn unauthorized_mint_cancels_the_event() {
    let h = harness().await;
    let owner = h.organizer("rOrganizerD").await;
    let event = h.create_event(&owner, 4).await;
    h.store.force_status(event.id, EventStatus::Paid);

    h.ledger.set_mint_failure("tecNO_PERMISSION");
    let err = h.service.mint_event(event.id).await.unwrap_err();
    assert!(!err.is_domain());

    let event = h.service.get_event(event.id).await.unwrap();
    assert_eq!(event.status, EventStatus::Canceled);
}

// ════════════════════════════════════════════════════════════════════════
// Payment confirmation
// ════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn deposit_payment_moves_draft_to_paid() {
    let h = harness().await;
    let owner = h.organizer("rOrganizerE").await;
    let event = h.create_event(&owner, 8).await;

    let deposit = h
        .ledger
        .make_payment(&owner, &h.vault, calc_deposit_values(8).total());
    let paid = h.service.confirm_payment(event.id, &deposit).await.unwrap();
    assert_eq!(paid.status, EventStatus::Paid);

    let accounting = h.service.get_accounting(event.id).await.unwrap();
    assert_eq!(accounting.deposit_tx_hash, Some(deposit));
}

#[tokio::test]
async fn short_deposit_payment_is_rejected() {
    let h = harness().await;
    let owner = h.organizer("rOrganizerF").await;
    let event = h.create_event(&owner, 8).await;

    let short = calc_deposit_values(8).total().saturating_sub(Drops::new(1));
    let deposit = h.ledger.make_payment(&owner, &h.vault, short);
    let err = h
        .service
        .confirm_payment(event.id, &deposit)
        .await
        .unwrap_err();
    assert!(err.is_domain());

    let event = h.service.get_event(event.id).await.unwrap();
    assert_eq!(event.status, EventStatus::Draft);
}

// ════════════════════════════════════════════════════════════════════════
// State machine monotonicity
// ════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn close_requires_active_and_refund_requires_closed() {
    let h = harness().await;
    let owner = h.organizer("rOrganizerG").await;
    let event = h.create_event(&owner, 2).await;

    assert!(h.service.close_event(event.id).await.unwrap_err().is_domain());
    assert!(
        h.service
            .refund_deposit(event.id)
            .await
            .unwrap_err()
            .is_domain()
    );
}

#[tokio::test]
async fn unknown_network_is_rejected() {
    let h = harness().await;
    let owner = h.organizer("rOrganizerH").await;
    let draft = EventDraft {
        title: "Nowhere".to_string(),
        description: String::new(),
        location: String::new(),
        image_url: None,
        token_count: 1,
        starts_at: Utc.with_ymd_and_hms(2026, 9, 1, 9, 0, 0).unwrap(),
        ends_at: Utc.with_ymd_and_hms(2026, 9, 1, 10, 0, 0).unwrap(),
    };
    let err = h
        .service
        .create_event(&NetworkId::new("moonnet"), &owner, draft, false)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UnsupportedNetwork(_)));
}

// ════════════════════════════════════════════════════════════════════════
// Claims
// ════════════════════════════════════════════════════════════════════════

async fn active_event(h: &Harness, owner_addr: &str, token_count: u32) -> Event {
    let owner = h.organizer(owner_addr).await;
    let event = h.create_event(&owner, token_count).await;
    h.store.force_status(event.id, EventStatus::Paid);
    h.service.mint_event(event.id).await.unwrap()
}

#[tokio::test]
async fn full_event_rejects_further_joins() {
    let h = harness().await;
    let event = active_event(&h, "rOrganizerI", 1).await;

    let first = h.attendee("rAliceI").await;
    h.service.join_event(event.id, &first, true, true).await.unwrap();

    let second = h.attendee("rBobI").await;
    let err = h
        .service
        .join_event(event.id, &second, true, true)
        .await
        .unwrap_err();
    assert!(err.is_domain());

    let count = h.store.count_attendees(event.id).await.unwrap();
    assert!(count <= event.token_count);
}

#[tokio::test]
async fn duplicate_participant_is_rejected() {
    let h = harness().await;
    let event = active_event(&h, "rOrganizerJ", 3).await;
    let wallet = h.attendee("rAliceJ").await;

    h.service.join_event(event.id, &wallet, true, true).await.unwrap();
    let err = h
        .service
        .join_event(event.id, &wallet, true, true)
        .await
        .unwrap_err();
    assert!(err.is_domain());
}

#[tokio::test]
async fn managed_event_rejects_open_signup_but_allows_invites() {
    let h = harness().await;
    let owner = h.organizer("rOrganizerK").await;
    let draft = EventDraft {
        title: "Invite only".to_string(),
        description: String::new(),
        location: String::new(),
        image_url: None,
        token_count: 2,
        starts_at: Utc.with_ymd_and_hms(2026, 9, 1, 9, 0, 0).unwrap(),
        ends_at: Utc.with_ymd_and_hms(2026, 9, 1, 10, 0, 0).unwrap(),
    };
    let event = h
        .service
        .create_event(&h.network, &owner, draft, true)
        .await
        .unwrap();
    h.store.force_status(event.id, EventStatus::Paid);
    h.service.mint_event(event.id).await.unwrap();

    let wallet = h.attendee("rAliceK").await;
    let err = h
        .service
        .join_event(event.id, &wallet, true, true)
        .await
        .unwrap_err();
    assert!(err.is_domain());

    // Organizer-driven invites skip the join policy.
    h.service.join_event(event.id, &wallet, true, false).await.unwrap();
}

#[tokio::test]
async fn concurrent_joins_cannot_share_a_token() {
    let h = harness().await;
    let event = active_event(&h, "rOrganizerL", 1).await;

    let alice = h.attendee("rAliceL").await;
    let bob = h.attendee("rBobL").await;

    let (first, second) = tokio::join!(
        h.service.join_event(event.id, &alice, false, true),
        h.service.join_event(event.id, &bob, false, true),
    );

    let successes = [&first, &second].iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1, "exactly one concurrent join may win");

    let claims = h.store.claims_for_event(event.id).await.unwrap();
    assert_eq!(claims.len(), 1);
    let count = h.store.count_attendees(event.id).await.unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn claim_settles_when_its_offer_disappears() {
    let h = harness().await;
    let event = active_event(&h, "rOrganizerM", 2).await;
    let wallet = h.attendee("rAliceM").await;

    let claim = h.service.join_event(event.id, &wallet, true, true).await.unwrap();
    let offer = claim.offer_index.clone().unwrap();

    let unsettled = h.service.get_claim(&wallet, event.id).await.unwrap();
    assert!(!unsettled.claimed);

    h.ledger.accept_offer(&claim.token_id, &offer);
    let settled = h.service.get_claim(&wallet, event.id).await.unwrap();
    assert!(settled.claimed);
}

#[tokio::test]
async fn offer_is_created_lazily_on_first_claim_read() {
    let h = harness().await;
    let event = active_event(&h, "rOrganizerN", 2).await;
    let wallet = h.attendee("rAliceN").await;

    let claim = h.service.join_event(event.id, &wallet, false, true).await.unwrap();
    assert!(claim.offer_index.is_none());

    let read = h.service.get_claim(&wallet, event.id).await.unwrap();
    assert!(read.offer_index.is_some());
    assert!(!read.claimed);
}

// ════════════════════════════════════════════════════════════════════════
// Sweeper
// ════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn sweeper_settles_accepted_offers() {
    let h = harness().await;
    let event = active_event(&h, "rOrganizerO", 2).await;
    let wallet = h.attendee("rAliceO").await;

    let claim = h.service.join_event(event.id, &wallet, true, true).await.unwrap();
    h.ledger
        .accept_offer(&claim.token_id, claim.offer_index.as_ref().unwrap());

    let sweeper = Sweeper::new(
        Arc::new(h.store.clone()),
        Arc::new(h.gateway.clone()),
        Duration::from_secs(30),
    );
    let settled = sweeper.tick().await.unwrap();
    assert_eq!(settled, 1);

    let claim = h.store.claim_for(&wallet, event.id).await.unwrap().unwrap();
    assert!(claim.claimed);

    // A second pass finds nothing pending.
    assert_eq!(sweeper.tick().await.unwrap(), 0);
}

// ════════════════════════════════════════════════════════════════════════
// Slots quota
// ════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn slots_quota_bounds_open_events() {
    let h = harness().await;
    let owner = h.ledger.funded_wallet("rOrganizerP", Drops::new(200_000_000));
    let user = User {
        is_organizer: true,
        slots: 10,
        ..User::bare(owner.clone())
    };
    h.store.insert_user(&user).await.unwrap();

    h.create_event(&owner, 8).await;

    let draft = EventDraft {
        title: "Over quota".to_string(),
        description: String::new(),
        location: String::new(),
        image_url: None,
        token_count: 3,
        starts_at: Utc.with_ymd_and_hms(2026, 9, 1, 9, 0, 0).unwrap(),
        ends_at: Utc.with_ymd_and_hms(2026, 9, 1, 10, 0, 0).unwrap(),
    };
    let err = h
        .service
        .create_event(&h.network, &owner, draft, false)
        .await
        .unwrap_err();
    assert!(err.is_domain());
}
