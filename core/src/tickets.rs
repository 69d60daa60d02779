//! Ticket reservation: pre-allocate sequence-independent transaction slots
//! so a batch of mint transactions can be submitted without strict
//! sequence ordering, bounded by the vault account's reserve economics.

use crate::error::{Error, Result};
use crate::providers::{Clock, LedgerClient, NetworkConfig, TxEffect, TxSpec};
use crate::submission::{SubmitOptions, submit_and_wait};
use crate::types::{Drops, TicketSequence};

/// Result of a reservation pass.
#[derive(Clone, Debug)]
pub struct TicketAllocation {
    /// Live ticket sequences: pre-existing ones first, newly created ones
    /// appended in ledger effect order. Sequence-number order does not
    /// correlate with mint order.
    pub sequences: Vec<TicketSequence>,
    /// Network fee spent on the reservation transaction, zero when the
    /// existing tickets already covered the target.
    pub fee_spent: Drops,
}

/// Ensure at least `target` live tickets exist for the network's vault.
///
/// Idempotent under re-entry: when the vault already holds enough tickets
/// the existing sequences are returned and nothing is submitted.
///
/// # Errors
///
/// - [`Error::TooManyTickets`] if `target` exceeds the network cap.
/// - [`Error::InsufficientReserve`] if the vault cannot cover the reserve
///   for the shortfall.
/// - Ledger errors from enumeration or the reservation transaction.
pub async fn prepare_tickets(
    client: &dyn LedgerClient,
    clock: &dyn Clock,
    config: &NetworkConfig,
    target: u32,
) -> Result<TicketAllocation> {
    if target > config.ticket_cap {
        return Err(Error::TooManyTickets {
            requested: target,
            cap: config.ticket_cap,
        });
    }

    let existing = enumerate_tickets(client, config).await?;
    let existing_count = u32::try_from(existing.len()).unwrap_or(u32::MAX);
    if existing_count >= target {
        tracing::debug!(
            network = %config.id,
            existing = existing_count,
            target,
            "existing tickets cover the target"
        );
        return Ok(TicketAllocation {
            sequences: existing,
            fee_spent: Drops::ZERO,
        });
    }

    let shortfall = target - existing_count;
    check_reserve(client, config, shortfall).await?;

    let outcome = submit_and_wait(
        client,
        clock,
        &TxSpec::TicketCreate {
            account: config.vault.clone(),
            count: shortfall,
        },
        &SubmitOptions::for_network(config),
    )
    .await?;

    // Only ticket-creation entries count, in ledger effect order.
    let mut sequences = existing;
    for effect in &outcome.effects {
        if let TxEffect::TicketCreated(sequence) = effect {
            sequences.push(*sequence);
        }
    }

    tracing::info!(
        network = %config.id,
        created = shortfall,
        total = sequences.len(),
        fee = %outcome.fee,
        "tickets reserved"
    );

    Ok(TicketAllocation {
        sequences,
        fee_spent: outcome.fee,
    })
}

/// Enumerate all live tickets for the vault, following pagination markers
/// until the ledger reports no continuation.
async fn enumerate_tickets(
    client: &dyn LedgerClient,
    config: &NetworkConfig,
) -> Result<Vec<TicketSequence>> {
    let mut sequences = Vec::new();
    let mut marker = None;

    loop {
        let page = client.tickets(&config.vault, marker).await?;
        sequences.extend(page.items);
        match page.marker {
            Some(next) => marker = Some(next),
            None => break,
        }
    }

    Ok(sequences)
}

/// Fail with [`Error::InsufficientReserve`] unless the vault's spendable
/// balance (above the base reserve) covers the per-item reserve for
/// `shortfall` new ticket objects.
async fn check_reserve(
    client: &dyn LedgerClient,
    config: &NetworkConfig,
    shortfall: u32,
) -> Result<()> {
    let params = client.reserve_params().await?;
    let balance = client.balance(&config.vault).await?;

    let available = balance.saturating_sub(params.base);
    let required = params.per_item.times(shortfall);

    if available < required {
        return Err(Error::InsufficientReserve {
            required,
            available,
        });
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::mocks::{MockClock, MockLedger};
    use crate::types::NetworkId;

    fn config(ledger: &MockLedger) -> NetworkConfig {
        NetworkConfig::standard(
            NetworkId::new("testnet"),
            ledger.funded_wallet("rVault", Drops::new(500_000_000)),
        )
    }

    #[tokio::test]
    async fn creates_the_shortfall() {
        let ledger = MockLedger::new();
        let clock = MockClock::new();
        let config = config(&ledger);

        let allocation = prepare_tickets(&ledger, &clock, &config, 8).await.unwrap();

        assert_eq!(allocation.sequences.len(), 8);
        assert!(!allocation.fee_spent.is_zero());
    }

    #[tokio::test]
    async fn second_call_is_idempotent() {
        let ledger = MockLedger::new();
        let clock = MockClock::new();
        let config = config(&ledger);

        let first = prepare_tickets(&ledger, &clock, &config, 8).await.unwrap();
        let submissions_after_first = ledger.submission_count();

        let second = prepare_tickets(&ledger, &clock, &config, 8).await.unwrap();

        assert_eq!(ledger.submission_count(), submissions_after_first);
        assert_eq!(second.sequences, first.sequences);
        assert_eq!(second.fee_spent, Drops::ZERO);
    }

    #[tokio::test]
    async fn rejects_targets_above_the_cap() {
        let ledger = MockLedger::new();
        let clock = MockClock::new();
        let config = config(&ledger);

        let err = prepare_tickets(&ledger, &clock, &config, 251).await.unwrap_err();

        assert!(matches!(
            err,
            Error::TooManyTickets {
                requested: 251,
                cap: 250
            }
        ));
    }

    #[tokio::test]
    async fn rejects_underfunded_vault() {
        let ledger = MockLedger::new();
        let clock = MockClock::new();
        let mut config = config(&ledger);
        // Balance below base reserve + 8 * per-item reserve.
        config.vault = ledger.funded_wallet("rPoor", Drops::new(11_000_000));

        let err = prepare_tickets(&ledger, &clock, &config, 8).await.unwrap_err();

        assert!(matches!(err, Error::InsufficientReserve { .. }));
    }

    #[tokio::test]
    async fn paginated_enumeration_sees_every_ticket() {
        let ledger = MockLedger::new();
        ledger.set_page_size(3);
        let clock = MockClock::new();
        let config = config(&ledger);

        prepare_tickets(&ledger, &clock, &config, 8).await.unwrap();
        let again = prepare_tickets(&ledger, &clock, &config, 8).await.unwrap();

        // Eight live tickets across three pages, no re-allocation.
        assert_eq!(again.sequences.len(), 8);
        assert_eq!(again.fee_spent, Drops::ZERO);
    }
}
