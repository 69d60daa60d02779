//! Reliable submission: submit a transaction and poll until the ledger
//! reports it validated or its expiry ledger sequence has passed.
//!
//! The poll is an explicit loop over an injected [`Clock`] at a fixed
//! interval of roughly one ledger-close period. "Transaction not found
//! yet" is the expected pre-finality state and just triggers another
//! cycle; there is no backoff. An optional attempt cap gives callers a
//! hard deadline without wrapping the future externally.

use crate::error::LedgerError;
use crate::providers::{Clock, LedgerClient, NetworkConfig, Submission, TxSpec, TxStatus};
use crate::providers::TxOutcome;
use std::time::Duration;

/// Polling parameters for one submission.
#[derive(Clone, Debug)]
pub struct SubmitOptions {
    /// Interval between finality polls.
    pub poll_interval: Duration,
    /// Give up (with [`LedgerError::Deadline`]) after this many polls.
    /// `None` polls until the ledger's own expiry fires.
    pub max_attempts: Option<u32>,
}

impl SubmitOptions {
    /// Options derived from a network's configuration.
    #[must_use]
    pub const fn for_network(config: &NetworkConfig) -> Self {
        Self {
            poll_interval: config.poll_interval,
            max_attempts: config.max_poll_attempts,
        }
    }
}

/// Submit a transaction and wait for its validated outcome.
///
/// # Errors
///
/// - [`LedgerError::Submission`] if the preliminary engine result rejects
///   the transaction outright.
/// - [`LedgerError::Failed`] if the transaction validates with a failure
///   result code.
/// - [`LedgerError::Expired`] once the ledger index passes the
///   transaction's expiry sequence without inclusion.
/// - [`LedgerError::Deadline`] if the optional attempt cap fires first.
pub async fn submit_and_wait(
    client: &dyn LedgerClient,
    clock: &dyn Clock,
    tx: &TxSpec,
    options: &SubmitOptions,
) -> Result<TxOutcome, LedgerError> {
    let submission = submit(client, tx).await?;
    wait_for_outcome(client, clock, &submission, options).await
}

/// Submit without waiting, rejecting preliminary engine failures.
///
/// Used by the mint path, which submits a whole batch before collecting
/// any outcome (fire-and-collect).
///
/// # Errors
///
/// Returns [`LedgerError::Submission`] if the engine result rejects the
/// transaction, or a transport error from the client.
pub async fn submit(
    client: &dyn LedgerClient,
    tx: &TxSpec,
) -> Result<Submission, LedgerError> {
    let submission = client.submit(tx).await?;
    if !submission.engine_ok {
        return Err(LedgerError::Submission {
            code: submission.engine_result,
        });
    }
    tracing::debug!(
        hash = %submission.hash,
        last_ledger_sequence = submission.last_ledger_sequence,
        "transaction submitted"
    );
    Ok(submission)
}

/// Poll a previously submitted transaction to its final outcome.
///
/// # Errors
///
/// See [`submit_and_wait`].
pub async fn wait_for_outcome(
    client: &dyn LedgerClient,
    clock: &dyn Clock,
    submission: &Submission,
    options: &SubmitOptions,
) -> Result<TxOutcome, LedgerError> {
    let mut attempts: u32 = 0;

    loop {
        match client.tx_status(&submission.hash).await? {
            TxStatus::Validated(outcome) if outcome.success => {
                metrics::counter!("mintpass.ledger.tx_validated").increment(1);
                return Ok(outcome);
            }
            TxStatus::Validated(outcome) => {
                metrics::counter!("mintpass.ledger.tx_failed").increment(1);
                return Err(LedgerError::Failed {
                    hash: outcome.hash,
                    code: outcome.result_code,
                });
            }
            TxStatus::Pending => {
                // The ledger's own expiry is the terminal condition; the
                // attempt cap is an optional caller-side deadline.
                let index = client.ledger_index().await?;
                if index > submission.last_ledger_sequence {
                    return Err(LedgerError::Expired {
                        hash: submission.hash.clone(),
                        last_ledger_sequence: submission.last_ledger_sequence,
                    });
                }

                attempts += 1;
                if let Some(max) = options.max_attempts {
                    if attempts >= max {
                        return Err(LedgerError::Deadline {
                            hash: submission.hash.clone(),
                            attempts,
                        });
                    }
                }

                tracing::trace!(
                    hash = %submission.hash,
                    attempts,
                    ledger_index = index,
                    "transaction not validated yet"
                );
                clock.sleep(options.poll_interval).await;
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::mocks::{MockClock, MockLedger};
    use crate::types::Drops;

    fn options() -> SubmitOptions {
        SubmitOptions {
            poll_interval: Duration::from_secs(4),
            max_attempts: None,
        }
    }

    fn payment(ledger: &MockLedger) -> TxSpec {
        TxSpec::Payment {
            source: ledger.funded_wallet("rSource", Drops::new(50_000_000)),
            destination: ledger.funded_wallet("rDest", Drops::new(20_000_000)),
            amount: Drops::new(1_000_000),
        }
    }

    #[tokio::test]
    async fn validates_after_pending_polls() {
        let ledger = MockLedger::new();
        ledger.set_pending_polls(3);
        let clock = MockClock::new();
        let tx = payment(&ledger);

        let outcome = submit_and_wait(&ledger, &clock, &tx, &options()).await.unwrap();

        assert!(outcome.success);
        // Three pending polls means three sleeps at the poll interval.
        assert_eq!(clock.total_slept(), Duration::from_secs(12));
    }

    #[tokio::test]
    async fn expiry_terminates_polling() {
        let ledger = MockLedger::new();
        ledger.set_never_validate(true);
        let clock = MockClock::new();
        let tx = payment(&ledger);

        let err = submit_and_wait(&ledger, &clock, &tx, &options()).await.unwrap_err();

        assert!(matches!(err, LedgerError::Expired { .. }));
    }

    #[tokio::test]
    async fn attempt_cap_fires_before_expiry() {
        let ledger = MockLedger::new();
        ledger.set_never_validate(true);
        let clock = MockClock::new();
        let tx = payment(&ledger);
        let capped = SubmitOptions {
            poll_interval: Duration::from_secs(4),
            max_attempts: Some(2),
        };

        let err = submit_and_wait(&ledger, &clock, &tx, &capped).await.unwrap_err();

        assert!(matches!(err, LedgerError::Deadline { attempts: 2, .. }));
    }

    #[tokio::test]
    async fn engine_rejection_is_terminal() {
        let ledger = MockLedger::new();
        ledger.set_engine_result("temBAD_FEE");
        let clock = MockClock::new();
        let tx = payment(&ledger);

        let err = submit_and_wait(&ledger, &clock, &tx, &options()).await.unwrap_err();

        assert!(matches!(err, LedgerError::Submission { .. }));
        assert_eq!(clock.total_slept(), Duration::ZERO);
    }
}
