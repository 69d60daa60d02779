//! Deposit accounting: required deposits, payment verification, refunds.
//!
//! All amounts are integer drops. The reserve is a linear function of the
//! requested token count approximating "N ledger objects at the owner
//! reserve increment plus the account base reserve"; the fee portion is a
//! flat cushion for cumulative transaction fees.

use crate::error::{Error, Result};
use crate::providers::TxOutcome;
use crate::types::{Drops, WalletAddress};

/// Owner reserve increment charged per reserved ledger object.
pub const RESERVE_PER_SLOT: Drops = Drops::new(2_000_000);

/// Account base reserve added once for any non-zero slot count.
pub const BASE_RESERVE: Drops = Drops::new(2_000_000);

/// Flat fee cushion collected with every deposit.
pub const DEPOSIT_FEE: Drops = Drops::new(1_000_000);

/// The required deposit for one event, split into its two components.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DepositValues {
    /// Reserve component, returned on refund.
    pub reserve: Drops,
    /// Fee-cushion component, returned on refund.
    pub fee: Drops,
}

impl DepositValues {
    /// Total amount the organizer must pay.
    #[must_use]
    pub const fn total(self) -> Drops {
        self.reserve.saturating_add(self.fee)
    }
}

/// Deposit required for `slots` tokens.
///
/// Zero slots require no deposit; otherwise the reserve is
/// `RESERVE_PER_SLOT * slots + BASE_RESERVE` and the fee cushion is flat.
#[must_use]
pub const fn calc_deposit_values(slots: u32) -> DepositValues {
    let reserve = if slots == 0 {
        Drops::ZERO
    } else {
        RESERVE_PER_SLOT.times(slots).saturating_add(BASE_RESERVE)
    };
    DepositValues {
        reserve,
        fee: DEPOSIT_FEE,
    }
}

/// Amount returned to the organizer on refund.
///
/// The network's fallback minimum fee is withheld so the deposit address
/// is never left unable to afford the refund transaction's own fee.
#[must_use]
pub const fn refund_value(values: DepositValues, fallback_fee: Drops) -> Drops {
    values.total().saturating_sub(fallback_fee)
}

/// Verify a validated transaction as the deposit payment for an event.
///
/// The transaction must have applied successfully, paid the expected
/// deposit address, and delivered at least the full deposit.
///
/// # Errors
///
/// Returns a domain error describing the first mismatch.
pub fn verify_payment(
    outcome: &TxOutcome,
    deposit_address: &WalletAddress,
    expected: DepositValues,
) -> Result<Drops> {
    if !outcome.success {
        return Err(Error::domain(format!(
            "deposit transaction {} failed with {}",
            outcome.hash, outcome.result_code
        )));
    }

    match &outcome.destination {
        Some(destination) if destination == deposit_address => {}
        Some(destination) => {
            return Err(Error::domain(format!(
                "deposit transaction paid {destination}, expected {deposit_address}"
            )));
        }
        None => {
            return Err(Error::domain(format!(
                "transaction {} is not a payment",
                outcome.hash
            )));
        }
    }

    let delivered = outcome
        .delivered
        .ok_or_else(|| Error::domain(format!("transaction {} delivered nothing", outcome.hash)))?;

    if delivered < expected.total() {
        return Err(Error::domain(format!(
            "deposit of {delivered} drops is below the required {}",
            expected.total()
        )));
    }

    Ok(delivered)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::TxHash;
    use proptest::prelude::*;

    fn payment_outcome(
        destination: &WalletAddress,
        delivered: Drops,
        success: bool,
    ) -> TxOutcome {
        TxOutcome {
            hash: TxHash::new("AB12"),
            success,
            result_code: if success { "tesSUCCESS" } else { "tecPATH_DRY" }.to_string(),
            fee: Drops::new(12),
            delivered: Some(delivered),
            destination: Some(destination.clone()),
            effects: Vec::new(),
        }
    }

    #[test]
    fn reserve_matches_fixtures() {
        let fixtures = [
            (0, 0),
            (1, 4_000_000),
            (20, 44_000_000),
            (50, 108_000_000),
            (200, 426_000_000),
            (1000, 2_126_000_000),
        ];
        for (slots, reserve) in fixtures {
            let values = calc_deposit_values(slots);
            assert_eq!(values.reserve, Drops::new(reserve), "slots={slots}");
            assert_eq!(values.fee, DEPOSIT_FEE, "slots={slots}");
        }
    }

    proptest! {
        #[test]
        fn reserve_is_linear_above_zero(slots in 1u32..=100_000) {
            let values = calc_deposit_values(slots);
            prop_assert_eq!(
                values.reserve.get(),
                2_000_000 * u128::from(slots) + 2_000_000
            );
            prop_assert_eq!(values.fee, DEPOSIT_FEE);
        }
    }

    #[test]
    fn refund_withholds_fallback_fee() {
        let values = calc_deposit_values(8);
        let refund = refund_value(values, Drops::new(12));
        assert_eq!(
            refund,
            values.reserve.saturating_add(values.fee).saturating_sub(Drops::new(12))
        );
    }

    #[test]
    fn verify_payment_accepts_exact_deposit() {
        let deposit = WalletAddress::new("rVault");
        let values = calc_deposit_values(8);
        let outcome = payment_outcome(&deposit, values.total(), true);
        assert_eq!(
            verify_payment(&outcome, &deposit, values).unwrap(),
            values.total()
        );
    }

    #[test]
    fn verify_payment_rejects_wrong_destination() {
        let values = calc_deposit_values(8);
        let outcome = payment_outcome(&WalletAddress::new("rElsewhere"), values.total(), true);
        let err = verify_payment(&outcome, &WalletAddress::new("rVault"), values).unwrap_err();
        assert!(err.is_domain());
    }

    #[test]
    fn verify_payment_rejects_short_amount() {
        let deposit = WalletAddress::new("rVault");
        let values = calc_deposit_values(8);
        let short = values.total().saturating_sub(Drops::new(1));
        let outcome = payment_outcome(&deposit, short, true);
        assert!(verify_payment(&outcome, &deposit, values).is_err());
    }

    #[test]
    fn verify_payment_rejects_failed_transaction() {
        let deposit = WalletAddress::new("rVault");
        let values = calc_deposit_values(8);
        let outcome = payment_outcome(&deposit, values.total(), false);
        assert!(verify_payment(&outcome, &deposit, values).is_err());
    }
}
