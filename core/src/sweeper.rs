//! Background sweeper: periodically settles claims whose sell offers have
//! been accepted on-chain, so claim state converges even when nobody polls
//! `get_claim`.

use crate::error::Result;
use crate::providers::{LedgerGateway, Store, with_client};
use crate::types::{Claim, NetworkId};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Periodic claim reconciler.
pub struct Sweeper {
    store: Arc<dyn Store>,
    gateway: Arc<dyn LedgerGateway>,
    interval: Duration,
}

impl Sweeper {
    /// Creates a sweeper ticking at `interval`.
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        gateway: Arc<dyn LedgerGateway>,
        interval: Duration,
    ) -> Self {
        Self {
            store,
            gateway,
            interval,
        }
    }

    /// Run forever. Tick failures are logged and never end the loop;
    /// callers stop the sweeper by aborting its task on shutdown.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            match self.tick().await {
                Ok(0) => {}
                Ok(settled) => {
                    tracing::info!(settled, "sweeper settled claims");
                }
                Err(err) => {
                    tracing::warn!(error = %err, "claim sweep failed");
                }
            }
        }
    }

    /// One reconciliation pass; returns the number of claims settled.
    ///
    /// Pending claims are grouped by network so each network's endpoint is
    /// dialed once per pass. A claim settles when its recorded sell offer
    /// no longer exists on-chain.
    ///
    /// # Errors
    ///
    /// Returns the first store or ledger error encountered; claims already
    /// settled in this pass stay settled.
    pub async fn tick(&self) -> Result<u64> {
        let mut by_network: HashMap<NetworkId, Vec<Claim>> = HashMap::new();
        for (claim, network) in self.store.pending_claims().await? {
            by_network.entry(network).or_default().push(claim);
        }

        let mut settled = 0u64;
        for (network, claims) in by_network {
            let accepted =
                with_client(self.gateway.as_ref(), &network, async |client| {
                    let mut accepted = Vec::new();
                    for claim in &claims {
                        let Some(offer_index) = &claim.offer_index else {
                            continue;
                        };
                        let offers = client.sell_offers(&claim.token_id).await?;
                        if !offers.iter().any(|offer| &offer.index == offer_index) {
                            accepted.push(claim.id);
                        }
                    }
                    Ok(accepted)
                })
                .await?;

            for claim_id in accepted {
                self.store.mark_claimed(claim_id).await?;
                settled += 1;
            }
        }

        if settled > 0 {
            metrics::counter!("mintpass.sweeper.claims_settled").increment(settled);
        }
        Ok(settled)
    }
}
