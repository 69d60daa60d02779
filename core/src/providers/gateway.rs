//! Per-network gateway: configuration lookup and scoped client acquisition.

use crate::error::{Error, Result};
use crate::providers::ledger::LedgerClient;
use crate::types::{Drops, NetworkId, WalletAddress};
use async_trait::async_trait;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Static configuration for one ledger network.
#[derive(Clone, Debug)]
pub struct NetworkConfig {
    /// Network identifier.
    pub id: NetworkId,
    /// Custodial signing account for this network.
    pub vault: WalletAddress,
    /// Hard cap on tickets reservable in one call.
    pub ticket_cap: u32,
    /// Fallback minimum transaction fee, subtracted from refunds so the
    /// deposit address can always afford the refund transaction itself.
    pub fallback_fee: Drops,
    /// Finality poll interval; approximately one ledger-close period.
    pub poll_interval: Duration,
    /// Optional cap on finality polls before giving up.
    pub max_poll_attempts: Option<u32>,
}

impl NetworkConfig {
    /// Default ticket cap shared by all supported networks.
    pub const DEFAULT_TICKET_CAP: u32 = 250;

    /// A config with the standard cap, fee, and poll cadence.
    #[must_use]
    pub fn standard(id: NetworkId, vault: WalletAddress) -> Self {
        Self {
            id,
            vault,
            ticket_cap: Self::DEFAULT_TICKET_CAP,
            fallback_fee: Drops::new(12),
            poll_interval: Duration::from_secs(4),
            max_poll_attempts: None,
        }
    }
}

/// Resolves a network id to its configuration and a connected client.
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    /// Configuration for a network.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedNetwork`] if the id is not configured.
    fn network(&self, id: &NetworkId) -> Result<NetworkConfig>;

    /// A client bound to the network's endpoint and vault credential.
    ///
    /// The client is not yet connected; use [`with_client`] so the
    /// connect/disconnect lifecycle is always honored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedNetwork`] if the id is not configured.
    async fn client(&self, id: &NetworkId) -> Result<Box<dyn LedgerClient>>;
}

/// Run `op` against a freshly connected client, always disconnecting
/// afterwards, including when `op` returns an error.
///
/// The gateway is stateless between calls (no pooling), so every network
/// I/O sequence must own its own connection lifecycle.
///
/// # Errors
///
/// Propagates gateway, connect, and `op` errors. Disconnect failures are
/// logged and swallowed; they cannot mask the operation's result.
pub async fn with_client<T, F>(
    gateway: &dyn LedgerGateway,
    network: &NetworkId,
    op: F,
) -> Result<T>
where
    F: for<'a> FnOnce(&'a dyn LedgerClient) -> Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>,
{
    let client = gateway.client(network).await?;
    client.connect().await.map_err(Error::from)?;

    let result = op(client.as_ref()).await;

    if let Err(err) = client.disconnect().await {
        tracing::warn!(network = %network, error = %err, "ledger disconnect failed");
    }

    result
}
