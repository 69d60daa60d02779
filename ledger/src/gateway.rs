//! Per-network gateway over HTTP endpoints.

use crate::client::JsonRpcLedger;
use async_trait::async_trait;
use mintpass_core::error::{Error, Result};
use mintpass_core::providers::{LedgerClient, LedgerGateway, NetworkConfig};
use mintpass_core::types::{Drops, NetworkId, WalletAddress};
use std::collections::HashMap;
use std::time::Duration;

/// Operator-supplied settings for one network.
#[derive(Clone, Debug)]
pub struct LedgerNetworkSettings {
    /// Network identifier.
    pub id: NetworkId,
    /// JSON-RPC endpoint URL (must be a trusted node; it signs with the
    /// vault secret).
    pub url: String,
    /// Vault account address.
    pub vault_address: WalletAddress,
    /// Vault signing secret, sent to the endpoint in sign-and-submit mode.
    pub vault_secret: String,
    /// Fallback minimum transaction fee in drops.
    pub fallback_fee: Drops,
    /// Finality poll interval.
    pub poll_interval: Duration,
    /// Optional cap on finality polls.
    pub max_poll_attempts: Option<u32>,
}

struct NetworkEntry {
    config: NetworkConfig,
    url: String,
    secret: String,
}

/// Gateway resolving network ids to JSON-RPC clients.
///
/// One shared `reqwest` client provides the connection pool at the HTTP
/// layer; logically each operation still opens and closes its own scoped
/// session via `with_client`.
pub struct HttpGateway {
    networks: HashMap<NetworkId, NetworkEntry>,
    http: reqwest::Client,
}

impl HttpGateway {
    /// Build a gateway from per-network settings.
    #[must_use]
    pub fn new(settings: Vec<LedgerNetworkSettings>) -> Self {
        let networks = settings
            .into_iter()
            .map(|s| {
                let config = NetworkConfig {
                    id: s.id.clone(),
                    vault: s.vault_address,
                    ticket_cap: NetworkConfig::DEFAULT_TICKET_CAP,
                    fallback_fee: s.fallback_fee,
                    poll_interval: s.poll_interval,
                    max_poll_attempts: s.max_poll_attempts,
                };
                (
                    s.id,
                    NetworkEntry {
                        config,
                        url: s.url,
                        secret: s.vault_secret,
                    },
                )
            })
            .collect();

        Self {
            networks,
            http: reqwest::Client::new(),
        }
    }

    /// The configured network ids.
    pub fn network_ids(&self) -> impl Iterator<Item = &NetworkId> {
        self.networks.keys()
    }
}

#[async_trait]
impl LedgerGateway for HttpGateway {
    fn network(&self, id: &NetworkId) -> Result<NetworkConfig> {
        self.networks
            .get(id)
            .map(|entry| entry.config.clone())
            .ok_or_else(|| Error::UnsupportedNetwork(id.clone()))
    }

    async fn client(&self, id: &NetworkId) -> Result<Box<dyn LedgerClient>> {
        let entry = self
            .networks
            .get(id)
            .ok_or_else(|| Error::UnsupportedNetwork(id.clone()))?;

        Ok(Box::new(JsonRpcLedger::new(
            self.http.clone(),
            entry.url.clone(),
            entry.secret.clone(),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(id: &str) -> LedgerNetworkSettings {
        LedgerNetworkSettings {
            id: NetworkId::new(id),
            url: "http://localhost:5005".to_string(),
            vault_address: WalletAddress::new("rVault"),
            vault_secret: "shhh".to_string(),
            fallback_fee: Drops::new(12),
            poll_interval: Duration::from_secs(4),
            max_poll_attempts: None,
        }
    }

    #[test]
    fn unknown_networks_are_unsupported() {
        let gateway = HttpGateway::new(vec![settings("testnet")]);
        assert!(gateway.network(&NetworkId::new("testnet")).is_ok());
        assert!(matches!(
            gateway.network(&NetworkId::new("mainnet")),
            Err(Error::UnsupportedNetwork(_))
        ));
    }

    #[tokio::test]
    async fn clients_resolve_per_network() {
        let gateway = HttpGateway::new(vec![settings("devnet")]);
        assert!(gateway.client(&NetworkId::new("devnet")).await.is_ok());
        assert!(gateway.client(&NetworkId::new("moonnet")).await.is_err());
    }
}
