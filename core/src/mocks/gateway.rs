//! Mock gateway mapping network ids to mock ledgers.

use crate::error::{Error, Result};
use crate::mocks::MockLedger;
use crate::providers::{LedgerClient, LedgerGateway, NetworkConfig};
use crate::types::NetworkId;
use async_trait::async_trait;
use std::collections::HashMap;

/// Gateway over one or more [`MockLedger`] networks.
#[derive(Clone, Debug, Default)]
pub struct MockGateway {
    networks: HashMap<NetworkId, (NetworkConfig, MockLedger)>,
}

impl MockGateway {
    /// Creates an empty gateway; unknown networks are unsupported.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a network.
    #[must_use]
    pub fn with_network(mut self, config: NetworkConfig, ledger: MockLedger) -> Self {
        self.networks.insert(config.id.clone(), (config, ledger));
        self
    }
}

#[async_trait]
impl LedgerGateway for MockGateway {
    fn network(&self, id: &NetworkId) -> Result<NetworkConfig> {
        self.networks
            .get(id)
            .map(|(config, _)| config.clone())
            .ok_or_else(|| Error::UnsupportedNetwork(id.clone()))
    }

    async fn client(&self, id: &NetworkId) -> Result<Box<dyn LedgerClient>> {
        self.networks
            .get(id)
            .map(|(_, ledger)| Box::new(ledger.clone()) as Box<dyn LedgerClient>)
            .ok_or_else(|| Error::UnsupportedNetwork(id.clone()))
    }
}
