//! Authenticated-wallet extractor.
//!
//! Bearer-credential verification happens upstream (auth proxy or
//! middleware outside this service); handlers only ever see the verified
//! wallet address and its capability set, forwarded in trusted headers.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
};
use mintpass_core::types::WalletAddress;

use crate::error::AppError;

/// Verified caller identity.
#[derive(Clone, Debug)]
pub struct AuthenticatedWallet {
    /// The verified wallet address.
    pub wallet: WalletAddress,
    /// Granted capabilities (e.g. `organizer`, `admin`).
    pub capabilities: Vec<String>,
}

impl AuthenticatedWallet {
    /// Whether the caller holds a capability.
    #[must_use]
    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.iter().any(|c| c == capability)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedWallet
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let wallet = parts
            .headers
            .get("X-Wallet-Address")
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| AppError::unauthorized("missing verified wallet identity"))?;

        let capabilities = parts
            .headers
            .get("X-Wallet-Capabilities")
            .and_then(|value| value.to_str().ok())
            .map(|value| {
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            wallet: WalletAddress::new(wallet),
            capabilities,
        })
    }
}
