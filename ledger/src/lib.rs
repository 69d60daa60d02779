//! # Mintpass Ledger
//!
//! JSON-RPC implementation of the core ledger boundary: a [`JsonRpcLedger`]
//! client speaking the ledger's HTTP API and an [`HttpGateway`] resolving
//! network ids to configured clients.
//!
//! Transactions are signed server-side in sign-and-submit mode using the
//! network's vault secret, which requires the configured endpoint to be a
//! trusted node (typically one operated alongside this service). Transport
//! failures are retried with bounded backoff before surfacing.

mod client;
mod gateway;
mod rpc;

pub use client::JsonRpcLedger;
pub use gateway::{HttpGateway, LedgerNetworkSettings};
