//! [`LedgerClient`] implementation over the ledger's JSON-RPC API.

use crate::rpc::{CallError, RpcClient};
use async_trait::async_trait;
use mintpass_core::error::LedgerError;
use mintpass_core::providers::{
    LedgerClient, LedgerToken, Page, ReserveParams, SellOffer, Submission, TxEffect, TxOutcome,
    TxSpec, TxStatus,
};
use mintpass_core::types::{Drops, OfferIndex, TicketSequence, TokenId, TxHash, WalletAddress};
use serde_json::{Value, json};

/// Client bound to one network endpoint and its vault credential.
///
/// Runs in sign-and-submit mode: transaction intents are sent with the
/// vault secret and signed by the endpoint, so the endpoint must be a
/// trusted node. HTTP itself is stateless; `connect` probes the endpoint
/// and `disconnect` is a no-op, which matches the one-connection-per-call
/// contract of the gateway.
#[derive(Clone, Debug)]
pub struct JsonRpcLedger {
    rpc: RpcClient,
    vault_secret: String,
}

impl JsonRpcLedger {
    /// Creates a client for `url`, signing with `vault_secret`.
    #[must_use]
    pub fn new(http: reqwest::Client, url: String, vault_secret: String) -> Self {
        Self {
            rpc: RpcClient::new(http, url),
            vault_secret,
        }
    }

    fn tx_json(spec: &TxSpec) -> Value {
        match spec {
            TxSpec::TicketCreate { account, count } => json!({
                "TransactionType": "TicketCreate",
                "Account": account.as_str(),
                "TicketCount": count,
            }),
            TxSpec::NftMint {
                account,
                taxon,
                uri,
                ticket_sequence,
            } => json!({
                "TransactionType": "NFTokenMint",
                "Account": account.as_str(),
                "NFTokenTaxon": taxon,
                "URI": hex_upper(uri.as_bytes()),
                "TicketSequence": ticket_sequence.get(),
                // Ticketed transactions carry an explicit zero sequence.
                "Sequence": 0,
                "Flags": 8, // transferable
            }),
            TxSpec::SellOfferCreate {
                account,
                token_id,
                destination,
                amount,
            } => json!({
                "TransactionType": "NFTokenCreateOffer",
                "Account": account.as_str(),
                "NFTokenID": token_id.as_str(),
                "Amount": amount.to_string(),
                "Destination": destination.as_str(),
                "Flags": 1, // sell offer
            }),
            TxSpec::NftBurn { account, token_id } => json!({
                "TransactionType": "NFTokenBurn",
                "Account": account.as_str(),
                "NFTokenID": token_id.as_str(),
            }),
            TxSpec::Payment {
                source,
                destination,
                amount,
            } => json!({
                "TransactionType": "Payment",
                "Account": source.as_str(),
                "Destination": destination.as_str(),
                "Amount": amount.to_string(),
            }),
        }
    }
}

#[async_trait]
impl LedgerClient for JsonRpcLedger {
    async fn connect(&self) -> Result<(), LedgerError> {
        self.rpc
            .call("server_state", json!({}))
            .await
            .map(|_| ())
            .map_err(|err| match err {
                CallError::Ledger(inner) => inner,
                api => LedgerError::Connection(api.into_ledger("server_state").to_string()),
            })
    }

    async fn disconnect(&self) -> Result<(), LedgerError> {
        Ok(())
    }

    async fn submit(&self, tx: &TxSpec) -> Result<Submission, LedgerError> {
        let result = self
            .rpc
            .call(
                "submit",
                json!({
                    "tx_json": Self::tx_json(tx),
                    "secret": self.vault_secret,
                    "fail_hard": true,
                }),
            )
            .await
            .map_err(|err| err.into_ledger("submit"))?;

        parse_submission(&result)
    }

    async fn tx_status(&self, hash: &TxHash) -> Result<TxStatus, LedgerError> {
        let result = self
            .rpc
            .call(
                "tx",
                json!({ "transaction": hash.as_str(), "binary": false }),
            )
            .await;

        match result {
            Ok(value) => {
                if value.get("validated").and_then(Value::as_bool) != Some(true) {
                    return Ok(TxStatus::Pending);
                }
                Ok(TxStatus::Validated(parse_outcome(hash, &value)?))
            }
            // Not found yet: the expected pre-finality state.
            Err(err) if err.code() == Some("txnNotFound") => Ok(TxStatus::Pending),
            Err(err) => Err(err.into_ledger("tx")),
        }
    }

    async fn ledger_index(&self) -> Result<u32, LedgerError> {
        let result = self
            .rpc
            .call("ledger", json!({ "ledger_index": "validated" }))
            .await
            .map_err(|err| err.into_ledger("ledger"))?;

        u32_field(&result, "ledger_index")
            .or_else(|_| {
                result
                    .get("ledger")
                    .map_or(Err(LedgerError::Malformed("missing ledger_index".into())), |l| {
                        u32_field(l, "ledger_index")
                    })
            })
    }

    async fn reserve_params(&self) -> Result<ReserveParams, LedgerError> {
        let result = self
            .rpc
            .call("server_state", json!({}))
            .await
            .map_err(|err| err.into_ledger("server_state"))?;

        let ledger = result
            .pointer("/state/validated_ledger")
            .ok_or_else(|| LedgerError::Malformed("missing validated_ledger state".into()))?;

        Ok(ReserveParams {
            base: drops_field(ledger, "reserve_base")?,
            per_item: drops_field(ledger, "reserve_inc")?,
        })
    }

    async fn balance(&self, account: &WalletAddress) -> Result<Drops, LedgerError> {
        let result = self
            .rpc
            .call(
                "account_info",
                json!({ "account": account.as_str(), "ledger_index": "validated" }),
            )
            .await;

        match result {
            Ok(value) => {
                let data = value
                    .get("account_data")
                    .ok_or_else(|| LedgerError::Malformed("missing account_data".into()))?;
                drops_field(data, "Balance")
            }
            Err(err) if err.code() == Some("actNotFound") => {
                Err(LedgerError::AccountNotFound(account.clone()))
            }
            Err(err) => Err(err.into_ledger("account_info")),
        }
    }

    async fn account_exists(&self, account: &WalletAddress) -> Result<bool, LedgerError> {
        match self.balance(account).await {
            Ok(_) => Ok(true),
            Err(LedgerError::AccountNotFound(_)) => Ok(false),
            Err(err) => Err(err),
        }
    }

    async fn tickets(
        &self,
        account: &WalletAddress,
        marker: Option<String>,
    ) -> Result<Page<TicketSequence>, LedgerError> {
        let mut params = json!({
            "account": account.as_str(),
            "type": "ticket",
            "ledger_index": "validated",
        });
        if let Some(marker) = marker {
            params["marker"] = Value::String(marker);
        }

        let result = self
            .rpc
            .call("account_objects", params)
            .await
            .map_err(|err| err.into_ledger("account_objects"))?;

        let items = result
            .get("account_objects")
            .and_then(Value::as_array)
            .map(|objects| {
                objects
                    .iter()
                    .filter_map(|object| {
                        object
                            .get("TicketSequence")
                            .and_then(Value::as_u64)
                            .and_then(|seq| u32::try_from(seq).ok())
                            .map(TicketSequence::new)
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(Page {
            items,
            marker: marker_of(&result),
        })
    }

    async fn account_tokens(
        &self,
        account: &WalletAddress,
        marker: Option<String>,
    ) -> Result<Page<LedgerToken>, LedgerError> {
        let mut params = json!({ "account": account.as_str(), "ledger_index": "validated" });
        if let Some(marker) = marker {
            params["marker"] = Value::String(marker);
        }

        let result = self
            .rpc
            .call("account_nfts", params)
            .await
            .map_err(|err| err.into_ledger("account_nfts"))?;

        let items = result
            .get("account_nfts")
            .and_then(Value::as_array)
            .map(|tokens| {
                tokens
                    .iter()
                    .filter_map(|token| {
                        let token_id = token.get("NFTokenID").and_then(Value::as_str)?;
                        let issuer = token.get("Issuer").and_then(Value::as_str)?;
                        let taxon = token
                            .get("NFTokenTaxon")
                            .and_then(Value::as_u64)
                            .and_then(|t| u32::try_from(t).ok())?;
                        Some(LedgerToken {
                            token_id: TokenId::new(token_id),
                            issuer: WalletAddress::new(issuer),
                            taxon,
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(Page {
            items,
            marker: marker_of(&result),
        })
    }

    async fn sell_offers(&self, token: &TokenId) -> Result<Vec<SellOffer>, LedgerError> {
        let result = self
            .rpc
            .call("nft_sell_offers", json!({ "nft_id": token.as_str() }))
            .await;

        match result {
            Ok(value) => Ok(parse_sell_offers(&value)),
            // A token with no offers is not an error.
            Err(err) if err.code() == Some("objectNotFound") => Ok(Vec::new()),
            Err(err) => Err(err.into_ledger("nft_sell_offers")),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════
// Response parsing
// ════════════════════════════════════════════════════════════════════════

fn parse_submission(result: &Value) -> Result<Submission, LedgerError> {
    let engine_result = result
        .get("engine_result")
        .and_then(Value::as_str)
        .ok_or_else(|| LedgerError::Malformed("submit without engine_result".into()))?
        .to_string();

    let tx_json = result
        .get("tx_json")
        .ok_or_else(|| LedgerError::Malformed("submit without tx_json".into()))?;
    let hash = tx_json
        .get("hash")
        .and_then(Value::as_str)
        .ok_or_else(|| LedgerError::Malformed("submitted tx without hash".into()))?;
    let last_ledger_sequence = u32_field(tx_json, "LastLedgerSequence").or_else(|_| {
        // Endpoints that do not autofill report the current index instead.
        u32_field(result, "validated_ledger_index").map(|index| index + 20)
    })?;

    let engine_ok = engine_result.starts_with("tes") || engine_result == "terQUEUED";

    Ok(Submission {
        hash: TxHash::new(hash),
        last_ledger_sequence,
        engine_ok,
        engine_result,
    })
}

/// Build the validated outcome from a `tx` response.
///
/// The effect log is extracted from transaction metadata in ledger order:
/// created ticket objects and created sell-offer objects are taken from
/// `AffectedNodes`; the minted token id is reported by the ledger as
/// `meta.nftoken_id`.
fn parse_outcome(hash: &TxHash, value: &Value) -> Result<TxOutcome, LedgerError> {
    let meta = value
        .get("meta")
        .ok_or_else(|| LedgerError::Malformed("validated tx without meta".into()))?;
    let result_code = meta
        .get("TransactionResult")
        .and_then(Value::as_str)
        .ok_or_else(|| LedgerError::Malformed("meta without TransactionResult".into()))?
        .to_string();

    let fee = value
        .get("Fee")
        .and_then(Value::as_str)
        .and_then(|fee| fee.parse().ok())
        .map_or(Drops::ZERO, Drops::new);

    let delivered = meta
        .get("delivered_amount")
        .and_then(Value::as_str)
        .and_then(|amount| amount.parse().ok())
        .map(Drops::new);
    let destination = value
        .get("Destination")
        .and_then(Value::as_str)
        .map(WalletAddress::new);

    let mut effects = Vec::new();
    if let Some(nodes) = meta.get("AffectedNodes").and_then(Value::as_array) {
        for node in nodes {
            let Some(created) = node.get("CreatedNode") else {
                continue;
            };
            match created.get("LedgerEntryType").and_then(Value::as_str) {
                Some("Ticket") => {
                    if let Some(sequence) = created
                        .pointer("/NewFields/TicketSequence")
                        .and_then(Value::as_u64)
                        .and_then(|seq| u32::try_from(seq).ok())
                    {
                        effects.push(TxEffect::TicketCreated(TicketSequence::new(sequence)));
                    }
                }
                Some("NFTokenOffer") => {
                    if let Some(index) = created.get("LedgerIndex").and_then(Value::as_str) {
                        effects.push(TxEffect::OfferCreated(OfferIndex::new(index)));
                    }
                }
                _ => {}
            }
        }
    }
    if let Some(token_id) = meta.get("nftoken_id").and_then(Value::as_str) {
        effects.push(TxEffect::TokenMinted(TokenId::new(token_id)));
    }

    Ok(TxOutcome {
        hash: hash.clone(),
        success: result_code == "tesSUCCESS",
        result_code,
        fee,
        delivered,
        destination,
        effects,
    })
}

fn parse_sell_offers(value: &Value) -> Vec<SellOffer> {
    value
        .get("offers")
        .and_then(Value::as_array)
        .map(|offers| {
            offers
                .iter()
                .filter_map(|offer| {
                    let index = offer.get("nft_offer_index").and_then(Value::as_str)?;
                    let amount = offer
                        .get("amount")
                        .and_then(Value::as_str)
                        .and_then(|amount| amount.parse().ok())
                        .map_or(Drops::ZERO, Drops::new);
                    Some(SellOffer {
                        index: OfferIndex::new(index),
                        destination: offer
                            .get("destination")
                            .and_then(Value::as_str)
                            .map(WalletAddress::new),
                        amount,
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

fn marker_of(result: &Value) -> Option<String> {
    match result.get("marker") {
        Some(Value::String(marker)) => Some(marker.clone()),
        // Some endpoints return structured markers; pass them back opaque.
        Some(other) if !other.is_null() => Some(other.to_string()),
        _ => None,
    }
}

fn u32_field(value: &Value, field: &str) -> Result<u32, LedgerError> {
    value
        .get(field)
        .and_then(Value::as_u64)
        .and_then(|raw| u32::try_from(raw).ok())
        .ok_or_else(|| LedgerError::Malformed(format!("missing or invalid {field}")))
}

fn drops_field(value: &Value, field: &str) -> Result<Drops, LedgerError> {
    let raw = value
        .get(field)
        .ok_or_else(|| LedgerError::Malformed(format!("missing {field}")))?;
    match raw {
        Value::String(text) => text
            .parse()
            .map(Drops::new)
            .map_err(|_| LedgerError::Malformed(format!("non-numeric {field}"))),
        Value::Number(number) => number
            .as_u64()
            .map(|n| Drops::new(u128::from(n)))
            .ok_or_else(|| LedgerError::Malformed(format!("non-integer {field}"))),
        _ => Err(LedgerError::Malformed(format!("unexpected {field} shape"))),
    }
}

fn hex_upper(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push_str(&format!("{byte:02X}"));
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn outcome_extracts_effects_in_ledger_order() {
        let hash = TxHash::new("AA11");
        let value = json!({
            "Fee": "12",
            "validated": true,
            "meta": {
                "TransactionResult": "tesSUCCESS",
                "AffectedNodes": [
                    { "ModifiedNode": { "LedgerEntryType": "AccountRoot" } },
                    { "CreatedNode": {
                        "LedgerEntryType": "Ticket",
                        "NewFields": { "TicketSequence": 101 }
                    }},
                    { "CreatedNode": {
                        "LedgerEntryType": "Ticket",
                        "NewFields": { "TicketSequence": 102 }
                    }},
                ]
            }
        });

        let outcome = parse_outcome(&hash, &value).unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.fee, Drops::new(12));
        assert_eq!(
            outcome.effects,
            vec![
                TxEffect::TicketCreated(TicketSequence::new(101)),
                TxEffect::TicketCreated(TicketSequence::new(102)),
            ]
        );
    }

    #[test]
    fn outcome_reports_minted_token_and_payment_fields() {
        let hash = TxHash::new("BB22");
        let value = json!({
            "Fee": "12",
            "Destination": "rReceiver",
            "validated": true,
            "meta": {
                "TransactionResult": "tesSUCCESS",
                "delivered_amount": "17000000",
                "nftoken_id": "0008ABCD",
                "AffectedNodes": []
            }
        });

        let outcome = parse_outcome(&hash, &value).unwrap();
        assert_eq!(outcome.delivered, Some(Drops::new(17_000_000)));
        assert_eq!(outcome.destination, Some(WalletAddress::new("rReceiver")));
        assert_eq!(
            outcome.effects,
            vec![TxEffect::TokenMinted(TokenId::new("0008ABCD"))]
        );
    }

    #[test]
    fn failed_outcome_keeps_its_code() {
        let hash = TxHash::new("CC33");
        let value = json!({
            "Fee": "12",
            "validated": true,
            "meta": { "TransactionResult": "tecNO_PERMISSION", "AffectedNodes": [] }
        });

        let outcome = parse_outcome(&hash, &value).unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.result_code, "tecNO_PERMISSION");
    }

    #[test]
    fn submission_parses_engine_result() {
        let value = json!({
            "engine_result": "tesSUCCESS",
            "tx_json": { "hash": "DD44", "LastLedgerSequence": 7123 }
        });

        let submission = parse_submission(&value).unwrap();
        assert!(submission.engine_ok);
        assert_eq!(submission.hash, TxHash::new("DD44"));
        assert_eq!(submission.last_ledger_sequence, 7123);
    }

    #[test]
    fn rejected_submission_is_not_engine_ok() {
        let value = json!({
            "engine_result": "temBAD_FEE",
            "tx_json": { "hash": "EE55", "LastLedgerSequence": 7123 }
        });

        let submission = parse_submission(&value).unwrap();
        assert!(!submission.engine_ok);
    }

    #[test]
    fn sell_offers_parse_destination_and_amount() {
        let value = json!({
            "offers": [
                { "nft_offer_index": "OFF1", "destination": "rAlice", "amount": "0" },
                { "nft_offer_index": "OFF2", "amount": "5000" },
            ]
        });

        let offers = parse_sell_offers(&value);
        assert_eq!(offers.len(), 2);
        assert_eq!(offers[0].destination, Some(WalletAddress::new("rAlice")));
        assert_eq!(offers[1].amount, Drops::new(5000));
    }

    #[test]
    fn uri_hex_encoding_is_uppercase() {
        assert_eq!(hex_upper(b"ipfs://x"), "697066733A2F2F78");
    }
}
