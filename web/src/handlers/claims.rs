//! Join and claim endpoints.
//!
//! - `POST /api/events/{id}/join`: join an event (or invite, for owners)
//! - `GET /api/events/{id}/claim`: claim status with on-read
//!   reconciliation

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use mintpass_core::types::{Claim, EventId};
use serde::Serialize;
use serde_json::Value;

use crate::error::AppError;
use crate::extract::AuthenticatedWallet;
use crate::state::AppState;
use crate::validate::parse_join;

/// Claim details response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimResponse {
    /// Claim id.
    pub id: String,
    /// Claiming wallet.
    pub wallet: String,
    /// Claimed token id.
    pub token_id: String,
    /// Sell-offer index, once created.
    pub offer_index: Option<String>,
    /// Whether the offer has been accepted on-chain.
    pub claimed: bool,
}

impl From<Claim> for ClaimResponse {
    fn from(claim: Claim) -> Self {
        Self {
            id: claim.id.to_string(),
            wallet: claim.wallet.to_string(),
            token_id: claim.token_id.to_string(),
            offer_index: claim.offer_index.map(|index| index.to_string()),
            claimed: claim.claimed,
        }
    }
}

/// Join an event, claiming one token.
///
/// The caller joins themselves; an event owner may instead pass a `wallet`
/// to invite someone into a managed event (invites bypass the join
/// policy).
///
/// # Errors
///
/// 400 for full/private/inactive events and duplicate joins, 403 when a
/// non-owner tries to invite someone else.
pub async fn join_event(
    auth: AuthenticatedWallet,
    State(state): State<AppState>,
    Path(id): Path<u32>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<ClaimResponse>), AppError> {
    let parsed = parse_join(&body).map_err(AppError::validation)?;
    let event_id = EventId::new(id);

    let (wallet, enforce_join_policy) = match parsed.wallet {
        Some(invited) if invited != auth.wallet => {
            let event = state.service.get_event(event_id).await?;
            if event.owner != auth.wallet {
                return Err(AppError::forbidden(
                    "only the event owner may invite other wallets",
                ));
            }
            // Owner-driven invites skip the invite-only policy.
            (invited, false)
        }
        _ => (auth.wallet, true),
    };

    let claim = state
        .service
        .join_event(event_id, &wallet, parsed.create_offer, enforce_join_policy)
        .await?;

    Ok((StatusCode::CREATED, Json(claim.into())))
}

/// The caller's claim on an event, reconciled against the ledger.
///
/// # Errors
///
/// 404 if the caller holds no claim on the event.
pub async fn get_claim(
    auth: AuthenticatedWallet,
    State(state): State<AppState>,
    Path(id): Path<u32>,
) -> Result<Json<ClaimResponse>, AppError> {
    let claim = state
        .service
        .get_claim(&auth.wallet, EventId::new(id))
        .await?;
    Ok(Json(claim.into()))
}
