//! Event lifecycle endpoints.
//!
//! - `POST /api/events`: create an event (organizer)
//! - `GET /api/events`: list events
//! - `GET /api/events/{id}`: event details
//! - `GET /api/events/{id}/attendees`: attendee wallets
//! - `POST /api/events/{id}/payment`: confirm the deposit payment
//! - `POST /api/events/{id}/mint`: mint the supply (owner)
//! - `POST /api/events/{id}/cancel`: cancel a paid event (owner)
//! - `POST /api/events/{id}/close`: close an active event (owner)
//! - `POST /api/events/{id}/refund`: refund the deposit (owner)

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use mintpass_core::types::{
    Accounting, Drops, Event, EventDraft, EventId, EventStatus, WalletAddress,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AppError;
use crate::extract::AuthenticatedWallet;
use crate::state::AppState;
use crate::validate::{parse_confirm_payment, parse_create_event};

// ════════════════════════════════════════════════════════════════════════
// Response types
// ════════════════════════════════════════════════════════════════════════

/// Event details response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventResponse {
    /// Event id.
    pub id: u32,
    /// Owner wallet.
    pub owner: String,
    /// Network the event lives on.
    pub network: String,
    /// Lifecycle status.
    pub status: EventStatus,
    /// Title.
    pub title: String,
    /// Description.
    pub description: String,
    /// Location.
    pub location: String,
    /// Image URL.
    pub image_url: Option<String>,
    /// Token supply.
    pub token_count: u32,
    /// Metadata URI, once minted.
    pub uri: Option<String>,
    /// Start of the event.
    pub starts_at: DateTime<Utc>,
    /// End of the event.
    pub ends_at: DateTime<Utc>,
    /// Invite-only flag.
    pub is_managed: bool,
}

impl From<Event> for EventResponse {
    fn from(event: Event) -> Self {
        Self {
            id: event.id.get(),
            owner: event.owner.to_string(),
            network: event.network.to_string(),
            status: event.status,
            title: event.title,
            description: event.description,
            location: event.location,
            image_url: event.image_url,
            token_count: event.token_count,
            uri: event.uri,
            starts_at: event.starts_at,
            ends_at: event.ends_at,
            is_managed: event.is_managed,
        }
    }
}

/// Deposit details returned with a freshly created event.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositResponse {
    /// Address the deposit must be paid to.
    pub deposit_address: String,
    /// Reserve portion of the deposit, in drops.
    pub deposit_reserve: Drops,
    /// Fee portion of the deposit, in drops.
    pub deposit_fee: Drops,
}

impl From<Accounting> for DepositResponse {
    fn from(accounting: Accounting) -> Self {
        Self {
            deposit_address: accounting.deposit_address.to_string(),
            deposit_reserve: accounting.deposit_reserve,
            deposit_fee: accounting.deposit_fee,
        }
    }
}

/// Response after creating an event.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventResponse {
    /// The created event.
    pub event: EventResponse,
    /// Where and how much to pay.
    pub deposit: DepositResponse,
}

/// Query parameters for listing events.
#[derive(Debug, Deserialize)]
pub struct ListEventsQuery {
    /// Filter by status.
    pub status: Option<EventStatus>,
    /// Page size (default 20, max 100).
    pub limit: Option<u32>,
    /// Offset into the result set.
    pub offset: Option<u32>,
}

/// Response for listing events.
#[derive(Debug, Serialize)]
pub struct ListEventsResponse {
    /// Events, newest first.
    pub events: Vec<EventResponse>,
}

/// Attendee list response.
#[derive(Debug, Serialize)]
pub struct AttendeesResponse {
    /// Attendee wallets.
    pub attendees: Vec<String>,
}

// ════════════════════════════════════════════════════════════════════════
// Handlers
// ════════════════════════════════════════════════════════════════════════

fn event_id(raw: u32) -> EventId {
    EventId::new(raw)
}

/// Require the caller to own the event before a lifecycle operation.
async fn require_owner(
    state: &AppState,
    id: EventId,
    caller: &WalletAddress,
) -> Result<Event, AppError> {
    let event = state.service.get_event(id).await?;
    if &event.owner != caller {
        return Err(AppError::forbidden("only the event owner may do this"));
    }
    Ok(event)
}

/// Create a new event. The authenticated wallet becomes the owner.
///
/// # Errors
///
/// 422 on validation failure, 400 on domain rejection.
pub async fn create_event(
    auth: AuthenticatedWallet,
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<CreateEventResponse>), AppError> {
    let parsed = parse_create_event(&body).map_err(AppError::validation)?;

    let draft = EventDraft {
        title: parsed.title,
        description: parsed.description,
        location: parsed.location,
        image_url: parsed.image_url,
        token_count: parsed.token_count,
        starts_at: parsed.starts_at,
        ends_at: parsed.ends_at,
    };

    let event = state
        .service
        .create_event(&parsed.network, &auth.wallet, draft, parsed.is_managed)
        .await?;
    let accounting = state.service.get_accounting(event.id).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateEventResponse {
            event: event.into(),
            deposit: accounting.into(),
        }),
    ))
}

/// List events.
///
/// # Errors
///
/// 500 on store failure.
pub async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<ListEventsQuery>,
) -> Result<Json<ListEventsResponse>, AppError> {
    let limit = query.limit.unwrap_or(20).min(100);
    let events = state
        .service
        .list_events(query.status, limit, query.offset.unwrap_or(0))
        .await?;

    Ok(Json(ListEventsResponse {
        events: events.into_iter().map(EventResponse::from).collect(),
    }))
}

/// Event details.
///
/// # Errors
///
/// 404 for unknown events.
pub async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<u32>,
) -> Result<Json<EventResponse>, AppError> {
    let event = state.service.get_event(event_id(id)).await?;
    Ok(Json(event.into()))
}

/// Attendee wallets of an event.
///
/// # Errors
///
/// 404 for unknown events.
pub async fn attendees(
    State(state): State<AppState>,
    Path(id): Path<u32>,
) -> Result<Json<AttendeesResponse>, AppError> {
    let attendees = state.service.attendees(event_id(id)).await?;
    Ok(Json(AttendeesResponse {
        attendees: attendees.into_iter().map(|w| w.to_string()).collect(),
    }))
}

/// Confirm the deposit payment for an event.
///
/// # Errors
///
/// 422 on validation failure, 400 if the payment does not match.
pub async fn confirm_payment(
    auth: AuthenticatedWallet,
    State(state): State<AppState>,
    Path(id): Path<u32>,
    Json(body): Json<Value>,
) -> Result<Json<EventResponse>, AppError> {
    let parsed = parse_confirm_payment(&body).map_err(AppError::validation)?;
    require_owner(&state, event_id(id), &auth.wallet).await?;

    let event = state
        .service
        .confirm_payment(event_id(id), &parsed.tx_hash)
        .await?;
    Ok(Json(event.into()))
}

/// Mint the event's token supply.
///
/// # Errors
///
/// 403 for non-owners, 400 if the event is not ready to mint.
#[axum::debug_handler]
pub async fn mint_event(
    auth: AuthenticatedWallet,
    State(state): State<AppState>,
    Path(id): Path<u32>,
) -> Result<Json<EventResponse>, AppError> {
    require_owner(&state, event_id(id), &auth.wallet).await?;
    let event = state.service.mint_event(event_id(id)).await?;
    Ok(Json(event.into()))
}

/// Cancel a paid-but-unminted event.
///
/// # Errors
///
/// 403 for non-owners, 400 from the wrong status.
pub async fn cancel_event(
    auth: AuthenticatedWallet,
    State(state): State<AppState>,
    Path(id): Path<u32>,
) -> Result<Json<EventResponse>, AppError> {
    require_owner(&state, event_id(id), &auth.wallet).await?;
    let event = state.service.cancel_event(event_id(id)).await?;
    Ok(Json(event.into()))
}

/// Close an active event.
///
/// # Errors
///
/// 403 for non-owners, 400 from the wrong status.
pub async fn close_event(
    auth: AuthenticatedWallet,
    State(state): State<AppState>,
    Path(id): Path<u32>,
) -> Result<Json<EventResponse>, AppError> {
    require_owner(&state, event_id(id), &auth.wallet).await?;
    let event = state.service.close_event(event_id(id)).await?;
    Ok(Json(event.into()))
}

/// Refund the deposit of a closed event.
///
/// # Errors
///
/// 403 for non-owners, 409 if already refunded.
pub async fn refund_deposit(
    auth: AuthenticatedWallet,
    State(state): State<AppState>,
    Path(id): Path<u32>,
) -> Result<Json<EventResponse>, AppError> {
    require_owner(&state, event_id(id), &auth.wallet).await?;
    let event = state.service.refund_deposit(event_id(id)).await?;
    Ok(Json(event.into()))
}
