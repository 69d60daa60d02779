//! Profile endpoints.
//!
//! - `GET /api/users/me`: the caller's profile
//! - `PUT /api/users/me`: create or update the caller's profile

use axum::{Json, extract::State};
use mintpass_core::types::User;
use serde::Serialize;
use serde_json::Value;

use crate::error::AppError;
use crate::extract::AuthenticatedWallet;
use crate::state::AppState;
use crate::validate::parse_profile;

/// Profile response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    /// Wallet address.
    pub wallet: String,
    /// First name.
    pub first_name: Option<String>,
    /// Last name.
    pub last_name: Option<String>,
    /// Contact email.
    pub email: Option<String>,
    /// Organizer flag.
    pub is_organizer: bool,
    /// Admin flag.
    pub is_admin: bool,
    /// Slots quota.
    pub slots: u32,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            wallet: user.wallet.to_string(),
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            is_organizer: user.is_organizer,
            is_admin: user.is_admin,
            slots: user.slots,
        }
    }
}

/// The caller's profile.
///
/// # Errors
///
/// 404 if the wallet has never logged in.
pub async fn get_me(
    auth: AuthenticatedWallet,
    State(state): State<AppState>,
) -> Result<Json<UserResponse>, AppError> {
    let user = state.service.get_user(&auth.wallet).await?;
    Ok(Json(user.into()))
}

/// Create or update the caller's profile fields.
///
/// Role flags and the slots quota are managed out of band; this endpoint
/// touches profile fields only.
///
/// # Errors
///
/// 422 on validation failure.
pub async fn put_me(
    auth: AuthenticatedWallet,
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<UserResponse>, AppError> {
    let parsed = parse_profile(&body).map_err(AppError::validation)?;
    let user = state
        .service
        .upsert_profile(&auth.wallet, parsed.first_name, parsed.last_name, parsed.email)
        .await?;
    Ok(Json(user.into()))
}
