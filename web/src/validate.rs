//! Request validation as a pure function pipeline.
//!
//! Each endpoint parses untyped JSON into a typed request struct and
//! returns either the value or a structured list of field errors: a
//! tagged-union result, not annotations on the types.

use chrono::{DateTime, Utc};
use mintpass_core::types::{NetworkId, TxHash, WalletAddress};
use serde::Serialize;
use serde_json::Value;

/// One rejected field.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct FieldError {
    /// Field path in the request body.
    pub field: String,
    /// What was wrong with it.
    pub message: String,
}

impl FieldError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Result of a validation pipeline: the typed value or the field errors.
pub type Validated<T> = Result<T, Vec<FieldError>>;

/// Validated body of `POST /api/events`.
#[derive(Clone, Debug)]
pub struct CreateEventBody {
    /// Target ledger network.
    pub network: NetworkId,
    /// Event title.
    pub title: String,
    /// Event description.
    pub description: String,
    /// Venue or location text.
    pub location: String,
    /// Optional image URL.
    pub image_url: Option<String>,
    /// Token supply to mint.
    pub token_count: u32,
    /// Start of the event.
    pub starts_at: DateTime<Utc>,
    /// End of the event.
    pub ends_at: DateTime<Utc>,
    /// Invite-only flag.
    pub is_managed: bool,
}

/// Validated body of `POST /api/events/{id}/payment`.
#[derive(Clone, Debug)]
pub struct ConfirmPaymentBody {
    /// Hash of the deposit payment transaction.
    pub tx_hash: TxHash,
}

/// Validated body of `POST /api/events/{id}/join`.
#[derive(Clone, Debug)]
pub struct JoinBody {
    /// Wallet to invite; defaults to the caller.
    pub wallet: Option<WalletAddress>,
    /// Whether to create the sell offer immediately.
    pub create_offer: bool,
}

/// Validated body of `PUT /api/users/me`.
#[derive(Clone, Debug)]
pub struct ProfileBody {
    /// First name.
    pub first_name: Option<String>,
    /// Last name.
    pub last_name: Option<String>,
    /// Contact email.
    pub email: Option<String>,
}

// ════════════════════════════════════════════════════════════════════════
// Field helpers
// ════════════════════════════════════════════════════════════════════════

fn required_str<'a>(
    body: &'a Value,
    field: &str,
    max_len: usize,
    errors: &mut Vec<FieldError>,
) -> Option<&'a str> {
    match body.get(field).and_then(Value::as_str) {
        Some(text) if text.trim().is_empty() => {
            errors.push(FieldError::new(field, "must not be empty"));
            None
        }
        Some(text) if text.len() > max_len => {
            errors.push(FieldError::new(
                field,
                format!("must be at most {max_len} characters"),
            ));
            None
        }
        Some(text) => Some(text),
        None => {
            errors.push(FieldError::new(field, "is required"));
            None
        }
    }
}

fn optional_str(
    body: &Value,
    field: &str,
    max_len: usize,
    errors: &mut Vec<FieldError>,
) -> Option<String> {
    match body.get(field) {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) if text.len() > max_len => {
            errors.push(FieldError::new(
                field,
                format!("must be at most {max_len} characters"),
            ));
            None
        }
        Some(Value::String(text)) => Some(text.clone()),
        Some(_) => {
            errors.push(FieldError::new(field, "must be a string"));
            None
        }
    }
}

fn required_date(
    body: &Value,
    field: &str,
    errors: &mut Vec<FieldError>,
) -> Option<DateTime<Utc>> {
    match body.get(field).and_then(Value::as_str) {
        Some(raw) => match DateTime::parse_from_rfc3339(raw) {
            Ok(date) => Some(date.with_timezone(&Utc)),
            Err(_) => {
                errors.push(FieldError::new(field, "must be an RFC 3339 timestamp"));
                None
            }
        },
        None => {
            errors.push(FieldError::new(field, "is required"));
            None
        }
    }
}

// ════════════════════════════════════════════════════════════════════════
// Endpoint pipelines
// ════════════════════════════════════════════════════════════════════════

/// Parse and validate an event-creation request.
///
/// # Errors
///
/// Returns the full list of field errors; validation does not stop at the
/// first failure.
pub fn parse_create_event(body: &Value) -> Validated<CreateEventBody> {
    let mut errors = Vec::new();

    let network = required_str(body, "network", 64, &mut errors).map(NetworkId::new);
    let title = required_str(body, "title", 256, &mut errors).map(str::to_string);
    let description = optional_str(body, "description", 4000, &mut errors).unwrap_or_default();
    let location = optional_str(body, "location", 256, &mut errors).unwrap_or_default();
    let image_url = optional_str(body, "imageUrl", 2048, &mut errors);

    let token_count = match body.get("tokenCount").and_then(Value::as_u64) {
        Some(count @ 1..=250) => u32::try_from(count).ok(),
        Some(_) => {
            errors.push(FieldError::new("tokenCount", "must be between 1 and 250"));
            None
        }
        None => {
            errors.push(FieldError::new("tokenCount", "is required"));
            None
        }
    };

    let starts_at = required_date(body, "startsAt", &mut errors);
    let ends_at = required_date(body, "endsAt", &mut errors);
    if let (Some(start), Some(end)) = (starts_at, ends_at) {
        if end < start {
            errors.push(FieldError::new("endsAt", "must not precede startsAt"));
        }
    }

    let is_managed = body
        .get("isManaged")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    match (network, title, token_count, starts_at, ends_at) {
        (Some(network), Some(title), Some(token_count), Some(starts_at), Some(ends_at))
            if errors.is_empty() =>
        {
            Ok(CreateEventBody {
                network,
                title,
                description,
                location,
                image_url,
                token_count,
                starts_at,
                ends_at,
                is_managed,
            })
        }
        _ => Err(errors),
    }
}

/// Parse and validate a payment-confirmation request.
///
/// # Errors
///
/// Returns field errors for a missing or malformed transaction hash.
pub fn parse_confirm_payment(body: &Value) -> Validated<ConfirmPaymentBody> {
    let mut errors = Vec::new();
    let tx_hash = required_str(body, "txHash", 64, &mut errors).map(TxHash::new);

    match tx_hash {
        Some(tx_hash) if errors.is_empty() => Ok(ConfirmPaymentBody { tx_hash }),
        _ => Err(errors),
    }
}

/// Parse and validate a join request.
///
/// # Errors
///
/// Returns field errors for a malformed wallet override.
pub fn parse_join(body: &Value) -> Validated<JoinBody> {
    let mut errors = Vec::new();
    let wallet = optional_str(body, "wallet", 64, &mut errors).map(WalletAddress::new);
    let create_offer = body
        .get("createOffer")
        .and_then(Value::as_bool)
        .unwrap_or(true);

    if errors.is_empty() {
        Ok(JoinBody {
            wallet,
            create_offer,
        })
    } else {
        Err(errors)
    }
}

/// Parse and validate a profile update.
///
/// # Errors
///
/// Returns field errors for over-long fields or a malformed email.
pub fn parse_profile(body: &Value) -> Validated<ProfileBody> {
    let mut errors = Vec::new();
    let first_name = optional_str(body, "firstName", 128, &mut errors);
    let last_name = optional_str(body, "lastName", 128, &mut errors);
    let email = optional_str(body, "email", 256, &mut errors);

    if let Some(email) = &email {
        if !email.contains('@') {
            errors.push(FieldError::new("email", "must be an email address"));
        }
    }

    if errors.is_empty() {
        Ok(ProfileBody {
            first_name,
            last_name,
            email,
        })
    } else {
        Err(errors)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_event() -> Value {
        json!({
            "network": "testnet",
            "title": "RustFest",
            "description": "desc",
            "location": "Berlin",
            "tokenCount": 8,
            "startsAt": "2026-09-01T09:00:00Z",
            "endsAt": "2026-09-02T18:00:00Z",
        })
    }

    #[test]
    fn accepts_a_valid_event() {
        let parsed = parse_create_event(&valid_event()).unwrap();
        assert_eq!(parsed.token_count, 8);
        assert_eq!(parsed.network, NetworkId::new("testnet"));
        assert!(!parsed.is_managed);
    }

    #[test]
    fn collects_every_field_error() {
        let body = json!({
            "title": "",
            "tokenCount": 0,
            "startsAt": "not-a-date",
        });
        let errors = parse_create_event(&body).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"network"));
        assert!(fields.contains(&"title"));
        assert!(fields.contains(&"tokenCount"));
        assert!(fields.contains(&"startsAt"));
        assert!(fields.contains(&"endsAt"));
    }

    #[test]
    fn rejects_reversed_dates() {
        let mut body = valid_event();
        body["endsAt"] = json!("2026-08-01T09:00:00Z");
        let errors = parse_create_event(&body).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "endsAt"));
    }

    #[test]
    fn rejects_token_count_above_cap() {
        let mut body = valid_event();
        body["tokenCount"] = json!(251);
        assert!(parse_create_event(&body).is_err());
    }

    #[test]
    fn join_defaults_to_offer_creation() {
        let parsed = parse_join(&json!({})).unwrap();
        assert!(parsed.create_offer);
        assert!(parsed.wallet.is_none());
    }

    #[test]
    fn profile_rejects_bad_email() {
        let errors = parse_profile(&json!({ "email": "nope" })).unwrap_err();
        assert_eq!(errors[0].field, "email");
    }
}
