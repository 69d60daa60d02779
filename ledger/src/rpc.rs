//! JSON-RPC call envelope with transient-failure retry.

use mintpass_core::error::LedgerError;
use serde_json::{Value, json};
use std::time::Duration;

/// Backoff policy for transient transport failures.
///
/// RPC-level errors (the endpoint answered, but with an error result) are
/// never retried here; only failures to get an answer at all.
#[derive(Clone, Debug)]
pub(crate) struct RetryPolicy {
    /// Maximum number of retry attempts.
    pub max_retries: usize,
    /// Initial delay before the first retry.
    pub initial_delay: Duration,
    /// Multiplier applied per retry.
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(200),
            multiplier: 2,
        }
    }
}

impl RetryPolicy {
    fn delay_for_attempt(&self, attempt: usize) -> Duration {
        let factor = self
            .multiplier
            .saturating_pow(u32::try_from(attempt).unwrap_or(u32::MAX));
        self.initial_delay.saturating_mul(factor)
    }
}

/// Failure of one RPC call.
///
/// API errors keep their code so callers can branch on the expected ones
/// (`actNotFound`, `txnNotFound`, `objectNotFound`) before treating the
/// rest as hard failures.
#[derive(Debug)]
pub(crate) enum CallError {
    /// The endpoint answered with an error result.
    Api {
        /// Error code, e.g. `actNotFound`.
        code: String,
        /// Human-readable message.
        message: String,
    },
    /// Transport or decoding failure.
    Ledger(LedgerError),
}

impl CallError {
    /// Collapse into a [`LedgerError`], tagging API errors with `method`.
    pub(crate) fn into_ledger(self, method: &str) -> LedgerError {
        match self {
            Self::Api { code, message } => LedgerError::Rpc {
                method: method.to_string(),
                message: format!("{code}: {message}"),
            },
            Self::Ledger(err) => err,
        }
    }

    /// The API error code, if this was an API error.
    pub(crate) fn code(&self) -> Option<&str> {
        match self {
            Self::Api { code, .. } => Some(code),
            Self::Ledger(_) => None,
        }
    }
}

/// Thin JSON-RPC client over one HTTP endpoint.
#[derive(Clone, Debug)]
pub(crate) struct RpcClient {
    http: reqwest::Client,
    url: String,
    retry: RetryPolicy,
}

impl RpcClient {
    pub(crate) fn new(http: reqwest::Client, url: String) -> Self {
        Self {
            http,
            url,
            retry: RetryPolicy::default(),
        }
    }

    /// Call `method` and return the `result` object.
    ///
    /// The ledger's JSON-RPC dialect reports errors inside a successful
    /// HTTP response: `result.status == "error"` with an `error` code.
    /// Transport failures are retried per the policy.
    pub(crate) async fn call(&self, method: &str, params: Value) -> Result<Value, CallError> {
        let body = json!({
            "method": method,
            "params": [params],
        });

        let mut attempt = 0;
        let response = loop {
            match self.http.post(&self.url).json(&body).send().await {
                Ok(response) => break response,
                Err(err) if attempt < self.retry.max_retries => {
                    let delay = self.retry.delay_for_attempt(attempt);
                    tracing::warn!(
                        method,
                        attempt,
                        delay_ms = delay.as_millis(),
                        error = %err,
                        "ledger rpc transport failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    return Err(CallError::Ledger(LedgerError::Connection(err.to_string())));
                }
            }
        };

        let payload: Value = response
            .json()
            .await
            .map_err(|err| CallError::Ledger(LedgerError::Malformed(err.to_string())))?;

        let result = payload.get("result").cloned().ok_or_else(|| {
            CallError::Ledger(LedgerError::Malformed("response without result".to_string()))
        })?;

        if result.get("status").and_then(Value::as_str) == Some("error") {
            let code = result
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string();
            let message = result
                .get("error_message")
                .and_then(Value::as_str)
                .unwrap_or(code.as_str())
                .to_string();
            return Err(CallError::Api { code, message });
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_per_attempt() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(400));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(800));
    }

    #[test]
    fn api_errors_keep_their_code() {
        let err = CallError::Api {
            code: "actNotFound".to_string(),
            message: "Account not found.".to_string(),
        };
        assert_eq!(err.code(), Some("actNotFound"));

        let ledger = err.into_ledger("account_info");
        assert!(matches!(ledger, LedgerError::Rpc { .. }));
    }
}
