//! Metadata uploader over an HTTP pinning endpoint.

use async_trait::async_trait;
use mintpass_core::error::MetadataError;
use mintpass_core::providers::MetadataUploader;
use serde_json::Value;

/// Uploads token metadata to a pinning service and returns the pinned URI.
///
/// The endpoint is expected to accept a JSON body and answer
/// `{ "uri": "ipfs://..." }`; an empty or missing URI is treated as a
/// failed upload, never returned to the mint path.
#[derive(Clone, Debug)]
pub struct PinningUploader {
    http: reqwest::Client,
    endpoint: String,
    token: Option<String>,
}

impl PinningUploader {
    /// Creates an uploader for `endpoint`, optionally authenticating with
    /// a bearer token.
    #[must_use]
    pub fn new(http: reqwest::Client, endpoint: String, token: Option<String>) -> Self {
        Self {
            http,
            endpoint,
            token,
        }
    }
}

#[async_trait]
impl MetadataUploader for PinningUploader {
    async fn upload(&self, metadata: &Value) -> Result<String, MetadataError> {
        let mut request = self.http.post(&self.endpoint).json(metadata);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|err| MetadataError::Upload(err.to_string()))?;

        if !response.status().is_success() {
            return Err(MetadataError::Upload(format!(
                "pinning endpoint answered {}",
                response.status()
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|err| MetadataError::Upload(err.to_string()))?;

        match body.get("uri").and_then(Value::as_str) {
            Some(uri) if !uri.is_empty() => Ok(uri.to_string()),
            _ => Err(MetadataError::Upload(
                "pinning endpoint returned no uri".to_string(),
            )),
        }
    }
}
