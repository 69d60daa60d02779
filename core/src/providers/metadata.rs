//! Metadata uploader boundary.

use crate::error::MetadataError;
use async_trait::async_trait;

/// Uploads a token-metadata JSON blob and returns a stable resource URI.
///
/// An upload that cannot produce a usable URI is an error; the mint path
/// treats any uploader error as a mint failure.
#[async_trait]
pub trait MetadataUploader: Send + Sync {
    /// Upload `metadata` and return its resource URI.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError::Upload`] if no URI could be obtained.
    async fn upload(&self, metadata: &serde_json::Value) -> Result<String, MetadataError>;
}
