//! Mock metadata uploader.

use crate::error::MetadataError;
use crate::providers::MetadataUploader;
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// Uploader returning deterministic fake URIs, with a failure switch.
#[derive(Clone, Debug, Default)]
pub struct MockUploader {
    uploads: Arc<AtomicU32>,
    fail: Arc<AtomicBool>,
}

impl MockUploader {
    /// Creates a mock uploader.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent uploads fail.
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Number of successful uploads so far.
    #[must_use]
    pub fn upload_count(&self) -> u32 {
        self.uploads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataUploader for MockUploader {
    async fn upload(&self, _metadata: &serde_json::Value) -> Result<String, MetadataError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(MetadataError::Upload("pinning service unavailable".into()));
        }
        let n = self.uploads.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("ipfs://QmMockMetadata{n:04}"))
    }
}
