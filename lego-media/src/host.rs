use async_trait::async_trait;

use crate::{HostedResource, MediaResult, MediaUpload, SearchQuery, UploadMetadata, UploadReceipt};

/// Core media host operations - implemented by every backend
#[async_trait]
pub trait MediaHost: Send + Sync {
    /// Upload one file, tagged with the creation it belongs to
    async fn upload(&self, upload: MediaUpload, metadata: &UploadMetadata) -> MediaResult<UploadReceipt>;

    /// List objects under the query's folder
    async fn search(&self, query: &SearchQuery) -> MediaResult<Vec<HostedResource>>;

    /// What this host can do with its current configuration
    fn capabilities(&self) -> HostCapabilities;
}

/// Media host capabilities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HostCapabilities {
    pub can_upload: bool,
    pub can_search: bool,
}

impl HostCapabilities {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_upload(mut self) -> Self {
        self.can_upload = true;
        self
    }

    pub fn with_search(mut self) -> Self {
        self.can_search = true;
        self
    }
}
