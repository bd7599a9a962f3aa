use std::collections::HashSet;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;

use crate::{
    HostCapabilities, HostedResource, MediaError, MediaHost, MediaResult, MediaUpload, SearchQuery,
    UploadMetadata, UploadReceipt,
};

/// In-memory media host.
///
/// Records uploads and answers `search` from them. Individual files (by
/// name) or every request can be made to fail, which is how the fallback
/// paths are exercised without a network.
#[derive(Default)]
pub struct MemoryMediaHost {
    inner: Mutex<State>,
}

#[derive(Default)]
struct State {
    resources: Vec<HostedResource>,
    failing: HashSet<String>,
    fail_all: bool,
    fail_search: Option<u16>,
}

impl MemoryMediaHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every upload.
    pub fn fail_all(&self, fail: bool) {
        self.inner.lock().fail_all = fail;
    }

    /// Reject uploads of the named file.
    pub fn fail_file<S: Into<String>>(&self, filename: S) {
        self.inner.lock().failing.insert(filename.into());
    }

    /// Make `search` answer with the given upstream status.
    pub fn fail_search(&self, status: Option<u16>) {
        self.inner.lock().fail_search = status;
    }

    pub fn uploaded(&self) -> Vec<HostedResource> {
        self.inner.lock().resources.clone()
    }

    pub fn upload_count(&self) -> usize {
        self.inner.lock().resources.len()
    }

    /// Add an object as if it had been uploaded elsewhere.
    pub fn seed(&self, resource: HostedResource) {
        self.inner.lock().resources.push(resource);
    }
}

#[async_trait]
impl MediaHost for MemoryMediaHost {
    async fn upload(&self, upload: MediaUpload, metadata: &UploadMetadata) -> MediaResult<UploadReceipt> {
        let mut state = self.inner.lock();
        if state.fail_all || state.failing.contains(&upload.filename) {
            return Err(MediaError::rejected(400, format!("{} was rejected", upload.filename)));
        }

        let media_type = upload.media_type();
        let public_id = format!("lego-creations/{}", metadata.public_id_for(&upload));
        let extension = upload.filename.rsplit_once('.').map(|(_, e)| e).unwrap_or("bin");
        let url = format!(
            "https://media.test/{}/upload/{}.{}",
            media_type.as_str(),
            public_id,
            extension.to_lowercase()
        );

        state.resources.push(HostedResource {
            public_id: public_id.clone(),
            secure_url: url.clone(),
            original_filename: Some(upload.stem().to_string()),
            width: None,
            height: None,
            resource_type: Some(media_type.as_str().to_string()),
            tags: vec![metadata.tag()],
            context: serde_json::from_value(json!({
                "creationName": metadata.creation_name,
                "dateAdded": metadata.date_added.to_rfc3339(),
            }))
            .unwrap_or_default(),
            created_at: Some(metadata.date_added),
        });

        Ok(UploadReceipt {
            url,
            public_id,
            width: None,
            height: None,
            media_type,
        })
    }

    async fn search(&self, query: &SearchQuery) -> MediaResult<Vec<HostedResource>> {
        let state = self.inner.lock();
        if let Some(status) = state.fail_search {
            return Err(MediaError::rejected(status, "search failed"));
        }
        let prefix = format!("{}/", query.folder);
        Ok(state
            .resources
            .iter()
            .filter(|r| r.public_id.starts_with(&prefix))
            .take(query.max_results as usize)
            .cloned()
            .collect())
    }

    fn capabilities(&self) -> HostCapabilities {
        HostCapabilities::none().with_upload().with_search()
    }
}
