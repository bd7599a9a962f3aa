//! Upload pipeline: validate, host (or inline), assemble, persist.

use std::sync::Arc;

use bytes::Bytes;
use futures::future::join_all;
use lego_core::{Creation, CreationId, FileCandidate, LegoError, MediaItem, ValidationError, ValidationReport};
use lego_media::inline::inline_item;
use lego_media::{MediaHost, MediaUpload, UploadMetadata};
use serde::Serialize;
use serde_json::json;

use crate::AppState;

/// A file as received from the client.
#[derive(Debug, Clone)]
pub struct SelectedFile {
    pub filename: String,
    pub content_type: String,
    pub bytes: Bytes,
}

impl SelectedFile {
    pub fn new<N: Into<String>, C: Into<String>, B: Into<Bytes>>(filename: N, content_type: C, bytes: B) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }

    fn candidate(&self) -> FileCandidate {
        FileCandidate::new(self.filename.clone(), self.content_type.clone(), self.bytes.len() as u64)
    }

    fn into_upload(self) -> MediaUpload {
        MediaUpload::new(self.filename, self.content_type, self.bytes)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    Hosted,
    Inline,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileOutcome {
    pub name: String,
    pub placement: Placement,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadReport {
    pub creation: Creation,
    pub files: Vec<FileOutcome>,

    /// Validation messages for files that were not uploaded.
    pub rejected: Vec<String>,
}

/// Validate `files` against the rules, keeping the accepted ones in order.
fn select(
    state: &AppState,
    already_selected: usize,
    files: Vec<SelectedFile>,
) -> Result<(Vec<SelectedFile>, ValidationReport), LegoError> {
    let candidates: Vec<FileCandidate> = files.iter().map(SelectedFile::candidate).collect();
    let report = state.rules.validate_batch(already_selected, &candidates);
    if report.is_rejected() {
        return Err(LegoError::unprocessable("No valid files to upload").with_errors(json!(report.messages())));
    }
    let accepted = files
        .into_iter()
        .enumerate()
        .filter(|(i, _)| report.accepted.contains(i))
        .map(|(_, f)| f)
        .collect();
    Ok((accepted, report))
}

/// Put every file somewhere: on the media host when possible, inline
/// otherwise. Uploads run concurrently; one failure never affects another.
pub async fn place_media(
    host: Option<&Arc<dyn MediaHost>>,
    files: Vec<SelectedFile>,
    metadata: &UploadMetadata,
) -> Vec<(MediaItem, FileOutcome)> {
    let uploads = files.into_iter().map(|file| async move {
        let upload = file.into_upload();
        let name = upload.filename.clone();
        let Some(host) = host else {
            return (
                inline_item(&upload),
                FileOutcome {
                    name,
                    placement: Placement::Inline,
                    reason: Some("media host not configured".to_string()),
                },
            );
        };
        match host.upload(upload.clone(), metadata).await {
            Ok(receipt) => (
                receipt.into_media_item(name.clone()),
                FileOutcome {
                    name,
                    placement: Placement::Hosted,
                    reason: None,
                },
            ),
            Err(e) => {
                tracing::warn!(file = %name, error = %e, "upload failed, embedding inline");
                (
                    inline_item(&upload),
                    FileOutcome {
                        name,
                        placement: Placement::Inline,
                        reason: Some(e.to_string()),
                    },
                )
            }
        }
    });
    join_all(uploads).await
}

/// Create a new creation from a name and a file selection.
pub async fn create_creation(state: &AppState, name: &str, files: Vec<SelectedFile>) -> anyhow::Result<UploadReport> {
    let name = state.rules.validate_name(name)?;
    let (accepted, report) = select(state, 0, files).map_err(LegoError::into_anyhow)?;

    let creation = Creation::new(name);
    let metadata = UploadMetadata::from_creation(&creation);
    let (items, outcomes): (Vec<_>, Vec<_>) = place_media(state.uploader(), accepted, &metadata)
        .await
        .into_iter()
        .unzip();
    let creation = creation.with_photos(items);

    state.sync.save(&creation).await?;
    tracing::info!(
        id = %creation.id,
        media = creation.media_count(),
        rejected = report.errors.len(),
        "creation created"
    );

    Ok(UploadReport {
        creation,
        files: outcomes,
        rejected: report.messages(),
    })
}

/// Add files to an existing creation.
pub async fn add_to_creation(state: &AppState, id: &CreationId, files: Vec<SelectedFile>) -> anyhow::Result<UploadReport> {
    if files.is_empty() {
        return Err(ValidationError::NoFiles.into());
    }

    let outcome = state.sync.fetch_all().await;
    let mut creation = outcome
        .creations
        .into_iter()
        .find(|c| &c.id == id)
        .ok_or_else(|| LegoError::not_found(format!("No creation found with id '{id}'")).into_anyhow())?;

    let (accepted, report) = select(state, creation.media_count(), files).map_err(LegoError::into_anyhow)?;

    let metadata = UploadMetadata::from_creation(&creation);
    let (items, outcomes): (Vec<_>, Vec<_>) = place_media(state.uploader(), accepted, &metadata)
        .await
        .into_iter()
        .unzip();

    state.sync.add_media(id, &items).await?;
    let added = creation.add_media(items);
    tracing::info!(id = %id, added, "media added to creation");

    Ok(UploadReport {
        creation,
        files: outcomes,
        rejected: report.messages(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use lego_core::LegoConfig;
    use lego_media::MemoryMediaHost;
    use lego_store::{MemoryCache, MemoryCreationStore, SyncFacade};

    const MB: usize = 1024 * 1024;

    fn state(host: Option<Arc<MemoryMediaHost>>) -> AppState {
        let sync = SyncFacade::new(Arc::new(MemoryCreationStore::new()), Arc::new(MemoryCache::new()));
        let media = host.map(|h| h as Arc<dyn MediaHost>);
        AppState::new(sync, media, LegoConfig::new().snapshot())
    }

    fn jpeg(name: &str, size: usize) -> SelectedFile {
        SelectedFile::new(name, "image/jpeg", vec![0u8; size])
    }

    #[tokio::test]
    async fn oversized_video_is_dropped_and_the_rest_saved() {
        let host = Arc::new(MemoryMediaHost::new());
        let state = state(Some(host.clone()));
        let files = vec![
            jpeg("a.jpg", 1024),
            jpeg("b.jpg", 2048),
            SelectedFile::new("tour.mp4", "video/mp4", vec![0u8; 60 * MB]),
        ];

        let report = create_creation(&state, "  Castle  ", files).await.unwrap();
        assert_eq!(report.creation.name, "Castle");
        assert_eq!(report.creation.media_count(), 2);
        assert_eq!(report.rejected.len(), 1);
        assert!(report.rejected[0].starts_with("tour.mp4: File too large"));
        assert_eq!(host.upload_count(), 2);

        let stored = state.sync.fetch_all().await;
        assert_eq!(stored.creations[0].media_count(), 2);
    }

    #[tokio::test]
    async fn failed_uploads_fall_back_per_file() {
        let host = Arc::new(MemoryMediaHost::new());
        host.fail_file("b.jpg");
        let state = state(Some(host));

        let report = create_creation(&state, "Ship", vec![jpeg("a.jpg", 10), jpeg("b.jpg", 10)])
            .await
            .unwrap();
        let placements: Vec<_> = report.files.iter().map(|f| f.placement).collect();
        assert_eq!(placements, vec![Placement::Hosted, Placement::Inline]);
        assert!(!report.creation.photos[0].is_inline());
        assert!(report.creation.photos[1].is_inline());
    }

    #[tokio::test]
    async fn without_a_host_everything_is_inline() {
        let state = state(None);
        let report = create_creation(&state, "Truck", vec![jpeg("a.jpg", 10)]).await.unwrap();
        assert_eq!(report.files[0].placement, Placement::Inline);
        assert!(report.creation.photos[0].url.starts_with("data:image/jpeg;base64,"));
    }

    #[tokio::test]
    async fn nothing_valid_is_unprocessable() {
        let state = state(None);
        let err = create_creation(&state, "Bad", vec![SelectedFile::new("a.bmp", "image/bmp", vec![1])])
            .await
            .unwrap_err();
        let lego = LegoError::from_anyhow(&err).unwrap();
        assert_eq!(lego.code(), 422);

        let err = create_creation(&state, "   ", vec![jpeg("a.jpg", 1)]).await.unwrap_err();
        assert!(err.downcast_ref::<ValidationError>().is_some());
    }

    #[tokio::test]
    async fn adding_respects_the_per_creation_limit() {
        let state = state(Some(Arc::new(MemoryMediaHost::new())));
        let files: Vec<_> = (0..9).map(|i| jpeg(&format!("{i}.jpg"), 10)).collect();
        let report = create_creation(&state, "Tower", files).await.unwrap();
        let id = report.creation.id.clone();

        let added = add_to_creation(&state, &id, vec![jpeg("x.jpg", 10)]).await.unwrap();
        assert_eq!(added.creation.media_count(), 10);

        let err = add_to_creation(&state, &id, vec![jpeg("y.jpg", 10)]).await.unwrap_err();
        assert_eq!(LegoError::from_anyhow(&err).unwrap().code(), 422);

        let err = add_to_creation(&state, &CreationId::from("missing"), vec![jpeg("z.jpg", 10)])
            .await
            .unwrap_err();
        assert_eq!(LegoError::from_anyhow(&err).unwrap().code(), 404);
    }
}
