use axum::{extract::State, Json};
use lego_core::{gallery, MediaEntry};
use lego_media::transform::{media_thumbnail, ThumbnailOptions};
use lego_media::MediaHostConfig;
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaView {
    #[serde(flatten)]
    pub entry: MediaEntry,
    pub thumbnail: Option<String>,
}

/// `GET /media`: every media item across displayable creations, newest
/// creation first, each with a preview URL.
pub async fn list(State(state): State<AppState>) -> Json<Vec<MediaView>> {
    let creations = gallery::visible(state.sync.fetch_all().await.creations);
    let host = MediaHostConfig::from_config(&state.config).ok();
    let opts = ThumbnailOptions::default();

    let views = gallery::all_media(&creations)
        .into_iter()
        .map(|entry| MediaView {
            thumbnail: media_thumbnail(&entry.item, host.as_ref(), &opts),
            entry,
        })
        .collect();
    Json(views)
}
