use axum::{extract::State, Json};
use lego_core::GalleryStats;

use crate::AppState;

/// `GET /stats`: counts for the home view plus the newest creations.
pub async fn stats(State(state): State<AppState>) -> Json<GalleryStats> {
    let outcome = state.sync.fetch_all().await;
    Json(GalleryStats::from_creations(&outcome.creations))
}
