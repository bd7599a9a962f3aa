use axum::{
    routing::{get, post},
    Router,
};

use crate::AppState;

pub mod api;
pub mod creations;
pub mod media;
pub mod stats;

pub fn router(state: AppState) -> Router<()> {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route(
            "/api/cloudinary-search",
            get(api::search)
                .options(api::preflight)
                .fallback(api::method_not_allowed),
        )
        .route("/api/debug-env", get(api::debug_env))
        .route("/creations", get(creations::list).post(creations::create))
        .route(
            "/creations/{id}",
            get(creations::get)
                .patch(creations::rename)
                .delete(creations::delete),
        )
        .route(
            "/creations/{id}/media",
            post(creations::add_media).delete(creations::delete_media),
        )
        .route("/media", get(media::list))
        .route("/stats", get(stats::stats))
        .with_state(state)
}
