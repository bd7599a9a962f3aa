use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use lego_media::grouping::group_resources;
use lego_media::{MediaError, SearchQuery};
use serde_json::json;

use crate::AppState;

/// All three are needed before the host is queried at all.
const SEARCH_KEYS: [&str; 3] = ["media.cloudName", "media.apiKey", "media.apiSecret"];

fn error_body(status: StatusCode, body: serde_json::Value) -> Response {
    (status, Json(body)).into_response()
}

fn credentials_missing() -> Response {
    error_body(
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({ "error": "Cloudinary credentials not configured" }),
    )
}

/// `GET /api/cloudinary-search`: rebuild the creation list from the media host.
pub async fn search(State(state): State<AppState>) -> Response {
    if !state.config.has_all(&SEARCH_KEYS) {
        return credentials_missing();
    }
    let Some(host) = state.media.as_ref() else {
        return credentials_missing();
    };

    let query = SearchQuery::default();
    match host.search(&query).await {
        Ok(resources) => {
            let creations = group_resources(resources, &query.folder, Utc::now());
            tracing::info!(count = creations.len(), "search proxy answered");
            Json(json!({ "creations": creations })).into_response()
        }
        Err(MediaError::Rejected { status, message }) => {
            tracing::warn!(status, "media host search rejected");
            error_body(
                StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
                json!({ "error": "Cloudinary API error", "status": status, "details": message }),
            )
        }
        Err(MediaError::Config { .. }) => credentials_missing(),
        Err(e) => {
            tracing::error!(error = %e, "search proxy failed");
            error_body(
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "Internal server error", "details": e.to_string() }),
            )
        }
    }
}

pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

pub async fn method_not_allowed() -> Response {
    error_body(StatusCode::METHOD_NOT_ALLOWED, json!({ "error": "Method not allowed" }))
}

/// `GET /api/debug-env`: which media credentials are present, masked.
pub async fn debug_env(State(state): State<AppState>) -> Json<serde_json::Value> {
    let config = &state.config;
    Json(json!({
        "hasCloudName": config.has("media.cloudName"),
        "hasApiKey": config.has("media.apiKey"),
        "hasApiSecret": config.has("media.apiSecret"),
        "cloudName": config.masked("media.cloudName"),
        "apiKey": config.masked("media.apiKey"),
        "apiSecret": config.redacted("media.apiSecret"),
    }))
}
