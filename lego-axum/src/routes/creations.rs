use axum::{
    extract::{rejection::JsonRejection, Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use lego_core::{gallery, Creation, CreationId, LegoError};
use serde::Deserialize;
use serde_json::json;

use crate::upload::{self, SelectedFile};
use crate::{AppState, LegoAxumError};

type ApiResult<T> = Result<T, LegoAxumError>;

fn map_json_rejection(rejection: JsonRejection) -> LegoAxumError {
    LegoError::bad_request("Failed to parse the request body as JSON")
        .with_errors(json!({ "_schema": [rejection.to_string()] }))
        .into_anyhow()
        .into()
}

fn not_found(id: &CreationId) -> LegoAxumError {
    LegoError::not_found(format!("No creation found with id '{id}'"))
        .into_anyhow()
        .into()
}

/// Text field `name` plus every part that carries a file name.
async fn read_form(mut multipart: Multipart) -> ApiResult<(Option<String>, Vec<SelectedFile>)> {
    let mut name = None;
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| LegoError::bad_request(format!("Malformed upload: {e}")).into_anyhow())?
    {
        match field.file_name().map(str::to_string) {
            Some(filename) => {
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| LegoError::bad_request(format!("Could not read {filename}: {e}")).into_anyhow())?;
                files.push(SelectedFile::new(filename, content_type, bytes));
            }
            None if field.name() == Some("name") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| LegoError::bad_request(format!("Malformed name: {e}")).into_anyhow())?;
                name = Some(text);
            }
            None => {}
        }
    }
    Ok((name, files))
}

/// `GET /creations`: the facade's view, creations without media hidden.
pub async fn list(State(state): State<AppState>) -> impl IntoResponse {
    let mut outcome = state.sync.fetch_all().await;
    outcome.creations = gallery::visible(outcome.creations);
    Json(outcome)
}

/// `GET /creations/{id}`: 404 for creations `list` would hide.
pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Creation>> {
    let id = CreationId::from(id);
    state
        .sync
        .fetch_all()
        .await
        .creations
        .into_iter()
        .find(|c| c.id == id && c.is_displayable())
        .map(Json)
        .ok_or_else(|| not_found(&id))
}

pub async fn create(State(state): State<AppState>, multipart: Multipart) -> ApiResult<impl IntoResponse> {
    let (name, files) = read_form(multipart).await?;
    let report = upload::create_creation(&state, name.as_deref().unwrap_or_default(), files).await?;
    Ok((StatusCode::CREATED, Json(report)))
}

#[derive(Debug, Deserialize)]
pub struct RenameBody {
    pub name: String,
}

pub async fn rename(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<RenameBody>, JsonRejection>,
) -> ApiResult<Json<serde_json::Value>> {
    let Json(body) = body.map_err(map_json_rejection)?;
    let name = state.rules.validate_name(&body.name)?;
    let id = CreationId::from(id);
    state.sync.rename(&id, &name).await?;
    Ok(Json(json!({ "id": id, "name": name })))
}

pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<StatusCode> {
    state.sync.delete(&CreationId::from(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_media(
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let (_, files) = read_form(multipart).await?;
    let report = upload::add_to_creation(&state, &CreationId::from(id), files).await?;
    Ok(Json(report))
}

#[derive(Debug, Deserialize)]
pub struct MediaQuery {
    pub url: String,
}

pub async fn delete_media(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<MediaQuery>,
) -> ApiResult<StatusCode> {
    state.sync.delete_media(&CreationId::from(id), &query.url).await?;
    Ok(StatusCode::NO_CONTENT)
}
