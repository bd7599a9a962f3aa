use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use lego_core::{LegoError, ValidationError};
use lego_media::MediaError;
use lego_store::StoreError;

#[derive(Debug)]
pub struct LegoAxumError(pub anyhow::Error);

impl<E> From<E> for LegoAxumError
where
    E: Into<anyhow::Error>,
{
    fn from(e: E) -> Self {
        Self(e.into())
    }
}

impl LegoAxumError {
    /// Resolve the transport error: an explicit `LegoError` anywhere in the
    /// chain wins, then the infrastructure errors, then a general error.
    pub fn to_lego_error(&self) -> LegoError {
        let err = &self.0;
        if let Some(lego) = LegoError::from_anyhow(err) {
            return lego.sanitize_for_client();
        }
        for cause in err.chain() {
            if let Some(store) = cause.downcast_ref::<StoreError>() {
                return store.to_lego_error();
            }
            if let Some(media) = cause.downcast_ref::<MediaError>() {
                return media.to_lego_error();
            }
            if let Some(validation) = cause.downcast_ref::<ValidationError>() {
                return LegoError::unprocessable(validation.to_string());
            }
        }
        LegoError::general_error(err.to_string())
    }
}

impl IntoResponse for LegoAxumError {
    fn into_response(self) -> Response {
        let lego = self.to_lego_error();
        let status = StatusCode::from_u16(lego.code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }
        (status, Json(lego.to_json())).into_response()
    }
}
