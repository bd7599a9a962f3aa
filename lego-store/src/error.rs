use lego_core::{CreationId, LegoError};
use thiserror::Error;

/// Result type for store and cache operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors from the relational store and the local cache
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store configuration missing: {message}")]
    Config { message: String },

    #[error("Store unavailable: {message}")]
    Persistence { message: String },

    #[error("Creation '{id}' already exists")]
    Conflict { id: CreationId },

    #[error("No creation found with id '{id}'")]
    NotFound { id: CreationId },

    #[error("Unexpected store response: {message}")]
    Parse { message: String },

    #[error("Cache I/O failed: {source}")]
    CacheIo {
        #[from]
        source: std::io::Error,
    },

    #[error("Cache could not be encoded: {source}")]
    CacheEncode {
        #[from]
        source: serde_json::Error,
    },

    #[error("Store unreachable: {source}")]
    Http {
        #[from]
        source: reqwest::Error,
    },
}

impl StoreError {
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn persistence<S: Into<String>>(message: S) -> Self {
        Self::Persistence {
            message: message.into(),
        }
    }

    pub fn parse<S: Into<String>>(message: S) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    pub fn conflict(id: &CreationId) -> Self {
        Self::Conflict { id: id.clone() }
    }

    pub fn not_found(id: &CreationId) -> Self {
        Self::NotFound { id: id.clone() }
    }

    pub fn to_lego_error(&self) -> LegoError {
        let message = self.to_string();
        match self {
            Self::Config { .. } => LegoError::config(message),
            Self::Persistence { .. } | Self::Http { .. } => LegoError::persistence(message),
            Self::Conflict { .. } => LegoError::conflict(message),
            Self::NotFound { .. } => LegoError::not_found(message),
            Self::Parse { .. } => LegoError::bad_gateway(message),
            Self::CacheIo { .. } | Self::CacheEncode { .. } => LegoError::general_error(message),
        }
    }
}

impl From<StoreError> for LegoError {
    fn from(err: StoreError) -> Self {
        err.to_lego_error()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_onto_transport_codes() {
        let id = CreationId::from("1");
        assert_eq!(StoreError::config("x").to_lego_error().code(), 500);
        assert_eq!(StoreError::persistence("x").to_lego_error().code(), 503);
        assert_eq!(StoreError::conflict(&id).to_lego_error().code(), 409);
        assert_eq!(StoreError::not_found(&id).to_lego_error().code(), 404);
        assert_eq!(StoreError::parse("x").to_lego_error().code(), 502);
    }
}
