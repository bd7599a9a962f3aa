use lego_core::LegoError;
use thiserror::Error;

/// Result type for media host operations
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while talking to the media host
#[derive(Error, Debug)]
pub enum MediaError {
    #[error("Media host configuration missing: {message}")]
    Config { message: String },

    #[error("Upload failed: {reason}")]
    Upload { reason: String },

    #[error("Media host rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Unexpected media host response: {message}")]
    Parse { message: String },

    #[error("Media host unreachable: {source}")]
    Http {
        #[from]
        source: reqwest::Error,
    },
}

impl MediaError {
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn upload<S: Into<String>>(reason: S) -> Self {
        Self::Upload {
            reason: reason.into(),
        }
    }

    pub fn rejected<S: Into<String>>(status: u16, message: S) -> Self {
        Self::Rejected {
            status,
            message: message.into(),
        }
    }

    pub fn parse<S: Into<String>>(message: S) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Upstream HTTP status, when the host answered at all.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            Self::Http { source } => source.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn to_lego_error(&self) -> LegoError {
        match self {
            Self::Config { .. } => LegoError::config(self.to_string()),
            _ => LegoError::upload(self.to_string()),
        }
    }
}

impl From<MediaError> for LegoError {
    fn from(err: MediaError) -> Self {
        err.to_lego_error()
    }
}
