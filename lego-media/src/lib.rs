//! # lego-media: media host client
//!
//! Uploads photos and videos of creations to an external media host and
//! finds them again later.
//!
//! Every uploaded object is tagged `creation-{id}` and carries the creation
//! name and date in its context, and its storage path is
//! `lego-creations/{id}/{name-slug}/{file}`. Either is enough to rebuild the
//! creation list from the host alone (see [`grouping`]).
//!
//! When the host is missing or refuses a file the caller embeds the file as
//! a data URI instead ([`inline`]); the creation is degraded to
//! single-device visibility but never lost.
//!
//! ```text
//! ┌─────────────────┐
//! │ Upload pipeline │  ← validation, fallback decisions
//! ├─────────────────┤
//! │   MediaHost     │  ← upload / search primitives
//! ├─────────────────┤
//! │ CloudinaryHost  │  ← HTTP (or MemoryMediaHost in tests)
//! └─────────────────┘
//! ```

mod cloudinary;
mod config;
mod error;
pub mod grouping;
mod host;
pub mod inline;
mod memory;
pub mod transform;
mod types;

pub use cloudinary::CloudinaryHost;
pub use config::{MediaHostConfig, DEFAULT_FOLDER};
pub use error::{MediaError, MediaResult};
pub use host::{HostCapabilities, MediaHost};
pub use memory::MemoryMediaHost;
pub use types::{
    HostedResource, MediaUpload, SearchQuery, UploadMetadata, UploadReceipt, TAG_PREFIX,
};

pub mod prelude {
    pub use crate::{
        HostedResource, MediaError, MediaHost, MediaHostConfig, MediaResult, MediaUpload,
        UploadMetadata, UploadReceipt,
    };
}
