//! lego-core: shared building blocks for Aiden's Lego World.
//!
//! Everything that the media host client, the relational store client,
//! the local cache and the HTTP layer agree on lives here:
//! - the [`Creation`] / [`MediaItem`] model and its wire shape
//! - Feathers-style transport errors ([`LegoError`])
//! - a flat key/value configuration store ([`LegoConfig`])
//! - upload validation rules ([`UploadRules`])
//! - read-side gallery helpers ([`gallery`])

pub mod config;
pub mod errors;
pub mod gallery;
pub mod model;
pub mod validation;

pub use config::{LegoConfig, LegoConfigSnapshot};
pub use errors::{ErrorKind, LegoError, LegoResult};
pub use gallery::{GalleryStats, MediaEntry};
pub use model::{Creation, CreationId, MediaItem, MediaType};
pub use validation::{FileCandidate, UploadRules, ValidationError, ValidationReport};
