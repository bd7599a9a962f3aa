//! lego-axum: HTTP surface for Aiden's Lego World.
//!
//! Serves the creations API backed by the synchronization facade, the
//! media search proxy and the credentials debug endpoint.

pub mod app;
mod error;
pub mod routes;
pub mod state;
pub mod upload;

pub use app::{build, LegoApp};
pub use error::LegoAxumError;
pub use state::AppState;
