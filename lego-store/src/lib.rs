//! # lego-store: where creations live
//!
//! - [`CreationStore`]: the relational store (authoritative when reachable),
//!   with [`RestCreationStore`] for the hosted PostgREST API and
//!   [`MemoryCreationStore`] for tests and backend-less runs.
//! - [`CacheStore`]: the local mirror, used when the store is down and to
//!   seed the store the first time it is reachable.
//! - [`SyncFacade`]: the only thing callers should talk to.

mod cache;
mod error;
mod memory;
mod rest;
mod store;
pub mod sync;

pub use cache::{CacheStore, FileCache, MemoryCache, CACHE_KEY};
pub use error::{StoreError, StoreResult};
pub use memory::MemoryCreationStore;
pub use rest::{RestCreationStore, RestStoreConfig};
pub use store::{CreationStore, UnavailableStore};
pub use sync::{FetchOutcome, FetchSource, ReadStrategy, SyncFacade, READ_PLAN};
