use async_trait::async_trait;
use lego_core::{Creation, CreationId, MediaItem};

use crate::{StoreError, StoreResult};

/// Relational store operations - implemented by every backend
///
/// Every operation except `save` may be repeated safely: renaming to the
/// same name, deleting a deleted creation, adding a URL that is already
/// present or removing one that is gone all succeed without effect.
#[async_trait]
pub trait CreationStore: Send + Sync {
    /// Insert a creation and its media. Fails with `Conflict` on an existing id.
    async fn save(&self, creation: &Creation) -> StoreResult<()>;

    /// All creations, newest first, each with its media.
    async fn fetch_all(&self) -> StoreResult<Vec<Creation>>;

    /// Fails with `NotFound` when the creation does not exist.
    async fn rename(&self, id: &CreationId, name: &str) -> StoreResult<()>;

    /// Delete a creation and, with it, all of its media.
    async fn delete(&self, id: &CreationId) -> StoreResult<()>;

    /// Append media to an existing creation. Fails with `NotFound` otherwise.
    async fn add_media(&self, id: &CreationId, items: &[MediaItem]) -> StoreResult<()>;

    /// Remove the media item with the given URL.
    async fn delete_media(&self, id: &CreationId, url: &str) -> StoreResult<()>;
}

/// A store that is never reachable.
///
/// Stands in when no store is configured: reads fall through to the cache
/// and writes fail loudly.
#[derive(Debug, Default, Clone)]
pub struct UnavailableStore {
    reason: String,
}

impl UnavailableStore {
    pub fn new<S: Into<String>>(reason: S) -> Self {
        Self { reason: reason.into() }
    }

    fn fail<T>(&self) -> StoreResult<T> {
        let reason = if self.reason.is_empty() {
            "relational store is not configured"
        } else {
            &self.reason
        };
        Err(StoreError::persistence(reason))
    }
}

#[async_trait]
impl CreationStore for UnavailableStore {
    async fn save(&self, _creation: &Creation) -> StoreResult<()> {
        self.fail()
    }

    async fn fetch_all(&self) -> StoreResult<Vec<Creation>> {
        self.fail()
    }

    async fn rename(&self, _id: &CreationId, _name: &str) -> StoreResult<()> {
        self.fail()
    }

    async fn delete(&self, _id: &CreationId) -> StoreResult<()> {
        self.fail()
    }

    async fn add_media(&self, _id: &CreationId, _items: &[MediaItem]) -> StoreResult<()> {
        self.fail()
    }

    async fn delete_media(&self, _id: &CreationId, _url: &str) -> StoreResult<()> {
        self.fail()
    }
}
