//! Synchronization facade: one view over the relational store and the
//! local cache.
//!
//! Reads walk [`READ_PLAN`] top-down:
//!
//! | step            | taken when                 | result                                   |
//! |-----------------|----------------------------|------------------------------------------|
//! | `Store`         | store answers with ≥1 row  | store data (merged into the cache)       |
//! | `CacheMigrate`  | store answers empty        | cache snapshot, copied into the store    |
//! | `CacheFallback` | store fails                | cache snapshot, flagged as degraded      |
//!
//! Writes go to the store first and are mirrored into the cache only after
//! the store accepted them. A store failure is returned as is and the cache
//! is left alone.
//!
//! Cache access is blocking file I/O and runs on the blocking pool.

use std::collections::HashSet;
use std::io;
use std::sync::Arc;

use lego_core::{Creation, CreationId, MediaItem};
use serde::Serialize;

use crate::{CacheStore, CreationStore, StoreError, StoreResult};

/// One step of the read plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStrategy {
    Store,
    CacheMigrate,
    CacheFallback,
}

pub const READ_PLAN: [ReadStrategy; 3] = [
    ReadStrategy::Store,
    ReadStrategy::CacheMigrate,
    ReadStrategy::CacheFallback,
];

/// Where the creations of a fetch came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum FetchSource {
    Store,
    CacheMigrated { migrated: usize, failed: usize },
    Cache,
    /// Store reachable and empty, nothing cached.
    Empty,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchOutcome {
    pub creations: Vec<Creation>,
    pub source: FetchSource,

    /// Why the store could not be used, when it could not.
    pub degraded: Option<String>,
}

impl FetchOutcome {
    pub fn is_degraded(&self) -> bool {
        self.degraded.is_some()
    }
}

/// What the store step observed, carried to later steps.
enum StoreRead {
    Pending,
    Empty,
    Failed(StoreError),
}

pub struct SyncFacade {
    store: Arc<dyn CreationStore>,
    cache: Arc<dyn CacheStore>,
}

impl SyncFacade {
    pub fn new(store: Arc<dyn CreationStore>, cache: Arc<dyn CacheStore>) -> Self {
        Self { store, cache }
    }

    pub fn store(&self) -> &Arc<dyn CreationStore> {
        &self.store
    }

    pub fn cache(&self) -> &Arc<dyn CacheStore> {
        &self.cache
    }

    /// All creations, newest first.
    pub async fn fetch_all(&self) -> FetchOutcome {
        let mut observed = StoreRead::Pending;

        for step in READ_PLAN {
            match step {
                ReadStrategy::Store => match self.store.fetch_all().await {
                    Ok(mut creations) if !creations.is_empty() => {
                        Creation::sort_newest_first(&mut creations);
                        self.merge_into_cache(&creations).await;
                        return FetchOutcome {
                            creations,
                            source: FetchSource::Store,
                            degraded: None,
                        };
                    }
                    Ok(_) => observed = StoreRead::Empty,
                    Err(e) => observed = StoreRead::Failed(e),
                },
                ReadStrategy::CacheMigrate => {
                    if let StoreRead::Empty = observed {
                        return self.migrate_cache().await;
                    }
                }
                ReadStrategy::CacheFallback => {
                    if let StoreRead::Failed(e) = &observed {
                        tracing::warn!(error = %e, "store unavailable, serving cache");
                        return FetchOutcome {
                            creations: self.cached().await,
                            source: FetchSource::Cache,
                            degraded: Some(e.to_string()),
                        };
                    }
                }
            }
        }

        FetchOutcome {
            creations: Vec::new(),
            source: FetchSource::Empty,
            degraded: None,
        }
    }

    /// Run `f` against the cache on the blocking pool.
    async fn with_cache<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&dyn CacheStore) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let cache = Arc::clone(&self.cache);
        tokio::task::spawn_blocking(move || f(cache.as_ref()))
            .await
            .map_err(|e| StoreError::from(io::Error::other(e)))?
    }

    async fn cached(&self) -> Vec<Creation> {
        self.with_cache(|cache| Ok(cache.get())).await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "cache read failed");
            Vec::new()
        })
    }

    /// Replace cached copies of the creations the store returned. Cached
    /// creations the store does not know about are kept.
    async fn merge_into_cache(&self, creations: &[Creation]) {
        let fresh = creations.to_vec();
        let result = self
            .with_cache(move |cache| {
                let ids: HashSet<CreationId> = fresh.iter().map(|c| c.id.clone()).collect();
                let mut fresh = Some(fresh);
                cache.update_all(&mut |list| {
                    list.retain(|c| !ids.contains(&c.id));
                    list.extend(fresh.take().unwrap_or_default());
                })
            })
            .await;
        if let Err(e) = result {
            tracing::warn!(error = %e, "could not merge store data into cache");
        }
    }

    async fn migrate_cache(&self) -> FetchOutcome {
        let cached = self.cached().await;
        if cached.is_empty() {
            return FetchOutcome {
                creations: Vec::new(),
                source: FetchSource::Empty,
                degraded: None,
            };
        }

        let (mut migrated, mut failed) = (0, 0);
        for creation in &cached {
            match self.store.save(creation).await {
                Ok(()) => migrated += 1,
                Err(e) => {
                    failed += 1;
                    tracing::warn!(id = %creation.id, error = %e, "could not migrate cached creation");
                }
            }
        }
        tracing::info!(migrated, failed, "migrated cached creations into store");

        FetchOutcome {
            creations: cached,
            source: FetchSource::CacheMigrated { migrated, failed },
            degraded: None,
        }
    }

    /// Apply an accepted write to the cache. Failures are logged only: the
    /// store already holds the change.
    async fn mirror<F>(&self, what: &'static str, f: F)
    where
        F: FnOnce(&dyn CacheStore) -> StoreResult<()> + Send + 'static,
    {
        if let Err(e) = self.with_cache(f).await {
            tracing::warn!(error = %e, "cache mirror of {what} failed");
        }
    }

    pub async fn save(&self, creation: &Creation) -> StoreResult<()> {
        self.store.save(creation).await?;
        let creation = creation.clone();
        self.mirror("save", move |cache| cache.upsert(&creation)).await;
        Ok(())
    }

    pub async fn rename(&self, id: &CreationId, name: &str) -> StoreResult<()> {
        self.store.rename(id, name).await?;
        let (key, name) = (id.clone(), name.to_string());
        self.mirror("rename", move |cache| cache.rename(&key, &name)).await;
        tracing::info!(id = %id, "creation renamed");
        Ok(())
    }

    pub async fn delete(&self, id: &CreationId) -> StoreResult<()> {
        self.store.delete(id).await?;
        let key = id.clone();
        self.mirror("delete", move |cache| cache.remove(&key)).await;
        tracing::info!(id = %id, "creation deleted");
        Ok(())
    }

    pub async fn add_media(&self, id: &CreationId, items: &[MediaItem]) -> StoreResult<()> {
        self.store.add_media(id, items).await?;
        let (key, items) = (id.clone(), items.to_vec());
        self.mirror("add media", move |cache| cache.add_media(&key, &items)).await;
        Ok(())
    }

    pub async fn delete_media(&self, id: &CreationId, url: &str) -> StoreResult<()> {
        self.store.delete_media(id, url).await?;
        let (key, url) = (id.clone(), url.to_string());
        self.mirror("delete media", move |cache| cache.remove_media(&key, &url)).await;
        Ok(())
    }
}
