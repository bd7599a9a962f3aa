use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use lego_core::{Creation, CreationId, MediaItem};
use parking_lot::RwLock;

use crate::{CreationStore, StoreError, StoreResult};

/// In-memory relational store.
///
/// Same semantics as the hosted store, plus fault injection: the whole
/// store can be made unreachable, and saves of specific ids can be made to
/// fail.
#[derive(Default)]
pub struct MemoryCreationStore {
    rows: RwLock<BTreeMap<CreationId, Creation>>,
    faults: RwLock<Faults>,
}

#[derive(Default)]
struct Faults {
    unavailable: bool,
    failing_saves: HashSet<CreationId>,
}

impl MemoryCreationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_creations<I: IntoIterator<Item = Creation>>(creations: I) -> Self {
        let store = Self::new();
        {
            let mut rows = store.rows.write();
            for creation in creations {
                rows.insert(creation.id.clone(), creation);
            }
        }
        store
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.faults.write().unavailable = unavailable;
    }

    pub fn fail_saves_for<I: Into<CreationId>>(&self, id: I) {
        self.faults.write().failing_saves.insert(id.into());
    }

    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }

    pub fn contains(&self, id: &CreationId) -> bool {
        self.rows.read().contains_key(id)
    }

    fn check(&self) -> StoreResult<()> {
        if self.faults.read().unavailable {
            return Err(StoreError::persistence("store is unreachable"));
        }
        Ok(())
    }
}

#[async_trait]
impl CreationStore for MemoryCreationStore {
    async fn save(&self, creation: &Creation) -> StoreResult<()> {
        self.check()?;
        if self.faults.read().failing_saves.contains(&creation.id) {
            return Err(StoreError::persistence(format!("insert of '{}' rejected", creation.id)));
        }
        let mut rows = self.rows.write();
        if rows.contains_key(&creation.id) {
            return Err(StoreError::conflict(&creation.id));
        }
        rows.insert(creation.id.clone(), creation.clone());
        Ok(())
    }

    async fn fetch_all(&self) -> StoreResult<Vec<Creation>> {
        self.check()?;
        let mut all: Vec<Creation> = self.rows.read().values().cloned().collect();
        Creation::sort_newest_first(&mut all);
        Ok(all)
    }

    async fn rename(&self, id: &CreationId, name: &str) -> StoreResult<()> {
        self.check()?;
        match self.rows.write().get_mut(id) {
            Some(creation) => {
                creation.name = name.to_string();
                Ok(())
            }
            None => Err(StoreError::not_found(id)),
        }
    }

    async fn delete(&self, id: &CreationId) -> StoreResult<()> {
        self.check()?;
        self.rows.write().remove(id);
        Ok(())
    }

    async fn add_media(&self, id: &CreationId, items: &[MediaItem]) -> StoreResult<()> {
        self.check()?;
        match self.rows.write().get_mut(id) {
            Some(creation) => {
                creation.add_media(items.iter().cloned());
                Ok(())
            }
            None => Err(StoreError::not_found(id)),
        }
    }

    async fn delete_media(&self, id: &CreationId, url: &str) -> StoreResult<()> {
        self.check()?;
        if let Some(creation) = self.rows.write().get_mut(id) {
            creation.remove_media(url);
        }
        Ok(())
    }
}
