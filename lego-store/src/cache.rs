use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use lego_core::{Creation, CreationId, MediaItem};
use parking_lot::Mutex;
use serde_json::Value;

use crate::StoreResult;

/// Name the cache is stored under.
pub const CACHE_KEY: &str = "aidens-lego-creations";

/// Local mirror of creation metadata.
///
/// Only `get` and `update_all` are required; the rest are expressed on top
/// of them. `get` is best effort and never fails: unreadable data is an
/// empty list.
pub trait CacheStore: Send + Sync {
    /// Cached creations, newest first.
    fn get(&self) -> Vec<Creation>;

    /// Apply `f` to the cached list and persist the result.
    fn update_all(&self, f: &mut dyn FnMut(&mut Vec<Creation>)) -> StoreResult<()>;

    fn put_all(&self, creations: Vec<Creation>) -> StoreResult<()> {
        let mut next = Some(creations);
        self.update_all(&mut |list| {
            if let Some(replacement) = next.take() {
                *list = replacement;
            }
        })
    }

    /// Insert or replace by id.
    fn upsert(&self, creation: &Creation) -> StoreResult<()> {
        self.update_all(&mut |list| {
            list.retain(|c| c.id != creation.id);
            list.push(creation.clone());
        })
    }

    fn remove(&self, id: &CreationId) -> StoreResult<()> {
        self.update_all(&mut |list| list.retain(|c| &c.id != id))
    }

    fn rename(&self, id: &CreationId, name: &str) -> StoreResult<()> {
        self.update_all(&mut |list| {
            for c in list.iter_mut().filter(|c| &c.id == id) {
                c.name = name.to_string();
            }
        })
    }

    fn add_media(&self, id: &CreationId, items: &[MediaItem]) -> StoreResult<()> {
        self.update_all(&mut |list| {
            for c in list.iter_mut().filter(|c| &c.id == id) {
                c.add_media(items.iter().cloned());
            }
        })
    }

    fn remove_media(&self, id: &CreationId, url: &str) -> StoreResult<()> {
        self.update_all(&mut |list| {
            for c in list.iter_mut().filter(|c| &c.id == id) {
                c.remove_media(url);
            }
        })
    }
}

/// Cache persisted as a JSON array in a single file.
pub struct FileCache {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileCache {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// `{dir}/aidens-lego-creations.json`
    pub fn in_dir<P: AsRef<Path>>(dir: P) -> Self {
        Self::new(dir.as_ref().join(format!("{CACHE_KEY}.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Vec<Creation> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "cache unreadable");
                return Vec::new();
            }
        };
        let mut creations = decode(&raw);
        Creation::sort_newest_first(&mut creations);
        creations
    }

    fn write(&self, creations: &[Creation]) -> StoreResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(creations)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// Parse cached JSON, skipping entries that do not decode. Anything that is
/// not a JSON array is treated as an empty cache.
fn decode(raw: &str) -> Vec<Creation> {
    let entries = match serde_json::from_str::<Value>(raw) {
        Ok(Value::Array(entries)) => entries,
        Ok(_) | Err(_) => {
            tracing::warn!("cache is corrupt, starting empty");
            return Vec::new();
        }
    };
    entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value::<Creation>(entry) {
            Ok(creation) => Some(creation),
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable cache entry");
                None
            }
        })
        .collect()
}

impl CacheStore for FileCache {
    fn get(&self) -> Vec<Creation> {
        let _guard = self.lock.lock();
        self.read()
    }

    fn update_all(&self, f: &mut dyn FnMut(&mut Vec<Creation>)) -> StoreResult<()> {
        let _guard = self.lock.lock();
        let mut creations = self.read();
        f(&mut creations);
        Creation::sort_newest_first(&mut creations);
        self.write(&creations)
    }
}

/// In-process cache.
#[derive(Default)]
pub struct MemoryCache {
    creations: Mutex<Vec<Creation>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_creations(mut creations: Vec<Creation>) -> Self {
        Creation::sort_newest_first(&mut creations);
        Self {
            creations: Mutex::new(creations),
        }
    }
}

impl CacheStore for MemoryCache {
    fn get(&self) -> Vec<Creation> {
        self.creations.lock().clone()
    }

    fn update_all(&self, f: &mut dyn FnMut(&mut Vec<Creation>)) -> StoreResult<()> {
        let mut creations = self.creations.lock();
        f(&mut creations);
        Creation::sort_newest_first(&mut creations);
        Ok(())
    }
}
