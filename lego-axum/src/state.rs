use std::sync::Arc;

use lego_core::{LegoConfigSnapshot, UploadRules};
use lego_media::{CloudinaryHost, MediaHost, MediaHostConfig};
use lego_store::{
    CacheStore, CreationStore, FileCache, RestCreationStore, RestStoreConfig, SyncFacade,
    UnavailableStore, CACHE_KEY,
};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub sync: Arc<SyncFacade>,

    /// `None` when no media host is configured; uploads are then inlined.
    pub media: Option<Arc<dyn MediaHost>>,

    pub config: Arc<LegoConfigSnapshot>,
    pub rules: Arc<UploadRules>,
}

impl AppState {
    pub fn new(sync: SyncFacade, media: Option<Arc<dyn MediaHost>>, config: LegoConfigSnapshot) -> Self {
        Self {
            sync: Arc::new(sync),
            media,
            config: Arc::new(config),
            rules: Arc::new(UploadRules::default()),
        }
    }

    pub fn with_rules(mut self, rules: UploadRules) -> Self {
        self.rules = Arc::new(rules);
        self
    }

    /// Wire every tier from configuration. Missing tiers degrade instead
    /// of failing: no store means cache-only reads, no media host means
    /// inline uploads.
    pub fn from_config(config: LegoConfigSnapshot) -> anyhow::Result<Self> {
        let store: Arc<dyn CreationStore> = match RestStoreConfig::from_config(&config) {
            Ok(settings) => Arc::new(RestCreationStore::new(settings)?),
            Err(e) => {
                tracing::warn!(error = %e, "relational store disabled");
                Arc::new(UnavailableStore::new(e.to_string()))
            }
        };

        let cache_path = config
            .get_string("cache.path")
            .unwrap_or_else(|| format!("./{CACHE_KEY}.json"));
        let cache: Arc<dyn CacheStore> = Arc::new(FileCache::new(cache_path));

        let media: Option<Arc<dyn MediaHost>> = match MediaHostConfig::from_config(&config) {
            Ok(settings) => {
                if !settings.can_upload() {
                    tracing::warn!("media.uploadPreset is not set, uploads will be inlined");
                }
                Some(Arc::new(CloudinaryHost::new(settings)?))
            }
            Err(e) => {
                tracing::warn!(error = %e, "media host disabled");
                None
            }
        };

        Ok(Self::new(SyncFacade::new(store, cache), media, config))
    }

    /// The media host, if it can take uploads.
    pub fn uploader(&self) -> Option<&Arc<dyn MediaHost>> {
        self.media.as_ref().filter(|m| m.capabilities().can_upload)
    }
}
