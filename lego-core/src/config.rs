//! # Configuration
//!
//! A flat string key/value store, filled from the environment at startup and
//! read through immutable snapshots afterwards.
//!
//! ```rust
//! use lego_core::LegoConfig;
//!
//! let mut config = LegoConfig::new();
//! config.set("media.cloudName", "bricks");
//!
//! let snapshot = config.snapshot();
//! assert_eq!(snapshot.get("media.cloudName"), Some("bricks"));
//! assert_eq!(snapshot.masked("media.cloudName"), "bri***");
//! ```
//!
//! Known environment variables are mapped onto dotted keys by
//! [`LegoConfig::from_env`]. Each variable is also accepted with the
//! `REACT_APP_` prefix used by older deployments; the bare name wins.

use std::collections::HashMap;

/// Prefix accepted in front of every known environment variable.
pub const LEGACY_ENV_PREFIX: &str = "REACT_APP_";

/// Environment variable → config key.
pub const ENV_KEYS: &[(&str, &str)] = &[
    ("CLOUDINARY_CLOUD_NAME", "media.cloudName"),
    ("CLOUDINARY_API_KEY", "media.apiKey"),
    ("CLOUDINARY_API_SECRET", "media.apiSecret"),
    ("CLOUDINARY_UPLOAD_PRESET", "media.uploadPreset"),
    ("CLOUDINARY_TIMEOUT_SECS", "media.timeoutSecs"),
    ("SUPABASE_URL", "store.url"),
    ("SUPABASE_ANON_KEY", "store.anonKey"),
    ("SUPABASE_USER_ID", "store.userId"),
    ("SUPABASE_TIMEOUT_SECS", "store.timeoutSecs"),
    ("LEGO_CACHE_PATH", "cache.path"),
    ("HTTP_HOST", "http.host"),
    ("HTTP_PORT", "http.port"),
];

#[derive(Debug, Default)]
pub struct LegoConfig {
    values: HashMap<String, String>,
}

impl LegoConfig {
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    /// Build a config from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from any variable lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::new();
        for (var, key) in ENV_KEYS {
            let value = lookup(var)
                .or_else(|| lookup(&format!("{LEGACY_ENV_PREFIX}{var}")))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty());
            if let Some(value) = value {
                config.set(*key, value);
            }
        }
        config
    }

    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|s| s.as_str())
    }

    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn snapshot(&self) -> LegoConfigSnapshot {
        LegoConfigSnapshot::new(self.values.clone())
    }
}

#[derive(Debug, Clone, Default)]
pub struct LegoConfigSnapshot {
    map: HashMap<String, String>,
}

impl LegoConfigSnapshot {
    pub(crate) fn new(map: HashMap<String, String>) -> Self {
        Self { map }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(|s| s.as_str())
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.map.get(key).cloned()
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(|v| v.parse::<u64>().ok())
    }

    pub fn has(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    pub fn has_all(&self, keys: &[&str]) -> bool {
        keys.iter().all(|k| self.has(k))
    }

    /// First three characters followed by `***`, or `missing`.
    pub fn masked(&self, key: &str) -> String {
        match self.get(key) {
            Some(v) => format!("{}***", v.chars().take(3).collect::<String>()),
            None => "missing".to_string(),
        }
    }

    /// `***` when present, `missing` otherwise. For secrets.
    pub fn redacted(&self, key: &str) -> String {
        if self.has(key) {
            "***".to_string()
        } else {
            "missing".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_lookup_maps_known_variables_and_legacy_prefix() {
        let config = LegoConfig::from_lookup(|name| match name {
            "CLOUDINARY_CLOUD_NAME" => Some("bricks".into()),
            "REACT_APP_CLOUDINARY_CLOUD_NAME" => Some("legacy".into()),
            "REACT_APP_SUPABASE_URL" => Some("https://db.example".into()),
            "SUPABASE_ANON_KEY" => Some("   ".into()),
            _ => None,
        });

        assert_eq!(config.get("media.cloudName"), Some("bricks"));
        assert_eq!(config.get("store.url"), Some("https://db.example"));
        assert!(!config.has("store.anonKey"));
    }

    #[test]
    fn snapshot_masks_values() {
        let mut config = LegoConfig::new();
        config.set("media.apiKey", "1234567");
        config.set("media.apiSecret", "s3cr3t");
        config.set("media.timeoutSecs", "15");
        let snap = config.snapshot();

        assert_eq!(snap.masked("media.apiKey"), "123***");
        assert_eq!(snap.masked("media.cloudName"), "missing");
        assert_eq!(snap.redacted("media.apiSecret"), "***");
        assert_eq!(snap.get_u64("media.timeoutSecs"), Some(15));
        assert!(snap.has_all(&["media.apiKey", "media.apiSecret"]));
        assert!(!snap.has_all(&["media.apiKey", "media.cloudName"]));
    }
}
