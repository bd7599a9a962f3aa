use lego_core::LegoConfigSnapshot;

use crate::{MediaError, MediaResult};

/// Folder every creation asset lives under on the host.
pub const DEFAULT_FOLDER: &str = "lego-creations";

/// Settings for the hosted media API
#[derive(Debug, Clone)]
pub struct MediaHostConfig {
    pub cloud_name: String,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,

    /// Unsigned upload preset; uploads are impossible without it
    pub upload_preset: Option<String>,

    pub folder: String,

    /// Base of the upload/admin API
    pub api_base: String,

    /// Base of the public delivery domain (list endpoint, transformed URLs)
    pub res_base: String,

    pub timeout_secs: u64,
}

impl MediaHostConfig {
    pub fn new<S: Into<String>>(cloud_name: S) -> Self {
        Self {
            cloud_name: cloud_name.into(),
            api_key: None,
            api_secret: None,
            upload_preset: None,
            folder: DEFAULT_FOLDER.to_string(),
            api_base: "https://api.cloudinary.com".to_string(),
            res_base: "https://res.cloudinary.com".to_string(),
            timeout_secs: 30,
        }
    }

    /// Read `media.*` keys. Only the cloud name is mandatory here; the
    /// operations that need more check for it themselves.
    pub fn from_config(config: &LegoConfigSnapshot) -> MediaResult<Self> {
        let cloud_name = config
            .get_string("media.cloudName")
            .ok_or_else(|| MediaError::config("media.cloudName is not set"))?;

        let mut out = Self::new(cloud_name);
        out.api_key = config.get_string("media.apiKey");
        out.api_secret = config.get_string("media.apiSecret");
        out.upload_preset = config.get_string("media.uploadPreset");
        if let Some(secs) = config.get_u64("media.timeoutSecs") {
            out.timeout_secs = secs;
        }
        Ok(out)
    }

    pub fn with_credentials<K: Into<String>, S: Into<String>>(mut self, api_key: K, api_secret: S) -> Self {
        self.api_key = Some(api_key.into());
        self.api_secret = Some(api_secret.into());
        self
    }

    pub fn with_upload_preset<S: Into<String>>(mut self, preset: S) -> Self {
        self.upload_preset = Some(preset.into());
        self
    }

    pub fn with_api_base<S: Into<String>>(mut self, base: S) -> Self {
        self.api_base = base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_res_base<S: Into<String>>(mut self, base: S) -> Self {
        self.res_base = base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn can_upload(&self) -> bool {
        self.upload_preset.is_some()
    }

    pub fn can_search(&self) -> bool {
        self.api_key.is_some() && self.api_secret.is_some()
    }

    pub fn search_credentials(&self) -> MediaResult<(&str, &str)> {
        match (self.api_key.as_deref(), self.api_secret.as_deref()) {
            (Some(key), Some(secret)) => Ok((key, secret)),
            _ => Err(MediaError::config("media.apiKey and media.apiSecret are required for search")),
        }
    }

    pub fn upload_url(&self, resource_type: &str) -> String {
        format!("{}/v1_1/{}/{}/upload", self.api_base, self.cloud_name, resource_type)
    }

    pub fn search_url(&self) -> String {
        format!("{}/v1_1/{}/resources/search", self.api_base, self.cloud_name)
    }

    pub fn list_url(&self) -> String {
        format!("{}/{}/image/list/{}.json", self.res_base, self.cloud_name, self.folder)
    }
}
