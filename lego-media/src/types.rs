use std::collections::BTreeMap;

use bytes::Bytes;
use chrono::{DateTime, SecondsFormat, Utc};
use lego_core::{Creation, CreationId, MediaItem, MediaType};
use serde::{Deserialize, Deserializer};
use uuid::Uuid;

use crate::config::DEFAULT_FOLDER;

/// Tag prefix that scopes a hosted object to one creation.
pub const TAG_PREFIX: &str = "creation-";

/// A file to push to the media host.
#[derive(Debug, Clone)]
pub struct MediaUpload {
    pub filename: String,
    pub content_type: String,
    pub bytes: Bytes,
}

impl MediaUpload {
    pub fn new<N: Into<String>, C: Into<String>, B: Into<Bytes>>(filename: N, content_type: C, bytes: B) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }

    pub fn media_type(&self) -> MediaType {
        MediaType::from_content_type(&self.content_type)
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// File name without its extension.
    pub fn stem(&self) -> &str {
        match self.filename.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => &self.filename,
        }
    }
}

/// Creation details attached to every uploaded object.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadMetadata {
    pub creation_id: CreationId,
    pub creation_name: String,
    pub date_added: DateTime<Utc>,
}

impl UploadMetadata {
    pub fn new<N: Into<String>>(creation_id: CreationId, creation_name: N, date_added: DateTime<Utc>) -> Self {
        Self {
            creation_id,
            creation_name: creation_name.into(),
            date_added,
        }
    }

    pub fn from_creation(creation: &Creation) -> Self {
        Self::new(creation.id.clone(), creation.name.clone(), creation.date_added)
    }

    pub fn tag(&self) -> String {
        format!("{TAG_PREFIX}{}", self.creation_id)
    }

    /// Pipe separated `key=value` context, escaped the way the host expects.
    pub fn context(&self) -> String {
        format!(
            "creationName={}|dateAdded={}",
            escape_context(&self.creation_name),
            escape_context(&self.date_added.to_rfc3339_opts(SecondsFormat::Millis, true)),
        )
    }

    /// Storage path (below the folder) for one file of this creation:
    /// `{id}/{name-slug}/{file-slug}-{suffix}`.
    pub fn public_id_for(&self, upload: &MediaUpload) -> String {
        let suffix = Uuid::new_v4().simple().to_string();
        format!(
            "{}/{}/{}-{}",
            self.creation_id,
            slug(&self.creation_name),
            slug(upload.stem()),
            &suffix[..8]
        )
    }
}

fn escape_context(value: &str) -> String {
    value.replace('\\', "\\\\").replace('|', "\\|").replace('=', "\\=")
}

/// Lowercase ASCII slug; anything else collapses into single dashes.
pub fn slug(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut dash = false;
    for ch in value.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
            dash = false;
        } else if !dash && !out.is_empty() {
            out.push('-');
            dash = true;
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    if out.is_empty() {
        "untitled".to_string()
    } else {
        out
    }
}

/// Recover the creation id from a storage path written by
/// [`UploadMetadata::public_id_for`].
pub fn creation_id_from_path(public_id: &str, folder: &str) -> Option<CreationId> {
    let rest = public_id
        .strip_prefix(folder)
        .and_then(|r| r.strip_prefix('/'))
        .unwrap_or(public_id);
    let parts: Vec<&str> = rest.split('/').collect();
    match parts.as_slice() {
        [id, _name, _file] if !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()) => {
            Some(CreationId::from(*id))
        }
        _ => None,
    }
}

/// What the host returns for a successful upload.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadReceipt {
    pub url: String,
    pub public_id: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub media_type: MediaType,
}

impl UploadReceipt {
    pub fn into_media_item<N: Into<String>>(self, name: N) -> MediaItem {
        MediaItem::new(self.url, name)
            .with_public_id(self.public_id)
            .with_dimensions(self.width, self.height)
            .with_media_type(self.media_type)
    }
}

/// One stored object as reported by the host's list/search endpoints.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HostedResource {
    pub public_id: String,
    pub secure_url: String,
    #[serde(default)]
    pub original_filename: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub resource_type: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "context_map")]
    pub context: BTreeMap<String, String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// The host reports context either flat or nested under `custom`.
fn context_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Shape {
        Custom { custom: BTreeMap<String, String> },
        Flat(BTreeMap<String, String>),
    }

    Ok(match Option::<Shape>::deserialize(deserializer)? {
        Some(Shape::Custom { custom }) => custom,
        Some(Shape::Flat(map)) => map,
        None => BTreeMap::new(),
    })
}

impl HostedResource {
    /// Creation this object belongs to: the scoped tag first, then the path.
    pub fn creation_id(&self, folder: &str) -> Option<CreationId> {
        self.tags
            .iter()
            .find_map(|t| t.strip_prefix(TAG_PREFIX))
            .filter(|id| !id.is_empty())
            .map(CreationId::from)
            .or_else(|| creation_id_from_path(&self.public_id, folder))
    }

    pub fn context_value(&self, key: &str) -> Option<&str> {
        self.context.get(key).map(|s| s.as_str())
    }

    pub fn media_type(&self) -> MediaType {
        let declared = match self.resource_type.as_deref() {
            Some("video") => Some(MediaType::Video),
            Some(_) => Some(MediaType::Image),
            None => None,
        };
        MediaType::detect(&self.secure_url, declared)
    }

    pub fn to_media_item(&self) -> MediaItem {
        MediaItem::new(
            self.secure_url.clone(),
            self.original_filename.clone().unwrap_or_else(|| "photo".to_string()),
        )
        .with_public_id(self.public_id.clone())
        .with_dimensions(self.width, self.height)
        .with_media_type(self.media_type())
    }
}

/// Body of the list and search endpoints.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ResourceList {
    pub resources: Vec<HostedResource>,
}

/// Which objects to look for on the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub folder: String,
    pub max_results: u32,
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            folder: DEFAULT_FOLDER.to_string(),
            max_results: 100,
        }
    }
}

impl SearchQuery {
    pub fn expression(&self) -> String {
        format!("folder:{}", self.folder)
    }
}
