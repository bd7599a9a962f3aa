use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// File extensions treated as video when no media type was recorded.
const VIDEO_EXTENSIONS: [&str; 5] = [".mp4", ".mov", ".avi", ".webm", ".m4v"];

/// Identifier of a creation.
///
/// Ids are client generated from the wall clock (milliseconds since the
/// UNIX epoch, rendered as decimal). Older cache entries stored the id as a
/// JSON number, so deserialization accepts both shapes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CreationId(pub String);

impl CreationId {
    /// Generate a new time-based id.
    pub fn new() -> Self {
        Self::from_time(Utc::now())
    }

    pub fn from_time(at: DateTime<Utc>) -> Self {
        Self(at.timestamp_millis().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CreationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CreationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CreationId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for CreationId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl<'de> Deserialize<'de> for CreationId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Number(u64),
        }

        match RawId::deserialize(deserializer)? {
            RawId::Text(s) => Ok(Self(s)),
            RawId::Number(n) => Ok(Self(n.to_string())),
        }
    }
}

/// Kind of media stored for a creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    #[default]
    Image,
    Video,
}

impl MediaType {
    /// Resolve the media type of a stored item.
    ///
    /// A declared `video` always wins; otherwise the URL extension decides.
    pub fn detect(url: &str, declared: Option<MediaType>) -> Self {
        if declared == Some(MediaType::Video) {
            return MediaType::Video;
        }
        let lower = url.to_lowercase();
        if VIDEO_EXTENSIONS.iter().any(|ext| lower.contains(ext)) {
            MediaType::Video
        } else {
            MediaType::Image
        }
    }

    pub fn from_content_type(content_type: &str) -> Self {
        if content_type.trim().to_lowercase().starts_with("video/") {
            MediaType::Video
        } else {
            MediaType::Image
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Image => "image",
            MediaType::Video => "video",
        }
    }
}

/// One photo or video belonging to a creation.
///
/// The URL is the natural key inside a creation: it is what delete
/// operations match on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default)]
    pub media_type: MediaType,
}

impl MediaItem {
    pub fn new<U: Into<String>, N: Into<String>>(url: U, name: N) -> Self {
        let url = url.into();
        let media_type = MediaType::detect(&url, None);
        Self {
            url,
            public_id: None,
            name: name.into(),
            width: None,
            height: None,
            media_type,
        }
    }

    pub fn with_public_id<S: Into<String>>(mut self, public_id: S) -> Self {
        self.public_id = Some(public_id.into());
        self
    }

    pub fn with_dimensions(mut self, width: Option<u32>, height: Option<u32>) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_media_type(mut self, media_type: MediaType) -> Self {
        self.media_type = media_type;
        self
    }

    /// True when the item is embedded as a data URI instead of hosted remotely.
    pub fn is_inline(&self) -> bool {
        self.url.starts_with("data:")
    }

    pub fn is_video(&self) -> bool {
        MediaType::detect(&self.url, Some(self.media_type)) == MediaType::Video
    }
}

/// A named collection of media items representing one physical build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Creation {
    pub id: CreationId,
    pub name: String,
    pub date_added: DateTime<Utc>,
    #[serde(default)]
    pub photos: Vec<MediaItem>,
}

impl Creation {
    /// Start a new creation stamped with a fresh id and the current time.
    pub fn new<S: Into<String>>(name: S) -> Self {
        let now = Utc::now();
        Self {
            id: CreationId::from_time(now),
            name: name.into(),
            date_added: now,
            photos: Vec::new(),
        }
    }

    pub fn with_id<I: Into<CreationId>>(mut self, id: I) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_date_added(mut self, date_added: DateTime<Utc>) -> Self {
        self.date_added = date_added;
        self
    }

    pub fn with_photos(mut self, photos: Vec<MediaItem>) -> Self {
        self.photos = Vec::new();
        self.add_media(photos);
        self
    }

    pub fn media_count(&self) -> usize {
        self.photos.len()
    }

    /// Creations without media are never shown.
    pub fn is_displayable(&self) -> bool {
        !self.photos.is_empty()
    }

    pub fn cover(&self) -> Option<&MediaItem> {
        self.photos.first()
    }

    pub fn contains_url(&self, url: &str) -> bool {
        self.photos.iter().any(|p| p.url == url)
    }

    /// Append media, skipping URLs already present. Returns how many were added.
    pub fn add_media<I>(&mut self, items: I) -> usize
    where
        I: IntoIterator<Item = MediaItem>,
    {
        let mut added = 0;
        for item in items {
            if self.contains_url(&item.url) {
                continue;
            }
            self.photos.push(item);
            added += 1;
        }
        added
    }

    /// Remove the item with the given URL. Returns whether anything was removed.
    pub fn remove_media(&mut self, url: &str) -> bool {
        let before = self.photos.len();
        self.photos.retain(|p| p.url != url);
        self.photos.len() != before
    }

    /// Order creations by `date_added`, newest first. Ties keep their order.
    pub fn sort_newest_first(creations: &mut [Creation]) {
        creations.sort_by(|a, b| b.date_added.cmp(&a.date_added));
    }
}
