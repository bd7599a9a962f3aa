//! Inline embedding: the fallback when a file cannot be hosted remotely.
//!
//! An inline item is only visible where the creation record itself is
//! stored, so it is a degraded but lossless outcome.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use lego_core::MediaItem;

use crate::MediaUpload;

/// `data:{content_type};base64,{payload}`
pub fn data_uri(content_type: &str, bytes: &[u8]) -> String {
    let content_type = if content_type.trim().is_empty() {
        "application/octet-stream"
    } else {
        content_type.trim()
    };
    format!("data:{};base64,{}", content_type, STANDARD.encode(bytes))
}

/// Build a media item that embeds the file itself.
pub fn inline_item(upload: &MediaUpload) -> MediaItem {
    MediaItem::new(data_uri(&upload.content_type, &upload.bytes), upload.filename.clone())
        .with_media_type(upload.media_type())
}
