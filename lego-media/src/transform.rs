//! Delivery URL transformations.

use lego_core::MediaItem;
use reqwest::Url;

use crate::MediaHostConfig;

/// Resize/quality options for delivered images. `None` means `auto`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageOptions {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub quality: Option<String>,
    pub format: Option<String>,
}

impl ImageOptions {
    pub fn sized(width: u32, height: u32) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
            ..Self::default()
        }
    }
}

fn or_auto<T: ToString>(value: &Option<T>) -> String {
    value.as_ref().map(|v| v.to_string()).unwrap_or_else(|| "auto".to_string())
}

/// `{res_base}/{cloud}/image/upload/w_{w},h_{h},q_{q},f_{f}/{public_id}`
pub fn optimized_image_url(config: &MediaHostConfig, public_id: &str, opts: &ImageOptions) -> String {
    format!(
        "{}/{}/image/upload/w_{},h_{},q_{},f_{}/{}",
        config.res_base,
        config.cloud_name,
        or_auto(&opts.width),
        or_auto(&opts.height),
        or_auto(&opts.quality),
        or_auto(&opts.format),
        public_id.trim_start_matches('/'),
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThumbnailOptions {
    pub width: u32,
    pub height: u32,
    pub format: String,
}

impl Default for ThumbnailOptions {
    fn default() -> Self {
        Self {
            width: 300,
            height: 200,
            format: "jpg".to_string(),
        }
    }
}

/// Still-frame URL for a hosted video.
///
/// Inserts `c_thumb,w_{w},h_{h}` right after the `upload` path segment and
/// swaps the file extension. Returns `None` for URLs not served by the host.
pub fn video_thumbnail_url(video_url: &str, opts: &ThumbnailOptions) -> Option<String> {
    let url = Url::parse(video_url).ok()?;
    if !url.host_str()?.ends_with("cloudinary.com") {
        return None;
    }

    let segments: Vec<&str> = url.path().split('/').collect();
    let upload = segments.iter().position(|s| *s == "upload")?;
    let file_path = segments[upload + 1..].join("/");
    if file_path.is_empty() {
        return None;
    }
    let stem = match file_path.rsplit_once('.') {
        Some((stem, ext)) if !ext.contains('/') => stem,
        _ => file_path.as_str(),
    };

    let head = segments[..=upload].join("/");
    let mut out = url.clone();
    out.set_path(&format!(
        "{}/c_thumb,w_{},h_{}/{}.{}",
        head, opts.width, opts.height, stem, opts.format
    ));
    out.set_query(None);
    Some(out.to_string())
}

/// Preview URL for any media item.
///
/// Videos get a still frame. Images delivered by the configured host are
/// resized through it; anything else is served as is.
pub fn media_thumbnail(item: &MediaItem, host: Option<&MediaHostConfig>, opts: &ThumbnailOptions) -> Option<String> {
    if item.url.is_empty() {
        return None;
    }
    if item.is_video() {
        return video_thumbnail_url(&item.url, opts);
    }
    match (host, item.public_id.as_deref()) {
        (Some(config), Some(public_id)) if item.url.starts_with(&config.res_base) => Some(optimized_image_url(
            config,
            public_id,
            &ImageOptions::sized(opts.width, opts.height),
        )),
        _ => Some(item.url.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lego_core::MediaType;

    #[test]
    fn optimized_url_defaults_to_auto() {
        let config = MediaHostConfig::new("bricks");
        assert_eq!(
            optimized_image_url(&config, "lego-creations/1/castle/a", &ImageOptions::sized(400, 300)),
            "https://res.cloudinary.com/bricks/image/upload/w_400,h_300,q_auto,f_auto/lego-creations/1/castle/a"
        );
    }

    #[test]
    fn video_thumbnail_inserts_transformation() {
        let url = "https://res.cloudinary.com/cloud/video/upload/v123/folder/file.mp4";
        assert_eq!(
            video_thumbnail_url(url, &ThumbnailOptions::default()).as_deref(),
            Some("https://res.cloudinary.com/cloud/video/upload/c_thumb,w_300,h_200/v123/folder/file.jpg")
        );
        assert_eq!(video_thumbnail_url("https://media.test/video/upload/a.mp4", &ThumbnailOptions::default()), None);
        assert_eq!(video_thumbnail_url("https://res.cloudinary.com/cloud/raw/a.mp4", &ThumbnailOptions::default()), None);
        assert_eq!(video_thumbnail_url("not a url", &ThumbnailOptions::default()), None);
    }

    #[test]
    fn media_thumbnail_per_kind() {
        let opts = ThumbnailOptions::default();
        let image = MediaItem::new("https://x/a.png", "a");
        assert_eq!(media_thumbnail(&image, None, &opts).as_deref(), Some("https://x/a.png"));

        let config = MediaHostConfig::new("bricks");
        let hosted = MediaItem::new("https://res.cloudinary.com/bricks/image/upload/v1/p/a.png", "a")
            .with_public_id("p/a");
        assert_eq!(
            media_thumbnail(&hosted, Some(&config), &opts).as_deref(),
            Some("https://res.cloudinary.com/bricks/image/upload/w_300,h_200,q_auto,f_auto/p/a")
        );
        assert_eq!(media_thumbnail(&image, Some(&config), &opts).as_deref(), Some("https://x/a.png"));

        let video = MediaItem::new("https://res.cloudinary.com/c/video/upload/v1/a", "a")
            .with_media_type(MediaType::Video);
        assert_eq!(
            media_thumbnail(&video, Some(&config), &opts).as_deref(),
            Some("https://res.cloudinary.com/c/video/upload/c_thumb,w_300,h_200/v1/a.jpg")
        );
    }
}
