//! Read-side helpers for the gallery views.

use serde::Serialize;

use crate::model::{Creation, CreationId, MediaItem};

/// Number of creations shown in the "recent" strip.
pub const RECENT_LIMIT: usize = 3;

/// Creations that can be shown: those with at least one media item.
pub fn visible(creations: Vec<Creation>) -> Vec<Creation> {
    creations.into_iter().filter(Creation::is_displayable).collect()
}

/// A media item together with the creation it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaEntry {
    pub creation_id: CreationId,
    pub creation_name: String,
    #[serde(flatten)]
    pub item: MediaItem,
}

/// Flattened media list across creations, in creation order.
pub fn all_media(creations: &[Creation]) -> Vec<MediaEntry> {
    creations
        .iter()
        .flat_map(|c| {
            c.photos.iter().map(move |item| MediaEntry {
                creation_id: c.id.clone(),
                creation_name: c.name.clone(),
                item: item.clone(),
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentCreation {
    pub id: CreationId,
    pub name: String,
    pub cover: Option<MediaItem>,
    pub media_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryStats {
    pub creations: usize,
    pub media: usize,
    pub recent: Vec<RecentCreation>,
}

impl GalleryStats {
    /// Expects `creations` already ordered newest first.
    pub fn from_creations(creations: &[Creation]) -> Self {
        let shown: Vec<&Creation> = creations.iter().filter(|c| c.is_displayable()).collect();
        Self {
            creations: shown.len(),
            media: shown.iter().map(|c| c.media_count()).sum(),
            recent: shown
                .iter()
                .take(RECENT_LIMIT)
                .map(|c| RecentCreation {
                    id: c.id.clone(),
                    name: c.name.clone(),
                    cover: c.cover().cloned(),
                    media_count: c.media_count(),
                })
                .collect(),
        }
    }
}
