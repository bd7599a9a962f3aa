//! Rebuild creations from hosted objects alone.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use lego_core::{Creation, CreationId};

use crate::HostedResource;

pub const UNTITLED: &str = "Untitled Creation";

/// Group hosted objects into creations.
///
/// Objects are matched to a creation by tag (or, failing that, by storage
/// path); objects matching neither are skipped. Name and date come from the
/// first object seen for a creation, defaulting to [`UNTITLED`] and `now`.
/// The result is ordered newest first.
pub fn group_resources(resources: Vec<HostedResource>, folder: &str, now: DateTime<Utc>) -> Vec<Creation> {
    let mut order: Vec<CreationId> = Vec::new();
    let mut by_id: HashMap<CreationId, Creation> = HashMap::new();

    for resource in resources {
        let Some(id) = resource.creation_id(folder) else {
            tracing::debug!(public_id = %resource.public_id, "skipping untagged object");
            continue;
        };

        let creation = by_id.entry(id.clone()).or_insert_with(|| {
            order.push(id.clone());
            let name = resource
                .context_value("creationName")
                .filter(|n| !n.trim().is_empty())
                .unwrap_or(UNTITLED);
            let date = resource
                .context_value("dateAdded")
                .and_then(|d| DateTime::parse_from_rfc3339(d).ok())
                .map(|d| d.with_timezone(&Utc))
                .unwrap_or(now);
            Creation::new(name).with_id(id).with_date_added(date)
        });
        creation.add_media([resource.to_media_item()]);
    }

    let mut creations: Vec<Creation> = order.into_iter().filter_map(|id| by_id.remove(&id)).collect();
    Creation::sort_newest_first(&mut creations);
    creations
}
