use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use lego_core::{Creation, CreationId, LegoConfigSnapshot, MediaItem, MediaType};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::{CreationStore, StoreError, StoreResult};

const FETCH_SELECT: &str = "id,name,date_added,photos(url,public_id,name,width,height,media_type)";

/// Connection settings for the hosted PostgREST API
#[derive(Debug, Clone)]
pub struct RestStoreConfig {
    /// Project URL, without the `/rest/v1` suffix
    pub url: String,
    pub anon_key: String,

    /// Owner recorded on inserted creations
    pub user_id: Option<String>,

    /// User session token; requests fall back to the anon key without one
    pub access_token: Option<String>,

    pub timeout_secs: u64,
}

impl RestStoreConfig {
    pub fn new<U: Into<String>, K: Into<String>>(url: U, anon_key: K) -> Self {
        Self {
            url: url.into().trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
            user_id: None,
            access_token: None,
            timeout_secs: 30,
        }
    }

    /// Read `store.*` keys. `store.url` and `store.anonKey` are required.
    pub fn from_config(config: &LegoConfigSnapshot) -> StoreResult<Self> {
        let url = config
            .get_string("store.url")
            .ok_or_else(|| StoreError::config("store.url is not set"))?;
        let anon_key = config
            .get_string("store.anonKey")
            .ok_or_else(|| StoreError::config("store.anonKey is not set"))?;

        let mut out = Self::new(url, anon_key);
        out.user_id = config.get_string("store.userId");
        if let Some(secs) = config.get_u64("store.timeoutSecs") {
            out.timeout_secs = secs;
        }
        Ok(out)
    }

    pub fn with_user_id<S: Into<String>>(mut self, user_id: S) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_access_token<S: Into<String>>(mut self, token: S) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.url, table)
    }
}

/// Relational store backed by PostgREST (`creations` and `photos` tables).
pub struct RestCreationStore {
    client: Client,
    config: RestStoreConfig,
}

impl RestCreationStore {
    pub fn new(config: RestStoreConfig) -> StoreResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let bearer = self
            .config
            .access_token
            .as_deref()
            .unwrap_or(&self.config.anon_key);
        request
            .header("apikey", &self.config.anon_key)
            .bearer_auth(bearer)
    }

    async fn insert_photos(&self, id: &CreationId, items: &[MediaItem]) -> StoreResult<()> {
        if items.is_empty() {
            return Ok(());
        }
        let rows: Vec<PhotoInsert<'_>> = items.iter().map(|item| PhotoInsert::new(id, item)).collect();
        let request = self
            .client
            .post(self.config.table_url("photos"))
            .query(&[("on_conflict", "creation_id,url")])
            .header("Prefer", "resolution=ignore-duplicates,return=minimal")
            .json(&rows);
        let response = self.authorize(request).send().await?;
        check(response, id).await?;
        Ok(())
    }
}

#[async_trait]
impl CreationStore for RestCreationStore {
    async fn save(&self, creation: &Creation) -> StoreResult<()> {
        let row = CreationInsert {
            id: creation.id.as_str(),
            name: &creation.name,
            date_added: creation.date_added,
            user_id: self.config.user_id.as_deref(),
        };
        let request = self
            .client
            .post(self.config.table_url("creations"))
            .header("Prefer", "return=minimal")
            .json(&[row]);
        let response = self.authorize(request).send().await?;
        check(response, &creation.id).await?;

        // A creation row must not outlive a failed photo insert.
        if let Err(e) = self.insert_photos(&creation.id, &creation.photos).await {
            if let Err(undo) = self.delete(&creation.id).await {
                tracing::warn!(id = %creation.id, error = %undo, "could not remove creation after photo insert failed");
            }
            return Err(e);
        }
        tracing::info!(id = %creation.id, media = creation.photos.len(), "creation saved to store");
        Ok(())
    }

    async fn fetch_all(&self) -> StoreResult<Vec<Creation>> {
        let request = self
            .client
            .get(self.config.table_url("creations"))
            .query(&[("select", FETCH_SELECT), ("order", "date_added.desc")]);
        let response = self.authorize(request).send().await?;
        let response = check(response, &CreationId::from("")).await?;
        let body: Value = response.json().await?;
        let creations = parse_creations(body)?;
        tracing::debug!(count = creations.len(), "fetched creations from store");
        Ok(creations)
    }

    async fn rename(&self, id: &CreationId, name: &str) -> StoreResult<()> {
        let request = self
            .client
            .patch(self.config.table_url("creations"))
            .query(&[("id", format!("eq.{id}"))])
            .header("Prefer", "return=representation")
            .json(&serde_json::json!({ "name": name }));
        let response = self.authorize(request).send().await?;
        let response = check(response, id).await?;
        let rows: Vec<Value> = response
            .json()
            .await
            .map_err(|e| StoreError::parse(format!("rename response: {e}")))?;
        if rows.is_empty() {
            return Err(StoreError::not_found(id));
        }
        Ok(())
    }

    async fn delete(&self, id: &CreationId) -> StoreResult<()> {
        let request = self
            .client
            .delete(self.config.table_url("creations"))
            .query(&[("id", format!("eq.{id}"))]);
        let response = self.authorize(request).send().await?;
        check(response, id).await?;
        Ok(())
    }

    async fn add_media(&self, id: &CreationId, items: &[MediaItem]) -> StoreResult<()> {
        self.insert_photos(id, items).await?;
        tracing::info!(id = %id, media = items.len(), "media added in store");
        Ok(())
    }

    async fn delete_media(&self, id: &CreationId, url: &str) -> StoreResult<()> {
        let request = self
            .client
            .delete(self.config.table_url("photos"))
            .query(&[("creation_id", format!("eq.{id}")), ("url", format!("eq.{url}"))]);
        let response = self.authorize(request).send().await?;
        check(response, id).await?;
        Ok(())
    }
}

#[derive(Serialize)]
struct CreationInsert<'a> {
    id: &'a str,
    name: &'a str,
    date_added: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_id: Option<&'a str>,
}

#[derive(Serialize)]
struct PhotoInsert<'a> {
    creation_id: &'a str,
    url: &'a str,
    public_id: Option<&'a str>,
    name: &'a str,
    width: Option<u32>,
    height: Option<u32>,
    media_type: &'static str,
}

impl<'a> PhotoInsert<'a> {
    fn new(id: &'a CreationId, item: &'a MediaItem) -> Self {
        Self {
            creation_id: id.as_str(),
            url: &item.url,
            public_id: item.public_id.as_deref(),
            name: &item.name,
            width: item.width,
            height: item.height,
            media_type: item.media_type.as_str(),
        }
    }
}

#[derive(Deserialize)]
struct CreationRow {
    id: CreationId,
    name: String,
    #[serde(deserialize_with = "timestamp")]
    date_added: DateTime<Utc>,
    #[serde(default)]
    photos: Vec<PhotoRow>,
}

#[derive(Deserialize)]
struct PhotoRow {
    url: String,
    #[serde(default)]
    public_id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
    #[serde(default)]
    media_type: Option<MediaType>,
}

impl From<CreationRow> for Creation {
    fn from(row: CreationRow) -> Self {
        let photos = row
            .photos
            .into_iter()
            .map(|p| {
                let media_type = MediaType::detect(&p.url, p.media_type);
                let mut item = MediaItem::new(p.url, p.name.unwrap_or_default())
                    .with_dimensions(p.width, p.height)
                    .with_media_type(media_type);
                item.public_id = p.public_id;
                item
            })
            .collect();
        Creation::new(row.name)
            .with_id(row.id)
            .with_date_added(row.date_added)
            .with_photos(photos)
    }
}

/// `timestamptz` comes back with an offset; plain `timestamp` without one.
fn timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if let Ok(at) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(at.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(serde::de::Error::custom)
}

fn parse_creations(body: Value) -> StoreResult<Vec<Creation>> {
    let rows: Vec<CreationRow> =
        serde_json::from_value(body).map_err(|e| StoreError::parse(format!("creations: {e}")))?;
    let mut creations: Vec<Creation> = rows.into_iter().map(Creation::from).collect();
    Creation::sort_newest_first(&mut creations);
    Ok(creations)
}

/// PostgREST error body.
#[derive(Deserialize, Default)]
struct ApiError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

async fn check(response: Response, id: &CreationId) -> StoreResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response.text().await.unwrap_or_default();
    Err(classify(status, &text, id))
}

fn classify(status: StatusCode, body: &str, id: &CreationId) -> StoreError {
    let api: ApiError = serde_json::from_str(body).unwrap_or_default();
    match api.code.as_deref() {
        Some("23505") => return StoreError::conflict(id),
        Some("23503") => return StoreError::not_found(id),
        _ => {}
    }
    if status == StatusCode::CONFLICT {
        return StoreError::conflict(id);
    }
    let detail = api.message.unwrap_or_else(|| body.to_string());
    StoreError::persistence(format!("{} {}", status.as_u16(), detail).trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lego_core::LegoConfig;
    use serde_json::json;

    #[test]
    fn config_requires_url_and_key() {
        let mut config = LegoConfig::new();
        config.set("store.url", "https://db.example/");
        assert!(matches!(
            RestStoreConfig::from_config(&config.snapshot()),
            Err(StoreError::Config { .. })
        ));

        config.set("store.anonKey", "anon");
        let store = RestStoreConfig::from_config(&config.snapshot()).unwrap();
        assert_eq!(store.table_url("photos"), "https://db.example/rest/v1/photos");
    }

    #[test]
    fn rows_parse_into_sorted_creations() {
        let creations = parse_creations(json!([
            {
                "id": "1", "name": "Old", "date_added": "2024-01-01T00:00:00",
                "photos": [{ "url": "https://h/a.mov", "name": null, "media_type": null }]
            },
            {
                "id": 2, "name": "New", "date_added": "2024-03-01T00:00:00+00:00",
                "photos": [
                    { "url": "https://h/b.jpg", "public_id": "p/b", "name": "b", "width": 10, "height": 20, "media_type": "image" }
                ]
            }
        ]))
        .unwrap();

        assert_eq!(creations[0].name, "New");
        assert_eq!(creations[0].photos[0].public_id.as_deref(), Some("p/b"));
        assert_eq!(creations[1].id.as_str(), "1");
        assert_eq!(creations[1].photos[0].media_type, MediaType::Video);
    }

    #[test]
    fn malformed_rows_are_a_parse_error() {
        let err = parse_creations(json!([{ "id": "1" }])).unwrap_err();
        assert!(matches!(err, StoreError::Parse { .. }));
    }

    #[test]
    fn error_codes_are_classified() {
        let id = CreationId::from("9");
        let dup = r#"{"code":"23505","message":"duplicate key value"}"#;
        assert!(matches!(classify(StatusCode::CONFLICT, dup, &id), StoreError::Conflict { .. }));

        let fk = r#"{"code":"23503","message":"violates foreign key constraint"}"#;
        assert!(matches!(classify(StatusCode::CONFLICT, fk, &id), StoreError::NotFound { .. }));

        let err = classify(StatusCode::SERVICE_UNAVAILABLE, "down", &id);
        assert_eq!(err.to_string(), "Store unavailable: 503 down");
    }
}
