use std::time::Duration;

use async_trait::async_trait;
use lego_core::MediaType;
use reqwest::{multipart, Client, Response};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::types::ResourceList;
use crate::{
    HostCapabilities, HostedResource, MediaError, MediaHost, MediaHostConfig, MediaResult,
    MediaUpload, SearchQuery, UploadMetadata, UploadReceipt,
};

/// Media host backed by the Cloudinary HTTP API.
///
/// Uploads are unsigned (they go through the configured upload preset).
/// Search first tries the public list endpoint and falls back to the
/// authenticated search endpoint.
pub struct CloudinaryHost {
    client: Client,
    config: MediaHostConfig,
}

impl CloudinaryHost {
    pub fn new(config: MediaHostConfig) -> MediaResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &MediaHostConfig {
        &self.config
    }

    async fn list_public(&self) -> MediaResult<Vec<HostedResource>> {
        let response = self
            .client
            .get(self.config.list_url())
            .header("Accept", "application/json")
            .send()
            .await?;
        let response = ensure_success(response).await?;
        let mut body: Value = response.json().await?;
        fill_delivery_urls(&mut body, &self.config);
        let list: ResourceList = serde_json::from_value(body)
            .map_err(|e| MediaError::parse(format!("list response: {e}")))?;
        Ok(list.resources)
    }

    async fn search_authenticated(&self, query: &SearchQuery) -> MediaResult<Vec<HostedResource>> {
        let (api_key, api_secret) = self.config.search_credentials()?;
        let response = self
            .client
            .post(self.config.search_url())
            .basic_auth(api_key, Some(api_secret))
            .json(&search_body(query))
            .send()
            .await?;
        let response = ensure_success(response).await?;
        let body: Value = response.json().await?;
        let list: ResourceList = serde_json::from_value(body)
            .map_err(|e| MediaError::parse(format!("search response: {e}")))?;
        Ok(list.resources)
    }
}

#[async_trait]
impl MediaHost for CloudinaryHost {
    async fn upload(&self, upload: MediaUpload, metadata: &UploadMetadata) -> MediaResult<UploadReceipt> {
        let preset = self
            .config
            .upload_preset
            .clone()
            .ok_or_else(|| MediaError::upload("no upload preset configured"))?;

        let media_type = upload.media_type();
        let public_id = metadata.public_id_for(&upload);
        let size = upload.size();

        let file = multipart::Part::bytes(upload.bytes.to_vec())
            .file_name(upload.filename.clone())
            .mime_str(&upload.content_type)?;
        let form = multipart::Form::new()
            .part("file", file)
            .text("upload_preset", preset)
            .text("folder", self.config.folder.clone())
            .text("tags", metadata.tag())
            .text("context", metadata.context())
            .text("public_id", public_id);

        tracing::debug!(
            file = %upload.filename,
            bytes = size,
            media = media_type.as_str(),
            "uploading to media host"
        );

        let response = self
            .client
            .post(self.config.upload_url(media_type.as_str()))
            .multipart(form)
            .send()
            .await?;
        let response = ensure_success(response).await?;
        let body: Value = response.json().await?;
        parse_upload(body, media_type)
    }

    async fn search(&self, query: &SearchQuery) -> MediaResult<Vec<HostedResource>> {
        match self.list_public().await {
            Ok(resources) => {
                tracing::info!(count = resources.len(), "using list endpoint");
                return Ok(resources);
            }
            Err(e) => tracing::debug!(error = %e, "list endpoint unavailable, trying search"),
        }
        self.search_authenticated(query).await
    }

    fn capabilities(&self) -> HostCapabilities {
        let mut caps = HostCapabilities::none();
        if self.config.can_upload() {
            caps = caps.with_upload();
        }
        if self.config.can_search() {
            caps = caps.with_search();
        }
        caps
    }
}

async fn ensure_success(response: Response) -> MediaResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response.text().await.unwrap_or_default();
    Err(MediaError::rejected(status.as_u16(), error_message(&text)))
}

/// `error.message` from a host error body, or the raw text.
fn error_message(text: &str) -> String {
    serde_json::from_str::<Value>(text)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| text.to_string())
}

fn search_body(query: &SearchQuery) -> Value {
    json!({
        "expression": query.expression(),
        "with_field": ["context", "tags"],
        "max_results": query.max_results,
        "sort_by": [{ "created_at": "desc" }],
    })
}

#[derive(Deserialize)]
struct RawUpload {
    secure_url: String,
    public_id: String,
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
    #[serde(default)]
    resource_type: Option<String>,
}

fn parse_upload(body: Value, requested: MediaType) -> MediaResult<UploadReceipt> {
    let raw: RawUpload = serde_json::from_value(body)
        .map_err(|e| MediaError::parse(format!("upload response: {e}")))?;
    let declared = match raw.resource_type.as_deref() {
        Some("video") => MediaType::Video,
        Some(_) => MediaType::Image,
        None => requested,
    };
    Ok(UploadReceipt {
        media_type: MediaType::detect(&raw.secure_url, Some(declared)),
        url: raw.secure_url,
        public_id: raw.public_id,
        width: raw.width,
        height: raw.height,
    })
}

/// The list endpoint reports `version`/`format` rather than a URL; build
/// the delivery URL for entries that lack one.
fn fill_delivery_urls(body: &mut Value, config: &MediaHostConfig) {
    let Some(resources) = body.get_mut("resources").and_then(Value::as_array_mut) else {
        return;
    };
    for resource in resources {
        if resource.get("secure_url").and_then(Value::as_str).is_some() {
            continue;
        }
        let (Some(public_id), Some(format)) = (
            resource.get("public_id").and_then(Value::as_str),
            resource.get("format").and_then(Value::as_str),
        ) else {
            continue;
        };
        let kind = resource
            .get("resource_type")
            .and_then(Value::as_str)
            .unwrap_or("image");
        let version = resource
            .get("version")
            .and_then(Value::as_u64)
            .map(|v| format!("v{v}/"))
            .unwrap_or_default();
        let url = format!(
            "{}/{}/{}/upload/{}{}.{}",
            config.res_base, config.cloud_name, kind, version, public_id, format
        );
        resource["secure_url"] = Value::String(url);
    }
}
