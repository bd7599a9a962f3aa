use std::sync::Arc;

use axum::body::Body;
use axum::http::{HeaderValue, Request, StatusCode};
use chrono::{TimeZone, Utc};
use http_body_util::BodyExt;
use lego_axum::{AppState, LegoApp};
use lego_core::{Creation, LegoConfig, MediaItem};
use lego_media::{MediaHost, MediaUpload, MemoryMediaHost, UploadMetadata};
use lego_store::{CacheStore, CreationStore, MemoryCache, MemoryCreationStore, SyncFacade};
use serde_json::{json, Value};
use tower::ServiceExt;

const BOUNDARY: &str = "lego-boundary";

struct Harness {
    app: LegoApp,
    store: Arc<MemoryCreationStore>,
    cache: Arc<MemoryCache>,
    host: Arc<MemoryMediaHost>,
}

fn harness_with(config: LegoConfig) -> Harness {
    let store = Arc::new(MemoryCreationStore::new());
    let cache = Arc::new(MemoryCache::new());
    let host = Arc::new(MemoryMediaHost::new());
    let sync = SyncFacade::new(store.clone(), cache.clone());
    let media: Arc<dyn MediaHost> = host.clone();
    let state = AppState::new(sync, Some(media), config.snapshot());
    Harness {
        app: LegoApp::new(state),
        store,
        cache,
        host,
    }
}

fn harness() -> Harness {
    let mut config = LegoConfig::new();
    config.set("media.cloudName", "bricks");
    config.set("media.apiKey", "1234567890");
    config.set("media.apiSecret", "top-secret");
    harness_with(config)
}

fn creation(id: &str, name: &str, day: u32, media: usize) -> Creation {
    let photos = (0..media)
        .map(|i| MediaItem::new(format!("https://media.test/{id}/{i}.jpg"), format!("{i}.jpg")))
        .collect();
    Creation::new(name)
        .with_id(id)
        .with_date_added(Utc.with_ymd_and_hms(2024, 6, day, 0, 0, 0).single().unwrap())
        .with_photos(photos)
}

async fn send(app: &LegoApp, req: Request<Body>) -> axum::response::Response {
    app.router.clone().oneshot(req).await.unwrap()
}

async fn json_body(res: axum::response::Response) -> Value {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn multipart(uri: &str, name: Option<&str>, files: &[(&str, &str, Vec<u8>)]) -> Request<Body> {
    let mut body = Vec::new();
    if let Some(name) = name {
        body.extend_from_slice(
            format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"name\"\r\n\r\n{name}\r\n").as_bytes(),
        );
    }
    for (filename, content_type, bytes) in files {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"files\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn health_and_request_id() {
    let h = harness();
    let res = send(&h.app, get("/health")).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().get("x-request-id").is_some());

    let provided = HeaderValue::from_static("req-lego-1");
    let res = send(
        &h.app,
        Request::builder()
            .uri("/health")
            .header("x-request-id", provided.clone())
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(res.headers().get("x-request-id").unwrap(), &provided);
}

#[tokio::test]
async fn search_groups_hosted_objects() {
    let h = harness();
    let meta = UploadMetadata::from_creation(&creation("171234", "Castle", 1, 0));
    for file in ["a.jpg", "b.jpg"] {
        h.host
            .upload(MediaUpload::new(file, "image/jpeg", vec![1u8; 8]), &meta)
            .await
            .unwrap();
    }

    let res = send(
        &h.app,
        Request::builder()
            .uri("/api/cloudinary-search")
            .header("origin", "https://lego.example")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers().get("access-control-allow-origin").unwrap(), "*");

    let body = json_body(res).await;
    let creations = body["creations"].as_array().unwrap();
    assert_eq!(creations.len(), 1);
    assert_eq!(creations[0]["id"], "171234");
    assert_eq!(creations[0]["name"], "Castle");
    assert_eq!(creations[0]["photos"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn search_without_credentials_is_500() {
    let mut config = LegoConfig::new();
    config.set("media.cloudName", "bricks");
    let h = harness_with(config);

    let res = send(&h.app, get("/api/cloudinary-search")).await;
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(res).await, json!({ "error": "Cloudinary credentials not configured" }));
}

#[tokio::test]
async fn search_relays_upstream_status() {
    let h = harness();
    h.host.fail_search(Some(401));

    let res = send(&h.app, get("/api/cloudinary-search")).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(res).await;
    assert_eq!(body["error"], "Cloudinary API error");
    assert_eq!(body["status"], 401);
    assert!(body["details"].is_string());
}

#[tokio::test]
async fn search_methods() {
    let h = harness();
    let res = send(
        &h.app,
        Request::builder()
            .method("OPTIONS")
            .uri("/api/cloudinary-search")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = send(
        &h.app,
        Request::builder()
            .method("POST")
            .uri("/api/cloudinary-search")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(json_body(res).await, json!({ "error": "Method not allowed" }));
}

#[tokio::test]
async fn debug_env_masks_credentials() {
    let h = harness();
    let body = json_body(send(&h.app, get("/api/debug-env")).await).await;
    assert_eq!(
        body,
        json!({
            "hasCloudName": true,
            "hasApiKey": true,
            "hasApiSecret": true,
            "cloudName": "bri***",
            "apiKey": "123***",
            "apiSecret": "***"
        })
    );

    let h = harness_with(LegoConfig::new());
    let body = json_body(send(&h.app, get("/api/debug-env")).await).await;
    assert_eq!(body["hasApiKey"], false);
    assert_eq!(body["apiKey"], "missing");
    assert_eq!(body["apiSecret"], "missing");
}

#[tokio::test]
async fn create_then_list() {
    let h = harness();
    let req = multipart(
        "/creations",
        Some("Fire Station"),
        &[
            ("front.jpg", "image/jpeg", vec![1u8; 64]),
            ("notes.txt", "text/plain", vec![2u8; 4]),
        ],
    );
    let res = send(&h.app, req).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let report = json_body(res).await;
    assert_eq!(report["creation"]["name"], "Fire Station");
    assert_eq!(report["files"][0]["placement"], "hosted");
    assert_eq!(report["rejected"].as_array().unwrap().len(), 1);

    let res = send(&h.app, get("/creations")).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body = json_body(res).await;
    assert_eq!(body["source"]["kind"], "store");
    assert!(body["degraded"].is_null());
    assert_eq!(body["creations"].as_array().unwrap().len(), 1);
    assert_eq!(body["creations"][0]["photos"][0]["mediaType"], "image");
    assert_eq!(h.store.len(), 1);
    assert_eq!(h.cache.get().len(), 1);
}

#[tokio::test]
async fn create_with_nothing_valid_is_422() {
    let h = harness();
    let req = multipart("/creations", Some("Empty"), &[("a.bmp", "image/bmp", vec![1u8; 4])]);
    let res = send(&h.app, req).await;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = json_body(res).await;
    assert_eq!(body["className"], "unprocessable");
    assert!(body["errors"][0].as_str().unwrap().starts_with("a.bmp"));

    let req = multipart("/creations", None, &[("a.jpg", "image/jpeg", vec![1u8; 4])]);
    let res = send(&h.app, req).await;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json_body(res).await["message"], "Please enter a creation name");
}

#[tokio::test]
async fn rename_delete_and_media_routes() {
    let h = harness();
    let app = &h.app;
    app.state.sync.save(&creation("171234", "Castle", 2, 2)).await.unwrap();
    app.state.sync.save(&creation("99", "Other", 1, 1)).await.unwrap();

    let res = send(
        app,
        Request::builder()
            .method("PATCH")
            .uri("/creations/171234")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"name":"Castle v2"}"#))
            .unwrap(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);

    let body = json_body(send(app, get("/creations/171234")).await).await;
    assert_eq!(body["name"], "Castle v2");
    assert_eq!(body["photos"].as_array().unwrap().len(), 2);

    let res = send(
        app,
        Request::builder()
            .method("DELETE")
            .uri("/creations/171234/media?url=https%3A%2F%2Fmedia.test%2F171234%2F0.jpg")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    let body = json_body(send(app, get("/creations/171234")).await).await;
    assert_eq!(body["photos"].as_array().unwrap().len(), 1);

    let res = send(
        app,
        multipart("/creations/171234/media", None, &[("clip.mp4", "video/mp4", vec![3u8; 32])]),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    let report = json_body(res).await;
    assert_eq!(report["creation"]["photos"].as_array().unwrap().len(), 2);
    assert_eq!(report["creation"]["photos"][1]["mediaType"], "video");

    let res = send(
        app,
        Request::builder()
            .method("DELETE")
            .uri("/creations/171234")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = send(app, get("/creations/171234")).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(res).await["name"], "NotFound");

    let body = json_body(send(app, get("/creations")).await).await;
    assert_eq!(body["creations"][0]["id"], "99");
}

#[tokio::test]
async fn rename_errors() {
    let h = harness();
    let res = send(
        &h.app,
        Request::builder()
            .method("PATCH")
            .uri("/creations/1")
            .header("content-type", "application/json")
            .body(Body::from("{\"name\":"))
            .unwrap(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(res).await.get("errors").is_some());

    let res = send(
        &h.app,
        Request::builder()
            .method("PATCH")
            .uri("/creations/missing")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"name":"x"}"#))
            .unwrap(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn store_outage_reads_cache_and_rejects_writes() {
    let h = harness();
    h.cache.put_all(vec![creation("5", "Cached", 5, 1)]).unwrap();
    h.store.set_unavailable(true);

    let body = json_body(send(&h.app, get("/creations")).await).await;
    assert_eq!(body["source"]["kind"], "cache");
    assert!(body["degraded"].is_string());
    assert_eq!(body["creations"][0]["name"], "Cached");

    let res = send(
        &h.app,
        multipart("/creations", Some("New"), &[("a.jpg", "image/jpeg", vec![1u8; 8])]),
    )
    .await;
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json_body(res).await["className"], "unavailable");
    assert_eq!(h.cache.get().len(), 1);
}

#[tokio::test]
async fn stats_count_displayable_creations() {
    let h = harness();
    for (id, day, media) in [("1", 1, 2), ("2", 2, 0), ("3", 3, 1), ("4", 4, 1), ("5", 5, 3)] {
        h.store.save(&creation(id, &format!("c{id}"), day, media)).await.unwrap();
    }

    let body = json_body(send(&h.app, get("/stats")).await).await;
    assert_eq!(body["creations"], 4);
    assert_eq!(body["media"], 7);
    let recent: Vec<_> = body["recent"].as_array().unwrap().iter().map(|r| r["id"].clone()).collect();
    assert_eq!(recent, vec![json!("5"), json!("4"), json!("3")]);
}

#[tokio::test]
async fn media_lists_every_item_with_previews() {
    let h = harness();
    let hosted = MediaItem::new("https://res.cloudinary.com/bricks/image/upload/v3/lego-creations/2/a.jpg", "a.jpg")
        .with_public_id("lego-creations/2/a");
    let clip = MediaItem::new("https://res.cloudinary.com/bricks/video/upload/v3/lego-creations/2/b.mp4", "b.mp4");
    let older = creation("1", "Boat", 1, 1);
    let newer = Creation::new("Rocket")
        .with_id("2")
        .with_date_added(Utc.with_ymd_and_hms(2024, 6, 2, 0, 0, 0).single().unwrap())
        .with_photos(vec![hosted, clip]);
    h.store.save(&older).await.unwrap();
    h.store.save(&newer).await.unwrap();
    h.store.save(&creation("3", "Empty", 3, 0)).await.unwrap();

    let res = send(&h.app, get("/media")).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body = json_body(res).await;
    let items = body.as_array().unwrap();
    assert_eq!(items.len(), 3);

    assert_eq!(items[0]["creationId"], "2");
    assert_eq!(items[0]["creationName"], "Rocket");
    assert_eq!(
        items[0]["thumbnail"],
        "https://res.cloudinary.com/bricks/image/upload/w_300,h_200,q_auto,f_auto/lego-creations/2/a"
    );
    assert_eq!(items[1]["mediaType"], "video");
    assert_eq!(
        items[1]["thumbnail"],
        "https://res.cloudinary.com/bricks/video/upload/c_thumb,w_300,h_200/v3/lego-creations/2/b.jpg"
    );
    assert_eq!(items[2]["creationId"], "1");
    assert_eq!(items[2]["thumbnail"], items[2]["url"]);
}

#[tokio::test]
async fn creation_without_media_is_not_found() {
    let h = harness();
    h.store.save(&creation("5", "Bare", 5, 0)).await.unwrap();
    h.store.save(&creation("6", "Shown", 6, 1)).await.unwrap();

    let res = send(&h.app, get("/creations/5")).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let body = json_body(send(&h.app, get("/creations")).await).await;
    assert_eq!(body["creations"].as_array().unwrap().len(), 1);
    assert_eq!(send(&h.app, get("/creations/6")).await.status(), StatusCode::OK);
}

#[tokio::test]
async fn custom_rules_cap_the_batch() {
    let store = Arc::new(MemoryCreationStore::new());
    let sync = SyncFacade::new(store.clone(), Arc::new(MemoryCache::new()));
    let state = AppState::new(sync, None, LegoConfig::new().snapshot())
        .with_rules(lego_core::UploadRules::default().with_max_files(1));
    let app = LegoApp::new(state);

    let req = multipart(
        "/creations",
        Some("Two"),
        &[("a.jpg", "image/jpeg", vec![1u8; 8]), ("b.jpg", "image/jpeg", vec![1u8; 8])],
    );
    let res = send(&app, req).await;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(store.is_empty());

    let res = send(&app, multipart("/creations", Some("One"), &[("a.jpg", "image/jpeg", vec![1u8; 8])])).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    assert_eq!(json_body(res).await["files"][0]["placement"], "inline");
}
