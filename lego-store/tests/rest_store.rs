use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{TimeZone, Utc};
use lego_core::{Creation, CreationId, MediaItem};
use lego_store::{CreationStore, RestCreationStore, RestStoreConfig, StoreError};
use parking_lot::Mutex;
use serde_json::{json, Value};

/// Just enough of PostgREST for the two tables the client touches.
#[derive(Clone, Default)]
struct Backend {
    creations: Arc<Mutex<Vec<Value>>>,
    photos: Arc<Mutex<Vec<Value>>>,
    calls: Arc<Mutex<Vec<String>>>,
    photos_down: Arc<AtomicBool>,
}

fn eq_filter(query: &HashMap<String, String>, key: &str) -> String {
    query
        .get(key)
        .map(|v| v.trim_start_matches("eq.").to_string())
        .unwrap_or_default()
}

async fn list_creations(State(db): State<Backend>) -> Json<Vec<Value>> {
    let photos = db.photos.lock().clone();
    let rows = db
        .creations
        .lock()
        .iter()
        .map(|row| {
            let mut row = row.clone();
            let own: Vec<Value> = photos
                .iter()
                .filter(|p| p["creation_id"] == row["id"])
                .cloned()
                .collect();
            row["photos"] = Value::Array(own);
            row
        })
        .collect();
    Json(rows)
}

async fn insert_creations(State(db): State<Backend>, Json(rows): Json<Vec<Value>>) -> StatusCode {
    db.calls.lock().push("POST creations".to_string());
    db.creations.lock().extend(rows);
    StatusCode::CREATED
}

async fn rename_creation(
    State(db): State<Backend>,
    Query(query): Query<HashMap<String, String>>,
    Json(patch): Json<Value>,
) -> Json<Vec<Value>> {
    let id = eq_filter(&query, "id");
    let mut touched = Vec::new();
    for row in db.creations.lock().iter_mut().filter(|r| r["id"] == id.as_str()) {
        row["name"] = patch["name"].clone();
        touched.push(row.clone());
    }
    Json(touched)
}

async fn delete_creation(State(db): State<Backend>, Query(query): Query<HashMap<String, String>>) -> StatusCode {
    let id = eq_filter(&query, "id");
    db.calls.lock().push(format!("DELETE creations {id}"));
    db.creations.lock().retain(|r| r["id"] != id.as_str());
    db.photos.lock().retain(|p| p["creation_id"] != id.as_str());
    StatusCode::NO_CONTENT
}

async fn insert_photos(State(db): State<Backend>, Json(rows): Json<Vec<Value>>) -> (StatusCode, Json<Value>) {
    db.calls.lock().push("POST photos".to_string());
    if db.photos_down.load(Ordering::SeqCst) {
        return (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "message": "photos table offline" })));
    }
    db.photos.lock().extend(rows);
    (StatusCode::CREATED, Json(json!(null)))
}

async fn serve(db: Backend) -> RestCreationStore {
    let app = Router::new()
        .route(
            "/rest/v1/creations",
            get(list_creations)
                .post(insert_creations)
                .patch(rename_creation)
                .delete(delete_creation),
        )
        .route("/rest/v1/photos", post(insert_photos))
        .with_state(db);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    RestCreationStore::new(RestStoreConfig::new(format!("http://{addr}"), "anon-key")).unwrap()
}

fn castle() -> Creation {
    Creation::new("Castle")
        .with_id("7")
        .with_date_added(Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).single().unwrap())
        .with_photos(vec![
            MediaItem::new("https://media.test/7/a.jpg", "a.jpg"),
            MediaItem::new("https://media.test/7/b.mp4", "b.mp4"),
        ])
}

#[tokio::test]
async fn saved_creation_comes_back_with_its_photos() {
    let db = Backend::default();
    let store = serve(db.clone()).await;

    store.save(&castle()).await.unwrap();
    let all = store.fetch_all().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].name, "Castle");
    assert_eq!(all[0].media_count(), 2);
    assert!(all[0].photos[1].is_video());

    store.rename(&CreationId::from("7"), "Castle v2").await.unwrap();
    assert_eq!(store.fetch_all().await.unwrap()[0].name, "Castle v2");

    let missing = store.rename(&CreationId::from("8"), "x").await.unwrap_err();
    assert!(matches!(missing, StoreError::NotFound { .. }));
}

#[tokio::test]
async fn failed_photo_insert_removes_the_creation_row() {
    let db = Backend::default();
    db.photos_down.store(true, Ordering::SeqCst);
    let store = serve(db.clone()).await;

    let err = store.save(&castle()).await.unwrap_err();
    assert!(matches!(err, StoreError::Persistence { .. }));
    assert!(db.creations.lock().is_empty());
    assert_eq!(
        *db.calls.lock(),
        vec!["POST creations", "POST photos", "DELETE creations 7"]
    );

    db.photos_down.store(false, Ordering::SeqCst);
    store.save(&castle()).await.unwrap();
    assert_eq!(store.fetch_all().await.unwrap()[0].media_count(), 2);
}
