//! Tests for `HttpStore` against a local fake of the notes API.
//!
//! The fake keeps notes in memory and records the headers and bodies it
//! receives so the tests can check what went over the wire.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use note_client::HttpStore;
use note_sync::{
    NoteId, RecordingSurface, RemoteStore, StoreError, SyncConfig, SyncController,
};
use serde_json::{json, Value};

#[derive(Default)]
struct FakeState {
    notes: HashMap<String, (String, DateTime<Utc>)>,
    next_id: u64,
    /// Authorization header of every request, in order.
    auth_headers: Vec<Option<String>>,
    /// JSON bodies of every write, in order.
    bodies: Vec<Value>,
}

type Shared = Arc<Mutex<FakeState>>;

fn record_auth(state: &Shared, headers: &HeaderMap) {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    state.lock().unwrap().auth_headers.push(auth);
}

fn note_json(id: &str, content: &str, modified_at: DateTime<Utc>) -> Value {
    json!({
        "id": id,
        "content": content,
        "createdAt": modified_at.to_rfc3339(),
        "modifiedAt": modified_at.to_rfc3339(),
        "encryptionMode": "PUBLIC",
        "requiresPassword": false,
        "ownerId": null
    })
}

async fn create_note(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    record_auth(&state, &headers);
    let mut s = state.lock().unwrap();
    s.bodies.push(body.clone());
    s.next_id += 1;
    let id = format!("{:0>26}", s.next_id);
    let content = body["note"].as_str().unwrap_or_default().to_string();
    let now = Utc::now();
    s.notes.insert(id.clone(), (content.clone(), now));
    (StatusCode::CREATED, Json(note_json(&id, &content, now)))
}

async fn update_note(
    State(state): State<Shared>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    record_auth(&state, &headers);
    let mut s = state.lock().unwrap();
    s.bodies.push(body.clone());
    let content = body["content"].as_str().unwrap_or_default().to_string();
    match s.notes.get_mut(&id) {
        Some(entry) => {
            *entry = (content.clone(), Utc::now());
            (StatusCode::OK, Json(note_json(&id, &content, entry.1))).into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn get_note(
    State(state): State<Shared>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> impl IntoResponse {
    record_auth(&state, &headers);
    let s = state.lock().unwrap();
    match s.notes.get(&id) {
        Some((content, modified_at)) => {
            Json(note_json(&id, content, *modified_at)).into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn get_metadata(
    State(state): State<Shared>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> impl IntoResponse {
    record_auth(&state, &headers);
    let s = state.lock().unwrap();
    match s.notes.get(&id) {
        Some((_, modified_at)) => Json(json!({
            "id": id,
            "modifiedAt": modified_at.to_rfc3339(),
            "encryptionMode": "PUBLIC"
        }))
        .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn always_fails() -> impl IntoResponse {
    (StatusCode::INTERNAL_SERVER_ERROR, "boom")
}

async fn not_json() -> impl IntoResponse {
    (StatusCode::OK, "definitely not json")
}

/// Start the fake API, returning its state and base URL for the notes resource.
async fn start_fake_api() -> (Shared, String) {
    let state: Shared = Arc::new(Mutex::new(FakeState::default()));
    let app = Router::new()
        .route("/api/notes", post(create_note))
        .route("/api/notes/{id}", get(get_note).put(update_note))
        .route("/api/notes/{id}/metadata", get(get_metadata))
        .route("/broken", post(always_fails))
        .route("/broken/{id}", get(always_fails).put(always_fails))
        .route("/garbage", post(not_json))
        .with_state(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (state, format!("http://{}", addr))
}

fn store(base: &str, token: Option<&str>) -> HttpStore {
    HttpStore::new(base, token.map(str::to_string), Duration::from_secs(5)).unwrap()
}

fn some_id() -> NoteId {
    "01HZX3K9M2Q8R7T6V5W4Y3Z2A1".parse().unwrap()
}

// ============================================================================
// Routes and bodies
// ============================================================================

#[tokio::test]
async fn test_create_posts_note_body() {
    let (state, base) = start_fake_api().await;
    let store = store(&format!("{base}/api/notes/"), None);

    let note = store.create("hello").await.unwrap();

    assert_eq!(note.content, "hello");
    assert_eq!(note.id.as_str().len(), 26);
    assert_eq!(state.lock().unwrap().bodies, vec![json!({ "note": "hello" })]);
}

#[tokio::test]
async fn test_update_puts_content_body() {
    let (state, base) = start_fake_api().await;
    let store = store(&format!("{base}/api/notes"), None);
    let created = store.create("v1").await.unwrap();

    let updated = store.update(&created.id, "v2").await.unwrap();

    assert_eq!(updated.id, created.id);
    assert_eq!(updated.content, "v2");
    assert!(updated.modified_at >= created.modified_at);
    assert_eq!(
        state.lock().unwrap().bodies[1],
        json!({ "content": "v2" })
    );
}

#[tokio::test]
async fn test_fetch_and_metadata() {
    let (_state, base) = start_fake_api().await;
    let store = store(&format!("{base}/api/notes"), None);
    let created = store.create("body").await.unwrap();

    let fetched = store.fetch(&created.id).await.unwrap();
    assert_eq!(fetched.content, "body");
    assert_eq!(fetched.modified_at, created.modified_at);

    let metadata = store.fetch_metadata(&created.id).await.unwrap();
    assert_eq!(metadata.modified_at, created.modified_at);
}

// ============================================================================
// Error mapping
// ============================================================================

#[tokio::test]
async fn test_missing_note_maps_to_not_found() {
    let (_state, base) = start_fake_api().await;
    let store = store(&format!("{base}/api/notes"), None);
    let id = some_id();

    assert_eq!(store.fetch(&id).await, Err(StoreError::NotFound(id.clone())));
    assert_eq!(
        store.fetch_metadata(&id).await.map(|_| ()),
        Err(StoreError::NotFound(id.clone()))
    );
    assert_eq!(
        store.update(&id, "x").await.map(|_| ()),
        Err(StoreError::NotFound(id))
    );
}

#[tokio::test]
async fn test_server_error_carries_status_and_body() {
    let (_state, base) = start_fake_api().await;
    let store = store(&format!("{base}/broken"), None);

    assert_eq!(
        store.create("x").await.map(|_| ()),
        Err(StoreError::Server {
            status: 500,
            message: "boom".into()
        })
    );
    assert!(matches!(
        store.fetch(&some_id()).await,
        Err(StoreError::Server { status: 500, .. })
    ));
}

#[tokio::test]
async fn test_undecodable_body_is_decode_error() {
    let (_state, base) = start_fake_api().await;
    let store = store(&format!("{base}/garbage"), None);

    assert!(matches!(
        store.create("x").await,
        Err(StoreError::Decode(_))
    ));
}

#[tokio::test]
async fn test_unreachable_server_is_network_error() {
    // Grab a free port, then close it again.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let store = store(&format!("http://{addr}/api/notes"), None);

    assert!(matches!(
        store.create("x").await,
        Err(StoreError::Network(_))
    ));
}

// ============================================================================
// Authorization
// ============================================================================

#[tokio::test]
async fn test_auth_header_sent_on_every_request() {
    let (state, base) = start_fake_api().await;
    let store = store(&format!("{base}/api/notes"), Some("Bearer secret"));

    let note = store.create("private").await.unwrap();
    store.update(&note.id, "still private").await.unwrap();
    store.fetch(&note.id).await.unwrap();
    store.fetch_metadata(&note.id).await.unwrap();

    let headers = state.lock().unwrap().auth_headers.clone();
    assert_eq!(headers, vec![Some("Bearer secret".to_string()); 4]);
}

#[tokio::test]
async fn test_no_auth_header_without_token() {
    let (state, base) = start_fake_api().await;
    let store = store(&format!("{base}/api/notes"), None);

    store.create("public").await.unwrap();

    assert_eq!(state.lock().unwrap().auth_headers, vec![None]);
}

// ============================================================================
// Controller over HTTP
// ============================================================================

#[tokio::test]
async fn test_controller_picks_up_remote_edit_over_http() {
    let (state, base) = start_fake_api().await;
    let surface = Arc::new(RecordingSurface::new());
    let (controller, handle) = SyncController::new(
        store(&format!("{base}/api/notes"), None),
        Arc::clone(&surface),
        SyncConfig::default(),
    );
    let task = tokio::spawn(controller.run());

    let note = handle.create_new().await.unwrap();
    assert!(!handle.check_for_remote_update().await.unwrap());

    // Another device writes a newer version.
    {
        let mut s = state.lock().unwrap();
        let later = note.modified_at + chrono::Duration::minutes(1);
        s.notes
            .insert(note.id.to_string(), ("from elsewhere".into(), later));
    }

    assert!(handle.check_for_remote_update().await.unwrap());
    assert_eq!(surface.content(), Some("from elsewhere".into()));
    assert_eq!(surface.notifications().len(), 1);

    handle.shutdown().await.unwrap();
    task.await.unwrap();
}
