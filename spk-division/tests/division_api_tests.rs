//! Integration tests for the spk-division API endpoints

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use futures::StreamExt;
use serde_json::{json, Value};
use tower::util::ServiceExt; // for `oneshot`

use spk_common::store::{keys, LocalStore};
use spk_division::{build_router, AppState};

async fn setup_store() -> (LocalStore, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("Should create temp dir");
    let pool = spk_common::store::init_database(&dir.path().join("spk.db"))
        .await
        .expect("Should initialize database");
    (LocalStore::new(pool), dir)
}

fn app(store: &LocalStore) -> axum::Router {
    build_router(AppState::new(store.clone()))
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn post_empty(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

async fn seed_queue(store: &LocalStore) {
    let queue = vec![
        json!({
            "queueId": "q-1",
            "idRekapCustom": "RKP-1",
            "idSpk": "SPK-1",
            "namaDesain": "Jaket Alpha",
            "status": "",
        }),
        json!({
            "queueId": "q-2",
            "idRekapCustom": "RKP-2",
            "idSpk": "SPK-2",
            "namaDesain": "Jaket Beta",
            "status": "Antrian revisi",
        }),
    ];
    store.write_list(keys::DESIGN_QUEUE, &queue).await.unwrap();
}

#[tokio::test]
async fn test_health_endpoint() {
    let (store, _dir) = setup_store().await;

    let response = app(&store).oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "spk-division");
}

#[tokio::test]
async fn test_design_queue_views() {
    let (store, _dir) = setup_store().await;
    seed_queue(&store).await;

    let response = app(&store).oneshot(get("/api/design-queue")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["rows"][0]["queueId"], "q-1");

    let response = app(&store)
        .oneshot(get("/api/design-queue?view=revision"))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["rows"][0]["queueId"], "q-2");

    let response = app(&store)
        .oneshot(get("/api/design-queue?view=bogus"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_set_queue_status() {
    let (store, _dir) = setup_store().await;
    seed_queue(&store).await;

    let response = app(&store)
        .oneshot(post_json(
            "/api/design-queue/q-1/status",
            json!({"status": "Sedang dikerjakan"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let queue = store.read_list(keys::DESIGN_QUEUE).await.unwrap();
    assert_eq!(queue[0]["status"], "Sedang dikerjakan");

    let response = app(&store)
        .oneshot(post_json(
            "/api/design-queue/missing/status",
            json!({"status": "Sedang dikerjakan"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_finish_design_moves_entry() {
    let (store, _dir) = setup_store().await;
    seed_queue(&store).await;
    store
        .write_list(keys::PIPELINE, &[json!({"idSpk": "SPK-1"})])
        .await
        .unwrap();

    let response = app(&store)
        .oneshot(post_empty("/api/design-queue/q-1/finish"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["moved"]["status"], "Menunggu validasi");

    let queue = store.read_list(keys::DESIGN_QUEUE).await.unwrap();
    assert_eq!(queue[0]["status"], "Selesai");

    let done = store.read_list(keys::DESIGN_DONE_QUEUE).await.unwrap();
    assert_eq!(done.len(), 1);

    let pipeline = store.read_list(keys::PIPELINE).await.unwrap();
    assert!(pipeline[0]["selesaiDesainProduksi"].as_str().is_some());

    // The finished entry no longer shows in the worklist
    let response = app(&store).oneshot(get("/api/design-queue")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn test_complete_stage_endpoint() {
    let (store, _dir) = setup_store().await;
    store
        .write_list(keys::PIPELINE, &[json!({"idSpk": "SPK-1"})])
        .await
        .unwrap();

    let response = app(&store)
        .oneshot(post_empty("/api/pipeline/SPK-1/complete/jahit"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["updated"], true);

    // Second call is a no-op
    let response = app(&store)
        .oneshot(post_empty("/api/pipeline/SPK-1/complete/jahit"))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["updated"], false);

    let response = app(&store)
        .oneshot(post_empty("/api/pipeline/SPK-1/complete/not_a_stage"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_events_stream_relays_store_changes() {
    let (store, _dir) = setup_store().await;

    let response = app(&store).oneshot(get("/events")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()["content-type"].to_str().unwrap();
    assert!(content_type.starts_with("text/event-stream"));

    let mut body = response.into_body().into_data_stream();

    // Connection event arrives before any store activity
    let first = body.next().await.unwrap().unwrap();
    let text = String::from_utf8(first.to_vec()).unwrap();
    assert!(text.contains("event: ConnectionStatus"));

    // A store write surfaces as a CollectionChanged notification
    store
        .write_list(keys::DESIGN_QUEUE, &[json!({"queueId": "q-1"})])
        .await
        .unwrap();
    let next = body.next().await.unwrap().unwrap();
    let text = String::from_utf8(next.to_vec()).unwrap();
    assert!(text.contains("event: CollectionChanged"));
    assert!(text.contains("design_queue"));
}

#[tokio::test]
async fn test_intake_submission() {
    let (store, _dir) = setup_store().await;

    let response = app(&store)
        .oneshot(post_json(
            "/api/intake",
            json!({"idSpk": 7021, "namaDesain": "Jaket Komunitas", "tanggalInput": "2026-03-04"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["entry"]["idSpk"], "7021");
    assert_eq!(body["entry"]["tanggalInput"], "2026-03-04T00:00:00.000Z");

    let list = store.read_list(keys::DESIGN_INTAKE).await.unwrap();
    assert_eq!(list.len(), 1);
}
