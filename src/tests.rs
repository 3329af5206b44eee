//! Integration tests for the plant tracker API.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use reqwest::Client;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use crate::config::{Config, StorageBackend};
use crate::db::fake::FakeRecordStore;
use crate::store::{PlantStore, SystemClock};
use crate::{create_router, record_store_for, AppState};

/// Test fixture for integration tests.
struct TestFixture {
    client: Client,
    base_url: String,
    store: Arc<PlantStore>,
    _temp_dir: TempDir,
}

impl TestFixture {
    async fn new() -> Self {
        Self::with_backend(StorageBackend::Sqlite).await
    }

    async fn with_backend(backend: StorageBackend) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config = Config {
            backend,
            db_path: temp_dir.path().join("test.sqlite"),
            json_path: temp_dir.path().join("plants.json"),
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            log_level: "warn".to_string(),
        };

        let store = Arc::new(PlantStore::new(
            record_store_for(&config),
            Arc::new(SystemClock),
        ));
        store.initialize_store().await.expect("Failed to init store");

        let (client, base_url) = spawn_server(store.clone()).await;

        TestFixture {
            client,
            base_url,
            store,
            _temp_dir: temp_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn create(&self, name: &str, frequency: i64) -> Value {
        let resp = self
            .client
            .post(self.url("/api/plants"))
            .json(&json!({ "name": name, "frequency": frequency }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        resp.json().await.unwrap()
    }
}

async fn spawn_server(store: Arc<PlantStore>) -> (Client, String) {
    let app = create_router(AppState { store });

    // Bind to random port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("Failed to get addr");

    // Spawn server
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Wait for server to start
    tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

    (Client::new(), format!("http://{}", addr))
}

#[tokio::test]
async fn test_health_check() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_state_reports_ready() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/api/state"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["phase"], "ready");
    assert_eq!(body["data"]["isInitialized"], true);
    assert_eq!(body["data"]["isLoading"], false);
    assert_eq!(body["data"]["plantCount"], 0);
}

#[tokio::test]
async fn test_plant_crud() {
    let fixture = TestFixture::new().await;

    // Create plant
    let create_body = fixture.create("  Monstera  ", 7).await;
    assert_eq!(create_body["success"], true);
    let plant_id = create_body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(create_body["data"]["name"], "Monstera");
    assert_eq!(create_body["data"]["status"], "late");
    assert!(create_body["data"]["lastWateredDate"].is_null());

    // Get plant
    let get_resp = fixture
        .client
        .get(fixture.url(&format!("/api/plants/{}", plant_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(get_resp.status(), 200);

    // Water plant
    let water_resp = fixture
        .client
        .post(fixture.url(&format!("/api/plants/{}/water", plant_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(water_resp.status(), 200);
    let water_body: Value = water_resp.json().await.unwrap();
    assert_eq!(water_body["data"]["status"], "ok");
    assert!(water_body["data"]["lastWateredDate"].is_string());

    // Update plant
    let update_resp = fixture
        .client
        .put(fixture.url(&format!("/api/plants/{}", plant_id)))
        .json(&json!({ "name": "Monstera deliciosa", "imageUri": "file:///m.jpg" }))
        .send()
        .await
        .unwrap();
    assert_eq!(update_resp.status(), 200);
    let update_body: Value = update_resp.json().await.unwrap();
    assert_eq!(update_body["data"]["name"], "Monstera deliciosa");
    assert_eq!(update_body["data"]["imageUri"], "file:///m.jpg");
    assert_eq!(update_body["data"]["frequency"], 7);
    assert_eq!(
        update_body["data"]["lastWateredDate"],
        water_body["data"]["lastWateredDate"]
    );

    // List plants
    let list_resp = fixture
        .client
        .get(fixture.url("/api/plants"))
        .send()
        .await
        .unwrap();
    let list_body: Value = list_resp.json().await.unwrap();
    assert_eq!(list_body["data"].as_array().unwrap().len(), 1);

    // Delete plant
    let delete_resp = fixture
        .client
        .delete(fixture.url(&format!("/api/plants/{}", plant_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(delete_resp.status(), 200);

    // Verify deleted
    let get_deleted_resp = fixture
        .client
        .get(fixture.url(&format!("/api/plants/{}", plant_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(get_deleted_resp.status(), 404);
    let body: Value = get_deleted_resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_json_backend_crud() {
    let fixture = TestFixture::with_backend(StorageBackend::Json).await;

    let created = fixture.create("Fern", 4).await;
    let plant_id = created["data"]["id"].as_str().unwrap().to_string();

    let resp = fixture
        .client
        .post(fixture.url(&format!("/api/plants/{}/water", plant_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let snapshot = fixture.store.snapshot();
    assert_eq!(snapshot.plants.len(), 1);
    assert!(snapshot.plants[0].last_watered_date.is_some());
}

#[tokio::test]
async fn test_create_validation() {
    let fixture = TestFixture::new().await;

    for body in [
        json!({ "name": "   ", "frequency": 3 }),
        json!({ "name": "Basil", "frequency": 0 }),
        json!({ "name": "Basil", "frequency": -2 }),
    ] {
        let resp = fixture
            .client
            .post(fixture.url("/api/plants"))
            .json(&body)
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status(), 400);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["error"]["code"], "INVALID_ARGUMENT");
    }

    assert!(fixture.store.snapshot().plants.is_empty());
}

#[tokio::test]
async fn test_update_validation() {
    let fixture = TestFixture::new().await;
    let created = fixture.create("Cactus", 14).await;
    let plant_id = created["data"]["id"].as_str().unwrap().to_string();

    let resp = fixture
        .client
        .put(fixture.url(&format!("/api/plants/{}", plant_id)))
        .json(&json!({ "frequency": 0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = fixture
        .client
        .put(fixture.url("/api/plants/ghost"))
        .json(&json!({ "name": "Ghost" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    assert_eq!(fixture.store.get_plant(&plant_id).unwrap().frequency, 14);
}

#[tokio::test]
async fn test_delete_unknown_plant_succeeds() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .delete(fixture.url("/api/plants/never-existed"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn test_water_unknown_plant() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .post(fixture.url("/api/plants/ghost/water"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_grouped_plants() {
    let fixture = TestFixture::new().await;
    fixture.create("Zamioculcas", 21).await;
    let watered = fixture.create("Aloe", 10).await;
    let daily = fixture.create("Basil", 1).await;

    for created in [&watered, &daily] {
        let id = created["data"]["id"].as_str().unwrap();
        fixture
            .client
            .post(fixture.url(&format!("/api/plants/{}/water", id)))
            .send()
            .await
            .unwrap();
    }

    let resp = fixture
        .client
        .get(fixture.url("/api/plants/grouped"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();

    assert_eq!(body["data"]["late"][0]["name"], "Zamioculcas");
    assert_eq!(body["data"]["soon"][0]["name"], "Basil");
    assert_eq!(body["data"]["ok"][0]["name"], "Aloe");
}

#[tokio::test]
async fn test_storage_failure_surfaces_once() {
    let records = Arc::new(FakeRecordStore::default());
    let store = Arc::new(PlantStore::new(records.clone(), Arc::new(SystemClock)));
    store.initialize_store().await.unwrap();
    records.failing_writes(true);
    let app = create_router(AppState {
        store: store.clone(),
    });

    let resp = app
        .oneshot(
            Request::post("/api/plants")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"name":"Pothos","frequency":5}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(store.snapshot().plants.is_empty());
    assert!(records.rows.lock().await.is_empty());
}

#[tokio::test]
async fn test_initialize_retry_after_failure() {
    let records = Arc::new(FakeRecordStore::default());
    records.fail_initialize.store(true, Ordering::SeqCst);
    let store = Arc::new(PlantStore::new(records.clone(), Arc::new(SystemClock)));
    assert!(store.initialize_store().await.is_err());
    let (client, base_url) = spawn_server(store.clone()).await;

    // Degraded: the list is empty but readable, mutations are refused
    let resp = client
        .get(format!("{}/api/plants", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let resp = client
        .post(format!("{}/api/plants", base_url))
        .json(&json!({ "name": "Pothos", "frequency": 5 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 503);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "UNINITIALIZED_STORE");

    let resp = client
        .get(format!("{}/api/state", base_url))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["phase"], "initializationFailed");
    assert!(body["data"]["message"].is_string());

    // Retry once storage recovers
    records.fail_initialize.store(false, Ordering::SeqCst);
    let resp = client
        .post(format!("{}/api/state/initialize", base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["isInitialized"], true);
}
