//! Integration tests for the cached API client
//!
//! Runs the real client against an in-process mock of the backend's REST
//! and edge-function surface, covering read-through memoization, write
//! invalidation, error classification, timeout enforcement, batch
//! semantics, and realtime invalidation ordering.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU16, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Query as AxumQuery, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use serprank::models::{
    KeywordFilter, KeywordPatch, KeywordUpdate, NewKeyword, NewProject, ProjectPatch,
};
use serprank::realtime::{ChangeEvent, ChangeKind};
use serprank::report::{ErrorNotice, ErrorReporter};
use serprank::{CacheConfig, CacheManager, ChangeHub, ClientConfig, ErrorKind, SeoApiClient};

// == Mock Backend ==

#[derive(Clone, Default)]
struct MockBackend {
    projects: Arc<Mutex<Vec<Value>>>,
    keywords: Arc<Mutex<Vec<Value>>>,
    /// Non-zero forces every gated route to answer with this status
    forced_status: Arc<AtomicU16>,
    /// Non-zero delays every gated route by this many milliseconds
    delay_ms: Arc<AtomicU64>,
    /// Makes edge functions answer with an envelope-level error
    function_error: Arc<AtomicBool>,
    project_list_calls: Arc<AtomicU32>,
    keyword_list_calls: Arc<AtomicU32>,
    keyword_insert_calls: Arc<AtomicU32>,
    competitor_list_calls: Arc<AtomicU32>,
}

async fn gate(state: &MockBackend, headers: &HeaderMap) -> Result<(), Response> {
    let delay = state.delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
    if headers.get("apikey").and_then(|v| v.to_str().ok()) != Some("test-key") {
        return Err((StatusCode::UNAUTHORIZED, "invalid api key").into_response());
    }
    let forced = state.forced_status.load(Ordering::SeqCst);
    if forced != 0 {
        let status = StatusCode::from_u16(forced).unwrap();
        return Err((status, "forced failure").into_response());
    }
    Ok(())
}

/// Applies `eq.` filters from the query string; other operators are
/// accepted and ignored.
fn matches_filters(row: &Value, params: &HashMap<String, String>) -> bool {
    params.iter().all(|(column, value)| {
        if column == "order" || column == "limit" || column == "offset" {
            return true;
        }
        match value.strip_prefix("eq.") {
            Some(wanted) => row
                .get(column)
                .and_then(Value::as_str)
                .map(|have| have == wanted)
                .unwrap_or(true),
            None => true,
        }
    })
}

fn select(rows: &[Value], params: &HashMap<String, String>) -> Vec<Value> {
    rows.iter()
        .filter(|row| matches_filters(row, params))
        .cloned()
        .collect()
}

async fn list_projects_handler(
    State(state): State<MockBackend>,
    headers: HeaderMap,
    AxumQuery(params): AxumQuery<HashMap<String, String>>,
) -> Response {
    if let Err(response) = gate(&state, &headers).await {
        return response;
    }
    state.project_list_calls.fetch_add(1, Ordering::SeqCst);
    let rows = state.projects.lock().unwrap();
    Json(Value::Array(select(&rows, &params))).into_response()
}

async fn create_projects_handler(
    State(state): State<MockBackend>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(response) = gate(&state, &headers).await {
        return response;
    }
    let mut created = Vec::new();
    for item in body.as_array().cloned().unwrap_or_default() {
        let row = json!({
            "id": Uuid::new_v4(),
            "name": item["name"],
            "domain": item["domain"],
            "created_at": Utc::now(),
            "updated_at": Utc::now(),
        });
        created.push(row.clone());
        state.projects.lock().unwrap().push(row);
    }
    Json(Value::Array(created)).into_response()
}

async fn patch_projects_handler(
    State(state): State<MockBackend>,
    headers: HeaderMap,
    AxumQuery(params): AxumQuery<HashMap<String, String>>,
    Json(patch): Json<Value>,
) -> Response {
    if let Err(response) = gate(&state, &headers).await {
        return response;
    }
    let mut rows = state.projects.lock().unwrap();
    let mut updated = Vec::new();
    for row in rows.iter_mut().filter(|row| matches_filters(row, &params)) {
        if let (Some(object), Some(fields)) = (row.as_object_mut(), patch.as_object()) {
            for (key, value) in fields {
                object.insert(key.clone(), value.clone());
            }
            object.insert("updated_at".to_string(), json!(Utc::now()));
        }
        updated.push(row.clone());
    }
    Json(Value::Array(updated)).into_response()
}

async fn delete_projects_handler(
    State(state): State<MockBackend>,
    headers: HeaderMap,
    AxumQuery(params): AxumQuery<HashMap<String, String>>,
) -> Response {
    if let Err(response) = gate(&state, &headers).await {
        return response;
    }
    let mut rows = state.projects.lock().unwrap();
    rows.retain(|row| !matches_filters(row, &params));
    StatusCode::NO_CONTENT.into_response()
}

async fn list_keywords_handler(
    State(state): State<MockBackend>,
    headers: HeaderMap,
    AxumQuery(params): AxumQuery<HashMap<String, String>>,
) -> Response {
    if let Err(response) = gate(&state, &headers).await {
        return response;
    }
    state.keyword_list_calls.fetch_add(1, Ordering::SeqCst);
    let rows = state.keywords.lock().unwrap();
    Json(Value::Array(select(&rows, &params))).into_response()
}

async fn create_keywords_handler(
    State(state): State<MockBackend>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(response) = gate(&state, &headers).await {
        return response;
    }
    state.keyword_insert_calls.fetch_add(1, Ordering::SeqCst);
    let mut created = Vec::new();
    for item in body.as_array().cloned().unwrap_or_default() {
        let row = json!({
            "id": Uuid::new_v4(),
            "project_id": item["project_id"],
            "keyword": item["keyword"],
            "search_volume": 320,
            "difficulty": 40,
            "intent": item.get("intent").cloned().unwrap_or(Value::Null),
            "current_position": null,
            "created_at": Utc::now(),
        });
        created.push(row.clone());
        state.keywords.lock().unwrap().push(row);
    }
    Json(Value::Array(created)).into_response()
}

async fn patch_keywords_handler(
    State(state): State<MockBackend>,
    headers: HeaderMap,
    AxumQuery(params): AxumQuery<HashMap<String, String>>,
    Json(patch): Json<Value>,
) -> Response {
    if let Err(response) = gate(&state, &headers).await {
        return response;
    }
    let mut rows = state.keywords.lock().unwrap();
    let mut updated = Vec::new();
    for row in rows.iter_mut().filter(|row| matches_filters(row, &params)) {
        if let (Some(object), Some(fields)) = (row.as_object_mut(), patch.as_object()) {
            for (key, value) in fields {
                object.insert(key.clone(), value.clone());
            }
        }
        updated.push(row.clone());
    }
    Json(Value::Array(updated)).into_response()
}

async fn delete_keywords_handler(
    State(state): State<MockBackend>,
    headers: HeaderMap,
    AxumQuery(params): AxumQuery<HashMap<String, String>>,
) -> Response {
    if let Err(response) = gate(&state, &headers).await {
        return response;
    }
    let mut rows = state.keywords.lock().unwrap();
    rows.retain(|row| !matches_filters(row, &params));
    StatusCode::NO_CONTENT.into_response()
}

async fn list_competitors_handler(
    State(state): State<MockBackend>,
    headers: HeaderMap,
) -> Response {
    if let Err(response) = gate(&state, &headers).await {
        return response;
    }
    state.competitor_list_calls.fetch_add(1, Ordering::SeqCst);
    Json(json!([])).into_response()
}

async fn seo_analyzer_handler(
    State(state): State<MockBackend>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(response) = gate(&state, &headers).await {
        return response;
    }
    if state.function_error.load(Ordering::SeqCst) {
        return Json(json!({"data": null, "error": "focus keyword missing"})).into_response();
    }
    Json(json!({
        "data": {
            "project_id": body["project_id"],
            "overall_score": 82,
            "recommendations": ["Add internal links to orphaned pages"],
            "generated_at": Utc::now(),
        },
        "error": null,
    }))
    .into_response()
}

async fn competitor_analyzer_handler(
    State(state): State<MockBackend>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(response) = gate(&state, &headers).await {
        return response;
    }
    Json(json!({
        "data": {
            "project_id": body["project_id"],
            "competitor_domain": body["competitor_domain"],
            "authority_score": 64,
            "overlapping_keywords": ["rust cache crate"],
            "generated_at": Utc::now(),
        },
        "error": null,
    }))
    .into_response()
}

fn router(state: MockBackend) -> Router {
    Router::new()
        .route(
            "/rest/v1/seo_projects",
            get(list_projects_handler)
                .post(create_projects_handler)
                .patch(patch_projects_handler)
                .delete(delete_projects_handler),
        )
        .route(
            "/rest/v1/seo_keywords",
            get(list_keywords_handler)
                .post(create_keywords_handler)
                .patch(patch_keywords_handler)
                .delete(delete_keywords_handler),
        )
        .route("/rest/v1/competitor_analysis", get(list_competitors_handler))
        .route("/functions/v1/seo-intelligence-analyzer", post(seo_analyzer_handler))
        .route("/functions/v1/competitor-analyzer", post(competitor_analyzer_handler))
        .with_state(state)
}

async fn spawn_backend() -> (MockBackend, String) {
    let state = MockBackend::default();
    let app = router(state.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (state, format!("http://{}", addr))
}

// == Test Fixtures ==

#[derive(Default)]
struct RecordingReporter {
    notices: Mutex<Vec<ErrorNotice>>,
}

impl ErrorReporter for RecordingReporter {
    fn report(&self, notice: &ErrorNotice) {
        self.notices.lock().unwrap().push(notice.clone());
    }
}

fn test_cache() -> CacheManager<Value> {
    CacheManager::new(&CacheConfig {
        max_entries: 500,
        default_ttl: Duration::from_secs(300),
        sweep_interval: Duration::from_secs(60),
    })
}

fn test_config(base_url: &str, timeout: Duration) -> ClientConfig {
    ClientConfig {
        base_url: base_url.to_string(),
        api_key: "test-key".to_string(),
        timeout,
    }
}

struct Harness {
    backend: MockBackend,
    client: SeoApiClient,
    hub: Arc<ChangeHub>,
    reporter: Arc<RecordingReporter>,
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "serprank=debug".into()),
        )
        .try_init();
}

async fn harness() -> Harness {
    harness_with_timeout(Duration::from_secs(5)).await
}

async fn harness_with_timeout(timeout: Duration) -> Harness {
    init_tracing();
    let (backend, base_url) = spawn_backend().await;
    let hub = Arc::new(ChangeHub::new());
    let reporter = Arc::new(RecordingReporter::default());
    let client = SeoApiClient::with_reporter(
        &test_config(&base_url, timeout),
        test_cache(),
        hub.clone(),
        reporter.clone(),
    );
    Harness {
        backend,
        client,
        hub,
        reporter,
    }
}

async fn seed_project(client: &SeoApiClient) -> Uuid {
    client
        .create_project(&NewProject {
            name: "My Site".to_string(),
            domain: "example.com".to_string(),
        })
        .await
        .unwrap()
        .id
}

// == Read-Through Caching ==

#[tokio::test]
async fn test_repeated_listing_hits_backend_once() {
    let h = harness().await;
    seed_project(&h.client).await;

    let first = h.client.list_projects().await.unwrap();
    let second = h.client.list_projects().await.unwrap();

    assert_eq!(first.len(), 1);
    assert_eq!(second.len(), 1);
    assert_eq!(h.backend.project_list_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_get_project_returns_single_row() -> anyhow::Result<()> {
    let h = harness().await;
    let id = seed_project(&h.client).await;

    let project = h.client.get_project(id).await?;
    assert_eq!(project.id, id);
    assert_eq!(project.domain, "example.com");
    Ok(())
}

#[tokio::test]
async fn test_distinct_filters_are_cached_separately() {
    let h = harness().await;
    let id = seed_project(&h.client).await;

    let all = KeywordFilter::default();
    let informational = KeywordFilter {
        intent: Some("informational".to_string()),
        ..Default::default()
    };

    h.client.list_keywords(id, &all).await.unwrap();
    h.client.list_keywords(id, &informational).await.unwrap();
    h.client.list_keywords(id, &all).await.unwrap();

    // Two distinct keys, each fetched once
    assert_eq!(h.backend.keyword_list_calls.load(Ordering::SeqCst), 2);
}

// == Write Invalidation ==

#[tokio::test]
async fn test_create_project_invalidates_listing() {
    let h = harness().await;
    seed_project(&h.client).await;

    assert_eq!(h.client.list_projects().await.unwrap().len(), 1);
    seed_project(&h.client).await;
    assert_eq!(h.client.list_projects().await.unwrap().len(), 2);
    assert_eq!(h.backend.project_list_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_update_then_read_never_returns_stale_value() {
    let h = harness().await;
    let id = seed_project(&h.client).await;

    // Prime the cache with the old name
    assert_eq!(h.client.get_project(id).await.unwrap().name, "My Site");

    let updated = h
        .client
        .update_project(
            id,
            &ProjectPatch {
                name: Some("Rebranded".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "Rebranded");

    // The cached entry was dropped with the write, so this read is fresh
    assert_eq!(h.client.get_project(id).await.unwrap().name, "Rebranded");
}

#[tokio::test]
async fn test_delete_project_drops_every_scoped_view() {
    let h = harness().await;
    let id = seed_project(&h.client).await;

    h.client
        .list_keywords(id, &KeywordFilter::default())
        .await
        .unwrap();
    h.client.list_competitors(id).await.unwrap();
    assert_eq!(h.backend.keyword_list_calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.backend.competitor_list_calls.load(Ordering::SeqCst), 1);

    h.client.delete_project(id).await.unwrap();

    h.client
        .list_keywords(id, &KeywordFilter::default())
        .await
        .unwrap();
    h.client.list_competitors(id).await.unwrap();
    assert_eq!(h.backend.keyword_list_calls.load(Ordering::SeqCst), 2);
    assert_eq!(h.backend.competitor_list_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_failed_mutation_leaves_cache_untouched() {
    let h = harness().await;
    seed_project(&h.client).await;

    assert_eq!(h.client.list_projects().await.unwrap().len(), 1);

    h.backend.forced_status.store(500, Ordering::SeqCst);
    let result = h
        .client
        .create_project(&NewProject {
            name: "Doomed".to_string(),
            domain: "doomed.example".to_string(),
        })
        .await;
    assert!(result.is_err());
    h.backend.forced_status.store(0, Ordering::SeqCst);

    // Listing still served from cache: no invalidation happened
    h.client.list_projects().await.unwrap();
    assert_eq!(h.backend.project_list_calls.load(Ordering::SeqCst), 1);
}

// == Keywords ==

#[tokio::test]
async fn test_add_keyword_invalidates_keyword_lists() {
    let h = harness().await;
    let id = seed_project(&h.client).await;
    let filter = KeywordFilter::default();

    assert!(h.client.list_keywords(id, &filter).await.unwrap().is_empty());

    h.client
        .add_keyword(&NewKeyword {
            project_id: id,
            keyword: "rust cache crate".to_string(),
            intent: Some("informational".to_string()),
        })
        .await
        .unwrap();

    let listed = h.client.list_keywords(id, &filter).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].keyword, "rust cache crate");
}

#[tokio::test]
async fn test_batch_add_is_one_backend_call() {
    let h = harness().await;
    let id = seed_project(&h.client).await;

    let items: Vec<NewKeyword> = (0..3)
        .map(|i| NewKeyword {
            project_id: id,
            keyword: format!("keyword {}", i),
            intent: None,
        })
        .collect();

    let created = h.client.batch_add_keywords(id, &items).await.unwrap();
    assert_eq!(created.len(), 3);
    assert_eq!(h.backend.keyword_insert_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_batch_update_settles_every_item() {
    let h = harness().await;
    let id = seed_project(&h.client).await;

    let keyword = h
        .client
        .add_keyword(&NewKeyword {
            project_id: id,
            keyword: "tracked".to_string(),
            intent: None,
        })
        .await
        .unwrap();

    let updates = vec![
        KeywordUpdate {
            id: keyword.id,
            patch: KeywordPatch {
                current_position: Some(3),
                ..Default::default()
            },
        },
        KeywordUpdate {
            // No such row: the backend matches nothing
            id: Uuid::new_v4(),
            patch: KeywordPatch::default(),
        },
    ];

    let results = h.client.batch_update_keywords(id, &updates).await;
    assert_eq!(results.len(), 2);
    assert!(results[0].is_ok());
    assert!(results[1].is_err());
    assert_eq!(results[0].as_ref().unwrap().current_position, Some(3));

    // The successful item invalidated the listing
    let listed = h
        .client
        .list_keywords(id, &KeywordFilter::default())
        .await
        .unwrap();
    assert_eq!(listed[0].current_position, Some(3));
}

// == Error Classification ==

#[tokio::test]
async fn test_http_statuses_map_to_error_kinds() {
    let h = harness().await;

    let cases = [
        (401u16, ErrorKind::Auth),
        (429, ErrorKind::RateLimit),
        (500, ErrorKind::Network),
        (503, ErrorKind::Network),
        (418, ErrorKind::Unknown),
    ];

    for (i, (status, expected)) in cases.iter().enumerate() {
        h.backend.forced_status.store(*status, Ordering::SeqCst);
        let err = h.client.list_projects().await.unwrap_err();

        // The classified error reaches the caller...
        assert_eq!(err.kind, *expected, "status {}", status);
        // ...and was reported to the sink exactly once
        let notices = h.reporter.notices.lock().unwrap();
        assert_eq!(notices.len(), i + 1);
        assert_eq!(notices[i].kind, *expected);
    }
}

#[tokio::test]
async fn test_timeout_rejects_within_deadline() {
    let h = harness_with_timeout(Duration::from_millis(200)).await;
    h.backend.delay_ms.store(2_000, Ordering::SeqCst);

    let started = std::time::Instant::now();
    let err = h.client.list_projects().await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::Network);
    assert_eq!(err.message, "timeout");
    assert!(started.elapsed() < Duration::from_secs(1));
}

// == Edge Functions ==

#[tokio::test]
async fn test_seo_analysis_returns_report() -> anyhow::Result<()> {
    let h = harness().await;
    let id = seed_project(&h.client).await;

    let report = h.client.run_seo_analysis(id, &Default::default()).await?;
    assert_eq!(report.project_id, id);
    assert_eq!(report.overall_score, 82);
    assert!(!report.recommendations.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_function_envelope_error_classifies_as_validation() {
    let h = harness().await;
    let id = seed_project(&h.client).await;
    h.backend.function_error.store(true, Ordering::SeqCst);

    let err = h
        .client
        .run_seo_analysis(id, &Default::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
    assert_eq!(err.message, "focus keyword missing");
}

#[tokio::test]
async fn test_competitor_analysis_invalidates_competitor_views() {
    let h = harness().await;
    let id = seed_project(&h.client).await;

    h.client.list_competitors(id).await.unwrap();
    assert_eq!(h.backend.competitor_list_calls.load(Ordering::SeqCst), 1);

    let report = h
        .client
        .analyze_competitor(id, "rival.example")
        .await
        .unwrap();
    assert_eq!(report.competitor_domain, "rival.example");

    h.client.list_competitors(id).await.unwrap();
    assert_eq!(h.backend.competitor_list_calls.load(Ordering::SeqCst), 2);
}

// == Realtime ==

#[tokio::test]
async fn test_change_event_invalidates_before_callback() {
    let h = harness().await;
    let id = seed_project(&h.client).await;
    let filter = KeywordFilter::default();

    h.client.list_keywords(id, &filter).await.unwrap();
    assert_eq!(h.backend.keyword_list_calls.load(Ordering::SeqCst), 1);

    let (tx, rx) = std::sync::mpsc::channel();
    let _subscription = h.client.subscribe_keyword_changes(id, move |event| {
        tx.send(event).unwrap();
    });
    // Let the listener task attach to the hub
    tokio::time::sleep(Duration::from_millis(20)).await;

    h.hub.publish(ChangeEvent {
        table: "seo_keywords".to_string(),
        kind: ChangeKind::Insert,
        old: None,
        new: Some(json!({"project_id": id.to_string(), "keyword": "pushed"})),
    });

    // Wait for the forwarded event; by then invalidation has happened
    let event = wait_for(rx).await;
    assert_eq!(event.kind, ChangeKind::Insert);
    assert_eq!(event.row().unwrap()["keyword"], "pushed");

    h.client.list_keywords(id, &filter).await.unwrap();
    assert_eq!(h.backend.keyword_list_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_change_event_for_other_project_is_ignored() {
    let h = harness().await;
    let id = seed_project(&h.client).await;
    let filter = KeywordFilter::default();

    h.client.list_keywords(id, &filter).await.unwrap();

    let (tx, rx) = std::sync::mpsc::channel();
    let _subscription = h.client.subscribe_keyword_changes(id, move |event| {
        tx.send(event).unwrap();
    });
    tokio::time::sleep(Duration::from_millis(20)).await;

    h.hub.publish(ChangeEvent {
        table: "seo_keywords".to_string(),
        kind: ChangeKind::Update,
        old: None,
        new: Some(json!({"project_id": Uuid::new_v4().to_string()})),
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    // Not forwarded, and the cached listing is intact
    assert!(rx.try_recv().is_err());
    h.client.list_keywords(id, &filter).await.unwrap();
    assert_eq!(h.backend.keyword_list_calls.load(Ordering::SeqCst), 1);
}

async fn wait_for(rx: std::sync::mpsc::Receiver<ChangeEvent>) -> ChangeEvent {
    for _ in 0..100 {
        if let Ok(event) = rx.try_recv() {
            return event;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("change event was never forwarded");
}
