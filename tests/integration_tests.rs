// Integration tests for fruitmatch

use actix_web::{test, web, App};
use async_trait::async_trait;
use fruitmatch::core::matcher::select_best;
use fruitmatch::core::{generate_fruit, IncomingPipeline, NarrativePolicy, PipelineError, PipelineOptions};
use fruitmatch::models::{
    Fruit, FruitKind, MatchRecord, MatchRecordUpdate, MatchScores, MatchingAlgorithm, NewFruit,
    NewMatchRecord,
};
use fruitmatch::routes::{self, AppState};
use fruitmatch::services::{DisabledGenerator, FruitStore, MemoryStore, StoreError};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Memory store that refuses match records after a number of successful writes
struct FlakyStore {
    inner: MemoryStore,
    allowed_records: usize,
    written: AtomicUsize,
}

#[async_trait]
impl FruitStore for FlakyStore {
    async fn create_fruit(&self, fruit: NewFruit) -> Result<Fruit, StoreError> {
        self.inner.create_fruit(fruit).await
    }

    async fn get_fruit(&self, id: Uuid) -> Result<Fruit, StoreError> {
        self.inner.get_fruit(id).await
    }

    async fn list_fruits(&self, kind: FruitKind) -> Result<Vec<Fruit>, StoreError> {
        self.inner.list_fruits(kind).await
    }

    async fn count_fruits(&self, kind: FruitKind) -> Result<u64, StoreError> {
        self.inner.count_fruits(kind).await
    }

    async fn create_match_record(&self, record: NewMatchRecord) -> Result<MatchRecord, StoreError> {
        if self.written.fetch_add(1, Ordering::SeqCst) >= self.allowed_records {
            return Err(StoreError::InvalidData("disk full".to_string()));
        }
        self.inner.create_match_record(record).await
    }

    async fn update_match_record(&self, id: Uuid, update: MatchRecordUpdate) -> Result<MatchRecord, StoreError> {
        self.inner.update_match_record(id, update).await
    }

    async fn get_match_record(&self, id: Uuid) -> Result<MatchRecord, StoreError> {
        self.inner.get_match_record(id).await
    }

    async fn list_best_matches(&self, limit: usize) -> Result<Vec<MatchRecord>, StoreError> {
        self.inner.list_best_matches(limit).await
    }

    async fn best_match_scores(&self) -> Result<Vec<MatchScores>, StoreError> {
        self.inner.best_match_scores().await
    }

    async fn create_algorithm(&self, algorithm: MatchingAlgorithm) -> Result<MatchingAlgorithm, StoreError> {
        self.inner.create_algorithm(algorithm).await
    }

    async fn find_algorithm(&self, key: &str) -> Result<Option<MatchingAlgorithm>, StoreError> {
        self.inner.find_algorithm(key).await
    }

    async fn active_algorithm(&self, key: &str) -> Result<Option<MatchingAlgorithm>, StoreError> {
        self.inner.active_algorithm(key).await
    }

    async fn list_algorithms(&self) -> Result<Vec<MatchingAlgorithm>, StoreError> {
        self.inner.list_algorithms().await
    }

    async fn health_check(&self) -> Result<bool, StoreError> {
        self.inner.health_check().await
    }
}

fn options(policy: NarrativePolicy) -> PipelineOptions {
    PipelineOptions {
        narrative_policy: policy,
        ..Default::default()
    }
}

fn app_state(store: Arc<dyn FruitStore>) -> AppState {
    AppState {
        pipeline: IncomingPipeline::with_rng(
            store.clone(),
            Arc::new(DisabledGenerator),
            options(NarrativePolicy::Fallback),
            StdRng::seed_from_u64(42),
        ),
        store,
    }
}

#[::core::prelude::v1::test]
fn test_tied_candidates_chosen_uniformly() {
    let mut rng = StdRng::seed_from_u64(2024);
    let scores = [10, 4, 10, 10];
    let mut counts = [0usize; 4];
    let trials = 6000;

    for _ in 0..trials {
        let index = select_best(&scores, &mut rng).unwrap();
        counts[index] += 1;
    }

    assert_eq!(counts[1], 0, "a lower score must never win");
    for index in [0, 2, 3] {
        let share = counts[index] as f64 / trials as f64;
        assert!((share - 1.0 / 3.0).abs() < 0.03, "candidate {} chosen {:.3} of the time", index, share);
    }
}

#[tokio::test]
async fn test_match_record_failure_aborts_pipeline() {
    let failing = Arc::new(FlakyStore {
        inner: MemoryStore::with_builtin_algorithm(),
        allowed_records: 1,
        written: AtomicUsize::new(0),
    });
    let mut rng = StdRng::seed_from_u64(5);
    for _ in 0..3 {
        failing
            .create_fruit(generate_fruit(FruitKind::Orange, &mut rng))
            .await
            .unwrap();
    }

    let pipeline = IncomingPipeline::new(failing.clone(), Arc::new(DisabledGenerator), options(NarrativePolicy::Omit));
    let result = pipeline.process_incoming(FruitKind::Apple).await;

    assert!(matches!(result, Err(PipelineError::StoreMatch { .. })));
    // Nothing was flagged, and the fruit itself stays stored
    assert!(failing.list_best_matches(10).await.unwrap().is_empty());
    assert_eq!(failing.count_fruits(FruitKind::Apple).await.unwrap(), 1);
}

#[tokio::test]
async fn test_match_record_round_trip_keeps_exact_scores() {
    let store = Arc::new(MemoryStore::with_builtin_algorithm());
    let pipeline = IncomingPipeline::new(store.clone(), Arc::new(DisabledGenerator), options(NarrativePolicy::Omit));

    pipeline.process_incoming(FruitKind::Apple).await.unwrap();
    pipeline.process_incoming(FruitKind::Apple).await.unwrap();
    let response = pipeline.process_incoming(FruitKind::Orange).await.unwrap();

    for summary in &response.matches {
        let record = store.get_match_record(summary.match_id).await.unwrap();
        assert_eq!(record.scores, summary.scores);
        assert_eq!(record.orange_id, response.fruit_id);
        assert!((0.0..=1.0).contains(&record.scores.overall_score));
    }
}

#[actix_web::test]
async fn test_incoming_endpoint_rejects_unknown_kind() {
    let state = app_state(Arc::new(MemoryStore::with_builtin_algorithm()));
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(routes::configure_routes),
    )
    .await;

    let req = test::TestRequest::post().uri("/api/v1/incoming/banana").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
}

#[actix_web::test]
async fn test_incoming_then_dashboard() {
    let state = app_state(Arc::new(MemoryStore::with_builtin_algorithm()));
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(routes::configure_routes),
    )
    .await;

    let req = test::TestRequest::post().uri("/api/v1/incoming/orange").to_request();
    let first: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(first["matchCount"], 0);
    assert!(first["bestMatch"].is_null());

    let req = test::TestRequest::post().uri("/api/v1/incoming/apple").to_request();
    let second: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(second["kind"], "apple");
    assert_eq!(second["matchCount"], 1);
    assert!(second["bestMatch"]["messageToIncoming"]
        .as_str()
        .unwrap()
        .starts_with("Welcome!"));

    let req = test::TestRequest::get().uri("/api/v1/dashboard").to_request();
    let dashboard: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(dashboard["metrics"]["totalApples"], 1);
    assert_eq!(dashboard["metrics"]["totalOranges"], 1);
    assert_eq!(dashboard["metrics"]["totalMatches"], 1);
    assert_eq!(dashboard["bestMatches"].as_array().unwrap().len(), 1);
}

#[actix_web::test]
async fn test_algorithm_registration_conflict() {
    let state = app_state(Arc::new(MemoryStore::with_builtin_algorithm()));
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(routes::configure_routes),
    )
    .await;

    let body = serde_json::json!({
        "key": "soft-criteria-v1",
        "name": "Soft criteria",
        "version": "1.0.0",
        "description": "duplicate"
    });
    let req = test::TestRequest::post().uri("/api/v1/algorithms").set_json(&body).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 409);

    let body = serde_json::json!({
        "key": "strict-v1",
        "name": "Strict",
        "version": "0.1.0",
        "description": "experimental",
        "status": "deprecated"
    });
    let req = test::TestRequest::post().uri("/api/v1/algorithms").set_json(&body).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);

    // Only active algorithms are listed
    let req = test::TestRequest::get().uri("/api/v1/algorithms").to_request();
    let listed: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(listed["count"], 1);
    assert_eq!(listed["algorithms"][0]["key"], "soft-criteria-v1");
}
