use actix_web::{web, HttpResponse, Responder};
use crate::core::{IncomingPipeline, PipelineError};
use crate::models::{DashboardMetrics, DashboardResponse, ErrorResponse, FruitKind, HealthResponse, MatchScores};
use crate::services::{FruitStore, StoreError};
use std::sync::Arc;

/// Number of recent best matches shown on the dashboard
const DASHBOARD_MATCH_LIMIT: usize = 10;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn FruitStore>,
    pub pipeline: IncomingPipeline,
}

/// Configure all match-related routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/incoming", web::post().to(incoming_random))
        .route("/incoming/{kind}", web::post().to(incoming_fruit))
        .route("/dashboard", web::get().to(dashboard));
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let store_healthy = state.store.health_check().await.unwrap_or(false);

    let status = if store_healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Incoming fruit endpoint
///
/// POST /api/v1/incoming/{kind}
///
/// `kind` is `apple` or `orange`. A fresh fruit of that kind is generated, stored, and
/// scored against every stored fruit of the other kind.
async fn incoming_fruit(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let kind: FruitKind = match path.parse() {
        Ok(kind) => kind,
        Err(e) => {
            tracing::info!("Rejected incoming request: {}", e);
            return HttpResponse::BadRequest().json(ErrorResponse {
                error: "Invalid fruit kind".to_string(),
                message: "Kind must be one of: apple, orange".to_string(),
                status_code: 400,
            });
        }
    };

    run_pipeline(&state, kind).await
}

/// Incoming fruit of a random kind
///
/// POST /api/v1/incoming
async fn incoming_random(state: web::Data<AppState>) -> impl Responder {
    let kind = state.pipeline.random_kind();
    run_pipeline(&state, kind).await
}

async fn run_pipeline(state: &AppState, kind: FruitKind) -> HttpResponse {
    match state.pipeline.process_incoming(kind).await {
        Ok(response) => {
            tracing::info!(
                "Processed incoming {} {} with {} matches",
                kind,
                response.fruit_id,
                response.match_count
            );
            HttpResponse::Ok().json(response)
        }
        Err(e) => {
            tracing::error!("Incoming {} failed: {}", kind, e);
            HttpResponse::InternalServerError().json(ErrorResponse {
                error: pipeline_error_title(&e).to_string(),
                message: e.to_string(),
                status_code: 500,
            })
        }
    }
}

fn pipeline_error_title(error: &PipelineError) -> &'static str {
    match error {
        PipelineError::StoreFruit { .. } => "Failed to store fruit",
        PipelineError::ResolveAlgorithm(_) => "Failed to resolve algorithm",
        PipelineError::LoadCounterparts { .. } => "Failed to load counterparts",
        PipelineError::StoreMatch { .. } => "Failed to store match",
        PipelineError::UpdateMatch { .. } => "Failed to update match",
        PipelineError::Narrative { .. } => "Match messages unavailable",
    }
}

/// Dashboard metrics endpoint
///
/// GET /api/v1/dashboard
async fn dashboard(state: web::Data<AppState>) -> impl Responder {
    match load_dashboard(state.store.as_ref()).await {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(e) => {
            tracing::error!("Failed to load dashboard: {}", e);
            HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Failed to load dashboard".to_string(),
                message: e.to_string(),
                status_code: 500,
            })
        }
    }
}

pub async fn load_dashboard(store: &dyn FruitStore) -> Result<DashboardResponse, StoreError> {
    let total_apples = store.count_fruits(FruitKind::Apple).await?;
    let total_oranges = store.count_fruits(FruitKind::Orange).await?;
    let scores = store.best_match_scores().await?;
    let best_matches = store.list_best_matches(DASHBOARD_MATCH_LIMIT).await?;

    Ok(DashboardResponse {
        metrics: DashboardMetrics {
            total_apples,
            total_oranges,
            total_matches: scores.len() as u64,
            success_rate: success_rate(&scores),
        },
        best_matches,
    })
}

/// Mean overall score of best matches as a percentage, one decimal
pub fn success_rate(scores: &[MatchScores]) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    let mean = scores.iter().map(|s| s.overall_score).sum::<f64>() / scores.len() as f64;
    (mean * 1000.0).round() / 10.0
}
