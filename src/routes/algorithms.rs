use actix_web::{web, HttpResponse, Responder};
use validator::Validate;
use crate::models::{AlgorithmResponse, AlgorithmStatus, ErrorResponse, MatchingAlgorithm, RegisterAlgorithmRequest};
use crate::routes::matches::AppState;
use crate::services::StoreError;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/algorithms", web::post().to(register_algorithm))
        .route("/algorithms", web::get().to(list_algorithms));
}

/// Register algorithm endpoint
///
/// POST /api/v1/algorithms
///
/// Request body:
/// ```json
/// {
///   "key": "soft-criteria-v2",
///   "name": "string",
///   "version": "string",
///   "description": "string",
///   "status": "active|deprecated",
///   "defaultConfig": {}
/// }
/// ```
async fn register_algorithm(
    state: web::Data<AppState>,
    req: web::Json<RegisterAlgorithmRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        tracing::info!("Validation failed for algorithm registration: {:?}", errors);
        return HttpResponse::BadRequest().json(ErrorResponse {
            error: "Validation failed".to_string(),
            message: errors.to_string(),
            status_code: 400,
        });
    }

    let req = req.into_inner();
    let status = match req.status.as_deref().map(str::parse::<AlgorithmStatus>) {
        None => AlgorithmStatus::Active,
        Some(Ok(status)) => status,
        Some(Err(message)) => {
            return HttpResponse::BadRequest().json(ErrorResponse {
                error: "Invalid status".to_string(),
                message,
                status_code: 400,
            });
        }
    };

    let algorithm = MatchingAlgorithm {
        key: req.key,
        name: req.name,
        version: req.version,
        description: req.description,
        status,
        default_config: req.default_config,
    };

    match state.store.create_algorithm(algorithm).await {
        Ok(algorithm) => {
            tracing::info!("Registered algorithm {} v{}", algorithm.key, algorithm.version);
            HttpResponse::Created().json(AlgorithmResponse {
                message: "Algorithm registered".to_string(),
                algorithm,
            })
        }
        Err(StoreError::Conflict(message)) => HttpResponse::Conflict().json(ErrorResponse {
            error: "Algorithm already exists".to_string(),
            message,
            status_code: 409,
        }),
        Err(e) => {
            tracing::error!("Failed to register algorithm: {}", e);
            HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Failed to register algorithm".to_string(),
                message: e.to_string(),
                status_code: 500,
            })
        }
    }
}

/// Active algorithms
///
/// GET /api/v1/algorithms
async fn list_algorithms(state: web::Data<AppState>) -> impl Responder {
    match state.store.list_algorithms().await {
        Ok(algorithms) => HttpResponse::Ok().json(serde_json::json!({
            "algorithms": algorithms,
            "count": algorithms.len(),
        })),
        Err(e) => {
            tracing::error!("Failed to list algorithms: {}", e);
            HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Failed to list algorithms".to_string(),
                message: e.to_string(),
                status_code: 500,
            })
        }
    }
}
