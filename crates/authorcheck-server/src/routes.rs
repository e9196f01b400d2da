//! HTTP routes and handlers

use axum::{
    extract::State,
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tracing::{debug, error};

use crate::state::AppState;
use authorcheck_classifiers::AuthorshipLabel;

/// Request body of `/predict`
#[derive(Debug, Deserialize, Serialize)]
pub struct PredictRequest {
    pub text: String,
}

/// Response body of `/predict`
#[derive(Debug, Deserialize, Serialize)]
pub struct PredictResponse {
    pub confidence: f64,
    pub label: AuthorshipLabel,
}

/// Build the router, restricting CORS to `allowed_origins`
pub fn create_router(state: AppState, allowed_origins: &[String]) -> anyhow::Result<Router> {
    let origins = allowed_origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin)
                .map_err(|e| anyhow::anyhow!("Invalid CORS origin '{}': {}", origin, e))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    // Credentials rule out wildcard methods/headers, so mirror the preflight instead
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request());

    Ok(Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .route("/predict", post(predict))
        .layer(cors)
        .with_state(state))
}

async fn health_check() -> &'static str {
    "OK"
}

async fn metrics(State(state): State<AppState>) -> Response {
    match &state.metrics_handle {
        Some(handle) => handle.render().into_response(),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed").into_response(),
    }
}

async fn predict(State(state): State<AppState>, Json(request): Json<PredictRequest>) -> Response {
    match state.classifier.classify(&request.text).await {
        Ok(result) => {
            debug!(
                confidence = result.confidence,
                label = %result.label,
                latency_us = result.latency_us,
                "Prediction served"
            );
            Json(PredictResponse {
                confidence: result.confidence,
                label: result.label,
            })
            .into_response()
        }
        Err(e) => {
            error!("Prediction failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}
