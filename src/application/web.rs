// ============================================================
// Layer 2 — HTTP Front End
// ============================================================
//   POST /predict-emotion   multipart field "image"
//                           200 {label, confidence}
//                           4xx/5xx {error}
//   GET  /health            200 {status, version, labels}
//
// The service is loaded before the listener binds, so a bad
// checkpoint never serves a single request. Forward passes are
// CPU-bound and run on tokio's blocking pool.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use thiserror::Error;

use crate::application::inference_service::InferenceService;
use crate::domain::prediction::Prediction;
use crate::error::EmotionError;

const IMAGE_FIELD: &str = "image";

// ─── Errors ───────────────────────────────────────────────────────────────────
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("no face detected")]
    NoFace,

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NoFace => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<EmotionError> for ApiError {
    fn from(err: EmotionError) -> Self {
        match err {
            EmotionError::Input(msg) => ApiError::BadRequest(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }
        (status, Json(ErrorResponse { error: self.to_string() })).into_response()
    }
}

// ─── Responses ────────────────────────────────────────────────────────────────
#[derive(Debug, Serialize, PartialEq)]
pub struct PredictResponse {
    pub label:      String,
    pub confidence: f32,
}

impl TryFrom<Prediction> for PredictResponse {
    type Error = ApiError;

    fn try_from(prediction: Prediction) -> Result<Self, ApiError> {
        let confidence = prediction.confidence();
        match prediction {
            Prediction::Classified { label, .. } | Prediction::Fallback { label } => {
                Ok(Self { label, confidence })
            }
            Prediction::NoFaceDetected => Err(ApiError::NoFace),
        }
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status:  &'static str,
    version: &'static str,
    labels:  Vec<String>,
}

// ─── Router ───────────────────────────────────────────────────────────────────
pub fn router(service: Arc<InferenceService>) -> Router {
    Router::new()
        .route("/predict-emotion", post(predict_emotion))
        .route("/health", get(health))
        .with_state(service)
}

/// Bind, serve until Ctrl-C, then drain in-flight requests.
pub async fn serve(addr: SocketAddr, service: Arc<InferenceService>) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Received shutdown signal");
}

// ─── Handlers ─────────────────────────────────────────────────────────────────
async fn health(State(service): State<Arc<InferenceService>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status:  "healthy",
        version: env!("CARGO_PKG_VERSION"),
        labels:  service.vocabulary().names().to_vec(),
    })
}

async fn predict_emotion(
    State(service): State<Arc<InferenceService>>,
    mut multipart: Multipart,
) -> Result<Json<PredictResponse>, ApiError> {
    let mut image = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
    {
        if field.name() == Some(IMAGE_FIELD) {
            let bytes = field.bytes().await.map_err(|e| ApiError::BadRequest(e.to_string()))?;
            image = Some(bytes.to_vec());
            break;
        }
    }
    let bytes = image.ok_or_else(|| ApiError::BadRequest(format!("missing multipart field '{IMAGE_FIELD}'")))?;

    let prediction = classify(service, bytes).await?;
    tracing::info!("Prediction: {:?}", prediction);
    PredictResponse::try_from(prediction).map(Json)
}

/// Run one prediction off the async runtime.
pub async fn classify(service: Arc<InferenceService>, bytes: Vec<u8>) -> Result<Prediction, ApiError> {
    if bytes.is_empty() {
        return Err(ApiError::BadRequest("empty image upload".into()));
    }
    tokio::task::spawn_blocking(move || service.predict(&bytes))
        .await
        .map_err(|e| ApiError::Internal(format!("prediction task failed: {e}")))?
        .map_err(ApiError::from)
}
