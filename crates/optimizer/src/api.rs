//! HTTP API: analysis, Terraform rendering, health checks and Prometheus metrics

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use optimizer_lib::{
    classifier::Classifier,
    ingest,
    recommend::{AnalysisReport, Analyzer, Recommendation},
    terraform, OptimizerError, ServiceMetrics, StructuredLogger,
};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Multipart field carrying the usage report
pub const UPLOAD_FIELD: &str = "file";

/// Shared application state
pub struct AppState {
    pub analyzer: Analyzer,
    pub metrics: ServiceMetrics,
    pub logger: StructuredLogger,
    pub max_upload_bytes: usize,
    ready: AtomicBool,
}

impl AppState {
    pub fn new(
        classifier: Arc<dyn Classifier>,
        metrics: ServiceMetrics,
        logger: StructuredLogger,
        max_upload_bytes: usize,
    ) -> Self {
        metrics.set_model_version(&classifier.model_version(), &classifier.kind().to_string());
        Self {
            analyzer: Analyzer::new(classifier).with_metrics(metrics.clone()),
            metrics,
            logger,
            max_upload_bytes,
            ready: AtomicBool::new(false),
        }
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    /// Parse, classify and aggregate one upload
    pub fn run_analysis(&self, bytes: &[u8]) -> optimizer_lib::Result<AnalysisReport> {
        let start = Instant::now();

        let batch = ingest::parse_upload(bytes, &mut rand::rng())?;
        self.logger
            .log_columns_synthesized(&batch.synthesized_columns, batch.len());

        let rows = batch.len();
        let outcome = self.analyzer.analyze(batch.observations)?;
        for group in &outcome.unrecognized {
            self.metrics.inc_unrecognized_label(&group.label);
            self.logger.log_unrecognized_label(&group.label, group.member_count);
        }

        let elapsed = start.elapsed();
        self.metrics.observe_analysis_latency(elapsed.as_secs_f64());
        self.metrics.record_analysis(rows);

        let report = outcome.report;
        self.logger.log_analysis_completed(
            rows,
            report.recommendations.len(),
            report.total_cost,
            report.total_savings,
            elapsed.as_millis(),
        );
        Ok(report)
    }
}

/// Error returned by API handlers
#[derive(Debug)]
pub enum ApiError {
    Optimizer(OptimizerError),
    PayloadTooLarge(String),
}

impl From<OptimizerError> for ApiError {
    fn from(err: OptimizerError) -> Self {
        ApiError::Optimizer(err)
    }
}

impl ApiError {
    fn kind(&self) -> &'static str {
        match self {
            ApiError::Optimizer(err) => err.kind(),
            ApiError::PayloadTooLarge(_) => "payload_too_large",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let (status, message) = match self {
            ApiError::Optimizer(err) if err.is_client_error() => (StatusCode::BAD_REQUEST, err.to_string()),
            ApiError::Optimizer(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
            ApiError::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, msg),
        };
        (status, Json(json!({ "error": message, "kind": kind }))).into_response()
    }
}

async fn api_health() -> impl IntoResponse {
    Json(json!({ "status": "ok", "message": "Backend is running!" }))
}

/// Read the `file` field of the multipart body
async fn read_upload(multipart: &mut Multipart) -> Result<Vec<u8>, ApiError> {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return Err(OptimizerError::NoFileUploaded.into()),
            Err(e) if e.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                return Err(ApiError::PayloadTooLarge(e.body_text()))
            }
            Err(e) => return Err(OptimizerError::EmptyOrMalformedUpload(e.body_text()).into()),
        };
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        return match field.bytes().await {
            Ok(bytes) => Ok(bytes.to_vec()),
            Err(e) if e.status() == StatusCode::PAYLOAD_TOO_LARGE => Err(ApiError::PayloadTooLarge(e.body_text())),
            Err(e) => Err(OptimizerError::EmptyOrMalformedUpload(e.body_text()).into()),
        };
    }
}

async fn analyze(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<AnalysisReport>, ApiError> {
    let result = match read_upload(&mut multipart).await {
        Ok(bytes) => {
            let worker = Arc::clone(&state);
            tokio::task::spawn_blocking(move || worker.run_analysis(&bytes))
                .await
                .map_err(|e| {
                    ApiError::from(OptimizerError::Classification(anyhow::anyhow!(
                        "analysis task failed: {}",
                        e
                    )))
                })
                .and_then(|r| r.map_err(ApiError::from))
        }
        Err(e) => Err(e),
    };

    match result {
        Ok(report) => Ok(Json(report)),
        Err(err) => {
            state.metrics.inc_analysis_errors(err.kind());
            match &err {
                ApiError::Optimizer(e) if !e.is_client_error() => {
                    error!(error = %e, kind = e.kind(), "Analysis failed")
                }
                ApiError::Optimizer(e) => state.logger.log_upload_rejected(e.kind(), &e.to_string()),
                ApiError::PayloadTooLarge(msg) => state.logger.log_upload_rejected(err.kind(), msg),
            }
            Err(err)
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TerraformRequest {
    pub recommendations: Vec<Recommendation>,
}

async fn generate_terraform(Json(request): Json<TerraformRequest>) -> impl IntoResponse {
    info!(recommendations = request.recommendations.len(), "Rendering Terraform script");
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        terraform::render(&request.recommendations),
    )
}

#[derive(Debug, Serialize)]
struct LivenessResponse {
    status: &'static str,
    instance: String,
    classifier: String,
    model_version: String,
}

async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let classifier = state.analyzer.classifier();
    Json(LivenessResponse {
        status: "healthy",
        instance: state.logger.instance_name().to_string(),
        classifier: classifier.kind().to_string(),
        model_version: classifier.model_version(),
    })
}

#[derive(Debug, Serialize)]
struct ReadinessResponse {
    ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    if state.is_ready() {
        (
            StatusCode::OK,
            Json(ReadinessResponse {
                ready: true,
                reason: None,
            }),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadinessResponse {
                ready: false,
                reason: Some("classifier not loaded".to_string()),
            }),
        )
    }
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    let body_limit = state.max_upload_bytes;
    Router::new()
        .route("/api/health", get(api_health))
        .route("/api/analyze", post(analyze))
        .route("/api/terraform", post(generate_terraform))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Start the API server
pub async fn serve(addr: &str, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
