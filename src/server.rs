use crate::config::Config;
use crate::intune::GraphCredentials;
use crate::pipeline::ImportPipeline;
use crate::types::{BatchOutcome, BatchReport};
use axum::{
    http::Method,
    response::{IntoResponse, Json},
    routing::{get, post},
    Extension, Router,
};
use hyper::Server;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tracing::error;

/// Shared state for the import entry point.
pub struct AppState {
    pub pipeline: ImportPipeline,
    pub config: Config,
    pub credentials: GraphCredentials,
}

/// Request body for the import entry point.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRequest {
    pub identifiers: Vec<String>,
    pub group_tag: String,
}

/// Response body for the import entry point.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ImportResponse {
    fn from_report(report: BatchReport) -> Self {
        let summary = report.summary();
        let batch_size = report.batch_size;
        match report.outcome {
            BatchOutcome::Submitted { outcome } => Self {
                success: outcome.overall_success,
                message: outcome.message,
                processed_count: Some(outcome.processed_count),
                error_count: Some(outcome.failed_count),
                details: outcome.raw_detail,
            },
            BatchOutcome::ValidationFailed { issues } => Self {
                success: false,
                message: summary,
                processed_count: None,
                error_count: Some(batch_size),
                details: serde_json::to_value(&issues).ok(),
            },
        }
    }

    fn generic_failure(message: String) -> Self {
        Self {
            success: false,
            message,
            processed_count: None,
            error_count: None,
            details: None,
        }
    }
}

/// Health check endpoint
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "autopilot-importer",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Import entry point: validates the batch and forwards it to Intune.
async fn import_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(request): Json<ImportRequest>,
) -> impl IntoResponse {
    let Some(group_tag) = state
        .config
        .resolve_group_tag(&request.group_tag)
        .map(str::to_string)
    else {
        return Json(ImportResponse::generic_failure(format!(
            "Unknown group tag \"{}\".",
            request.group_tag
        )));
    };

    // Run on a separate task so an unexpected panic inside the pipeline
    // becomes a generic failure report instead of tearing down the request.
    let state = state.clone();
    let handle = tokio::spawn(async move {
        state
            .pipeline
            .run_parsed(request.identifiers, &group_tag, &state.credentials)
            .await
    });

    match handle.await {
        Ok(report) => Json(ImportResponse::from_report(report)),
        Err(join_error) => {
            error!("pipeline task failed unexpectedly: {join_error}");
            Json(ImportResponse::generic_failure(
                "An unexpected error occurred during Intune submission.".to_string(),
            ))
        }
    }
}

pub fn create_server(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_origin(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/import", post(import_handler))
        .layer(Extension(state))
        .layer(ServiceBuilder::new().layer(cors))
}

/// Start the HTTP server on the specified port
pub async fn start_server(
    state: Arc<AppState>,
    port: u16,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = create_server(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    println!("🚀 HTTP server running on http://localhost:{port}");
    println!("💚 Health check: http://localhost:{port}/health");
    println!("📦 Import API:   http://localhost:{port}/api/import");

    Server::bind(&addr).serve(app.into_make_service()).await?;

    Ok(())
}
