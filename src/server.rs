//! HTTP API server.
//!
//! Exposes supplier registration and proposal ingestion as a JSON HTTP API.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/` | Greeting |
//! | `GET`  | `/health` | Health check (returns version) |
//! | `GET`  | `/suppliers` | Current supplier view, `{"results": [...]}` |
//! | `POST` | `/suppliers` | Register a supplier, `{"result": {...}}` |
//! | `POST` | `/proposal_emails` | Ingest a proposal email, `{"result": {...}}` |
//! | `GET`  | `/proposals/{rfp_name}` | Proposals for an RFP, `{"results": [...]}` |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "validation_failed", "message": "..." } }
//! ```
//!
//! | Code | Status | Cause |
//! |------|--------|-------|
//! | `bad_request` | 400 | Malformed body, unknown or missing fields, blank keys |
//! | `validation_failed` | 422 | Engine arguments do not match the proposal schema |
//! | `extraction_failed` | 502 | Engine made no call, several calls, or the wrong call; rejected the request; or sent an undecodable body |
//! | `engine_unavailable` | 503 | Engine unreachable, rate limited, or returned a 5xx |
//! | `persistence_failed` | 500 | Store write unacknowledged or store unreachable |
//!
//! The store and extractor are built once before the listener binds and
//! shared by every request through [`AppState`].

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use rfp_intake_core::error::{IngestError, StoreError};
use rfp_intake_core::extraction::Extractor;
use rfp_intake_core::ingest::IngestionPipeline;
use rfp_intake_core::models::{ProposalEmail, ProposalRecord, Supplier};
use rfp_intake_core::store::Store;

use crate::config::Config;
use crate::db;
use crate::langmodel;

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    store: Arc<dyn Store>,
    pipeline: IngestionPipeline,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, extractor: Arc<dyn Extractor>) -> Self {
        Self {
            pipeline: IngestionPipeline::new(extractor, store.clone()),
            store,
        }
    }
}

/// Build the router over already-constructed collaborators.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handle_root))
        .route("/health", get(handle_health))
        .route("/suppliers", get(handle_list_suppliers).post(handle_register_supplier))
        .route("/proposal_emails", post(handle_ingest_email))
        .route("/proposals/{rfp_name}", get(handle_list_proposals))
        .layer(cors)
        .with_state(state)
}

/// Starts the HTTP server on `[server].bind`.
///
/// Opens the store and builds the extractor before binding, serves until
/// Ctrl-C, then closes the store's connection pool.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let store = db::open_store(config).await?;
    let extractor = langmodel::create_extractor(&config.langmodel)?;
    let app = router(AppState::new(store.clone(), extractor));

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    tracing::info!(
        bind = %config.server.bind,
        provider = %config.langmodel.provider,
        model = %config.langmodel.version,
        "server listening"
    );

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    store.close().await;
    tracing::info!("store closed");
    served?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

impl From<IngestError> for AppError {
    fn from(err: IngestError) -> Self {
        let status = match err {
            IngestError::ValidationFailure(_) => StatusCode::UNPROCESSABLE_ENTITY,
            IngestError::ExtractionFailure(_) => StatusCode::BAD_GATEWAY,
            IngestError::EngineUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            IngestError::PersistenceFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        AppError {
            status,
            code: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        IngestError::PersistenceFailure(err).into()
    }
}

fn require(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        Err(bad_request(format!("{} must not be empty", field)))
    } else {
        Ok(())
    }
}

// ============ GET / and /health ============

async fn handle_root() -> Json<serde_json::Value> {
    Json(json!({ "message": "Hello World" }))
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ Suppliers ============

#[derive(Serialize)]
struct SupplierListResponse {
    results: Vec<Supplier>,
}

async fn handle_list_suppliers(
    State(state): State<AppState>,
) -> Result<Json<SupplierListResponse>, AppError> {
    let results = state.store.list_suppliers().await?;
    Ok(Json(SupplierListResponse { results }))
}

#[derive(Serialize)]
struct SupplierResponse {
    result: Supplier,
}

/// Handler for `POST /suppliers`. Always appends; see [`Store::register_supplier`].
async fn handle_register_supplier(
    State(state): State<AppState>,
    payload: Result<Json<Supplier>, JsonRejection>,
) -> Result<Json<SupplierResponse>, AppError> {
    let Json(supplier) = payload.map_err(|e| bad_request(e.body_text()))?;
    require("email", &supplier.email)?;

    state.store.register_supplier(&supplier).await?;
    tracing::info!(email = %supplier.email, "supplier registered");
    Ok(Json(SupplierResponse { result: supplier }))
}

// ============ Proposals ============

#[derive(Serialize)]
struct ProposalResponse {
    result: ProposalRecord,
}

/// Handler for `POST /proposal_emails`.
///
/// Runs the full ingestion pipeline and returns the committed proposal.
async fn handle_ingest_email(
    State(state): State<AppState>,
    payload: Result<Json<ProposalEmail>, JsonRejection>,
) -> Result<Json<ProposalResponse>, AppError> {
    let Json(email) = payload.map_err(|e| bad_request(e.body_text()))?;
    require("rfp_name", &email.rfp_name)?;
    require("from_address", &email.from_address)?;

    let result = state.pipeline.ingest(email).await?;
    Ok(Json(ProposalResponse { result }))
}

#[derive(Serialize)]
struct ProposalListResponse {
    results: Vec<ProposalRecord>,
}

/// Handler for `GET /proposals/{rfp_name}`. An unknown RFP returns an empty list.
async fn handle_list_proposals(
    State(state): State<AppState>,
    Path(rfp_name): Path<String>,
) -> Result<Json<ProposalListResponse>, AppError> {
    let results = state.store.list_proposals_for_rfp(&rfp_name).await?;
    Ok(Json(ProposalListResponse { results }))
}
