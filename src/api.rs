//! REST API server for credchain
//!
//! `POST /register` and `POST /login` are the public contract; health, stats
//! and chain verification endpoints sit beside them, plus `POST /upload` and
//! `POST /retrieve` when an image archive is attached. Ledger work is
//! blocking file I/O and runs on the blocking thread pool.

use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, Request, State},
    http::{self, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;

use crate::config::{Config, DEFAULT_MAX_BODY_BYTES};
use crate::credentials::{CredentialService, LoginOutcome, RegisterOutcome};
use crate::error::LedgerError;
use crate::images::{ImageCode, ImageStore};

/// Shared state handed to every handler.
pub struct AppState {
    pub service: Arc<CredentialService>,
    pub images: Option<Arc<ImageStore>>,
    debug: bool,
    api_stats: RwLock<ApiStats>,
}

/// API statistics and monitoring
#[derive(Debug, Default)]
struct ApiStats {
    total_requests: u64,
    successful_requests: u64,
    failed_requests: u64,
    registrations: u64,
    logins: u64,
    uploads: u64,
    retrievals: u64,
    start_time: Option<Instant>,
}

impl ApiStats {
    fn new() -> Self {
        ApiStats {
            start_time: Some(Instant::now()),
            ..Default::default()
        }
    }

    fn record_request(&mut self, success: bool) {
        self.total_requests += 1;
        if success {
            self.successful_requests += 1;
        } else {
            self.failed_requests += 1;
        }
    }
}

impl AppState {
    pub fn new(service: CredentialService) -> Self {
        Self::with_debug(service, false)
    }

    pub fn with_debug(service: CredentialService, debug: bool) -> Self {
        AppState {
            service: Arc::new(service),
            images: None,
            debug,
            api_stats: RwLock::new(ApiStats::new()),
        }
    }

    /// Attach an image archive, enabling `/upload` and `/retrieve`.
    pub fn with_images(mut self, images: ImageStore) -> Self {
        self.images = Some(Arc::new(images));
        self
    }

    pub async fn get_stats(&self) -> ApiStatsResponse {
        let stats = self.api_stats.read().await;
        let uptime = stats.start_time.map(|t| t.elapsed().as_secs()).unwrap_or(0);

        ApiStatsResponse {
            total_requests: stats.total_requests,
            successful_requests: stats.successful_requests,
            failed_requests: stats.failed_requests,
            registrations: stats.registrations,
            logins: stats.logins,
            uploads: stats.uploads,
            retrievals: stats.retrievals,
            uptime_seconds: uptime,
        }
    }
}

// ============================================================================
// API Error Handling
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    InvalidInput(String),
    PayloadTooLarge(String),
    Ledger(LedgerError),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, msg),
            ApiError::Ledger(e) => {
                tracing::error!(error = %e, "ledger fault");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(MessageResponse { message })).into_response()
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        ApiError::Ledger(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let message = format!("Invalid request: {}", rejection.body_text());
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge(message)
        } else {
            ApiError::InvalidInput(message)
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::Internal(format!("Ledger task failed: {}", err))
    }
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    pub username: String,
    pub image_data: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub message: String,
    pub code: u64,
}

#[derive(Debug, Deserialize)]
pub struct RetrieveRequest {
    pub code: ImageCode,
    pub username: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrieveResponse {
    pub image_data: String,
}

#[derive(Serialize)]
pub struct ApiStatsResponse {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub registrations: u64,
    pub logins: u64,
    pub uploads: u64,
    pub retrievals: u64,
    pub uptime_seconds: u64,
}

#[derive(Serialize)]
pub struct VerifyResponse {
    pub ok: bool,
    pub linkage_ok: bool,
    pub length: usize,
    pub issues: Vec<String>,
}

fn message(status: StatusCode, text: &str) -> (StatusCode, Json<MessageResponse>) {
    (
        status,
        Json(MessageResponse {
            message: text.to_string(),
        }),
    )
}

// ============================================================================
// Middleware
// ============================================================================

async fn stats_middleware(State(state): State<Arc<AppState>>, req: Request, next: Next) -> Response {
    let response = next.run(req).await;

    let success = response.status().is_success();
    let mut stats = state.api_stats.write().await;
    stats.record_request(success);

    response
}

/// Logs method, path, status and duration of every request.
async fn logging_middleware(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    if state.debug {
        tracing::debug!(method = %method, path = %path, headers = ?req.headers(), "api.request.start");
    }

    let response = next.run(req).await;

    let duration = start.elapsed();
    let status = response.status();

    tracing::info!(
        method = %method,
        path = %path,
        status = %status.as_u16(),
        duration_ms = %duration.as_millis(),
        "api.request"
    );

    response
}

// ============================================================================
// API Server
// ============================================================================

/// Router settings taken from `[server]`.
#[derive(Debug, Clone)]
pub struct RouterOptions {
    pub static_dir: Option<PathBuf>,
    pub allowed_origins: Vec<String>,
    pub max_body_bytes: usize,
}

impl Default for RouterOptions {
    fn default() -> Self {
        RouterOptions {
            static_dir: None,
            allowed_origins: Vec::new(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl RouterOptions {
    pub fn from_config(config: &Config) -> Self {
        RouterOptions {
            static_dir: config.server.static_dir.as_ref().map(PathBuf::from),
            allowed_origins: config.server.allowed_origins.clone(),
            max_body_bytes: config.server.max_body_bytes,
        }
    }
}

// Credentials are never allowed; an empty origin list means any origin.
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods(vec![
            http::Method::GET,
            http::Method::POST,
            http::Method::OPTIONS,
        ])
        .allow_headers(vec![http::header::CONTENT_TYPE]);

    if allowed_origins.is_empty() {
        return cors.allow_origin(AllowOrigin::any());
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    cors.allow_origin(AllowOrigin::list(origins))
}

/// Build the API router with all endpoints.
pub fn build_api_router(state: Arc<AppState>, options: &RouterOptions) -> Router {
    let mut router = Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/chain/verify", get(verify_chain))
        .route("/health", get(health_check))
        .route("/stats", get(get_api_stats));

    if state.images.is_some() {
        router = router
            .route("/upload", post(upload_image))
            .route("/retrieve", post(retrieve_image));
    }

    let router = router
        // logging before stats so we always record timing
        .layer(middleware::from_fn_with_state(state.clone(), logging_middleware))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            stats_middleware,
        ))
        .layer(DefaultBodyLimit::max(options.max_body_bytes))
        .with_state(state)
        .layer(cors_layer(&options.allowed_origins));

    match &options.static_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router,
    }
}

/// Run the API server until the listener fails.
pub async fn run_api_server(
    state: Arc<AppState>,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let options = RouterOptions::from_config(config);
    let app = build_api_router(state, &options);

    let addr: SocketAddr = config
        .bind_address()
        .parse()
        .map_err(|e| format!("Invalid bind address {}: {}", config.bind_address(), e))?;

    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(%addr, ledger = %config.ledger.path, "API server listening");
    if let Some(dir) = &options.static_dir {
        tracing::info!(dir = %dir.display(), "serving static files");
    }

    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Route Handlers
// ============================================================================

async fn register(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    let Json(req) = payload?;
    let service = state.service.clone();

    let outcome =
        tokio::task::spawn_blocking(move || service.register(&req.username, &req.password))
            .await??;

    let status = match outcome {
        RegisterOutcome::Registered => {
            state.api_stats.write().await.registrations += 1;
            StatusCode::OK
        }
        RegisterOutcome::UsernameExists => StatusCode::BAD_REQUEST,
    };

    Ok(message(status, outcome.message()))
}

async fn login(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    let Json(req) = payload?;
    let service = state.service.clone();

    let outcome =
        tokio::task::spawn_blocking(move || service.login(&req.username, &req.password)).await??;

    let status = match outcome {
        LoginOutcome::Success => {
            state.api_stats.write().await.logins += 1;
            StatusCode::OK
        }
        LoginOutcome::IncorrectPassword => StatusCode::UNAUTHORIZED,
        LoginOutcome::UserNotFound => StatusCode::NOT_FOUND,
    };

    Ok(message(status, outcome.message()))
}

async fn upload_image(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<UploadRequest>, JsonRejection>,
) -> Result<Json<UploadResponse>, ApiError> {
    let Json(req) = payload?;
    let images = image_store(&state)?;

    let code =
        tokio::task::spawn_blocking(move || images.upload(&req.username, &req.image_data)).await??;
    state.api_stats.write().await.uploads += 1;

    Ok(Json(UploadResponse {
        message: "Image stored".to_string(),
        code,
    }))
}

async fn retrieve_image(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RetrieveRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(req) = payload?;
    let images = image_store(&state)?;

    let found = match req.code.value() {
        Some(code) => {
            tokio::task::spawn_blocking(move || images.retrieve(code, &req.username)).await??
        }
        None => None,
    };

    match found {
        Some(image_data) => {
            state.api_stats.write().await.retrievals += 1;
            Ok(Json(RetrieveResponse { image_data }).into_response())
        }
        None => Ok(message(StatusCode::NOT_FOUND, "Image not found").into_response()),
    }
}

fn image_store(state: &AppState) -> Result<Arc<ImageStore>, ApiError> {
    state
        .images
        .clone()
        .ok_or_else(|| ApiError::Internal("image archive is not configured".to_string()))
}

async fn verify_chain(State(state): State<Arc<AppState>>) -> Result<Json<VerifyResponse>, ApiError> {
    let service = state.service.clone();
    let report = tokio::task::spawn_blocking(move || service.audit()).await??;

    Ok(Json(VerifyResponse {
        ok: report.is_ok(),
        linkage_ok: report.linkage_ok(),
        length: report.length,
        issues: report.issues.iter().map(|i| i.to_string()).collect(),
    }))
}

async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let service = state.service.clone();
    let loaded = tokio::task::spawn_blocking(move || service.chain()).await;

    match loaded {
        Ok(Ok(chain)) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "healthy",
                "blocks": chain.len(),
                "timestamp": chrono::Utc::now().to_rfc3339()
            })),
        )
            .into_response(),
        Ok(Err(e)) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({
                "status": "unhealthy",
                "error": e.to_string(),
                "timestamp": chrono::Utc::now().to_rfc3339()
            })),
        )
            .into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

async fn get_api_stats(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.get_stats().await)
}
