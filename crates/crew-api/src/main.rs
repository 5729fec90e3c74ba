//! crew-api - HTTP API server for crewdispatch

mod auth;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Path, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
    Form, Json, Router,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tower_http::{
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use auth::{hash_password, verify_password, JwtIdentityProvider};
use crew_assign::AssignmentService;
use crew_core::{
    Admin, AdminRepository, IdentityProvider, Level, Principal, RegisterAdminRequest,
    RegisterWorkerRequest, SubmitJobRequest, Worker, WorkerRepository,
};
use crew_db::Database;
use crew_notify::{spawn_dispatcher, NotifyHandle, SmtpConfig, SmtpNotifier};

// =============================================================================
// REQUEST ID (UUIDv7)
// =============================================================================

/// Generates time-ordered UUIDv7 request correlation IDs.
#[derive(Clone, Default)]
struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

// =============================================================================
// APPLICATION STATE
// =============================================================================

/// Application state shared across handlers.
#[derive(Clone)]
struct AppState {
    db: Database,
    service: Arc<AssignmentService>,
    identity: Arc<JwtIdentityProvider>,
}

// =============================================================================
// ERROR HANDLING
// =============================================================================

#[derive(Debug)]
enum ApiError {
    Internal(crew_core::Error),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    BadRequest(String),
    Conflict(String),
}

impl From<crew_core::Error> for ApiError {
    fn from(err: crew_core::Error) -> Self {
        match err {
            crew_core::Error::Unauthenticated(msg) => ApiError::Unauthorized(msg),
            crew_core::Error::Forbidden(msg) => ApiError::Forbidden(msg),
            crew_core::Error::NotFound(msg) => ApiError::NotFound(msg),
            crew_core::Error::Conflict(msg) => ApiError::Conflict(msg),
            crew_core::Error::InvalidInput(msg) => ApiError::BadRequest(msg),
            other => ApiError::Internal(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::Internal(err) => {
                error!(error = %err, "Internal error serving request");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
        };

        let body = Json(serde_json::json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}

// =============================================================================
// AUTHENTICATION EXTRACTORS
// =============================================================================

fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("missing Authorization header".to_string()))?;
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .ok_or_else(|| ApiError::Unauthorized("expected a Bearer token".to_string()))
}

/// Extractor for endpoints that require worker credentials.
#[derive(Debug, Clone)]
struct AuthWorker(Worker);

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthWorker {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)?;
        match state.identity.authenticate(token).await? {
            Principal::Worker(worker) => Ok(AuthWorker(worker)),
            Principal::Admin(_) => Err(ApiError::Forbidden(
                "worker credentials required".to_string(),
            )),
        }
    }
}

/// Extractor for endpoints that require admin credentials.
#[derive(Debug, Clone)]
struct AuthAdmin(Admin);

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)?;
        match state.identity.authenticate(token).await? {
            Principal::Admin(admin) => Ok(AuthAdmin(admin)),
            Principal::Worker(_) => Err(ApiError::Forbidden(
                "admin credentials required".to_string(),
            )),
        }
    }
}

// =============================================================================
// REQUEST / RESPONSE TYPES
// =============================================================================

#[derive(Debug, Deserialize)]
struct LoginForm {
    email: String,
    password: String,
}

#[derive(Debug, Serialize)]
struct TokenResponse {
    access_token: String,
    token_type: &'static str,
}

#[derive(Debug, Default, Deserialize)]
struct ClaimJobRequest {
    /// When the worker expects to finish. Defaults to 24 hours out.
    expected_completion: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct SetLevelRequest {
    level: Level,
}

// =============================================================================
// HANDLERS
// =============================================================================

async fn register_worker(
    State(state): State<AppState>,
    Json(req): Json<RegisterWorkerRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.email.is_empty() || req.password.is_empty() {
        return Err(ApiError::BadRequest(
            "email and password are required".to_string(),
        ));
    }
    let password_hash = hash_password(&req.password)?;
    let worker = state.db.workers.insert(&req, &password_hash).await?;
    info!(worker_id = %worker.id, department = %worker.department, "Worker registered");
    Ok((StatusCode::CREATED, Json(worker)))
}

async fn register_admin(
    State(state): State<AppState>,
    Json(req): Json<RegisterAdminRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.email.is_empty() || req.password.is_empty() {
        return Err(ApiError::BadRequest(
            "email and password are required".to_string(),
        ));
    }
    let password_hash = hash_password(&req.password)?;
    let admin = state.db.admins.insert(&req, &password_hash).await?;
    info!(admin_id = %admin.id, "Admin registered");
    Ok((StatusCode::CREATED, Json(admin)))
}

/// Exchange email + password for a bearer token. Workers and admins share
/// the endpoint; the role lands in the token, not in the form.
async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<impl IntoResponse, ApiError> {
    let principal = if let Some(worker) = state.db.workers.find_by_email(&form.email).await? {
        verify_password(&form.password, &worker.password_hash)?
            .then_some(Principal::Worker(worker))
    } else if let Some(admin) = state.db.admins.find_by_email(&form.email).await? {
        verify_password(&form.password, &admin.password_hash)?.then_some(Principal::Admin(admin))
    } else {
        None
    };

    let principal = principal
        .ok_or_else(|| ApiError::Unauthorized("invalid email or password".to_string()))?;
    let access_token = state.identity.issue(&principal)?;
    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer",
    }))
}

async fn submit_job(
    State(state): State<AppState>,
    Json(req): Json<SubmitJobRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.task.is_empty() {
        return Err(ApiError::BadRequest("task must not be empty".to_string()));
    }
    if req.department.is_empty() {
        return Err(ApiError::BadRequest(
            "department must not be empty".to_string(),
        ));
    }
    let job = state.service.submit_job(req).await?;
    Ok((StatusCode::CREATED, Json(job)))
}

async fn list_available_jobs(
    State(state): State<AppState>,
    AuthWorker(worker): AuthWorker,
) -> Result<impl IntoResponse, ApiError> {
    let jobs = state.service.list_available_jobs(&worker).await?;
    Ok(Json(jobs))
}

async fn claim_job(
    State(state): State<AppState>,
    AuthWorker(worker): AuthWorker,
    Path(job_id): Path<Uuid>,
    body: Option<Json<ClaimJobRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let req = body.map(|Json(r)| r).unwrap_or_default();
    let expected_completion = req
        .expected_completion
        .unwrap_or_else(|| Utc::now() + Duration::hours(24));
    let job = state
        .service
        .claim_job(&worker, job_id, expected_completion)
        .await?;
    Ok(Json(job))
}

async fn unclaim_job(
    State(state): State<AppState>,
    AuthWorker(worker): AuthWorker,
    Path(job_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.service.unclaim_job(&worker, job_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn complete_job(
    State(state): State<AppState>,
    AuthWorker(worker): AuthWorker,
    Path(job_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let job = state.service.complete_job(&worker, job_id).await?;
    Ok(Json(job))
}

async fn set_worker_level(
    State(state): State<AppState>,
    AuthAdmin(admin): AuthAdmin,
    Path(worker_id): Path<Uuid>,
    Json(req): Json<SetLevelRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let worker = state
        .service
        .promote_worker(&admin, worker_id, req.level)
        .await?;
    Ok(Json(worker))
}

async fn get_statistics(
    State(state): State<AppState>,
    AuthAdmin(admin): AuthAdmin,
) -> Result<impl IntoResponse, ApiError> {
    let standings = state.service.get_statistics(&admin).await?;
    Ok(Json(standings))
}

async fn get_worker_history(
    State(state): State<AppState>,
    AuthAdmin(admin): AuthAdmin,
    Path(worker_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let jobs = state.service.get_worker_history(&admin, worker_id).await?;
    Ok(Json(jobs))
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "time": Utc::now(),
    }))
}

// =============================================================================
// ROUTER
// =============================================================================

fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/v1/workers", post(register_worker))
        .route("/api/v1/admins", post(register_admin))
        .route("/api/v1/login", post(login))
        .route("/api/v1/jobs", post(submit_job))
        .route("/api/v1/jobs/available", get(list_available_jobs))
        .route("/api/v1/jobs/:id/claim", post(claim_job))
        .route("/api/v1/jobs/:id/unclaim", post(unclaim_job))
        .route("/api/v1/jobs/:id/complete", post(complete_job))
        .route("/api/v1/workers/:id/level", put(set_worker_level))
        .route("/api/v1/workers/:id/history", get(get_worker_history))
        .route("/api/v1/statistics", get(get_statistics))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .layer(CorsLayer::permissive())
        .layer(RequestBodyLimitLayer::new(1024 * 1024)) // 1 MB
        .with_state(state)
}

// =============================================================================
// STARTUP
// =============================================================================

fn build_notify_handle() -> NotifyHandle {
    let enabled = std::env::var("NOTIFY_ENABLED")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(true);
    if !enabled {
        info!("Notifications disabled by configuration");
        return NotifyHandle::disabled();
    }

    match SmtpConfig::from_env().and_then(SmtpNotifier::new) {
        Ok(notifier) => {
            info!("SMTP notifier configured");
            spawn_dispatcher(Arc::new(notifier))
        }
        Err(e) => {
            warn!(error = %e, "SMTP not configured, notifications disabled");
            NotifyHandle::disabled()
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "crew_api=debug,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "postgres://localhost/crewdispatch".to_string());
    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = std::env::var("PORT")
        .unwrap_or_else(|_| "3000".to_string())
        .parse()
        .unwrap_or(3000);
    let oversight_email = std::env::var("OVERSIGHT_EMAIL")
        .unwrap_or_else(|_| "oversight@crewdispatch.invalid".to_string());

    info!("Connecting to database...");
    let db = Database::connect(&database_url).await?;
    info!("Database connected");

    info!("Running database migrations...");
    db.migrate().await?;
    info!("Database migrations complete");

    let notify = build_notify_handle();

    let service = Arc::new(AssignmentService::new(
        Arc::new(db.workers.clone()),
        Arc::new(db.jobs.clone()),
        notify,
        oversight_email,
    ));
    let identity = Arc::new(JwtIdentityProvider::from_env(
        Arc::new(db.workers.clone()),
        Arc::new(db.admins.clone()),
    )?);

    let state = AppState {
        db,
        service,
        identity,
    };
    let app = app_router(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!(%addr, "crew-api listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Shutdown signal received");
}
