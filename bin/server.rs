// Donor Engagement - Web Server
// Thin REST adapter over the provisioning, ledger and status operations

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use donor_engagement::{
    compute_event_status, create_event, event_with_relations, events_for_fundraiser, open_database,
    setup_database, AccountId, Config, CoreError, DonorId, ErrorKind, EventDraft, EventId,
    SelectionLedger,
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Header carrying the account id resolved by the authentication layer
const ACCOUNT_HEADER: &str = "x-account-id";

/// Shared application state
#[derive(Clone)]
struct AppState {
    db: Arc<Mutex<Connection>>,
    ledger: Arc<SelectionLedger>,
}

impl AppState {
    fn conn(&self) -> Result<MutexGuard<'_, Connection>, ApiError> {
        self.db
            .lock()
            .map_err(|_| ApiError::internal("database connection lock poisoned"))
    }
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: T,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
}

/// Error translated into a status code
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn internal(message: &str) -> Self {
        ApiError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.to_string(),
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let status = match err.kind() {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::Authentication => StatusCode::UNAUTHORIZED,
            ErrorKind::Storage => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %err, "Request failed");
        }

        ApiError {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            success: false,
            error: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

/// Account id from the request headers; None when absent or unparsable
fn account_from(headers: &HeaderMap) -> Option<AccountId> {
    headers
        .get(ACCOUNT_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|raw| raw.trim().parse().ok())
        .map(AccountId)
}

/// Account id from the request headers, or `Authentication`
fn require_account(headers: &HeaderMap) -> Result<AccountId, CoreError> {
    account_from(headers)
        .ok_or_else(|| CoreError::Authentication("missing account header".to_string()))
}

/// Body of save/confirm requests. `donorIds` stays raw JSON so a malformed
/// collection is reported as a validation error rather than a decode error.
#[derive(Deserialize)]
struct SelectionRequest {
    #[serde(rename = "donorIds", default)]
    donor_ids: serde_json::Value,
}

/// Decode a save/confirm body. Called only after the account header is checked.
fn parse_donor_ids(body: &Bytes) -> Result<Vec<DonorId>, CoreError> {
    let request: SelectionRequest = serde_json::from_slice(body)
        .map_err(|e| CoreError::Validation(format!("malformed request body: {}", e)))?;

    let items = request
        .donor_ids
        .as_array()
        .ok_or_else(|| CoreError::Validation("donorIds must be an array".to_string()))?;

    items
        .iter()
        .map(|item| {
            item.as_i64()
                .map(DonorId)
                .ok_or_else(|| CoreError::Validation(format!("invalid donor id {}", item)))
        })
        .collect()
}

#[derive(Serialize)]
struct CreatedEvent {
    event_id: EventId,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// POST /api/events - Create and provision an event
async fn post_event(
    State(state): State<AppState>,
    Json(draft): Json<EventDraft>,
) -> Result<impl IntoResponse, ApiError> {
    let mut conn = state.conn()?;
    let event_id = create_event(&mut conn, &draft)?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(CreatedEvent { event_id }))))
}

/// GET /api/events/status - Finished vs waiting events
async fn get_event_status(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let mut conn = state.conn()?;
    let breakdown = compute_event_status(&mut conn)?;
    Ok(Json(ApiResponse::ok(breakdown)))
}

/// GET /api/events/mine - Events the caller is assigned to, with relations
async fn get_my_events(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let mut conn = state.conn()?;
    let events = events_for_fundraiser(&mut conn, account_from(&headers))?;
    Ok(Json(ApiResponse::ok(events)))
}

/// GET /api/events/:id - One event with its organizer and assigned fundraisers
async fn get_event(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let mut conn = state.conn()?;
    let view = event_with_relations(&mut conn, EventId(event_id))?;
    Ok(Json(ApiResponse::ok(view)))
}

/// GET /api/events/:id/selections - The caller's donors for an event
async fn get_selections(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let conn = state.conn()?;
    let rows =
        state
            .ledger
            .list_fundraiser_selections(&conn, EventId(event_id), account_from(&headers))?;
    Ok(Json(ApiResponse::ok(rows)))
}

/// POST /api/events/:id/selections/save - Replace the caller's selected set
async fn save_selections(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let account = require_account(&headers)?;
    let donor_ids = parse_donor_ids(&body)?;

    let mut conn = state.conn()?;
    let outcome =
        state
            .ledger
            .save_selections(&mut conn, EventId(event_id), &donor_ids, Some(account))?;
    Ok(Json(ApiResponse::ok(outcome)))
}

/// POST /api/events/:id/selections/confirm - Confirm the caller's donors
async fn confirm_selections(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let account = require_account(&headers)?;
    let donor_ids = parse_donor_ids(&body)?;

    let mut conn = state.conn()?;
    let outcome =
        state
            .ledger
            .confirm_selections(&mut conn, EventId(event_id), &donor_ids, Some(account))?;
    Ok(Json(ApiResponse::ok(outcome)))
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    use anyhow::Context;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;

    let conn = open_database(&config.database_path, config.busy_timeout)
        .with_context(|| format!("Failed to open {}", config.database_path.display()))?;
    setup_database(&conn).context("Failed to set up schema")?;
    tracing::info!(
        path = %config.database_path.display(),
        confirm_policy = config.confirm_policy.as_str(),
        "Database opened"
    );

    // Create shared state
    let state = AppState {
        db: Arc::new(Mutex::new(conn)),
        ledger: Arc::new(SelectionLedger::new(config.confirm_policy)),
    };

    // Build API routes
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/events", post(post_event))
        .route("/events/status", get(get_event_status))
        .route("/events/mine", get(get_my_events))
        .route("/events/:id", get(get_event))
        .route("/events/:id/selections", get(get_selections))
        .route("/events/:id/selections/save", post(save_selections))
        .route("/events/:id/selections/confirm", post(confirm_selections))
        .with_state(state);

    let app = Router::new()
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    tracing::info!("Server running on http://{}", addr);

    axum::serve(listener, app)
        .await
        .context("Server exited with error")?;

    Ok(())
}
