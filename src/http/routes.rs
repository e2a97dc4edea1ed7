//! HTTP route definitions

use std::time::Duration;

use axum::{
    extract::State,
    http::{header, Method, StatusCode},
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer,
};
use tracing::error;

use crate::app::AppState;
use crate::game::lifecycle::MatchPhase;
use crate::http::middleware::AuthenticatedAccount;
use crate::store::{ProgressRecord, StoreError};
use crate::util::time::uptime_secs;
use crate::ws::handler::ws_handler;
use crate::ws::protocol::QueueSizes;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    // CLIENT_ORIGIN may list several origins, comma-separated
    let allowed_origins: Vec<header::HeaderValue> = state
        .config
        .client_origin
        .split(',')
        .filter_map(|s| s.trim().parse::<header::HeaderValue>().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true);

    Router::new()
        .route("/health", get(health_handler))
        .route("/ws", get(ws_handler))
        .route("/progress", get(progress_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
                .layer(CompressionLayer::new())
                .layer(cors),
        )
        .with_state(state)
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    phase: MatchPhase,
    match_id: u64,
    roster_size: usize,
    connected_players: usize,
    queues: QueueSizes,
    persistence: &'static str,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let snapshot = state.game.latest_snapshot();

    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        phase: snapshot.match_info.phase,
        match_id: snapshot.match_info.id,
        roster_size: snapshot.players.len(),
        connected_players: state.game.player_count(),
        queues: snapshot.queues,
        persistence: if state.progress_store.is_remote() {
            "supabase"
        } else {
            "memory"
        },
    })
}

// ============================================================================
// Progress endpoint
// ============================================================================

async fn progress_handler(
    State(state): State<AppState>,
    auth: AuthenticatedAccount,
) -> Result<Json<ProgressRecord>, AppError> {
    state
        .progress_store
        .lookup(auth.account_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("No progress for this account".to_string()))
}

// ============================================================================
// Error handling
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Store(e) => {
                error!(error = %e, "Progress lookup failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal error".to_string(),
                )
            }
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}
