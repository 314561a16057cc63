use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::constants::status;
use crate::pipeline::{RelayOutcome, RelayPipeline};

pub struct AppState {
    pub pipeline: RelayPipeline,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/webhook", post(webhook))
        .route("/health", get(health))
        .with_state(state)
}

pub async fn run_server(state: Arc<AppState>, bind_addr: &str) -> std::io::Result<()> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!("API Server listening on {}", bind_addr);
    axum::serve(listener, app).await
}

async fn webhook(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let span = info_span!("webhook", request_id = %Uuid::new_v4());
    state
        .pipeline
        .handle(&body)
        .instrument(span)
        .await
        .into_response()
}

async fn health() -> impl IntoResponse {
    Json(json!({"status": status::OK}))
}

impl IntoResponse for RelayOutcome {
    fn into_response(self) -> Response {
        match self {
            RelayOutcome::Rejected(e) => (
                StatusCode::BAD_REQUEST,
                Json(json!({"status": status::ERROR, "message": e.to_string()})),
            )
                .into_response(),
            RelayOutcome::Ignored => (
                StatusCode::OK,
                Json(json!({"status": status::IGNORED, "reason": status::DUPLICATE_REASON})),
            )
                .into_response(),
            RelayOutcome::Relayed { reply, delivered } => (
                StatusCode::OK,
                Json(json!({"status": status::RELAYED, "reply": reply, "delivered": delivered})),
            )
                .into_response(),
            RelayOutcome::Failed(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"status": status::ERROR, "message": e.to_string()})),
            )
                .into_response(),
        }
    }
}
