//! HTTP API for a node.
//!
//! `/RECEIVE_SIGNED` is the wire protocol: peers deliver envelopes as
//! query parameters and get a plain `OK` back regardless of the verdict,
//! which only ever shows up in the receiver's audit trail. `/` reports
//! node status for humans poking at the demo.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use palisade_protocol::Envelope;

use crate::node::NodeState;

type AppState = Arc<NodeState>;

/// Build the API router.
pub fn build_router(state: AppState) -> Router {
    // CORS layer for browser access
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(status))
        .route("/health", get(health))
        .route("/RECEIVE_SIGNED", get(receive_signed))
        .layer(cors)
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

#[derive(Debug, Serialize)]
struct ParticipantSummary {
    pid: String,
    port: u16,
    public_key: String,
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    host: String,
    port: u16,
    pid: String,
    phase: String,
    locked: bool,
    role: Option<String>,
    participants: Vec<ParticipantSummary>,
}

async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let registry = state.registry().read().await;
    let participants = registry
        .members()
        .iter()
        .map(|p| ParticipantSummary {
            pid: p.pid.to_string(),
            port: p.port,
            public_key: p.public_key_hex(),
        })
        .collect();
    let locked = registry.is_locked();
    let role = registry.role().map(|r| r.to_string());
    drop(registry);

    Json(StatusResponse {
        host: state.config.host.clone(),
        port: state.port,
        pid: state.pid.to_string(),
        phase: state.phase().await.to_string(),
        locked,
        role,
        participants,
    })
}

async fn receive_signed(
    State(state): State<AppState>,
    Query(envelope): Query<Envelope>,
) -> (StatusCode, &'static str) {
    state.handle_envelope(envelope).await;
    (StatusCode::OK, "OK")
}
