// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The minimal HTTP surface this core exposes directly (§4.G, §6): the
//! agent duplex WebSocket endpoint and a liveness health check. The
//! administrative HTTP/JSON surface (CRUD for agents, monitors, alert
//! rules, channels) is an external collaborator consuming this crate as a
//! library, not a route served here.

use std::sync::Arc;

use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::CorsLayer;

use crate::agent_link::ws::ws_handler;
use crate::state::AppState;

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    online_agents: usize,
}

async fn healthz(axum::extract::State(state): axum::extract::State<Arc<AppState>>) -> Json<HealthResponse> {
    let online_agents = state.sessions.online_ids().await.len();
    Json(HealthResponse { status: "ok", online_agents })
}

/// Build the axum `Router` for the agent-facing endpoint.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/ws/agent", get(ws_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
