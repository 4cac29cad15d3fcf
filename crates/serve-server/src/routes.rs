use crate::agents::{self, AgentKind, AgentRequest};
use crate::state::AppState;
use axum::extract::State;
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use axum::Router;
use chrono::Local;
use serde_json::{json, Map, Value};
use serve_analytics::MetricsSnapshot;
use serve_core::tool_registry::Tool;
use serve_tools::ExternalCreateTool;

// All agent-facing responses are HTTP 200; the envelope's `success` flag
// carries the outcome.

// ── Health ──────────────────────────────────────────────────────────────

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

// ── Conversational flows ────────────────────────────────────────────────

pub fn agent_routes() -> Router<AppState> {
    Router::new()
        .route("/support", post(support))
        .route("/dashboard", post(dashboard))
}

async fn support(State(state): State<AppState>, Json(req): Json<AgentRequest>) -> Json<Value> {
    Json(agents::handle_query(&state, AgentKind::Support, req).await)
}

async fn dashboard(State(state): State<AppState>, Json(req): Json<AgentRequest>) -> Json<Value> {
    Json(agents::handle_query(&state, AgentKind::Dashboard, req).await)
}

// ── Catalog and snapshot endpoints ──────────────────────────────────────

pub fn info_routes() -> Router<AppState> {
    Router::new()
        .route("/languages", get(languages))
        .route("/metrics", get(metrics))
        .route("/memory/stats", get(memory_stats))
        .route("/external-demo", post(external_demo))
}

async fn languages() -> Json<Value> {
    let mut table = Map::new();
    for (code, name) in agents::LANGUAGES {
        table.insert((*code).to_string(), json!(name));
    }
    Json(json!({ "success": true, "languages": table }))
}

async fn metrics(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    let today = Local::now().date_naive();
    Json(MetricsSnapshot::compute(&state.dataset, today))
}

async fn memory_stats(State(state): State<AppState>) -> Json<Value> {
    let stats = {
        let memory = state.memory.read().await;
        memory.stats()
    };
    Json(json!({
        "success": true,
        "activeSessions": stats.active_sessions,
        "maxTurns": stats.max_turns,
        "retentionHours": stats.retention_hours,
    }))
}

/// Demo pass-through to the external creation stub, for exercising it
/// without a conversation.
async fn external_demo(Json(body): Json<Value>) -> Json<Value> {
    let envelope = match ExternalCreateTool.execute(body).await {
        Ok(out) => serde_json::from_str(&out)
            .unwrap_or_else(|_| json!({ "success": false, "error": "Malformed tool output" })),
        Err(e) => json!({ "success": false, "error": e.to_string() }),
    };
    Json(envelope)
}
