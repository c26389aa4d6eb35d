// =============================================================================
// REST API Endpoints — Axum 0.7
// =============================================================================
//
// All endpoints live under `/api/v1/`. Public endpoints (health) require no
// authentication. All other endpoints require a valid Bearer token checked via
// the `AuthBearer` extractor.
//
// CORS is configured permissively for development; tighten `allowed_origins`
// in production.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::api::auth::AuthBearer;
use crate::app_state::AppState;
use crate::persistence::Repository;

// =============================================================================
// Router construction
// =============================================================================

/// Build the full REST API router with CORS middleware and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // ── Public ──────────────────────────────────────────────────
        .route("/api/v1/health", get(health))
        // ── Read surface (authenticated) ───────────────────────────
        .route("/api/v1/state", get(full_state))
        .route("/api/v1/positions", get(positions))
        .route("/api/v1/strategies", get(strategies))
        .route("/api/v1/treasury", get(treasury))
        .route("/api/v1/evolution-history", get(evolution_history))
        .route("/api/v1/trade-journal", get(trade_journal))
        .route("/api/v1/trade-journal/stats", get(trade_journal_stats))
        // ── Control surface (authenticated) ────────────────────────
        .route("/api/v1/control/pause", post(control_pause))
        .route("/api/v1/control/resume", post(control_resume))
        .route("/api/v1/control/kill", post(control_kill))
        .route("/api/v1/control/evolve", post(control_evolve))
        .route("/api/v1/heartbeat", post(heartbeat))
        // ── WebSocket (handled separately in ws module but mounted here) ─
        .route("/api/v1/ws", get(crate::api::ws::ws_handler))
        // ── Middleware & State ───────────────────────────────────────
        .layer(cors)
        .with_state(state)
}

// =============================================================================
// Health (public)
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    state_version: u64,
    server_time: i64,
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let resp = HealthResponse {
        status: "ok",
        state_version: state.current_state_version(),
        server_time: chrono::Utc::now().timestamp_millis(),
    };
    Json(resp)
}

// =============================================================================
// Full state snapshot (authenticated)
// =============================================================================

async fn full_state(_auth: AuthBearer, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.build_snapshot())
}

// =============================================================================
// Positions (authenticated)
// =============================================================================

async fn positions(_auth: AuthBearer, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let open_positions = state.engine.open_positions();
    let positions: Vec<_> = open_positions.read().values().map(|mp| mp.position.clone()).collect();
    Json(positions)
}

// =============================================================================
// Strategies (authenticated)
// =============================================================================

async fn strategies(_auth: AuthBearer, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.strategies.read().clone())
}

// =============================================================================
// Treasury (authenticated)
// =============================================================================

async fn treasury(_auth: AuthBearer, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.treasury.snapshot())
}

// =============================================================================
// Evolution history (authenticated)
// =============================================================================

async fn evolution_history(_auth: AuthBearer, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.recent_evolution_cycles())
}

// =============================================================================
// Control endpoints (authenticated)
// =============================================================================

#[derive(Serialize)]
struct ControlResponse {
    status: String,
    message: String,
}

async fn control_pause(_auth: AuthBearer, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.stop();
    info!("trading paused via API");
    Json(ControlResponse {
        status: state.status().to_string(),
        message: "trading paused".to_string(),
    })
}

async fn control_resume(_auth: AuthBearer, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let started = state.start();
    if started {
        info!("trading resumed via API");
    } else {
        warn!("resume requested on a killed engine");
    }
    Json(ControlResponse {
        status: state.status().to_string(),
        message: if started {
            "trading resumed".to_string()
        } else {
            "engine has been killed and cannot be resumed".to_string()
        },
    })
}

async fn control_kill(_auth: AuthBearer, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.kill();
    warn!("trading killed via API");
    Json(ControlResponse {
        status: state.status().to_string(),
        message: "trading killed — restart the process to resume".to_string(),
    })
}

#[derive(Serialize)]
struct EvolveResponse {
    triggered: bool,
    generation: u32,
}

async fn control_evolve(
    _auth: AuthBearer,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, Json<serde_json::Value>)> {
    let triggered = state.trigger_evolution().await;
    if !triggered {
        return Err((
            StatusCode::CONFLICT,
            Json(serde_json::json!({ "error": "an evolution cycle is already running" })),
        ));
    }
    Ok(Json(EvolveResponse {
        triggered,
        generation: state.build_snapshot().generation,
    }))
}

// =============================================================================
// Heartbeat (authenticated)
// =============================================================================

async fn heartbeat(_auth: AuthBearer, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    *state.last_ws_user_event.write() = std::time::Instant::now();

    Json(serde_json::json!({
        "status": "ok",
        "server_time": chrono::Utc::now().timestamp_millis(),
    }))
}

// =============================================================================
// Trade Journal (authenticated)
// =============================================================================

async fn trade_journal(_auth: AuthBearer, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let mut closed: Vec<_> = state
        .trades_repo
        .find_all()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|t| !t.is_open())
        .collect();
    closed.sort_by(|a, b| b.opened_at.cmp(&a.opened_at));
    closed.truncate(500);
    Json(closed)
}

async fn trade_journal_stats(_auth: AuthBearer, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let closed: Vec<_> = state
        .trades_repo
        .find_all()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|t| !t.is_open())
        .collect();

    let total_trades = closed.len();
    if total_trades == 0 {
        return Json(serde_json::json!({
            "total_trades": 0,
            "win_rate": 0.0,
            "total_net_pnl": 0.0,
            "profit_factor": 0.0,
        }));
    }

    let pnls: Vec<f64> = closed.iter().map(|t| t.pnl_sol.unwrap_or(0.0)).collect();
    let wins = pnls.iter().filter(|p| **p > 0.0).count();
    let win_rate = wins as f64 / total_trades as f64;
    let total_net_pnl: f64 = pnls.iter().sum();
    let gross_profit: f64 = pnls.iter().filter(|p| **p > 0.0).sum();
    let gross_loss: f64 = pnls.iter().filter(|p| **p < 0.0).map(|p| p.abs()).sum();
    let profit_factor = if gross_loss > 0.0 {
        gross_profit / gross_loss
    } else if gross_profit > 0.0 {
        f64::INFINITY
    } else {
        0.0
    };

    Json(serde_json::json!({
        "total_trades": total_trades,
        "win_rate": win_rate,
        "total_net_pnl": total_net_pnl,
        "profit_factor": profit_factor,
    }))
}
