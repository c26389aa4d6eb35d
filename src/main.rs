// =============================================================================
// Strategy Arena — Main Entry Point
// =============================================================================
//
// The engine starts in the Stopped state for safety. Operators must
// explicitly resume it via the control surface (`POST /api/v1/control/resume`)
// once they've reviewed the seeded population and treasury allocation.
// =============================================================================

use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use strategy_arena::api;
use strategy_arena::app_state::AppState;
use strategy_arena::config::EngineConfig;
use strategy_arena::events::Topic;
use strategy_arena::persistence::Repository;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("strategy arena starting up");

    let config_path = std::env::var("ENGINE_CONFIG_PATH").unwrap_or_else(|_| "engine_config.json".to_string());
    let config = EngineConfig::load_or_default(&config_path);

    info!(
        population_size = config.population_size,
        total_sol = config.total_sol,
        evolution_cron = %config.evolution_cron,
        "engine configured — starting in Stopped state"
    );

    // ── 2. Build shared state ─────────────────────────────────────────────
    let data_dir = std::env::var("ENGINE_DATA_DIR").unwrap_or_else(|_| "./data".to_string());
    let state = Arc::new(AppState::new(config, &data_dir).await);

    // ── 3. Trade journal writer — persists every TradeClosed event ───────
    let journal_state = Arc::clone(&state);
    tokio::spawn(async move {
        let mut rx = journal_state.events.subscribe(Topic::Trades);
        loop {
            match rx.recv().await {
                Ok(strategy_arena::events::Event::TradeClosed { trade }) => {
                    if let Err(e) = journal_state.trades_repo.create(&trade).await {
                        warn!(error = %e, "failed to persist closed trade");
                    }
                }
                Ok(_) => {}
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    warn!(skipped = n, "trade journal writer lagged behind the event bus");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    // ── 4. API server ──────────────────────────────────────────────────────
    let api_state = Arc::clone(&state);
    let bind_addr = std::env::var("ENGINE_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3001".to_string());
    tokio::spawn(async move {
        let app = api::rest::router(api_state);
        let listener = tokio::net::TcpListener::bind(&bind_addr)
            .await
            .expect("failed to bind API server");
        info!(addr = %bind_addr, "API server listening");
        axum::serve(listener, app).await.expect("API server failed");
    });

    // ── 5. Evolution scheduler — fires on the configured cron expression ──
    let sched_state = Arc::clone(&state);
    tokio::spawn(async move {
        loop {
            let now = chrono::Utc::now();
            let next = match cron_parser::parse(sched_state.scheduler.cron(), &now) {
                Ok(t) => t,
                Err(e) => {
                    warn!(error = %e, cron = sched_state.scheduler.cron(), "invalid evolution cron expression; retrying in 1h");
                    now + chrono::Duration::hours(1)
                }
            };
            let wait = (next - now).to_std().unwrap_or(std::time::Duration::from_secs(60));
            tokio::time::sleep(wait).await;

            info!("scheduled evolution cycle firing");
            if !sched_state.trigger_evolution().await {
                warn!("scheduled evolution cycle skipped — a cycle was already running");
            }
        }
    });

    info!("all subsystems wired. Press Ctrl+C to stop.");

    // ── 6. Graceful shutdown ────────────────────────────────────────────
    tokio::signal::ctrl_c().await?;
    warn!("shutdown signal received — stopping gracefully");

    state.stop();
    if let Err(e) = state.config.read().save(&config_path) {
        error!(error = %e, "failed to save engine config on shutdown");
    }

    info!("strategy arena shut down complete");
    Ok(())
}
