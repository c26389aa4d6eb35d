// =============================================================================
// Central application state — wires every subsystem together
// =============================================================================
//
// The single source of truth the API surface reads from and the CLI writes
// through. Every subsystem holds its own interior mutability (Treasury,
// TradingEngine, EventBus); AppState ties them together and exposes the
// `StateSnapshot` the REST/WebSocket surface sends to clients, advancing a
// version counter on every state-changing call so pollers and websocket
// subscribers can tell when to re-fetch.
//
// =============================================================================

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::engine::{StrategyRoster, TradingEngine};
use crate::events::{Event, EventBus};
use crate::execution::{ExecutionAdapter, PaperExecutionAdapter, RealExecutionAdapter};
use crate::feed::{Feed, PaperFeed};
use crate::genetic::{EvolutionCycle, GeneticEngine, GeneticParams};
use crate::genome::StrategyGenome;
use crate::persistence::{CycleRepository, FileRepository, Repository, TreasuryRepository};
use crate::rng::Rng;
use crate::scheduler::{Scheduler, StrategyStore};
use crate::trade::{Position, Trade};
use crate::treasury::{Treasury, TreasurySnapshot};
use crate::types::{EngineStatus, ExecutionMode};

/// Full engine state snapshot sent to the dashboard via `GET /api/v1/state`
/// and pushed over the WebSocket whenever `state_version` advances.
#[derive(Debug, Clone, Serialize)]
pub struct StateSnapshot {
    pub state_version: u64,
    pub server_time: i64,
    pub status: String,
    pub generation: u32,
    pub strategy_count: usize,
    pub open_position_count: usize,
    pub treasury: TreasurySnapshot,
    pub positions: Vec<Position>,
    pub strategies: Vec<StrategyGenome>,
}

pub struct AppState {
    pub state_version: AtomicU64,
    pub ws_sequence_number: AtomicU64,
    pub ws_user_connected: RwLock<bool>,
    pub last_ws_user_event: RwLock<std::time::Instant>,

    pub config: RwLock<EngineConfig>,
    pub status: RwLock<EngineStatus>,

    pub strategies: StrategyRoster,
    pub treasury: Arc<Treasury>,
    pub events: Arc<EventBus>,
    pub engine: Arc<TradingEngine>,
    pub scheduler: Arc<Scheduler>,
    pub genetic_engine: Arc<RwLock<GeneticEngine>>,
    pub rng: Mutex<Rng>,

    pub strategies_repo: Arc<FileRepository<StrategyGenome>>,
    pub trades_repo: Arc<FileRepository<Trade>>,
    pub cycles_repo: Arc<CycleRepository>,
    pub treasury_repo: Arc<TreasuryRepository>,

    pub start_time: std::time::Instant,
}

impl AppState {
    /// Build a fresh `AppState` from `config`, loading persisted strategies
    /// and treasury if present, seeding a genesis population otherwise.
    pub async fn new(config: EngineConfig, data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        let _ = std::fs::create_dir_all(&data_dir);

        let strategies_repo = Arc::new(FileRepository::<StrategyGenome>::new(
            data_dir.join("strategies.json"),
        ));
        let trades_repo = Arc::new(FileRepository::<Trade>::new(data_dir.join("trades.json")));
        let cycles_repo = Arc::new(CycleRepository::new(data_dir.join("cycles.json")));
        let treasury_repo = Arc::new(TreasuryRepository::new(data_dir.join("treasury.json")));

        let mut rng = Rng::from_entropy();
        let genetic_params = GeneticParams {
            population_size: config.population_size,
            survivor_percent: config.survivor_percent,
            dead_percent: config.dead_percent,
            mutation_rate: config.mutation_rate,
        };
        let genetic_engine = GeneticEngine::new(genetic_params);

        let existing = strategies_repo.find_all().await.unwrap_or_default();
        let population = if existing.is_empty() {
            let seeded = genetic_engine.generate_genesis(config.population_size, &mut rng);
            for genome in &seeded {
                if let Err(e) = strategies_repo.create(genome).await {
                    warn!(error = %e, "failed to persist seeded genome");
                }
            }
            info!(count = seeded.len(), "seeded genesis population");
            seeded
        } else {
            existing
        };

        let active_ids: Vec<Uuid> = population
            .iter()
            .filter(|g| !g.is_dead())
            .map(|g| g.id)
            .collect();

        let treasury = Arc::new(match treasury_repo.load() {
            Some(snapshot) => Treasury::from_snapshot(snapshot),
            None => Treasury::new(config.total_sol, config.reserve_percent, config.max_allocation_per_strategy),
        });
        treasury.allocate_to_strategies(&active_ids);

        let strategies: StrategyRoster = Arc::new(RwLock::new(population));
        let feed: Arc<dyn Feed> = Arc::new(PaperFeed::new(
            config.listings_interval_ms,
            0.02,
            Rng::from_entropy(),
        ));
        let execution: Arc<dyn ExecutionAdapter> = match config.execution_mode {
            ExecutionMode::Real => Arc::new(RealExecutionAdapter::new("https://venue.invalid")),
            ExecutionMode::Paper => Arc::new(PaperExecutionAdapter::new(config.slippage)),
        };
        let events = Arc::new(EventBus::new(256));

        let engine = Arc::new(TradingEngine::new(
            config.clone(),
            Arc::clone(&strategies),
            Arc::clone(&treasury),
            Arc::clone(&feed),
            Arc::clone(&execution),
            Arc::clone(&events),
        ));
        let scheduler = Arc::new(Scheduler::new(config.evolution_cron.clone()));

        Self {
            state_version: AtomicU64::new(1),
            ws_sequence_number: AtomicU64::new(0),
            ws_user_connected: RwLock::new(false),
            last_ws_user_event: RwLock::new(std::time::Instant::now()),

            config: RwLock::new(config),
            status: RwLock::new(EngineStatus::Stopped),

            strategies,
            treasury,
            events,
            engine,
            scheduler,
            genetic_engine: Arc::new(RwLock::new(genetic_engine)),
            rng: Mutex::new(rng),

            strategies_repo,
            trades_repo,
            cycles_repo,
            treasury_repo,

            start_time: std::time::Instant::now(),
        }
    }

    pub fn increment_version(&self) -> u64 {
        self.state_version.fetch_add(1, Ordering::SeqCst)
    }

    pub fn current_state_version(&self) -> u64 {
        self.state_version.load(Ordering::SeqCst)
    }

    /// Start the trading engine. Refuses if the engine has been killed.
    pub fn start(&self) -> bool {
        if *self.status.read() == EngineStatus::Killed {
            warn!("refusing to start: engine has been killed");
            return false;
        }
        self.engine.start();
        *self.status.write() = EngineStatus::Running;
        self.increment_version();
        true
    }

    /// Pause the trading engine without entering the terminal state.
    pub fn stop(&self) {
        self.engine.stop();
        if *self.status.read() != EngineStatus::Killed {
            *self.status.write() = EngineStatus::Stopped;
        }
        self.increment_version();
    }

    /// Stop the engine and enter the terminal `Killed` state. A killed
    /// engine never restarts for the lifetime of this process.
    pub fn kill(&self) {
        self.engine.stop();
        *self.status.write() = EngineStatus::Killed;
        self.events.publish(Event::Error {
            message: "engine killed via control surface".to_string(),
        });
        self.increment_version();
    }

    pub fn status(&self) -> EngineStatus {
        *self.status.read()
    }

    /// Run one evolution cycle: select/breed/mutate the current roster,
    /// persist the result, reallocate the treasury, and swap the engine's
    /// live strategy roster. Returns `false` if a cycle was already running.
    pub async fn trigger_evolution(&self) -> bool {
        let population = self.strategies.read().clone();
        let mut rng = self.rng.lock();
        let result = self
            .scheduler
            .trigger(
                &self.genetic_engine,
                population,
                &mut rng,
                self.strategies_repo.as_ref() as &dyn StrategyStore,
                &self.cycles_repo,
                &self.events,
            )
            .await;

        match result {
            Some(new_population) => {
                let active_ids: Vec<Uuid> = new_population
                    .iter()
                    .filter(|g| !g.is_dead())
                    .map(|g| g.id)
                    .collect();
                self.treasury.allocate_to_strategies(&active_ids);
                self.engine.replace_strategies(new_population);
                let _ = self.treasury_repo.save(&self.treasury.snapshot());
                self.increment_version();
                true
            }
            None => false,
        }
    }

    pub fn recent_evolution_cycles(&self) -> Vec<EvolutionCycle> {
        self.cycles_repo.all()
    }

    pub fn build_snapshot(&self) -> StateSnapshot {
        let open_positions = self.engine.open_positions();
        let positions: Vec<Position> = open_positions.read().values().map(|mp| mp.position.clone()).collect();
        let strategies = self.strategies.read().clone();

        StateSnapshot {
            state_version: self.current_state_version(),
            server_time: Utc::now().timestamp_millis(),
            status: self.status().to_string(),
            generation: self.genetic_engine.read().current_generation(),
            strategy_count: strategies.len(),
            open_position_count: positions.len(),
            treasury: self.treasury.snapshot(),
            positions,
            strategies,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("app-state-test-{}-{}", std::process::id(), name))
    }

    #[tokio::test]
    async fn new_seeds_a_genesis_population_when_store_is_empty() {
        let dir = temp_dir("seed");
        let mut config = EngineConfig::default();
        config.population_size = 6;
        let state = AppState::new(config, &dir).await;
        assert_eq!(state.strategies.read().len(), 6);
        assert_eq!(state.status(), EngineStatus::Stopped);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn start_then_stop_updates_status_and_version() {
        let dir = temp_dir("lifecycle");
        let mut config = EngineConfig::default();
        config.population_size = 4;
        let state = AppState::new(config, &dir).await;
        let before = state.current_state_version();
        assert!(state.start());
        assert_eq!(state.status(), EngineStatus::Running);
        state.stop();
        assert_eq!(state.status(), EngineStatus::Stopped);
        assert!(state.current_state_version() > before);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn kill_is_terminal() {
        let dir = temp_dir("kill");
        let mut config = EngineConfig::default();
        config.population_size = 4;
        let state = AppState::new(config, &dir).await;
        state.kill();
        assert_eq!(state.status(), EngineStatus::Killed);
        assert!(!state.start());
        assert_eq!(state.status(), EngineStatus::Killed);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn build_snapshot_reflects_seeded_population() {
        let dir = temp_dir("snapshot");
        let mut config = EngineConfig::default();
        config.population_size = 5;
        let state = AppState::new(config, &dir).await;
        let snap = state.build_snapshot();
        assert_eq!(snap.strategy_count, 5);
        assert_eq!(snap.open_position_count, 0);
        std::fs::remove_dir_all(&dir).ok();
    }
}
