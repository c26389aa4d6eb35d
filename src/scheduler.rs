// =============================================================================
// Scheduler — clock-driven evolution trigger
// =============================================================================
//
// Fires an evolution cycle on a schedule (or via a manual one-shot trigger)
// guarded by an `is_running` flag so back-to-back triggers coalesce rather
// than running a cycle concurrently with itself.
//
// =============================================================================

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{info, warn};

use crate::events::{Event, EventBus};
use crate::genetic::GeneticEngine;
use crate::genome::StrategyGenome;
use crate::persistence::CycleRepository;
use crate::rng::Rng;

/// Guards against overlapping evolution cycles and exposes a manual
/// trigger alongside the timer-driven one.
pub struct Scheduler {
    is_running: AtomicBool,
    cron: String,
}

impl Scheduler {
    pub fn new(cron: impl Into<String>) -> Self {
        Self {
            is_running: AtomicBool::new(false),
            cron: cron.into(),
        }
    }

    pub fn cron(&self) -> &str {
        &self.cron
    }

    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::SeqCst)
    }

    /// Run one evolution cycle against `population`, persisting births and
    /// deaths and emitting the lifecycle events. Returns `None` without
    /// doing anything if a cycle is already in progress.
    pub async fn trigger(
        &self,
        engine: &Arc<RwLock<GeneticEngine>>,
        population: Vec<StrategyGenome>,
        rng: &mut Rng,
        strategies: &dyn StrategyStore,
        cycles: &CycleRepository,
        events: &EventBus,
    ) -> Option<Vec<StrategyGenome>> {
        if self
            .is_running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("evolution cycle requested while one is already in progress; ignoring");
            return None;
        }

        events.publish(Event::EvolutionStarted);
        info!(population = population.len(), "evolution cycle starting");

        let (new_population, cycle) = engine.write().run_cycle(population, rng);

        let births: Vec<uuid::Uuid> = new_population
            .iter()
            .filter(|g| g.generation == cycle.generation)
            .map(|g| g.id)
            .collect();

        let mut persist_failed = false;
        for genome in &new_population {
            if strategies.save(genome).await.is_err() {
                persist_failed = true;
            }
        }
        if let Err(e) = cycles.append(cycle.clone()) {
            warn!(error = %e, "failed to persist evolution cycle");
            persist_failed = true;
        }

        if persist_failed {
            events.publish(Event::EvolutionError {
                message: "one or more entities failed to persist after the cycle".to_string(),
            });
        }

        events.publish(Event::EvolutionBirths { ids: births });
        events.publish(Event::EvolutionDeaths {
            ids: cycle.dead.clone(),
        });
        events.publish(Event::EvolutionCompleted { cycle });

        self.is_running.store(false, Ordering::SeqCst);
        Some(new_population)
    }
}

/// Narrow persistence seam the scheduler needs: save a genome after a
/// cycle. Kept separate from `Repository<StrategyGenome>` so tests can
/// provide a trivial in-memory stub.
#[async_trait::async_trait]
pub trait StrategyStore: Send + Sync {
    async fn save(&self, genome: &StrategyGenome) -> anyhow::Result<()>;
}

#[async_trait::async_trait]
impl StrategyStore for crate::persistence::FileRepository<StrategyGenome> {
    async fn save(&self, genome: &StrategyGenome) -> anyhow::Result<()> {
        crate::persistence::Repository::update(self, genome).await
    }
}
