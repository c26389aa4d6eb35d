// =============================================================================
// Genetic Engine — genesis generation, fitness, selection, crossover,
// mutation, breeding, and the whole-cycle orchestration
// =============================================================================
//
// Pure: no I/O, no suspension. The only failure mode is an empty input
// population, in which case `run_cycle` returns the input untouched.
//
// =============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::catalog::{BUY_PATTERNS, SELL_PATTERNS};
use crate::genome::{archetype_of, envelope, Genes, SellSignals, SocialSignals, StrategyGenome};
use crate::rng::{mutate_by_factor, Rng};

/// Tunable knobs for a `GeneticEngine` instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneticParams {
    pub population_size: usize,
    pub survivor_percent: f64,
    pub dead_percent: f64,
    pub mutation_rate: f64,
}

impl Default for GeneticParams {
    fn default() -> Self {
        Self {
            population_size: 20,
            survivor_percent: 0.2,
            dead_percent: 0.2,
            mutation_rate: 0.15,
        }
    }
}

/// Result of one selection pass: partitioned by outcome, ids only.
#[derive(Debug, Clone, Default)]
pub struct SelectionResult {
    pub survivors: Vec<Uuid>,
    pub mutators: Vec<Uuid>,
    pub dead: Vec<Uuid>,
}

/// Immutable record of one generation transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionCycle {
    pub generation: u32,
    pub timestamp: DateTime<Utc>,
    pub survivors: Vec<Uuid>,
    pub dead: Vec<Uuid>,
    pub newly_born: Vec<Uuid>,
    pub avg_fitness: f64,
    pub best_fitness: f64,
    pub total_pnl_sol: f64,
    pub best_strategy_id: Option<Uuid>,
}

pub struct GeneticEngine {
    params: GeneticParams,
    current_generation: u32,
}

impl GeneticEngine {
    pub fn new(params: GeneticParams) -> Self {
        Self {
            params,
            current_generation: 0,
        }
    }

    pub fn current_generation(&self) -> u32 {
        self.current_generation
    }

    pub fn params(&self) -> &GeneticParams {
        &self.params
    }

    // -------------------------------------------------------------------
    // Genesis
    // -------------------------------------------------------------------

    /// Produce `n` generation-0 genomes with uniformly random genes drawn
    /// from the documented envelopes.
    pub fn generate_genesis(&self, n: usize, rng: &mut Rng) -> Vec<StrategyGenome> {
        (0..n)
            .map(|_| {
                let genes = Self::random_genes(rng);
                StrategyGenome::genesis(rng.uuid(), genes, None)
            })
            .collect()
    }

    fn random_genes(rng: &mut Rng) -> Genes {
        let (mcap_min_lo, _) = envelope::ENTRY_MCAP_MIN;
        let entry_mcap_min = rng.uniform(mcap_min_lo, 200_000.0);
        let entry_mcap_max = rng.uniform(entry_mcap_min * 1.5, envelope::ENTRY_MCAP_MAX.1);

        Genes {
            entry_mcap_min,
            entry_mcap_max,
            entry_volume_min: rng.uniform(envelope::ENTRY_VOLUME_MIN.0, envelope::ENTRY_VOLUME_MIN.1),
            social_signals: SocialSignals {
                twitter_followers_min: rng.uniform(0.0, 10_000.0) as u64,
                telegram_members_min: rng.uniform(0.0, 5_000.0) as u64,
                holders_min: rng.uniform(0.0, 500.0) as u64,
            },
            buy_patterns: Self::random_tag_subset(rng, BUY_PATTERNS, 2, 5),
            whale_wallets: if rng.chance(0.3) {
                Self::random_whale_wallets(rng)
            } else {
                Default::default()
            },
            token_name_keywords: Self::random_keyword_subset(rng),
            take_profit_multiplier: rng.uniform(1.3, 8.0),
            stop_loss_multiplier: rng.uniform(0.2, 0.9),
            time_based_exit: rng.uniform(10.0, 240.0),
            volume_drop_exit: rng.uniform(0.1, 0.7),
            sell_signals: SellSignals {
                momentum_reversal: true,
                volume_dry: true,
                holders_dumping: true,
                mcap_ceiling: if rng.chance(0.4) {
                    rng.uniform(50_000.0, 2_000_000.0)
                } else {
                    0.0
                },
                profit_securing: rng.uniform(0.1, 0.8),
                trailing_stop: rng.uniform(0.05, 0.5),
            },
            sell_patterns: Self::random_tag_subset(rng, SELL_PATTERNS, 1, 4),
            investment_percent: rng.uniform(envelope::INVESTMENT_PERCENT.0, 0.5),
            max_simultaneous_positions: rng.uniform_usize(1, 5) as u32,
            max_drawdown: rng.uniform(0.1, 0.6),
            diversification: rng.uniform(0.0, 1.0),
        }
    }

    fn random_tag_subset(rng: &mut Rng, catalog: &[&str], min: usize, max: usize) -> std::collections::BTreeSet<String> {
        let count = rng.uniform_usize(min, max.min(catalog.len()));
        let mut set = std::collections::BTreeSet::new();
        let mut guard = 0;
        while set.len() < count && guard < catalog.len() * 4 {
            if let Some(tag) = rng.choose(catalog) {
                set.insert(tag.to_string());
            }
            guard += 1;
        }
        set
    }

    fn random_keyword_subset(rng: &mut Rng) -> std::collections::BTreeSet<String> {
        const KEYWORDS: &[&str] = &["moon", "based", "ai", "dog", "cat", "meme", "inu", "pepe"];
        Self::random_tag_subset(rng, KEYWORDS, 0, 3)
    }

    fn random_whale_wallets(rng: &mut Rng) -> std::collections::BTreeSet<String> {
        let count = rng.uniform_usize(1, 3);
        (0..count)
            .map(|_| format!("whale_{}", rng.uuid().simple()))
            .collect()
    }

    // -------------------------------------------------------------------
    // Fitness & selection
    // -------------------------------------------------------------------

    /// Weighted fitness blend stored on the genome's performance record.
    pub fn fitness(perf: &crate::genome::Performance) -> f64 {
        perf.fitness()
    }

    /// Partition a population into survivors / mutators / dead. Already-
    /// dead entries are ignored entirely. Sort is stable; ties are broken
    /// by original order.
    pub fn select(pop: &[StrategyGenome], survivor_percent: f64, dead_percent: f64) -> SelectionResult {
        let mut live: Vec<&StrategyGenome> = pop.iter().filter(|g| !g.is_dead()).collect();
        live.sort_by(|a, b| {
            b.performance
                .fitness_score
                .partial_cmp(&a.performance.fitness_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let n = live.len();
        let survivor_n = (n as f64 * survivor_percent).floor() as usize;
        let dead_n = (n as f64 * dead_percent).floor() as usize;
        let dead_n = dead_n.min(n.saturating_sub(survivor_n));

        let survivors = live[..survivor_n.min(n)].iter().map(|g| g.id).collect();
        let dead_start = n.saturating_sub(dead_n);
        let dead = live[dead_start..n].iter().map(|g| g.id).collect();
        let mutators = live[survivor_n.min(n)..dead_start.max(survivor_n.min(n))]
            .iter()
            .map(|g| g.id)
            .collect();

        SelectionResult {
            survivors,
            mutators,
            dead,
        }
    }

    // -------------------------------------------------------------------
    // Crossover & mutation
    // -------------------------------------------------------------------

    /// Fieldwise coin-flip crossover, except `whale_wallets` which is the
    /// union of both parents' sets.
    pub fn crossover(a: &Genes, b: &Genes, rng: &mut Rng) -> Genes {
        let pick = |rng: &mut Rng| rng.chance(0.5);
        Genes {
            entry_mcap_min: if pick(rng) { a.entry_mcap_min } else { b.entry_mcap_min },
            entry_mcap_max: if pick(rng) { a.entry_mcap_max } else { b.entry_mcap_max },
            entry_volume_min: if pick(rng) { a.entry_volume_min } else { b.entry_volume_min },
            social_signals: if pick(rng) {
                a.social_signals.clone()
            } else {
                b.social_signals.clone()
            },
            buy_patterns: if pick(rng) { a.buy_patterns.clone() } else { b.buy_patterns.clone() },
            whale_wallets: a.whale_wallets.union(&b.whale_wallets).cloned().collect(),
            token_name_keywords: if pick(rng) {
                a.token_name_keywords.clone()
            } else {
                b.token_name_keywords.clone()
            },
            take_profit_multiplier: if pick(rng) {
                a.take_profit_multiplier
            } else {
                b.take_profit_multiplier
            },
            stop_loss_multiplier: if pick(rng) {
                a.stop_loss_multiplier
            } else {
                b.stop_loss_multiplier
            },
            time_based_exit: if pick(rng) { a.time_based_exit } else { b.time_based_exit },
            volume_drop_exit: if pick(rng) { a.volume_drop_exit } else { b.volume_drop_exit },
            sell_signals: if pick(rng) {
                a.sell_signals.clone()
            } else {
                b.sell_signals.clone()
            },
            sell_patterns: if pick(rng) { a.sell_patterns.clone() } else { b.sell_patterns.clone() },
            investment_percent: if pick(rng) { a.investment_percent } else { b.investment_percent },
            max_simultaneous_positions: if pick(rng) {
                a.max_simultaneous_positions
            } else {
                b.max_simultaneous_positions
            },
            max_drawdown: if pick(rng) { a.max_drawdown } else { b.max_drawdown },
            diversification: if pick(rng) { a.diversification } else { b.diversification },
        }
    }

    /// Mutate a gene bundle in place at `rate`.
    pub fn mutate(genes: &mut Genes, rate: f64, rng: &mut Rng) {
        if rng.chance(rate) {
            genes.entry_mcap_min =
                mutate_by_factor(rng, genes.entry_mcap_min, 0.2, envelope::ENTRY_MCAP_MIN.0, envelope::ENTRY_MCAP_MIN.1);
        }
        if rng.chance(rate) {
            genes.entry_mcap_max =
                mutate_by_factor(rng, genes.entry_mcap_max, 0.2, envelope::ENTRY_MCAP_MAX.0, envelope::ENTRY_MCAP_MAX.1);
        }
        if genes.entry_mcap_min > genes.entry_mcap_max {
            std::mem::swap(&mut genes.entry_mcap_min, &mut genes.entry_mcap_max);
        }
        if rng.chance(rate) {
            genes.entry_volume_min = mutate_by_factor(
                rng,
                genes.entry_volume_min,
                0.2,
                envelope::ENTRY_VOLUME_MIN.0,
                envelope::ENTRY_VOLUME_MIN.1,
            );
        }
        if rng.chance(rate) {
            genes.take_profit_multiplier = mutate_by_factor(
                rng,
                genes.take_profit_multiplier,
                0.2,
                envelope::TAKE_PROFIT_MULTIPLIER.0,
                envelope::TAKE_PROFIT_MULTIPLIER.1,
            );
        }
        if rng.chance(rate) {
            genes.stop_loss_multiplier = mutate_by_factor(
                rng,
                genes.stop_loss_multiplier,
                0.2,
                envelope::STOP_LOSS_MULTIPLIER.0,
                envelope::STOP_LOSS_MULTIPLIER.1,
            );
        }
        if rng.chance(rate) {
            genes.time_based_exit =
                mutate_by_factor(rng, genes.time_based_exit, 0.2, envelope::TIME_BASED_EXIT.0, envelope::TIME_BASED_EXIT.1);
        }
        if rng.chance(rate) {
            genes.volume_drop_exit = mutate_by_factor(
                rng,
                genes.volume_drop_exit,
                0.2,
                envelope::VOLUME_DROP_EXIT.0,
                envelope::VOLUME_DROP_EXIT.1,
            );
        }
        if rng.chance(rate) {
            genes.sell_signals.mcap_ceiling = mutate_by_factor(
                rng,
                genes.sell_signals.mcap_ceiling.max(1.0),
                0.2,
                envelope::MCAP_CEILING.0,
                envelope::MCAP_CEILING.1,
            );
        }
        if rng.chance(rate) {
            genes.sell_signals.profit_securing = mutate_by_factor(
                rng,
                genes.sell_signals.profit_securing,
                0.2,
                envelope::PROFIT_SECURING.0,
                envelope::PROFIT_SECURING.1,
            );
        }
        if rng.chance(rate) {
            genes.sell_signals.trailing_stop = mutate_by_factor(
                rng,
                genes.sell_signals.trailing_stop,
                0.2,
                envelope::TRAILING_STOP.0,
                envelope::TRAILING_STOP.1,
            );
        }
        if rng.chance(rate) {
            genes.investment_percent = mutate_by_factor(
                rng,
                genes.investment_percent,
                0.2,
                envelope::INVESTMENT_PERCENT.0,
                envelope::INVESTMENT_PERCENT.1,
            );
        }
        if rng.chance(rate) {
            genes.max_drawdown =
                mutate_by_factor(rng, genes.max_drawdown, 0.2, envelope::MAX_DRAWDOWN.0, envelope::MAX_DRAWDOWN.1);
        }
        if rng.chance(rate) {
            genes.diversification = mutate_by_factor(
                rng,
                genes.diversification,
                0.2,
                envelope::DIVERSIFICATION.0,
                envelope::DIVERSIFICATION.1,
            );
        }

        Self::mutate_tag_set(&mut genes.buy_patterns, BUY_PATTERNS, rate, rng);
        Self::mutate_tag_set(&mut genes.sell_patterns, SELL_PATTERNS, rate, rng);
        Self::mutate_keyword_set(&mut genes.token_name_keywords, rate, rng);
        // sell_signals booleans remain true by invariant; nothing to do.
    }

    fn mutate_tag_set(set: &mut std::collections::BTreeSet<String>, catalog: &[&str], rate: f64, rng: &mut Rng) {
        if !rng.chance(rate) {
            return;
        }
        let under_cap = set.len() < catalog.len();
        if under_cap && rng.chance(0.5) {
            let candidates: Vec<&str> = catalog.iter().copied().filter(|t| !set.contains(*t)).collect();
            if let Some(tag) = rng.choose(&candidates) {
                set.insert(tag.to_string());
            }
        } else if set.len() >= 2 {
            let items: Vec<String> = set.iter().cloned().collect();
            if let Some(victim) = rng.choose(&items) {
                set.remove(victim);
            }
        }
    }

    fn mutate_keyword_set(set: &mut std::collections::BTreeSet<String>, rate: f64, rng: &mut Rng) {
        const KEYWORDS: &[&str] = &["moon", "based", "ai", "dog", "cat", "meme", "inu", "pepe"];
        Self::mutate_tag_set(set, KEYWORDS, rate, rng);
    }

    /// Mutate a whole genome in place: mutate its genes then re-derive the
    /// archetype.
    pub fn mutate_genome(genome: &mut StrategyGenome, rate: f64, rng: &mut Rng) {
        Self::mutate(&mut genome.genes, rate, rng);
        genome.archetype = archetype_of(&genome.genes);
    }

    /// Crossover then mutate at half the configured rate.
    pub fn breed(a: &StrategyGenome, b: &StrategyGenome, generation: u32, rate: f64, rng: &mut Rng) -> StrategyGenome {
        let mut genes = Self::crossover(&a.genes, &b.genes, rng);
        Self::mutate(&mut genes, rate / 2.0, rng);
        StrategyGenome::bred(rng.uuid(), generation, [a.id, b.id], genes, None)
    }

    // -------------------------------------------------------------------
    // Whole-cycle orchestration
    // -------------------------------------------------------------------

    pub fn run_cycle(&mut self, mut pop: Vec<StrategyGenome>, rng: &mut Rng) -> (Vec<StrategyGenome>, EvolutionCycle) {
        if pop.is_empty() {
            info!("run_cycle called with an empty population; no-op");
            return (
                pop,
                EvolutionCycle {
                    generation: self.current_generation,
                    timestamp: Utc::now(),
                    survivors: Vec::new(),
                    dead: Vec::new(),
                    newly_born: Vec::new(),
                    avg_fitness: 0.0,
                    best_fitness: 0.0,
                    total_pnl_sol: 0.0,
                    best_strategy_id: None,
                },
            );
        }

        for genome in pop.iter_mut().filter(|g| !g.is_dead()) {
            genome.performance.fitness_score = genome.performance.fitness();
        }

        let by_id: std::collections::HashMap<Uuid, StrategyGenome> =
            pop.iter().cloned().map(|g| (g.id, g)).collect();

        let selection = Self::select(&pop, self.params.survivor_percent, self.params.dead_percent);

        for id in &selection.dead {
            if let Some(g) = pop.iter_mut().find(|g| g.id == *id) {
                g.mark_dead();
            }
        }

        let mut survivor_genomes: Vec<StrategyGenome> = selection
            .survivors
            .iter()
            .filter_map(|id| by_id.get(id).cloned())
            .collect();
        rng.shuffle(&mut survivor_genomes);

        let mut offspring = Vec::new();
        let mut pairs = survivor_genomes.chunks_exact(2);
        for pair in &mut pairs {
            let child = Self::breed(&pair[0], &pair[1], self.current_generation + 1, self.params.mutation_rate, rng);
            offspring.push(child);
        }
        // odd one out (pairs.remainder()) simply survives, already in survivor_genomes.

        let mutated_mutators: Vec<StrategyGenome> = selection
            .mutators
            .iter()
            .filter_map(|id| by_id.get(id).cloned())
            .map(|mut g| {
                Self::mutate_genome(&mut g, self.params.mutation_rate, rng);
                g
            })
            .collect();

        let mut new_pop = Vec::with_capacity(self.params.population_size);
        new_pop.extend(survivor_genomes.iter().cloned());
        new_pop.extend(offspring.iter().cloned());
        new_pop.extend(mutated_mutators);

        // Force-refill from survivors only; if fewer than two remain, stop
        // rather than inventing additional breeding stock.
        while new_pop.len() < self.params.population_size && survivor_genomes.len() >= 2 {
            let a = rng.choose(&survivor_genomes).cloned();
            let b = rng.choose(&survivor_genomes).cloned();
            match (a, b) {
                (Some(a), Some(b)) if a.id != b.id => {
                    let child = Self::breed(&a, &b, self.current_generation + 1, self.params.mutation_rate, rng);
                    offspring.push(child.clone());
                    new_pop.push(child);
                }
                _ => continue,
            }
        }

        self.current_generation += 1;

        let fitness_values: Vec<f64> = pop
            .iter()
            .filter(|g| !g.is_dead() || selection.dead.contains(&g.id))
            .map(|g| g.performance.fitness_score)
            .collect();
        let avg_fitness = if fitness_values.is_empty() {
            0.0
        } else {
            fitness_values.iter().sum::<f64>() / fitness_values.len() as f64
        };
        let best = pop
            .iter()
            .max_by(|a, b| {
                a.performance
                    .fitness_score
                    .partial_cmp(&b.performance.fitness_score)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        let best_fitness = best.map(|g| g.performance.fitness_score).unwrap_or(0.0);
        let best_strategy_id = best.map(|g| g.id);
        let total_pnl_sol: f64 = pop.iter().map(|g| g.performance.total_pnl).sum();

        let cycle = EvolutionCycle {
            generation: self.current_generation,
            timestamp: Utc::now(),
            survivors: selection.survivors.clone(),
            dead: selection.dead.clone(),
            newly_born: offspring.iter().map(|g| g.id).collect(),
            avg_fitness,
            best_fitness,
            total_pnl_sol,
            best_strategy_id,
        };

        info!(
            generation = cycle.generation,
            survivors = cycle.survivors.len(),
            dead = cycle.dead.len(),
            born = cycle.newly_born.len(),
            best_fitness = cycle.best_fitness,
            "evolution cycle completed"
        );

        (new_pop, cycle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genome::Performance;

    fn population_with_fitness(steps: &[f64]) -> Vec<StrategyGenome> {
        let mut rng = Rng::from_seed(1);
        steps
            .iter()
            .map(|&f| {
                let mut g = StrategyGenome::genesis(rng.uuid(), GeneticEngine::random_genes(&mut rng), None);
                g.performance.fitness_score = f;
                g
            })
            .collect()
    }

    #[test]
    fn generate_genesis_produces_requested_count_at_generation_zero() {
        let engine = GeneticEngine::new(GeneticParams::default());
        let mut rng = Rng::from_seed(5);
        let pop = engine.generate_genesis(10, &mut rng);
        assert_eq!(pop.len(), 10);
        assert!(pop.iter().all(|g| g.generation == 0 && g.parent_ids.is_empty()));
        assert!(pop.iter().all(|g| g.genes.entry_mcap_min <= g.genes.entry_mcap_max));
    }

    #[test]
    fn select_partitions_by_descending_fitness() {
        let fitnesses: Vec<f64> = (0..20).map(|i| 100.0 - i as f64 * 5.0).collect();
        let pop = population_with_fitness(&fitnesses);
        let sel = GeneticEngine::select(&pop, 0.2, 0.2);
        assert_eq!(sel.survivors.len(), 4);
        assert_eq!(sel.dead.len(), 4);
        assert_eq!(sel.mutators.len(), 12);

        let by_id: std::collections::HashMap<Uuid, &StrategyGenome> = pop.iter().map(|g| (g.id, g)).collect();
        let survivor_fitnesses: Vec<f64> = sel.survivors.iter().map(|id| by_id[id].performance.fitness_score).collect();
        assert!(survivor_fitnesses.iter().all(|&f| f >= 85.0));
        let dead_fitnesses: Vec<f64> = sel.dead.iter().map(|id| by_id[id].performance.fitness_score).collect();
        assert!(dead_fitnesses.iter().all(|&f| f <= 25.0));
    }

    #[test]
    fn dead_strategies_are_never_reselected() {
        let fitnesses: Vec<f64> = (0..10).map(|i| 100.0 - i as f64 * 5.0).collect();
        let mut pop = population_with_fitness(&fitnesses);
        pop[0].mark_dead();
        let sel = GeneticEngine::select(&pop, 0.5, 0.1);
        assert!(!sel.survivors.contains(&pop[0].id));
        assert!(!sel.mutators.contains(&pop[0].id));
        assert!(!sel.dead.contains(&pop[0].id));
    }

    #[test]
    fn crossover_with_self_is_identity_modulo_whale_wallets() {
        let mut rng = Rng::from_seed(2);
        let mut genes = GeneticEngine::random_genes(&mut rng);
        genes.whale_wallets.insert("w1".into());
        let result = GeneticEngine::crossover(&genes, &genes, &mut rng);
        assert_eq!(result.entry_mcap_min, genes.entry_mcap_min);
        assert_eq!(result.whale_wallets, genes.whale_wallets);
    }

    #[test]
    fn mutate_with_zero_rate_is_identity() {
        let mut rng = Rng::from_seed(3);
        let genes = GeneticEngine::random_genes(&mut rng);
        let mut mutated = genes.clone();
        GeneticEngine::mutate(&mut mutated, 0.0, &mut rng);
        assert_eq!(mutated, genes);
    }

    #[test]
    fn breed_produces_two_parent_ids_and_next_generation() {
        let mut rng = Rng::from_seed(4);
        let a = StrategyGenome::genesis(rng.uuid(), GeneticEngine::random_genes(&mut rng), None);
        let b = StrategyGenome::genesis(rng.uuid(), GeneticEngine::random_genes(&mut rng), None);
        let child = GeneticEngine::breed(&a, &b, 1, 0.15, &mut rng);
        assert_eq!(child.parent_ids.len(), 2);
        assert!(child.parent_ids.contains(&a.id));
        assert!(child.parent_ids.contains(&b.id));
        assert_eq!(child.generation, 1);
    }

    #[test]
    fn run_cycle_on_empty_population_is_a_logged_no_op() {
        let mut engine = GeneticEngine::new(GeneticParams::default());
        let mut rng = Rng::from_seed(6);
        let (new_pop, cycle) = engine.run_cycle(Vec::new(), &mut rng);
        assert!(new_pop.is_empty());
        assert_eq!(cycle.survivors.len(), 0);
        assert_eq!(engine.current_generation(), 0);
    }

    #[test]
    fn run_cycle_grows_back_to_at_least_population_size() {
        let params = GeneticParams {
            population_size: 20,
            survivor_percent: 0.2,
            dead_percent: 0.2,
            mutation_rate: 0.15,
        };
        let mut engine = GeneticEngine::new(params);
        let mut rng = Rng::from_seed(7);
        let fitnesses: Vec<f64> = (0..20).map(|i| 100.0 - i as f64 * 5.0).collect();
        let pop = population_with_fitness(&fitnesses);
        let (new_pop, cycle) = engine.run_cycle(pop, &mut rng);
        assert!(new_pop.len() >= 20);
        assert_eq!(cycle.generation, 1);
        assert!(cycle.newly_born.iter().all(|id| {
            new_pop.iter().find(|g| g.id == *id).map(|g| g.parent_ids.len() == 2).unwrap_or(false)
        }));
    }

    #[test]
    fn fitness_is_bounded() {
        let mut perf = Performance::default();
        perf.total_pnl = 5.0;
        perf.win_rate = 0.6;
        perf.sharpe_ratio = 1.0;
        perf.max_drawdown = 0.1;
        let f = GeneticEngine::fitness(&perf);
        assert!((0.0..=100.0).contains(&f));
    }
}
