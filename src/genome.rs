// =============================================================================
// Strategy genome — the unit of selection for the Genetic Engine
// =============================================================================

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Social-signal thresholds a token must clear for the social block of
/// `shouldBuy` to pass.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SocialSignals {
    pub twitter_followers_min: u64,
    pub telegram_members_min: u64,
    pub holders_min: u64,
}

/// Strategic (non-mechanical) sell thresholds. The three booleans are
/// always `true` by invariant — only the numeric thresholds mutate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SellSignals {
    pub momentum_reversal: bool,
    pub volume_dry: bool,
    pub holders_dumping: bool,
    pub mcap_ceiling: f64,
    pub profit_securing: f64,
    pub trailing_stop: f64,
}

impl Default for SellSignals {
    fn default() -> Self {
        Self {
            momentum_reversal: true,
            volume_dry: true,
            holders_dumping: true,
            mcap_ceiling: 0.0,
            profit_securing: 0.3,
            trailing_stop: 0.2,
        }
    }
}

/// The immutable (except during mutation) gene bundle a strategy carries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Genes {
    // --- entry side ---------------------------------------------------
    pub entry_mcap_min: f64,
    pub entry_mcap_max: f64,
    pub entry_volume_min: f64,
    pub social_signals: SocialSignals,
    pub buy_patterns: BTreeSet<String>,
    pub whale_wallets: BTreeSet<String>,
    pub token_name_keywords: BTreeSet<String>,

    // --- mechanical exit side ------------------------------------------
    pub take_profit_multiplier: f64,
    pub stop_loss_multiplier: f64,
    pub time_based_exit: f64,
    pub volume_drop_exit: f64,

    // --- strategic exit side --------------------------------------------
    pub sell_signals: SellSignals,
    pub sell_patterns: BTreeSet<String>,

    // --- sizing -----------------------------------------------------------
    pub investment_percent: f64,
    pub max_simultaneous_positions: u32,
    pub max_drawdown: f64,
    pub diversification: f64,
}

/// Documented mutation envelopes (min, max) for every mutable scalar gene.
pub mod envelope {
    pub const ENTRY_MCAP_MIN: (f64, f64) = (1_000.0, 500_000.0);
    pub const ENTRY_MCAP_MAX: (f64, f64) = (10_000.0, 5_000_000.0);
    pub const ENTRY_VOLUME_MIN: (f64, f64) = (100.0, 100_000.0);
    pub const TAKE_PROFIT_MULTIPLIER: (f64, f64) = (1.2, 10.0);
    pub const STOP_LOSS_MULTIPLIER: (f64, f64) = (0.1, 0.95);
    pub const TIME_BASED_EXIT: (f64, f64) = (5.0, 1440.0);
    pub const VOLUME_DROP_EXIT: (f64, f64) = (0.05, 0.95);
    pub const MCAP_CEILING: (f64, f64) = (0.0, 10_000_000.0);
    pub const PROFIT_SECURING: (f64, f64) = (0.0, 1.0);
    pub const TRAILING_STOP: (f64, f64) = (0.02, 0.9);
    pub const INVESTMENT_PERCENT: (f64, f64) = (0.01, 1.0);
    pub const MAX_DRAWDOWN: (f64, f64) = (0.0, 1.0);
    pub const DIVERSIFICATION: (f64, f64) = (0.0, 1.0);
}

/// Deterministic archetype classification derived from a gene bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Archetype {
    Aggressive,
    Conservative,
    Social,
    WhaleFollower,
    Sniper,
    Momentum,
}

impl std::fmt::Display for Archetype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Aggressive => "aggressive",
            Self::Conservative => "conservative",
            Self::Social => "social",
            Self::WhaleFollower => "whale_follower",
            Self::Sniper => "sniper",
            Self::Momentum => "momentum",
        };
        write!(f, "{s}")
    }
}

/// Classify a gene bundle into an archetype. First matching rule wins.
pub fn archetype_of(genes: &Genes) -> Archetype {
    if genes.take_profit_multiplier > 5.0 && genes.stop_loss_multiplier < 0.5 {
        return Archetype::Aggressive;
    }
    if genes.stop_loss_multiplier > 0.7 && genes.take_profit_multiplier < 3.0 {
        return Archetype::Conservative;
    }
    if genes.social_signals.twitter_followers_min > 5000
        || genes.social_signals.telegram_members_min > 2000
    {
        return Archetype::Social;
    }
    if !genes.whale_wallets.is_empty() {
        return Archetype::WhaleFollower;
    }
    if genes.entry_mcap_max < 100_000.0 && genes.time_based_exit < 30.0 {
        return Archetype::Sniper;
    }
    Archetype::Momentum
}

/// Lifecycle status of a strategy genome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenomeStatus {
    Active,
    NeedsFunding,
    Breeding,
    Dead,
}

/// Accumulated trading performance for a genome, and the single
/// fitness score derived from it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Performance {
    pub trades_executed: u32,
    pub win_rate: f64,
    pub total_pnl: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
    pub avg_hold_time: f64,
    pub fitness_score: f64,
}

impl Default for Performance {
    fn default() -> Self {
        Self {
            trades_executed: 0,
            win_rate: 0.0,
            total_pnl: 0.0,
            sharpe_ratio: 0.0,
            max_drawdown: 0.0,
            avg_hold_time: 0.0,
            fitness_score: 50.0,
        }
    }
}

impl Performance {
    /// Weighted blend of the four fitness sub-scores, clamped to `[0,100]`.
    pub fn fitness(&self) -> f64 {
        let pnl_score = crate::rng::clamp(50.0 + self.total_pnl * 10.0, 0.0, 100.0);
        let win_rate_score = self.win_rate * 100.0;
        let sharpe_score = crate::rng::clamp(50.0 + self.sharpe_ratio * 20.0, 0.0, 100.0);
        let consistency_score = (100.0 - self.max_drawdown * 200.0).max(0.0);
        crate::rng::clamp(
            0.4 * pnl_score + 0.25 * win_rate_score + 0.2 * sharpe_score + 0.15 * consistency_score,
            0.0,
            100.0,
        )
    }

    /// Fold a closed trade's result into the running performance record and
    /// recompute `fitness_score`. The Sharpe ratio uses the documented
    /// approximation `sigma ~= |avg_pnl| * 0.5 + 0.01` rather than a true
    /// standard deviation.
    pub fn record_trade_result(&mut self, pnl_sol: f64, pnl_percent: f64, hold_minutes: f64) {
        let prior_n = self.trades_executed as f64;
        let new_n = prior_n + 1.0;

        let won = if pnl_sol > 0.0 { 1.0 } else { 0.0 };
        self.win_rate = (self.win_rate * prior_n + won) / new_n;
        self.avg_hold_time = (self.avg_hold_time * prior_n + hold_minutes) / new_n;
        self.total_pnl += pnl_sol;
        self.trades_executed += 1;

        if pnl_percent < 0.0 {
            self.max_drawdown = self.max_drawdown.max(-pnl_percent);
        }

        let avg_pnl = self.total_pnl / new_n;
        let sigma = avg_pnl.abs() * 0.5 + 0.01;
        self.sharpe_ratio = avg_pnl / sigma;

        self.fitness_score = self.fitness();
    }
}

/// A single competing trading strategy: genes plus its performance record
/// and lifecycle bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyGenome {
    pub id: Uuid,
    pub generation: u32,
    pub parent_ids: Vec<Uuid>,
    pub genes: Genes,
    pub performance: Performance,
    pub status: GenomeStatus,
    pub birth_timestamp: DateTime<Utc>,
    pub death_timestamp: Option<DateTime<Utc>>,
    pub display_name: Option<String>,
    pub archetype: Archetype,
}

impl StrategyGenome {
    /// Construct a genesis (generation 0, parentless) genome from a
    /// generated gene bundle.
    pub fn genesis(id: Uuid, genes: Genes, display_name: Option<String>) -> Self {
        let archetype = archetype_of(&genes);
        Self {
            id,
            generation: 0,
            parent_ids: Vec::new(),
            genes,
            performance: Performance::default(),
            status: GenomeStatus::Active,
            birth_timestamp: Utc::now(),
            death_timestamp: None,
            display_name,
            archetype,
        }
    }

    /// Construct a bred genome from two parents and a crossed/mutated gene
    /// bundle, at `generation`.
    pub fn bred(
        id: Uuid,
        generation: u32,
        parent_ids: [Uuid; 2],
        genes: Genes,
        display_name: Option<String>,
    ) -> Self {
        let archetype = archetype_of(&genes);
        Self {
            id,
            generation,
            parent_ids: parent_ids.to_vec(),
            genes,
            performance: Performance::default(),
            status: GenomeStatus::Active,
            birth_timestamp: Utc::now(),
            death_timestamp: None,
            display_name,
            archetype,
        }
    }

    /// Mark this genome dead. Idempotent: a genome already dead is left
    /// untouched (its `death_timestamp` never moves).
    pub fn mark_dead(&mut self) {
        if self.status == GenomeStatus::Dead {
            return;
        }
        self.status = GenomeStatus::Dead;
        self.death_timestamp = Some(Utc::now());
    }

    pub fn is_dead(&self) -> bool {
        self.status == GenomeStatus::Dead
    }
}
