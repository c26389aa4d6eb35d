// =============================================================================
// Trading Engine — coordinator: lifecycle, new-token handling, concurrency caps
// =============================================================================
//
// Lifecycle is `stopped -> running -> stopped`. On start: subscribe to the
// feed's new-token stream, launch a periodic full-scan, start the position
// monitor, emit `engine:started`. On a new-token event: evaluate every
// active strategy's buy rule, rank the signals, lock funds and execute the
// winner if caps allow. On a monitor-triggered close (handled inside
// `monitor.rs`, which this module wires up): the position's removal and
// the `trade:closed` event are already the monitor's responsibility.
//
// Grounded on this repo's `main.rs` task-spawning shape and `AppState`'s
// shared-state pattern, generalized from per-symbol market data tasks to
// feed/monitor/full-scan tasks.
//
// =============================================================================

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::evaluator::{self, BuySignal};
use crate::events::{Event, EventBus};
use crate::execution::ExecutionAdapter;
use crate::feed::Feed;
use crate::genome::StrategyGenome;
use crate::monitor::{self, MonitoredPosition, OpenPositions, PreviousSnapshots};
use crate::token::TokenSnapshot;
use crate::trade::Position;
use crate::treasury::Treasury;

/// Shared, mutable roster of strategies the engine evaluates new tokens
/// against. Evolution cycles replace its contents wholesale.
pub type StrategyRoster = Arc<RwLock<Vec<StrategyGenome>>>;

pub struct TradingEngine {
    config: EngineConfig,
    strategies: StrategyRoster,
    open_positions: OpenPositions,
    previous_snapshots: PreviousSnapshots,
    treasury: Arc<Treasury>,
    feed: Arc<dyn Feed>,
    execution: Arc<dyn ExecutionAdapter>,
    events: Arc<EventBus>,
    running: AtomicBool,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl TradingEngine {
    pub fn new(
        config: EngineConfig,
        strategies: StrategyRoster,
        treasury: Arc<Treasury>,
        feed: Arc<dyn Feed>,
        execution: Arc<dyn ExecutionAdapter>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            config,
            strategies,
            open_positions: monitor::new_open_positions(),
            previous_snapshots: monitor::new_previous_snapshots(),
            treasury,
            feed,
            execution,
            events,
            running: AtomicBool::new(false),
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn open_positions(&self) -> OpenPositions {
        Arc::clone(&self.open_positions)
    }

    /// Start the feed ingester, periodic full-scan, and position monitor
    /// as background tasks. No-op if already running.
    pub fn start(self: &Arc<Self>) {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("trading engine start requested while already running");
            return;
        }

        let mut handles = Vec::new();

        let ingester_engine = Arc::clone(self);
        handles.push(tokio::spawn(async move {
            let mut rx = ingester_engine.feed.subscribe_new_tokens().await;
            while let Some(token) = rx.recv().await {
                ingester_engine.events.publish(Event::TokenDiscovered { token: token.clone() });
                ingester_engine.handle_new_token(token).await;
            }
        }));

        let scan_engine = Arc::clone(self);
        handles.push(tokio::spawn(async move {
            let mut ticker =
                tokio::time::interval(tokio::time::Duration::from_secs(scan_engine.config.full_scan_interval_secs));
            loop {
                ticker.tick().await;
                let recent = scan_engine.feed.recent(20).await;
                for token in recent {
                    scan_engine.handle_new_token(token).await;
                }
            }
        }));

        let monitor_engine = Arc::clone(self);
        handles.push(tokio::spawn(async move {
            monitor::run_position_monitor(
                monitor_engine.config.monitor_interval_secs,
                Arc::clone(&monitor_engine.open_positions),
                Arc::clone(&monitor_engine.previous_snapshots),
                Arc::clone(&monitor_engine.feed),
                Arc::clone(&monitor_engine.execution),
                Arc::clone(&monitor_engine.treasury),
                Arc::clone(&monitor_engine.events),
            )
            .await;
        }));

        *self.tasks.lock() = handles;
        self.events.publish(Event::EngineStarted);
        info!("trading engine started");
    }

    /// Cancel all background tasks at their next suspension point. Any
    /// partially issued buy whose funds were locked but whose Trade never
    /// materialized has already been unlocked on the failure path inside
    /// `handle_new_token`, so cancellation never leaves a dangling lock.
    pub fn stop(&self) {
        if self
            .running
            .compare_exchange(true, false, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }
        for handle in self.tasks.lock().drain(..) {
            handle.abort();
        }
        self.events.publish(Event::EngineStopped);
        info!("trading engine stopped");
    }

    fn open_position_count_for(&self, strategy_id: Uuid) -> usize {
        self.open_positions
            .read()
            .values()
            .filter(|mp| mp.position.strategy_id == strategy_id)
            .count()
    }

    /// On a new-token event: drop if globally at cap, otherwise rank every
    /// eligible strategy's buy signal and trade the best one.
    async fn handle_new_token(&self, token: TokenSnapshot) {
        if self.open_positions.read().len() >= self.config.max_concurrent_trades {
            debug!(address = %token.address, "new-token event dropped: at global concurrency cap");
            return;
        }

        let strategies = self.strategies.read().clone();
        let mut best: Option<(Uuid, BuySignal)> = None;

        for strategy in &strategies {
            if matches!(strategy.status, crate::genome::GenomeStatus::Dead) {
                continue;
            }
            if self.open_position_count_for(strategy.id) as u32 >= strategy.genes.max_simultaneous_positions {
                continue;
            }

            let signal = evaluator::should_buy(&strategy.genes, &token);
            self.events.publish(Event::SignalGenerated {
                strategy_id: strategy.id,
                score: signal.score,
                should_trade: signal.should_trade,
            });

            if !signal.should_trade {
                continue;
            }
            let is_better = best.as_ref().map(|(_, b)| signal.score > b.score).unwrap_or(true);
            if is_better {
                best = Some((strategy.id, signal));
            }
        }

        let Some((strategy_id, _signal)) = best else {
            return;
        };
        let Some(strategy) = strategies.iter().find(|s| s.id == strategy_id) else {
            return;
        };

        let Some(allocation) = self.treasury.allocation_of(strategy_id) else {
            return;
        };
        let amount_sol = allocation.available_sol * strategy.genes.investment_percent;
        if !self.treasury.can_trade(strategy_id, amount_sol) {
            debug!(strategy_id = %strategy_id, amount_sol, "insufficient available funds, skipping signal");
            return;
        }
        if !self.treasury.lock_funds(strategy_id, amount_sol) {
            return;
        }

        let outcome = self.execution.buy(strategy_id, &strategy.genes, &token, amount_sol).await;
        if !outcome.ok {
            self.treasury.unlock_funds(strategy_id, amount_sol);
            error!(
                strategy_id = %strategy_id,
                err = outcome.err.as_deref().unwrap_or("unknown"),
                "buy failed, funds released"
            );
            self.events.publish(Event::Error {
                message: outcome.err.unwrap_or_else(|| "buy failed".into()),
            });
            return;
        }

        let trade = outcome.trade.expect("successful buy carries a trade");
        let position = Position::from_trade(&trade);
        self.open_positions.write().insert(
            trade.id,
            MonitoredPosition {
                position: position.clone(),
                trade: trade.clone(),
                genes: strategy.genes.clone(),
            },
        );
        self.events.publish(Event::TradeOpened { trade });
        info!(strategy_id = %strategy_id, symbol = %token.symbol, amount_sol, "position opened");
    }

    /// Replace the strategy roster, e.g. after an evolution cycle.
    pub fn replace_strategies(&self, new_roster: Vec<StrategyGenome>) {
        *self.strategies.write() = new_roster;
    }

    pub fn strategy_count(&self) -> usize {
        self.strategies.read().len()
    }
}

/// Count of open positions keyed by strategy, used by the REST surface.
pub fn open_positions_by_strategy(open_positions: &OpenPositions) -> HashMap<Uuid, usize> {
    let mut counts = HashMap::new();
    for mp in open_positions.read().values() {
        *counts.entry(mp.position.strategy_id).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::PaperExecutionAdapter;
    use crate::feed::PaperFeed;
    use crate::genome::Genes;
    use crate::rng::Rng;
    use std::collections::BTreeSet;

    fn sample_genes() -> Genes {
        Genes {
            entry_mcap_min: 0.0,
            entry_mcap_max: 10_000_000.0,
            entry_volume_min: 0.0,
            social_signals: crate::genome::SocialSignals {
                twitter_followers_min: 0,
                telegram_members_min: 0,
                holders_min: 0,
            },
            buy_patterns: BTreeSet::from(["cat_meme".to_string()]),
            whale_wallets: BTreeSet::new(),
            token_name_keywords: BTreeSet::new(),
            take_profit_multiplier: 2.0,
            stop_loss_multiplier: 0.5,
            time_based_exit: 60.0,
            volume_drop_exit: 0.4,
            sell_signals: crate::genome::SellSignals::default(),
            sell_patterns: BTreeSet::new(),
            investment_percent: 0.5,
            max_simultaneous_positions: 2,
            max_drawdown: 0.3,
            diversification: 0.5,
        }
    }

    fn build_engine(max_concurrent_trades: usize) -> (Arc<TradingEngine>, Uuid) {
        let genome = StrategyGenome::genesis(Uuid::new_v4(), sample_genes(), None);
        let strategy_id = genome.id;
        let strategies: StrategyRoster = Arc::new(RwLock::new(vec![genome]));

        let treasury = Arc::new(Treasury::new(10.0, 0.1, 5.0));
        treasury.allocate_to_strategies(&[strategy_id]);

        let mut config = EngineConfig::default();
        config.max_concurrent_trades = max_concurrent_trades;

        let engine = Arc::new(TradingEngine::new(
            config,
            strategies,
            treasury,
            Arc::new(PaperFeed::new(5_000, 0.01, crate::rng::Rng::from_seed(1))),
            Arc::new(PaperExecutionAdapter::new(0.02)),
            Arc::new(EventBus::new(64)),
        ));
        (engine, strategy_id)
    }

    fn cat_token() -> TokenSnapshot {
        TokenSnapshot {
            address: "addr".into(),
            name: "Cool Cat".into(),
            symbol: "CAT".into(),
            market_cap: 50_000.0,
            volume24h: 5_000.0,
            liquidity: 1_000.0,
            holders: 100,
            created_at: chrono::Utc::now(),
            creator: "c".into(),
            social_links: crate::token::SocialLinks::default(),
            price_usd: 1.0,
            price_change24h: 0.0,
        }
    }

    #[tokio::test]
    async fn handle_new_token_opens_a_position_when_signal_fires() {
        let (engine, strategy_id) = build_engine(10);
        engine.handle_new_token(cat_token()).await;
        assert_eq!(engine.open_positions.read().len(), 1);
        assert_eq!(engine.open_position_count_for(strategy_id), 1);
    }

    #[tokio::test]
    async fn handle_new_token_drops_when_at_global_concurrency_cap() {
        let (engine, _strategy_id) = build_engine(0);
        engine.handle_new_token(cat_token()).await;
        assert_eq!(engine.open_positions.read().len(), 0);
    }

    #[tokio::test]
    async fn start_then_stop_toggles_running_flag() {
        let (engine, _strategy_id) = build_engine(10);
        engine.start();
        assert!(engine.is_running());
        engine.stop();
        assert!(!engine.is_running());
    }

    #[test]
    fn open_positions_by_strategy_counts_per_strategy() {
        let open_positions = monitor::new_open_positions();
        let strategy_id = Uuid::new_v4();
        let g = sample_genes();
        let trade = crate::trade::Trade::open(
            Uuid::new_v4(),
            strategy_id,
            "addr".into(),
            "CAT".into(),
            1.0,
            1.0,
            &g,
            true,
        );
        let position = Position::from_trade(&trade);
        open_positions.write().insert(
            trade.id,
            MonitoredPosition {
                position,
                trade,
                genes: g,
            },
        );
        let counts = open_positions_by_strategy(&open_positions);
        assert_eq!(counts.get(&strategy_id), Some(&1));
    }
}
