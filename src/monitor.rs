// =============================================================================
// Position Monitor — periodic poll of open positions, mechanical + strategic exit
// =============================================================================
//
// Wakes on a fixed interval and, per open position: fetch a fresh snapshot
// from the feed (best-effort — a miss just skips this tick), recompute
// unrealized PnL, check mechanical exits first (take profit / stop loss /
// time), then fall through to the evaluator's strategic sell signal. The
// "fetch -> evaluate -> trigger" sequence for one position never overlaps
// itself; distinct positions tick independently.
//
// =============================================================================

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use tokio::time::{interval, Duration};
use tracing::{debug, error, info, warn};

use crate::evaluator::{self, SellSignal};
use crate::events::{Event, EventBus};
use crate::execution::ExecutionAdapter;
use crate::feed::Feed;
use crate::genome::Genes;
use crate::token::TokenSnapshot;
use crate::trade::{ExitReason, Position, Trade};
use crate::treasury::Treasury;

/// A currently open position plus the gene bundle that opened it (needed
/// to re-evaluate mechanical exits and the strategic sell signal).
pub struct MonitoredPosition {
    pub position: Position,
    pub trade: Trade,
    pub genes: Genes,
}

/// Previous-tick snapshots, one per open position, used as the "previous"
/// argument to `should_sell`.
pub type PreviousSnapshots = Arc<RwLock<HashMap<uuid::Uuid, TokenSnapshot>>>;

pub fn new_previous_snapshots() -> PreviousSnapshots {
    Arc::new(RwLock::new(HashMap::new()))
}

/// Shared table of open positions, keyed by trade id. The monitor and the
/// trading engine both hold a clone of this.
pub type OpenPositions = Arc<RwLock<HashMap<uuid::Uuid, MonitoredPosition>>>;

pub fn new_open_positions() -> OpenPositions {
    Arc::new(RwLock::new(HashMap::new()))
}

/// Maps a matched strategic sell pattern to the exit reason the rest of
/// the system records. `should_sell` can match more than one pattern;
/// the first hit in this priority order wins.
fn exit_reason_for_patterns(patterns: &[&str]) -> ExitReason {
    let has = |p: &str| patterns.contains(&p);
    if has("trailing_stop_hit") {
        ExitReason::StopLoss
    } else if has("profit_secure") || has("mcap_ceiling") {
        ExitReason::TakeProfit
    } else if has("volume_collapse") || has("liquidity_drain") {
        ExitReason::VolumeDrop
    } else if has("time_decay") {
        ExitReason::TimeExit
    } else {
        ExitReason::Manual
    }
}

/// One tick's decision for a single position: which exit (if any) fired.
enum TickOutcome {
    NoExit,
    Exit(ExitReason),
}

fn evaluate_position(
    genes: &Genes,
    trade: &Trade,
    position: &mut Position,
    current: &TokenSnapshot,
    previous: Option<&TokenSnapshot>,
) -> TickOutcome {
    position.mark_to_market(current.price_usd);

    let now = Utc::now();
    if position.current_price >= trade.take_profit_price {
        return TickOutcome::Exit(ExitReason::TakeProfit);
    }
    if position.current_price <= trade.stop_loss_price {
        return TickOutcome::Exit(ExitReason::StopLoss);
    }
    if now >= trade.time_exit_timestamp {
        return TickOutcome::Exit(ExitReason::TimeExit);
    }

    let sell: SellSignal = evaluator::should_sell(genes, position, current, previous);
    if sell.should_sell {
        let patterns: Vec<&str> = sell.matched_patterns.iter().map(String::as_str).collect();
        return TickOutcome::Exit(exit_reason_for_patterns(&patterns));
    }

    TickOutcome::NoExit
}

/// Run the position monitor loop. Spawn this once at engine startup; it
/// runs until the task is cancelled.
pub async fn run_position_monitor(
    interval_secs: u64,
    open_positions: OpenPositions,
    previous_snapshots: PreviousSnapshots,
    feed: Arc<dyn Feed>,
    execution: Arc<dyn ExecutionAdapter>,
    treasury: Arc<Treasury>,
    events: Arc<EventBus>,
) {
    info!(interval_secs, "position monitor started");
    let mut ticker = interval(Duration::from_secs(interval_secs));

    loop {
        ticker.tick().await;

        let trade_ids: Vec<uuid::Uuid> = open_positions.read().keys().copied().collect();
        if trade_ids.is_empty() {
            debug!("position monitor: no open positions");
            continue;
        }

        for trade_id in trade_ids {
            let (genes, trade, mut position) = {
                let guard = open_positions.read();
                match guard.get(&trade_id) {
                    Some(mp) => (mp.genes.clone(), mp.trade.clone(), mp.position.clone()),
                    None => continue, // closed by a concurrent tick
                }
            };

            let current = match feed.snapshot(&position.token_address).await {
                Some(snap) => snap,
                None => {
                    warn!(trade_id = %trade_id, "position monitor: feed miss, skipping tick");
                    continue;
                }
            };
            let previous = previous_snapshots.read().get(&trade_id).cloned();

            let outcome = evaluate_position(&genes, &trade, &mut position, &current, previous.as_ref());
            previous_snapshots.write().insert(trade_id, current);

            {
                let mut guard = open_positions.write();
                if let Some(mp) = guard.get_mut(&trade_id) {
                    mp.position = position.clone();
                }
            }
            events.publish(Event::PositionUpdated {
                position: position.clone(),
            });

            let reason = match outcome {
                TickOutcome::NoExit => continue,
                TickOutcome::Exit(reason) => reason,
            };

            let outcome = execution.sell(&position, &trade, reason).await;
            if !outcome.ok {
                error!(
                    trade_id = %trade_id,
                    err = outcome.err.as_deref().unwrap_or("unknown"),
                    "position monitor: sell failed, leaving position open"
                );
                events.publish(Event::Error {
                    message: outcome.err.unwrap_or_else(|| "sell failed".into()),
                });
                continue;
            }

            let closed_trade = outcome.trade.expect("successful sell carries a trade");
            open_positions.write().remove(&trade_id);
            previous_snapshots.write().remove(&trade_id);
            treasury.record_trade_close(&closed_trade);

            info!(
                trade_id = %trade_id,
                reason = %reason,
                pnl_sol = closed_trade.pnl_sol.unwrap_or(0.0),
                "position closed by monitor"
            );
            events.publish(Event::TradeClosed { trade: closed_trade });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genome::{SellSignals, SocialSignals};
    use std::collections::BTreeSet;

    fn genes() -> Genes {
        Genes {
            entry_mcap_min: 1_000.0,
            entry_mcap_max: 500_000.0,
            entry_volume_min: 100.0,
            social_signals: SocialSignals {
                twitter_followers_min: 0,
                telegram_members_min: 0,
                holders_min: 0,
            },
            buy_patterns: BTreeSet::new(),
            whale_wallets: BTreeSet::new(),
            token_name_keywords: BTreeSet::new(),
            take_profit_multiplier: 2.0,
            stop_loss_multiplier: 0.5,
            time_based_exit: 1440.0,
            volume_drop_exit: 0.4,
            sell_signals: SellSignals::default(),
            sell_patterns: BTreeSet::new(),
            investment_percent: 0.5,
            max_simultaneous_positions: 1,
            max_drawdown: 0.3,
            diversification: 0.5,
        }
    }

    fn token_at(price: f64) -> TokenSnapshot {
        TokenSnapshot {
            address: "addr".into(),
            name: "Token".into(),
            symbol: "TOK".into(),
            market_cap: 50_000.0,
            volume24h: 5_000.0,
            liquidity: 1_000.0,
            holders: 100,
            created_at: Utc::now(),
            creator: "c".into(),
            social_links: crate::token::SocialLinks::default(),
            price_usd: price,
            price_change24h: 0.0,
        }
    }

    #[test]
    fn take_profit_fires_before_strategic_evaluation() {
        let g = genes();
        let trade = Trade::open(
            uuid::Uuid::new_v4(),
            uuid::Uuid::new_v4(),
            "addr".into(),
            "TOK".into(),
            1.0,
            2.0,
            &g,
            true,
        );
        let mut position = Position::from_trade(&trade);
        let current = token_at(2.5); // >= take_profit_price of 2.0
        let outcome = evaluate_position(&g, &trade, &mut position, &current, None);
        assert!(matches!(outcome, TickOutcome::Exit(ExitReason::TakeProfit)));
    }

    #[test]
    fn stop_loss_fires_when_price_drops_below_threshold() {
        let g = genes();
        let trade = Trade::open(
            uuid::Uuid::new_v4(),
            uuid::Uuid::new_v4(),
            "addr".into(),
            "TOK".into(),
            1.0,
            2.0,
            &g,
            true,
        );
        let mut position = Position::from_trade(&trade);
        let current = token_at(0.4); // <= stop_loss_price of 0.5
        let outcome = evaluate_position(&g, &trade, &mut position, &current, None);
        assert!(matches!(outcome, TickOutcome::Exit(ExitReason::StopLoss)));
    }

    #[test]
    fn no_exit_when_price_is_between_barriers_and_no_strategic_signal() {
        let mut g = genes();
        g.sell_signals = SellSignals {
            momentum_reversal: false,
            volume_dry: false,
            holders_dumping: false,
            ..SellSignals::default()
        };
        let trade = Trade::open(
            uuid::Uuid::new_v4(),
            uuid::Uuid::new_v4(),
            "addr".into(),
            "TOK".into(),
            1.0,
            2.0,
            &g,
            true,
        );
        let mut position = Position::from_trade(&trade);
        let current = token_at(1.1);
        let outcome = evaluate_position(&g, &trade, &mut position, &current, None);
        assert!(matches!(outcome, TickOutcome::NoExit));
    }

    #[test]
    fn strategic_sell_pattern_maps_to_matching_exit_reason() {
        assert_eq!(
            exit_reason_for_patterns(&["trailing_stop_hit"]),
            ExitReason::StopLoss
        );
        assert_eq!(
            exit_reason_for_patterns(&["profit_secure"]),
            ExitReason::TakeProfit
        );
        assert_eq!(
            exit_reason_for_patterns(&["volume_collapse"]),
            ExitReason::VolumeDrop
        );
        assert_eq!(exit_reason_for_patterns(&["time_decay"]), ExitReason::TimeExit);
        assert_eq!(exit_reason_for_patterns(&["whale_dump"]), ExitReason::Manual);
    }
}
