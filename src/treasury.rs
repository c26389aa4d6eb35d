// =============================================================================
// Treasury Manager — the shared capital accountant
// =============================================================================
//
// A single `RwLock<Inner>` guards all mutable state, the same discipline the
// risk engine uses for its circuit breakers. Operations on a given
// strategy's allocation are serialized by taking the write lock for the
// whole mutation; operations on distinct strategies still serialize through
// the same lock (a coarser single-writer policy), but never interleave
// *partially* for a single strategy: each method does one lock
// acquisition and one consistent transition.
//
// =============================================================================

use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::trade::Trade;

/// Per-strategy capital accounting.
#[derive(Debug, Clone, serde::Serialize)]
pub struct StrategyAllocation {
    pub allocated_sol: f64,
    pub locked_sol: f64,
    pub available_sol: f64,
    pub realized_pnl: f64,
}

impl StrategyAllocation {
    fn recompute_available(&mut self) {
        self.available_sol = (self.allocated_sol - self.locked_sol).max(0.0);
    }
}

struct Inner {
    total_sol: f64,
    available_to_trade: f64,
    locked_in_positions: f64,
    total_pnl: f64,
    reserve_percent: f64,
    max_allocation_per_strategy: f64,
    allocations: HashMap<Uuid, StrategyAllocation>,
}

/// The shared capital accountant. Cloneable/`Arc`-shareable; all mutating
/// methods take `&self`.
pub struct Treasury {
    inner: RwLock<Inner>,
}

/// Read-only snapshot of the treasury, safe to serialize for the API.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TreasurySnapshot {
    pub total_sol: f64,
    pub available_to_trade: f64,
    pub locked_in_positions: f64,
    pub total_pnl: f64,
    pub reserve_percent: f64,
    pub max_allocation_per_strategy: f64,
    pub allocations: HashMap<Uuid, StrategyAllocation>,
}

impl Treasury {
    pub fn new(total_sol: f64, reserve_percent: f64, max_allocation_per_strategy: f64) -> Self {
        let available_to_trade = total_sol * (1.0 - reserve_percent);
        Self {
            inner: RwLock::new(Inner {
                total_sol,
                available_to_trade,
                locked_in_positions: 0.0,
                total_pnl: 0.0,
                reserve_percent,
                max_allocation_per_strategy,
                allocations: HashMap::new(),
            }),
        }
    }

    /// Rebuild a `Treasury` from a persisted snapshot, e.g. at process
    /// startup. Callers should follow this with `allocate_to_strategies` to
    /// reconcile against the current roster.
    pub fn from_snapshot(snapshot: TreasurySnapshot) -> Self {
        Self {
            inner: RwLock::new(Inner {
                total_sol: snapshot.total_sol,
                available_to_trade: snapshot.available_to_trade,
                locked_in_positions: snapshot.locked_in_positions,
                total_pnl: snapshot.total_pnl,
                reserve_percent: snapshot.reserve_percent,
                max_allocation_per_strategy: snapshot.max_allocation_per_strategy,
                allocations: snapshot.allocations,
            }),
        }
    }

    /// Re-derive per-strategy allocation from the current active set.
    /// Preserves `locked_sol` and `realized_pnl`; drops dead/removed
    /// strategies that have no funds locked.
    pub fn allocate_to_strategies(&self, active_ids: &[Uuid]) {
        let mut inner = self.inner.write();
        let reserve = inner.total_sol * inner.reserve_percent;
        let tradable = (inner.total_sol - reserve).max(0.0);
        let n = active_ids.len().max(1) as f64;
        let per_strategy = (tradable / n).min(inner.max_allocation_per_strategy);

        let mut next = HashMap::new();
        for &id in active_ids {
            let (locked_sol, realized_pnl) = inner
                .allocations
                .get(&id)
                .map(|a| (a.locked_sol, a.realized_pnl))
                .unwrap_or((0.0, 0.0));
            let mut alloc = StrategyAllocation {
                allocated_sol: per_strategy,
                locked_sol,
                available_sol: 0.0,
                realized_pnl,
            };
            alloc.recompute_available();
            next.insert(id, alloc);
        }
        // Preserve any strategy still holding locked funds even if it
        // dropped out of the active set, until it fully unwinds.
        for (id, alloc) in inner.allocations.iter() {
            if !next.contains_key(id) && alloc.locked_sol > 0.0 {
                next.insert(*id, alloc.clone());
            }
        }

        inner.available_to_trade = tradable;
        inner.allocations = next;
        info!(active = active_ids.len(), per_strategy, "treasury reallocated");
    }

    pub fn can_trade(&self, strategy_id: Uuid, amount: f64) -> bool {
        self.inner
            .read()
            .allocations
            .get(&strategy_id)
            .is_some_and(|a| a.available_sol >= amount)
    }

    /// Lock `amount` against `strategy_id`. Returns `false` (validation
    /// failure reported to the caller) without mutating state if the
    /// strategy is unknown or the invariant would break.
    pub fn lock_funds(&self, strategy_id: Uuid, amount: f64) -> bool {
        if amount <= 0.0 {
            warn!(%strategy_id, amount, "rejected lock: non-positive amount");
            return false;
        }
        let mut inner = self.inner.write();
        let Some(alloc) = inner.allocations.get_mut(&strategy_id) else {
            warn!(%strategy_id, "rejected lock: unknown strategy");
            return false;
        };
        if alloc.available_sol < amount {
            warn!(%strategy_id, amount, available = alloc.available_sol, "rejected lock: overdraw");
            return false;
        }
        alloc.locked_sol += amount;
        alloc.recompute_available();
        inner.locked_in_positions += amount;
        true
    }

    /// Reverse a lock. Floors at zero rather than going negative; always
    /// succeeds for a known strategy.
    pub fn unlock_funds(&self, strategy_id: Uuid, amount: f64) -> bool {
        let mut inner = self.inner.write();
        let Some(alloc) = inner.allocations.get_mut(&strategy_id) else {
            warn!(%strategy_id, "rejected unlock: unknown strategy");
            return false;
        };
        alloc.locked_sol = (alloc.locked_sol - amount).max(0.0);
        alloc.recompute_available();
        inner.locked_in_positions = (inner.locked_in_positions - amount).max(0.0);
        true
    }

    /// Apply a closed trade's PnL: unlock its principal, credit realized
    /// PnL to the strategy and to the global totals.
    pub fn record_trade_close(&self, trade: &Trade) -> bool {
        let Some(pnl_sol) = trade.pnl_sol else {
            warn!(trade_id = %trade.id, "record_trade_close called on a trade with no pnl");
            return false;
        };
        let mut inner = self.inner.write();
        let Some(alloc) = inner.allocations.get_mut(&trade.strategy_id) else {
            warn!(strategy_id = %trade.strategy_id, "rejected close: unknown strategy");
            return false;
        };
        alloc.locked_sol = (alloc.locked_sol - trade.amount_sol).max(0.0);
        alloc.realized_pnl += pnl_sol;
        alloc.allocated_sol += pnl_sol;
        alloc.recompute_available();

        inner.locked_in_positions = (inner.locked_in_positions - trade.amount_sol).max(0.0);
        inner.total_sol += pnl_sol;
        inner.total_pnl += pnl_sol;
        inner.available_to_trade += pnl_sol.max(0.0);

        info!(
            strategy_id = %trade.strategy_id,
            trade_id = %trade.id,
            pnl_sol,
            "treasury recorded trade close"
        );
        true
    }

    pub fn snapshot(&self) -> TreasurySnapshot {
        let inner = self.inner.read();
        TreasurySnapshot {
            total_sol: inner.total_sol,
            available_to_trade: inner.available_to_trade,
            locked_in_positions: inner.locked_in_positions,
            total_pnl: inner.total_pnl,
            reserve_percent: inner.reserve_percent,
            max_allocation_per_strategy: inner.max_allocation_per_strategy,
            allocations: inner.allocations.clone(),
        }
    }

    pub fn allocation_of(&self, strategy_id: Uuid) -> Option<StrategyAllocation> {
        self.inner.read().allocations.get(&strategy_id).cloned()
    }
}
