// =============================================================================
// Execution adapter — the thin boundary between a decision and a fill
// =============================================================================
//
// `buy`/`sell` are identical in shape whether the fill is synthetic (paper)
// or routed to a venue (real); callers never branch on which adapter they
// hold. The paper path applies symmetric slippage and synthesizes a fill
// id; the real path is a thin stub — submitting orders to a live venue is
// explicitly out of scope.
//
// =============================================================================

use async_trait::async_trait;
use tracing::{info, warn};
use uuid::Uuid;

use crate::genome::Genes;
use crate::token::TokenSnapshot;
use crate::trade::{ExitReason, Position, Trade};

/// Outcome of an execution call.
pub struct ExecutionOutcome {
    pub ok: bool,
    pub trade: Option<Trade>,
    pub err: Option<String>,
}

impl ExecutionOutcome {
    fn success(trade: Trade) -> Self {
        Self {
            ok: true,
            trade: Some(trade),
            err: None,
        }
    }

    fn failure(err: impl Into<String>) -> Self {
        Self {
            ok: false,
            trade: None,
            err: Some(err.into()),
        }
    }
}

/// Boundary every execution backend implements. The monitor and trading
/// engine treat paper and real adapters identically.
#[async_trait]
pub trait ExecutionAdapter: Send + Sync {
    async fn buy(
        &self,
        strategy_id: Uuid,
        genes: &Genes,
        token: &TokenSnapshot,
        amount_sol: f64,
    ) -> ExecutionOutcome;

    async fn sell(&self, position: &Position, trade: &Trade, reason: ExitReason) -> ExecutionOutcome;
}

/// Simulated fills with symmetric slippage. The default adapter — this is
/// the only implementation that is ever wired up automatically.
pub struct PaperExecutionAdapter {
    slippage: f64,
}

impl PaperExecutionAdapter {
    pub fn new(slippage: f64) -> Self {
        Self { slippage }
    }
}

#[async_trait]
impl ExecutionAdapter for PaperExecutionAdapter {
    async fn buy(
        &self,
        strategy_id: Uuid,
        genes: &Genes,
        token: &TokenSnapshot,
        amount_sol: f64,
    ) -> ExecutionOutcome {
        if amount_sol <= 0.0 || token.price_usd <= 0.0 {
            return ExecutionOutcome::failure("invalid buy parameters");
        }
        let effective_price = token.price_usd * (1.0 + self.slippage);
        let trade = Trade::open(
            Uuid::new_v4(),
            strategy_id,
            token.address.clone(),
            token.symbol.clone(),
            effective_price,
            amount_sol,
            genes,
            true,
        );
        info!(
            strategy_id = %strategy_id,
            symbol = %token.symbol,
            effective_price,
            amount_sol,
            "paper buy filled"
        );
        ExecutionOutcome::success(trade)
    }

    async fn sell(&self, position: &Position, trade: &Trade, reason: ExitReason) -> ExecutionOutcome {
        if position.current_price <= 0.0 {
            return ExecutionOutcome::failure("invalid sell price");
        }
        let effective_price = position.current_price * (1.0 - self.slippage);
        let mut closed = trade.clone();
        closed.close(effective_price, reason);
        info!(
            strategy_id = %position.strategy_id,
            symbol = %position.token_symbol,
            effective_price,
            reason = %reason,
            "paper sell filled"
        );
        ExecutionOutcome::success(closed)
    }
}

/// Stub for submitting orders to a live venue. Wallet/key management and
/// real order routing are out of scope; this exists only so the
/// `ExecutionAdapter` seam has a second implementation to compile against.
pub struct RealExecutionAdapter {
    client: reqwest::Client,
    venue_base_url: String,
}

impl RealExecutionAdapter {
    pub fn new(venue_base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            venue_base_url: venue_base_url.into(),
        }
    }
}

#[async_trait]
impl ExecutionAdapter for RealExecutionAdapter {
    async fn buy(
        &self,
        strategy_id: Uuid,
        _genes: &Genes,
        token: &TokenSnapshot,
        amount_sol: f64,
    ) -> ExecutionOutcome {
        warn!(
            strategy_id = %strategy_id,
            symbol = %token.symbol,
            venue = %self.venue_base_url,
            "real execution adapter invoked but no live venue is wired up"
        );
        let _ = amount_sol;
        ExecutionOutcome::failure("real execution is not implemented in this deployment")
    }

    async fn sell(&self, position: &Position, _trade: &Trade, _reason: ExitReason) -> ExecutionOutcome {
        warn!(
            symbol = %position.token_symbol,
            venue = %self.venue_base_url,
            "real execution adapter invoked but no live venue is wired up"
        );
        ExecutionOutcome::failure("real execution is not implemented in this deployment")
    }
}
