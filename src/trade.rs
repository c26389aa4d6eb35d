// =============================================================================
// Trade & Position — the record of one strategy's engagement with one token
// =============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::genome::Genes;

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    TakeProfit,
    StopLoss,
    TimeExit,
    VolumeDrop,
    Manual,
}

impl std::fmt::Display for ExitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::TakeProfit => "take_profit",
            Self::StopLoss => "stop_loss",
            Self::TimeExit => "time_exit",
            Self::VolumeDrop => "volume_drop",
            Self::Manual => "manual",
        };
        write!(f, "{s}")
    }
}

/// One strategy's engagement with one token, from entry to (optional) exit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub id: Uuid,
    pub strategy_id: Uuid,
    pub token_address: String,
    pub token_symbol: String,
    pub entry_price: f64,
    pub amount_sol: f64,
    pub take_profit_price: f64,
    pub stop_loss_price: f64,
    pub time_exit_timestamp: DateTime<Utc>,
    pub is_paper_trade: bool,
    pub opened_at: DateTime<Utc>,

    pub exit_price: Option<f64>,
    pub pnl_sol: Option<f64>,
    pub pnl_percent: Option<f64>,
    pub exit_reason: Option<ExitReason>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl Trade {
    /// Open a new trade from the gene bundle driving mechanical exits.
    pub fn open(
        id: Uuid,
        strategy_id: Uuid,
        token_address: String,
        token_symbol: String,
        entry_price: f64,
        amount_sol: f64,
        genes: &Genes,
        is_paper_trade: bool,
    ) -> Self {
        let opened_at = Utc::now();
        Self {
            id,
            strategy_id,
            token_address,
            token_symbol,
            entry_price,
            amount_sol,
            take_profit_price: entry_price * genes.take_profit_multiplier,
            stop_loss_price: entry_price * genes.stop_loss_multiplier,
            time_exit_timestamp: opened_at
                + chrono::Duration::seconds((genes.time_based_exit * 60.0) as i64),
            is_paper_trade,
            opened_at,
            exit_price: None,
            pnl_sol: None,
            pnl_percent: None,
            exit_reason: None,
            closed_at: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.closed_at.is_none()
    }

    /// Close the trade at `exit_price`, computing PnL. No-op if already
    /// closed (state machine is open -> closed, once).
    pub fn close(&mut self, exit_price: f64, reason: ExitReason) {
        if !self.is_open() {
            return;
        }
        let pnl_percent = (exit_price - self.entry_price) / self.entry_price;
        self.exit_price = Some(exit_price);
        self.pnl_percent = Some(pnl_percent);
        self.pnl_sol = Some(pnl_percent * self.amount_sol);
        self.exit_reason = Some(reason);
        self.closed_at = Some(Utc::now());
    }
}

/// Live view of an open trade: owned 1:1 by its trade while open,
/// destroyed at close.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub trade_id: Uuid,
    pub strategy_id: Uuid,
    pub token_address: String,
    pub token_symbol: String,
    pub entry_price: f64,
    pub current_price: f64,
    pub amount_sol: f64,
    pub token_amount: f64,
    pub unrealized_pnl_sol: f64,
    pub unrealized_pnl_percent: f64,
    pub opened_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl Position {
    pub fn from_trade(trade: &Trade) -> Self {
        let token_amount = if trade.entry_price > 0.0 {
            trade.amount_sol / trade.entry_price
        } else {
            0.0
        };
        Self {
            trade_id: trade.id,
            strategy_id: trade.strategy_id,
            token_address: trade.token_address.clone(),
            token_symbol: trade.token_symbol.clone(),
            entry_price: trade.entry_price,
            current_price: trade.entry_price,
            amount_sol: trade.amount_sol,
            token_amount,
            unrealized_pnl_sol: 0.0,
            unrealized_pnl_percent: 0.0,
            opened_at: trade.opened_at,
            last_updated: trade.opened_at,
        }
    }

    /// Recompute unrealized PnL against a fresh price.
    pub fn mark_to_market(&mut self, current_price: f64) {
        self.current_price = current_price;
        self.unrealized_pnl_percent = if self.entry_price > 0.0 {
            (current_price - self.entry_price) / self.entry_price
        } else {
            0.0
        };
        self.unrealized_pnl_sol = self.unrealized_pnl_percent * self.amount_sol;
        self.last_updated = Utc::now();
    }

    pub fn held_minutes(&self) -> f64 {
        (Utc::now() - self.opened_at).num_seconds() as f64 / 60.0
    }
}
