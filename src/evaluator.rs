// =============================================================================
// Token Evaluator — pure buy/sell decision functions
// =============================================================================
//
// `should_buy` and `should_sell` are pure: no I/O, no shared state, no
// suspension, and they never log — callers decide what to log from the
// returned structured result.
//
// =============================================================================

use serde::{Deserialize, Serialize};

use crate::genetic::catalog::{matches_buy_pattern, matches_sell_pattern};
use crate::genome::Genes;
use crate::token::TokenSnapshot;
use crate::trade::Position;

/// Result of evaluating a token against a genome's entry rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuySignal {
    pub should_trade: bool,
    pub score: f64,
    pub matched_patterns: Vec<String>,
    pub matched_keywords: Vec<String>,
    pub social_score: f64,
    pub reasons: Vec<String>,
}

/// Sell urgency tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Immediate,
    Soon,
    Consider,
    Hold,
}

/// Result of evaluating an open position against a genome's exit rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SellSignal {
    pub should_sell: bool,
    pub urgency: Urgency,
    pub score: f64,
    pub matched_patterns: Vec<String>,
    pub reasons: Vec<String>,
    pub suggested_exit_percent: f64,
}

/// Evaluate whether `genome`'s entry rules fire for `token`.
pub fn should_buy(genes: &Genes, token: &TokenSnapshot) -> BuySignal {
    let mut reasons = Vec::new();

    if token.market_cap < genes.entry_mcap_min || token.market_cap > genes.entry_mcap_max {
        reasons.push("Market cap outside range".to_string());
        return BuySignal {
            should_trade: false,
            score: 0.0,
            matched_patterns: Vec::new(),
            matched_keywords: Vec::new(),
            social_score: 0.0,
            reasons,
        };
    }

    let mut score = 20.0;

    if token.volume24h < genes.entry_volume_min {
        reasons.push("Volume below minimum".to_string());
        return BuySignal {
            should_trade: false,
            score,
            matched_patterns: Vec::new(),
            matched_keywords: Vec::new(),
            social_score: 0.0,
            reasons,
        };
    }
    score += 15.0;

    let name_lower = token.name_lower();
    let symbol_lower = token.symbol_lower();

    let matched_patterns: Vec<String> = genes
        .buy_patterns
        .iter()
        .filter(|p| {
            matches_buy_pattern(
                p,
                &name_lower,
                &symbol_lower,
                token.holders,
                token.volume24h,
                token.market_cap,
                token.price_change24h,
            )
        })
        .cloned()
        .collect();
    score += 15.0 * matched_patterns.len() as f64;

    let matched_keywords: Vec<String> = genes
        .token_name_keywords
        .iter()
        .filter(|k| name_lower.contains(k.as_str()) || symbol_lower.contains(k.as_str()))
        .cloned()
        .collect();
    score += 10.0 * matched_keywords.len() as f64;

    let checks = [
        genes.social_signals.holders_min > 0,
        genes.social_signals.twitter_followers_min > 0,
        genes.social_signals.telegram_members_min > 0,
    ];
    let passes = [
        genes.social_signals.holders_min > 0 && token.holders >= genes.social_signals.holders_min,
        genes.social_signals.twitter_followers_min > 0
            && token.social_links.twitter_followers >= genes.social_signals.twitter_followers_min,
        genes.social_signals.telegram_members_min > 0
            && token.social_links.telegram_members >= genes.social_signals.telegram_members_min,
    ];
    let extant = checks.iter().filter(|&&c| c).count();
    let passed = passes.iter().filter(|&&p| p).count();
    let social_passed = extant == 0 || passed * 2 >= extant;
    let social_score = passed as f64 * 10.0;
    if social_passed {
        score += social_score;
    }

    let should_trade = score >= 50.0 && (!matched_patterns.is_empty() || !matched_keywords.is_empty());

    BuySignal {
        should_trade,
        score,
        matched_patterns,
        matched_keywords,
        social_score,
        reasons,
    }
}

fn urgency_for(score: f64) -> (Urgency, f64) {
    if score >= 40.0 {
        (Urgency::Immediate, 1.0)
    } else if score >= 25.0 {
        (Urgency::Soon, 0.75)
    } else if score >= 15.0 {
        (Urgency::Consider, 0.5)
    } else {
        (Urgency::Hold, 0.0)
    }
}

/// Evaluate whether `genome`'s exit rules fire for an open `position`,
/// given its mechanical genes, the current snapshot, and an optional
/// previous snapshot.
pub fn should_sell(
    genes: &Genes,
    position: &Position,
    current: &TokenSnapshot,
    previous: Option<&TokenSnapshot>,
) -> SellSignal {
    let mut score = 0.0;
    let mut matched_patterns = Vec::new();
    let mut reasons = Vec::new();

    let pnl_pct = position.unrealized_pnl_percent;
    let delta_price = current.delta_price_pct(previous);
    let delta_vol = current.delta_volume_pct(previous);
    let delta_holders = current.delta_holders(previous);
    let delta_liquidity = current.delta_liquidity_pct(previous);

    if genes.sell_signals.momentum_reversal && pnl_pct > 0.05 && delta_price.is_some_and(|d| d < -0.05) {
        score += 30.0;
        matched_patterns.push("momentum_death".to_string());
        reasons.push("Momentum reversal after profit".to_string());
    }
    if genes.sell_signals.volume_dry && delta_vol.is_some_and(|d| d < -0.3) {
        score += 25.0;
        matched_patterns.push("volume_collapse".to_string());
        reasons.push("Volume dried up".to_string());
    }
    if genes.sell_signals.holders_dumping && delta_holders.is_some_and(|d| d < -5) {
        score += 20.0;
        matched_patterns.push("holder_exodus".to_string());
        reasons.push("Holders exiting".to_string());
    }
    if pnl_pct < -0.10 {
        score += 35.0;
        matched_patterns.push("price_dump".to_string());
        reasons.push("Hard drawdown".to_string());
    }
    if genes.sell_signals.mcap_ceiling > 0.0 && current.market_cap >= genes.sell_signals.mcap_ceiling {
        score += 35.0;
        matched_patterns.push("mcap_ceiling".to_string());
        reasons.push("Market cap ceiling reached".to_string());
    }
    if genes.sell_signals.profit_securing > 0.0 && pnl_pct >= genes.sell_signals.profit_securing {
        score += 25.0;
        matched_patterns.push("profit_secure".to_string());
        reasons.push("Profit target reached".to_string());
    }

    let peak = position
        .entry_price
        .max(position.current_price)
        .max(previous.map(|p| p.price_usd).unwrap_or(0.0));
    if peak > 0.0 && (peak - current.price_usd) / peak >= genes.sell_signals.trailing_stop {
        score += 40.0;
        matched_patterns.push("trailing_stop_hit".to_string());
        reasons.push("Trailing stop hit".to_string());
    }

    let held_minutes = position.held_minutes();

    for pattern in &genes.sell_patterns {
        if matches_sell_pattern(
            pattern,
            pnl_pct,
            delta_vol,
            delta_holders,
            delta_liquidity,
            current.market_cap,
            genes.sell_signals.mcap_ceiling,
            held_minutes,
        ) {
            score += 15.0;
            matched_patterns.push(pattern.clone());
            reasons.push(format!("Pattern match: {pattern}"));
        }
    }

    if held_minutes > 0.8 * genes.time_based_exit && pnl_pct < 0.05 {
        score += 15.0;
        matched_patterns.push("time_decay".to_string());
        reasons.push("Time decay without profit".to_string());
    }

    let (urgency, suggested_exit_percent) = urgency_for(score);
    let should_sell = score >= 25.0;

    SellSignal {
        should_sell,
        urgency,
        score,
        matched_patterns,
        reasons,
        suggested_exit_percent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genome::{SellSignals, SocialSignals};
    use chrono::Utc;
    use std::collections::BTreeSet;

    fn genes() -> Genes {
        Genes {
            entry_mcap_min: 10_000.0,
            entry_mcap_max: 200_000.0,
            entry_volume_min: 1_000.0,
            social_signals: SocialSignals {
                twitter_followers_min: 0,
                telegram_members_min: 0,
                holders_min: 0,
            },
            buy_patterns: BTreeSet::from(["cat_meme".to_string()]),
            whale_wallets: BTreeSet::new(),
            token_name_keywords: BTreeSet::from(["moon".to_string()]),
            take_profit_multiplier: 3.0,
            stop_loss_multiplier: 0.5,
            time_based_exit: 60.0,
            volume_drop_exit: 0.4,
            sell_signals: SellSignals::default(),
            sell_patterns: BTreeSet::new(),
            investment_percent: 0.5,
            max_simultaneous_positions: 1,
            max_drawdown: 0.3,
            diversification: 0.5,
        }
    }

    fn token(market_cap: f64, volume: f64) -> TokenSnapshot {
        TokenSnapshot {
            address: "addr".into(),
            name: "Cool Cat Moon".into(),
            symbol: "CAT".into(),
            market_cap,
            volume24h: volume,
            liquidity: 1000.0,
            holders: 100,
            created_at: Utc::now(),
            creator: "c".into(),
            social_links: crate::token::SocialLinks::default(),
            price_usd: 1.0,
            price_change24h: 0.0,
        }
    }

    #[test]
    fn rejects_market_cap_outside_range_exclusive_bounds() {
        let g = genes();
        let below = should_buy(&g, &token(g.entry_mcap_min - 0.01, 5000.0));
        assert!(!below.should_trade);
        assert_eq!(below.reasons[0], "Market cap outside range");

        let above = should_buy(&g, &token(g.entry_mcap_max + 0.01, 5000.0));
        assert!(!above.should_trade);
    }

    #[test]
    fn accepts_at_inclusive_bounds_when_other_checks_pass() {
        let g = genes();
        let sig = should_buy(&g, &token(g.entry_mcap_min, 5000.0));
        assert!(sig.should_trade);
    }

    #[test]
    fn rejects_low_volume() {
        let g = genes();
        let sig = should_buy(&g, &token(50_000.0, 10.0));
        assert!(!sig.should_trade);
        assert_eq!(sig.reasons[0], "Volume below minimum");
    }

    #[test]
    fn pattern_and_keyword_matches_add_score_and_enable_trade() {
        let g = genes();
        let sig = should_buy(&g, &token(50_000.0, 5000.0));
        assert!(sig.should_trade);
        assert!(sig.matched_patterns.contains(&"cat_meme".to_string()));
        assert!(sig.matched_keywords.contains(&"moon".to_string()));
    }

    fn position_at(entry: f64, current: f64) -> Position {
        let mut p = Position {
            trade_id: uuid::Uuid::new_v4(),
            strategy_id: uuid::Uuid::new_v4(),
            token_address: "addr".into(),
            token_symbol: "CAT".into(),
            entry_price: entry,
            current_price: entry,
            amount_sol: 1.0,
            token_amount: 1.0,
            unrealized_pnl_sol: 0.0,
            unrealized_pnl_percent: 0.0,
            opened_at: Utc::now(),
            last_updated: Utc::now(),
        };
        p.mark_to_market(current);
        p
    }

    #[test]
    fn urgency_transitions_at_exact_thresholds() {
        assert_eq!(urgency_for(40.0).0, Urgency::Immediate);
        assert_eq!(urgency_for(39.999).0, Urgency::Soon);
        assert_eq!(urgency_for(25.0).0, Urgency::Soon);
        assert_eq!(urgency_for(24.999).0, Urgency::Consider);
        assert_eq!(urgency_for(15.0).0, Urgency::Consider);
        assert_eq!(urgency_for(14.999).0, Urgency::Hold);
    }

    #[test]
    fn trailing_stop_triggers_at_documented_scenario() {
        // entry=1.0, ticks raise price to 2.0 then drop to 1.6; with
        // trailing_stop=0.2 the second tick must trigger.
        let mut g = genes();
        g.sell_signals.trailing_stop = 0.2;
        let position = position_at(1.0, 1.6);
        let mut previous = token(50_000.0, 5000.0);
        previous.price_usd = 2.0;
        let mut current = token(50_000.0, 5000.0);
        current.price_usd = 1.6;
        let sig = should_sell(&g, &position, &current, Some(&previous));
        assert!(sig.matched_patterns.contains(&"trailing_stop_hit".to_string()));
        assert!(sig.should_sell);
    }

    #[test]
    fn hard_drawdown_triggers_price_dump() {
        let g = genes();
        let position = position_at(1.0, 0.85);
        let current = token(50_000.0, 5000.0);
        let sig = should_sell(&g, &position, &current, None);
        assert!(sig.matched_patterns.contains(&"price_dump".to_string()));
    }
}
