// =============================================================================
// Pattern catalogs — the fixed tag vocabularies genes are drawn from
// =============================================================================
//
// Buy patterns describe what a token *looks like* at discovery time; sell
// patterns describe what a held position *looks like* when it sours. Both
// catalogs are fixed so that genesis generation, mutation, and evaluation
// all agree on the same tag set.
//
// =============================================================================

/// Catalog of buy-side pattern tags (>= 15 entries, per the gene bundle
/// invariant).
pub const BUY_PATTERNS: &[&str] = &[
    "cat_meme",
    "dog_meme",
    "ai_narrative",
    "agent_narrative",
    "low_holder_gem",
    "whale_accumulation",
    "animal_meme",
    "food_meme",
    "degen_play",
    "frog_meme",
    "politics_meme",
    "celebrity_meme",
    "gaming_narrative",
    "meta_narrative",
    "fresh_deploy",
    "rename_relaunch",
    "viral_name",
];

/// Catalog of sell-side pattern tags (>= 10 entries, per the gene bundle
/// invariant). `momentum_death` is retained for gene-bundle compatibility
/// but its matcher is a documented no-op (see [`matches_sell_pattern`]).
pub const SELL_PATTERNS: &[&str] = &[
    "volume_collapse",
    "whale_dump",
    "holder_exodus",
    "hype_fade",
    "liquidity_drain",
    "time_decay",
    "momentum_death",
    "price_dump",
    "mcap_ceiling",
    "profit_secure",
    "trailing_stop_hit",
];

/// Evaluate a single buy pattern's rule against a name/symbol pair (already
/// lowercased by the caller) and the numeric fields it needs. Case-
/// insensitive substring checks cover the meme/narrative tags; the
/// remainder read numeric signals.
pub fn matches_buy_pattern(
    pattern: &str,
    name_lower: &str,
    symbol_lower: &str,
    holders: u64,
    volume24h: f64,
    market_cap: f64,
    price_change24h: f64,
) -> bool {
    let text_hit = |needles: &[&str]| {
        needles
            .iter()
            .any(|n| name_lower.contains(n) || symbol_lower.contains(n))
    };

    match pattern {
        "cat_meme" => text_hit(&["cat", "kitty", "neko"]),
        "dog_meme" => text_hit(&["dog", "inu", "shib", "puppy"]),
        "frog_meme" => text_hit(&["frog", "pepe", "toad"]),
        "animal_meme" => text_hit(&["cat", "dog", "ape", "frog", "pepe", "monkey", "bear", "bull"]),
        "food_meme" => text_hit(&["pizza", "burger", "taco", "sushi", "ramen", "food"]),
        "ai_narrative" => text_hit(&["ai", "gpt", "neural", "intelligence"]),
        "agent_narrative" => text_hit(&["agent", "bot", "auto"]),
        "gaming_narrative" => text_hit(&["game", "play", "quest", "arena"]),
        "meta_narrative" => text_hit(&["meta", "verse", "chain", "layer"]),
        "politics_meme" => text_hit(&["president", "election", "senate", "vote"]),
        "celebrity_meme" => text_hit(&["elon", "trump", "biden", "kanye"]),
        "degen_play" => price_change24h > 100.0 && holders > 50,
        "fresh_deploy" => text_hit(&["fresh", "new", "launch"]),
        "rename_relaunch" => text_hit(&["v2", "relaunch", "reborn"]),
        "viral_name" => text_hit(&["viral", "trend", "based"]),
        "low_holder_gem" => holders < 100 && volume24h > 5000.0,
        "whale_accumulation" => market_cap > 0.0 && volume24h > market_cap * 0.5,
        _ => false,
    }
}

/// Evaluate a single sell pattern's rule. `delta_volume_pct`/
/// `delta_liquidity_pct` are `None` when there is no previous snapshot to
/// diff against.
pub fn matches_sell_pattern(
    pattern: &str,
    unrealized_pnl_pct: f64,
    delta_volume_pct: Option<f64>,
    delta_holders: Option<i64>,
    delta_liquidity_pct: Option<f64>,
    current_mcap: f64,
    mcap_ceiling: f64,
    held_minutes: f64,
) -> bool {
    match pattern {
        // The source expression this pattern stood in for compared
        // `unrealized_pnl_pct` against itself scaled by 0.7 — identically
        // false. `sellSignals.momentumReversal` already covers the
        // intended rule, so this stays a no-op.
        "momentum_death" => false,
        "volume_collapse" => delta_volume_pct.is_some_and(|d| d < -0.5),
        "liquidity_drain" => delta_liquidity_pct.is_some_and(|d| d < -0.3),
        "whale_dump" => delta_volume_pct.is_some_and(|d| d > 0.5) && unrealized_pnl_pct < 0.0,
        "holder_exodus" => delta_holders.is_some_and(|d| d < -20),
        "hype_fade" => delta_volume_pct.is_some_and(|d| d < -0.3) && delta_holders.is_some_and(|d| d < 0),
        "time_decay" => held_minutes > 30.0 && unrealized_pnl_pct < 0.1,
        "price_dump" => unrealized_pnl_pct < -0.10,
        "mcap_ceiling" => mcap_ceiling > 0.0 && current_mcap >= mcap_ceiling,
        "profit_secure" => unrealized_pnl_pct > 0.0,
        "trailing_stop_hit" => false, // handled directly by the monitor's peak-tracking check
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalogs_meet_minimum_size() {
        assert!(BUY_PATTERNS.len() >= 15);
        assert!(SELL_PATTERNS.len() >= 10);
    }

    #[test]
    fn momentum_death_is_a_documented_no_op() {
        assert!(!matches_sell_pattern(
            "momentum_death",
            999.0,
            Some(-999.0),
            Some(-999),
            Some(-999.0),
            999.0,
            1.0,
            999.0,
        ));
    }

    #[test]
    fn cat_meme_matches_name_or_symbol() {
        assert!(matches_buy_pattern("cat_meme", "cool cat coin", "cat", 0, 0.0, 0.0, 0.0));
        assert!(matches_buy_pattern("cat_meme", "kitty", "kitty", 0, 0.0, 0.0, 0.0));
        assert!(!matches_buy_pattern("cat_meme", "dog coin", "dog", 0, 0.0, 0.0, 0.0));
    }

    #[test]
    fn low_holder_gem_reads_holders_and_volume() {
        assert!(matches_buy_pattern("low_holder_gem", "x", "x", 50, 6000.0, 0.0, 0.0));
        assert!(!matches_buy_pattern("low_holder_gem", "x", "x", 5000, 6000.0, 0.0, 0.0));
        assert!(!matches_buy_pattern("low_holder_gem", "x", "x", 50, 100.0, 0.0, 0.0));
    }

    #[test]
    fn whale_accumulation_compares_volume_to_market_cap() {
        assert!(matches_buy_pattern("whale_accumulation", "x", "x", 0, 60_000.0, 100_000.0, 0.0));
        assert!(!matches_buy_pattern("whale_accumulation", "x", "x", 0, 40_000.0, 100_000.0, 0.0));
    }

    #[test]
    fn degen_play_reads_price_change_and_holders() {
        assert!(matches_buy_pattern("degen_play", "x", "x", 60, 0.0, 0.0, 150.0));
        assert!(!matches_buy_pattern("degen_play", "x", "x", 10, 0.0, 0.0, 150.0));
        assert!(!matches_buy_pattern("degen_play", "x", "x", 60, 0.0, 0.0, 50.0));
    }

    #[test]
    fn dog_meme_matches_shib_not_just_shiba() {
        assert!(matches_buy_pattern("dog_meme", "shib token", "shib", 0, 0.0, 0.0, 0.0));
    }

    #[test]
    fn animal_meme_includes_pepe() {
        assert!(matches_buy_pattern("animal_meme", "pepe coin", "pepe", 0, 0.0, 0.0, 0.0));
    }

    #[test]
    fn food_meme_matches_ramen_and_food() {
        assert!(matches_buy_pattern("food_meme", "ramen coin", "ramen", 0, 0.0, 0.0, 0.0));
        assert!(matches_buy_pattern("food_meme", "food coin", "food", 0, 0.0, 0.0, 0.0));
        assert!(!matches_buy_pattern("food_meme", "cake coin", "cake", 0, 0.0, 0.0, 0.0));
    }

    #[test]
    fn volume_collapse_requires_steep_drop() {
        assert!(!matches_sell_pattern("volume_collapse", 0.0, Some(-0.4), None, None, 0.0, 0.0, 0.0));
        assert!(matches_sell_pattern("volume_collapse", 0.0, Some(-0.6), None, None, 0.0, 0.0, 0.0));
    }

    #[test]
    fn liquidity_drain_reads_liquidity_delta_not_volume() {
        assert!(!matches_sell_pattern("liquidity_drain", 0.0, Some(-0.9), None, Some(-0.1), 0.0, 0.0, 0.0));
        assert!(matches_sell_pattern("liquidity_drain", 0.0, None, None, Some(-0.4), 0.0, 0.0, 0.0));
    }

    #[test]
    fn whale_dump_needs_volume_spike_and_underwater_price() {
        assert!(matches_sell_pattern("whale_dump", -0.1, Some(0.6), None, None, 0.0, 0.0, 0.0));
        assert!(!matches_sell_pattern("whale_dump", 0.1, Some(0.6), None, None, 0.0, 0.0, 0.0));
        assert!(!matches_sell_pattern("whale_dump", -0.1, Some(-0.6), None, None, 0.0, 0.0, 0.0));
    }

    #[test]
    fn holder_exodus_requires_steep_holder_drop() {
        assert!(!matches_sell_pattern("holder_exodus", 0.0, None, Some(-10), None, 0.0, 0.0, 0.0));
        assert!(matches_sell_pattern("holder_exodus", 0.0, None, Some(-25), None, 0.0, 0.0, 0.0));
    }

    #[test]
    fn hype_fade_needs_volume_and_holder_decline_together() {
        assert!(matches_sell_pattern("hype_fade", 0.0, Some(-0.4), Some(-1), None, 0.0, 0.0, 0.0));
        assert!(!matches_sell_pattern("hype_fade", 0.0, Some(-0.4), Some(1), None, 0.0, 0.0, 0.0));
        assert!(!matches_sell_pattern("hype_fade", 0.0, Some(-0.1), Some(-1), None, 0.0, 0.0, 0.0));
    }

    #[test]
    fn time_decay_fires_after_thirty_minutes_without_profit() {
        assert!(matches_sell_pattern("time_decay", 0.05, None, None, None, 0.0, 0.0, 45.0));
        assert!(!matches_sell_pattern("time_decay", 0.15, None, None, None, 0.0, 0.0, 45.0));
        assert!(!matches_sell_pattern("time_decay", 0.05, None, None, None, 0.0, 0.0, 10.0));
    }
}
