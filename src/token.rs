// =============================================================================
// Token snapshot — immutable view of a listed token at a point in time
// =============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Social links a token's listing advertises. All optional; the feed
/// adapter fills in what it can discover.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SocialLinks {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub twitter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telegram: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    pub twitter_followers: u64,
    pub telegram_members: u64,
}

/// Immutable point-in-time view of a token. The Position Monitor keeps a
/// one-deep *previous* snapshot per token so sell evaluation can diff
/// against it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenSnapshot {
    pub address: String,
    pub name: String,
    pub symbol: String,
    pub market_cap: f64,
    pub volume24h: f64,
    pub liquidity: f64,
    pub holders: u64,
    pub created_at: DateTime<Utc>,
    pub creator: String,
    pub social_links: SocialLinks,
    pub price_usd: f64,
    pub price_change24h: f64,
}

impl TokenSnapshot {
    pub fn name_lower(&self) -> String {
        self.name.to_lowercase()
    }

    pub fn symbol_lower(&self) -> String {
        self.symbol.to_lowercase()
    }

    /// Percent change in volume relative to `previous`, or `None` if there
    /// is no previous snapshot (or its volume was zero).
    pub fn delta_volume_pct(&self, previous: Option<&TokenSnapshot>) -> Option<f64> {
        let prev = previous?;
        if prev.volume24h <= 0.0 {
            return None;
        }
        Some((self.volume24h - prev.volume24h) / prev.volume24h)
    }

    /// Percent change in price relative to `previous`.
    pub fn delta_price_pct(&self, previous: Option<&TokenSnapshot>) -> Option<f64> {
        let prev = previous?;
        if prev.price_usd <= 0.0 {
            return None;
        }
        Some((self.price_usd - prev.price_usd) / prev.price_usd)
    }

    /// Signed holder-count delta relative to `previous`.
    pub fn delta_holders(&self, previous: Option<&TokenSnapshot>) -> Option<i64> {
        let prev = previous?;
        Some(self.holders as i64 - prev.holders as i64)
    }

    /// Percent change in liquidity relative to `previous`, or `None` if
    /// there is no previous snapshot (or its liquidity was zero).
    pub fn delta_liquidity_pct(&self, previous: Option<&TokenSnapshot>) -> Option<f64> {
        let prev = previous?;
        if prev.liquidity <= 0.0 {
            return None;
        }
        Some((self.liquidity - prev.liquidity) / prev.liquidity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(volume: f64, price: f64, holders: u64) -> TokenSnapshot {
        TokenSnapshot {
            address: "addr".into(),
            name: "Example Token".into(),
            symbol: "EXM".into(),
            market_cap: 50_000.0,
            volume24h: volume,
            liquidity: 10_000.0,
            holders,
            created_at: Utc::now(),
            creator: "creator".into(),
            social_links: SocialLinks::default(),
            price_usd: price,
            price_change24h: 0.0,
        }
    }

    #[test]
    fn delta_volume_none_without_previous() {
        let cur = snap(1000.0, 1.0, 100);
        assert_eq!(cur.delta_volume_pct(None), None);
    }

    #[test]
    fn delta_volume_computed_against_previous() {
        let prev = snap(1000.0, 1.0, 100);
        let cur = snap(600.0, 1.0, 100);
        let delta = cur.delta_volume_pct(Some(&prev)).unwrap();
        assert!((delta - (-0.4)).abs() < 1e-9);
    }

    #[test]
    fn delta_holders_signed() {
        let prev = snap(1000.0, 1.0, 100);
        let cur = snap(1000.0, 1.0, 90);
        assert_eq!(cur.delta_holders(Some(&prev)), Some(-10));
    }

    #[test]
    fn delta_liquidity_computed_against_previous() {
        let mut prev = snap(1000.0, 1.0, 100);
        prev.liquidity = 10_000.0;
        let mut cur = snap(1000.0, 1.0, 100);
        cur.liquidity = 6_000.0;
        let delta = cur.delta_liquidity_pct(Some(&prev)).unwrap();
        assert!((delta - (-0.4)).abs() < 1e-9);
    }
}
