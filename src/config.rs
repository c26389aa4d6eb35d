// =============================================================================
// Engine configuration — hot-reloadable tunables with atomic save
// =============================================================================
//
// Every field carries a serde default so a partial or missing config file
// still produces a complete, valid config. Persistence uses the same
// tmp-then-rename atomic write this codebase already uses elsewhere.
//
// =============================================================================

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::types::ExecutionMode;

fn default_population_size() -> usize {
    20
}

fn default_survivor_percent() -> f64 {
    0.2
}

fn default_dead_percent() -> f64 {
    0.2
}

fn default_mutation_rate() -> f64 {
    0.15
}

fn default_total_sol() -> f64 {
    10.0
}

fn default_reserve_percent() -> f64 {
    0.1
}

fn default_max_allocation_per_strategy() -> f64 {
    5.0
}

fn default_wallet_per_agent() -> f64 {
    0.5
}

fn default_monitor_interval_secs() -> u64 {
    20
}

fn default_full_scan_interval_secs() -> u64 {
    60
}

fn default_max_concurrent_trades() -> usize {
    10
}

fn default_slippage() -> f64 {
    0.02
}

fn default_evolution_cron() -> String {
    "0 0 0 * * *".to_string()
}

fn default_listings_interval_ms() -> u64 {
    4_000
}

/// Top-level engine configuration. Every tunable the genetic engine,
/// treasury, monitor, trading engine, and scheduler need lives here so
/// the binary can be reconfigured without a restart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_population_size")]
    pub population_size: usize,
    #[serde(default = "default_survivor_percent")]
    pub survivor_percent: f64,
    #[serde(default = "default_dead_percent")]
    pub dead_percent: f64,
    #[serde(default = "default_mutation_rate")]
    pub mutation_rate: f64,

    #[serde(default = "default_total_sol")]
    pub total_sol: f64,
    #[serde(default = "default_reserve_percent")]
    pub reserve_percent: f64,
    #[serde(default = "default_max_allocation_per_strategy")]
    pub max_allocation_per_strategy: f64,
    #[serde(default = "default_wallet_per_agent")]
    pub wallet_per_agent: f64,

    #[serde(default = "default_monitor_interval_secs")]
    pub monitor_interval_secs: u64,
    #[serde(default = "default_full_scan_interval_secs")]
    pub full_scan_interval_secs: u64,
    #[serde(default = "default_max_concurrent_trades")]
    pub max_concurrent_trades: usize,

    #[serde(default = "default_slippage")]
    pub slippage: f64,
    #[serde(default)]
    pub execution_mode: ExecutionMode,

    #[serde(default = "default_evolution_cron")]
    pub evolution_cron: String,

    #[serde(default = "default_listings_interval_ms")]
    pub listings_interval_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            population_size: default_population_size(),
            survivor_percent: default_survivor_percent(),
            dead_percent: default_dead_percent(),
            mutation_rate: default_mutation_rate(),
            total_sol: default_total_sol(),
            reserve_percent: default_reserve_percent(),
            max_allocation_per_strategy: default_max_allocation_per_strategy(),
            wallet_per_agent: default_wallet_per_agent(),
            monitor_interval_secs: default_monitor_interval_secs(),
            full_scan_interval_secs: default_full_scan_interval_secs(),
            max_concurrent_trades: default_max_concurrent_trades(),
            slippage: default_slippage(),
            execution_mode: ExecutionMode::Paper,
            evolution_cron: default_evolution_cron(),
            listings_interval_ms: default_listings_interval_ms(),
        }
    }
}

impl EngineConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read engine config from {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse engine config from {}", path.display()))?;
        info!(path = %path.display(), population_size = config.population_size, "engine config loaded");
        Ok(config)
    }

    /// Load from `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if path.exists() {
            match Self::load(path) {
                Ok(cfg) => return cfg,
                Err(e) => tracing::warn!(error = %e, "falling back to default engine config"),
            }
        }
        Self::default()
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = serde_json::to_string_pretty(self).context("failed to serialise engine config")?;
        let tmp_path = path.with_extension("json.tmp");
        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;
        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;
        info!(path = %path.display(), "engine config saved (atomic)");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_scenario_2_treasury_numbers() {
        let cfg = EngineConfig::default();
        assert!((cfg.total_sol - 10.0).abs() < 1e-9);
        assert!((cfg.reserve_percent - 0.1).abs() < 1e-9);
        assert!((cfg.max_allocation_per_strategy - 5.0).abs() < 1e-9);
    }

    #[test]
    fn deserialise_empty_json_uses_defaults() {
        let cfg: EngineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.population_size, 20);
        assert!((cfg.mutation_rate - 0.15).abs() < 1e-9);
        assert_eq!(cfg.execution_mode, ExecutionMode::Paper);
    }

    #[test]
    fn deserialise_partial_json_fills_defaults() {
        let json = r#"{ "population_size": 50, "execution_mode": "real" }"#;
        let cfg: EngineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.population_size, 50);
        assert_eq!(cfg.execution_mode, ExecutionMode::Real);
        assert!((cfg.slippage - 0.02).abs() < 1e-9);
    }

    #[test]
    fn save_then_load_roundtrips() {
        let dir = std::env::temp_dir().join(format!("engine-config-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");
        let mut cfg = EngineConfig::default();
        cfg.population_size = 42;
        cfg.save(&path).unwrap();
        let loaded = EngineConfig::load(&path).unwrap();
        assert_eq!(loaded.population_size, 42);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn load_or_default_falls_back_when_missing() {
        let cfg = EngineConfig::load_or_default("/nonexistent/path/engine-config.json");
        assert_eq!(cfg.population_size, 20);
    }
}
