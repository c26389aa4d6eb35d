// =============================================================================
// Shared small types used across the trading engine
// =============================================================================

use serde::{Deserialize, Serialize};

/// Lifecycle of the `TradingEngine` as exposed to the control surface.
/// `Stopped -> Running -> Stopped` is the normal cycle; `Killed` is a
/// terminal state reachable only via the `kill` control and never left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineStatus {
    Stopped,
    Running,
    Killed,
}

impl Default for EngineStatus {
    fn default() -> Self {
        Self::Stopped
    }
}

impl std::fmt::Display for EngineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stopped => write!(f, "stopped"),
            Self::Running => write!(f, "running"),
            Self::Killed => write!(f, "killed"),
        }
    }
}

/// Whether fills are synthesized (paper) or routed to a live venue (real).
/// The real path is an explicit non-goal and exists only as a second
/// `ExecutionAdapter` implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    Paper,
    Real,
}

impl Default for ExecutionMode {
    fn default() -> Self {
        Self::Paper
    }
}

impl std::fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Paper => write!(f, "paper"),
            Self::Real => write!(f, "real"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_status_defaults_to_stopped() {
        assert_eq!(EngineStatus::default(), EngineStatus::Stopped);
    }

    #[test]
    fn execution_mode_defaults_to_paper() {
        assert_eq!(ExecutionMode::default(), ExecutionMode::Paper);
    }

    #[test]
    fn display_uses_snake_case_strings() {
        assert_eq!(EngineStatus::Running.to_string(), "running");
        assert_eq!(ExecutionMode::Real.to_string(), "real");
    }
}
