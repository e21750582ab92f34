//! Engine configuration: JSON document plus `STOCKROUTE_*` environment overrides.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use stockroute_core::EngineError;
use stockroute_distribution::SolverConfig;
use stockroute_inventory::GridConfig;
use stockroute_network::LayoutConfig;

pub const SOLVER_MAX_PIVOTS_ENV: &str = "STOCKROUTE_SOLVER_MAX_PIVOTS";
pub const LAYOUT_MAX_ITERATIONS_ENV: &str = "STOCKROUTE_LAYOUT_MAX_ITERATIONS";
pub const LAYOUT_CONVERGENCE_ENV: &str = "STOCKROUTE_LAYOUT_CONVERGENCE";
pub const LAYOUT_SEED_ENV: &str = "STOCKROUTE_LAYOUT_SEED";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Invalid(#[from] EngineError),
}

/// Settings for every engine stage. Missing JSON fields take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub solver: SolverConfig,
    pub layout: LayoutConfig,
    pub sensitivity: GridConfig,
}

impl EngineConfig {
    /// Parse and validate a JSON configuration document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults with environment overrides applied.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`; unparsable values are logged and skipped.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(max_pivots) = parse_override(&lookup, SOLVER_MAX_PIVOTS_ENV) {
            self.solver.max_pivots = max_pivots;
        }
        if let Some(iterations) = parse_override(&lookup, LAYOUT_MAX_ITERATIONS_ENV) {
            self.layout.max_iterations = iterations;
        }
        if let Some(threshold) = parse_override::<f64>(&lookup, LAYOUT_CONVERGENCE_ENV) {
            if threshold.is_finite() && threshold >= 0.0 {
                self.layout.convergence_threshold = threshold;
            } else {
                tracing::warn!(
                    key = LAYOUT_CONVERGENCE_ENV,
                    value = threshold,
                    "ignoring negative or non-finite convergence threshold"
                );
            }
        }
        if let Some(seed) = parse_override(&lookup, LAYOUT_SEED_ENV) {
            self.layout.seed = seed;
        }
        self
    }

    pub fn with_solver(mut self, solver: SolverConfig) -> Self {
        self.solver = solver;
        self
    }

    pub fn with_layout(mut self, layout: LayoutConfig) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_sensitivity(mut self, sensitivity: GridConfig) -> Self {
        self.sensitivity = sensitivity;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.layout.validate()?;
        self.sensitivity.validate()?;
        Ok(())
    }
}

fn parse_override<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparsable configuration override");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_document_is_all_defaults() {
        let config = EngineConfig::from_json_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.layout.max_iterations, 50);
        assert_eq!(config.solver.max_pivots, 100_000);
        assert_eq!(config.sensitivity.demand_factors.first(), Some(&50));
    }

    #[test]
    fn partial_document_keeps_other_defaults() {
        let config = EngineConfig::from_json_str(
            r#"{"layout": {"seed": 9, "canvas": {"width": 1000}}, "solver": {"max_pivots": 10}}"#,
        )
        .unwrap();

        assert_eq!(config.layout.seed, 9);
        assert_eq!(config.layout.canvas.width, 1000.0);
        assert_eq!(config.layout.canvas.height, 500.0);
        assert_eq!(config.layout.repulsion_cutoff, 200.0);
        assert_eq!(config.solver.max_pivots, 10);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = EngineConfig::from_json_str(r#"{"layout": {"row_damping": 2.0}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = EngineConfig::from_json_str(r#"{"sensitivity": {"demand_factors": []}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = EngineConfig::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn overrides_apply_and_bad_values_are_ignored() {
        let config = EngineConfig::default().with_overrides(lookup(&[
            (SOLVER_MAX_PIVOTS_ENV, "250"),
            (LAYOUT_MAX_ITERATIONS_ENV, "many"),
            (LAYOUT_CONVERGENCE_ENV, "-1"),
            (LAYOUT_SEED_ENV, " 17 "),
        ]));

        assert_eq!(config.solver.max_pivots, 250);
        assert_eq!(config.layout.max_iterations, 50);
        assert_eq!(config.layout.convergence_threshold, 1e-3);
        assert_eq!(config.layout.seed, 17);
    }
}
