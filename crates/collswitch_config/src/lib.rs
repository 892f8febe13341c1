//! Configuration for the adaptive allocation engine
//!
//! Centralized knobs for optimizer strategy, window sizing, convergence and
//! sampling. Values come from `Default`, environment variables, or a TOML
//! file when the `toml-config` feature is enabled.

use serde::{Deserialize, Serialize};
use std::path::Path;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Decision strategy used by the windowed optimizers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptimizerStrategy {
    /// Hand-coded threshold voting over observed operation ratios
    RuleBased,

    /// Polynomial cost-model scoring against a performance goal
    Empirical,
}

impl OptimizerStrategy {
    /// Get strategy name for display
    pub fn name(self) -> &'static str {
        match self {
            OptimizerStrategy::RuleBased => "RuleBased",
            OptimizerStrategy::Empirical => "Empirical",
        }
    }
}

/// Complete configuration for the adaptive engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaptiveConfig {
    /// Decision strategy for sequence contexts
    pub strategy: OptimizerStrategy,

    /// Number of container lifetimes observed per decision cycle
    pub window_size: usize,

    /// Minimum vote count required to commit a type (rule-based strategy)
    pub convergence_rate: usize,

    /// Fraction of the window that must have finished before the empirical
    /// strategy analyzes; 0 disables analysis, values above 1 require the
    /// full window
    pub finished_ratio: f64,

    /// Monitor every n-th allocation; 1 monitors everything
    pub sample_rate: usize,

    /// Initial capacity handed to containers before any convergence
    pub initial_capacity: usize,
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        Self {
            strategy: OptimizerStrategy::RuleBased,
            window_size: 32,
            convergence_rate: 21,
            finished_ratio: 0.8,
            sample_rate: 1,
            initial_capacity: 10,
        }
    }
}

impl AdaptiveConfig {
    /// Load configuration from environment variables
    ///
    /// Unparseable values fall back to the defaults; numeric knobs are
    /// clamped so the result is always usable.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("COLLSWITCH_STRATEGY") {
            config.strategy = match val.to_ascii_lowercase().as_str() {
                "empirical" => OptimizerStrategy::Empirical,
                _ => OptimizerStrategy::RuleBased,
            };
        }

        if let Ok(val) = std::env::var("COLLSWITCH_WINDOW_SIZE") {
            config.window_size = val.parse().unwrap_or(config.window_size);
        }

        if let Ok(val) = std::env::var("COLLSWITCH_CONVERGENCE_RATE") {
            config.convergence_rate = val.parse().unwrap_or(config.convergence_rate);
        }

        if let Ok(val) = std::env::var("COLLSWITCH_FINISHED_RATIO") {
            config.finished_ratio = val.parse().unwrap_or(config.finished_ratio);
        }

        if let Ok(val) = std::env::var("COLLSWITCH_SAMPLE_RATE") {
            config.sample_rate = val.parse().unwrap_or(config.sample_rate);
        }

        if let Ok(val) = std::env::var("COLLSWITCH_INITIAL_CAPACITY") {
            config.initial_capacity = val.parse().unwrap_or(config.initial_capacity);
        }

        config.sanitized()
    }

    /// Load configuration from TOML file
    #[cfg(feature = "toml-config")]
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: AdaptiveConfig = toml::from_str(&contents)?;
        Ok(config.sanitized())
    }

    /// Load configuration from TOML file (stub when the toml feature is disabled)
    #[cfg(not(feature = "toml-config"))]
    pub fn from_file(_path: &Path) -> anyhow::Result<Self> {
        anyhow::bail!("TOML support not enabled. Enable the 'toml-config' feature.")
    }

    /// Save configuration to TOML file
    #[cfg(feature = "toml-config")]
    pub fn save_to_file(&self, path: &Path) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Save configuration to TOML file (stub when the toml feature is disabled)
    #[cfg(not(feature = "toml-config"))]
    pub fn save_to_file(&self, _path: &Path) -> anyhow::Result<()> {
        anyhow::bail!("TOML support not enabled. Enable the 'toml-config' feature.")
    }

    /// Clamp every knob into its usable range
    pub fn sanitized(mut self) -> Self {
        self.window_size = self.window_size.max(1);
        self.convergence_rate = self.convergence_rate.min(self.window_size);
        if !self.finished_ratio.is_finite() || self.finished_ratio < 0.0 {
            self.finished_ratio = 0.0;
        }
        self.sample_rate = self.sample_rate.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_sane() {
        let config = AdaptiveConfig::default();
        assert_eq!(config.strategy, OptimizerStrategy::RuleBased);
        assert!(config.window_size > 0);
        assert!(config.convergence_rate <= config.window_size);
        assert!(config.sample_rate >= 1);
    }

    #[test]
    fn test_sanitized_clamps_degenerate_values() {
        let config = AdaptiveConfig {
            window_size: 0,
            convergence_rate: 99,
            finished_ratio: f64::NAN,
            sample_rate: 0,
            ..AdaptiveConfig::default()
        }
        .sanitized();

        assert_eq!(config.window_size, 1);
        assert_eq!(config.convergence_rate, 1);
        assert_eq!(config.finished_ratio, 0.0);
        assert_eq!(config.sample_rate, 1);
    }

    #[test]
    fn test_strategy_names() {
        assert_eq!(OptimizerStrategy::RuleBased.name(), "RuleBased");
        assert_eq!(OptimizerStrategy::Empirical.name(), "Empirical");
    }
}
