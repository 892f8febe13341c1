//! Process-wide adaptive manager
//!
//! Bundles one context per container kind, built from `AdaptiveConfig`. The
//! rule-based strategy only exists for sequences; sets and maps always run
//! the empirical strategy over the baseline fitted models.

use std::sync::Arc;

use collswitch_config::{AdaptiveConfig, OptimizerStrategy};
use once_cell::sync::Lazy;

use crate::containers::{MapKind, SequenceKind, SetKind};
use crate::context::{MapContext, SequenceContext, SetContext};
use crate::error::ConfigError;
use crate::model::{
    EmpiricalEvaluator, default_map_models, default_sequence_models, default_set_models,
};
use crate::optimizers::{
    AllocationOptimizer, EmpiricalOptimizer, PerformanceGoal, RuleBasedSequenceOptimizer,
};

pub struct AdaptiveManager {
    config: AdaptiveConfig,
    sequences: Arc<SequenceContext>,
    sets: Arc<SetContext>,
    maps: Arc<MapContext>,
}

impl AdaptiveManager {
    pub fn new(config: AdaptiveConfig) -> Result<Self, ConfigError> {
        let sequence_optimizer: Arc<dyn AllocationOptimizer<SequenceKind>> = match config.strategy
        {
            OptimizerStrategy::RuleBased => Arc::new(RuleBasedSequenceOptimizer::new(
                config.window_size,
                config.convergence_rate,
            )?),
            OptimizerStrategy::Empirical => Arc::new(EmpiricalOptimizer::new(
                EmpiricalEvaluator::new(default_sequence_models()),
                SequenceKind::Array,
                PerformanceGoal::default(),
                config.window_size,
                config.finished_ratio,
            )?),
        };

        let set_optimizer = Arc::new(EmpiricalOptimizer::new(
            EmpiricalEvaluator::new(default_set_models()),
            SetKind::Hash,
            PerformanceGoal::default(),
            config.window_size,
            config.finished_ratio,
        )?);

        let map_optimizer = Arc::new(EmpiricalOptimizer::new(
            EmpiricalEvaluator::new(default_map_models()),
            MapKind::Hash,
            PerformanceGoal::default(),
            config.window_size,
            config.finished_ratio,
        )?);

        let sequences = SequenceContext::with_config(
            sequence_optimizer,
            SequenceKind::Array,
            config.initial_capacity,
            config.sample_rate,
        );
        let sets = SetContext::with_config(
            set_optimizer,
            SetKind::Hash,
            config.initial_capacity,
            config.sample_rate,
        );
        let maps = MapContext::with_config(
            map_optimizer,
            MapKind::Hash,
            config.initial_capacity,
            config.sample_rate,
        );

        Ok(Self {
            config,
            sequences,
            sets,
            maps,
        })
    }

    pub fn config(&self) -> &AdaptiveConfig {
        &self.config
    }

    pub fn sequences(&self) -> &Arc<SequenceContext> {
        &self.sequences
    }

    pub fn sets(&self) -> &Arc<SetContext> {
        &self.sets
    }

    pub fn maps(&self) -> &Arc<MapContext> {
        &self.maps
    }
}

/// Global manager, configured from the environment on first use
static GLOBAL_MANAGER: Lazy<AdaptiveManager> = Lazy::new(|| {
    let config = AdaptiveConfig::from_env();
    AdaptiveManager::new(config).unwrap_or_else(|err| {
        tracing::warn!(%err, "invalid adaptive configuration, falling back to defaults");
        AdaptiveManager::new(AdaptiveConfig::default()).expect("default configuration is valid")
    })
});

/// Get the global adaptive manager
pub fn global() -> &'static AdaptiveManager {
    &GLOBAL_MANAGER
}
