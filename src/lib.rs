//! Online-adaptive selection of container implementations
//!
//! Application code asks an allocation context for a sequence, set or map and
//! gets a transparently monitored container of the currently best-known
//! representation. Monitoring wrappers count operations per instance and
//! report on drop; after a window of container lifetimes, the wired optimizer
//! (threshold voting or empirical cost-model scoring) re-decides the
//! representation handed out to the next generation of containers.

pub mod containers;
pub mod context;
pub mod error;
pub mod manager;
pub mod model;
pub mod monitors;
pub mod optimizers;
pub mod utils;

pub use collswitch_config::{AdaptiveConfig, OptimizerStrategy};

pub use containers::{CandidateKind, Map, MapKind, Sequence, SequenceKind, Set, SetKind};
pub use context::{AllocationContextState, MapContext, SequenceContext, SetContext};
pub use error::ConfigError;
pub use manager::{AdaptiveManager, global};
pub use model::{EmpiricalEvaluator, PerformanceDimension, PerformanceModel};
pub use monitors::{MonitoredMap, MonitoredSequence, MonitoredSet};
pub use optimizers::{
    AllocationOptimizer, EmpiricalOptimizer, MinorGoal, OptimizerStats, PerformanceGoal,
    RuleBasedSequenceOptimizer,
};
