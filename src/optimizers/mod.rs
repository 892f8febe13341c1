//! Windowed allocation optimizers
//!
//! An optimizer watches a fixed number of container lifetimes (the window),
//! turns the batch of finalize reports into a representation decision, pushes
//! the decision into its allocation context, and resets for the next window.
//! Two strategies are provided: threshold voting and empirical cost-model
//! scoring.

pub mod empirical;
pub mod rule_based;

pub use empirical::{EmpiricalOptimizer, MinorGoal, PerformanceGoal};
pub use rule_based::RuleBasedSequenceOptimizer;

use std::sync::Weak;

use crate::containers::CandidateKind;
use crate::monitors::{OperationMix, SlotToken};

/// Decision outlet implemented by allocation contexts
///
/// Invoked only from inside a window analysis pass.
pub trait DecisionSink<K: CandidateKind>: Send + Sync {
    /// Commit a converged type and capacity hint (rule-based path)
    fn optimize_collection_type(&self, kind: K, capacity: usize);

    /// Commit a type without touching the capacity hint (empirical path)
    fn update_collection_type(&self, kind: K);

    /// A window completed without convergence; only the hint changes
    fn no_collection_type_convergence(&self, capacity: usize);
}

/// Windowed optimizer surface consumed by contexts and wrappers
pub trait AllocationOptimizer<K: CandidateKind>: Send + Sync {
    /// Claim a slot in the current window
    ///
    /// Returns `None` when the window is exhausted; callers fall back to an
    /// unmonitored allocation instead of failing.
    fn acquire_slot(&self) -> Option<SlotToken>;

    /// Size-only finalize report, for containers observed without operation
    /// accounting
    fn record_size(&self, token: SlotToken, size: usize);

    /// Full finalize report with the observed operation mix
    fn record_usage(&self, token: SlotToken, mix: &OperationMix, size: usize);

    /// Wire the owning context; must happen before the first window fills
    fn attach_context(&self, context: Weak<dyn DecisionSink<K>>);

    /// Snapshot of window accounting, for introspection and tests
    fn stats(&self) -> OptimizerStats;
}

/// Window accounting snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptimizerStats {
    /// Current window generation, advanced by every reset
    pub generation: u64,

    /// Slots handed out in the current window
    pub slots_acquired: usize,

    /// Finalize reports attributed to the current window
    pub finalized: usize,

    /// Analysis passes run since construction
    pub analyses: u64,
}
