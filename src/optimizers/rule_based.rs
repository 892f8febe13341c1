//! Rule-based voting optimizer for sequences
//!
//! Every finalized container casts one vote, classified by hand-coded
//! thresholds over its operation ratios. The window-filling finalize call
//! runs the analysis synchronously: the first candidate in Array, Linked,
//! Hash order whose votes exceed the convergence rate wins; otherwise the
//! window ends in no-convergence and only the capacity hint moves. Both the
//! evaluation order and the Array vote cast on size-only reports are
//! deliberate biases carried over from the original tuning.

use parking_lot::{Mutex, RwLock};
use std::sync::Weak;

use tracing::{debug, trace, warn};

use crate::containers::{CandidateKind, SequenceKind};
use crate::error::ConfigError;
use crate::monitors::{OperationKind, OperationMix, SlotToken};
use crate::utils::median;

use super::{AllocationOptimizer, DecisionSink, OptimizerStats};

/// Containment count above which a container votes for hash backing
pub const CONTAINS_HASH_THRESHOLD: u64 = 16;

/// Mid-access to index-access ratio above which a container votes linked
pub const MIDLIST_LINKED_THRESHOLD: u64 = 3;

struct Window {
    generation: u64,
    next_slot: usize,
    finalized: usize,
    votes: [usize; SequenceKind::COUNT],
    sizes: Vec<usize>,
}

/// Threshold-voting optimizer over a fixed observation window
pub struct RuleBasedSequenceOptimizer {
    window_size: usize,
    convergence_rate: usize,
    window: Mutex<Window>,
    context: RwLock<Option<Weak<dyn DecisionSink<SequenceKind>>>>,
    analyses: std::sync::atomic::AtomicU64,
}

impl RuleBasedSequenceOptimizer {
    pub fn new(window_size: usize, convergence_rate: usize) -> Result<Self, ConfigError> {
        if window_size == 0 {
            return Err(ConfigError::ZeroWindow);
        }
        if convergence_rate > window_size {
            return Err(ConfigError::ConvergenceOutOfRange {
                rate: convergence_rate,
                window: window_size,
            });
        }

        Ok(Self {
            window_size,
            convergence_rate,
            window: Mutex::new(Window {
                generation: 0,
                next_slot: 0,
                finalized: 0,
                votes: [0; SequenceKind::COUNT],
                sizes: vec![0; window_size],
            }),
            context: RwLock::new(None),
            analyses: std::sync::atomic::AtomicU64::new(0),
        })
    }

    fn classify(mix: &OperationMix) -> SequenceKind {
        let contains = mix.count(OperationKind::Contains);
        let mid = mix.count(OperationKind::MidAccess);
        let index = mix.count(OperationKind::IndexAccess);

        if contains > CONTAINS_HASH_THRESHOLD {
            SequenceKind::Hash
        } else if mid > MIDLIST_LINKED_THRESHOLD * index {
            SequenceKind::Linked
        } else {
            SequenceKind::Array
        }
    }

    fn record_vote(&self, token: SlotToken, vote: SequenceKind, size: usize) {
        let mut window = self.window.lock();
        if token.generation != window.generation {
            trace!(
                slot = token.index,
                generation = token.generation,
                "discarding finalize report from a reset window"
            );
            return;
        }

        window.sizes[token.index] = size;
        window.votes[vote.ordinal()] += 1;
        window.finalized += 1;

        if window.finalized == self.window_size {
            self.analyze_and_reset(&mut window);
        }
    }

    /// Decide, commit, reset. Runs inside the window lock, so analysis for a
    /// generation happens-before any slot of the next generation is handed
    /// out.
    fn analyze_and_reset(&self, window: &mut Window) {
        let capacity = median(&window.sizes);

        let winner = [SequenceKind::Array, SequenceKind::Linked, SequenceKind::Hash]
            .into_iter()
            .find(|kind| window.votes[kind.ordinal()] > self.convergence_rate);

        match self.context.read().as_ref().and_then(Weak::upgrade) {
            Some(context) => match winner {
                Some(kind) => {
                    debug!(
                        kind = kind.label(),
                        capacity,
                        votes = window.votes[kind.ordinal()],
                        generation = window.generation,
                        "window converged"
                    );
                    context.optimize_collection_type(kind, capacity);
                }
                None => {
                    debug!(
                        capacity,
                        generation = window.generation,
                        "window ended without convergence"
                    );
                    context.no_collection_type_convergence(capacity);
                }
            },
            None => warn!("window analyzed with no context attached; decision dropped"),
        }

        window.generation += 1;
        window.next_slot = 0;
        window.finalized = 0;
        window.votes = [0; SequenceKind::COUNT];
        self.analyses
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
    }
}

impl AllocationOptimizer<SequenceKind> for RuleBasedSequenceOptimizer {
    fn acquire_slot(&self) -> Option<SlotToken> {
        let mut window = self.window.lock();
        if window.next_slot >= self.window_size {
            return None;
        }
        let token = SlotToken {
            generation: window.generation,
            index: window.next_slot,
        };
        window.next_slot += 1;
        Some(token)
    }

    fn record_size(&self, token: SlotToken, size: usize) {
        // Size-only reports always vote for array backing.
        self.record_vote(token, SequenceKind::Array, size);
    }

    fn record_usage(&self, token: SlotToken, mix: &OperationMix, size: usize) {
        self.record_vote(token, Self::classify(mix), size);
    }

    fn attach_context(&self, context: Weak<dyn DecisionSink<SequenceKind>>) {
        *self.context.write() = Some(context);
    }

    fn stats(&self) -> OptimizerStats {
        let window = self.window.lock();
        OptimizerStats {
            generation: window.generation,
            slots_acquired: window.next_slot,
            finalized: window.finalized,
            analyses: self.analyses.load(std::sync::atomic::Ordering::Relaxed),
        }
    }
}
