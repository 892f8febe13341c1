//! Empirical performance-model optimizer
//!
//! Generic over the candidate enumeration, so sequences, sets and maps share
//! one implementation. Once enough of the window has finished, every
//! candidate is scored by its fitted cost curves against the observed
//! operation mixes; candidates must beat the default type by the goal's
//! improvement factor (and stay within the minor penalty bound when one is
//! configured) to be considered at all.

use parking_lot::{Mutex, RwLock};
use std::sync::Weak;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, trace, warn};

use crate::containers::CandidateKind;
use crate::error::ConfigError;
use crate::model::{EmpiricalEvaluator, PerformanceDimension};
use crate::monitors::{OperationMix, SlotToken, UsageRecord};

use super::{AllocationOptimizer, DecisionSink, OptimizerStats};

/// Optimization objective for the empirical strategy
#[derive(Debug, Clone)]
pub struct PerformanceGoal {
    /// Dimension that must improve
    pub major: PerformanceDimension,

    /// Required `default cost / candidate cost` ratio on the major dimension
    pub min_improvement: f64,

    /// Optional secondary constraint a candidate must also satisfy
    pub minor: Option<MinorGoal>,
}

/// Secondary performance constraint
#[derive(Debug, Clone)]
pub struct MinorGoal {
    pub dimension: PerformanceDimension,

    /// Maximum tolerated `default cost / candidate cost` shortfall; the
    /// candidate's ratio must stay above this bound
    pub max_penalty: f64,
}

impl Default for PerformanceGoal {
    fn default() -> Self {
        Self {
            major: PerformanceDimension::Contains,
            min_improvement: 1.2,
            minor: None,
        }
    }
}

struct Window {
    generation: u64,
    next_slot: usize,
    records: Vec<UsageRecord>,
}

/// Cost-model scoring optimizer over a fixed observation window
pub struct EmpiricalOptimizer<K: CandidateKind> {
    window_size: usize,

    /// Finalized-record count that triggers analysis; `None` disables it
    finished_threshold: Option<usize>,

    default_kind: K,
    evaluator: EmpiricalEvaluator<K>,
    goal: PerformanceGoal,
    window: Mutex<Window>,
    context: RwLock<Option<Weak<dyn DecisionSink<K>>>>,
    analyses: AtomicU64,
}

impl<K: CandidateKind> EmpiricalOptimizer<K> {
    pub fn new(
        evaluator: EmpiricalEvaluator<K>,
        default_kind: K,
        goal: PerformanceGoal,
        window_size: usize,
        finished_ratio: f64,
    ) -> Result<Self, ConfigError> {
        if window_size == 0 {
            return Err(ConfigError::ZeroWindow);
        }
        if !finished_ratio.is_finite() || finished_ratio < 0.0 {
            return Err(ConfigError::InvalidFinishedRatio {
                ratio: finished_ratio,
            });
        }

        let finished_threshold = if finished_ratio == 0.0 {
            None
        } else if finished_ratio > 1.0 {
            Some(window_size)
        } else {
            Some(((window_size as f64 * finished_ratio).ceil() as usize).max(1))
        };

        Ok(Self {
            window_size,
            finished_threshold,
            default_kind,
            evaluator,
            goal,
            window: Mutex::new(Window {
                generation: 0,
                next_slot: 0,
                records: Vec::with_capacity(window_size),
            }),
            context: RwLock::new(None),
            analyses: AtomicU64::new(0),
        })
    }

    /// Candidates whose major/minor ratio against the default clears `factor`
    ///
    /// A candidate with zero predicted cost is infinitely better than the
    /// default and always survives; a missing or zero-cost default makes the
    /// ratio collapse and no candidate survives, leaving the default in
    /// force.
    fn candidates(
        &self,
        records: &[UsageRecord],
        dimension: PerformanceDimension,
        factor: f64,
    ) -> Vec<(K, f64)> {
        let costs = self.evaluator.predict_performance(records, dimension);
        let default_cost = costs
            .iter()
            .find(|(kind, _)| *kind == self.default_kind)
            .map(|(_, cost)| *cost)
            .unwrap_or(0.0);

        costs
            .into_iter()
            .filter(|(_, cost)| default_cost / cost > factor)
            .collect()
    }

    fn analyze_and_reset(&self, window: &mut Window) {
        let records = std::mem::take(&mut window.records);

        let major = self.candidates(&records, self.goal.major, self.goal.min_improvement);
        let survivors: Vec<(K, f64)> = match &self.goal.minor {
            Some(minor) => {
                let minor_candidates =
                    self.candidates(&records, minor.dimension, minor.max_penalty);
                major
                    .into_iter()
                    .filter(|(kind, _)| {
                        minor_candidates
                            .iter()
                            .any(|(minor_kind, _)| minor_kind == kind)
                    })
                    .collect()
            }
            None => major,
        };

        let champion = survivors
            .into_iter()
            .min_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(kind, _)| kind)
            .unwrap_or(self.default_kind);

        match self.context.read().as_ref().and_then(Weak::upgrade) {
            Some(context) => {
                debug!(
                    kind = champion.label(),
                    records = records.len(),
                    generation = window.generation,
                    "empirical window analyzed"
                );
                context.update_collection_type(champion);
            }
            None => warn!("window analyzed with no context attached; decision dropped"),
        }

        window.generation += 1;
        window.next_slot = 0;
        self.analyses.fetch_add(1, Ordering::Relaxed);
    }

    fn record(&self, token: SlotToken, record: UsageRecord) {
        let mut window = self.window.lock();
        if token.generation != window.generation {
            trace!(
                slot = token.index,
                generation = token.generation,
                "discarding finalize report from a reset window"
            );
            return;
        }

        window.records.push(record);

        if let Some(threshold) = self.finished_threshold {
            if window.records.len() >= threshold {
                self.analyze_and_reset(&mut window);
            }
        }
    }
}

impl<K: CandidateKind> AllocationOptimizer<K> for EmpiricalOptimizer<K> {
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
        self.record(
            token,
            UsageRecord {
                mix: OperationMix::new(),
                final_size: size,
            },
        );
    }

    fn record_usage(&self, token: SlotToken, mix: &OperationMix, size: usize) {
        self.record(
            token,
            UsageRecord {
                mix: mix.clone(),
                final_size: size,
            },
        );
    }

    fn attach_context(&self, context: Weak<dyn DecisionSink<K>>) {
        *self.context.write() = Some(context);
    }

    fn stats(&self) -> OptimizerStats {
        let window = self.window.lock();
        OptimizerStats {
            generation: window.generation,
            slots_acquired: window.next_slot,
            finalized: window.records.len(),
            analyses: self.analyses.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::containers::SequenceKind;
    use crate::model::PerformanceModel;
    use crate::monitors::OperationKind;
    use parking_lot::Mutex as PlainMutex;
    use std::sync::Arc;

    #[derive(Default)]
    struct RecordingSink {
        updated: PlainMutex<Vec<SequenceKind>>,
    }

    impl DecisionSink<SequenceKind> for RecordingSink {
        fn optimize_collection_type(&self, _kind: SequenceKind, _capacity: usize) {}

        fn update_collection_type(&self, kind: SequenceKind) {
            self.updated.lock().push(kind);
        }

        fn no_collection_type_convergence(&self, _capacity: usize) {}
    }

    /// Flat per-operation costs: array contains 4, hash contains 1
    fn evaluator() -> EmpiricalEvaluator<SequenceKind> {
        EmpiricalEvaluator::new(vec![
            PerformanceModel::new(SequenceKind::Array, vec![4.0], vec![1.0], vec![1.0]),
            PerformanceModel::new(SequenceKind::Linked, vec![3.0], vec![2.0], vec![4.0]),
            PerformanceModel::new(SequenceKind::Hash, vec![1.0], vec![3.0], vec![1.0]),
        ])
    }

    fn wired(
        goal: PerformanceGoal,
        window_size: usize,
        finished_ratio: f64,
    ) -> (Arc<EmpiricalOptimizer<SequenceKind>>, Arc<RecordingSink>) {
        let optimizer = Arc::new(
            EmpiricalOptimizer::new(
                evaluator(),
                SequenceKind::Array,
                goal,
                window_size,
                finished_ratio,
            )
            .expect("valid"),
        );
        let sink = Arc::new(RecordingSink::default());
        optimizer.attach_context(Arc::downgrade(&sink) as Weak<dyn DecisionSink<SequenceKind>>);
        (optimizer, sink)
    }

    fn contains_mix(count: u64) -> OperationMix {
        let mix = OperationMix::new();
        for _ in 0..count {
            mix.record(OperationKind::Contains);
        }
        mix
    }

    #[test]
    fn test_constructor_validation() {
        assert_eq!(
            EmpiricalOptimizer::new(
                evaluator(),
                SequenceKind::Array,
                PerformanceGoal::default(),
                0,
                0.5,
            )
            .err(),
            Some(ConfigError::ZeroWindow)
        );
        assert!(
            EmpiricalOptimizer::new(
                evaluator(),
                SequenceKind::Array,
                PerformanceGoal::default(),
                4,
                -1.0,
            )
            .is_err()
        );
    }

    #[test]
    fn test_contains_goal_selects_cheaper_candidate() {
        let goal = PerformanceGoal {
            major: PerformanceDimension::Contains,
            min_improvement: 2.0,
            minor: None,
        };
        let (optimizer, sink) = wired(goal, 4, 1.0);

        for _ in 0..4 {
            let token = optimizer.acquire_slot().expect("free slot");
            // array contains-cost 4/op, hash 1/op: ratio 4 > 2
            optimizer.record_usage(token, &contains_mix(10), 16);
        }

        assert_eq!(sink.updated.lock().as_slice(), &[SequenceKind::Hash]);
    }

    #[test]
    fn test_minor_goal_filters_major_candidates() {
        // hash wins contains 4x, but its populate ratio 1/3 fails a minor
        // bound of 0.5; linked passes neither
        let goal = PerformanceGoal {
            major: PerformanceDimension::Contains,
            min_improvement: 2.0,
            minor: Some(MinorGoal {
                dimension: PerformanceDimension::Populate,
                max_penalty: 0.5,
            }),
        };
        let (optimizer, sink) = wired(goal, 2, 1.0);

        for _ in 0..2 {
            let token = optimizer.acquire_slot().expect("free slot");
            let mix = contains_mix(10);
            mix.record(OperationKind::Populate);
            optimizer.record_usage(token, &mix, 16);
        }

        assert_eq!(sink.updated.lock().as_slice(), &[SequenceKind::Array]);
    }

    #[test]
    fn test_no_surviving_candidate_keeps_default() {
        let goal = PerformanceGoal {
            major: PerformanceDimension::Contains,
            min_improvement: 100.0,
            minor: None,
        };
        let (optimizer, sink) = wired(goal, 2, 1.0);

        for _ in 0..2 {
            let token = optimizer.acquire_slot().expect("free slot");
            optimizer.record_usage(token, &contains_mix(10), 16);
        }

        assert_eq!(sink.updated.lock().as_slice(), &[SequenceKind::Array]);
    }

    #[test]
    fn test_zero_candidate_cost_is_infinitely_better() {
        let evaluator = EmpiricalEvaluator::new(vec![
            PerformanceModel::new(SequenceKind::Array, vec![4.0], vec![1.0], vec![1.0]),
            PerformanceModel::new(SequenceKind::Hash, vec![0.0], vec![1.0], vec![1.0]),
        ]);
        let optimizer = Arc::new(
            EmpiricalOptimizer::new(
                evaluator,
                SequenceKind::Array,
                PerformanceGoal {
                    major: PerformanceDimension::Contains,
                    min_improvement: 1_000_000.0,
                    minor: None,
                },
                1,
                1.0,
            )
            .expect("valid"),
        );
        let sink = Arc::new(RecordingSink::default());
        optimizer.attach_context(Arc::downgrade(&sink) as Weak<dyn DecisionSink<SequenceKind>>);

        let token = optimizer.acquire_slot().expect("free slot");
        optimizer.record_usage(token, &contains_mix(5), 8);

        assert_eq!(sink.updated.lock().as_slice(), &[SequenceKind::Hash]);
    }

    #[test]
    fn test_zero_ratio_disables_analysis() {
        let (optimizer, sink) = wired(PerformanceGoal::default(), 2, 0.0);
        for _ in 0..2 {
            let token = optimizer.acquire_slot().expect("free slot");
            optimizer.record_usage(token, &contains_mix(5), 8);
        }
        assert!(sink.updated.lock().is_empty());
        assert_eq!(optimizer.stats().analyses, 0);
    }

    #[test]
    fn test_ratio_above_one_requires_full_window() {
        let (optimizer, sink) = wired(PerformanceGoal::default(), 4, 7.5);
        for _ in 0..3 {
            let token = optimizer.acquire_slot().expect("free slot");
            optimizer.record_usage(token, &contains_mix(5), 8);
        }
        assert!(sink.updated.lock().is_empty());

        let token = optimizer.acquire_slot().expect("free slot");
        optimizer.record_usage(token, &contains_mix(5), 8);
        assert_eq!(sink.updated.lock().len(), 1);
    }

    #[test]
    fn test_partial_window_analysis_marks_stragglers_stale() {
        let (optimizer, sink) = wired(PerformanceGoal::default(), 4, 0.5);
        let straggler = optimizer.acquire_slot().expect("free slot");
        let tokens: Vec<_> = (0..2)
            .map(|_| optimizer.acquire_slot().expect("free slot"))
            .collect();

        // threshold is ceil(4 * 0.5) = 2: the second report triggers analysis
        for token in tokens {
            optimizer.record_usage(token, &contains_mix(5), 8);
        }
        assert_eq!(sink.updated.lock().len(), 1);

        // the straggler finalizes into the dead generation and is ignored
        optimizer.record_usage(straggler, &contains_mix(5), 8);
        assert_eq!(optimizer.stats().finalized, 0);
        assert_eq!(optimizer.stats().analyses, 1);
    }
}
