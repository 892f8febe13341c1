//! Empirical performance models
//!
//! Each candidate representation gets three independently fitted cost curves
//! (populate, contains, iterate) over container size. The curves arrive as
//! plain coefficient vectors from offline microbenchmark fitting; this module
//! only evaluates them. Everything here is immutable and safe to evaluate
//! concurrently.

use serde::{Deserialize, Serialize};

use crate::containers::{CandidateKind, MapKind, SequenceKind, SetKind};
use crate::monitors::{OperationKind, OperationMix, UsageRecord};

/// Operation category used as an optimization objective
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PerformanceDimension {
    Populate,
    Contains,
    Iterate,
}

impl PerformanceDimension {
    pub fn operation(self) -> OperationKind {
        match self {
            PerformanceDimension::Populate => OperationKind::Populate,
            PerformanceDimension::Contains => OperationKind::Contains,
            PerformanceDimension::Iterate => OperationKind::Iterate,
        }
    }
}

/// Fixed-coefficient polynomial, ascending degree order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polynomial {
    coefficients: Vec<f64>,
}

impl Polynomial {
    pub fn new(coefficients: Vec<f64>) -> Self {
        Self { coefficients }
    }

    /// Evaluate at `x` by Horner's rule
    pub fn value(&self, x: f64) -> f64 {
        self.coefficients
            .iter()
            .rev()
            .fold(0.0, |acc, coefficient| acc * x + coefficient)
    }
}

/// Cost model for one candidate representation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceModel<K> {
    kind: K,
    contains: Polynomial,
    populate: Polynomial,
    iterate: Polynomial,
}

impl<K: CandidateKind> PerformanceModel<K> {
    pub fn new(kind: K, contains: Vec<f64>, populate: Vec<f64>, iterate: Vec<f64>) -> Self {
        Self {
            kind,
            contains: Polynomial::new(contains),
            populate: Polynomial::new(populate),
            iterate: Polynomial::new(iterate),
        }
    }

    pub fn kind(&self) -> K {
        self.kind
    }

    /// Predicted cost for one container lifetime
    ///
    /// `n_populate * populate(size) + n_contains * contains(size) +
    /// n_iterate * iterate(size)`, always non-negative for non-negative
    /// curves.
    pub fn performance(&self, size: usize, mix: &OperationMix) -> f64 {
        let size = size as f64;
        mix.count(OperationKind::Populate) as f64 * self.populate.value(size)
            + mix.count(OperationKind::Contains) as f64 * self.contains.value(size)
            + mix.count(OperationKind::Iterate) as f64 * self.iterate.value(size)
    }

    /// Predicted cost restricted to a single dimension
    pub fn dimension_performance(
        &self,
        dimension: PerformanceDimension,
        size: usize,
        mix: &OperationMix,
    ) -> f64 {
        self.performance(size, &mix.project(dimension.operation()))
    }
}

/// Scores candidate representations against observed usage records
#[derive(Debug, Clone)]
pub struct EmpiricalEvaluator<K> {
    models: Vec<PerformanceModel<K>>,
}

impl<K: CandidateKind> EmpiricalEvaluator<K> {
    pub fn new(models: Vec<PerformanceModel<K>>) -> Self {
        Self { models }
    }

    /// Load models from the JSON hand-off produced by offline curve fitting
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error>
    where
        K: for<'de> Deserialize<'de>,
    {
        let models: Vec<PerformanceModel<K>> = serde_json::from_str(json)?;
        Ok(Self::new(models))
    }

    pub fn models(&self) -> &[PerformanceModel<K>] {
        &self.models
    }

    /// Aggregate predicted cost per candidate for one dimension
    ///
    /// Sums the dimension-restricted cost of every finalized record in the
    /// window, per candidate type.
    pub fn predict_performance(
        &self,
        records: &[UsageRecord],
        dimension: PerformanceDimension,
    ) -> Vec<(K, f64)> {
        self.models
            .iter()
            .map(|model| {
                let cost = records
                    .iter()
                    .map(|record| {
                        model.dimension_performance(dimension, record.final_size, &record.mix)
                    })
                    .sum();
                (model.kind(), cost)
            })
            .collect()
    }
}

/// Baseline fitted curves for sequence candidates
///
/// Constant terms and slopes approximate the usual asymptotics: arrays pay
/// linearly for containment, hash-fronted storage pays a flat premium per
/// mutation for O(1) containment, linked nodes pay more per element visited.
pub fn default_sequence_models() -> Vec<PerformanceModel<SequenceKind>> {
    vec![
        PerformanceModel::new(
            SequenceKind::Array,
            vec![2.0, 0.45],
            vec![1.0],
            vec![0.0, 0.25],
        ),
        PerformanceModel::new(
            SequenceKind::Linked,
            vec![4.0, 0.9],
            vec![1.6],
            vec![0.0, 0.8],
        ),
        PerformanceModel::new(
            SequenceKind::Hash,
            vec![2.2],
            vec![3.1],
            vec![0.0, 0.35],
        ),
    ]
}

/// Baseline fitted curves for set candidates
pub fn default_set_models() -> Vec<PerformanceModel<SetKind>> {
    vec![
        PerformanceModel::new(SetKind::Hash, vec![2.1], vec![2.6], vec![0.0, 0.4]),
        PerformanceModel::new(
            SetKind::Tree,
            vec![5.0, 0.02],
            vec![5.5, 0.02],
            vec![0.0, 0.6],
        ),
        PerformanceModel::new(
            SetKind::Array,
            vec![2.0, 0.45],
            vec![2.0, 0.45],
            vec![0.0, 0.2],
        ),
    ]
}

/// Baseline fitted curves for map candidates
pub fn default_map_models() -> Vec<PerformanceModel<MapKind>> {
    vec![
        PerformanceModel::new(MapKind::Hash, vec![2.3], vec![2.8], vec![0.0, 0.45]),
        PerformanceModel::new(
            MapKind::Tree,
            vec![5.2, 0.02],
            vec![5.8, 0.02],
            vec![0.0, 0.65],
        ),
        PerformanceModel::new(
            MapKind::Array,
            vec![2.0, 0.5],
            vec![2.0, 0.5],
            vec![0.0, 0.25],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(size: usize, populate: u64, contains: u64, iterate: u64) -> UsageRecord {
        let mix = OperationMix::new();
        for _ in 0..populate {
            mix.record(OperationKind::Populate);
        }
        for _ in 0..contains {
            mix.record(OperationKind::Contains);
        }
        for _ in 0..iterate {
            mix.record(OperationKind::Iterate);
        }
        UsageRecord {
            mix,
            final_size: size,
        }
    }

    #[test]
    fn test_polynomial_horner() {
        // 1 + 2x + 3x^2 at x = 4 -> 57
        let poly = Polynomial::new(vec![1.0, 2.0, 3.0]);
        assert_eq!(poly.value(4.0), 57.0);
        assert_eq!(poly.value(0.0), 1.0);
        assert_eq!(Polynomial::new(vec![]).value(10.0), 0.0);
    }

    #[test]
    fn test_performance_weighted_sum() {
        let model = PerformanceModel::new(
            SequenceKind::Array,
            vec![0.0, 1.0], // contains: size
            vec![2.0],      // populate: 2
            vec![3.0],      // iterate: 3
        );
        let sample = record(10, 4, 5, 1);
        // 4 * 2 + 5 * 10 + 1 * 3
        assert_eq!(model.performance(10, &sample.mix), 61.0);
    }

    #[test]
    fn test_dimension_performance_masks_other_counts() {
        let model = PerformanceModel::new(SequenceKind::Array, vec![1.0], vec![1.0], vec![1.0]);
        let sample = record(5, 7, 3, 2);
        assert_eq!(
            model.dimension_performance(PerformanceDimension::Contains, 5, &sample.mix),
            3.0
        );
    }

    #[test]
    fn test_predict_performance_aggregates_records() {
        let evaluator = EmpiricalEvaluator::new(vec![
            PerformanceModel::new(SequenceKind::Array, vec![2.0], vec![1.0], vec![1.0]),
            PerformanceModel::new(SequenceKind::Hash, vec![1.0], vec![1.0], vec![1.0]),
        ]);
        let records = vec![record(10, 0, 3, 0), record(10, 0, 2, 0)];

        let costs = evaluator.predict_performance(&records, PerformanceDimension::Contains);
        assert_eq!(costs, vec![(SequenceKind::Array, 10.0), (SequenceKind::Hash, 5.0)]);
    }

    #[test]
    fn test_from_json_round_trip() {
        let models = default_sequence_models();
        let json = serde_json::to_string(&models).expect("serializable models");
        let evaluator: EmpiricalEvaluator<SequenceKind> =
            EmpiricalEvaluator::from_json(&json).expect("parseable models");
        assert_eq!(evaluator.models().len(), 3);
        assert_eq!(evaluator.models()[0].kind(), SequenceKind::Array);
    }
}
