//! Monitoring wrapper for sequences

use std::hash::Hash;

use super::{OperationKind, OperationMix, ReportHandle, is_middle_position};
use crate::containers::{RawSequence, Sequence, SequenceKind};

/// Sequence wrapper that counts operations and reports once on drop
pub struct MonitoredSequence<T> {
    delegate: RawSequence<T>,
    mix: OperationMix,
    report: Option<ReportHandle<SequenceKind>>,
}

impl<T> MonitoredSequence<T> {
    pub(crate) fn new(delegate: RawSequence<T>, report: Option<ReportHandle<SequenceKind>>) -> Self {
        Self {
            delegate,
            mix: OperationMix::new(),
            report,
        }
    }

    /// The representation backing this instance
    pub fn kind(&self) -> SequenceKind {
        self.delegate.kind()
    }

    /// Whether this instance reports to an optimizer when it dies
    pub fn is_monitored(&self) -> bool {
        self.report.is_some()
    }

    /// Snapshot of the operation counters so far
    pub fn mix(&self) -> OperationMix {
        self.mix.clone()
    }

    /// Consume the wrapper, delivering the finalize report now
    pub fn finish(self) {}
}

impl<T: Clone + Eq + Hash> Sequence<T> for MonitoredSequence<T> {
    fn push(&mut self, value: T) {
        self.mix.record(OperationKind::Populate);
        self.delegate.push(value);
    }

    fn insert(&mut self, index: usize, value: T) {
        let kind = if is_middle_position(index, self.delegate.len()) {
            OperationKind::MidAccess
        } else {
            OperationKind::Populate
        };
        self.mix.record(kind);
        self.delegate.insert(index, value);
    }

    fn remove(&mut self, index: usize) -> Option<T> {
        let kind = if is_middle_position(index, self.delegate.len()) {
            OperationKind::MidAccess
        } else {
            OperationKind::Populate
        };
        self.mix.record(kind);
        self.delegate.remove(index)
    }

    fn get(&self, index: usize) -> Option<&T> {
        self.mix.record(OperationKind::IndexAccess);
        self.delegate.get(index)
    }

    fn contains(&self, value: &T) -> bool {
        self.mix.record(OperationKind::Contains);
        self.delegate.contains(value)
    }

    fn len(&self) -> usize {
        self.delegate.len()
    }

    fn iter(&self) -> Box<dyn Iterator<Item = &T> + '_> {
        self.mix.record(OperationKind::Iterate);
        self.delegate.iter()
    }
}

impl<T> Drop for MonitoredSequence<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.report.take() {
            handle
                .optimizer
                .record_usage(handle.token, &self.mix, self.delegate.len());
        }
    }
}
