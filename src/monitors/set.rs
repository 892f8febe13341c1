//! Monitoring wrapper for sets

use std::hash::Hash;

use super::{OperationKind, OperationMix, ReportHandle};
use crate::containers::{RawSet, Set, SetKind};

/// Set wrapper that counts operations and reports once on drop
pub struct MonitoredSet<T> {
    delegate: RawSet<T>,
    mix: OperationMix,
    report: Option<ReportHandle<SetKind>>,
}

impl<T> MonitoredSet<T> {
    pub(crate) fn new(delegate: RawSet<T>, report: Option<ReportHandle<SetKind>>) -> Self {
        Self {
            delegate,
            mix: OperationMix::new(),
            report,
        }
    }

    pub fn kind(&self) -> SetKind {
        self.delegate.kind()
    }

    pub fn is_monitored(&self) -> bool {
        self.report.is_some()
    }

    pub fn mix(&self) -> OperationMix {
        self.mix.clone()
    }

    /// Consume the wrapper, delivering the finalize report now
    pub fn finish(self) {}
}

impl<T: Eq + Hash + Ord> Set<T> for MonitoredSet<T> {
    fn insert(&mut self, value: T) -> bool {
        self.mix.record(OperationKind::Populate);
        self.delegate.insert(value)
    }

    fn remove(&mut self, value: &T) -> bool {
        self.mix.record(OperationKind::Populate);
        self.delegate.remove(value)
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

impl<T> Drop for MonitoredSet<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.report.take() {
            handle
                .optimizer
                .record_usage(handle.token, &self.mix, self.delegate.len());
        }
    }
}
