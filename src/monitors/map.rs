//! Monitoring wrapper for maps

use std::hash::Hash;

use super::{OperationKind, OperationMix, ReportHandle};
use crate::containers::{Map, MapKind, RawMap};

/// Map wrapper that counts operations and reports once on drop
///
/// Key lookups (`get`, `contains_key`) count as containment checks; every
/// mutation counts as populate.
pub struct MonitoredMap<K, V> {
    delegate: RawMap<K, V>,
    mix: OperationMix,
    report: Option<ReportHandle<MapKind>>,
}

impl<K, V> MonitoredMap<K, V> {
    pub(crate) fn new(delegate: RawMap<K, V>, report: Option<ReportHandle<MapKind>>) -> Self {
        Self {
            delegate,
            mix: OperationMix::new(),
            report,
        }
    }

    pub fn kind(&self) -> MapKind {
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

impl<K: Eq + Hash + Ord, V> Map<K, V> for MonitoredMap<K, V> {
    fn insert(&mut self, key: K, value: V) -> Option<V> {
        self.mix.record(OperationKind::Populate);
        self.delegate.insert(key, value)
    }

    fn remove(&mut self, key: &K) -> Option<V> {
        self.mix.record(OperationKind::Populate);
        self.delegate.remove(key)
    }

    fn get(&self, key: &K) -> Option<&V> {
        self.mix.record(OperationKind::Contains);
        self.delegate.get(key)
    }

    fn contains_key(&self, key: &K) -> bool {
        self.mix.record(OperationKind::Contains);
        self.delegate.contains_key(key)
    }

    fn len(&self) -> usize {
        self.delegate.len()
    }

    fn iter(&self) -> Box<dyn Iterator<Item = (&K, &V)> + '_> {
        self.mix.record(OperationKind::Iterate);
        self.delegate.iter()
    }
}

impl<K, V> Drop for MonitoredMap<K, V> {
    fn drop(&mut self) {
        if let Some(handle) = self.report.take() {
            handle
                .optimizer
                .record_usage(handle.token, &self.mix, self.delegate.len());
        }
    }
}
