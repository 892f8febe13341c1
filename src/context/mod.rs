//! Allocation contexts
//!
//! A context is the per-call-site holder of the currently selected container
//! representation and capacity hint. Application code asks it for containers;
//! the wired optimizer pushes decisions back through the `DecisionSink`
//! surface. The `(kind, capacity, state)` triple lives under one `RwLock` so
//! a create call never observes a torn selection.

use parking_lot::RwLock;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use tracing::{debug, warn};

use crate::containers::{
    CandidateKind, MapKind, RawMap, RawSequence, RawSet, SequenceKind, SetKind,
};
use crate::monitors::{MonitoredMap, MonitoredSequence, MonitoredSet, ReportHandle};
use crate::optimizers::{AllocationOptimizer, DecisionSink, OptimizerStats};

/// Capacity handed out before the first convergence
pub const DEFAULT_INITIAL_CAPACITY: usize = 10;

/// Lifecycle of an allocation context
///
/// Starts in warmup with a fixed default representation; the first committed
/// decision moves it to adaptive, where it stays for the rest of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationContextState {
    Warmup,
    Adaptive,
}

impl AllocationContextState {
    pub fn name(self) -> &'static str {
        match self {
            AllocationContextState::Warmup => "Warmup",
            AllocationContextState::Adaptive => "Adaptive",
        }
    }
}

struct Selection<K> {
    kind: K,
    capacity: usize,
    state: AllocationContextState,
}

/// State shared by the three context flavors
struct ContextCore<K: CandidateKind> {
    selection: RwLock<Selection<K>>,
    sample_rate: usize,
    allocations: AtomicU64,
}

impl<K: CandidateKind> ContextCore<K> {
    fn new(kind: K, capacity: usize, sample_rate: usize) -> Self {
        Self {
            selection: RwLock::new(Selection {
                kind,
                capacity,
                state: AllocationContextState::Warmup,
            }),
            sample_rate: sample_rate.max(1),
            allocations: AtomicU64::new(0),
        }
    }

    fn snapshot(&self) -> (K, usize) {
        let selection = self.selection.read();
        (selection.kind, selection.capacity)
    }

    fn state(&self) -> AllocationContextState {
        self.selection.read().state
    }

    fn capacity_hint(&self) -> usize {
        self.selection.read().capacity
    }

    fn current_kind(&self) -> K {
        self.selection.read().kind
    }

    /// Sampling gate: every `sample_rate`-th allocation is monitored
    fn should_monitor(&self) -> bool {
        self.sample_rate == 1
            || self.allocations.fetch_add(1, Ordering::Relaxed) % self.sample_rate as u64 == 0
    }

    fn commit_type_and_hint(&self, kind: K, capacity: usize) {
        let mut selection = self.selection.write();
        debug!(
            kind = kind.label(),
            capacity,
            state = selection.state.name(),
            "committing container type"
        );
        selection.kind = kind;
        selection.capacity = capacity;
        selection.state = AllocationContextState::Adaptive;
    }

    fn commit_type(&self, kind: K) {
        let mut selection = self.selection.write();
        selection.kind = kind;
        selection.state = AllocationContextState::Adaptive;
    }

    fn commit_hint(&self, capacity: usize) {
        let mut selection = self.selection.write();
        debug!(capacity, "no convergence, updating capacity hint only");
        selection.capacity = capacity;
    }
}

/// Acquire a slot, degrading to the unmonitored path on exhaustion
fn acquire_report<K: CandidateKind>(
    optimizer: &Arc<dyn AllocationOptimizer<K>>,
) -> Option<ReportHandle<K>> {
    match optimizer.acquire_slot() {
        Some(token) => Some(ReportHandle::new(token, optimizer.clone())),
        None => {
            warn!("monitoring slots exhausted, handing out unmonitored container");
            None
        }
    }
}

/// Allocation context for sequences
pub struct SequenceContext {
    core: ContextCore<SequenceKind>,
    optimizer: Arc<dyn AllocationOptimizer<SequenceKind>>,
}

impl SequenceContext {
    /// Wire a context to its optimizer with default warmup selection
    pub fn new(optimizer: Arc<dyn AllocationOptimizer<SequenceKind>>) -> Arc<Self> {
        Self::with_config(optimizer, SequenceKind::Array, DEFAULT_INITIAL_CAPACITY, 1)
    }

    pub fn with_config(
        optimizer: Arc<dyn AllocationOptimizer<SequenceKind>>,
        default_kind: SequenceKind,
        initial_capacity: usize,
        sample_rate: usize,
    ) -> Arc<Self> {
        let context = Arc::new(Self {
            core: ContextCore::new(default_kind, initial_capacity, sample_rate),
            optimizer,
        });
        context
            .optimizer
            .attach_context(Arc::downgrade(&context) as Weak<dyn DecisionSink<SequenceKind>>);
        context
    }

    /// Hand out a sequence of the currently selected representation
    pub fn create_sequence<T: Clone + Eq + Hash>(&self) -> MonitoredSequence<T> {
        let (kind, capacity) = self.core.snapshot();
        let report = if self.core.should_monitor() {
            acquire_report(&self.optimizer)
        } else {
            None
        };
        MonitoredSequence::new(RawSequence::new(kind, capacity), report)
    }

    pub fn state(&self) -> AllocationContextState {
        self.core.state()
    }

    pub fn capacity_hint(&self) -> usize {
        self.core.capacity_hint()
    }

    pub fn current_kind(&self) -> SequenceKind {
        self.core.current_kind()
    }

    /// Window accounting of the wired optimizer
    pub fn optimizer_stats(&self) -> OptimizerStats {
        self.optimizer.stats()
    }
}

impl DecisionSink<SequenceKind> for SequenceContext {
    fn optimize_collection_type(&self, kind: SequenceKind, capacity: usize) {
        self.core.commit_type_and_hint(kind, capacity);
    }

    fn update_collection_type(&self, kind: SequenceKind) {
        self.core.commit_type(kind);
    }

    fn no_collection_type_convergence(&self, capacity: usize) {
        self.core.commit_hint(capacity);
    }
}

/// Allocation context for sets
pub struct SetContext {
    core: ContextCore<SetKind>,
    optimizer: Arc<dyn AllocationOptimizer<SetKind>>,
}

impl SetContext {
    pub fn new(optimizer: Arc<dyn AllocationOptimizer<SetKind>>) -> Arc<Self> {
        Self::with_config(optimizer, SetKind::Hash, DEFAULT_INITIAL_CAPACITY, 1)
    }

    pub fn with_config(
        optimizer: Arc<dyn AllocationOptimizer<SetKind>>,
        default_kind: SetKind,
        initial_capacity: usize,
        sample_rate: usize,
    ) -> Arc<Self> {
        let context = Arc::new(Self {
            core: ContextCore::new(default_kind, initial_capacity, sample_rate),
            optimizer,
        });
        context
            .optimizer
            .attach_context(Arc::downgrade(&context) as Weak<dyn DecisionSink<SetKind>>);
        context
    }

    /// Hand out a set of the currently selected representation
    pub fn create_set<T: Eq + Hash + Ord>(&self) -> MonitoredSet<T> {
        let (kind, capacity) = self.core.snapshot();
        let report = if self.core.should_monitor() {
            acquire_report(&self.optimizer)
        } else {
            None
        };
        MonitoredSet::new(RawSet::new(kind, capacity), report)
    }

    pub fn state(&self) -> AllocationContextState {
        self.core.state()
    }

    pub fn capacity_hint(&self) -> usize {
        self.core.capacity_hint()
    }

    pub fn current_kind(&self) -> SetKind {
        self.core.current_kind()
    }

    /// Window accounting of the wired optimizer
    pub fn optimizer_stats(&self) -> OptimizerStats {
        self.optimizer.stats()
    }
}

impl DecisionSink<SetKind> for SetContext {
    fn optimize_collection_type(&self, kind: SetKind, capacity: usize) {
        self.core.commit_type_and_hint(kind, capacity);
    }

    fn update_collection_type(&self, kind: SetKind) {
        self.core.commit_type(kind);
    }

    fn no_collection_type_convergence(&self, capacity: usize) {
        self.core.commit_hint(capacity);
    }
}

/// Allocation context for maps
pub struct MapContext {
    core: ContextCore<MapKind>,
    optimizer: Arc<dyn AllocationOptimizer<MapKind>>,
}

impl MapContext {
    pub fn new(optimizer: Arc<dyn AllocationOptimizer<MapKind>>) -> Arc<Self> {
        Self::with_config(optimizer, MapKind::Hash, DEFAULT_INITIAL_CAPACITY, 1)
    }

    pub fn with_config(
        optimizer: Arc<dyn AllocationOptimizer<MapKind>>,
        default_kind: MapKind,
        initial_capacity: usize,
        sample_rate: usize,
    ) -> Arc<Self> {
        let context = Arc::new(Self {
            core: ContextCore::new(default_kind, initial_capacity, sample_rate),
            optimizer,
        });
        context
            .optimizer
            .attach_context(Arc::downgrade(&context) as Weak<dyn DecisionSink<MapKind>>);
        context
    }

    /// Hand out a map of the currently selected representation
    pub fn create_map<K: Eq + Hash + Ord, V>(&self) -> MonitoredMap<K, V> {
        let (kind, capacity) = self.core.snapshot();
        let report = if self.core.should_monitor() {
            acquire_report(&self.optimizer)
        } else {
            None
        };
        MonitoredMap::new(RawMap::new(kind, capacity), report)
    }

    pub fn state(&self) -> AllocationContextState {
        self.core.state()
    }

    pub fn capacity_hint(&self) -> usize {
        self.core.capacity_hint()
    }

    pub fn current_kind(&self) -> MapKind {
        self.core.current_kind()
    }

    /// Window accounting of the wired optimizer
    pub fn optimizer_stats(&self) -> OptimizerStats {
        self.optimizer.stats()
    }
}

impl DecisionSink<MapKind> for MapContext {
    fn optimize_collection_type(&self, kind: MapKind, capacity: usize) {
        self.core.commit_type_and_hint(kind, capacity);
    }

    fn update_collection_type(&self, kind: MapKind) {
        self.core.commit_type(kind);
    }

    fn no_collection_type_convergence(&self, capacity: usize) {
        self.core.commit_hint(capacity);
    }
}
