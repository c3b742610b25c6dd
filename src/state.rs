//! Shared partition state: per-vertex records and per-partition load counters.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard, RwLock};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::types::{PartitionId, VertexId};

/// Mutable per-vertex bookkeeping, only reachable through the record's lock.
#[derive(Debug, Default)]
pub struct RecordInner {
    degree: u64,
    replicas: SmallVec<[u32; 4]>,
}

impl RecordInner {
    /// Number of incident edges processed so far.
    pub fn degree(&self) -> u64 {
        self.degree
    }

    /// Returns `true` when the vertex already has a replica in `partition`.
    pub fn has_replica(&self, partition: u32) -> bool {
        self.replicas.contains(&partition)
    }

    /// Partitions currently holding a replica of this vertex.
    pub fn replicas(&self) -> impl Iterator<Item = PartitionId> + '_ {
        self.replicas.iter().map(|&m| PartitionId(m))
    }

    /// Size of the replica set.
    pub fn replica_count(&self) -> usize {
        self.replicas.len()
    }

    /// Adds a replica; returns `true` when `partition` was newly added.
    pub(crate) fn add_replica(&mut self, partition: u32) -> bool {
        if self.has_replica(partition) {
            return false;
        }
        self.replicas.push(partition);
        true
    }

    pub(crate) fn increment_degree(&mut self) {
        self.degree += 1;
    }
}

/// Per-vertex record owned by the registry.
///
/// The mutex is the advisory lock of the processing protocol: holding the
/// guard means owning the record for the duration of one edge-processing
/// call. Records are created on first reference and never destroyed during
/// a run.
#[derive(Debug, Default)]
pub struct VertexRecord {
    inner: Mutex<RecordInner>,
}

impl VertexRecord {
    /// Non-blocking lock attempt.
    pub fn try_lock(&self) -> Option<MutexGuard<'_, RecordInner>> {
        self.inner.try_lock()
    }

    /// Blocking read access, for inspection outside the processing hot path.
    pub fn read<R>(&self, f: impl FnOnce(&RecordInner) -> R) -> R {
        f(&self.inner.lock())
    }
}

/// Registry the strategy reads and mutates while deciding placements.
///
/// Record fields are only touched under the record's lock. Load counters are
/// read lock-free during scoring and may be slightly stale; implementations
/// must make those reads race-safe but need not make them fresh.
pub trait PartitionState: Send + Sync {
    /// Number of partitions the load counters cover.
    fn partitions(&self) -> u32;

    /// Returns the record for `vertex`, creating it on first reference.
    fn record(&self, vertex: VertexId) -> Arc<VertexRecord>;

    /// Current edge count assigned to `partition`.
    fn edge_load(&self, partition: u32) -> u64;

    /// Smallest edge load across all partitions.
    fn min_edge_load(&self) -> u64;

    /// Largest edge load across all partitions.
    fn max_edge_load(&self) -> u64;

    /// Records one more edge assigned to `partition`.
    fn increment_edge_load(&self, partition: u32);

    /// Hook fired when a vertex gains its first replica in `partition`.
    ///
    /// The base state does not track per-partition vertex counts; variants
    /// that do override this.
    fn on_vertex_replicated(&self, partition: u32) {
        let _ = partition;
    }
}

/// In-memory partition state tracking per-partition edge loads.
pub struct StreamingState {
    records: RwLock<FxHashMap<VertexId, Arc<VertexRecord>>>,
    edge_loads: Vec<AtomicU64>,
}

impl StreamingState {
    /// Creates a state covering `partitions` partitions, all loads zero.
    pub fn new(partitions: u32) -> Self {
        Self {
            records: RwLock::new(FxHashMap::default()),
            edge_loads: (0..partitions).map(|_| AtomicU64::new(0)).collect(),
        }
    }

    /// Sum of all edge loads; equals the number of edges processed.
    pub fn total_edges(&self) -> u64 {
        self.edge_loads
            .iter()
            .map(|l| l.load(Ordering::Relaxed))
            .sum()
    }

    /// Number of distinct vertices referenced so far.
    pub fn vertex_count(&self) -> usize {
        self.records.read().len()
    }

    /// Vertices referenced so far, in no particular order.
    pub fn vertices(&self) -> Vec<VertexId> {
        self.records.read().keys().copied().collect()
    }
}

impl PartitionState for StreamingState {
    fn partitions(&self) -> u32 {
        self.edge_loads.len() as u32
    }

    fn record(&self, vertex: VertexId) -> Arc<VertexRecord> {
        if let Some(record) = self.records.read().get(&vertex) {
            return Arc::clone(record);
        }
        let mut records = self.records.write();
        Arc::clone(records.entry(vertex).or_default())
    }

    fn edge_load(&self, partition: u32) -> u64 {
        self.edge_loads[partition as usize].load(Ordering::Relaxed)
    }

    fn min_edge_load(&self) -> u64 {
        self.edge_loads
            .iter()
            .map(|l| l.load(Ordering::Relaxed))
            .min()
            .unwrap_or(0)
    }

    fn max_edge_load(&self) -> u64 {
        self.edge_loads
            .iter()
            .map(|l| l.load(Ordering::Relaxed))
            .max()
            .unwrap_or(0)
    }

    fn increment_edge_load(&self, partition: u32) {
        self.edge_loads[partition as usize].fetch_add(1, Ordering::Relaxed);
    }
}

/// Extended state that also counts vertices replicated into each partition.
pub struct CoordinatedState {
    base: StreamingState,
    vertex_loads: Vec<AtomicU64>,
}

impl CoordinatedState {
    /// Creates a state covering `partitions` partitions, all counters zero.
    pub fn new(partitions: u32) -> Self {
        Self {
            base: StreamingState::new(partitions),
            vertex_loads: (0..partitions).map(|_| AtomicU64::new(0)).collect(),
        }
    }

    /// Number of vertices holding a replica in `partition`.
    pub fn vertex_load(&self, partition: u32) -> u64 {
        self.vertex_loads[partition as usize].load(Ordering::Relaxed)
    }

    /// Total replicas across all partitions; equals the sum of replica-set
    /// sizes over all vertices.
    pub fn total_replicas(&self) -> u64 {
        self.vertex_loads
            .iter()
            .map(|l| l.load(Ordering::Relaxed))
            .sum()
    }

    /// Sum of all edge loads; equals the number of edges processed.
    pub fn total_edges(&self) -> u64 {
        self.base.total_edges()
    }

    /// Number of distinct vertices referenced so far.
    pub fn vertex_count(&self) -> usize {
        self.base.vertex_count()
    }

    /// Vertices referenced so far, in no particular order.
    pub fn vertices(&self) -> Vec<VertexId> {
        self.base.vertices()
    }
}

impl PartitionState for CoordinatedState {
    fn partitions(&self) -> u32 {
        self.base.partitions()
    }

    fn record(&self, vertex: VertexId) -> Arc<VertexRecord> {
        self.base.record(vertex)
    }

    fn edge_load(&self, partition: u32) -> u64 {
        self.base.edge_load(partition)
    }

    fn min_edge_load(&self) -> u64 {
        self.base.min_edge_load()
    }

    fn max_edge_load(&self) -> u64 {
        self.base.max_edge_load()
    }

    fn increment_edge_load(&self, partition: u32) {
        self.base.increment_edge_load(partition);
    }

    fn on_vertex_replicated(&self, partition: u32) {
        self.vertex_loads[partition as usize].fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_is_created_once_per_vertex() {
        let state = StreamingState::new(2);
        let a = state.record(VertexId(7));
        let b = state.record(VertexId(7));
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(state.vertex_count(), 1);
    }

    #[test]
    fn replica_set_is_a_set() {
        let state = StreamingState::new(4);
        let record = state.record(VertexId(1));
        let mut guard = record.try_lock().expect("uncontended");
        assert!(guard.add_replica(2));
        assert!(!guard.add_replica(2));
        assert!(guard.add_replica(0));
        assert_eq!(guard.replica_count(), 2);
        assert!(guard.has_replica(0));
        assert!(guard.has_replica(2));
        assert!(!guard.has_replica(1));
    }

    #[test]
    fn edge_load_counters_and_extrema() {
        let state = StreamingState::new(3);
        assert_eq!(state.min_edge_load(), 0);
        assert_eq!(state.max_edge_load(), 0);
        state.increment_edge_load(1);
        state.increment_edge_load(1);
        state.increment_edge_load(2);
        assert_eq!(state.edge_load(0), 0);
        assert_eq!(state.edge_load(1), 2);
        assert_eq!(state.edge_load(2), 1);
        assert_eq!(state.min_edge_load(), 0);
        assert_eq!(state.max_edge_load(), 2);
        assert_eq!(state.total_edges(), 3);
    }

    #[test]
    fn base_state_ignores_vertex_replication_events() {
        let state = StreamingState::new(2);
        state.on_vertex_replicated(0);
        assert_eq!(state.total_edges(), 0);
    }

    #[test]
    fn coordinated_state_counts_replicated_vertices() {
        let state = CoordinatedState::new(2);
        state.on_vertex_replicated(0);
        state.on_vertex_replicated(0);
        state.on_vertex_replicated(1);
        assert_eq!(state.vertex_load(0), 2);
        assert_eq!(state.vertex_load(1), 1);
        assert_eq!(state.total_replicas(), 3);
    }

    #[test]
    fn try_lock_fails_while_held() {
        let state = StreamingState::new(1);
        let record = state.record(VertexId(9));
        let guard = record.try_lock().expect("uncontended");
        assert!(record.try_lock().is_none());
        drop(guard);
        assert!(record.try_lock().is_some());
    }
}
