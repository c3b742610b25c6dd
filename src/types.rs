//! Identifier newtypes, the edge pair, and the crate error type.

use std::fmt;

/// Identifier of a vertex in the incoming edge stream.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct VertexId(pub u64);

/// Index of a logical partition, in `[0, P)`.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct PartitionId(pub u32);

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for PartitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for VertexId {
    fn from(value: u64) -> Self {
        VertexId(value)
    }
}

impl From<VertexId> for u64 {
    fn from(value: VertexId) -> Self {
        value.0
    }
}

impl From<u32> for PartitionId {
    fn from(value: u32) -> Self {
        PartitionId(value)
    }
}

impl From<PartitionId> for u32 {
    fn from(value: PartitionId) -> Self {
        value.0
    }
}

/// An edge between two distinct vertices.
///
/// Self-loops are a caller contract violation; `process_edge` rejects them
/// rather than deadlocking on a doubly-acquired record lock.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct Edge {
    /// First endpoint.
    pub source: VertexId,
    /// Second endpoint.
    pub target: VertexId,
}

impl Edge {
    /// Builds an edge from its endpoints.
    pub const fn new(source: VertexId, target: VertexId) -> Self {
        Self { source, target }
    }

    /// Returns `true` when both endpoints are the same vertex.
    pub const fn is_self_loop(self) -> bool {
        self.source.0 == self.target.0
    }
}

/// Failures surfaced by the partitioning strategy.
#[derive(thiserror::Error, Debug)]
pub enum PartitionError {
    /// Malformed configuration, caught once at strategy construction.
    #[error("invalid configuration: {0}")]
    Config(&'static str),
    /// State or configuration corruption detected mid-run. Fatal to the run;
    /// the caller decides whether to abort or log.
    #[error("invariant violated: {0}")]
    Invariant(String),
    /// The bounded retry budget ran out while acquiring an endpoint lock.
    /// Retryable: the ingestion driver may resubmit, skip, or abort.
    #[error("timed out acquiring lock for vertex {vertex}")]
    LockTimeout {
        /// Vertex whose record lock could not be taken.
        vertex: VertexId,
    },
    /// Edge with identical endpoints, which the stream contract forbids.
    #[error("self-loop edge on vertex {0} rejected")]
    SelfLoop(VertexId),
}

impl PartitionError {
    /// Returns `true` when resubmitting the same edge may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PartitionError::LockTimeout { .. })
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, PartitionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn self_loop_detection() {
        assert!(Edge::new(VertexId(3), VertexId(3)).is_self_loop());
        assert!(!Edge::new(VertexId(3), VertexId(4)).is_self_loop());
    }

    #[test]
    fn only_lock_timeouts_are_retryable() {
        assert!(PartitionError::LockTimeout {
            vertex: VertexId(1)
        }
        .is_retryable());
        assert!(!PartitionError::Config("bad").is_retryable());
        assert!(!PartitionError::Invariant("broken".into()).is_retryable());
        assert!(!PartitionError::SelfLoop(VertexId(1)).is_retryable());
    }
}
