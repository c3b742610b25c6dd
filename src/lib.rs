//! Streaming vertex-cut graph partitioning.
//!
//! Edges arrive one at a time, possibly from several threads at once, and
//! each is assigned to one of P logical partitions by the HDRF heuristic:
//! a greedy score that favors partitions already holding replicas of the
//! edge's endpoints (weighted against high-degree vertices) and, via a
//! configurable balance term, partitions with low edge load. Vertices may
//! end up replicated across several partitions; the goal is to keep that
//! replication low while the loads stay even.
//!
//! The crate deliberately stops at the decision: it records assignments and
//! the bookkeeping needed for subsequent decisions, and performs no data
//! movement, storage, or reporting.

pub mod config;
pub mod partition;
pub mod state;
pub mod types;

pub use config::HdrfConfig;
pub use partition::Hdrf;
pub use state::{CoordinatedState, PartitionState, StreamingState, VertexRecord};
pub use types::{Edge, PartitionError, PartitionId, Result, VertexId};
