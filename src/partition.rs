//! The HDRF partitioning strategy.

use std::thread;

use parking_lot::{Mutex, MutexGuard};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use smallvec::SmallVec;
use tracing::{error, trace, warn};

use crate::config::HdrfConfig;
use crate::state::{PartitionState, RecordInner, VertexRecord};
use crate::types::{Edge, PartitionError, PartitionId, Result, VertexId};

/// Balance-term denominator constant; keeps the division defined when every
/// partition carries the same load.
const EPSILON: f64 = 1.0;

/// Streaming vertex-cut partitioner.
///
/// Stateless apart from its configuration and tie-breaking RNG; all graph
/// bookkeeping lives in the shared [`PartitionState`]. One instance may be
/// shared across ingestion threads.
pub struct Hdrf {
    config: HdrfConfig,
    rng: Mutex<StdRng>,
}

impl Hdrf {
    /// Builds a strategy, validating the configuration once.
    pub fn new(config: HdrfConfig) -> Result<Self> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            config,
            rng: Mutex::new(rng),
        })
    }

    /// The configuration this strategy runs with.
    pub fn config(&self) -> &HdrfConfig {
        &self.config
    }

    /// Assigns `edge` to a partition and updates `state` in place.
    ///
    /// Both endpoint locks are taken in ascending vertex-id order, every
    /// partition is scored against the locked records and the (possibly
    /// stale) load counters, one of the top-scoring partitions is picked at
    /// random, and the replica sets, edge load, and degrees are updated
    /// while both locks are still held. The guards release on every exit
    /// path.
    ///
    /// Errors: [`PartitionError::SelfLoop`] when the endpoints coincide,
    /// [`PartitionError::Config`] when `state` covers a different partition
    /// count than this strategy was built for,
    /// [`PartitionError::LockTimeout`] when the retry budget runs out (the
    /// caller may resubmit the edge), and [`PartitionError::Invariant`] when
    /// scoring produces a negative value or no candidate, which means the
    /// state or configuration is corrupt and the run should stop.
    pub fn process_edge<S: PartitionState + ?Sized>(
        &self,
        edge: Edge,
        state: &S,
    ) -> Result<PartitionId> {
        let (u, v) = (edge.source, edge.target);
        if u == v {
            return Err(PartitionError::SelfLoop(u));
        }
        // The state's counters must cover exactly the configured partition
        // range, or scoring would index past them.
        if state.partitions() != self.config.partitions {
            return Err(PartitionError::Config(
                "partition count mismatch between strategy and state",
            ));
        }
        let u_record = state.record(u);
        let v_record = state.record(v);

        // Lower vertex id first. Concurrent calls wanting overlapping
        // endpoints always contend on the shared record at the same
        // position, so circular wait cannot form.
        let (mut u_guard, mut v_guard) = if u < v {
            let first = self.lock_with_backoff(u, &u_record)?;
            let second = self.lock_with_backoff(v, &v_record)?;
            (first, second)
        } else {
            let second = self.lock_with_backoff(v, &v_record)?;
            let first = self.lock_with_backoff(u, &u_record)?;
            (first, second)
        };

        let chosen = self.choose_partition(&u_guard, &v_guard, state)?;

        if u_guard.add_replica(chosen) {
            state.on_vertex_replicated(chosen);
        }
        if v_guard.add_replica(chosen) {
            state.on_vertex_replicated(chosen);
        }
        state.increment_edge_load(chosen);
        u_guard.increment_degree();
        v_guard.increment_degree();

        trace!(%u, %v, partition = chosen, "edge assigned");
        Ok(PartitionId(chosen))
    }

    /// Bounded try-lock loop with doubling backoff. A held guard elsewhere
    /// drops naturally if this returns the timeout error.
    fn lock_with_backoff<'a>(
        &self,
        vertex: VertexId,
        record: &'a VertexRecord,
    ) -> Result<MutexGuard<'a, RecordInner>> {
        let mut backoff = self.config.initial_backoff;
        for attempt in 1..=self.config.max_lock_attempts {
            if let Some(guard) = record.try_lock() {
                return Ok(guard);
            }
            // No sleep once the budget is spent; the caller gets the
            // timeout immediately after the last attempt.
            if attempt < self.config.max_lock_attempts {
                thread::sleep(backoff);
                backoff = (backoff * 2).min(self.config.max_backoff);
            }
        }
        warn!(
            %vertex,
            attempts = self.config.max_lock_attempts,
            "vertex lock acquisition timed out"
        );
        Err(PartitionError::LockTimeout { vertex })
    }

    /// Scores every partition for the edge about to be added and picks
    /// uniformly among the ties for the maximum.
    fn choose_partition<S: PartitionState + ?Sized>(
        &self,
        u: &RecordInner,
        v: &RecordInner,
        state: &S,
    ) -> Result<u32> {
        // Load snapshot is taken without any partition-wide lock; staleness
        // under concurrency is tolerated.
        let min_load = state.min_edge_load() as f64;
        let max_load = state.max_edge_load() as f64;

        let deg_u = (u.degree() + 1) as f64;
        let deg_v = (v.degree() + 1) as f64;
        let sum = deg_u + deg_v;

        let mut max_score = 0.0_f64;
        let mut candidates: SmallVec<[u32; 8]> = SmallVec::new();
        for m in 0..self.config.partitions {
            let fu = if u.has_replica(m) {
                1.0 + (1.0 - deg_u / sum)
            } else {
                0.0
            };
            let fv = if v.has_replica(m) {
                1.0 + (1.0 - deg_v / sum)
            } else {
                0.0
            };
            let load = state.edge_load(m) as f64;
            let bal = ((max_load - load) / (EPSILON + max_load - min_load)).max(0.0);
            let score = fu + fv + self.config.lambda * bal;
            if score < 0.0 {
                error!(
                    partition = m,
                    score,
                    fu,
                    fv,
                    bal,
                    lambda = self.config.lambda,
                    "negative partition score"
                );
                return Err(PartitionError::Invariant(format!(
                    "partition {m} scored {score}"
                )));
            }
            if score > max_score {
                max_score = score;
                candidates.clear();
                candidates.push(m);
            } else if score == max_score {
                // Exact ties are expected: a fresh run's first edge ties
                // every partition.
                candidates.push(m);
            }
        }
        if candidates.is_empty() {
            error!(max_score, "no candidate partition survived scoring");
            return Err(PartitionError::Invariant("empty candidate set".into()));
        }
        let pick = self.rng.lock().gen_range(0..candidates.len());
        Ok(candidates[pick])
    }
}
