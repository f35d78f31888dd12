//! Read Routing
//!
//! Round-robin selection of a replica index for each read.

use std::sync::atomic::{AtomicU64, Ordering};

/// Selection counter shared by a router and every statement set built from it
#[derive(Debug, Default)]
pub struct ReadRouter {
    /// Round-robin counter for read distribution
    counter: AtomicU64,
}

impl ReadRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pick the node index for one read against a pool of `pool_size` nodes.
    ///
    /// A single-node pool always reads from the primary (index 0). Otherwise
    /// the result is always in `1..pool_size`, cycling through the replicas.
    pub fn slave(&self, pool_size: usize) -> usize {
        if pool_size <= 1 {
            return 0;
        }

        let replicas = (pool_size - 1) as u64;
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        1 + (n % replicas) as usize
    }

    /// Total reads routed to replicas
    pub fn reads_routed(&self) -> u64 {
        self.counter.load(Ordering::Relaxed)
    }
}
