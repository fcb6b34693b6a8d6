//! Usage accounting for remote round trips
//!
//! Publishers bump these counters on every remote round trip; the billing
//! collaborator reads them as four monotonically increasing integers. The
//! counters never reset for the lifetime of the process.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Process-wide usage counters
#[derive(Debug, Default)]
pub struct UsageCounters {
    reads: AtomicU64,
    writes: AtomicU64,
    creates: AtomicU64,
    deletes: AtomicU64,
}

impl UsageCounters {
    /// Create a fresh set of counters
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `n` document reads (one per delivered snapshot)
    pub fn add_reads(&self, n: u64) {
        self.reads.fetch_add(n, Ordering::Relaxed);
    }

    /// Record `n` document writes (one per write round trip, failed or not)
    pub fn add_writes(&self, n: u64) {
        self.writes.fetch_add(n, Ordering::Relaxed);
    }

    /// Record `n` document creations
    pub fn add_creates(&self, n: u64) {
        self.creates.fetch_add(n, Ordering::Relaxed);
    }

    /// Record `n` document deletions
    pub fn add_deletes(&self, n: u64) {
        self.deletes.fetch_add(n, Ordering::Relaxed);
    }

    /// Point-in-time view of all four counters
    pub fn snapshot(&self) -> UsageSnapshot {
        UsageSnapshot {
            reads: self.reads.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            creates: self.creates.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
        }
    }
}

/// Counter values at one point in time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UsageSnapshot {
    /// Documents read
    pub reads: u64,
    /// Documents written
    pub writes: u64,
    /// Documents created
    pub creates: u64,
    /// Documents deleted
    pub deletes: u64,
}
