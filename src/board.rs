// src/board.rs
//! Refresh board: issues cycle ids and keeps the latest accepted result set.
//!
//! Cycles may overlap (timer tick plus manual refresh). Only the most recently
//! issued cycle may publish; anything older is stale and dropped, so a slow
//! cycle can never overwrite a fresher one.

use metrics::counter;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use crate::results::ResultSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct CycleId(pub u64);

impl std::fmt::Display for CycleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Default)]
pub struct RefreshBoard {
    issued: AtomicU64,
    latest: RwLock<Option<Arc<ResultSet>>>,
}

impl RefreshBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue the next cycle id. Ids start at 1.
    pub fn begin_cycle(&self) -> CycleId {
        CycleId(self.issued.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn latest_issued(&self) -> CycleId {
        CycleId(self.issued.load(Ordering::SeqCst))
    }

    /// Store `set` if its cycle is still the newest issued. Returns the stored
    /// snapshot, or `None` when the set was stale.
    pub fn publish(&self, set: ResultSet) -> Option<Arc<ResultSet>> {
        let mut guard = match self.latest.write() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        // Checked under the write lock so a concurrent publish cannot interleave.
        if set.cycle != self.latest_issued() {
            counter!("ingest_stale_cycles_total").increment(1);
            tracing::info!(
                target: "ingest",
                cycle = %set.cycle,
                latest = %self.latest_issued(),
                "discarding stale cycle"
            );
            return None;
        }
        let stored = Arc::new(set);
        *guard = Some(stored.clone());
        Some(stored)
    }

    /// Last accepted snapshot, if any cycle has completed.
    pub fn current(&self) -> Option<Arc<ResultSet>> {
        match self.latest.read() {
            Ok(g) => g.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}
