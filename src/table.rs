//! Shared per-thread total table.
//!
//! Totals are keyed by [`ThreadIdentity`]. Each entry is its own atomic behind
//! a [`TotalSlot`]; the map lock only guards lookup and insertion. The exclusive
//! lock is taken once per thread, when its entry is created. Entries are never
//! removed.

use crate::invariant_ppt::{assert_invariant, TOTAL_SLOT_ZEROED};
use crate::ThreadIdentity;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Handle to one thread's total. Cloning shares the same counter.
#[derive(Debug, Clone)]
pub struct TotalSlot(Arc<AtomicU64>);

impl TotalSlot {
    /// Add `delta` units; visible to every later [`get`](Self::get).
    #[inline]
    pub fn add(&self, delta: u64) {
        self.0.fetch_add(delta, Ordering::AcqRel);
    }

    #[inline]
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }
}

/// Concurrency-safe map from thread identity to cumulative executed units.
///
/// Writers are expected to cache the [`TotalSlot`] returned by
/// [`slot`](Self::slot); after that an update touches no lock.
#[derive(Debug, Default)]
pub struct SharedCounterTable {
    totals: RwLock<HashMap<ThreadIdentity, TotalSlot>>,
}

impl SharedCounterTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current total for `thread`, or 0 if it has never flushed.
    pub fn read(&self, thread: ThreadIdentity) -> u64 {
        self.totals.read().get(&thread).map_or(0, TotalSlot::get)
    }

    /// Add `delta` to the total for `thread`, creating the entry at 0 if absent.
    pub fn update(&self, thread: ThreadIdentity, delta: u64) {
        self.slot(thread).add(delta);
    }

    /// The total slot for `thread`, created at 0 on first request.
    pub fn slot(&self, thread: ThreadIdentity) -> TotalSlot {
        if let Some(slot) = self.totals.read().get(&thread) {
            return slot.clone();
        }
        self.insert(thread)
    }

    #[cold]
    fn insert(&self, thread: ThreadIdentity) -> TotalSlot {
        let mut totals = self.totals.write();
        totals
            .entry(thread)
            .or_insert_with(|| {
                log::debug!("Creating total entry for thread {:?}", thread);
                let fresh = TotalSlot(Arc::new(AtomicU64::new(0)));
                assert_invariant(
                    TOTAL_SLOT_ZEROED,
                    fresh.get() == 0,
                    "new total entry must start at zero",
                    None,
                );
                fresh
            })
            .clone()
    }

    /// Number of threads that have flushed at least once.
    pub fn len(&self) -> usize {
        self.totals.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.totals.read().is_empty()
    }

    /// Totals of every thread that has flushed, in no particular order.
    pub fn snapshot(&self) -> Vec<(ThreadIdentity, u64)> {
        self.totals
            .read()
            .iter()
            .map(|(&thread, total)| (thread, total.get()))
            .collect()
    }
}
