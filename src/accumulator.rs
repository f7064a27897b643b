//! Per-thread batch accumulator.
//!
//! Every thread that touches a session gets exactly one [`LocalBatch`],
//! created lazily at the baseline `-granularity`. Batches live in a
//! per-session [`ThreadLocal`], so looking one up never takes a lock. The
//! producer mutates the batch through an [`ExecutionStatistics`] handle, which
//! cannot leave the thread that obtained it.

use crate::config::CounterConfig;
use crate::invariant_ppt::{assert_invariant, BASELINE_ON_FIRST_ACCESS};
use crate::table::TotalSlot;
use crate::ThreadIdentity;
use std::cell::{Cell, RefCell};
use std::sync::atomic::{AtomicUsize, Ordering};
use thread_local::ThreadLocal;

/// Units accrued by one thread since its last flush, plus that thread's
/// cached total slot once it has flushed.
#[derive(Debug)]
pub struct LocalBatch {
    owner: Cell<ThreadIdentity>,
    executed_unit_count: Cell<i64>,
    total: RefCell<Option<TotalSlot>>,
}

impl LocalBatch {
    fn new(owner: ThreadIdentity, baseline: i64) -> Self {
        Self {
            owner: Cell::new(owner),
            executed_unit_count: Cell::new(baseline),
            total: RefCell::new(None),
        }
    }

    /// Thread this batch currently belongs to.
    pub fn owner(&self) -> ThreadIdentity {
        self.owner.get()
    }

    /// Add `delta` to this thread's total, resolving the slot with `init` on
    /// the first flush and caching it afterwards.
    #[inline]
    pub(crate) fn add_to_total(&self, delta: u64, init: impl FnOnce(ThreadIdentity) -> TotalSlot) {
        if let Some(slot) = &*self.total.borrow() {
            slot.add(delta);
            return;
        }
        let slot = init(self.owner());
        slot.add(delta);
        *self.total.borrow_mut() = Some(slot);
    }

    /// Cached total, if this batch has flushed before.
    pub(crate) fn cached_total(&self) -> Option<u64> {
        self.total.borrow().as_ref().map(TotalSlot::get)
    }
}

/// Live handle to the calling thread's [`LocalBatch`].
///
/// The handle borrows thread-confined cells, so it is neither `Send` nor
/// `Sync`: it can only be used on the thread that obtained it.
#[derive(Debug, Clone, Copy)]
pub struct ExecutionStatistics<'a> {
    batch: &'a LocalBatch,
}

impl<'a> ExecutionStatistics<'a> {
    /// Current pending value. Negative until the next flush is due.
    #[inline]
    pub fn executed_unit_count(&self) -> i64 {
        self.batch.executed_unit_count.get()
    }

    /// Overwrite the pending value.
    #[inline]
    pub fn set_executed_unit_count(&self, value: i64) {
        self.batch.executed_unit_count.set(value);
    }

    /// Add `units` just executed and return the new pending value.
    ///
    /// The pending value saturates at `i64::MAX`; a saturated add is logged.
    #[inline]
    pub fn add_units(&self, units: u64) -> i64 {
        let current = self.executed_unit_count();
        let next = i64::try_from(units)
            .ok()
            .and_then(|units| current.checked_add(units))
            .unwrap_or_else(|| saturated(current, units));
        self.set_executed_unit_count(next);
        next
    }

    /// Whether the pending value has reached the flush threshold (`>= 0`).
    ///
    /// Producers call `account()` exactly when this turns true.
    #[inline]
    pub fn is_due(&self) -> bool {
        self.executed_unit_count() >= 0
    }

    pub(crate) fn batch(&self) -> &'a LocalBatch {
        self.batch
    }
}

#[cold]
fn saturated(current: i64, units: u64) -> i64 {
    log::warn!(
        "Pending batch saturated adding {} units to {}; flush more often",
        units,
        current
    );
    i64::MAX
}

/// Per-session registry of per-thread batches.
#[derive(Debug)]
pub struct ThreadLocalAccumulator {
    baseline: i64,
    batches: ThreadLocal<LocalBatch>,
    registered: AtomicUsize,
}

impl ThreadLocalAccumulator {
    /// Create an empty registry whose batches start at the config's baseline.
    pub fn new(config: &CounterConfig) -> Self {
        Self {
            baseline: config.baseline(),
            batches: ThreadLocal::new(),
            registered: AtomicUsize::new(0),
        }
    }

    /// Value every new or just-flushed batch holds.
    #[inline]
    pub fn baseline(&self) -> i64 {
        self.baseline
    }

    /// Return the calling thread's batch, creating it on first access.
    #[inline]
    pub fn get(&self) -> ExecutionStatistics<'_> {
        let me = ThreadIdentity::current();
        let batch = self.batches.get_or(|| self.register(me));
        if batch.owner() != me {
            // Slots of exited threads are handed to new threads.
            self.reclaim(batch, me);
        }
        ExecutionStatistics { batch }
    }

    /// Calling thread's cached total, without creating a batch.
    pub(crate) fn cached_total(&self) -> Option<u64> {
        let me = ThreadIdentity::current();
        self.batches
            .get()
            .filter(|batch| batch.owner() == me)
            .and_then(LocalBatch::cached_total)
    }

    #[cold]
    fn register(&self, me: ThreadIdentity) -> LocalBatch {
        log::debug!("Registering local batch for thread {:?}", me);
        self.registered.fetch_add(1, Ordering::Relaxed);
        let batch = LocalBatch::new(me, self.baseline);
        self.check_baseline(&batch);
        batch
    }

    #[cold]
    fn reclaim(&self, batch: &LocalBatch, me: ThreadIdentity) {
        log::debug!(
            "Reusing local batch of exited thread {:?} for thread {:?}",
            batch.owner(),
            me
        );
        self.registered.fetch_add(1, Ordering::Relaxed);
        batch.owner.set(me);
        batch.executed_unit_count.set(self.baseline);
        *batch.total.borrow_mut() = None;
        self.check_baseline(batch);
    }

    fn check_baseline(&self, batch: &LocalBatch) {
        let value = batch.executed_unit_count.get();
        assert_invariant(
            BASELINE_ON_FIRST_ACCESS,
            value == self.baseline,
            "new local batch must start at the baseline",
            Some(&format!("value {} baseline {}", value, self.baseline)),
        );
    }

    /// Number of threads that have had a batch in this registry.
    pub fn thread_count(&self) -> usize {
        self.registered.load(Ordering::Relaxed)
    }
}
