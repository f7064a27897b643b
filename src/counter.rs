//! Counter session: ties the per-thread accumulator to the shared totals.
//!
//! An [`InstructionCounter`] is created at the start of a profiling session and
//! shared with worker threads through an `Arc`. Instrumented code on each
//! thread follows one protocol:
//!
//! 1. add the units of the block it just executed to
//!    [`statistics()`](InstructionCounter::statistics),
//! 2. call [`account()`](InstructionCounter::account) exactly when the pending
//!    value becomes `>= 0`.
//!
//! `account()` does not check the threshold itself. Calling it more often than
//! the protocol requires folds extra granularity into the total.

// IMPORTANT: account() is the hot path. No invariant logging, no allocation,
// no locks once the calling thread has flushed once.

use crate::accumulator::{ExecutionStatistics, ThreadLocalAccumulator};
use crate::config::CounterConfig;
use crate::error::Result;
use crate::table::SharedCounterTable;
use crate::ThreadIdentity;

/// Per-thread executed-instruction counter for one profiling session.
#[derive(Debug)]
pub struct InstructionCounter {
    config: CounterConfig,
    accumulator: ThreadLocalAccumulator,
    table: SharedCounterTable,
}

impl InstructionCounter {
    /// Create a session with the default granularity of 1.
    pub fn new() -> Self {
        Self::from_validated(CounterConfig::default())
    }

    /// Create a session flushing `granularity` extra units per account.
    pub fn with_granularity(granularity: u32) -> Result<Self> {
        Ok(Self::from_validated(CounterConfig::new(granularity)?))
    }

    pub fn with_config(config: CounterConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_validated(config))
    }

    fn from_validated(config: CounterConfig) -> Self {
        log::info!(
            "Instruction counter session started (granularity {})",
            config.granularity
        );
        Self {
            config,
            accumulator: ThreadLocalAccumulator::new(&config),
            table: SharedCounterTable::new(),
        }
    }

    pub fn granularity(&self) -> u32 {
        self.config.granularity
    }

    /// Live handle to the calling thread's pending batch.
    #[inline]
    pub fn statistics(&self) -> ExecutionStatistics<'_> {
        self.accumulator.get()
    }

    /// Fold the calling thread's pending batch plus the granularity into its
    /// total, then reset the batch to `-granularity`.
    #[inline]
    pub fn account(&self) {
        let stats = self.accumulator.get();
        let delta = stats
            .executed_unit_count()
            .saturating_add(i64::from(self.config.granularity));
        let delta = match u64::try_from(delta) {
            Ok(delta) => delta,
            Err(_) => Self::clamped(delta),
        };
        stats
            .batch()
            .add_to_total(delta, |owner| self.table.slot(owner));
        stats.set_executed_unit_count(self.accumulator.baseline());
    }

    #[cold]
    fn clamped(delta: i64) -> u64 {
        log::warn!(
            "Batch below baseline at account (delta {}); folding 0 instead",
            delta
        );
        0
    }

    /// Total recorded for the calling thread, 0 if it never flushed.
    pub fn executed_instructions_count(&self) -> u64 {
        self.accumulator
            .cached_total()
            .unwrap_or_else(|| self.table.read(ThreadIdentity::current()))
    }

    /// Total recorded for any thread, including ones that have exited.
    pub fn executed_instructions_count_of(&self, thread: ThreadIdentity) -> u64 {
        self.table.read(thread)
    }

    /// Totals of every thread that has flushed.
    pub fn totals(&self) -> Vec<(ThreadIdentity, u64)> {
        self.table.snapshot()
    }

    /// Number of threads that have flushed at least once.
    pub fn thread_count(&self) -> usize {
        self.table.len()
    }
}

impl Default for InstructionCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for InstructionCounter {
    fn drop(&mut self) {
        log::debug!(
            "Instruction counter session closed ({} threads flushed, {} registered)",
            self.table.len(),
            self.accumulator.thread_count()
        );
    }
}
