//! Producer harness: reference driver for the flush protocol.
//!
//! Mirrors what instrumented code does after every executed block: add the
//! block's units to the thread's batch and call `account()` once the batch
//! reaches zero. Every flush it performs is checked against the counter's
//! contract, so it doubles as a monitoring-side verifier in tests.

use crate::accumulator::ExecutionStatistics;
use crate::counter::InstructionCounter;
use crate::invariant_ppt::{assert_invariant, RESET_AFTER_FLUSH, TOTAL_GREW_BY_DELTA};

/// Drives one thread's batch. Must be created on the thread it drives.
pub struct ProducerHarness<'a> {
    counter: &'a InstructionCounter,
    stats: ExecutionStatistics<'a>,
    executed: u64,
    flushes: u64,
}

impl<'a> ProducerHarness<'a> {
    pub fn new(counter: &'a InstructionCounter) -> Self {
        Self {
            counter,
            stats: counter.statistics(),
            executed: 0,
            flushes: 0,
        }
    }

    /// Record a block of `units` and flush if the batch became due.
    ///
    /// Returns true when a flush happened.
    pub fn execute_block(&mut self, units: u64) -> bool {
        self.executed = self.executed.saturating_add(units);
        self.stats.add_units(units);
        if !self.stats.is_due() {
            return false;
        }
        self.checked_account();
        true
    }

    /// Run a sequence of blocks, returning the number of flushes.
    pub fn run(&mut self, blocks: &[u64]) -> u64 {
        blocks
            .iter()
            .filter(|&&units| self.execute_block(units))
            .count() as u64
    }

    fn checked_account(&mut self) {
        let pending = self.stats.executed_unit_count();
        let before = self.counter.executed_instructions_count();
        self.counter.account();
        self.flushes += 1;

        let after = self.counter.executed_instructions_count();
        let expected = pending.saturating_add(i64::from(self.counter.granularity())).max(0) as u64;
        assert_invariant(
            TOTAL_GREW_BY_DELTA,
            after == before.saturating_add(expected),
            "total must grow by batch plus granularity",
            Some(&format!("before {} after {} delta {}", before, after, expected)),
        );
        let reset = self.stats.executed_unit_count();
        assert_invariant(
            RESET_AFTER_FLUSH,
            reset == -i64::from(self.counter.granularity()),
            "batch must return to the baseline after a flush",
            Some(&format!("batch {}", reset)),
        );
    }

    /// Units executed through this harness, flushed or not.
    pub fn executed(&self) -> u64 {
        self.executed
    }

    /// Flushes performed through this harness.
    pub fn flushes(&self) -> u64 {
        self.flushes
    }

    /// Units executed but not yet folded into the shared total.
    pub fn pending(&self) -> u64 {
        let granularity = i64::from(self.counter.granularity());
        self.stats
            .executed_unit_count()
            .saturating_add(granularity)
            .max(0) as u64
    }
}
