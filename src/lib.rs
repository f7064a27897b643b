//! execount: per-thread executed-instruction counting for instrumented code.
//!
//! Instrumented code batches units in a thread-confined accumulator and
//! periodically folds them into a shared, concurrently readable table of
//! per-thread totals. See [`counter::InstructionCounter`] for the protocol.

pub mod accumulator;
pub mod config;
pub mod counter;
pub mod error;
#[doc(hidden)]
pub mod harness;
#[doc(hidden)]
pub mod invariant_ppt;
pub mod table;

pub use accumulator::ExecutionStatistics;
pub use config::CounterConfig;
pub use counter::InstructionCounter;
pub use error::{ConfigError, CounterError};

use std::thread::{self, ThreadId};

/// Opaque identity of an execution thread, used as the key for its totals.
///
/// Stays unique for the life of the process, so totals of exited threads can
/// still be looked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ThreadIdentity(ThreadId);

impl ThreadIdentity {
    /// Identity of the calling thread.
    #[inline]
    pub fn current() -> Self {
        thread_local! {
            static CURRENT: ThreadId = thread::current().id();
        }
        CURRENT.with(|&id| Self(id))
    }
}

impl From<ThreadId> for ThreadIdentity {
    fn from(id: ThreadId) -> Self {
        Self(id)
    }
}
