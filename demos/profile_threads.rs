//! Spawns a few worker threads that execute pseudo-random "basic blocks" and
//! report through the instruction counter, then logs each thread's total.
//!
//! Run with `RUST_LOG=debug cargo run --example profile_threads [granularity]`.

use execount::harness::ProducerHarness;
use execount::{CounterConfig, InstructionCounter, ThreadIdentity};
use std::sync::Arc;
use std::thread;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match std::env::args().nth(1) {
        Some(arg) => CounterConfig::new(arg.parse()?)?,
        None => CounterConfig::default(),
    };
    let counter = Arc::new(InstructionCounter::with_config(config)?);

    let handles: Vec<_> = (0..4u64)
        .map(|worker| {
            let counter = Arc::clone(&counter);
            thread::spawn(move || {
                let mut harness = ProducerHarness::new(&counter);
                // Cheap LCG so block sizes differ per worker.
                let mut state = worker.wrapping_mul(6364136223846793005).wrapping_add(1);
                for _ in 0..100_000 {
                    state = state
                        .wrapping_mul(6364136223846793005)
                        .wrapping_add(1442695040888963407);
                    harness.execute_block(1 + (state >> 60));
                }
                (ThreadIdentity::current(), harness.executed(), harness.pending())
            })
        })
        .collect();

    for handle in handles {
        let (thread, executed, pending) = handle.join().map_err(|_| "worker panicked")?;
        log::info!(
            "{:?}: {} executed, {} recorded, {} pending",
            thread,
            executed,
            counter.executed_instructions_count_of(thread),
            pending
        );
    }
    log::info!("{} threads recorded totals", counter.thread_count());
    Ok(())
}
