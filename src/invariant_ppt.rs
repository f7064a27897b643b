//! PPT Invariant System: cold-path invariant enforcement with contract tracking.

// Never call assert_invariant from the account() path: it takes a Mutex.

#[cfg(feature = "ppt")]
use lazy_static::lazy_static;
#[cfg(feature = "ppt")]
use std::collections::HashSet;
#[cfg(feature = "ppt")]
use std::sync::Mutex;

// Invariant constants for contract tracking
pub const BASELINE_ON_FIRST_ACCESS: u32 = 1;
pub const TOTAL_SLOT_ZEROED: u32 = 2;
pub const RESET_AFTER_FLUSH: u32 = 3;
pub const TOTAL_GREW_BY_DELTA: u32 = 4;

#[cfg(feature = "ppt")]
lazy_static! {
    static ref INVARIANT_LOG: Mutex<HashSet<u32>> = Mutex::new(HashSet::new());
}

#[cfg(feature = "ppt")]
/// Assert an invariant: logs it and panics on failure.
pub(crate) fn assert_invariant(id: u32, condition: bool, message: &str, context: Option<&str>) {
    if !condition {
        let full_message = if let Some(ctx) = context {
            format!("Invariant {} failed: {} (context: {})", id, message, ctx)
        } else {
            format!("Invariant {} failed: {}", id, message)
        };
        log::error!("{}", full_message);
        panic!("{}", full_message);
    }
    // A poisoned log still holds valid ids.
    INVARIANT_LOG
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .insert(id);
}

#[cfg(not(feature = "ppt"))]
/// Assert an invariant: checks condition and panics on failure.
pub(crate) fn assert_invariant(_id: u32, condition: bool, message: &str, _context: Option<&str>) {
    if !condition {
        panic!("Invariant failed: {}", message);
    }
}

#[cfg(feature = "ppt")]
/// Contract test: checks that specified invariants were asserted.
pub fn contract_test(test_name: &str, required_invariants: &[u32]) {
    let log = INVARIANT_LOG
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    let missing: Vec<String> = required_invariants
        .iter()
        .filter(|&&inv| !log.contains(&inv))
        .map(|&inv| format!("{} ({})", inv, invariant_name(inv)))
        .collect();
    drop(log); // Drop the lock before panicking
    if !missing.is_empty() {
        panic!(
            "Contract test '{}' failed: invariants not enforced: {:?}",
            test_name, missing
        );
    }
}

#[cfg(not(feature = "ppt"))]
/// Contract test: no-op when PPT feature is disabled.
pub fn contract_test(_test_name: &str, _required_invariants: &[u32]) {}

/// Maps invariant ID to a human-readable name (diagnostics only).
pub const fn invariant_name(id: u32) -> &'static str {
    match id {
        BASELINE_ON_FIRST_ACCESS => "BASELINE_ON_FIRST_ACCESS",
        TOTAL_SLOT_ZEROED => "TOTAL_SLOT_ZEROED",
        RESET_AFTER_FLUSH => "RESET_AFTER_FLUSH",
        TOTAL_GREW_BY_DELTA => "TOTAL_GREW_BY_DELTA",
        _ => "UNKNOWN",
    }
}
