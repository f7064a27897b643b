use execount::InstructionCounter;
use std::alloc::{GlobalAlloc, Layout};
use std::cell::RefCell;

thread_local! {
    static ALLOC_COUNT: RefCell<usize> = const { RefCell::new(0) };
}

struct CountingAllocator;

unsafe impl GlobalAlloc for CountingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        // try_with: the slot may already be gone during thread teardown.
        let _ = ALLOC_COUNT.try_with(|c| *c.borrow_mut() += 1);
        unsafe { std::alloc::System.alloc(layout) }
    }
    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        unsafe { std::alloc::System.dealloc(ptr, layout) }
    }
}

#[global_allocator]
static A: CountingAllocator = CountingAllocator;

fn allocations() -> usize {
    ALLOC_COUNT.with(|c| *c.borrow())
}

#[test]
fn account_does_not_allocate_after_first_flush() {
    let counter = InstructionCounter::with_granularity(4).unwrap();
    // First access registers the batch and the total entry.
    counter.statistics().add_units(4);
    counter.account();

    let before = allocations();
    for _ in 0..10_000 {
        let stats = counter.statistics();
        stats.add_units(5);
        if stats.is_due() {
            counter.account();
        }
    }
    let after = allocations();
    assert_eq!(after, before, "account() hot path should not allocate");
    assert_eq!(counter.executed_instructions_count(), 4 + 10_000 * 5);
}
