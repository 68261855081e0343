// Derived from https://github.com/fornwall/allocation-counter
//
// Licensed under either of:
// - Apache License, Version 2.0.
// - MIT/X Consortium License
//
// Modifications:
// - Counts bytes into the allocprobe counters instead of per-scope stacks
// - Forwards realloc to the system allocator

use std::alloc::{GlobalAlloc, Layout, System};

/// Global allocator that feeds every allocation counter `allocprobe` can read.
///
/// Install it once at the crate root of the binary being measured:
///
/// ```rust
/// #[global_allocator]
/// static GLOBAL: allocprobe::CountingAllocator = allocprobe::CountingAllocator;
///
/// fn main() {}
/// ```
///
/// Without it, backend detection finds no working counter and every probe
/// reports zero.
pub struct CountingAllocator;

unsafe impl GlobalAlloc for CountingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        super::counters::track_alloc(layout.size());

        unsafe { System.alloc(layout) }
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        super::counters::track_alloc(layout.size());

        unsafe { System.alloc_zeroed(layout) }
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        super::counters::track_dealloc(layout.size());

        unsafe {
            System.dealloc(ptr, layout);
        }
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        let new_ptr = unsafe { System.realloc(ptr, layout, new_size) };
        if !new_ptr.is_null() {
            super::counters::track_dealloc(layout.size());
            super::counters::track_alloc(new_size);
        }
        new_ptr
    }
}
