//! Forced collection and heap-size queries.
//!
//! Rust has no tracing collector of its own. A "collection" here runs the
//! host's collector hook (an embedded script engine's GC, an arena reset, ...)
//! and then asks the system allocator to hand free pages back, so the numbers
//! read right after reflect live memory.

use std::sync::OnceLock;

use crate::Backend;

type Collector = Box<dyn Fn() + Send + Sync>;

static COLLECTOR: OnceLock<Collector> = OnceLock::new();

/// Register the function every forced collection runs first.
///
/// Only the first registration is kept; later ones return `false`.
pub fn set_collector<F>(collector: F) -> bool
where
    F: Fn() + Send + Sync + 'static,
{
    let registered = COLLECTOR.set(Box::new(collector)).is_ok();
    if !registered {
        tracing::warn!("collector hook already registered, ignoring the new one");
    }
    registered
}

/// Full, blocking collection.
pub fn collect() {
    if let Some(collector) = COLLECTOR.get() {
        collector();
    }
    release_free_memory();
}

/// Bytes held by live allocations, `None` if no source can tell.
///
/// The precise counter is used when it is the active backend, otherwise the
/// system allocator's own statistics where the platform has them.
pub fn heap_size(backend: Backend) -> Option<u64> {
    live_bytes(backend).or_else(system_heap_bytes)
}

cfg_if::cfg_if! {
    if #[cfg(feature = "precise")] {
        fn live_bytes(backend: Backend) -> Option<u64> {
            (backend == Backend::PreciseCounter).then(crate::counters::precise_live_bytes)
        }
    } else {
        fn live_bytes(_backend: Backend) -> Option<u64> {
            None
        }
    }
}

cfg_if::cfg_if! {
    if #[cfg(all(target_os = "linux", target_env = "gnu"))] {
        fn release_free_memory() {
            unsafe {
                libc::malloc_trim(0);
            }
        }

        /// In-use bytes of the glibc heap, small-block arenas plus mmapped chunks
        fn system_heap_bytes() -> Option<u64> {
            let info = unsafe { libc::mallinfo2() };
            Some((info.uordblks + info.hblkhd) as u64)
        }
    } else {
        fn release_free_memory() {}

        fn system_heap_bytes() -> Option<u64> {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::hint::black_box;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static COLLECTIONS: AtomicUsize = AtomicUsize::new(0);

    #[test]
    fn collect_runs_registered_hook_once_per_call() {
        // Other tests in this binary never register a hook.
        assert!(set_collector(|| {
            COLLECTIONS.fetch_add(1, Ordering::SeqCst);
        }));
        assert!(!set_collector(|| {}));

        let before = COLLECTIONS.load(Ordering::SeqCst);
        collect();
        collect();
        assert!(COLLECTIONS.load(Ordering::SeqCst) - before >= 2);
    }

    #[cfg(feature = "precise")]
    #[test]
    fn precise_heap_size_covers_held_buffer() {
        let buf = black_box(vec![1u8; 1 << 20]);
        let size = heap_size(Backend::PreciseCounter);
        drop(buf);

        assert!(size.unwrap_or(0) >= 1 << 20);
    }

    #[cfg(all(target_os = "linux", target_env = "gnu"))]
    #[test]
    fn system_heap_size_is_known_on_glibc() {
        let buf = black_box(vec![1u8; 1 << 20]);
        collect();
        let size = heap_size(Backend::PerThreadCounter);
        drop(buf);

        assert!(size.is_some_and(|bytes| bytes >= 1 << 20));
    }
}
