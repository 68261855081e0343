use std::cell::Cell;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Bytes a thread accumulates locally before the approximate counter sees them.
pub const FLUSH_BATCH_BYTES: u64 = 64 * 1024;

#[cfg(feature = "precise")]
static PRECISE_ALLOC_BYTES: AtomicU64 = AtomicU64::new(0);
#[cfg(feature = "precise")]
static PRECISE_DEALLOC_BYTES: AtomicU64 = AtomicU64::new(0);

#[cfg(feature = "approximate")]
static APPROXIMATE_ALLOC_BYTES: AtomicU64 = AtomicU64::new(0);

static MONITORING_ENABLED: AtomicBool = AtomicBool::new(false);
static MONITORED_ALLOC_BYTES: AtomicU64 = AtomicU64::new(0);
static MONITORING_ACTIVATIONS: AtomicU64 = AtomicU64::new(0);

/// Per-thread allocation state (no destructor, safe to touch from the allocator)
struct ThreadCounters {
    alloc_bytes: Cell<u64>,
    #[cfg_attr(not(feature = "approximate"), allow(dead_code))]
    pending_bytes: Cell<u64>,
}

thread_local! {
    static THREAD_COUNTERS: ThreadCounters = const { ThreadCounters {
        alloc_bytes: Cell::new(0),
        pending_bytes: Cell::new(0),
    } };
}

/// Called by the counting allocator for every allocation
#[inline]
pub fn track_alloc(size: usize) {
    let size = size as u64;

    #[cfg(feature = "precise")]
    PRECISE_ALLOC_BYTES.fetch_add(size, Ordering::Relaxed);

    if MONITORING_ENABLED.load(Ordering::Relaxed) {
        MONITORED_ALLOC_BYTES.fetch_add(size, Ordering::Relaxed);
    }

    // Fails only while the thread is being torn down.
    let _ = THREAD_COUNTERS.try_with(|counters| {
        counters
            .alloc_bytes
            .set(counters.alloc_bytes.get().wrapping_add(size));

        #[cfg(feature = "approximate")]
        {
            let pending = counters.pending_bytes.get() + size;
            if pending >= FLUSH_BATCH_BYTES {
                APPROXIMATE_ALLOC_BYTES.fetch_add(pending, Ordering::Relaxed);
                counters.pending_bytes.set(0);
            } else {
                counters.pending_bytes.set(pending);
            }
        }
    });
}

/// Called by the counting allocator for every deallocation
#[inline]
pub fn track_dealloc(size: usize) {
    #[cfg(feature = "precise")]
    PRECISE_DEALLOC_BYTES.fetch_add(size as u64, Ordering::Relaxed);

    #[cfg(not(feature = "precise"))]
    let _ = size;
}

/// Cumulative bytes allocated by the whole process, exact
#[cfg(feature = "precise")]
#[inline]
pub fn precise_alloc_bytes() -> u64 {
    PRECISE_ALLOC_BYTES.load(Ordering::Relaxed)
}

/// Bytes currently allocated and not yet freed
#[cfg(feature = "precise")]
#[inline]
pub fn precise_live_bytes() -> u64 {
    // Load frees first so a racing alloc/free pair can't push the result below zero.
    let freed = PRECISE_DEALLOC_BYTES.load(Ordering::Acquire);
    let allocated = PRECISE_ALLOC_BYTES.load(Ordering::Acquire);
    allocated.saturating_sub(freed)
}

/// Cumulative bytes allocated by the whole process, minus each thread's unflushed batch
#[cfg(feature = "approximate")]
#[inline]
pub fn approximate_alloc_bytes() -> u64 {
    APPROXIMATE_ALLOC_BYTES.load(Ordering::Relaxed)
}

/// Turn on the process-wide monitoring counter. Returns `true` if this call switched it on.
pub fn enable_monitoring() -> bool {
    let switched_on = !MONITORING_ENABLED.swap(true, Ordering::AcqRel);
    if switched_on {
        MONITORING_ACTIVATIONS.fetch_add(1, Ordering::Relaxed);
    }
    switched_on
}

pub fn disable_monitoring() {
    MONITORING_ENABLED.store(false, Ordering::Release);
}

/// How many times monitoring went from off to on in this process
pub fn monitoring_activations() -> u64 {
    MONITORING_ACTIVATIONS.load(Ordering::Relaxed)
}

#[inline]
pub fn is_monitoring_enabled() -> bool {
    MONITORING_ENABLED.load(Ordering::Acquire)
}

/// Bytes allocated by the process since monitoring was first enabled
#[inline]
pub fn monitored_alloc_bytes() -> u64 {
    MONITORED_ALLOC_BYTES.load(Ordering::Relaxed)
}

/// Bytes allocated by the calling thread since it started
#[inline]
pub fn thread_alloc_bytes() -> u64 {
    THREAD_COUNTERS
        .try_with(|counters| counters.alloc_bytes.get())
        .unwrap_or(0)
}
