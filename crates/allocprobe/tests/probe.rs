use allocprobe::{AllocationProbe, Backend, CountingAllocator};
use std::hint::black_box;

#[global_allocator]
static GLOBAL: CountingAllocator = CountingAllocator;

#[test]
fn detects_process_wide_counter_when_allocator_installed() {
    let backend = Backend::current();

    assert!(
        backend.is_process_wide(),
        "expected a process-wide counter, got {backend}"
    );
    assert_eq!(AllocationProbe::new().backend(), backend);
}

#[test]
fn one_megabyte_buffer_is_measured() {
    let mut probe = AllocationProbe::new();
    probe.start();
    let buf = black_box(vec![0u8; 1_000_000]);
    let delta = probe.stop();

    assert!(delta >= 1_000_000, "delta {delta} below the 1 MB allocated");
    drop(buf);
}

#[test]
fn allocations_on_other_threads_are_measured() {
    let mut probe = AllocationProbe::new();
    probe.start();
    std::thread::spawn(|| {
        drop(black_box(vec![0u8; 1 << 20]));
    })
    .join()
    .unwrap();

    assert!(probe.stop() >= 1 << 20);
}

#[test]
fn stop_before_start_returns_zero() {
    let mut probe = AllocationProbe::new();
    drop(black_box(vec![0u8; 1 << 16]));

    assert_eq!(probe.stop(), 0);
}

#[test]
fn total_allocated_bytes_never_decreases() {
    let probe = AllocationProbe::new();
    let mut last = probe.total_allocated_bytes();
    assert!(last > 0);

    for round in 0..16 {
        drop(black_box(vec![round as u8; 4096]));
        let now = probe.total_allocated_bytes();
        assert!(now >= last, "total went from {last} to {now}");
        last = now;
    }
}

#[test]
fn heap_size_tracks_live_memory() {
    let probe = AllocationProbe::new();
    let buf = black_box(vec![1u8; 4 << 20]);
    let with_buf = probe.heap_size();
    drop(buf);

    assert!(with_buf >= 4 << 20, "heap size {with_buf} below the 4 MiB held");
}

#[test]
fn idle_cycles_stay_small_on_calling_thread() {
    let mut probe = AllocationProbe::with_backend(Backend::PerThreadCounter);

    for _ in 0..2 {
        probe.start();
        let delta = probe.stop();
        assert!(delta < 1024, "idle start/stop reported {delta} bytes");
    }
}

#[test]
fn measure_and_snapshot_serialize() {
    let mut probe = AllocationProbe::new();
    let (sum, measurement) = probe.measure(|| {
        let data: Vec<u64> = black_box((0..10_000).collect());
        data.iter().sum::<u64>()
    });

    assert_eq!(sum, 49_995_000);
    assert!(measurement.bytes >= 80_000);

    let json = serde_json::to_value(measurement).unwrap();
    assert_eq!(json["bytes"], measurement.bytes);

    let snapshot = probe.snapshot();
    assert_eq!(snapshot.backend, probe.backend());
    assert!(snapshot.total_allocated_bytes > 0);
}
