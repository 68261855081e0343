use allocprobe::{AllocationProbe, CountingAllocator};
use std::hint::black_box;

#[global_allocator]
static GLOBAL: CountingAllocator = CountingAllocator;

fn main() {
    test_probe::init_logging();

    let probe = AllocationProbe::new();
    let before = probe.snapshot();

    let chunks: Vec<Vec<u8>> = (0..64).map(|_| black_box(vec![1u8; 64 * 1024])).collect();
    let during = probe.snapshot();
    drop(chunks);

    let after = probe.snapshot();

    println!("before: {before}");
    println!("during: {during}");
    println!("after:  {after}");
}
