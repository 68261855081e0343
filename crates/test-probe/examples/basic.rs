use allocprobe::{AllocationProbe, CountingAllocator};
use std::hint::black_box;

#[global_allocator]
static GLOBAL: CountingAllocator = CountingAllocator;

fn build_table(rows: usize) -> Vec<String> {
    (0..rows).map(|i| format!("row {i}")).collect()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    test_probe::init_logging();

    let mut probe = AllocationProbe::new();
    let (kept, measurement) = probe.measure(|| {
        let buffer = black_box(vec![0u8; 1_000_000]);
        let table = black_box(build_table(1_000));
        (buffer, table)
    });

    eprintln!("{measurement}");
    println!("{}", serde_json::to_string(&measurement)?);
    drop(kept);

    Ok(())
}
