// Runs with the system allocator only, so detection finds no counter.

use allocprobe::AllocationProbe;
use std::hint::black_box;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    test_probe::init_logging();

    let mut probe = AllocationProbe::new();
    probe.start();
    let buffer = black_box(vec![0u8; 1_000_000]);
    eprintln!("stop reported {} bytes", probe.stop());
    drop(buffer);

    println!("{}", serde_json::to_string(&probe.snapshot())?);

    Ok(())
}
