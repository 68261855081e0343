//! Measure how many bytes a piece of code allocates.
//!
//! Install [`CountingAllocator`] as the global allocator, then bracket the code
//! with [`AllocationProbe::start`] and [`AllocationProbe::stop`]:
//!
//! ```rust,no_run
//! #[global_allocator]
//! static GLOBAL: allocprobe::CountingAllocator = allocprobe::CountingAllocator;
//!
//! fn main() {
//!     let mut probe = allocprobe::AllocationProbe::new();
//!     probe.start();
//!     let data: Vec<u64> = (0..1024).collect();
//!     println!("allocated {} bytes", probe.stop());
//!     # drop(data);
//! }
//! ```
//!
//! The counter a probe reads is picked once per process from a fallback chain
//! (see [`Backend`]). Hosts without a working counter still get answers, all 0.
//!
//! ## Configuration
//!
//! - `ALLOCPROBE_BACKEND`: `auto` (default), `precise`, `approximate`,
//!   `process`, `thread` or `none`
//! - `ALLOCPROBE_DISABLE_MONITORING`: `1`/`true` never switches on the
//!   process-wide monitoring counter

mod allocator;
pub mod backend;
pub mod config;
pub(crate) mod counters;
pub mod error;
pub mod heap;
mod probe;
mod report;

pub use allocator::CountingAllocator;
pub use backend::{detect, detect_with, init, monitoring_activations, Backend, Capability};
pub use config::{BackendChoice, ProbeConfig};
pub use error::{ConfigError, CounterError};
pub use heap::{collect, set_collector};
pub use probe::AllocationProbe;
pub use report::{format_bytes, format_duration, Measurement, MemorySnapshot};

#[cfg(test)]
#[global_allocator]
static GLOBAL: CountingAllocator = CountingAllocator;
