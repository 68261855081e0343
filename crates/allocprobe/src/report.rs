use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::Backend;

/// Result of [`crate::AllocationProbe::measure`].
///
/// # Examples
///
/// ```rust
/// use allocprobe::{Backend, Measurement};
///
/// let m = Measurement {
///     bytes: 2048,
///     elapsed_ns: 1_500_000,
///     backend: Backend::PreciseCounter,
/// };
/// assert_eq!(m.to_string(), "2.0 KB in 1.50 ms (precise counter)");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Measurement {
    /// Bytes allocated while the closure ran.
    pub bytes: u64,
    /// Wall-clock time of the closure, collections excluded.
    pub elapsed_ns: u64,
    pub backend: Backend,
}

impl Measurement {
    pub fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.elapsed_ns)
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} in {} ({})",
            format_bytes(self.bytes),
            format_duration(self.elapsed_ns),
            self.backend
        )
    }
}

/// Process memory totals taken right after one forced collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemorySnapshot {
    pub backend: Backend,
    pub total_allocated_bytes: u64,
    pub heap_size_bytes: u64,
}

impl fmt::Display for MemorySnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "allocated {}, heap {} ({})",
            format_bytes(self.total_allocated_bytes),
            format_bytes(self.heap_size_bytes),
            self.backend
        )
    }
}

pub fn format_duration(ns: u64) -> String {
    if ns < 1_000 {
        format!("{} ns", ns)
    } else if ns < 1_000_000 {
        format!("{:.2} µs", ns as f64 / 1_000.0)
    } else if ns < 1_000_000_000 {
        format!("{:.2} ms", ns as f64 / 1_000_000.0)
    } else {
        format!("{:.2} s", ns as f64 / 1_000_000_000.0)
    }
}

pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    const THRESHOLD: f64 = 1024.0;

    if bytes == 0 {
        return "0 B".to_string();
    }

    let bytes_f = bytes as f64;
    let unit_index = (bytes_f.log(THRESHOLD).floor() as usize).min(UNITS.len() - 1);
    let unit_value = bytes_f / THRESHOLD.powi(unit_index as i32);

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", unit_value, UNITS[unit_index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(1_000_000), "976.6 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024), "3.0 GB");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(999), "999 ns");
        assert_eq!(format_duration(1_500), "1.50 µs");
        assert_eq!(format_duration(2_000_000_000), "2.00 s");
    }

    #[test]
    fn test_snapshot_json_shape() {
        let snapshot = MemorySnapshot {
            backend: Backend::Unavailable,
            total_allocated_bytes: 0,
            heap_size_bytes: 42,
        };

        let json = serde_json::to_value(snapshot).unwrap();
        assert_eq!(json["backend"], "unavailable");
        assert_eq!(json["heap_size_bytes"], 42);
    }
}
