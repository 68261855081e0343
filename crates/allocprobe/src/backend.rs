//! Allocation-counter backends and the one-time detection that picks among them.
//!
//! Candidates are tried in priority order; the first one that can be read and
//! observes a probe allocation wins. The choice is made once per process and
//! every probe dispatches on the cached [`Backend`] afterwards.

use std::fmt;
use std::hint::black_box;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::config::ProbeConfig;
use crate::counters;
use crate::error::CounterError;

/// Size of the buffer allocated to check that a counter is live.
const PROBE_BYTES: u64 = 256;

static DETECTED: OnceLock<Backend> = OnceLock::new();

/// The allocation counter a probe reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Backend {
    /// Exact process-wide counter (`precise` feature).
    PreciseCounter,
    /// Process-wide counter fed in 64 KiB per-thread batches (`approximate` feature).
    ApproximateCounter,
    /// Process-wide counter that is switched on the first time it is needed.
    /// Only sees allocations made after that point.
    ProcessMonitoringCounter,
    /// Counter of the calling thread only.
    PerThreadCounter,
    /// No counter works; every reading is unknown.
    Unavailable,
}

impl Backend {
    /// Detection order, best first.
    pub const CHAIN: [Backend; 4] = [
        Backend::PreciseCounter,
        Backend::ApproximateCounter,
        Backend::ProcessMonitoringCounter,
        Backend::PerThreadCounter,
    ];

    /// The backend detected for this process.
    ///
    /// The first call runs detection with [`ProbeConfig::from_env`], unless
    /// [`init`] ran first; every later call returns the cached result.
    pub fn current() -> Backend {
        *DETECTED.get_or_init(|| detect_with(&ProbeConfig::from_env()))
    }

    /// Cumulative bytes allocated as seen by this counter, `None` if it can't be read.
    pub fn read(self) -> Option<u64> {
        match self {
            Backend::PreciseCounter => precise_reading(),
            Backend::ApproximateCounter => approximate_reading(),
            Backend::ProcessMonitoringCounter => {
                counters::is_monitoring_enabled().then(counters::monitored_alloc_bytes)
            }
            Backend::PerThreadCounter => Some(counters::thread_alloc_bytes()),
            Backend::Unavailable => None,
        }
    }

    /// Whether readings cover allocations from every thread.
    pub fn is_process_wide(self) -> bool {
        matches!(
            self,
            Backend::PreciseCounter
                | Backend::ApproximateCounter
                | Backend::ProcessMonitoringCounter
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            Backend::PreciseCounter => "precise counter",
            Backend::ApproximateCounter => "approximate counter",
            Backend::ProcessMonitoringCounter => "process monitoring counter",
            Backend::PerThreadCounter => "per-thread counter",
            Backend::Unavailable => "unavailable",
        }
    }

    /// Makes the counter readable when it is chosen without detection.
    pub(crate) fn prepare(self) {
        self.prepare_with(&ProbeConfig::from_env());
    }

    /// Like `prepare`, but monitoring stays off if `config` disables it.
    pub(crate) fn prepare_with(self, config: &ProbeConfig) {
        if self != Backend::ProcessMonitoringCounter {
            return;
        }
        if config.disable_monitoring {
            tracing::warn!("process monitoring is disabled by configuration, readings will be 0");
            return;
        }
        if counters::enable_monitoring() {
            tracing::debug!("process-wide allocation monitoring enabled");
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "precise")] {
        fn precise_reading() -> Option<u64> {
            Some(counters::precise_alloc_bytes())
        }
    } else {
        fn precise_reading() -> Option<u64> {
            None
        }
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "approximate")] {
        fn approximate_reading() -> Option<u64> {
            Some(counters::approximate_alloc_bytes())
        }
    } else {
        fn approximate_reading() -> Option<u64> {
            None
        }
    }
}

/// A candidate allocation counter, checked once during detection.
pub trait Capability {
    fn backend(&self) -> Backend;

    /// Read the counter once. Detection accepts the candidate only on a
    /// non-negative `Ok` value.
    fn probe(&self) -> Result<i64, CounterError>;
}

/// One of the counters maintained by [`crate::CountingAllocator`].
pub struct BuiltinCapability<'a> {
    backend: Backend,
    config: &'a ProbeConfig,
}

impl<'a> BuiltinCapability<'a> {
    pub fn new(backend: Backend, config: &'a ProbeConfig) -> Self {
        Self { backend, config }
    }
}

impl Capability for BuiltinCapability<'_> {
    fn backend(&self) -> Backend {
        self.backend
    }

    fn probe(&self) -> Result<i64, CounterError> {
        let backend = self.backend;
        if !self.config.allows(backend) {
            return Err(CounterError::Excluded { backend });
        }

        match backend {
            Backend::PreciseCounter | Backend::PerThreadCounter => verify(backend, PROBE_BYTES),
            // A full batch forces this thread's pending bytes out.
            Backend::ApproximateCounter => verify(backend, counters::FLUSH_BATCH_BYTES),
            Backend::ProcessMonitoringCounter => {
                let switched_on = counters::enable_monitoring();
                let result = verify(backend, PROBE_BYTES);
                if result.is_err() && switched_on {
                    counters::disable_monitoring();
                }
                result
            }
            Backend::Unavailable => Ok(0),
        }
    }
}

/// Reads `backend` around a `probe_bytes` allocation and checks the counter saw it.
fn verify(backend: Backend, probe_bytes: u64) -> Result<i64, CounterError> {
    let before = backend
        .read()
        .ok_or(CounterError::NotCompiled { backend })?;
    let buf: Vec<u8> = black_box(Vec::with_capacity(probe_bytes as usize));
    let after = backend
        .read()
        .ok_or(CounterError::NotCompiled { backend })?;
    drop(buf);

    if after.saturating_sub(before) < probe_bytes {
        return Err(CounterError::NotInstalled {
            backend,
            probe_bytes,
        });
    }

    i64::try_from(after).map_err(|_| CounterError::Overflow {
        backend,
        value: after,
    })
}

/// Returns the backend of the first candidate that probes successfully, or
/// [`Backend::Unavailable`]. Probe errors are logged and dropped.
pub fn detect(candidates: &[&dyn Capability]) -> Backend {
    for candidate in candidates {
        let backend = candidate.backend();
        match candidate.probe() {
            Ok(value) if value >= 0 => return backend,
            Ok(value) => {
                tracing::debug!(%backend, value, "discarding allocation counter: negative reading");
            }
            Err(err) => {
                tracing::debug!(%backend, "discarding allocation counter: {err}");
            }
        }
    }

    Backend::Unavailable
}

/// Runs detection over the built-in chain without caching the result.
pub fn detect_with(config: &ProbeConfig) -> Backend {
    let capabilities = Backend::CHAIN.map(|backend| BuiltinCapability::new(backend, config));
    let candidates: Vec<&dyn Capability> = capabilities
        .iter()
        .map(|capability| capability as &dyn Capability)
        .collect();

    let backend = detect(&candidates);
    match backend {
        Backend::PerThreadCounter => tracing::warn!(
            "using the per-thread allocation counter, allocations on other threads are not measured"
        ),
        Backend::Unavailable => tracing::warn!(
            "no allocation counter available, measurements will read 0"
        ),
        _ => tracing::info!(%backend, "allocation counter selected"),
    }
    backend
}

/// How many times the process-wide monitoring counter has been switched on.
/// Detection and explicit probes together keep this at 0 or 1.
pub fn monitoring_activations() -> u64 {
    counters::monitoring_activations()
}

/// Runs detection with `config` unless it already ran, and returns the
/// process-wide backend. The first caller wins.
pub fn init(config: ProbeConfig) -> Backend {
    let mut ran = false;
    let backend = *DETECTED.get_or_init(|| {
        ran = true;
        detect_with(&config)
    });
    if !ran {
        tracing::debug!(%backend, "allocation counter already detected, ignoring config");
    }
    backend
}
