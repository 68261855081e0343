use thiserror::Error;

use crate::Backend;

/// Why a candidate counter was rejected during backend detection.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CounterError {
    #[error("{backend} support was not compiled in")]
    NotCompiled { backend: Backend },

    #[error("{backend} did not observe a {probe_bytes} byte probe allocation; is CountingAllocator installed?")]
    NotInstalled { backend: Backend, probe_bytes: u64 },

    #[error("{backend} reading {value} does not fit a signed 64-bit counter")]
    Overflow { backend: Backend, value: u64 },

    #[error("{backend} is excluded by configuration")]
    Excluded { backend: Backend },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown allocation backend '{0}', expected one of: auto, precise, approximate, process, thread, none")]
    UnknownBackend(String),
}
