use std::str::FromStr;

use crate::error::ConfigError;
use crate::Backend;

pub const BACKEND_ENV: &str = "ALLOCPROBE_BACKEND";
pub const DISABLE_MONITORING_ENV: &str = "ALLOCPROBE_DISABLE_MONITORING";

/// Which counters backend detection may consider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendChoice {
    /// Walk the whole chain in priority order.
    #[default]
    Auto,
    /// Consider only this backend. `Only(Backend::Unavailable)` disables measuring.
    Only(Backend),
}

impl FromStr for BackendChoice {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let choice = match s.trim().to_ascii_lowercase().as_str() {
            "" | "auto" => BackendChoice::Auto,
            "precise" => BackendChoice::Only(Backend::PreciseCounter),
            "approximate" => BackendChoice::Only(Backend::ApproximateCounter),
            "process" => BackendChoice::Only(Backend::ProcessMonitoringCounter),
            "thread" => BackendChoice::Only(Backend::PerThreadCounter),
            "none" => BackendChoice::Only(Backend::Unavailable),
            _ => return Err(ConfigError::UnknownBackend(s.to_string())),
        };
        Ok(choice)
    }
}

/// Settings for backend detection.
///
/// Usually read from the environment by [`ProbeConfig::from_env`]; pass one to
/// [`crate::init`] to configure detection programmatically instead.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeConfig {
    pub backend: BackendChoice,
    /// Never switch on the process-wide monitoring counter, neither during
    /// detection nor for probes built with that backend explicitly.
    pub disable_monitoring: bool,
}

impl ProbeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn backend(mut self, backend: BackendChoice) -> Self {
        self.backend = backend;
        self
    }

    pub fn disable_monitoring(mut self, disable: bool) -> Self {
        self.disable_monitoring = disable;
        self
    }

    /// Reads `ALLOCPROBE_BACKEND` and `ALLOCPROBE_DISABLE_MONITORING`.
    /// An unrecognized backend name is logged and treated as `auto`.
    pub fn from_env() -> Self {
        let backend = match std::env::var(BACKEND_ENV) {
            Ok(value) => value.parse().unwrap_or_else(|err: ConfigError| {
                tracing::warn!("{err}, falling back to auto");
                BackendChoice::Auto
            }),
            Err(_) => BackendChoice::Auto,
        };

        let disable_monitoring = std::env::var(DISABLE_MONITORING_ENV)
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(false);

        Self {
            backend,
            disable_monitoring,
        }
    }

    /// Whether detection may try `backend`.
    pub fn allows(&self, backend: Backend) -> bool {
        if self.disable_monitoring && backend == Backend::ProcessMonitoringCounter {
            return false;
        }
        match self.backend {
            BackendChoice::Auto => true,
            BackendChoice::Only(only) => only == backend,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_backend_names_case_insensitively() {
        assert_eq!("AUTO".parse::<BackendChoice>(), Ok(BackendChoice::Auto));
        assert_eq!("".parse::<BackendChoice>(), Ok(BackendChoice::Auto));
        assert_eq!(
            " Thread ".parse::<BackendChoice>(),
            Ok(BackendChoice::Only(Backend::PerThreadCounter))
        );
        assert_eq!(
            "process".parse::<BackendChoice>(),
            Ok(BackendChoice::Only(Backend::ProcessMonitoringCounter))
        );
        assert_eq!(
            "none".parse::<BackendChoice>(),
            Ok(BackendChoice::Only(Backend::Unavailable))
        );
    }

    #[test]
    fn rejects_unknown_backend_names() {
        assert_eq!(
            "jemalloc".parse::<BackendChoice>(),
            Err(ConfigError::UnknownBackend("jemalloc".to_string()))
        );
    }

    #[test]
    fn auto_allows_everything_but_disabled_monitoring() {
        let config = ProbeConfig::new().disable_monitoring(true);

        assert!(config.allows(Backend::PreciseCounter));
        assert!(config.allows(Backend::PerThreadCounter));
        assert!(!config.allows(Backend::ProcessMonitoringCounter));
    }

    #[test]
    fn only_restricts_to_one_backend() {
        let config = ProbeConfig::new().backend(BackendChoice::Only(Backend::PerThreadCounter));

        assert!(config.allows(Backend::PerThreadCounter));
        assert!(!config.allows(Backend::PreciseCounter));
        assert!(!config.allows(Backend::ApproximateCounter));
    }
}
