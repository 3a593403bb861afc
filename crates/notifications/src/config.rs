//! Dispatcher configuration loaded from environment variables.

/// Default cap on deferred handler tasks running at the same time.
pub const DEFAULT_MAX_IN_FLIGHT_DEFERRED: usize = 1024;

/// Dispatcher tuning knobs.
///
/// Reads from environment variables:
/// - `NOTIFY_MAX_IN_FLIGHT_DEFERRED` — maximum concurrently running deferred
///   handler tasks (default: `1024`, minimum `1`). Deferred deliveries beyond
///   this limit are dropped and logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatcherConfig {
    pub max_in_flight_deferred: usize,
}

impl DispatcherConfig {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let max_in_flight_deferred = lookup("NOTIFY_MAX_IN_FLIGHT_DEFERRED")
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(DEFAULT_MAX_IN_FLIGHT_DEFERRED);

        Self {
            max_in_flight_deferred,
        }
        .normalized()
    }

    /// Sets the deferred task cap.
    pub fn with_max_in_flight_deferred(mut self, max: usize) -> Self {
        self.max_in_flight_deferred = max;
        self.normalized()
    }

    fn normalized(mut self) -> Self {
        let ceiling = tokio::sync::Semaphore::MAX_PERMITS.min(u32::MAX as usize);
        self.max_in_flight_deferred = self.max_in_flight_deferred.clamp(1, ceiling);
        self
    }
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_in_flight_deferred: DEFAULT_MAX_IN_FLIGHT_DEFERRED,
        }
    }
}
