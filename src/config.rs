//! Tunables for a single subscription engine.

use std::time::Duration;

/// Maximum number of de-duplicated items buffered per subscription.
pub const DEFAULT_MAX_PENDING: usize = 10;

/// Fixed delay imposed after a failed fetch, whatever the fetcher suggested.
pub const DEFAULT_ERROR_BACKOFF: Duration = Duration::from_secs(10);

/// Engine configuration.
///
/// The defaults match the behaviour callers can rely on: at most 10 items
/// buffered and a flat 10 second retry delay.  The backoff is deliberately
/// not exponential; wrap the fetcher if you need something adaptive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// No new fetch is scheduled while this many items await delivery.
    pub max_pending: usize,
    /// Delay before retrying after a fetch error.
    pub error_backoff: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_pending: DEFAULT_MAX_PENDING,
            error_backoff: DEFAULT_ERROR_BACKOFF,
        }
    }
}

impl EngineConfig {
    /// Set the pending cap.  A cap of zero would stall the engine forever, so
    /// it is raised to one.
    pub fn with_max_pending(mut self, max_pending: usize) -> Self {
        self.max_pending = max_pending.max(1);
        self
    }

    pub fn with_error_backoff(mut self, error_backoff: Duration) -> Self {
        self.error_backoff = error_backoff;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.max_pending, 10);
        assert_eq!(cfg.error_backoff, Duration::from_secs(10));
    }

    #[test]
    fn zero_cap_is_raised_to_one() {
        let cfg = EngineConfig::default().with_max_pending(0);
        assert_eq!(cfg.max_pending, 1);
    }
}
