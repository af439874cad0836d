//! Per-source pacing for item-level interactions.
//!
//! Every adapter calls [`RateGovernor::gate`] before touching the next
//! listing. The governor suspends the caller for the nominal interval of its
//! per-minute budget plus a random jitter, so requests never arrive on a
//! perfectly periodic schedule.
//!
//! A governor is taken by `&mut`: each source owns its own instance and two
//! workers can never share one.
//!
//! # Example
//!
//! ```rust,no_run
//! use jobscout_core::governor::RateGovernor;
//!
//! # async fn run() {
//! // 30 requests per minute: 2s between items, plus up to 500ms jitter.
//! let mut governor = RateGovernor::per_minute(30);
//! for _card in 0..3 {
//!     governor.gate().await;
//!     // ... extract the card
//! }
//! # }
//! ```

use std::time::Duration;

/// Upper bound on the jitter added to each wait.
pub const MAX_JITTER: Duration = Duration::from_millis(500);

/// Configuration for a rate governor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GovernorConfig {
    /// Nominal interval between consecutive item-level actions.
    pub interval: Duration,

    /// Exclusive upper bound of the random jitter added on top of `interval`.
    ///
    /// Always strictly less than one `interval`, so the effective delay stays
    /// below two nominal intervals.
    pub jitter: Duration,
}

impl GovernorConfig {
    /// Derive interval and jitter from a per-minute request budget.
    ///
    /// A budget of zero is treated as one request per minute.
    pub fn per_minute(budget: u32) -> Self {
        let interval = Duration::from_millis(60_000 / u64::from(budget.max(1)));
        Self {
            interval,
            jitter: interval.min(MAX_JITTER),
        }
    }

    /// No waiting at all. Used by tests and one-shot tools.
    pub fn unthrottled() -> Self {
        Self {
            interval: Duration::ZERO,
            jitter: Duration::ZERO,
        }
    }

    /// Compute the effective delay for a single wait (interval + random jitter).
    pub fn effective_delay(&self) -> Duration {
        if self.jitter.is_zero() {
            return self.interval;
        }
        let jitter_ms = rand_jitter_ms(self.jitter.as_millis() as u64);
        self.interval + Duration::from_millis(jitter_ms)
    }
}

impl Default for GovernorConfig {
    /// 30 requests per minute: 2s interval, 500ms jitter.
    fn default() -> Self {
        Self::per_minute(30)
    }
}

/// Paces one source's item-level actions.
#[derive(Debug, Clone)]
pub struct RateGovernor {
    config: GovernorConfig,
    gates: u64,
}

impl RateGovernor {
    pub fn new(config: GovernorConfig) -> Self {
        Self { config, gates: 0 }
    }

    pub fn per_minute(budget: u32) -> Self {
        Self::new(GovernorConfig::per_minute(budget))
    }

    pub fn unthrottled() -> Self {
        Self::new(GovernorConfig::unthrottled())
    }

    pub fn config(&self) -> &GovernorConfig {
        &self.config
    }

    /// Number of times this governor has been passed.
    pub fn gates(&self) -> u64 {
        self.gates
    }

    /// Suspend the caller for one interval plus jitter.
    pub async fn gate(&mut self) {
        let delay = self.config.effective_delay();
        self.gates += 1;
        if delay.is_zero() {
            return;
        }
        tracing::trace!(sleep_ms = %delay.as_millis(), gate = self.gates, "Rate governor wait");
        tokio::time::sleep(delay).await;
    }
}

// ---------------------------------------------------------------------------
// Jitter from a time-seeded xorshift. Good enough to break periodicity,
// not meant for anything security related.
// ---------------------------------------------------------------------------

fn rand_jitter_ms(max_ms: u64) -> u64 {
    if max_ms == 0 {
        return 0;
    }
    let mut x = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64;
    // xorshift64
    x ^= x << 13;
    x ^= x >> 7;
    x ^= x << 17;
    x % max_ms
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[test]
    fn per_minute_derives_interval_and_jitter() {
        let config = GovernorConfig::per_minute(30);
        assert_eq!(config.interval, Duration::from_secs(2));
        assert_eq!(config.jitter, Duration::from_millis(500));

        let config = GovernorConfig::per_minute(60);
        assert_eq!(config.interval, Duration::from_secs(1));
    }

    #[test]
    fn jitter_never_reaches_one_interval_at_high_budgets() {
        let config = GovernorConfig::per_minute(600);
        assert_eq!(config.interval, Duration::from_millis(100));
        assert_eq!(config.jitter, Duration::from_millis(100));
        for _ in 0..100 {
            let d = config.effective_delay();
            assert!(d >= Duration::from_millis(100));
            assert!(d < Duration::from_millis(200));
        }
    }

    #[test]
    fn zero_budget_is_clamped() {
        let config = GovernorConfig::per_minute(0);
        assert_eq!(config.interval, Duration::from_secs(60));
    }

    #[test]
    fn effective_delay_with_jitter_is_bounded() {
        let config = GovernorConfig::per_minute(30);
        for _ in 0..100 {
            let d = config.effective_delay();
            assert!(d >= Duration::from_secs(2));
            assert!(d < Duration::from_millis(2500));
        }
    }

    #[test]
    fn unthrottled_has_no_delay() {
        assert_eq!(GovernorConfig::unthrottled().effective_delay(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn gate_suspends_for_at_least_one_interval() {
        let mut governor = RateGovernor::per_minute(30);
        let start = Instant::now();
        governor.gate().await;
        governor.gate().await;
        let elapsed = start.elapsed();

        assert!(elapsed >= Duration::from_secs(4), "elapsed: {elapsed:?}");
        assert!(elapsed < Duration::from_secs(5), "elapsed: {elapsed:?}");
        assert_eq!(governor.gates(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn governors_are_independent() {
        let mut google = RateGovernor::per_minute(60);
        let mut indeed = RateGovernor::unthrottled();

        let start = Instant::now();
        indeed.gate().await;
        indeed.gate().await;
        assert_eq!(start.elapsed(), Duration::ZERO);

        google.gate().await;
        assert!(start.elapsed() >= Duration::from_secs(1));
        assert_eq!(indeed.gates(), 2);
        assert_eq!(google.gates(), 1);
    }
}
