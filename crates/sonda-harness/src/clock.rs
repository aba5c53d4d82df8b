//! Run clock and timeout governance
//!
//! [`Timeouts`] resolves the soft and hard deadlines from optional overrides,
//! failing fast on misordered values. [`RunClock`] stamps the run start once
//! and is passed explicitly into every case dispatch; the soft deadline only
//! gates the start of new cases, the hard deadline bounds the whole run.

use std::time::{Duration, Instant};

use crate::error::{Error, Result};

/// Default soft deadline: stop dispatching new cases after this
pub const DEFAULT_SOFT: Duration = Duration::from_secs(10 * 60);

/// Default hard deadline: abort the entire run after this
pub const DEFAULT_HARD: Duration = Duration::from_secs(30 * 60);

/// Resolved run-level deadlines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Soft deadline relative to run start
    pub soft: Duration,
    /// Hard deadline relative to run start
    pub hard: Duration,
}

impl Timeouts {
    /// Resolve deadlines from optional overrides
    ///
    /// Either override replaces its default independently; the pair is then
    /// validated as a whole.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the resolved soft deadline exceeds the
    /// hard deadline. Misconfiguration is a contract violation, never a
    /// silent clamp.
    pub fn resolve(soft: Option<Duration>, hard: Option<Duration>) -> Result<Self> {
        let soft = soft.unwrap_or(DEFAULT_SOFT);
        let hard = hard.unwrap_or(DEFAULT_HARD);
        if soft > hard {
            return Err(Error::Config(format!(
                "soft timeout {}s exceeds hard timeout {}s",
                soft.as_secs(),
                hard.as_secs()
            )));
        }
        Ok(Self { soft, hard })
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            soft: DEFAULT_SOFT,
            hard: DEFAULT_HARD,
        }
    }
}

/// The run's single clock, created once at run entry
#[derive(Debug, Clone, Copy)]
pub struct RunClock {
    started: Instant,
    timeouts: Timeouts,
}

impl RunClock {
    /// Stamp the run start
    #[must_use]
    pub fn start(timeouts: Timeouts) -> Self {
        Self {
            started: Instant::now(),
            timeouts,
        }
    }

    /// Create a clock with an explicit start instant
    ///
    /// Lets tests back-date the run start instead of faking time.
    #[must_use]
    pub fn with_start(started: Instant, timeouts: Timeouts) -> Self {
        Self { started, timeouts }
    }

    /// Wall time elapsed since run start
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Whether the soft deadline has passed (no new cases should start)
    #[must_use]
    pub fn soft_expired(&self) -> bool {
        self.elapsed() > self.timeouts.soft
    }

    /// Time left until the hard deadline, saturating at zero
    #[must_use]
    pub fn hard_remaining(&self) -> Duration {
        self.timeouts.hard.saturating_sub(self.elapsed())
    }

    /// The resolved deadlines
    #[must_use]
    pub fn timeouts(&self) -> Timeouts {
        self.timeouts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_defaults() {
        let timeouts = Timeouts::resolve(None, None).expect("defaults are valid");
        assert_eq!(timeouts.soft, DEFAULT_SOFT);
        assert_eq!(timeouts.hard, DEFAULT_HARD);
    }

    #[test]
    fn test_resolve_independent_overrides() {
        let timeouts =
            Timeouts::resolve(Some(Duration::from_secs(60)), None).expect("valid override");
        assert_eq!(timeouts.soft, Duration::from_secs(60));
        assert_eq!(timeouts.hard, DEFAULT_HARD);

        let timeouts =
            Timeouts::resolve(None, Some(Duration::from_secs(20 * 60))).expect("valid override");
        assert_eq!(timeouts.soft, DEFAULT_SOFT);
        assert_eq!(timeouts.hard, Duration::from_secs(20 * 60));
    }

    #[test]
    fn test_resolve_rejects_soft_above_hard() {
        let err = Timeouts::resolve(
            Some(Duration::from_secs(600)),
            Some(Duration::from_secs(60)),
        )
        .expect_err("misordered deadlines");
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("600"));
    }

    #[test]
    fn test_resolve_accepts_equal_deadlines() {
        let timeouts = Timeouts::resolve(
            Some(Duration::from_secs(300)),
            Some(Duration::from_secs(300)),
        )
        .expect("equal deadlines are legal");
        assert_eq!(timeouts.soft, timeouts.hard);
    }

    #[test]
    fn test_fresh_clock_not_expired() {
        let clock = RunClock::start(Timeouts::default());
        assert!(!clock.soft_expired());
        assert!(clock.hard_remaining() > Duration::ZERO);
    }

    #[test]
    fn test_backdated_clock_soft_expired() {
        let timeouts = Timeouts::resolve(
            Some(Duration::from_millis(10)),
            Some(Duration::from_secs(60)),
        )
        .expect("valid");
        let clock = RunClock::with_start(Instant::now() - Duration::from_secs(1), timeouts);
        assert!(clock.soft_expired());
        // Soft expiry does not exhaust the hard budget
        assert!(clock.hard_remaining() > Duration::ZERO);
    }

    #[test]
    fn test_backdated_clock_hard_remaining_saturates() {
        let timeouts = Timeouts::resolve(
            Some(Duration::from_millis(1)),
            Some(Duration::from_millis(2)),
        )
        .expect("valid");
        let clock = RunClock::with_start(Instant::now() - Duration::from_secs(5), timeouts);
        assert_eq!(clock.hard_remaining(), Duration::ZERO);
    }
}
