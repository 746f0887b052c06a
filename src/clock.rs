//! Simulation clock
//!
//! Simulated race time starts at zero when the process starts and advances with the
//! monotonic clock. It never runs backwards and is never negative.

use chrono::{DateTime, Utc};
use tokio::time::Instant;

/// Clamp a simulated time to the valid range. Negative and NaN inputs become `0.0`.
pub fn clamp_elapsed(seconds: f64) -> f64 {
    if seconds.is_nan() { 0.0 } else { seconds.max(0.0) }
}

/// Clock mapping wall time onto simulated race time.
#[derive(Debug, Clone, Copy)]
pub struct SimulationClock {
    origin: Instant,
    origin_utc: DateTime<Utc>,
}

impl SimulationClock {
    /// Start a clock at the current instant (simulated t = 0).
    pub fn start() -> Self {
        Self { origin: Instant::now(), origin_utc: Utc::now() }
    }

    /// Seconds since the origin instant.
    pub fn elapsed(&self) -> f64 {
        clamp_elapsed(self.origin.elapsed().as_secs_f64())
    }

    /// Wall-clock instant corresponding to simulated t = 0.
    pub fn origin_utc(&self) -> DateTime<Utc> {
        self.origin_utc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::time::Duration;

    proptest! {
        #[test]
        fn clamped_time_is_never_negative(t in proptest::num::f64::ANY) {
            let clamped = clamp_elapsed(t);
            prop_assert!(clamped >= 0.0);
            if t.is_finite() && t >= 0.0 {
                prop_assert_eq!(clamped, t);
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn elapsed_follows_monotonic_time() {
        let clock = SimulationClock::start();
        assert_eq!(clock.elapsed(), 0.0);

        tokio::time::advance(Duration::from_secs(30)).await;
        let first = clock.elapsed();
        assert!((first - 30.0).abs() < 1e-6);

        tokio::time::advance(Duration::from_millis(500)).await;
        assert!(clock.elapsed() >= first);
    }
}
