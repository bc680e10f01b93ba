use chrono::{DateTime, Duration, Utc};
use tokio::time::Instant;

/// Wall-clock time derived from tokio's monotonic clock.
///
/// Cooldown arithmetic never goes backwards when the system clock is
/// adjusted, and follows paused time in tests.
#[derive(Debug, Clone, Copy)]
pub struct KioskClock {
    wall: DateTime<Utc>,
    mono: Instant,
}

impl KioskClock {
    pub fn start() -> Self {
        Self {
            wall: Utc::now(),
            mono: Instant::now(),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        let elapsed = Duration::from_std(self.mono.elapsed()).unwrap_or_else(|_| Duration::zero());
        self.wall + elapsed
    }

    /// Tokio instant matching a wall-clock deadline on this clock.
    pub fn instant_at(&self, at: DateTime<Utc>) -> Instant {
        let offset = at
            .signed_duration_since(self.wall)
            .to_std()
            .unwrap_or_default();
        self.mono + offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn follows_tokio_time() {
        let clock = KioskClock::start();
        let t0 = clock.now();
        tokio::time::advance(std::time::Duration::from_millis(1_500)).await;
        assert_eq!(clock.now() - t0, Duration::milliseconds(1_500));
        let deadline = t0 + Duration::milliseconds(3_000);
        assert_eq!(
            clock.instant_at(deadline) - Instant::now(),
            std::time::Duration::from_millis(1_500)
        );
    }
}
