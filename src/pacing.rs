//! Real-time stream pacing
//!
//! When enabled, streaming is throttled so that the fraction of bytes
//! received never runs ahead of the fraction of the track's playback
//! duration that has elapsed since streaming started.

use std::time::Duration;
use tokio::time::Instant;

/// Throttles one track's stream to approximate playback speed
///
/// Created when streaming starts; [`pace`](Self::pace) is awaited after every
/// chunk with the cumulative byte count.
#[derive(Clone, Debug)]
pub struct RealTimePacer {
    started: Instant,
    total_bytes: u64,
    duration: Duration,
}

impl RealTimePacer {
    /// Start pacing a stream of `total_bytes` that plays for `duration_ms`
    #[must_use]
    pub fn start(total_bytes: u64, duration_ms: u64) -> Self {
        Self {
            started: Instant::now(),
            total_bytes,
            duration: Duration::from_millis(duration_ms),
        }
    }

    /// Time the stream should have taken to deliver `downloaded` bytes
    pub fn wanted_elapsed(&self, downloaded: u64) -> Duration {
        if self.total_bytes == 0 {
            return Duration::ZERO;
        }
        let fraction = (downloaded.min(self.total_bytes) as f64) / (self.total_bytes as f64);
        self.duration.mul_f64(fraction)
    }

    /// Delay owed after `downloaded` bytes when `elapsed` has already passed
    pub fn delay_at(&self, downloaded: u64, elapsed: Duration) -> Duration {
        self.wanted_elapsed(downloaded).saturating_sub(elapsed)
    }

    /// Sleep until playback time catches up with `downloaded` bytes
    pub async fn pace(&self, downloaded: u64) {
        let delay = self.delay_at(downloaded, self.started.elapsed());
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}
