//! Frame timing

use std::time::Duration;

/// Frame time as seen by game code.
///
/// Advanced exactly once per tick from the clock service's delta. Deltas
/// above `max_delta` are clamped so a long stall (debugger, window drag)
/// does not explode the simulation.
#[derive(Debug, Clone)]
pub struct Time {
    delta: Duration,
    elapsed: Duration,
    frame_count: u64,
    max_delta: Duration,
}

impl Time {
    /// Default clamp for a single frame's delta
    pub const DEFAULT_MAX_DELTA: Duration = Duration::from_millis(250);

    pub fn new() -> Self {
        Self::with_max_delta(Self::DEFAULT_MAX_DELTA)
    }

    pub fn with_max_delta(max_delta: Duration) -> Self {
        Self {
            delta: Duration::ZERO,
            elapsed: Duration::ZERO,
            frame_count: 0,
            max_delta,
        }
    }

    /// Start a new frame with the given raw delta
    pub fn advance(&mut self, raw_delta: Duration) {
        if raw_delta > self.max_delta {
            log::debug!(
                "Clamping frame delta {:?} to {:?}",
                raw_delta,
                self.max_delta
            );
        }
        self.delta = raw_delta.min(self.max_delta);
        self.elapsed += self.delta;
        self.frame_count += 1;
    }

    /// Delta of the current frame
    pub fn delta(&self) -> Duration {
        self.delta
    }

    /// Delta of the current frame in seconds
    pub fn delta_seconds(&self) -> f32 {
        self.delta.as_secs_f32()
    }

    /// Sum of all (clamped) deltas so far
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn elapsed_seconds(&self) -> f32 {
        self.elapsed.as_secs_f32()
    }

    /// Number of frames advanced so far
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn max_delta(&self) -> Duration {
        self.max_delta
    }
}

impl Default for Time {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_advance() {
        let mut time = Time::new();
        time.advance(Duration::from_millis(16));
        time.advance(Duration::from_millis(16));

        assert_eq!(time.frame_count(), 2);
        assert_eq!(time.delta(), Duration::from_millis(16));
        assert_eq!(time.elapsed(), Duration::from_millis(32));
        assert!((time.delta_seconds() - 0.016).abs() < 1e-6);
    }

    #[test]
    fn test_time_clamps_large_delta() {
        let mut time = Time::with_max_delta(Duration::from_millis(100));
        time.advance(Duration::from_secs(3));

        assert_eq!(time.delta(), Duration::from_millis(100));
        assert_eq!(time.elapsed(), Duration::from_millis(100));
    }
}
