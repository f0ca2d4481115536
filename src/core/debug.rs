//! Debug and statistics module

use std::collections::VecDeque;
use std::time::Duration;

use super::profiler::Profiler;

/// Frame statistics tracker
#[derive(Debug)]
pub struct FrameStats {
    /// Frame time history for averaging
    frame_times: VecDeque<Duration>,
    /// Maximum samples to keep
    max_samples: usize,
    /// Current FPS
    fps: f32,
    /// Average frame time in milliseconds
    avg_frame_time_ms: f32,
    /// Minimum frame time in milliseconds
    min_frame_time_ms: f32,
    /// Maximum frame time in milliseconds
    max_frame_time_ms: f32,
    /// Total frames recorded
    total_frames: u64,
}

impl FrameStats {
    pub const DEFAULT_SAMPLES: usize = 120;

    /// Create a new frame stats tracker
    pub fn new() -> Self {
        Self::with_samples(Self::DEFAULT_SAMPLES)
    }

    /// Tracker averaging over the last `max_samples` frames
    pub fn with_samples(max_samples: usize) -> Self {
        let max_samples = max_samples.max(1);
        Self {
            frame_times: VecDeque::with_capacity(max_samples),
            max_samples,
            fps: 0.0,
            avg_frame_time_ms: 0.0,
            min_frame_time_ms: 0.0,
            max_frame_time_ms: 0.0,
            total_frames: 0,
        }
    }

    /// Record a frame with the given delta time
    pub fn record_frame(&mut self, delta: Duration) {
        self.total_frames += 1;

        if self.frame_times.len() >= self.max_samples {
            self.frame_times.pop_front();
        }
        self.frame_times.push_back(delta);

        self.update_stats();
    }

    fn update_stats(&mut self) {
        if self.frame_times.is_empty() {
            return;
        }

        let mut total = Duration::ZERO;
        let mut min = Duration::MAX;
        let mut max = Duration::ZERO;

        for &dt in &self.frame_times {
            total += dt;
            min = min.min(dt);
            max = max.max(dt);
        }

        let count = self.frame_times.len() as f32;
        let total_secs = total.as_secs_f32();

        // Guard against division by zero
        if total_secs > 0.0 {
            self.avg_frame_time_ms = (total_secs / count) * 1000.0;
            self.fps = count / total_secs;
        } else {
            self.avg_frame_time_ms = 0.0;
            self.fps = 0.0;
        }

        self.min_frame_time_ms = min.as_secs_f32() * 1000.0;
        self.max_frame_time_ms = max.as_secs_f32() * 1000.0;
    }

    pub fn fps(&self) -> f32 {
        self.fps
    }

    pub fn avg_frame_time_ms(&self) -> f32 {
        self.avg_frame_time_ms
    }

    pub fn min_frame_time_ms(&self) -> f32 {
        self.min_frame_time_ms
    }

    pub fn max_frame_time_ms(&self) -> f32 {
        self.max_frame_time_ms
    }

    /// Get total frames recorded
    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    /// Get a formatted stats string
    pub fn format_stats(&self) -> String {
        format!(
            "FPS: {:.1} | Frame: {:.2}ms (min: {:.2}, max: {:.2})",
            self.fps, self.avg_frame_time_ms, self.min_frame_time_ms, self.max_frame_time_ms
        )
    }
}

impl Default for FrameStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Entity counts captured after the sync point
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SceneCounts {
    pub live: usize,
    pub pending_add: usize,
    pub renderable: usize,
}

/// Debug overlay information
#[derive(Debug, Default)]
pub struct DebugInfo {
    /// Whether debug overlay is enabled
    pub enabled: bool,
    pub frame_stats: FrameStats,
    /// CPU scope timings; the engine records frame, update, sync and render
    pub profiler: Profiler,
    pub scene: SceneCounts,
    /// Custom debug lines
    custom_lines: Vec<String>,
}

impl DebugInfo {
    pub fn new() -> Self {
        Self::with_samples(FrameStats::DEFAULT_SAMPLES, Profiler::DEFAULT_SAMPLES)
    }

    pub fn with_samples(frame_samples: usize, profiler_samples: usize) -> Self {
        Self {
            enabled: false,
            frame_stats: FrameStats::with_samples(frame_samples),
            profiler: Profiler::new(profiler_samples),
            scene: SceneCounts::default(),
            custom_lines: Vec::new(),
        }
    }

    /// Toggle debug overlay
    pub fn toggle(&mut self) {
        self.enabled = !self.enabled;
    }

    /// Add a custom debug line
    pub fn add_line(&mut self, line: impl Into<String>) {
        self.custom_lines.push(line.into());
    }

    pub fn clear_lines(&mut self) {
        self.custom_lines.clear();
    }

    /// Frame stats, entity counts, profiler scopes, then custom lines
    pub fn get_all_lines(&self) -> Vec<String> {
        let mut lines = vec![
            self.frame_stats.format_stats(),
            format!(
                "Entities: {} live, {} pending, {} drawn",
                self.scene.live, self.scene.pending_add, self.scene.renderable
            ),
        ];
        lines.extend(self.profiler.report().lines().map(str::to_string));
        lines.extend(self.custom_lines.iter().cloned());
        lines
    }

    /// Record a frame
    pub fn record_frame(&mut self, delta: Duration) {
        self.frame_stats.record_frame(delta);
    }
}
