//! Engine configuration
//!
//! Built in code with the `with_*` methods, or loaded from RON or JSON.
//! Missing fields fall back to their defaults.
//!
//! ```ron
//! (
//!     title: "Demo",
//!     width: 1280,
//!     height: 720,
//!     max_delta_seconds: 0.1,
//!     frame_limit: Some(600),
//! )
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::debug::FrameStats;
use super::profiler::Profiler;
use super::time::Time;

/// Errors from loading or validating a configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid RON config: {0}")]
    Ron(#[from] ron::error::SpannedError),

    #[error("invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Window title
    pub title: String,
    /// Initial window width
    pub width: u32,
    /// Initial window height
    pub height: u32,
    /// Upper bound for a single frame's delta time
    pub max_delta_seconds: f32,
    /// Rolling window of the profiler
    pub profiler_samples: usize,
    /// Rolling window of the frame statistics
    pub frame_stats_samples: usize,
    /// Close the default headless window after this many frames
    pub frame_limit: Option<u64>,
    /// `env_logger` filter used when `RUST_LOG` is unset
    pub log_filter: Option<String>,
    /// Write the profiler CSV here on shutdown
    pub profiler_csv: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            title: String::from("Forge"),
            width: 1280,
            height: 720,
            max_delta_seconds: Time::DEFAULT_MAX_DELTA.as_secs_f32(),
            profiler_samples: Profiler::DEFAULT_SAMPLES,
            frame_stats_samples: FrameStats::DEFAULT_SAMPLES,
            frame_limit: None,
            log_filter: None,
            profiler_csv: None,
        }
    }
}

impl EngineConfig {
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set window dimensions
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_max_delta_time(mut self, max_delta: Duration) -> Self {
        self.max_delta_seconds = max_delta.as_secs_f32();
        self
    }

    pub fn with_profiler_samples(mut self, samples: usize) -> Self {
        self.profiler_samples = samples;
        self
    }

    pub fn with_frame_stats_samples(mut self, samples: usize) -> Self {
        self.frame_stats_samples = samples;
        self
    }

    pub fn with_frame_limit(mut self, frames: u64) -> Self {
        self.frame_limit = Some(frames);
        self
    }

    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = Some(filter.into());
        self
    }

    pub fn with_profiler_csv(mut self, path: impl Into<PathBuf>) -> Self {
        self.profiler_csv = Some(path.into());
        self
    }

    /// Clamp for frame deltas, falling back to the default when the field is unusable
    pub fn max_delta_time(&self) -> Duration {
        match Duration::try_from_secs_f32(self.max_delta_seconds) {
            Ok(duration) if !duration.is_zero() => duration,
            _ => {
                log::warn!(
                    "Ignoring max_delta_seconds = {}; using {:?}",
                    self.max_delta_seconds,
                    Time::DEFAULT_MAX_DELTA
                );
                Time::DEFAULT_MAX_DELTA
            }
        }
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::Invalid {
                field: "width/height",
                reason: format!("window size {}x{} has a zero side", self.width, self.height),
            });
        }
        if !(self.max_delta_seconds.is_finite() && self.max_delta_seconds > 0.0) {
            return Err(ConfigError::Invalid {
                field: "max_delta_seconds",
                reason: format!("{} is not a positive number", self.max_delta_seconds),
            });
        }
        if self.profiler_samples == 0 || self.frame_stats_samples == 0 {
            return Err(ConfigError::Invalid {
                field: "profiler_samples/frame_stats_samples",
                reason: String::from("sample windows must hold at least one frame"),
            });
        }
        Ok(())
    }

    pub fn from_ron_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = ron::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_ron(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_ron_str(&read(path.as_ref())?)
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_json_str(&read(path.as_ref())?)
    }

    pub fn to_ron_string(&self) -> Result<String, ron::Error> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
    }
}

fn read(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}
