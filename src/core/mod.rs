//! Core engine module
//!
//! The frame loop, the entity lifecycle manager, and the services they consume.

mod config;
mod debug;
mod engine;
mod events;
mod profiler;
mod scene;
mod services;
mod time;

pub use config::{ConfigError, EngineConfig};
pub use debug::{DebugInfo, FrameStats, SceneCounts};
pub use engine::{Engine, EngineContext, EngineError, Game};
pub use events::{EventQueue, SceneEvent};
pub use profiler::{Profiler, ProfilerError, ScopeStats};
pub use scene::{Scene, SceneError, SyncReport, UpdateContext};
pub use services::{
    CameraView, Clock, FixedClock, HeadlessWindow, InputSource, NullInput, NullRenderer,
    RenderFrame, RenderItem, RenderSink, ScriptedInput, SystemClock, Window,
};
pub use time::Time;
