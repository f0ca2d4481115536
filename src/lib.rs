//! Scene-graph transforms and deferred entity lifecycle for a real-time frame loop
//!
//! This crate provides:
//! - A parent/child transform hierarchy with lazily cached world matrices
//! - A scene that defers entity creation and destruction to a sync point
//! - A frame loop driven by pluggable clock, input, window and render services
//! - Frame statistics and a named-scope CPU profiler

/// Log a broken internal invariant, then panic.
///
/// Reserved for logic bugs in calling code; recoverable failures return `Result`.
macro_rules! invariant_violation {
    ($($arg:tt)+) => {{
        log::error!($($arg)+);
        panic!($($arg)+)
    }};
}
pub(crate) use invariant_violation;

pub mod core;
pub mod ecs;
pub mod input;

// Re-exports for convenience
pub use glam;
pub use hecs;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::core::{
        CameraView, DebugInfo, Engine, EngineConfig, EngineContext, FixedClock, FrameStats, Game,
        HeadlessWindow, RenderFrame, RenderSink, Scene, SceneEvent, Time, UpdateContext,
    };
    pub use crate::ecs::{
        Behaviour, Camera, Entity, EntityBuilder, EntityKind, Name, Renderable, Transform,
        TransformError, World,
    };
    pub use crate::input::{Input, KeyCode};
    pub use glam::{Mat4, Quat, Vec2, Vec3, Vec4};
}
