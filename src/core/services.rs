//! Collaborators the frame loop consumes
//!
//! The engine never talks to an OS window, a GPU, or the wall clock directly.
//! Each is a trait object handed to [`Engine`](crate::core::Engine), with a
//! headless implementation provided so the whole loop runs in tests.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use glam::Mat4;
use hecs::Entity;

use crate::core::{Scene, Time};
use crate::ecs::{Renderable, World};
use crate::input::{Input, InputEvent};

// ============================================================================
// Clock
// ============================================================================

/// Source of per-frame delta time.
pub trait Clock {
    /// Time elapsed since the previous call
    fn delta_time(&mut self) -> Duration;
}

/// Wall-clock time. The first call reports zero.
#[derive(Debug, Default)]
pub struct SystemClock {
    last: Option<Instant>,
}

impl SystemClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for SystemClock {
    fn delta_time(&mut self) -> Duration {
        let now = Instant::now();
        let delta = self.last.map_or(Duration::ZERO, |last| now - last);
        self.last = Some(now);
        delta
    }
}

/// Reports the same delta every frame.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub Duration);

impl FixedClock {
    /// Clock stepping at `fps` frames per second
    pub fn from_fps(fps: u32) -> Self {
        Self(Duration::from_secs(1) / fps.max(1))
    }
}

impl Clock for FixedClock {
    fn delta_time(&mut self) -> Duration {
        self.0
    }
}

// ============================================================================
// Input
// ============================================================================

/// Feeds device events into the input state once per tick.
pub trait InputSource {
    fn poll(&mut self, input: &mut Input);
}

/// No devices attached.
#[derive(Debug, Default)]
pub struct NullInput;

impl InputSource for NullInput {
    fn poll(&mut self, _input: &mut Input) {}
}

/// Replays pre-recorded batches of events, one batch per tick.
#[derive(Debug, Default)]
pub struct ScriptedInput {
    frames: VecDeque<Vec<InputEvent>>,
}

impl ScriptedInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the events delivered on the next unscripted tick
    pub fn then(mut self, events: impl IntoIterator<Item = InputEvent>) -> Self {
        self.frames.push_back(events.into_iter().collect());
        self
    }

    /// Queue a tick with no events
    pub fn idle(self) -> Self {
        self.then([])
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl InputSource for ScriptedInput {
    fn poll(&mut self, input: &mut Input) {
        if let Some(events) = self.frames.pop_front() {
            for event in events {
                input.process_event(event);
            }
        }
    }
}

// ============================================================================
// Window
// ============================================================================

/// The surface the game runs in. Controls whether the loop continues.
pub trait Window {
    /// Process pending OS events; called once at the start of each tick
    fn pump(&mut self);

    fn is_alive(&self) -> bool;

    fn width(&self) -> u32;

    fn height(&self) -> u32;
}

/// A window with no surface, optionally closing itself after a number of frames.
#[derive(Debug, Clone)]
pub struct HeadlessWindow {
    width: u32,
    height: u32,
    frames: u64,
    frame_limit: Option<u64>,
    pending_resize: Option<(u32, u32)>,
    closed: bool,
}

impl HeadlessWindow {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            frames: 0,
            frame_limit: None,
            pending_resize: None,
            closed: false,
        }
    }

    /// Stay alive for exactly `frames` pumps
    pub fn with_frame_limit(mut self, frames: u64) -> Self {
        self.frame_limit = Some(frames);
        self
    }

    /// Apply a new size at the next pump, as an OS resize would
    pub fn request_resize(&mut self, width: u32, height: u32) {
        self.pending_resize = Some((width, height));
    }

    pub fn close(&mut self) {
        self.closed = true;
    }

    /// Number of pumps so far
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl Window for HeadlessWindow {
    fn pump(&mut self) {
        self.frames += 1;
        if let Some((width, height)) = self.pending_resize.take() {
            self.width = width;
            self.height = height;
        }
    }

    fn is_alive(&self) -> bool {
        !self.closed && self.frame_limit.is_none_or(|limit| self.frames < limit)
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }
}

// ============================================================================
// Render hand-off
// ============================================================================

/// Consumes one frame's worth of scene state.
pub trait RenderSink {
    fn render(&mut self, frame: &RenderFrame<'_>);
}

/// Discards every frame.
#[derive(Debug, Default)]
pub struct NullRenderer;

impl RenderSink for NullRenderer {
    fn render(&mut self, _frame: &RenderFrame<'_>) {}
}

/// The active camera's matrices for this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraView {
    pub entity: Entity,
    pub view: Mat4,
    pub projection: Mat4,
}

impl CameraView {
    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }
}

/// One visible entity ready to draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderItem {
    pub entity: Entity,
    pub world: Mat4,
    pub renderable: Renderable,
}

/// Read-only view of the scene after the sync point.
///
/// Only settled entities are visible here: pending ones and ones promoted at
/// this tick's sync point are skipped.
pub struct RenderFrame<'a> {
    scene: &'a Scene,
    time: &'a Time,
    items: Vec<RenderItem>,
}

impl<'a> RenderFrame<'a> {
    pub fn new(scene: &'a Scene, time: &'a Time) -> Self {
        Self {
            items: collect_renderables(scene),
            scene,
            time,
        }
    }

    pub fn time(&self) -> &'a Time {
        self.time
    }

    pub fn world(&self) -> &'a World {
        self.scene.world()
    }

    /// Entities in this frame, in creation order
    pub fn entities(&self) -> &'a [Entity] {
        self.scene.settled()
    }

    pub fn camera(&self) -> Option<CameraView> {
        let entity = self.scene.active_camera()?;
        let (view, projection) = self.scene.world().camera_matrices(entity)?;
        Some(CameraView {
            entity,
            view,
            projection,
        })
    }

    /// Visible entities with a [`Renderable`], in creation order
    pub fn renderables(&self) -> &[RenderItem] {
        &self.items
    }
}

fn collect_renderables(scene: &Scene) -> Vec<RenderItem> {
    let world = scene.world();
    let mut items = Vec::new();

    for &entity in scene.settled() {
        // Copy out so no component borrow is held across the matrix query
        let Some(renderable) = world.get::<Renderable>(entity).ok().map(|r| *r) else {
            continue;
        };
        if !renderable.visible {
            continue;
        }
        match world.world_matrix(entity) {
            Ok(matrix) => items.push(RenderItem {
                entity,
                world: matrix,
                renderable,
            }),
            Err(e) => crate::invariant_violation!("live entity {entity:?} unrenderable: {e}"),
        }
    }
    items
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::ecs::{Camera, EntityBuilder};
    use crate::input::KeyCode;

    #[test]
    fn test_fixed_clock() {
        let mut clock = FixedClock::from_fps(50);
        assert_eq!(clock.delta_time(), Duration::from_millis(20));
        assert_eq!(clock.delta_time(), Duration::from_millis(20));
    }

    #[test]
    fn test_system_clock_starts_at_zero() {
        let mut clock = SystemClock::new();
        assert_eq!(clock.delta_time(), Duration::ZERO);
    }

    #[test]
    fn test_headless_window_frame_limit_and_resize() {
        let mut window = HeadlessWindow::new(800, 600).with_frame_limit(2);
        assert!(window.is_alive());

        window.request_resize(1024, 768);
        assert_eq!(window.width(), 800);
        window.pump();
        assert_eq!((window.width(), window.height()), (1024, 768));
        assert!(window.is_alive());

        window.pump();
        assert!(!window.is_alive());
    }

    #[test]
    fn test_scripted_input_one_batch_per_poll() {
        let mut source = ScriptedInput::new()
            .then([InputEvent::key_pressed(KeyCode::Space)])
            .idle();
        let mut input = Input::new();

        source.poll(&mut input);
        assert!(input.is_key_just_pressed(KeyCode::Space));

        input.begin_frame();
        source.poll(&mut input);
        assert!(input.is_key_pressed(KeyCode::Space));
        assert!(!input.is_key_just_pressed(KeyCode::Space));
        assert_eq!(source.remaining(), 0);
    }

    #[test]
    fn test_render_frame_sees_only_settled_visible_entities() {
        let mut scene = Scene::new();
        let shown = scene.instantiate(|e: &mut EntityBuilder| {
            e.with_position(Vec3::new(1.0, 0.0, 0.0))
                .with(Renderable::new(1, 1));
        });
        scene.instantiate(|e: &mut EntityBuilder| {
            let mut hidden = Renderable::new(2, 2);
            hidden.visible = false;
            e.with(hidden);
        });
        scene.instantiate(|_: &mut EntityBuilder| {});
        scene.sync();
        scene.sync();
        // Promoted at the latest sync point: live, but held back this frame
        let fresh = scene.instantiate(|e: &mut EntityBuilder| {
            e.with(Renderable::new(3, 3));
        });
        scene.sync();
        // Still pending
        scene.instantiate(|e: &mut EntityBuilder| {
            e.with(Renderable::new(4, 4));
        });
        assert!(scene.is_live(fresh));

        let time = Time::new();
        let frame = RenderFrame::new(&scene, &time);
        let items = frame.renderables();

        assert_eq!(frame.entities().len(), 3);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].entity, shown);
        assert_eq!(items[0].world.w_axis.truncate(), Vec3::new(1.0, 0.0, 0.0));
        assert!(frame.camera().is_none());
    }

    #[test]
    fn test_render_frame_camera_view() {
        let mut scene = Scene::new();
        let camera = scene.instantiate(|e: &mut EntityBuilder| {
            e.with_position(Vec3::new(0.0, 0.0, 10.0))
                .with(Camera::default());
        });
        scene.sync();
        scene.set_active_camera(Some(camera)).unwrap();

        let time = Time::new();
        let frame = RenderFrame::new(&scene, &time);
        let view = frame.camera().unwrap();

        assert_eq!(view.entity, camera);
        let origin_in_view = view.view.transform_point3(Vec3::ZERO);
        assert!((origin_in_view - Vec3::new(0.0, 0.0, -10.0)).length() < 1e-5);
    }
}
