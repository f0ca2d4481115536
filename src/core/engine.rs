//! Core Engine struct and main game loop
//!
//! One [`Engine::tick`] runs the frame in a fixed order:
//!
//! 1. pump the window and read the clock
//! 2. poll input
//! 3. `Game::pre_update`
//! 4. update every live entity's behaviour
//! 5. `Game::post_update`
//! 6. sync point: apply deletions, then additions
//! 7. hand the scene to the render sink

use super::config::EngineConfig;
use super::debug::{DebugInfo, SceneCounts};
use super::profiler::ProfilerError;
use super::scene::Scene;
use super::services::{
    Clock, HeadlessWindow, InputSource, NullInput, NullRenderer, RenderFrame, RenderSink,
    SystemClock, Window,
};
use super::time::Time;
use crate::ecs::Camera;
use crate::input::Input;

/// Errors that stop the frame loop
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("profiler scopes unbalanced: {0}")]
    Profiler(#[from] ProfilerError),
}

/// Game trait that users implement
pub trait Game: 'static {
    /// Called once before the first tick; entities created here are live on tick one
    fn init(&mut self, engine: &mut EngineContext);

    /// Called every tick before entity behaviours run
    fn pre_update(&mut self, _engine: &mut EngineContext) {}

    /// Called every tick after entity behaviours, before the sync point
    fn post_update(&mut self, _engine: &mut EngineContext) {}

    /// Called when the window is resized
    fn on_resize(&mut self, _engine: &mut EngineContext, _width: u32, _height: u32) {}

    /// Called when the game is shutting down
    fn shutdown(&mut self, _engine: &mut EngineContext) {}
}

/// Context passed to game callbacks
pub struct EngineContext {
    pub time: Time,
    /// Input state for the current tick
    pub input: Input,
    pub scene: Scene,
    /// Debug information and stats
    pub debug: DebugInfo,
    window_size: (u32, u32),
    should_quit: bool,
}

impl EngineContext {
    fn new(config: &EngineConfig) -> Self {
        Self {
            time: Time::with_max_delta(config.max_delta_time()),
            input: Input::new(),
            scene: Scene::new(),
            debug: DebugInfo::with_samples(config.frame_stats_samples, config.profiler_samples),
            window_size: (config.width, config.height),
            should_quit: false,
        }
    }

    pub fn width(&self) -> u32 {
        self.window_size.0
    }

    pub fn height(&self) -> u32 {
        self.window_size.1
    }

    /// Get aspect ratio
    pub fn aspect_ratio(&self) -> f32 {
        self.window_size.0 as f32 / self.window_size.1.max(1) as f32
    }

    /// Request engine shutdown after the current tick
    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }
}

/// Main engine struct
pub struct Engine<G: Game> {
    config: EngineConfig,
    game: G,
    context: EngineContext,
    clock: Box<dyn Clock>,
    input_source: Box<dyn InputSource>,
    window: Box<dyn Window>,
    renderer: Box<dyn RenderSink>,
    initialized: bool,
}

impl<G: Game> Engine<G> {
    /// Engine with a wall clock, no input, a headless window and no renderer
    pub fn new(config: EngineConfig, game: G) -> Self {
        let mut window = HeadlessWindow::new(config.width, config.height);
        if let Some(limit) = config.frame_limit {
            window = window.with_frame_limit(limit);
        }
        Self {
            context: EngineContext::new(&config),
            config,
            game,
            clock: Box::new(SystemClock::new()),
            input_source: Box::new(NullInput),
            window: Box::new(window),
            renderer: Box::new(NullRenderer),
            initialized: false,
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_input(mut self, source: impl InputSource + 'static) -> Self {
        self.input_source = Box::new(source);
        self
    }

    pub fn with_window(mut self, window: impl Window + 'static) -> Self {
        self.context.window_size = (window.width(), window.height());
        self.window = Box::new(window);
        self
    }

    pub fn with_renderer(mut self, renderer: impl RenderSink + 'static) -> Self {
        self.renderer = Box::new(renderer);
        self
    }

    pub fn context(&self) -> &EngineContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut EngineContext {
        &mut self.context
    }

    pub fn game(&self) -> &G {
        &self.game
    }

    /// Call `Game::init` once and promote everything it created
    pub fn init(&mut self) {
        if self.initialized {
            return;
        }
        self.game.init(&mut self.context);
        self.context.scene.sync();
        self.initialized = true;
        log::info!(
            "Engine initialized: {} ({} entities)",
            self.config.title,
            self.context.scene.live().len()
        );
    }

    /// Whether another tick should run
    pub fn is_running(&self) -> bool {
        self.window.is_alive() && !self.context.should_quit
    }

    /// Run one frame
    pub fn tick(&mut self) -> Result<(), EngineError> {
        self.init();
        let ctx = &mut self.context;
        ctx.debug.profiler.begin("frame")?;

        self.window.pump();
        let size = (self.window.width(), self.window.height());
        if size != ctx.window_size && size.0 > 0 && size.1 > 0 {
            ctx.window_size = size;
            resize_active_camera(&mut ctx.scene, size);
            self.game.on_resize(ctx, size.0, size.1);
        }

        ctx.time.advance(self.clock.delta_time());
        ctx.debug.record_frame(ctx.time.delta());

        ctx.input.begin_frame();
        self.input_source.poll(&mut ctx.input);

        ctx.scene.begin_tick();
        self.game.pre_update(ctx);

        ctx.debug.profiler.begin("update")?;
        ctx.scene.update(&ctx.time, &ctx.input);
        ctx.debug.profiler.end("update")?;

        self.game.post_update(ctx);

        ctx.debug.profiler.begin("sync")?;
        ctx.scene.sync();
        ctx.debug.profiler.end("sync")?;

        ctx.debug.profiler.begin("render")?;
        let frame = RenderFrame::new(&ctx.scene, &ctx.time);
        self.renderer.render(&frame);
        ctx.debug.profiler.end("render")?;

        ctx.debug.scene = SceneCounts {
            live: ctx.scene.live().len(),
            pending_add: ctx.scene.pending_add().len(),
            renderable: frame.renderables().len(),
        };
        ctx.debug.profiler.end("frame")?;
        Ok(())
    }

    /// Run until the window closes or the game quits
    pub fn run(mut self) -> Result<G, EngineError> {
        init_logging(self.config.log_filter.as_deref());
        log::info!("Starting engine: {}", self.config.title);

        self.init();
        while self.is_running() {
            self.tick()?;
        }
        self.shutdown();
        Ok(self.game)
    }

    fn shutdown(&mut self) {
        log::info!(
            "Shutting down after {} frames ({})",
            self.context.time.frame_count(),
            self.context.debug.frame_stats.format_stats()
        );
        self.game.shutdown(&mut self.context);

        if let Some(path) = &self.config.profiler_csv {
            if let Err(e) = self.context.debug.profiler.save_csv(path) {
                log::warn!("Could not save profiler log: {e}");
            }
        }
    }
}

fn resize_active_camera(scene: &mut Scene, (width, height): (u32, u32)) {
    let Some(camera) = scene.active_camera() else {
        return;
    };
    if let Ok(mut camera) = scene.world_mut().get_mut::<Camera>(camera) {
        camera.set_aspect(width, height);
    }
}

/// Install `env_logger` unless a logger already exists
fn init_logging(default_filter: Option<&str>) {
    let env = env_logger::Env::default().default_filter_or(default_filter.unwrap_or("info"));
    if env_logger::Builder::from_env(env).try_init().is_err() {
        log::debug!("Logger already initialized");
    }
}
