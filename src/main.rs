//! Headless demo: an orbiting moon, a spawner and short-lived debris

use std::time::Duration;

use forge::prelude::*;

/// Spins its entity around local Y
struct Spinner {
    speed: f32,
}

impl Behaviour for Spinner {
    fn update(&mut self, entity: Entity, ctx: &mut UpdateContext<'_>) {
        let angle = self.speed * ctx.time.delta_seconds();
        if let Ok(mut transform) = ctx.scene.world_mut().transform_mut(entity) {
            transform.rotate_local(Vec3::new(0.0, angle, 0.0));
        }
    }
}

/// Destroys its entity once its lifetime runs out
struct Debris {
    remaining: f32,
}

impl Behaviour for Debris {
    fn update(&mut self, entity: Entity, ctx: &mut UpdateContext<'_>) {
        self.remaining -= ctx.time.delta_seconds();
        if self.remaining <= 0.0 {
            ctx.scene.destroy(entity);
        }
    }

    fn on_destroy(&mut self, entity: Entity, world: &mut World) {
        if let Ok(position) = world.global_transform(entity).map(|g| g.position()) {
            log::info!("Debris {entity:?} expired at {position:?}");
        }
    }
}

/// Drops a piece of debris at the moon's world position every half second
struct Spawner {
    moon: Entity,
    cooldown: f32,
}

impl Behaviour for Spawner {
    fn update(&mut self, _entity: Entity, ctx: &mut UpdateContext<'_>) {
        self.cooldown -= ctx.time.delta_seconds();
        if self.cooldown > 0.0 {
            return;
        }
        self.cooldown += 0.5;

        let Ok(at) = ctx.scene.world().global_transform(self.moon).map(|g| g.position()) else {
            return;
        };
        ctx.scene.instantiate(move |e: &mut EntityBuilder| {
            e.with_name("debris")
                .with_position(at)
                .with_scale(Vec3::splat(0.2))
                .with(Renderable::new(2, 1))
                .with_behaviour(Debris { remaining: 1.2 });
        });
    }
}

/// Logs a summary of every 30th frame
struct LogRenderer;

impl RenderSink for LogRenderer {
    fn render(&mut self, frame: &RenderFrame<'_>) {
        let time = frame.time();
        if time.frame_count() % 30 != 0 {
            return;
        }
        let drawn = frame.renderables();
        let camera = frame.camera().map(|c| c.entity);
        log::info!(
            "frame {} t={:.2}s: {} live, {} drawn, camera {:?}",
            time.frame_count(),
            time.elapsed_seconds(),
            frame.entities().len(),
            drawn.len(),
            camera
        );
    }
}

struct DemoGame;

impl Game for DemoGame {
    fn init(&mut self, ctx: &mut EngineContext) {
        log::info!("Initializing demo scene");

        let planet = ctx.scene.instantiate(|e: &mut EntityBuilder| {
            e.with_name("planet")
                .with(Renderable::new(1, 1))
                .with_behaviour(Spinner { speed: 1.0 });
        });
        let moon = ctx.scene.instantiate(move |e: &mut EntityBuilder| {
            e.with_name("moon")
                .with_parent(planet)
                .with_position(Vec3::new(4.0, 0.0, 0.0))
                .with_scale(Vec3::splat(0.5))
                .with(Renderable::new(1, 2));
        });
        ctx.scene.instantiate(move |e: &mut EntityBuilder| {
            e.with_name("spawner").with_behaviour(Spawner {
                moon,
                cooldown: 0.0,
            });
        });

        let aspect_size = (ctx.width(), ctx.height());
        let camera = ctx.scene.instantiate(move |e: &mut EntityBuilder| {
            let mut camera = Camera::default();
            camera.set_aspect(aspect_size.0, aspect_size.1);
            e.with_name("camera")
                .with_position(Vec3::new(0.0, 6.0, 12.0))
                .with(camera);
        });
        match ctx.scene.world_mut().transform_mut(camera) {
            Ok(mut transform) => {
                if let Err(e) = transform.look_at(Vec3::ZERO) {
                    log::warn!("Camera could not face the planet: {e}");
                }
            }
            Err(e) => log::warn!("Camera transform missing: {e}"),
        }
        if let Err(e) = ctx.scene.set_active_camera(Some(camera)) {
            log::warn!("No active camera: {e}");
        }
    }

    fn post_update(&mut self, ctx: &mut EngineContext) {
        for event in ctx.scene.events().iter() {
            log::debug!("{event:?}");
        }
    }

    fn shutdown(&mut self, ctx: &mut EngineContext) {
        for line in ctx.debug.get_all_lines() {
            log::info!("{line}");
        }
    }
}

fn main() {
    let config = EngineConfig::default()
        .with_title("Forge Demo")
        .with_size(1280, 720)
        .with_frame_limit(180)
        .with_log_filter("info");

    let engine = Engine::new(config, DemoGame)
        .with_clock(FixedClock(Duration::from_millis(16)))
        .with_renderer(LogRenderer);

    if let Err(e) = engine.run() {
        eprintln!("Engine error: {}", e);
    }
}
