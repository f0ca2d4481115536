//! Entity lifecycle management
//!
//! The [`Scene`] owns the registry of live entities and the two queues that
//! defer structural changes to a sync point between update and render.
//!
//! # Tick Phases
//!
//! 1. [`Scene::update`] visits a snapshot of the live set in creation order.
//!    `instantiate` and `destroy` calls made here only enqueue.
//! 2. [`Scene::sync`] applies deletions, then additions.
//! 3. The render collaborator reads the scene through a shared borrow.
//!
//! An entity destroyed during update was still updated this tick but is gone
//! before render. An entity instantiated during update exists in the world
//! immediately (its transform can be edited) and is promoted to live at this
//! tick's sync point, but [`Scene::settled`] leaves it out of this tick's
//! render pass. It is first updated and rendered on the following tick.
//!
//! The phase methods are driven by the engine. Calling them from inside a
//! behaviour is a logic bug and panics.
//!
//! Misuse of the registry (destroying twice, destroying something that is not
//! live, promoting an already-live entity) is a logic bug and panics.

use hecs::Entity;
use rustc_hash::FxHashSet;

use crate::core::events::{EventQueue, SceneEvent};
use crate::core::Time;
use crate::ecs::{Behaviour, Camera, EntityBuilder, EntityKind, Script, Sequence, World};
use crate::input::Input;

/// Errors from scene-level operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SceneError {
    #[error("entity {0:?} does not exist")]
    NoSuchEntity(Entity),

    #[error("entity {0:?} has no camera component")]
    NotACamera(Entity),
}

/// What a sync point changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Live entities removed and torn down
    pub destroyed: usize,
    /// Pending entities destroyed before they were ever promoted
    pub cancelled: usize,
    /// Entities promoted to live
    pub spawned: usize,
}

/// Everything a behaviour may touch during the update phase.
pub struct UpdateContext<'a> {
    /// The scene, for transforms and deferred structural changes
    pub scene: &'a mut Scene,
    /// Frame timing
    pub time: &'a Time,
    /// Input polled at the start of the tick
    pub input: &'a Input,
}

/// Registry of live entities plus the deferred add and delete queues.
pub struct Scene {
    world: World,

    /// Live entities in creation order
    live: Vec<Entity>,
    live_set: FxHashSet<Entity>,

    pending_add: Vec<Entity>,
    pending_delete: Vec<Entity>,
    pending_delete_set: FxHashSet<Entity>,

    next_sequence: u64,
    active_camera: Option<Entity>,
    events: EventQueue<SceneEvent>,

    /// Length of the prefix of `live` that was live before the last sync's additions
    settled_len: usize,
    /// Set while behaviours run
    updating: bool,

    /// Reused snapshot buffer for the update phase
    snapshot: Vec<Entity>,
}

impl Scene {
    pub fn new() -> Self {
        Self {
            world: World::new(),
            live: Vec::new(),
            live_set: FxHashSet::default(),
            pending_add: Vec::new(),
            pending_delete: Vec::new(),
            pending_delete_set: FxHashSet::default(),
            next_sequence: 0,
            active_camera: None,
            events: EventQueue::new(),
            settled_len: 0,
            updating: false,
            snapshot: Vec::new(),
        }
    }

    // -------------------------------------------------------------------------
    // Structural requests
    // -------------------------------------------------------------------------

    /// Construct an entity and queue it for promotion at the next sync point.
    ///
    /// The returned handle is valid immediately: components and transform
    /// can be read and edited within the same tick.
    pub fn instantiate(&mut self, kind: impl EntityKind) -> Entity {
        let mut builder = EntityBuilder::new();
        kind.assemble(&mut builder);

        let sequence = Sequence(self.next_sequence);
        self.next_sequence += 1;

        let entity = builder.spawn(&mut self.world, sequence);
        self.pending_add.push(entity);
        log::trace!("Instantiated {entity:?} (sequence {})", sequence.0);
        entity
    }

    /// Queue an entity for destruction at the next sync point.
    ///
    /// Destroying an entity that is still pending-add cancels its promotion.
    ///
    /// # Panics
    ///
    /// If the entity was already destroyed this tick, or is neither live nor
    /// pending-add.
    pub fn destroy(&mut self, entity: Entity) {
        if self.pending_delete_set.contains(&entity) {
            crate::invariant_violation!("entity {entity:?} destroyed twice in one tick");
        }
        if !self.live_set.contains(&entity) && !self.pending_add.contains(&entity) {
            crate::invariant_violation!("destroy of entity {entity:?} which is not live");
        }
        self.pending_delete_set.insert(entity);
        self.pending_delete.push(entity);
        log::trace!("Queued {entity:?} for destruction");
    }

    // -------------------------------------------------------------------------
    // Tick phases
    // -------------------------------------------------------------------------

    /// Start a new tick: last tick's events become readable.
    pub(crate) fn begin_tick(&mut self) {
        self.reject_reentry("begin_tick");
        self.events.swap();
    }

    /// Run every live entity's behaviour once.
    ///
    /// The set of visited entities is fixed when the phase starts.
    pub(crate) fn update(&mut self, time: &Time, input: &Input) {
        self.reject_reentry("update");
        self.updating = true;
        let mut snapshot = std::mem::take(&mut self.snapshot);
        snapshot.clear();
        snapshot.extend_from_slice(&self.live);

        for &entity in &snapshot {
            let Some(mut behaviour) = self.take_behaviour(entity) else {
                continue;
            };
            {
                let mut ctx = UpdateContext {
                    scene: self,
                    time,
                    input,
                };
                behaviour.update(entity, &mut ctx);
            }
            self.restore_behaviour(entity, behaviour);
        }

        self.snapshot = snapshot;
        self.updating = false;
    }

    /// Apply queued deletions, then queued additions.
    ///
    /// Entities promoted here are live from now on but not part of
    /// [`Scene::settled`] until the next sync point.
    pub(crate) fn sync(&mut self) -> SyncReport {
        self.reject_reentry("sync");
        let mut report = SyncReport::default();
        self.apply_deletes(&mut report);
        self.settled_len = self.live.len();
        self.apply_adds(&mut report);

        if report != SyncReport::default() {
            log::debug!(
                "Sync: {} destroyed, {} cancelled, {} spawned, {} live",
                report.destroyed,
                report.cancelled,
                report.spawned,
                self.live.len()
            );
        }
        report
    }

    fn reject_reentry(&self, phase: &str) {
        if self.updating {
            crate::invariant_violation!("Scene::{phase} called from inside the update phase");
        }
    }

    fn apply_deletes(&mut self, report: &mut SyncReport) {
        if self.pending_delete.is_empty() {
            return;
        }
        let doomed = std::mem::take(&mut self.pending_delete);
        self.pending_delete_set.clear();

        let mut removed_live = false;
        for &entity in &doomed {
            if self.live_set.remove(&entity) {
                removed_live = true;
                report.destroyed += 1;
            } else if let Some(index) = self.pending_add.iter().position(|e| *e == entity) {
                self.pending_add.remove(index);
                report.cancelled += 1;
            } else {
                crate::invariant_violation!(
                    "pending delete {entity:?} is neither live nor pending-add"
                );
            }
        }
        if removed_live {
            let live_set = &self.live_set;
            self.live.retain(|e| live_set.contains(e));
        }

        for entity in doomed {
            self.teardown(entity);
        }
    }

    fn apply_adds(&mut self, report: &mut SyncReport) {
        for entity in std::mem::take(&mut self.pending_add) {
            if !self.live_set.insert(entity) {
                crate::invariant_violation!("entity {entity:?} promoted while already live");
            }
            self.live.push(entity);
            self.events.push(SceneEvent::Spawned { entity });
            report.spawned += 1;
        }
    }

    fn teardown(&mut self, entity: Entity) {
        if let Some(mut behaviour) = self.take_behaviour(entity) {
            behaviour.on_destroy(entity, &mut self.world);
        }

        let orphans = match self.world.detach_for_despawn(entity) {
            Ok(orphans) => orphans,
            Err(e) => crate::invariant_violation!("teardown of {entity:?} failed: {e}"),
        };
        for orphan in orphans {
            self.events.push(SceneEvent::Orphaned {
                entity: orphan,
                former_parent: entity,
            });
        }

        if self.world.despawn(entity).is_err() {
            crate::invariant_violation!("entity {entity:?} vanished before teardown");
        }
        if self.active_camera == Some(entity) {
            log::debug!("Active camera {entity:?} destroyed");
            self.active_camera = None;
        }
        self.events.push(SceneEvent::Destroyed { entity });
    }

    fn take_behaviour(&mut self, entity: Entity) -> Option<Box<dyn Behaviour>> {
        self.world
            .get_mut::<Script>(entity)
            .ok()
            .and_then(|mut script| script.0.take())
    }

    fn restore_behaviour(&mut self, entity: Entity, behaviour: Box<dyn Behaviour>) {
        match self.world.get_mut::<Script>(entity) {
            Ok(mut script) => script.0 = Some(behaviour),
            Err(e) => crate::invariant_violation!(
                "entity {entity:?} lost its behaviour slot during update: {e}"
            ),
        }
    }

    // -------------------------------------------------------------------------
    // Camera
    // -------------------------------------------------------------------------

    /// Select which camera entity the render hand-off uses.
    pub fn set_active_camera(&mut self, camera: Option<Entity>) -> Result<(), SceneError> {
        if let Some(entity) = camera {
            if !self.world.contains(entity) {
                return Err(SceneError::NoSuchEntity(entity));
            }
            if self.world.get::<Camera>(entity).is_err() {
                return Err(SceneError::NotACamera(entity));
            }
        }
        self.active_camera = camera;
        Ok(())
    }

    pub fn active_camera(&self) -> Option<Entity> {
        self.active_camera
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    /// Component storage, including pending entities
    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Live entities in creation order
    pub fn live(&self) -> &[Entity] {
        &self.live
    }

    /// Live entities that were already live before the last sync's additions.
    ///
    /// This is what the render hand-off sees: entities promoted at this tick's
    /// sync point are held back until the next tick.
    pub fn settled(&self) -> &[Entity] {
        &self.live[..self.settled_len.min(self.live.len())]
    }

    pub fn is_live(&self, entity: Entity) -> bool {
        self.live_set.contains(&entity)
    }

    /// Entities waiting for promotion at the next sync point
    pub fn pending_add(&self) -> &[Entity] {
        &self.pending_add
    }

    /// Entities waiting for destruction at the next sync point
    pub fn pending_delete(&self) -> &[Entity] {
        &self.pending_delete
    }

    pub fn is_pending_delete(&self, entity: Entity) -> bool {
        self.pending_delete_set.contains(&entity)
    }

    /// Creation-sequence number of an entity
    pub fn sequence(&self, entity: Entity) -> Option<u64> {
        self.world.get::<Sequence>(entity).ok().map(|s| s.0)
    }

    /// Lifecycle events from the previous tick
    pub fn events(&self) -> &EventQueue<SceneEvent> {
        &self.events
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}
