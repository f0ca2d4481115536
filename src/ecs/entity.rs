//! Entity assembly and per-entity behaviour
//!
//! Entities are composed, not subclassed: an [`EntityKind`] fills an
//! [`EntityBuilder`] with capabilities, and an optional [`Behaviour`] provides
//! the per-tick update hook.

use glam::{Quat, Vec3};
use hecs::Entity;

use super::components::{Name, Sequence};
use super::transform::Transform;
use super::world::World;
use crate::core::UpdateContext;

/// Per-entity logic invoked once per tick while the entity is live.
///
/// Behaviours may move their own entity, read other entities, and request
/// creation or destruction through the context. Structural requests take
/// effect at the next sync point.
pub trait Behaviour: Send + Sync + 'static {
    /// Called once per tick during the update phase.
    fn update(&mut self, entity: Entity, ctx: &mut UpdateContext<'_>);

    /// Called when the entity is torn down, before its components are dropped.
    fn on_destroy(&mut self, _entity: Entity, _world: &mut World) {}
}

/// Storage slot for an entity's behaviour.
///
/// Empty while the behaviour is running so the scene can be borrowed mutably.
pub(crate) struct Script(pub(crate) Option<Box<dyn Behaviour>>);

/// Something that knows how to assemble an entity.
///
/// Implemented for closures, so one-off entities need no dedicated type:
///
/// ```ignore
/// let enemy = scene.instantiate(|e: &mut EntityBuilder| {
///     e.with_name("enemy").with_position(Vec3::X).with_behaviour(Patrol::default());
/// });
/// ```
pub trait EntityKind {
    fn assemble(self, entity: &mut EntityBuilder);
}

impl<F> EntityKind for F
where
    F: FnOnce(&mut EntityBuilder),
{
    fn assemble(self, entity: &mut EntityBuilder) {
        self(entity);
    }
}

/// Collects the capabilities of an entity before it is spawned.
pub struct EntityBuilder {
    components: hecs::EntityBuilder,
    transform: Transform,
    parent: Option<Entity>,
    behaviour: Option<Box<dyn Behaviour>>,
}

impl EntityBuilder {
    pub(crate) fn new() -> Self {
        Self {
            components: hecs::EntityBuilder::new(),
            transform: Transform::new(),
            parent: None,
            behaviour: None,
        }
    }

    /// Initial local position
    pub fn with_position(&mut self, position: Vec3) -> &mut Self {
        self.transform =
            Transform::from_parts(position, self.transform.rotation(), self.transform.scale());
        self
    }

    /// Initial local rotation
    pub fn with_rotation(&mut self, rotation: Quat) -> &mut Self {
        self.transform =
            Transform::from_parts(self.transform.position(), rotation, self.transform.scale());
        self
    }

    /// Initial local scale
    pub fn with_scale(&mut self, scale: Vec3) -> &mut Self {
        self.transform =
            Transform::from_parts(self.transform.position(), self.transform.rotation(), scale);
        self
    }

    /// Attach to a parent on creation; the initial transform is then local to it
    pub fn with_parent(&mut self, parent: Entity) -> &mut Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.components.add(Name::new(name));
        self
    }

    /// Per-tick logic; replaces any previously set behaviour
    pub fn with_behaviour(&mut self, behaviour: impl Behaviour) -> &mut Self {
        self.behaviour = Some(Box::new(behaviour));
        self
    }

    /// Any other capability.
    ///
    /// The transform is managed by the builder itself; a `Transform` passed
    /// here is overwritten.
    pub fn with<T: hecs::Component>(&mut self, component: T) -> &mut Self {
        self.components.add(component);
        self
    }

    /// Spawn into the world and wire up the parent link.
    pub(crate) fn spawn(mut self, world: &mut World, sequence: Sequence) -> Entity {
        self.components.add(self.transform).add(sequence);
        if let Some(behaviour) = self.behaviour {
            self.components.add(Script(Some(behaviour)));
        }
        let entity = world.spawn(&mut self.components);

        if let Some(parent) = self.parent {
            let attached = world
                .transform_mut(entity)
                .and_then(|mut t| t.set_parent(Some(parent), false));
            if let Err(e) = attached {
                log::warn!("Spawned {entity:?} at the root level: {e}");
            }
        }
        entity
    }
}
