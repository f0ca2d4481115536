//! World wrapper around hecs
//!
//! Component storage for every entity of a scene, live or pending. Structural
//! changes (spawn, despawn) are crate-private: user code requests them through
//! [`Scene`](crate::core::Scene) so they land at the frame's sync point.

use std::any::TypeId;

use hecs::Entity;

use super::transform::Transform;

/// Component storage plus the transform hierarchy.
///
/// Hierarchy and transform operations live in the `hierarchy` module.
pub struct World {
    pub(super) inner: hecs::World,
}

impl World {
    /// Create a new empty world
    pub fn new() -> Self {
        Self {
            inner: hecs::World::new(),
        }
    }

    /// Spawn an entity from a prepared builder
    pub(crate) fn spawn(&mut self, builder: &mut hecs::EntityBuilder) -> Entity {
        self.inner.spawn(builder.build())
    }

    /// Drop an entity and all of its components.
    ///
    /// Callers must detach it from the hierarchy first.
    pub(crate) fn despawn(&mut self, entity: Entity) -> Result<(), hecs::NoSuchEntity> {
        self.inner.despawn(entity)
    }

    /// Get a reference to a component
    pub fn get<T: hecs::Component>(
        &self,
        entity: Entity,
    ) -> Result<hecs::Ref<'_, T>, hecs::ComponentError> {
        self.inner.get::<&T>(entity)
    }

    /// Get a mutable reference to a component.
    ///
    /// Transforms are excluded: use [`World::transform_mut`] so that
    /// hierarchy bookkeeping stays consistent.
    pub fn get_mut<T: hecs::Component>(
        &mut self,
        entity: Entity,
    ) -> Result<hecs::RefMut<'_, T>, hecs::ComponentError> {
        reject_transform::<T>("get_mut");
        self.inner.get::<&mut T>(entity)
    }

    /// Attach a capability to an existing entity
    pub fn insert_one<T: hecs::Component>(
        &mut self,
        entity: Entity,
        component: T,
    ) -> Result<(), hecs::NoSuchEntity> {
        reject_transform::<T>("insert_one");
        self.inner.insert_one(entity, component)
    }

    /// Detach a capability from an entity, returning it
    pub fn remove_one<T: hecs::Component>(
        &mut self,
        entity: Entity,
    ) -> Result<T, hecs::ComponentError> {
        reject_transform::<T>("remove_one");
        self.inner.remove_one::<T>(entity)
    }

    /// Check if an entity exists
    pub fn contains(&self, entity: Entity) -> bool {
        self.inner.contains(entity)
    }

    /// Get the number of entities, including ones not yet promoted to live
    pub fn len(&self) -> u32 {
        self.inner.len()
    }

    /// Check if the world is empty
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Read every entity carrying a `T`
    pub fn query<T: hecs::Component>(&self) -> hecs::QueryBorrow<'_, &'static T> {
        self.inner.query::<&T>()
    }

    /// Mutate every entity carrying a `T`.
    ///
    /// Transforms are excluded, as for [`World::get_mut`].
    pub fn query_mut<T: hecs::Component>(&mut self) -> hecs::QueryMut<'_, &'static mut T> {
        reject_transform::<T>("query_mut");
        self.inner.query_mut::<&mut T>()
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

/// Swapping or removing a `Transform` behind the hierarchy's back would
/// desynchronize parent and child links.
fn reject_transform<T: 'static>(operation: &str) {
    if TypeId::of::<T>() == TypeId::of::<Transform>() {
        crate::invariant_violation!(
            "World::{operation} cannot be used for Transform; use World::transform_mut"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::{Name, Renderable};

    fn spawn_named(world: &mut World, name: &str) -> Entity {
        let mut builder = hecs::EntityBuilder::new();
        builder.add(Transform::new()).add(Name::new(name));
        world.spawn(&mut builder)
    }

    #[test]
    fn test_spawn_and_lookup() {
        let mut world = World::new();
        let entity = spawn_named(&mut world, "crate");

        assert!(world.contains(entity));
        assert_eq!(world.len(), 1);
        assert_eq!(world.get::<Name>(entity).unwrap().as_str(), "crate");
    }

    #[test]
    fn test_insert_and_remove_capability() {
        let mut world = World::new();
        let entity = spawn_named(&mut world, "lamp");

        world.insert_one(entity, Renderable::new(1, 2)).unwrap();
        assert!(world.get::<Renderable>(entity).is_ok());

        let removed = world.remove_one::<Renderable>(entity).unwrap();
        assert_eq!(removed.mesh, 1);
        assert!(world.get::<Renderable>(entity).is_err());
    }

    #[test]
    #[should_panic(expected = "transform_mut")]
    fn test_get_mut_rejects_transform() {
        let mut world = World::new();
        let entity = spawn_named(&mut world, "root");
        let _ = world.get_mut::<Transform>(entity);
    }

    #[test]
    fn test_query_reads_and_query_mut_writes() {
        let mut world = World::new();
        let a = spawn_named(&mut world, "a");
        spawn_named(&mut world, "b");
        world.insert_one(a, Renderable::new(1, 1)).unwrap();

        for (_, renderable) in world.query_mut::<Renderable>() {
            renderable.visible = false;
        }

        let names: Vec<String> = world
            .query::<Name>()
            .iter()
            .map(|(_, name)| name.0.clone())
            .collect();
        assert_eq!(names.len(), 2);
        assert!(!world.get::<Renderable>(a).unwrap().visible);
    }

    #[test]
    #[should_panic(expected = "transform_mut")]
    fn test_query_mut_rejects_transform() {
        let mut world = World::new();
        spawn_named(&mut world, "root");
        let _ = world.query_mut::<Transform>();
    }
}
