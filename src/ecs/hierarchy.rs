//! Transform hierarchy operations
//!
//! Parent-child relationships between entities, world-matrix caching and the
//! world-space conveniences built on top of them.
//!
//! # Dirty-Flag Protocol
//!
//! Any change to an entity's local state or to its place in the tree marks
//! the entity and its whole subtree dirty. [`World::world_matrix`] is the only
//! consumer of the cache: it walks up to the nearest clean ancestor, then
//! recomputes downwards, caching each node it passes. A clean node therefore
//! always has clean ancestors, and a dirty node always has dirty descendants,
//! which lets dirty propagation stop at nodes that are already dirty.
//!
//! The cache lives inside the `Transform` component and is updated through
//! hecs's runtime-checked borrows, so `world_matrix` takes `&self`: logically
//! pure, physically memoized.

use glam::{Mat3, Mat4, Quat, Vec3};
use hecs::Entity;
use smallvec::{SmallVec, smallvec};

use super::components::{Camera, Name};
use super::transform::Transform;
use super::world::World;

/// Tolerance for degenerate look-at directions
pub const LOOK_AT_EPSILON: f32 = 1e-5;

/// Parent matrices with a smaller absolute determinant cannot be inverted
const SINGULAR_EPSILON: f32 = 1e-8;

/// Recoverable failures of transform and hierarchy operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TransformError {
    /// The handle does not refer to an existing entity
    #[error("entity {0:?} does not exist")]
    NoSuchEntity(Entity),

    /// Reparenting would make an entity its own ancestor
    #[error("cannot parent {child:?} to {parent:?}: it would create a cycle")]
    Cycle { child: Entity, parent: Entity },

    /// The parent's world matrix cannot be inverted (zero scale somewhere up the chain)
    #[error("world matrix of parent {parent:?} of {entity:?} is singular")]
    SingularParent { entity: Entity, parent: Entity },

    /// Look-at target coincides with the entity's position
    #[error("look-at direction for {0:?} has zero length")]
    ZeroLengthDirection(Entity),

    /// Look-at direction is parallel to the world up axis
    #[error("look-at direction for {0:?} is parallel to the up axis")]
    DirectionParallelToUp(Entity),
}

// ============================================================================
// Global Transform
// ============================================================================

/// World-space view of a transform, computed from its world matrix.
#[derive(Debug, Clone, Copy)]
pub struct GlobalTransform {
    /// World-space transformation matrix
    pub matrix: Mat4,
}

impl GlobalTransform {
    /// Create from a transformation matrix
    #[must_use]
    pub const fn new(matrix: Mat4) -> Self {
        Self { matrix }
    }

    /// Get world position
    #[must_use]
    pub fn position(&self) -> Vec3 {
        self.matrix.w_axis.truncate()
    }

    /// Get world rotation (from matrix decomposition)
    #[must_use]
    pub fn rotation(&self) -> Quat {
        self.matrix.to_scale_rotation_translation().1
    }

    /// Get world scale (from matrix decomposition)
    #[must_use]
    pub fn scale(&self) -> Vec3 {
        self.matrix.to_scale_rotation_translation().0
    }

    /// Transform a point from local to world space
    #[must_use]
    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.matrix.transform_point3(point)
    }

    /// Transform a direction vector (ignores translation)
    #[must_use]
    pub fn transform_direction(&self, direction: Vec3) -> Vec3 {
        self.matrix.transform_vector3(direction)
    }
}

// ============================================================================
// Queries
// ============================================================================

impl World {
    /// Borrow an entity's transform for reading.
    ///
    /// Drop the returned guard before calling anything that recomputes world
    /// matrices; hecs enforces the borrow at runtime.
    pub fn transform(&self, entity: Entity) -> Result<hecs::Ref<'_, Transform>, TransformError> {
        self.inner
            .get::<&Transform>(entity)
            .map_err(|_| TransformError::NoSuchEntity(entity))
    }

    /// Get a mutating handle to an entity's transform.
    pub fn transform_mut(&mut self, entity: Entity) -> Result<TransformMut<'_>, TransformError> {
        if !self.inner.contains(entity) {
            return Err(TransformError::NoSuchEntity(entity));
        }
        Ok(TransformMut {
            world: self,
            entity,
        })
    }

    /// The entity's parent, if any
    pub fn parent(&self, entity: Entity) -> Option<Entity> {
        self.inner
            .get::<&Transform>(entity)
            .ok()
            .and_then(|t| t.parent)
    }

    /// A copy of the entity's direct children, in attachment order
    pub fn children(&self, entity: Entity) -> SmallVec<[Entity; 8]> {
        self.inner
            .get::<&Transform>(entity)
            .map(|t| t.children.clone())
            .unwrap_or_default()
    }

    /// Whether `ancestor` appears on the parent chain of `entity`
    pub fn is_ancestor_of(&self, ancestor: Entity, entity: Entity) -> bool {
        let mut current = self.parent(entity);
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            current = self.parent(parent);
        }
        false
    }

    /// Get the world matrix, recomputing dirty nodes on the way.
    ///
    /// Each dirty ancestor is recomputed at most once; a clean entity returns
    /// its cached matrix unchanged.
    pub fn world_matrix(&self, entity: Entity) -> Result<Mat4, TransformError> {
        let mut stale: SmallVec<[Entity; 16]> = SmallVec::new();
        let mut base = Mat4::IDENTITY;
        let mut current = Some(entity);

        while let Some(e) = current {
            let transform = self.transform(e)?;
            if !transform.dirty {
                base = transform.world_matrix;
                break;
            }
            stale.push(e);
            current = transform.parent;
        }

        for &e in stale.iter().rev() {
            let mut transform = self
                .inner
                .get::<&mut Transform>(e)
                .map_err(|_| TransformError::NoSuchEntity(e))?;
            base *= transform.local_matrix();
            transform.world_matrix = base;
            transform.dirty = false;
        }

        Ok(base)
    }

    /// World-space position, rotation and scale helpers
    pub fn global_transform(&self, entity: Entity) -> Result<GlobalTransform, TransformError> {
        self.world_matrix(entity).map(GlobalTransform::new)
    }

    /// View matrix of a camera entity: the inverse of its world matrix
    pub fn view_matrix(&self, entity: Entity) -> Result<Mat4, TransformError> {
        self.world_matrix(entity).map(|m| m.inverse())
    }

    /// Projection and view matrices of an entity carrying a [`Camera`]
    pub fn camera_matrices(&self, entity: Entity) -> Option<(Mat4, Mat4)> {
        let projection = self.inner.get::<&Camera>(entity).ok()?.projection_matrix();
        let view = self.view_matrix(entity).ok()?;
        Some((view, projection))
    }

    /// Depth-first search of the subtree below `root` for a [`Name`].
    ///
    /// `root` itself is not considered. Children are visited in attachment
    /// order, so with duplicate names the first one in pre-order wins.
    pub fn find_child_by_name(&self, root: Entity, name: &str) -> Option<Entity> {
        let mut stack: Vec<Entity> = self.children(root).into_iter().rev().collect();

        while let Some(entity) = stack.pop() {
            let matches = self
                .inner
                .get::<&Name>(entity)
                .is_ok_and(|n| n.as_str() == name);
            if matches {
                return Some(entity);
            }
            stack.extend(self.children(entity).into_iter().rev());
        }
        None
    }
}

// ============================================================================
// Internal Mutation
// ============================================================================

impl World {
    /// Mutable transform access for an entity known to exist
    fn local_mut(&mut self, entity: Entity) -> &mut Transform {
        match self.inner.query_one_mut::<&mut Transform>(entity) {
            Ok(transform) => transform,
            Err(_) => crate::invariant_violation!(
                "hierarchy references entity {entity:?} which has no transform"
            ),
        }
    }

    /// Apply a local change and propagate dirtiness if anything changed
    fn modify_local(&mut self, entity: Entity, change: impl FnOnce(&mut Transform) -> bool) {
        if change(self.local_mut(entity)) {
            self.mark_subtree_dirty(entity);
        }
    }

    /// Mark an entity and all its descendants dirty.
    ///
    /// Stops descending at nodes that are already dirty; see the module docs.
    fn mark_subtree_dirty(&mut self, root: Entity) {
        let mut stack: SmallVec<[Entity; 16]> = smallvec![root];

        while let Some(entity) = stack.pop() {
            let transform = self.local_mut(entity);
            if transform.dirty {
                continue;
            }
            transform.dirty = true;
            stack.extend(transform.children.iter().copied());
        }
    }

    /// The parent's world matrix, or identity for roots.
    ///
    /// Fails if the matrix cannot be inverted, since every caller needs its inverse.
    fn invertible_parent_world(&self, entity: Entity) -> Result<Mat4, TransformError> {
        let Some(parent) = self.parent(entity) else {
            return Ok(Mat4::IDENTITY);
        };
        let parent_world = self.world_matrix(parent)?;
        if parent_world.determinant().abs() <= SINGULAR_EPSILON {
            return Err(TransformError::SingularParent { entity, parent });
        }
        Ok(parent_world)
    }

    fn set_parent(
        &mut self,
        entity: Entity,
        new_parent: Option<Entity>,
        preserve_world: bool,
    ) -> Result<(), TransformError> {
        let old_parent = self.transform(entity)?.parent;

        if let Some(parent) = new_parent {
            if !self.inner.contains(parent) {
                return Err(TransformError::NoSuchEntity(parent));
            }
            if parent == entity || self.is_ancestor_of(entity, parent) {
                return Err(TransformError::Cycle {
                    child: entity,
                    parent,
                });
            }
        }

        if old_parent == new_parent {
            return Ok(());
        }

        // Everything fallible happens before the tree is touched
        let preserved_local = if preserve_world {
            let world_before = self.world_matrix(entity)?;
            let parent_world = match new_parent {
                Some(parent) => {
                    let m = self.world_matrix(parent)?;
                    if m.determinant().abs() <= SINGULAR_EPSILON {
                        return Err(TransformError::SingularParent { entity, parent });
                    }
                    m
                }
                None => Mat4::IDENTITY,
            };
            Some(parent_world.inverse() * world_before)
        } else {
            None
        };

        if let Some(old) = old_parent {
            self.local_mut(old).children.retain(|child| *child != entity);
        }
        if let Some(parent) = new_parent {
            self.local_mut(parent).children.push(entity);
        }

        let transform = self.local_mut(entity);
        transform.parent = new_parent;
        if let Some(local) = preserved_local {
            transform.set_local_matrix(local);
        }
        self.mark_subtree_dirty(entity);

        log::trace!("Reparented {entity:?}: {old_parent:?} -> {new_parent:?}");
        Ok(())
    }

    /// Unlink an entity from the tree ahead of its despawn.
    ///
    /// Children are orphaned to the root level, keeping their world pose.
    /// Returns the orphaned children.
    pub(crate) fn detach_for_despawn(
        &mut self,
        entity: Entity,
    ) -> Result<SmallVec<[Entity; 8]>, TransformError> {
        let (parent, children) = {
            let transform = self.transform(entity)?;
            (transform.parent, transform.children.clone())
        };

        for &child in &children {
            let world = self.world_matrix(child)?;
            let transform = self.local_mut(child);
            transform.parent = None;
            transform.set_local_matrix(world);
            self.mark_subtree_dirty(child);
        }

        if let Some(parent) = parent {
            self.local_mut(parent).children.retain(|child| *child != entity);
        }

        let transform = self.local_mut(entity);
        transform.parent = None;
        transform.children.clear();

        Ok(children)
    }
}

// ============================================================================
// Transform Handle
// ============================================================================

/// Mutating access to one entity's transform.
///
/// Borrowing the world mutably for the handle's lifetime guarantees the
/// entity cannot be despawned underneath it.
pub struct TransformMut<'w> {
    world: &'w mut World,
    entity: Entity,
}

impl TransformMut<'_> {
    /// The entity this handle mutates
    #[must_use]
    pub fn entity(&self) -> Entity {
        self.entity
    }

    /// Current world matrix
    pub fn world_matrix(&self) -> Mat4 {
        match self.world.world_matrix(self.entity) {
            Ok(matrix) => matrix,
            Err(e) => crate::invariant_violation!("transform handle outlived its entity: {e}"),
        }
    }

    // -------------------------------------------------------------------------
    // Local mutations
    // -------------------------------------------------------------------------

    /// Set the local position.
    pub fn set_position(&mut self, position: Vec3) -> &mut Self {
        self.world.modify_local(self.entity, |t| t.set_position(position));
        self
    }

    /// Set the local scale.
    pub fn set_scale(&mut self, scale: Vec3) -> &mut Self {
        self.world.modify_local(self.entity, |t| t.set_scale(scale));
        self
    }

    /// Set the local rotation; the quaternion is normalized.
    ///
    /// Zero-length or non-finite quaternions are ignored with a warning.
    pub fn set_rotation(&mut self, rotation: Quat) -> &mut Self {
        self.world.modify_local(self.entity, |t| t.set_rotation(rotation));
        self
    }

    /// Set the local rotation from XYZ Euler angles in degrees.
    pub fn set_rotation_euler_degrees(&mut self, euler: Vec3) -> &mut Self {
        self.set_rotation(euler_degrees(euler))
    }

    /// Replace local state with the decomposition of an affine matrix.
    pub fn set_local_matrix(&mut self, matrix: Mat4) -> &mut Self {
        self.world.modify_local(self.entity, |t| t.set_local_matrix(matrix));
        self
    }

    /// Offset the local position, in the parent's space.
    pub fn translate(&mut self, offset: Vec3) -> &mut Self {
        self.world
            .modify_local(self.entity, |t| t.set_position(t.position() + offset));
        self
    }

    /// Rotate about the entity's own axes by XYZ Euler angles in radians.
    pub fn rotate_local(&mut self, euler: Vec3) -> &mut Self {
        let delta = Quat::from_euler(glam::EulerRot::XYZ, euler.x, euler.y, euler.z);
        self.world
            .modify_local(self.entity, |t| t.set_rotation(t.rotation() * delta));
        self
    }

    // -------------------------------------------------------------------------
    // World-space conveniences
    // -------------------------------------------------------------------------

    /// Place the entity at a world-space position.
    pub fn set_global_position(&mut self, position: Vec3) -> Result<(), TransformError> {
        let parent_world = self.world.invertible_parent_world(self.entity)?;
        let local = parent_world.inverse().transform_point3(position);
        self.set_position(local);
        Ok(())
    }

    /// Give the entity a world-space rotation.
    pub fn set_global_rotation(&mut self, rotation: Quat) -> Result<(), TransformError> {
        let parent_world = self.world.invertible_parent_world(self.entity)?;
        let (_, parent_rotation, _) = parent_world.to_scale_rotation_translation();
        self.set_rotation(parent_rotation.inverse() * rotation);
        Ok(())
    }

    /// Give the entity a world-space rotation from XYZ Euler angles in degrees.
    pub fn set_global_rotation_euler_degrees(&mut self, euler: Vec3) -> Result<(), TransformError> {
        self.set_global_rotation(euler_degrees(euler))
    }

    /// Give the entity a world-space scale.
    ///
    /// Exact for uniformly scaled parents; with non-uniform parent scale and
    /// rotation the result is the per-axis approximation.
    pub fn set_global_scale(&mut self, scale: Vec3) -> Result<(), TransformError> {
        let parent_world = self.world.invertible_parent_world(self.entity)?;
        let (parent_scale, _, _) = parent_world.to_scale_rotation_translation();
        self.set_scale(scale / parent_scale);
        Ok(())
    }

    /// Offset the entity in world space.
    pub fn translate_in_world(&mut self, offset: Vec3) -> Result<(), TransformError> {
        let position = self.world_matrix().w_axis.truncate();
        self.set_global_position(position + offset)
    }

    /// Rotate about the world axes by XYZ Euler angles in radians.
    pub fn rotate_global(&mut self, euler: Vec3) -> Result<(), TransformError> {
        let delta = Quat::from_euler(glam::EulerRot::XYZ, euler.x, euler.y, euler.z);
        let (_, world_rotation, _) = self.world_matrix().to_scale_rotation_translation();
        self.set_global_rotation(delta * world_rotation)
    }

    /// Point the local forward axis (-Z) at a world-space target.
    ///
    /// A target on top of the entity, or straight above or below it, leaves
    /// the rotation unchanged and returns the matching error.
    pub fn look_at(&mut self, target: Vec3) -> Result<(), TransformError> {
        let eye = self.world_matrix().w_axis.truncate();
        let direction = target - eye;

        if direction.length() <= LOOK_AT_EPSILON {
            log::warn!("look_at: {:?} is colocated with its target", self.entity);
            return Err(TransformError::ZeroLengthDirection(self.entity));
        }
        let forward = direction.normalize();
        let side = forward.cross(Vec3::Y);
        if side.length() <= LOOK_AT_EPSILON {
            log::warn!("look_at: direction for {:?} is parallel to up", self.entity);
            return Err(TransformError::DirectionParallelToUp(self.entity));
        }

        let right = side.normalize();
        let up = right.cross(forward);
        let rotation = Quat::from_mat3(&Mat3::from_cols(right, up, -forward));
        self.set_global_rotation(rotation)
    }

    // -------------------------------------------------------------------------
    // Hierarchy
    // -------------------------------------------------------------------------

    /// Move the entity under `parent`, or to the root level with `None`.
    ///
    /// With `preserve_world` the local state is rewritten so the world matrix
    /// is unchanged; otherwise local state is kept and the entity moves with
    /// its new parent's space. Parenting to self or a descendant fails with
    /// [`TransformError::Cycle`] and leaves the tree untouched.
    pub fn set_parent(
        &mut self,
        parent: Option<Entity>,
        preserve_world: bool,
    ) -> Result<(), TransformError> {
        self.world.set_parent(self.entity, parent, preserve_world)
    }

    /// Search this entity's subtree for a named descendant.
    #[must_use]
    pub fn find_child_by_name(&self, name: &str) -> Option<Entity> {
        self.world.find_child_by_name(self.entity, name)
    }
}

fn euler_degrees(euler: Vec3) -> Quat {
    Quat::from_euler(
        glam::EulerRot::XYZ,
        euler.x.to_radians(),
        euler.y.to_radians(),
        euler.z.to_radians(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-4;

    fn spawn(world: &mut World, name: &str, position: Vec3) -> Entity {
        let mut builder = hecs::EntityBuilder::new();
        builder
            .add(Transform::from_position(position))
            .add(Name::new(name));
        world.spawn(&mut builder)
    }

    fn attach(world: &mut World, child: Entity, parent: Entity) {
        world
            .transform_mut(child)
            .unwrap()
            .set_parent(Some(parent), false)
            .unwrap();
    }

    fn translation(world: &World, entity: Entity) -> Vec3 {
        world.world_matrix(entity).unwrap().w_axis.truncate()
    }

    #[test]
    fn test_child_world_position_scenario() {
        let mut world = World::new();
        let root = spawn(&mut world, "R", Vec3::new(5.0, 0.0, 0.0));
        let child = spawn(&mut world, "C", Vec3::new(1.0, 0.0, 0.0));
        attach(&mut world, child, root);

        assert!((translation(&world, child) - Vec3::new(6.0, 0.0, 0.0)).length() < EPS);

        world
            .transform_mut(child)
            .unwrap()
            .set_parent(None, true)
            .unwrap();

        let local = world.transform(child).unwrap().position();
        assert!((local - Vec3::new(6.0, 0.0, 0.0)).length() < EPS);
        assert!((translation(&world, child) - Vec3::new(6.0, 0.0, 0.0)).length() < EPS);
        assert!(world.children(root).is_empty());
    }

    #[test]
    fn test_world_matrix_composition() {
        let mut world = World::new();
        let root = spawn(&mut world, "root", Vec3::new(0.0, 2.0, 0.0));
        let child = spawn(&mut world, "child", Vec3::new(1.0, 0.0, 0.0));
        attach(&mut world, child, root);

        {
            let mut t = world.transform_mut(root).unwrap();
            t.set_rotation(Quat::from_rotation_y(0.7));
            t.set_scale(Vec3::splat(2.0));
        }
        world
            .transform_mut(child)
            .unwrap()
            .set_rotation(Quat::from_rotation_x(0.3));

        let root_world = world.world_matrix(root).unwrap();
        let child_local = world.transform(child).unwrap().local_matrix();
        let child_world = world.world_matrix(child).unwrap();

        assert!(root_world.abs_diff_eq(world.transform(root).unwrap().local_matrix(), 1e-6));
        assert!(child_world.abs_diff_eq(root_world * child_local, EPS));
    }

    #[test]
    fn test_cached_matrix_is_bit_identical() {
        let mut world = World::new();
        let root = spawn(&mut world, "root", Vec3::new(0.1, 0.2, 0.3));
        let child = spawn(&mut world, "child", Vec3::new(0.7, 0.0, 0.0));
        attach(&mut world, child, root);
        world
            .transform_mut(root)
            .unwrap()
            .set_rotation(Quat::from_rotation_z(0.123));

        let first = world.world_matrix(child).unwrap();
        assert!(!world.transform(child).unwrap().is_dirty());
        assert!(!world.transform(root).unwrap().is_dirty());

        let second = world.world_matrix(child).unwrap();
        assert_eq!(first.to_cols_array(), second.to_cols_array());
    }

    #[test]
    fn test_ancestor_mutation_dirties_descendants() {
        let mut world = World::new();
        let root = spawn(&mut world, "root", Vec3::ZERO);
        let mid = spawn(&mut world, "mid", Vec3::X);
        let leaf = spawn(&mut world, "leaf", Vec3::X);
        attach(&mut world, mid, root);
        attach(&mut world, leaf, mid);

        assert!((translation(&world, leaf) - Vec3::new(2.0, 0.0, 0.0)).length() < EPS);

        world
            .transform_mut(root)
            .unwrap()
            .set_position(Vec3::new(0.0, 10.0, 0.0));

        assert!(world.transform(mid).unwrap().is_dirty());
        assert!(world.transform(leaf).unwrap().is_dirty());
        assert!((translation(&world, leaf) - Vec3::new(2.0, 10.0, 0.0)).length() < EPS);
    }

    #[test]
    fn test_query_on_leaf_cleans_whole_chain_once() {
        let mut world = World::new();
        let root = spawn(&mut world, "root", Vec3::X);
        let leaf = spawn(&mut world, "leaf", Vec3::X);
        let sibling = spawn(&mut world, "sibling", Vec3::Y);
        attach(&mut world, leaf, root);
        attach(&mut world, sibling, root);

        let _ = world.world_matrix(leaf).unwrap();

        assert!(!world.transform(root).unwrap().is_dirty());
        assert!(!world.transform(leaf).unwrap().is_dirty());
        // The sibling was never queried
        assert!(world.transform(sibling).unwrap().is_dirty());
        assert!((translation(&world, sibling) - Vec3::new(1.0, 1.0, 0.0)).length() < EPS);
    }

    #[test]
    fn test_reparent_preserve_keeps_world() {
        let mut world = World::new();
        let a = spawn(&mut world, "a", Vec3::new(3.0, 1.0, 0.0));
        let b = spawn(&mut world, "b", Vec3::new(-2.0, 0.0, 4.0));
        let child = spawn(&mut world, "child", Vec3::new(1.0, 1.0, 1.0));
        {
            let mut t = world.transform_mut(b).unwrap();
            t.set_rotation(Quat::from_rotation_y(1.1));
            t.set_scale(Vec3::splat(0.5));
        }
        attach(&mut world, child, a);

        let before = world.world_matrix(child).unwrap();
        world
            .transform_mut(child)
            .unwrap()
            .set_parent(Some(b), true)
            .unwrap();
        let after = world.world_matrix(child).unwrap();

        assert!(before.abs_diff_eq(after, EPS));
        assert_eq!(world.parent(child), Some(b));
        assert_eq!(world.children(b).as_slice(), &[child]);
        assert!(world.children(a).is_empty());
    }

    #[test]
    fn test_reparent_without_preserve_keeps_local() {
        let mut world = World::new();
        let a = spawn(&mut world, "a", Vec3::new(3.0, 0.0, 0.0));
        let b = spawn(&mut world, "b", Vec3::new(0.0, 0.0, 7.0));
        let child = spawn(&mut world, "child", Vec3::new(1.0, 2.0, 3.0));
        attach(&mut world, child, a);

        let (position, rotation, scale) = {
            let t = world.transform(child).unwrap();
            (t.position(), t.rotation(), t.scale())
        };
        let before = world.world_matrix(child).unwrap();

        world
            .transform_mut(child)
            .unwrap()
            .set_parent(Some(b), false)
            .unwrap();

        {
            let t = world.transform(child).unwrap();
            assert_eq!(t.position(), position);
            assert_eq!(t.rotation(), rotation);
            assert_eq!(t.scale(), scale);
        }
        let after = world.world_matrix(child).unwrap();
        assert!(!before.abs_diff_eq(after, EPS));
        assert!((after.w_axis.truncate() - Vec3::new(1.0, 2.0, 10.0)).length() < EPS);
    }

    #[test]
    fn test_cycle_is_rejected() {
        let mut world = World::new();
        let root = spawn(&mut world, "root", Vec3::ZERO);
        let mid = spawn(&mut world, "mid", Vec3::ZERO);
        let leaf = spawn(&mut world, "leaf", Vec3::ZERO);
        attach(&mut world, mid, root);
        attach(&mut world, leaf, mid);

        let err = world
            .transform_mut(root)
            .unwrap()
            .set_parent(Some(leaf), true)
            .unwrap_err();
        assert_eq!(
            err,
            TransformError::Cycle {
                child: root,
                parent: leaf
            }
        );

        let self_err = world
            .transform_mut(mid)
            .unwrap()
            .set_parent(Some(mid), false)
            .unwrap_err();
        assert!(matches!(self_err, TransformError::Cycle { .. }));

        // Structure untouched
        assert_eq!(world.parent(root), None);
        assert_eq!(world.parent(mid), Some(root));
        assert_eq!(world.parent(leaf), Some(mid));
        assert_eq!(world.children(root).as_slice(), &[mid]);
        assert_eq!(world.children(mid).as_slice(), &[leaf]);
    }

    #[test]
    fn test_set_parent_to_missing_entity_fails() {
        let mut world = World::new();
        let child = spawn(&mut world, "child", Vec3::ZERO);
        let ghost = spawn(&mut world, "ghost", Vec3::ZERO);
        world.inner.despawn(ghost).unwrap();

        let err = world
            .transform_mut(child)
            .unwrap()
            .set_parent(Some(ghost), false)
            .unwrap_err();
        assert_eq!(err, TransformError::NoSuchEntity(ghost));
        assert!(matches!(
            world.transform_mut(ghost),
            Err(TransformError::NoSuchEntity(_))
        ));
    }

    #[test]
    fn test_global_position_under_rotated_parent() {
        let mut world = World::new();
        let parent = spawn(&mut world, "parent", Vec3::new(1.0, 0.0, 0.0));
        let child = spawn(&mut world, "child", Vec3::ZERO);
        world
            .transform_mut(parent)
            .unwrap()
            .set_rotation(Quat::from_rotation_z(std::f32::consts::FRAC_PI_2))
            .set_scale(Vec3::splat(2.0));
        attach(&mut world, child, parent);

        let target = Vec3::new(4.0, -3.0, 2.0);
        world
            .transform_mut(child)
            .unwrap()
            .set_global_position(target)
            .unwrap();

        assert!((translation(&world, child) - target).length() < EPS);
    }

    #[test]
    fn test_global_rotation_and_scale() {
        let mut world = World::new();
        let parent = spawn(&mut world, "parent", Vec3::ZERO);
        let child = spawn(&mut world, "child", Vec3::ZERO);
        world
            .transform_mut(parent)
            .unwrap()
            .set_rotation(Quat::from_rotation_y(0.8))
            .set_scale(Vec3::splat(4.0));
        attach(&mut world, child, parent);

        let desired = Quat::from_rotation_x(0.25);
        {
            let mut t = world.transform_mut(child).unwrap();
            t.set_global_rotation(desired).unwrap();
            t.set_global_scale(Vec3::splat(2.0)).unwrap();
        }

        let global = world.global_transform(child).unwrap();
        assert!(global.rotation().abs_diff_eq(desired, EPS));
        assert!((global.scale() - Vec3::splat(2.0)).length() < EPS);
        assert!((world.transform(child).unwrap().scale() - Vec3::splat(0.5)).length() < EPS);
    }

    #[test]
    fn test_translate_in_world_vs_local() {
        let mut world = World::new();
        let parent = spawn(&mut world, "parent", Vec3::ZERO);
        let child = spawn(&mut world, "child", Vec3::ZERO);
        world
            .transform_mut(parent)
            .unwrap()
            .set_rotation(Quat::from_rotation_y(std::f32::consts::FRAC_PI_2));
        attach(&mut world, child, parent);

        world
            .transform_mut(child)
            .unwrap()
            .translate_in_world(Vec3::X)
            .unwrap();
        assert!((translation(&world, child) - Vec3::X).length() < EPS);

        // Local translation happens in the parent's rotated space
        world.transform_mut(child).unwrap().translate(Vec3::X);
        assert!((translation(&world, child) - Vec3::new(1.0, 0.0, -1.0)).length() < EPS);
    }

    #[test]
    fn test_rotate_global_under_rotated_parent() {
        let mut world = World::new();
        let parent = spawn(&mut world, "parent", Vec3::ZERO);
        let child = spawn(&mut world, "child", Vec3::ZERO);
        world
            .transform_mut(parent)
            .unwrap()
            .set_rotation(Quat::from_rotation_x(0.4));
        attach(&mut world, child, parent);

        let before = world.global_transform(child).unwrap().rotation();
        world
            .transform_mut(child)
            .unwrap()
            .rotate_global(Vec3::new(0.0, 0.5, 0.0))
            .unwrap();
        let after = world.global_transform(child).unwrap().rotation();

        assert!(after.abs_diff_eq(Quat::from_rotation_y(0.5) * before, EPS));
    }

    #[test]
    fn test_rotate_local_composes_on_the_right() {
        let mut world = World::new();
        let entity = spawn(&mut world, "e", Vec3::ZERO);
        let initial = Quat::from_rotation_x(0.3);
        world
            .transform_mut(entity)
            .unwrap()
            .set_rotation(initial)
            .rotate_local(Vec3::new(0.0, 0.6, 0.0));

        let rotation = world.transform(entity).unwrap().rotation();
        assert!(rotation.abs_diff_eq(initial * Quat::from_rotation_y(0.6), EPS));
        assert!((rotation.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_singular_parent_is_reported() {
        let mut world = World::new();
        let parent = spawn(&mut world, "flat", Vec3::ZERO);
        let child = spawn(&mut world, "child", Vec3::X);
        world
            .transform_mut(parent)
            .unwrap()
            .set_scale(Vec3::new(1.0, 0.0, 1.0));
        attach(&mut world, child, parent);

        let before = world.transform(child).unwrap().position();
        let err = world
            .transform_mut(child)
            .unwrap()
            .set_global_position(Vec3::ONE)
            .unwrap_err();
        assert_eq!(err, TransformError::SingularParent { entity: child, parent });
        assert_eq!(world.transform(child).unwrap().position(), before);
    }

    #[test]
    fn test_look_at_points_forward() {
        let mut world = World::new();
        let eye = spawn(&mut world, "eye", Vec3::new(0.0, 0.0, 0.0));

        world
            .transform_mut(eye)
            .unwrap()
            .look_at(Vec3::new(10.0, 0.0, 0.0))
            .unwrap();

        let forward = world.transform(eye).unwrap().forward();
        assert!((forward - Vec3::X).length() < EPS);

        world
            .transform_mut(eye)
            .unwrap()
            .look_at(Vec3::new(0.0, 0.0, -3.0))
            .unwrap();
        let rotation = world.transform(eye).unwrap().rotation();
        assert!(rotation.abs_diff_eq(Quat::IDENTITY, EPS));
    }

    #[test]
    fn test_look_at_degenerate_inputs_leave_rotation() {
        let mut world = World::new();
        let eye = spawn(&mut world, "eye", Vec3::new(1.0, 2.0, 3.0));
        world
            .transform_mut(eye)
            .unwrap()
            .set_rotation(Quat::from_rotation_z(0.2));
        let before = world.transform(eye).unwrap().rotation();

        let colocated = world
            .transform_mut(eye)
            .unwrap()
            .look_at(Vec3::new(1.0, 2.0, 3.0))
            .unwrap_err();
        assert_eq!(colocated, TransformError::ZeroLengthDirection(eye));

        let straight_up = world
            .transform_mut(eye)
            .unwrap()
            .look_at(Vec3::new(1.0, 50.0, 3.0))
            .unwrap_err();
        assert_eq!(straight_up, TransformError::DirectionParallelToUp(eye));

        let after = world.transform(eye).unwrap().rotation();
        assert_eq!(before, after);
        assert!(world.world_matrix(eye).unwrap().is_finite());
    }

    #[test]
    fn test_find_child_by_name_depth_first() {
        let mut world = World::new();
        let root = spawn(&mut world, "target", Vec3::ZERO);
        let a = spawn(&mut world, "a", Vec3::ZERO);
        let a_deep = spawn(&mut world, "target", Vec3::ZERO);
        let b = spawn(&mut world, "target", Vec3::ZERO);
        attach(&mut world, a, root);
        attach(&mut world, a_deep, a);
        attach(&mut world, b, root);

        // Root is excluded; pre-order reaches a's subtree before sibling b
        assert_eq!(world.find_child_by_name(root, "target"), Some(a_deep));
        assert_eq!(world.find_child_by_name(root, "a"), Some(a));
        assert_eq!(world.find_child_by_name(root, "missing"), None);
        assert_eq!(world.find_child_by_name(a_deep, "target"), None);
    }

    #[test]
    fn test_detach_for_despawn_orphans_children() {
        let mut world = World::new();
        let grandparent = spawn(&mut world, "gp", Vec3::new(0.0, 1.0, 0.0));
        let parent = spawn(&mut world, "p", Vec3::new(2.0, 0.0, 0.0));
        let child = spawn(&mut world, "c", Vec3::new(0.0, 0.0, 3.0));
        attach(&mut world, parent, grandparent);
        attach(&mut world, child, parent);

        let before = translation(&world, child);
        let orphans = world.detach_for_despawn(parent).unwrap();
        world.inner.despawn(parent).unwrap();

        assert_eq!(orphans.as_slice(), &[child]);
        assert_eq!(world.parent(child), None);
        assert!(world.children(grandparent).is_empty());
        assert!((translation(&world, child) - before).length() < EPS);
    }

    #[test]
    fn test_camera_view_is_inverse_world() {
        let mut world = World::new();
        let mut builder = hecs::EntityBuilder::new();
        builder
            .add(Transform::from_position(Vec3::new(0.0, 0.0, 5.0)))
            .add(Camera::default());
        let camera = world.spawn(&mut builder);

        let (view, projection) = world.camera_matrices(camera).unwrap();
        let world_matrix = world.world_matrix(camera).unwrap();
        assert!((view * world_matrix).abs_diff_eq(Mat4::IDENTITY, EPS));
        assert!(projection.is_finite());

        let plain = spawn(&mut world, "plain", Vec3::ZERO);
        assert!(world.camera_matrices(plain).is_none());
    }
}
