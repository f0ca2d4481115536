//! Hierarchical Transform Component
//!
//! Every entity carries exactly one [`Transform`]: local position, rotation and
//! scale, a link to its parent, the derived list of its children, and a cached
//! world matrix guarded by a dirty flag.
//!
//! # Design Principles
//!
//! - **Lazy Evaluation**: The world matrix is only recomputed when queried while dirty
//! - **Single Source of Truth**: The parent link is authoritative, the child list is an index
//! - **Handles, Not Pointers**: Parent and children are `hecs::Entity` handles validated on lookup
//! - **Read-Only From Outside**: Mutation goes through [`World::transform_mut`](super::World::transform_mut)
//!   so dirtiness always reaches the whole subtree
//!
//! # Example
//!
//! ```ignore
//! let entity = scene.instantiate(|e: &mut EntityBuilder| {
//!     e.with_position(Vec3::new(1.0, 0.0, 0.0));
//! });
//!
//! scene.world_mut().transform_mut(entity)?.translate(Vec3::Y);
//! let matrix = scene.world().world_matrix(entity)?;
//! ```

use glam::{EulerRot, Mat4, Quat, Vec3};
use hecs::Entity;
use smallvec::SmallVec;

/// Child handles in insertion order.
pub(crate) type ChildList = SmallVec<[Entity; 8]>;

/// Local spatial state of an entity plus its place in the hierarchy.
///
/// Matrices follow glam's column-vector convention: an entity's world matrix
/// is `parent_world * local_matrix()`.
#[derive(Debug, Clone)]
pub struct Transform {
    position: Vec3,
    rotation: Quat,
    scale: Vec3,

    pub(super) parent: Option<Entity>,
    pub(super) children: ChildList,

    /// Valid only while `dirty` is false
    pub(super) world_matrix: Mat4,
    pub(super) dirty: bool,
}

impl Transform {
    /// Create a new transform at the origin.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create from a local position.
    #[must_use]
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Create from a local position and rotation.
    #[must_use]
    pub fn from_position_rotation(position: Vec3, rotation: Quat) -> Self {
        Self::from_parts(position, rotation, Vec3::ONE)
    }

    /// Create from local position, rotation and scale.
    ///
    /// The rotation is normalized; a degenerate quaternion falls back to identity.
    #[must_use]
    pub fn from_parts(position: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            position,
            rotation: normalized(rotation).unwrap_or(Quat::IDENTITY),
            scale,
            ..Default::default()
        }
    }

    // -------------------------------------------------------------------------
    // Local State
    // -------------------------------------------------------------------------

    /// Local position, relative to the parent.
    #[must_use]
    #[inline]
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Local rotation, always a unit quaternion.
    #[must_use]
    #[inline]
    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    /// Local scale.
    #[must_use]
    #[inline]
    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    /// Local rotation as XYZ Euler angles in radians.
    #[must_use]
    pub fn rotation_euler(&self) -> Vec3 {
        let (x, y, z) = self.rotation.to_euler(EulerRot::XYZ);
        Vec3::new(x, y, z)
    }

    /// Local rotation as XYZ Euler angles in degrees.
    #[must_use]
    pub fn rotation_euler_degrees(&self) -> Vec3 {
        let radians = self.rotation_euler();
        Vec3::new(
            radians.x.to_degrees(),
            radians.y.to_degrees(),
            radians.z.to_degrees(),
        )
    }

    /// Matrix mapping local space into the parent's space.
    #[must_use]
    #[inline]
    pub fn local_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    /// Local forward direction (negative Z).
    #[must_use]
    #[inline]
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }

    /// Local right direction (positive X).
    #[must_use]
    #[inline]
    pub fn right(&self) -> Vec3 {
        self.rotation * Vec3::X
    }

    /// Local up direction (positive Y).
    #[must_use]
    #[inline]
    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }

    // -------------------------------------------------------------------------
    // Hierarchy
    // -------------------------------------------------------------------------

    /// The parent entity, if any.
    #[must_use]
    #[inline]
    pub fn parent(&self) -> Option<Entity> {
        self.parent
    }

    /// Direct children in the order they were attached.
    #[must_use]
    #[inline]
    pub fn children(&self) -> &[Entity] {
        &self.children
    }

    /// Whether the cached world matrix needs recomputation.
    #[must_use]
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    // -------------------------------------------------------------------------
    // Setters
    //
    // Each returns whether the local state changed. Callers inside the ecs
    // module own dirty propagation, which is why these are not public.
    // -------------------------------------------------------------------------

    pub(super) fn set_position(&mut self, position: Vec3) -> bool {
        if self.position == position {
            return false;
        }
        self.position = position;
        true
    }

    pub(super) fn set_scale(&mut self, scale: Vec3) -> bool {
        if self.scale == scale {
            return false;
        }
        self.scale = scale;
        true
    }

    pub(super) fn set_rotation(&mut self, rotation: Quat) -> bool {
        let Some(rotation) = normalized(rotation) else {
            log::warn!("Ignoring degenerate rotation {rotation:?}");
            return false;
        };
        if self.rotation == rotation {
            return false;
        }
        self.rotation = rotation;
        true
    }

    /// Decompose an affine matrix into local scale, rotation and position.
    pub(super) fn set_local_matrix(&mut self, matrix: Mat4) -> bool {
        let (scale, rotation, position) = matrix.to_scale_rotation_translation();
        let rotation = normalized(rotation).unwrap_or(Quat::IDENTITY);
        let changed =
            self.scale != scale || self.rotation != rotation || self.position != position;
        self.scale = scale;
        self.rotation = rotation;
        self.position = position;
        changed
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            parent: None,
            children: ChildList::new(),
            world_matrix: Mat4::IDENTITY,
            dirty: true,
        }
    }
}

/// Normalize a quaternion, rejecting zero-length and non-finite input.
fn normalized(rotation: Quat) -> Option<Quat> {
    let length_squared = rotation.length_squared();
    if !length_squared.is_finite() || length_squared <= f32::EPSILON {
        return None;
    }
    Some(rotation.normalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform_default() {
        let t = Transform::new();

        assert_eq!(t.position(), Vec3::ZERO);
        assert_eq!(t.rotation(), Quat::IDENTITY);
        assert_eq!(t.scale(), Vec3::ONE);
        assert!(t.parent().is_none());
        assert!(t.children().is_empty());
        assert!(t.is_dirty());
    }

    #[test]
    fn test_from_parts_normalizes_rotation() {
        let t = Transform::from_parts(Vec3::ZERO, Quat::from_xyzw(0.0, 2.0, 0.0, 0.0), Vec3::ONE);
        assert!((t.rotation().length() - 1.0).abs() < 1e-6);

        let degenerate = Transform::from_parts(Vec3::ZERO, Quat::from_xyzw(0.0, 0.0, 0.0, 0.0), Vec3::ONE);
        assert_eq!(degenerate.rotation(), Quat::IDENTITY);
    }

    #[test]
    fn test_local_matrix_translation() {
        let t = Transform::from_position(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(t.local_matrix().w_axis.truncate(), Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_setters_report_change() {
        let mut t = Transform::from_position(Vec3::new(1.0, 2.0, 3.0));

        assert!(!t.set_position(Vec3::new(1.0, 2.0, 3.0)));
        assert!(t.set_position(Vec3::X));
        assert!(!t.set_scale(Vec3::ONE));
        assert!(t.set_scale(Vec3::splat(2.0)));
    }

    #[test]
    fn test_degenerate_rotation_is_ignored() {
        let mut t = Transform::new();
        let before = t.rotation();

        assert!(!t.set_rotation(Quat::from_xyzw(0.0, 0.0, 0.0, 0.0)));
        assert!(!t.set_rotation(Quat::from_xyzw(f32::NAN, 0.0, 0.0, 1.0)));
        assert_eq!(t.rotation(), before);
    }

    #[test]
    fn test_euler_degrees() {
        let mut t = Transform::new();
        t.set_rotation(Quat::from_rotation_y(90.0_f32.to_radians()));

        let euler = t.rotation_euler_degrees();
        assert!(euler.x.abs() < 0.01);
        assert!((euler.y - 90.0).abs() < 0.01);
        assert!(euler.z.abs() < 0.01);
    }

    #[test]
    fn test_set_local_matrix_decomposes() {
        let mut t = Transform::new();
        let rotation = Quat::from_rotation_z(0.5);
        let matrix =
            Mat4::from_scale_rotation_translation(Vec3::splat(2.0), rotation, Vec3::new(4.0, 5.0, 6.0));

        assert!(t.set_local_matrix(matrix));
        assert!((t.position() - Vec3::new(4.0, 5.0, 6.0)).length() < 1e-5);
        assert!((t.scale() - Vec3::splat(2.0)).length() < 1e-5);
        assert!(t.rotation().abs_diff_eq(rotation, 1e-5));
    }

    #[test]
    fn test_directions() {
        let t = Transform::new();

        // Default orientation: forward is -Z, right is X, up is Y
        assert!((t.forward() - Vec3::NEG_Z).length() < 0.001);
        assert!((t.right() - Vec3::X).length() < 0.001);
        assert!((t.up() - Vec3::Y).length() < 0.001);
    }
}
