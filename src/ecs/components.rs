//! Common ECS components
//!
//! Capabilities an entity may carry next to its [`Transform`](super::Transform).

use glam::Mat4;
use serde::{Deserialize, Serialize};

/// Name component, used for debugging and hierarchy lookups
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Name(pub String);

impl Name {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Get the name as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Marks an entity as drawable by the render collaborator.
///
/// The mesh and material ids are opaque to the scene; the renderer resolves
/// them against its own asset storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Renderable {
    /// Renderer-side mesh id
    pub mesh: u64,
    /// Renderer-side material id
    pub material: u64,
    /// Hidden renderables stay live but are skipped by the render hand-off
    pub visible: bool,
}

impl Renderable {
    /// Create a visible renderable
    #[must_use]
    pub const fn new(mesh: u64, material: u64) -> Self {
        Self {
            mesh,
            material,
            visible: true,
        }
    }
}

/// Perspective projection parameters.
///
/// The view side comes from the owning entity's transform: see
/// [`World::view_matrix`](super::World::view_matrix).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    /// Vertical field of view in radians
    pub fov_y: f32,
    /// Aspect ratio (width / height)
    pub aspect: f32,
    /// Near clipping plane
    pub near: f32,
    /// Far clipping plane
    pub far: f32,
}

impl Camera {
    /// Create a camera with explicit projection parameters
    #[must_use]
    pub const fn new(fov_y: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            fov_y,
            aspect,
            near,
            far,
        }
    }

    /// Get the projection matrix
    #[must_use]
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect, self.near, self.far)
    }

    /// Update aspect ratio from a viewport size
    pub fn set_aspect(&mut self, width: u32, height: u32) {
        self.aspect = width as f32 / height.max(1) as f32;
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            fov_y: std::f32::consts::FRAC_PI_4, // 45 degrees
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

/// Creation-sequence number assigned when an entity is instantiated.
///
/// Monotonically increasing per scene; the live set is kept in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Sequence(pub u64);
