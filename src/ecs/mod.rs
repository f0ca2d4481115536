//! Entity Component System module
//!
//! Built on top of the hecs ECS library, with a transform hierarchy layered
//! over the component storage.

mod components;
mod entity;
mod hierarchy;
mod transform;
mod world;

pub use components::{Camera, Name, Renderable, Sequence};
pub use entity::{Behaviour, EntityBuilder, EntityKind};
pub(crate) use entity::Script;
pub use hecs::Entity;
pub use hierarchy::{GlobalTransform, LOOK_AT_EPSILON, TransformError, TransformMut};
pub use transform::Transform;
pub use world::World;
