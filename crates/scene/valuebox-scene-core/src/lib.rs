//! valuebox-scene-core: scene contracts shared by the valuebox controllers (engine-agnostic)
//!
//! The picking and insertion controllers never own scene objects. They talk to
//! whatever renderer hosts the boxes through [`SceneQuery`] / [`SceneAdapter`],
//! using opaque copyable handles. [`SceneGraph`] is a small in-memory
//! implementation of those traits used by tests, fixtures and headless hosts.

pub mod adapter;
pub mod camera;
pub mod graph;
pub mod ids;
pub mod math;

pub use adapter::{topmost_interactive, SceneAdapter, SceneError, SceneQuery};
pub use camera::{CameraState, PointerEvent, PointerPosition, Projection, ViewportState};
pub use graph::{NodeKind, SceneGraph, SceneNode};
pub use ids::{IdAllocator, ObjectId};
pub use math::{Aabb, EulerXyz, Ray, RayHit, Transform};

pub use nalgebra::{UnitQuaternion, Vector2, Vector3};
