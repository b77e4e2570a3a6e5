//! Adapter contracts between the valuebox controllers and a host scene.
//!
//! Hosts (the reference [`SceneGraph`](crate::SceneGraph), a Bevy world, ...)
//! implement these traits over their own object store. Controllers only keep
//! handles and re-validate them through [`SceneQuery::contains`] before use.

use nalgebra::{UnitQuaternion, Vector3};
use std::fmt::Debug;
use std::hash::Hash;
use thiserror::Error;

use crate::math::{Ray, RayHit, Transform};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SceneError {
    #[error("scene object not found: {0}")]
    ObjectNotFound(String),
    /// Label glyph resources are not loaded yet; callers may retry later.
    #[error("label resources are not ready")]
    ResourceNotReady,
    #[error("invalid hierarchy change: {0}")]
    InvalidHierarchy(String),
}

impl SceneError {
    pub fn not_found(object: impl Debug) -> Self {
        SceneError::ObjectNotFound(format!("{object:?}"))
    }
}

/// Read-only view of a scene.
pub trait SceneQuery {
    type Handle: Copy + Eq + Hash + Debug;

    fn contains(&self, object: Self::Handle) -> bool;

    fn parent(&self, object: Self::Handle) -> Option<Self::Handle>;

    fn children(&self, object: Self::Handle) -> Vec<Self::Handle>;

    fn local_transform(&self, object: Self::Handle) -> Result<Transform, SceneError>;

    fn world_transform(&self, object: Self::Handle) -> Result<Transform, SceneError>;

    fn world_position(&self, object: Self::Handle) -> Result<Vector3<f32>, SceneError> {
        self.world_transform(object).map(|t| t.translation)
    }

    /// Intersect `ray` with the bounds of every candidate and, recursively, of
    /// their descendants. Hits are sorted nearest first.
    fn intersect(&self, ray: &Ray, candidates: &[Self::Handle]) -> Vec<RayHit<Self::Handle>>;
}

/// Mutating operations. All of them must be safe to call synchronously from
/// within a per-frame tick.
pub trait SceneAdapter: SceneQuery {
    /// Overwrite the local position and/or rotation; `None` leaves it as is.
    fn set_local_transform(
        &mut self,
        object: Self::Handle,
        position: Option<Vector3<f32>>,
        rotation: Option<UnitQuaternion<f32>>,
    ) -> Result<(), SceneError>;

    /// Attach `child` under `parent`, detaching it from any previous parent.
    /// The local transform is kept as is.
    fn add_child(&mut self, parent: Self::Handle, child: Self::Handle) -> Result<(), SceneError>;

    /// Detach `child` from `parent`; the child moves to the scene root.
    fn remove_child(&mut self, parent: Self::Handle, child: Self::Handle)
        -> Result<(), SceneError>;

    /// Create a renderable text label at the scene root.
    fn create_label(&mut self, text: &str) -> Result<Self::Handle, SceneError>;

    /// Remove an object and all of its descendants from the scene.
    fn destroy(&mut self, object: Self::Handle) -> Result<(), SceneError>;
}

/// Outermost ancestor-or-self of `object` that is one of `interactive`.
pub fn topmost_interactive<S: SceneQuery + ?Sized>(
    scene: &S,
    object: S::Handle,
    interactive: &[S::Handle],
) -> Option<S::Handle> {
    let mut found = None;
    let mut cursor = Some(object);
    // Cyclic parent chains only come from broken hosts.
    let mut guard = 0usize;
    while let Some(current) = cursor {
        if interactive.contains(&current) {
            found = Some(current);
        }
        cursor = scene.parent(current);
        guard += 1;
        if guard > 4096 {
            log::warn!("parent chain of {object:?} exceeds depth limit; stopping walk");
            break;
        }
    }
    found
}
