//! Camera, viewport and pointer state, and the pointer → world ray mapping.

use nalgebra::{Orthographic3, Perspective3, Point3, UnitQuaternion, Vector2, Vector3};
use serde::{Deserialize, Serialize};
use std::ops::Sub;

use crate::math::Ray;

/// A pointer location in host (client) pixels, origin at the top-left.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PointerPosition {
    pub x: f32,
    pub y: f32,
}

impl PointerPosition {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl Sub for PointerPosition {
    type Output = Vector2<f32>;

    fn sub(self, rhs: Self) -> Vector2<f32> {
        Vector2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Raw pointer input from either a mouse or a touch surface.
#[derive(Clone, Debug, PartialEq)]
pub enum PointerEvent {
    Mouse { x: f32, y: f32 },
    /// Active touch points; only the first one drives picking and dragging.
    Touch { touches: Vec<PointerPosition> },
}

impl PointerEvent {
    pub fn mouse(x: f32, y: f32) -> Self {
        PointerEvent::Mouse { x, y }
    }

    pub fn touch(x: f32, y: f32) -> Self {
        PointerEvent::Touch {
            touches: vec![PointerPosition::new(x, y)],
        }
    }

    /// Normalize either source to one pointer position. A touch event without
    /// touch points (e.g. the last finger lifting) has none.
    pub fn position(&self) -> Option<PointerPosition> {
        match self {
            PointerEvent::Mouse { x, y } => Some(PointerPosition::new(*x, *y)),
            PointerEvent::Touch { touches } => touches.first().copied(),
        }
    }
}

/// On-screen rectangle the scene is rendered into, in the same pixel space as
/// pointer positions.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ViewportState {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl ViewportState {
    pub fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn is_degenerate(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    pub fn aspect(&self) -> f32 {
        if self.is_degenerate() {
            1.0
        } else {
            self.width / self.height
        }
    }

    /// Map a pointer to normalized device coordinates: x right, y up, both in
    /// [-1, 1] across the viewport.
    pub fn to_ndc(&self, pointer: PointerPosition) -> Option<Vector2<f32>> {
        if self.is_degenerate() {
            return None;
        }
        let x = ((pointer.x - self.left) / self.width) * 2.0 - 1.0;
        let y = -((pointer.y - self.top) / self.height) * 2.0 + 1.0;
        Some(Vector2::new(x, y))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Projection {
    Perspective { fov_y: f32, near: f32, far: f32 },
    Orthographic { half_height: f32, near: f32, far: f32 },
}

impl Default for Projection {
    fn default() -> Self {
        Projection::Perspective {
            fov_y: 45f32.to_radians(),
            near: 0.1,
            far: 1000.0,
        }
    }
}

/// World placement and projection of the viewing camera. The camera looks
/// down its local -Z axis with +Y up.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraState {
    pub position: Vector3<f32>,
    pub rotation: UnitQuaternion<f32>,
    pub projection: Projection,
}

impl Default for CameraState {
    fn default() -> Self {
        Self {
            position: Vector3::new(0.0, 0.0, 10.0),
            rotation: UnitQuaternion::identity(),
            projection: Projection::default(),
        }
    }
}

impl CameraState {
    /// Camera at `eye` looking towards `target`.
    pub fn look_at(
        eye: Vector3<f32>,
        target: Vector3<f32>,
        up: Vector3<f32>,
        projection: Projection,
    ) -> Self {
        // face_towards maps +Z onto the given direction; the camera views along -Z.
        let back = eye - target;
        let rotation = if back.norm() <= f32::EPSILON {
            UnitQuaternion::identity()
        } else {
            UnitQuaternion::face_towards(&back, &up)
        };
        Self {
            position: eye,
            rotation,
            projection,
        }
    }

    /// Ray from the camera through the given NDC point.
    pub fn ray_through_ndc(&self, ndc: Vector2<f32>, aspect: f32) -> Option<Ray> {
        if !(aspect > 0.0) || !aspect.is_finite() {
            return None;
        }
        let (near_view, far_view) = match self.projection {
            Projection::Perspective { fov_y, near, far } => {
                if !(fov_y > 0.0) || !(near > 0.0) || !(far > near) {
                    return None;
                }
                let proj = Perspective3::new(aspect, fov_y, near, far);
                (
                    proj.unproject_point(&Point3::new(ndc.x, ndc.y, -1.0)),
                    proj.unproject_point(&Point3::new(ndc.x, ndc.y, 1.0)),
                )
            }
            Projection::Orthographic {
                half_height,
                near,
                far,
            } => {
                if !(half_height > 0.0) || !(far > near) {
                    return None;
                }
                let half_width = half_height * aspect;
                let proj =
                    Orthographic3::new(-half_width, half_width, -half_height, half_height, near, far);
                (
                    proj.unproject_point(&Point3::new(ndc.x, ndc.y, -1.0)),
                    proj.unproject_point(&Point3::new(ndc.x, ndc.y, 1.0)),
                )
            }
        };
        let near_world = self.position + self.rotation * near_view.coords;
        let far_world = self.position + self.rotation * far_view.coords;
        Ray::new(near_world, far_world - near_world)
    }

    /// Ray under a pointer position in `viewport`.
    pub fn pointer_ray(&self, pointer: PointerPosition, viewport: &ViewportState) -> Option<Ray> {
        let ndc = viewport.to_ndc(pointer)?;
        self.ray_through_ndc(ndc, viewport.aspect())
    }
}
