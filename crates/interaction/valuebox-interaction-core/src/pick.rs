//! Pointer picking and drag-to-rotate.
//!
//! `PickController` turns a pointer press into a ray, finds the nearest
//! interactive box under it and then converts pointer motion into rotation
//! deltas while the press lasts. It only holds a handle to the picked box.

use crate::config::PickConfig;
use valuebox_scene_core::{
    topmost_interactive, CameraState, EulerXyz, PointerEvent, PointerPosition, SceneAdapter,
    SceneError, SceneQuery, ViewportState,
};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PickState<H> {
    Idle,
    /// `angles` is the target's orientation, seeded from its local rotation
    /// when picked and accumulated by every drag step.
    Dragging {
        target: H,
        last_pointer: PointerPosition,
        angles: EulerXyz,
    },
}

impl<H> Default for PickState<H> {
    fn default() -> Self {
        PickState::Idle
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PickResult<H> {
    Hit { object: H, distance: f32 },
    Miss,
}

impl<H: Copy> PickResult<H> {
    pub fn object(&self) -> Option<H> {
        match self {
            PickResult::Hit { object, .. } => Some(*object),
            PickResult::Miss => None,
        }
    }

    pub fn is_hit(&self) -> bool {
        matches!(self, PickResult::Hit { .. })
    }
}

/// Rotation produced by one drag step, in radians.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RotationDelta {
    /// Added to the Euler Y angle, from horizontal pointer travel.
    pub yaw: f32,
    /// Added to the Euler X angle, from vertical pointer travel.
    pub pitch: f32,
}

impl RotationDelta {
    pub const ZERO: RotationDelta = RotationDelta { yaw: 0.0, pitch: 0.0 };

    pub fn is_zero(&self) -> bool {
        self.yaw == 0.0 && self.pitch == 0.0
    }

    /// Pitch onto `x`, yaw onto `y`; `z` is kept.
    pub fn apply_to(&self, angles: EulerXyz) -> EulerXyz {
        EulerXyz {
            x: angles.x + self.pitch,
            y: angles.y + self.yaw,
            z: angles.z,
        }
    }
}

#[derive(Clone, Debug)]
pub struct PickController<H> {
    cfg: PickConfig,
    state: PickState<H>,
}

impl<H> Default for PickController<H> {
    fn default() -> Self {
        Self::new(PickConfig::default())
    }
}

impl<H> PickController<H> {
    pub fn new(cfg: PickConfig) -> Self {
        Self {
            cfg,
            state: PickState::Idle,
        }
    }

    pub fn config(&self) -> &PickConfig {
        &self.cfg
    }

    pub fn state(&self) -> &PickState<H> {
        &self.state
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, PickState::Dragging { .. })
    }

    /// End the current drag, if any. Always leaves the controller idle.
    pub fn end_pick(&mut self) {
        self.state = PickState::Idle;
    }
}

impl<H: Copy + Eq + std::fmt::Debug> PickController<H> {
    pub fn target(&self) -> Option<H> {
        match self.state {
            PickState::Dragging { target, .. } => Some(target),
            PickState::Idle => None,
        }
    }

    /// Cast a ray through `pointer` and start dragging the nearest candidate
    /// it hits. Hits on sub-meshes resolve to their outermost ancestor in
    /// `candidates`. Anything else (no ray, nothing hit) leaves the
    /// controller idle.
    pub fn begin_pick<S>(
        &mut self,
        pointer: PointerPosition,
        viewport: &ViewportState,
        camera: &CameraState,
        candidates: &[H],
        scene: &S,
    ) -> PickResult<H>
    where
        S: SceneQuery<Handle = H> + ?Sized,
    {
        self.state = PickState::Idle;
        if candidates.is_empty() {
            return PickResult::Miss;
        }
        let Some(ray) = camera.pointer_ray(pointer, viewport) else {
            log::debug!("no pick ray for pointer {pointer:?} in {viewport:?}");
            return PickResult::Miss;
        };
        let picked = scene.intersect(&ray, candidates).into_iter().find_map(|hit| {
            topmost_interactive(scene, hit.object, candidates).map(|object| (object, hit.distance))
        });
        match picked {
            Some((object, distance)) => {
                log::debug!("picked {object:?} at distance {distance}");
                let angles = scene
                    .local_transform(object)
                    .map(|t| EulerXyz::from_rotation(&t.rotation))
                    .unwrap_or_default();
                self.state = PickState::Dragging {
                    target: object,
                    last_pointer: pointer,
                    angles,
                };
                PickResult::Hit { object, distance }
            }
            None => PickResult::Miss,
        }
    }

    /// Rotation for the pointer travel since the previous call. Zero while
    /// idle.
    pub fn update_drag(&mut self, pointer: PointerPosition) -> RotationDelta {
        let PickState::Dragging { last_pointer, .. } = &mut self.state else {
            return RotationDelta::ZERO;
        };
        let delta = pointer - *last_pointer;
        *last_pointer = pointer;
        let s = self.cfg.rotation_sensitivity;
        RotationDelta {
            yaw: delta.x * s,
            pitch: delta.y * s,
        }
    }

    /// Pointer pressed. Events without a position (an empty touch list) are
    /// ignored and return a miss.
    pub fn on_pointer_down<S>(
        &mut self,
        event: &PointerEvent,
        viewport: &ViewportState,
        camera: &CameraState,
        candidates: &[H],
        scene: &S,
    ) -> PickResult<H>
    where
        S: SceneQuery<Handle = H> + ?Sized,
    {
        match event.position() {
            Some(pointer) => self.begin_pick(pointer, viewport, camera, candidates, scene),
            None => PickResult::Miss,
        }
    }

    /// Pointer moved. While dragging, the delta is added to the target's
    /// Euler angles and its local rotation rebuilt from them. A target that
    /// vanished from the scene ends the drag.
    pub fn on_pointer_move<S>(
        &mut self,
        event: &PointerEvent,
        scene: &mut S,
    ) -> Result<RotationDelta, SceneError>
    where
        S: SceneAdapter<Handle = H> + ?Sized,
    {
        let Some(target) = self.target() else {
            return Ok(RotationDelta::ZERO);
        };
        let Some(pointer) = event.position() else {
            return Ok(RotationDelta::ZERO);
        };
        if !scene.contains(target) {
            self.end_pick();
            return Err(SceneError::not_found(target));
        }
        let delta = self.update_drag(pointer);
        if delta.is_zero() {
            return Ok(delta);
        }
        let PickState::Dragging { angles, .. } = &mut self.state else {
            return Ok(delta);
        };
        *angles = delta.apply_to(*angles);
        let rotation = angles.to_rotation();
        scene.set_local_transform(target, None, Some(rotation))?;
        Ok(delta)
    }

    pub fn on_pointer_up(&mut self) {
        self.end_pick();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use valuebox_scene_core::{
        Aabb, NodeKind, ObjectId, SceneGraph, Transform, UnitQuaternion, Vector3,
    };

    fn scene() -> (SceneGraph, ObjectId, ObjectId, CameraState, ViewportState) {
        let mut g = SceneGraph::new();
        let group = g
            .spawn("box", NodeKind::Group, Transform::identity(), None, None)
            .unwrap();
        let mesh = g
            .spawn(
                "box/mesh",
                NodeKind::Mesh,
                Transform::identity(),
                Some(Aabb::from_half_extents(Vector3::new(1.0, 1.0, 1.0))),
                Some(group),
            )
            .unwrap();
        let camera = CameraState::default();
        let viewport = ViewportState::new(0.0, 0.0, 800.0, 600.0);
        (g, group, mesh, camera, viewport)
    }

    #[test]
    fn hit_on_sub_mesh_resolves_to_interactive_group() {
        let (g, group, _mesh, camera, viewport) = scene();
        let mut pc = PickController::default();
        let res = pc.begin_pick(
            PointerPosition::new(400.0, 300.0),
            &viewport,
            &camera,
            &[group],
            &g,
        );
        assert_eq!(res.object(), Some(group));
        assert!(pc.is_active());
        assert_eq!(pc.target(), Some(group));
    }

    #[test]
    fn miss_leaves_controller_idle() {
        let (g, group, _mesh, camera, viewport) = scene();
        let mut pc = PickController::default();
        pc.begin_pick(
            PointerPosition::new(400.0, 300.0),
            &viewport,
            &camera,
            &[group],
            &g,
        );
        let res = pc.begin_pick(
            PointerPosition::new(5.0, 5.0),
            &viewport,
            &camera,
            &[group],
            &g,
        );
        assert_eq!(res, PickResult::Miss);
        assert_eq!(*pc.state(), PickState::Idle);
    }

    #[test]
    fn empty_candidates_never_hit() {
        let (g, _group, _mesh, camera, viewport) = scene();
        let mut pc: PickController<ObjectId> = PickController::default();
        let res = pc.begin_pick(
            PointerPosition::new(400.0, 300.0),
            &viewport,
            &camera,
            &[],
            &g,
        );
        assert!(!res.is_hit());
    }

    #[test]
    fn drag_before_pick_is_zero() {
        let mut pc: PickController<ObjectId> = PickController::default();
        let d = pc.update_drag(PointerPosition::new(50.0, 10.0));
        assert!(d.is_zero());
    }

    #[test]
    fn drag_delta_scales_with_sensitivity() {
        let (g, group, _mesh, camera, viewport) = scene();
        let mut pc = PickController::new(PickConfig {
            rotation_sensitivity: 0.01,
        });
        pc.begin_pick(
            PointerPosition::new(400.0, 300.0),
            &viewport,
            &camera,
            &[group],
            &g,
        );
        let d = pc.update_drag(PointerPosition::new(410.0, 295.0));
        assert_relative_eq!(d.yaw, 0.1, epsilon = 1e-6);
        assert_relative_eq!(d.pitch, -0.05, epsilon = 1e-6);
        // Deltas are relative to the previous pointer, not the press point.
        let d2 = pc.update_drag(PointerPosition::new(410.0, 295.0));
        assert!(d2.is_zero());
    }

    #[test]
    fn end_pick_is_idempotent() {
        let mut pc: PickController<ObjectId> = PickController::default();
        pc.end_pick();
        pc.end_pick();
        assert!(!pc.is_active());
    }

    #[test]
    fn pointer_move_rotates_target() {
        let (mut g, group, _mesh, camera, viewport) = scene();
        let mut pc = PickController::default();
        pc.on_pointer_down(
            &PointerEvent::mouse(400.0, 300.0),
            &viewport,
            &camera,
            &[group],
            &g,
        );
        let d = pc
            .on_pointer_move(&PointerEvent::mouse(500.0, 300.0), &mut g)
            .unwrap();
        assert_relative_eq!(d.yaw, 0.5, epsilon = 1e-6);
        let rot = g.local_transform(group).unwrap().rotation;
        assert_relative_eq!(rot.angle(), 0.5, epsilon = 1e-5);
        pc.on_pointer_up();
        let d = pc
            .on_pointer_move(&PointerEvent::mouse(600.0, 300.0), &mut g)
            .unwrap();
        assert!(d.is_zero());
        assert_relative_eq!(g.local_transform(group).unwrap().rotation.angle(), 0.5, epsilon = 1e-5);
    }

    #[test]
    fn vanished_target_ends_drag() {
        let (mut g, group, _mesh, camera, viewport) = scene();
        let mut pc = PickController::default();
        pc.on_pointer_down(
            &PointerEvent::touch(400.0, 300.0),
            &viewport,
            &camera,
            &[group],
            &g,
        );
        g.destroy(group).unwrap();
        let err = pc
            .on_pointer_move(&PointerEvent::touch(420.0, 300.0), &mut g)
            .unwrap_err();
        assert!(matches!(err, SceneError::ObjectNotFound(_)));
        assert!(!pc.is_active());
    }

    #[test]
    fn empty_touch_is_ignored() {
        let (g, group, _mesh, camera, viewport) = scene();
        let mut pc = PickController::default();
        let res = pc.on_pointer_down(
            &PointerEvent::Touch { touches: vec![] },
            &viewport,
            &camera,
            &[group],
            &g,
        );
        assert_eq!(res, PickResult::Miss);
    }

    #[test]
    fn yaw_from_rest_turns_about_y() {
        let delta = RotationDelta {
            yaw: std::f32::consts::FRAC_PI_2,
            pitch: 0.0,
        };
        let r = delta.apply_to(EulerXyz::default()).to_rotation();
        let v = r * Vector3::x();
        assert_relative_eq!(v, Vector3::new(0.0, 0.0, -1.0), epsilon = 1e-6);
    }

    #[test]
    fn vertical_then_horizontal_drag_accumulates_euler_angles() {
        let (mut g, group, _mesh, camera, viewport) = scene();
        let mut pc = PickController::default();
        pc.on_pointer_down(
            &PointerEvent::mouse(400.0, 300.0),
            &viewport,
            &camera,
            &[group],
            &g,
        );
        // 314 px at 0.005 rad/px is 1.57 rad on each axis.
        pc.on_pointer_move(&PointerEvent::mouse(400.0, 614.0), &mut g)
            .unwrap();
        pc.on_pointer_move(&PointerEvent::mouse(714.0, 614.0), &mut g)
            .unwrap();

        let rot = g.local_transform(group).unwrap().rotation;
        let expected = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), 1.57)
            * UnitQuaternion::from_axis_angle(&Vector3::y_axis(), 1.57);
        assert_relative_eq!(rot.angle_to(&expected), 0.0, epsilon = 1e-4);
        assert_relative_eq!(rot * Vector3::x(), expected * Vector3::x(), epsilon = 1e-4);
    }

    #[test]
    fn drag_continues_from_existing_rotation() {
        let (mut g, group, _mesh, camera, viewport) = scene();
        let start = EulerXyz::new(0.3, 0.2, 0.1);
        g.set_local_transform(group, None, Some(start.to_rotation()))
            .unwrap();
        let mut pc = PickController::default();
        pc.on_pointer_down(
            &PointerEvent::mouse(400.0, 300.0),
            &viewport,
            &camera,
            &[group],
            &g,
        );
        pc.on_pointer_move(&PointerEvent::mouse(500.0, 320.0), &mut g)
            .unwrap();
        let rot = g.local_transform(group).unwrap().rotation;
        let expected = EulerXyz::new(0.4, 0.7, 0.1).to_rotation();
        assert_relative_eq!(rot.angle_to(&expected), 0.0, epsilon = 1e-4);
    }
}
