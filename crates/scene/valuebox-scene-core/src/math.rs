//! Small geometric types: transforms, rays and bounding boxes.
//!
//! Vectors are nalgebra `Vector3<f32>`, rotations `UnitQuaternion<f32>`.

use nalgebra::{UnitQuaternion, Vector3};

/// Local TRS transform of a scene object relative to its parent.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub translation: Vector3<f32>,
    pub rotation: UnitQuaternion<f32>,
    pub scale: Vector3<f32>,
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform {
    pub fn identity() -> Self {
        Self {
            translation: Vector3::zeros(),
            rotation: UnitQuaternion::identity(),
            scale: Vector3::repeat(1.0),
        }
    }

    pub fn from_translation(translation: Vector3<f32>) -> Self {
        Self {
            translation,
            ..Self::identity()
        }
    }

    pub fn with_rotation(mut self, rotation: UnitQuaternion<f32>) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_scale(mut self, scale: Vector3<f32>) -> Self {
        self.scale = scale;
        self
    }

    /// True when no scale component is zero (the transform can be inverted).
    #[inline]
    pub fn is_invertible(&self) -> bool {
        self.scale.iter().all(|s| *s != 0.0 && s.is_finite())
    }

    #[inline]
    pub fn transform_point(&self, p: &Vector3<f32>) -> Vector3<f32> {
        self.translation + self.rotation * p.component_mul(&self.scale)
    }

    #[inline]
    pub fn transform_vector(&self, v: &Vector3<f32>) -> Vector3<f32> {
        self.rotation * v.component_mul(&self.scale)
    }

    #[inline]
    pub fn inverse_transform_point(&self, p: &Vector3<f32>) -> Vector3<f32> {
        self.rotation
            .inverse_transform_vector(&(p - self.translation))
            .component_div(&self.scale)
    }

    #[inline]
    pub fn inverse_transform_vector(&self, v: &Vector3<f32>) -> Vector3<f32> {
        self.rotation
            .inverse_transform_vector(v)
            .component_div(&self.scale)
    }

    /// Compose `self` (parent) with `child` (expressed in the parent's space).
    /// Non-uniform scale under rotation is approximated component-wise, the
    /// same trade-off engine transforms make.
    pub fn mul_transform(&self, child: &Transform) -> Transform {
        Transform {
            translation: self.transform_point(&child.translation),
            rotation: self.rotation * child.rotation,
            scale: self.scale.component_mul(&child.scale),
        }
    }

    /// Express the world transform `self` in the local space of `parent_world`,
    /// so that `parent_world.mul_transform(&result) == self`.
    pub fn relative_to(&self, parent_world: &Transform) -> Transform {
        Transform {
            translation: parent_world.inverse_transform_point(&self.translation),
            rotation: parent_world.rotation.inverse() * self.rotation,
            scale: self.scale.component_div(&parent_world.scale),
        }
    }
}

/// Euler angles applied about the object's own X, then Y, then Z axes, so the
/// rotation is `Rx(x) * Ry(y) * Rz(z)`. Drag rotation edits `x` and `y` and
/// leaves `z` alone.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EulerXyz {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl EulerXyz {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Decompose `rotation`. At `y = ±π/2` the X and Z angles are not
    /// separable; all of it is put on `x`.
    pub fn from_rotation(rotation: &UnitQuaternion<f32>) -> Self {
        let matrix = rotation.to_rotation_matrix();
        let m = matrix.matrix();
        let y = m[(0, 2)].clamp(-1.0, 1.0).asin();
        if m[(0, 2)].abs() < 0.999_999_9 {
            Self {
                x: (-m[(1, 2)]).atan2(m[(2, 2)]),
                y,
                z: (-m[(0, 1)]).atan2(m[(0, 0)]),
            }
        } else {
            Self {
                x: m[(2, 1)].atan2(m[(1, 1)]),
                y,
                z: 0.0,
            }
        }
    }

    pub fn to_rotation(&self) -> UnitQuaternion<f32> {
        UnitQuaternion::from_axis_angle(&Vector3::x_axis(), self.x)
            * UnitQuaternion::from_axis_angle(&Vector3::y_axis(), self.y)
            * UnitQuaternion::from_axis_angle(&Vector3::z_axis(), self.z)
    }
}

/// A half-line with a unit-length direction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: Vector3<f32>,
    pub direction: Vector3<f32>,
}

impl Ray {
    /// Build a ray, normalizing the direction. Returns None for a zero or
    /// non-finite direction.
    pub fn new(origin: Vector3<f32>, direction: Vector3<f32>) -> Option<Self> {
        let len = direction.norm();
        if !len.is_finite() || len <= f32::EPSILON || !origin.iter().all(|c| c.is_finite()) {
            return None;
        }
        Some(Self {
            origin,
            direction: direction / len,
        })
    }

    #[inline]
    pub fn point_at(&self, t: f32) -> Vector3<f32> {
        self.origin + self.direction * t
    }

    /// Distance along the ray to the box `bounds` placed with `world`, if hit.
    /// The test runs in the box's local space; since the mapping is affine the
    /// returned parameter is the world-space distance along this ray.
    pub fn intersect_bounds(&self, world: &Transform, bounds: &Aabb) -> Option<f32> {
        if !world.is_invertible() {
            return None;
        }
        let origin = world.inverse_transform_point(&self.origin);
        let direction = world.inverse_transform_vector(&self.direction);
        bounds.intersect_ray(&origin, &direction)
    }
}

/// One intersection reported by a scene: the object whose bounds were hit and
/// the world-space distance from the ray origin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayHit<H> {
    pub object: H,
    pub distance: f32,
    pub point: Vector3<f32>,
}

/// Axis-aligned box in an object's local space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vector3<f32>,
    pub max: Vector3<f32>,
}

impl Aabb {
    pub fn new(min: Vector3<f32>, max: Vector3<f32>) -> Self {
        Self {
            min: min.inf(&max),
            max: min.sup(&max),
        }
    }

    pub fn from_half_extents(half_extents: Vector3<f32>) -> Self {
        let h = half_extents.abs();
        Self { min: -h, max: h }
    }

    /// Slab test. `direction` need not be normalized; the result is the ray
    /// parameter of the entry point, or 0 when the origin lies inside.
    pub fn intersect_ray(&self, origin: &Vector3<f32>, direction: &Vector3<f32>) -> Option<f32> {
        let mut t_enter = f32::NEG_INFINITY;
        let mut t_exit = f32::INFINITY;
        for axis in 0..3 {
            let o = origin[axis];
            let d = direction[axis];
            let (lo, hi) = (self.min[axis], self.max[axis]);
            if d.abs() <= f32::EPSILON {
                if o < lo || o > hi {
                    return None;
                }
                continue;
            }
            let inv = d.recip();
            let mut t0 = (lo - o) * inv;
            let mut t1 = (hi - o) * inv;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_enter = t_enter.max(t0);
            t_exit = t_exit.min(t1);
            if t_enter > t_exit {
                return None;
            }
        }
        if t_exit < 0.0 {
            return None;
        }
        Some(t_enter.max(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn relative_to_round_trips_through_parent() {
        let parent = Transform::from_translation(Vector3::new(3.5, 0.0, 0.0))
            .with_rotation(UnitQuaternion::from_axis_angle(&Vector3::y_axis(), FRAC_PI_2));
        let world = Transform::from_translation(Vector3::new(3.5, 0.3, 0.0));
        let local = world.relative_to(&parent);
        let back = parent.mul_transform(&local);
        assert_relative_eq!(back.translation, world.translation, epsilon = 1e-5);
        assert_relative_eq!(back.rotation.angle_to(&world.rotation), 0.0, epsilon = 1e-5);
    }

    #[test]
    fn slab_hits_front_face() {
        let aabb = Aabb::from_half_extents(Vector3::new(1.0, 1.0, 1.0));
        let t = aabb
            .intersect_ray(&Vector3::new(0.0, 0.0, 10.0), &Vector3::new(0.0, 0.0, -1.0))
            .unwrap();
        assert_relative_eq!(t, 9.0);
    }

    #[test]
    fn slab_misses_parallel_offset_ray() {
        let aabb = Aabb::from_half_extents(Vector3::new(1.0, 1.0, 1.0));
        assert!(aabb
            .intersect_ray(&Vector3::new(2.0, 0.0, 10.0), &Vector3::new(0.0, 0.0, -1.0))
            .is_none());
    }

    #[test]
    fn slab_ignores_boxes_behind_origin() {
        let aabb = Aabb::from_half_extents(Vector3::new(1.0, 1.0, 1.0));
        assert!(aabb
            .intersect_ray(&Vector3::new(0.0, 0.0, 10.0), &Vector3::new(0.0, 0.0, 1.0))
            .is_none());
    }

    #[test]
    fn scaled_bounds_report_world_distance() {
        let ray = Ray::new(Vector3::new(0.0, 0.0, 10.0), Vector3::new(0.0, 0.0, -3.0)).unwrap();
        let world = Transform::identity().with_scale(Vector3::new(2.0, 2.0, 2.0));
        let t = ray
            .intersect_bounds(&world, &Aabb::from_half_extents(Vector3::new(1.0, 1.0, 1.0)))
            .unwrap();
        assert_relative_eq!(t, 8.0, epsilon = 1e-5);
    }

    #[test]
    fn euler_decomposition_recovers_angles() {
        let e = EulerXyz::new(0.4, -1.1, 0.25);
        let back = EulerXyz::from_rotation(&e.to_rotation());
        assert_relative_eq!(back.x, e.x, epsilon = 1e-5);
        assert_relative_eq!(back.y, e.y, epsilon = 1e-5);
        assert_relative_eq!(back.z, e.z, epsilon = 1e-5);
    }

    #[test]
    fn euler_order_is_x_then_y_then_z() {
        let r = EulerXyz::new(FRAC_PI_2, FRAC_PI_2, 0.0).to_rotation();
        // Ry turns +X to -Z, then Rx turns -Z to +Y.
        assert_relative_eq!(r * Vector3::x(), Vector3::new(0.0, 1.0, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn euler_at_gimbal_lock_still_rebuilds_rotation() {
        let r = EulerXyz::new(0.3, FRAC_PI_2, 0.2).to_rotation();
        let back = EulerXyz::from_rotation(&r).to_rotation();
        assert_relative_eq!(back.angle_to(&r), 0.0, epsilon = 1e-3);
    }

    #[test]
    fn zero_direction_is_rejected() {
        assert!(Ray::new(Vector3::zeros(), Vector3::zeros()).is_none());
    }
}
