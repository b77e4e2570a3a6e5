//! `SceneAdapter` over a Bevy `World`.
//!
//! Transforms are read from the local `Transform` components and composed up
//! the `Parent` chain, so results are correct within the frame even before
//! Bevy propagates `GlobalTransform`.

use bevy::prelude::*;
use nalgebra::{Quaternion, UnitQuaternion, Vector3};
use std::collections::HashSet;
use valuebox_scene_core::{
    Aabb, Ray, RayHit, SceneAdapter, SceneError, SceneQuery, Transform as CoreTransform,
};

use crate::components::{PickBounds, ValueLabel};
use crate::resources::LabelAssets;

const MAX_DEPTH: usize = 4096;
const LABEL_HALF_EXTENTS: [f32; 3] = [0.3, 0.25, 0.05];

pub fn vec3_to_na(v: Vec3) -> Vector3<f32> {
    Vector3::new(v.x, v.y, v.z)
}

pub fn vec3_from_na(v: &Vector3<f32>) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

pub fn quat_to_na(q: Quat) -> UnitQuaternion<f32> {
    UnitQuaternion::new_normalize(Quaternion::new(q.w, q.x, q.y, q.z))
}

pub fn quat_from_na(q: &UnitQuaternion<f32>) -> Quat {
    let c = q.quaternion().coords;
    Quat::from_xyzw(c.x, c.y, c.z, c.w)
}

pub fn to_core(t: &Transform) -> CoreTransform {
    CoreTransform {
        translation: vec3_to_na(t.translation),
        rotation: quat_to_na(t.rotation),
        scale: vec3_to_na(t.scale),
    }
}

/// Borrowed view of a world as a valuebox scene.
pub struct WorldScene<'w> {
    world: &'w mut World,
}

impl<'w> WorldScene<'w> {
    pub fn new(world: &'w mut World) -> Self {
        Self { world }
    }

    fn local_or_identity(&self, entity: Entity) -> CoreTransform {
        self.world
            .get::<Transform>(entity)
            .map(to_core)
            .unwrap_or_default()
    }

    fn is_ancestor(&self, ancestor: Entity, of: Entity) -> bool {
        let mut cursor = self.parent(of);
        let mut depth = 0;
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            depth += 1;
            if depth > MAX_DEPTH {
                return false;
            }
            cursor = self.parent(current);
        }
        false
    }

    fn collect_hits(
        &self,
        ray: &Ray,
        entity: Entity,
        world_tf: CoreTransform,
        visited: &mut HashSet<Entity>,
        hits: &mut Vec<RayHit<Entity>>,
    ) {
        if !visited.insert(entity) {
            return;
        }
        if let Some(PickBounds(bounds)) = self.world.get::<PickBounds>(entity) {
            if let Some(distance) = ray.intersect_bounds(&world_tf, bounds) {
                hits.push(RayHit {
                    object: entity,
                    distance,
                    point: ray.point_at(distance),
                });
            }
        }
        for child in self.children(entity) {
            let child_world = world_tf.mul_transform(&self.local_or_identity(child));
            self.collect_hits(ray, child, child_world, visited, hits);
        }
    }
}

impl SceneQuery for WorldScene<'_> {
    type Handle = Entity;

    fn contains(&self, object: Entity) -> bool {
        self.world.get_entity(object).is_some()
    }

    fn parent(&self, object: Entity) -> Option<Entity> {
        self.world.get::<Parent>(object).map(|p| p.get())
    }

    fn children(&self, object: Entity) -> Vec<Entity> {
        self.world
            .get::<Children>(object)
            .map(|c| c.to_vec())
            .unwrap_or_default()
    }

    fn local_transform(&self, object: Entity) -> Result<CoreTransform, SceneError> {
        self.world
            .get::<Transform>(object)
            .map(to_core)
            .ok_or_else(|| SceneError::not_found(object))
    }

    fn world_transform(&self, object: Entity) -> Result<CoreTransform, SceneError> {
        let mut world_tf = self.local_transform(object)?;
        let mut cursor = self.parent(object);
        let mut depth = 0;
        while let Some(parent) = cursor {
            world_tf = self.local_or_identity(parent).mul_transform(&world_tf);
            depth += 1;
            if depth > MAX_DEPTH {
                return Err(SceneError::InvalidHierarchy(format!(
                    "parent chain of {object:?} is too deep"
                )));
            }
            cursor = self.parent(parent);
        }
        Ok(world_tf)
    }

    fn intersect(&self, ray: &Ray, candidates: &[Entity]) -> Vec<RayHit<Entity>> {
        let mut hits = Vec::new();
        let mut visited = HashSet::new();
        for &candidate in candidates {
            if let Ok(world_tf) = self.world_transform(candidate) {
                self.collect_hits(ray, candidate, world_tf, &mut visited, &mut hits);
            }
        }
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }
}

impl SceneAdapter for WorldScene<'_> {
    fn set_local_transform(
        &mut self,
        object: Entity,
        position: Option<Vector3<f32>>,
        rotation: Option<UnitQuaternion<f32>>,
    ) -> Result<(), SceneError> {
        let mut tf = self
            .world
            .get_mut::<Transform>(object)
            .ok_or_else(|| SceneError::not_found(object))?;
        if let Some(p) = position {
            tf.translation = vec3_from_na(&p);
        }
        if let Some(r) = rotation {
            tf.rotation = quat_from_na(&r);
        }
        Ok(())
    }

    fn add_child(&mut self, parent: Entity, child: Entity) -> Result<(), SceneError> {
        if !self.contains(parent) {
            return Err(SceneError::not_found(parent));
        }
        if !self.contains(child) {
            return Err(SceneError::not_found(child));
        }
        if parent == child || self.is_ancestor(child, parent) {
            return Err(SceneError::InvalidHierarchy(format!(
                "{child:?} cannot become a child of its own descendant {parent:?}"
            )));
        }
        self.world.entity_mut(parent).add_child(child);
        Ok(())
    }

    fn remove_child(&mut self, parent: Entity, child: Entity) -> Result<(), SceneError> {
        if self.parent(child) != Some(parent) {
            return Err(SceneError::InvalidHierarchy(format!(
                "{child:?} is not a child of {parent:?}"
            )));
        }
        self.world.entity_mut(parent).remove_children(&[child]);
        Ok(())
    }

    fn create_label(&mut self, text: &str) -> Result<Entity, SceneError> {
        let ready = self
            .world
            .get_resource::<LabelAssets>()
            .map_or(true, |assets| assets.ready);
        if !ready {
            return Err(SceneError::ResourceNotReady);
        }
        let entity = self
            .world
            .spawn((
                Name::new(format!("value:{text}")),
                ValueLabel {
                    text: text.to_string(),
                },
                PickBounds(Aabb::from_half_extents(Vector3::from(LABEL_HALF_EXTENTS))),
                SpatialBundle::default(),
            ))
            .id();
        Ok(entity)
    }

    fn destroy(&mut self, object: Entity) -> Result<(), SceneError> {
        let entity = self
            .world
            .get_entity_mut(object)
            .ok_or_else(|| SceneError::not_found(object))?;
        entity.despawn_recursive();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spawn_at(world: &mut World, x: f32) -> Entity {
        world
            .spawn(SpatialBundle::from_transform(Transform::from_xyz(x, 0.0, 0.0)))
            .id()
    }

    #[test]
    fn world_transform_composes_parent_chain() {
        let mut world = World::new();
        let parent = spawn_at(&mut world, 2.0);
        let child = spawn_at(&mut world, 1.0);
        world.entity_mut(parent).add_child(child);
        let scene = WorldScene::new(&mut world);
        let pos = scene.world_position(child).unwrap();
        assert_eq!(pos, Vector3::new(3.0, 0.0, 0.0));
        assert_eq!(scene.parent(child), Some(parent));
        assert_eq!(scene.children(parent), vec![child]);
    }

    #[test]
    fn reparent_and_detach() {
        let mut world = World::new();
        let a = spawn_at(&mut world, 0.0);
        let b = spawn_at(&mut world, 0.0);
        let mut scene = WorldScene::new(&mut world);
        scene.add_child(a, b).unwrap();
        assert!(matches!(
            scene.add_child(b, a),
            Err(SceneError::InvalidHierarchy(_))
        ));
        scene.remove_child(a, b).unwrap();
        assert_eq!(scene.parent(b), None);
        assert!(scene.remove_child(a, b).is_err());
    }

    #[test]
    fn labels_respect_asset_readiness() {
        let mut world = World::new();
        world.insert_resource(LabelAssets { ready: false });
        let mut scene = WorldScene::new(&mut world);
        assert_eq!(scene.create_label("1"), Err(SceneError::ResourceNotReady));
        drop(scene);
        world.resource_mut::<LabelAssets>().ready = true;
        let mut scene = WorldScene::new(&mut world);
        let label = scene.create_label("1").unwrap();
        scene.destroy(label).unwrap();
        assert!(!scene.contains(label));
    }

    #[test]
    fn quaternion_conversion_round_trips() {
        let q = Quat::from_rotation_y(0.7) * Quat::from_rotation_x(-0.2);
        let back = quat_from_na(&quat_to_na(q));
        assert!(back.abs_diff_eq(q, 1e-6));
    }
}
