//! In-memory reference scene.
//!
//! `SceneGraph` keeps a flat arena of nodes keyed by [`ObjectId`] with explicit
//! parent/children links. It implements [`SceneAdapter`] so controllers can be
//! exercised without a renderer, and it is what the fixtures build.

use hashbrown::{HashMap, HashSet};
use nalgebra::{UnitQuaternion, Vector3};

use crate::adapter::{SceneAdapter, SceneError, SceneQuery};
use crate::ids::{IdAllocator, ObjectId};
use crate::math::{Aabb, Ray, RayHit, Transform};

/// Glyph height used for label bounds (world units, matching the text size of
/// the rendered labels).
const LABEL_GLYPH_HEIGHT: f32 = 0.5;
const LABEL_DEPTH: f32 = 0.05;

#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    Group,
    Mesh,
    Label { text: String },
}

#[derive(Clone, Debug)]
pub struct SceneNode {
    pub name: String,
    pub kind: NodeKind,
    pub local: Transform,
    pub bounds: Option<Aabb>,
    pub parent: Option<ObjectId>,
    pub children: Vec<ObjectId>,
}

#[derive(Debug)]
pub struct SceneGraph {
    ids: IdAllocator,
    nodes: HashMap<ObjectId, SceneNode>,
    roots: Vec<ObjectId>,
    labels_ready: bool,
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneGraph {
    pub fn new() -> Self {
        Self {
            ids: IdAllocator::new(),
            nodes: HashMap::new(),
            roots: Vec::new(),
            labels_ready: true,
        }
    }

    /// Whether `create_label` can currently produce labels. Emulates glyph
    /// resources that load asynchronously.
    pub fn set_labels_ready(&mut self, ready: bool) {
        self.labels_ready = ready;
    }

    pub fn labels_ready(&self) -> bool {
        self.labels_ready
    }

    /// Add a node under `parent` (or at the root).
    pub fn spawn(
        &mut self,
        name: impl Into<String>,
        kind: NodeKind,
        local: Transform,
        bounds: Option<Aabb>,
        parent: Option<ObjectId>,
    ) -> Result<ObjectId, SceneError> {
        if let Some(p) = parent {
            if !self.nodes.contains_key(&p) {
                return Err(SceneError::not_found(p));
            }
        }
        let id = self.ids.alloc_object();
        self.nodes.insert(
            id,
            SceneNode {
                name: name.into(),
                kind,
                local,
                bounds,
                parent,
                children: Vec::new(),
            },
        );
        match parent {
            Some(p) => {
                if let Some(node) = self.nodes.get_mut(&p) {
                    node.children.push(id);
                }
            }
            None => self.roots.push(id),
        }
        Ok(id)
    }

    pub fn node(&self, id: ObjectId) -> Option<&SceneNode> {
        self.nodes.get(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn roots(&self) -> &[ObjectId] {
        &self.roots
    }

    pub fn label_text(&self, id: ObjectId) -> Option<&str> {
        match &self.nodes.get(&id)?.kind {
            NodeKind::Label { text } => Some(text.as_str()),
            _ => None,
        }
    }

    /// Label children of `parent`, in insertion order.
    pub fn labels_under(&self, parent: ObjectId) -> Vec<ObjectId> {
        self.nodes
            .get(&parent)
            .map(|n| {
                n.children
                    .iter()
                    .copied()
                    .filter(|c| self.label_text(*c).is_some())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn is_ancestor(&self, ancestor: ObjectId, of: ObjectId) -> bool {
        let mut cursor = self.nodes.get(&of).and_then(|n| n.parent);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.nodes.get(&current).and_then(|n| n.parent);
        }
        false
    }

    fn detach(&mut self, child: ObjectId) {
        let old_parent = self.nodes.get(&child).and_then(|n| n.parent);
        match old_parent {
            Some(p) => {
                if let Some(node) = self.nodes.get_mut(&p) {
                    node.children.retain(|c| *c != child);
                }
            }
            None => self.roots.retain(|r| *r != child),
        }
        if let Some(node) = self.nodes.get_mut(&child) {
            node.parent = None;
        }
    }

    fn collect_hits(
        &self,
        ray: &Ray,
        id: ObjectId,
        parent_world: &Transform,
        visited: &mut HashSet<ObjectId>,
        hits: &mut Vec<RayHit<ObjectId>>,
    ) {
        if !visited.insert(id) {
            return;
        }
        let Some(node) = self.nodes.get(&id) else {
            return;
        };
        let world = parent_world.mul_transform(&node.local);
        if let Some(bounds) = node.bounds.as_ref() {
            if let Some(distance) = ray.intersect_bounds(&world, bounds) {
                hits.push(RayHit {
                    object: id,
                    distance,
                    point: ray.point_at(distance),
                });
            }
        }
        for child in &node.children {
            self.collect_hits(ray, *child, &world, visited, hits);
        }
    }
}

impl SceneQuery for SceneGraph {
    type Handle = ObjectId;

    fn contains(&self, object: ObjectId) -> bool {
        self.nodes.contains_key(&object)
    }

    fn parent(&self, object: ObjectId) -> Option<ObjectId> {
        self.nodes.get(&object).and_then(|n| n.parent)
    }

    fn children(&self, object: ObjectId) -> Vec<ObjectId> {
        self.nodes
            .get(&object)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    fn local_transform(&self, object: ObjectId) -> Result<Transform, SceneError> {
        self.nodes
            .get(&object)
            .map(|n| n.local)
            .ok_or_else(|| SceneError::not_found(object))
    }

    fn world_transform(&self, object: ObjectId) -> Result<Transform, SceneError> {
        let mut chain = Vec::new();
        let mut cursor = Some(object);
        while let Some(current) = cursor {
            let node = self
                .nodes
                .get(&current)
                .ok_or_else(|| SceneError::not_found(current))?;
            chain.push(node.local);
            cursor = node.parent;
        }
        Ok(chain
            .iter()
            .rev()
            .fold(Transform::identity(), |acc, local| acc.mul_transform(local)))
    }

    fn intersect(&self, ray: &Ray, candidates: &[ObjectId]) -> Vec<RayHit<ObjectId>> {
        let mut hits = Vec::new();
        let mut visited = HashSet::new();
        for candidate in candidates {
            if !self.nodes.contains_key(candidate) {
                continue;
            }
            let parent_world = match self.parent(*candidate) {
                Some(p) => match self.world_transform(p) {
                    Ok(t) => t,
                    Err(_) => continue,
                },
                None => Transform::identity(),
            };
            self.collect_hits(ray, *candidate, &parent_world, &mut visited, &mut hits);
        }
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }
}

impl SceneAdapter for SceneGraph {
    fn set_local_transform(
        &mut self,
        object: ObjectId,
        position: Option<Vector3<f32>>,
        rotation: Option<UnitQuaternion<f32>>,
    ) -> Result<(), SceneError> {
        let node = self
            .nodes
            .get_mut(&object)
            .ok_or_else(|| SceneError::not_found(object))?;
        if let Some(p) = position {
            node.local.translation = p;
        }
        if let Some(r) = rotation {
            node.local.rotation = r;
        }
        Ok(())
    }

    fn add_child(&mut self, parent: ObjectId, child: ObjectId) -> Result<(), SceneError> {
        if !self.contains(parent) {
            return Err(SceneError::not_found(parent));
        }
        if !self.contains(child) {
            return Err(SceneError::not_found(child));
        }
        if parent == child || self.is_ancestor(child, parent) {
            return Err(SceneError::InvalidHierarchy(format!(
                "{child} cannot become a child of its own descendant {parent}"
            )));
        }
        self.detach(child);
        if let Some(node) = self.nodes.get_mut(&child) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.nodes.get_mut(&parent) {
            node.children.push(child);
        }
        Ok(())
    }

    fn remove_child(&mut self, parent: ObjectId, child: ObjectId) -> Result<(), SceneError> {
        if self.parent(child) != Some(parent) {
            return Err(SceneError::InvalidHierarchy(format!(
                "{child} is not a child of {parent}"
            )));
        }
        self.detach(child);
        self.roots.push(child);
        Ok(())
    }

    fn create_label(&mut self, text: &str) -> Result<ObjectId, SceneError> {
        if !self.labels_ready {
            return Err(SceneError::ResourceNotReady);
        }
        let glyphs = text.chars().count().max(1) as f32;
        let half_extents = Vector3::new(
            glyphs * LABEL_GLYPH_HEIGHT * 0.3,
            LABEL_GLYPH_HEIGHT * 0.5,
            LABEL_DEPTH * 0.5,
        );
        self.spawn(
            format!("value:{text}"),
            NodeKind::Label {
                text: text.to_string(),
            },
            Transform::identity(),
            Some(Aabb::from_half_extents(half_extents)),
            None,
        )
    }

    fn destroy(&mut self, object: ObjectId) -> Result<(), SceneError> {
        if !self.contains(object) {
            return Err(SceneError::not_found(object));
        }
        self.detach(object);
        let mut stack = vec![object];
        while let Some(id) = stack.pop() {
            if let Some(node) = self.nodes.remove(&id) {
                stack.extend(node.children);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_box() -> Option<Aabb> {
        Some(Aabb::from_half_extents(Vector3::new(1.0, 1.0, 1.0)))
    }

    #[test]
    fn world_transform_composes_parents() {
        let mut g = SceneGraph::new();
        let root = g
            .spawn(
                "root",
                NodeKind::Group,
                Transform::from_translation(Vector3::new(1.0, 0.0, 0.0)),
                None,
                None,
            )
            .unwrap();
        let child = g
            .spawn(
                "child",
                NodeKind::Mesh,
                Transform::from_translation(Vector3::new(0.0, 2.0, 0.0)),
                None,
                Some(root),
            )
            .unwrap();
        assert_relative_eq!(
            g.world_position(child).unwrap(),
            Vector3::new(1.0, 2.0, 0.0)
        );
    }

    #[test]
    fn add_child_moves_between_parents() {
        let mut g = SceneGraph::new();
        let a = g
            .spawn("a", NodeKind::Group, Transform::identity(), None, None)
            .unwrap();
        let b = g
            .spawn("b", NodeKind::Group, Transform::identity(), None, None)
            .unwrap();
        let c = g
            .spawn("c", NodeKind::Mesh, Transform::identity(), None, Some(a))
            .unwrap();
        g.add_child(b, c).unwrap();
        assert_eq!(g.parent(c), Some(b));
        assert!(g.children(a).is_empty());
        assert_eq!(g.children(b), vec![c]);
    }

    #[test]
    fn add_child_rejects_cycles() {
        let mut g = SceneGraph::new();
        let a = g
            .spawn("a", NodeKind::Group, Transform::identity(), None, None)
            .unwrap();
        let b = g
            .spawn("b", NodeKind::Group, Transform::identity(), None, Some(a))
            .unwrap();
        assert!(matches!(
            g.add_child(b, a),
            Err(SceneError::InvalidHierarchy(_))
        ));
        assert!(matches!(
            g.add_child(a, a),
            Err(SceneError::InvalidHierarchy(_))
        ));
    }

    #[test]
    fn remove_child_moves_to_root() {
        let mut g = SceneGraph::new();
        let a = g
            .spawn("a", NodeKind::Group, Transform::identity(), None, None)
            .unwrap();
        let b = g
            .spawn("b", NodeKind::Mesh, Transform::identity(), None, Some(a))
            .unwrap();
        g.remove_child(a, b).unwrap();
        assert_eq!(g.parent(b), None);
        assert!(g.roots().contains(&b));
        assert!(g.remove_child(a, b).is_err());
    }

    #[test]
    fn destroy_removes_subtree() {
        let mut g = SceneGraph::new();
        let a = g
            .spawn("a", NodeKind::Group, Transform::identity(), None, None)
            .unwrap();
        let b = g
            .spawn("b", NodeKind::Mesh, Transform::identity(), None, Some(a))
            .unwrap();
        g.destroy(a).unwrap();
        assert!(!g.contains(a));
        assert!(!g.contains(b));
        assert!(g.is_empty());
        assert!(g.roots().is_empty());
    }

    #[test]
    fn intersect_recurses_and_sorts_by_distance() {
        let mut g = SceneGraph::new();
        let far = g
            .spawn(
                "far",
                NodeKind::Group,
                Transform::from_translation(Vector3::new(0.0, 0.0, -5.0)),
                None,
                None,
            )
            .unwrap();
        let far_mesh = g
            .spawn("far_mesh", NodeKind::Mesh, Transform::identity(), unit_box(), Some(far))
            .unwrap();
        let near = g
            .spawn("near", NodeKind::Mesh, Transform::identity(), unit_box(), None)
            .unwrap();
        let ray = Ray::new(Vector3::new(0.0, 0.0, 10.0), Vector3::new(0.0, 0.0, -1.0)).unwrap();
        let hits = g.intersect(&ray, &[far, near]);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].object, near);
        assert_eq!(hits[1].object, far_mesh);
        assert_relative_eq!(hits[0].distance, 9.0, epsilon = 1e-5);
    }

    #[test]
    fn labels_wait_for_resources() {
        let mut g = SceneGraph::new();
        g.set_labels_ready(false);
        assert_eq!(g.create_label("12"), Err(SceneError::ResourceNotReady));
        g.set_labels_ready(true);
        let label = g.create_label("12").unwrap();
        assert_eq!(g.label_text(label), Some("12"));
        assert_eq!(g.parent(label), None);
    }
}
