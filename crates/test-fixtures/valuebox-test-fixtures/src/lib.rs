//! Shared fixtures for valuebox tests: JSON scenes and configs under the
//! workspace `fixtures/` directory, plus builders that turn a scene fixture
//! into a populated [`SceneGraph`].

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use nalgebra::Vector3;
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use valuebox_scene_core::{
    Aabb, CameraState, EulerXyz, NodeKind, ObjectId, Projection, SceneGraph, Transform,
    ViewportState,
};

static MANIFEST: Lazy<Manifest> = Lazy::new(|| {
    let raw = include_str!("../../../../fixtures/manifest.json");
    serde_json::from_str(raw).expect("fixtures manifest should parse")
});

#[derive(Debug, Deserialize)]
struct Manifest {
    scenes: HashMap<String, String>,
    configs: HashMap<String, String>,
}

fn fixtures_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../../fixtures")
}

fn resolve_path(rel: &str) -> PathBuf {
    fixtures_root().join(rel)
}

fn read_to_string(rel: &str) -> Result<String> {
    let path = resolve_path(rel);
    fs::read_to_string(&path)
        .with_context(|| format!("failed to read fixture at {}", path.display()))
}

fn load_json<T: DeserializeOwned>(rel: &str) -> Result<T> {
    let text = read_to_string(rel)?;
    serde_json::from_str(&text).with_context(|| format!("failed to parse JSON fixture {rel}"))
}

fn lookup<'a>(map: &'a HashMap<String, String>, kind: &str, name: &str) -> Result<&'a str> {
    map.get(name)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("unknown {kind} fixture '{name}'"))
}

/// Order in which box slots appear in [`BoxScene::containers`].
pub const SLOTS: [&str; 3] = ["int", "double", "char"];

#[derive(Debug, Clone, Deserialize)]
pub struct CameraSpec {
    pub eye: [f32; 3],
    pub target: [f32; 3],
    #[serde(default)]
    pub projection: Projection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BoxSpec {
    pub slot: String,
    pub position: [f32; 3],
    pub half_extents: [f32; 3],
    #[serde(default)]
    pub yaw: f32,
    #[serde(default)]
    pub pitch: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SceneSpec {
    pub camera: CameraSpec,
    pub viewport: ViewportState,
    pub boxes: Vec<BoxSpec>,
    pub caption_offset: [f32; 3],
}

/// A scene fixture instantiated into a [`SceneGraph`].
///
/// Every box is a group (the interactive container) holding a bounded mesh
/// and a caption label showing its slot name.
#[derive(Debug)]
pub struct BoxScene {
    pub graph: SceneGraph,
    /// Containers in [`SLOTS`] order.
    pub containers: [ObjectId; 3],
    pub meshes: [ObjectId; 3],
    pub captions: [ObjectId; 3],
    pub camera: CameraState,
    pub viewport: ViewportState,
}

impl BoxScene {
    pub fn from_spec(spec: &SceneSpec) -> Result<Self> {
        if spec.boxes.len() != SLOTS.len() {
            bail!("expected {} boxes, found {}", SLOTS.len(), spec.boxes.len());
        }
        let mut graph = SceneGraph::new();
        let mut containers = [ObjectId(0); 3];
        let mut meshes = [ObjectId(0); 3];
        let mut captions = [ObjectId(0); 3];
        for b in &spec.boxes {
            let slot = SLOTS
                .iter()
                .position(|s| *s == b.slot)
                .ok_or_else(|| anyhow!("unknown box slot '{}'", b.slot))?;
            let rotation = EulerXyz::new(b.pitch, b.yaw, 0.0).to_rotation();
            let container = graph.spawn(
                format!("box:{}", b.slot),
                NodeKind::Group,
                Transform::from_translation(Vector3::from(b.position)).with_rotation(rotation),
                None,
                None,
            )?;
            meshes[slot] = graph.spawn(
                format!("box:{}/mesh", b.slot),
                NodeKind::Mesh,
                Transform::identity(),
                Some(Aabb::from_half_extents(Vector3::from(b.half_extents))),
                Some(container),
            )?;
            captions[slot] = graph.spawn(
                format!("box:{}/caption", b.slot),
                NodeKind::Label {
                    text: b.slot.clone(),
                },
                Transform::from_translation(Vector3::from(spec.caption_offset)),
                None,
                Some(container),
            )?;
            containers[slot] = container;
        }
        let camera = CameraState::look_at(
            Vector3::from(spec.camera.eye),
            Vector3::from(spec.camera.target),
            Vector3::y(),
            spec.camera.projection,
        );
        Ok(Self {
            graph,
            containers,
            meshes,
            captions,
            camera,
            viewport: spec.viewport,
        })
    }
}

pub mod scenes {
    use super::*;

    pub fn keys() -> Vec<String> {
        MANIFEST.scenes.keys().cloned().collect()
    }

    pub fn json(name: &str) -> Result<String> {
        read_to_string(lookup(&MANIFEST.scenes, "scene", name)?)
    }

    pub fn spec(name: &str) -> Result<SceneSpec> {
        load_json(lookup(&MANIFEST.scenes, "scene", name)?)
    }

    pub fn build(name: &str) -> Result<BoxScene> {
        BoxScene::from_spec(&spec(name)?)
    }

    /// The default scene: three axis-aligned boxes in a row.
    pub fn three_boxes() -> Result<BoxScene> {
        build("three-boxes")
    }
}

pub mod configs {
    use super::*;

    pub fn keys() -> Vec<String> {
        MANIFEST.configs.keys().cloned().collect()
    }

    /// Raw JSON, to be parsed by the config types' `from_json_str`.
    pub fn json(name: &str) -> Result<String> {
        read_to_string(lookup(&MANIFEST.configs, "config", name)?)
    }

    pub fn path(name: &str) -> Result<PathBuf> {
        Ok(resolve_path(lookup(&MANIFEST.configs, "config", name)?))
    }
}
