use bevy::prelude::*;
use valuebox_interaction_core::ValueKind;
use valuebox_scene_core::Aabb;

/// A box that receives values of one kind. Exactly one container per kind is
/// expected; submissions are ignored until all three exist.
#[derive(Component, Debug, Clone, Copy)]
pub struct ValueContainer {
    pub slot: ValueKind,
}

/// Marker for entities the pointer can pick and rotate.
#[derive(Component, Debug, Default, Clone, Copy)]
pub struct Interactive;

/// Local-space bounds used for ray picking. Entities without it are never hit
/// themselves, though their descendants may be.
#[derive(Component, Debug, Clone, Copy)]
pub struct PickBounds(pub Aabb);

/// A value label created by the animator. Rendering its text is up to the app.
#[derive(Component, Debug, Clone)]
pub struct ValueLabel {
    pub text: String,
}
