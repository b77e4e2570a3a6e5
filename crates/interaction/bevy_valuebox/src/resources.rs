use bevy::prelude::*;
use valuebox_interaction_core::{
    CodePreview, InsertionAnimator, ManualClock, PickController, ValueboxConfig,
};
use valuebox_scene_core::{PointerEvent, ViewportState};

/// Insertion controller driven by the app's `Time`.
#[derive(Resource)]
pub struct ValueboxAnimator(pub InsertionAnimator<Entity, ManualClock>);

#[derive(Resource)]
pub struct ValueboxPicker(pub PickController<Entity>);

#[derive(Resource, Debug, Clone)]
pub struct ValueboxSettings {
    pub config: ValueboxConfig,
    /// Material alpha of the boxes while translucent.
    pub translucent_alpha: f32,
}

impl Default for ValueboxSettings {
    fn default() -> Self {
        Self {
            config: ValueboxConfig::default(),
            translucent_alpha: 0.5,
        }
    }
}

/// Whether label glyph resources are loaded. While false, values are skipped
/// instead of spawning labels.
#[derive(Resource, Debug, Clone, Copy)]
pub struct LabelAssets {
    pub ready: bool,
}

impl Default for LabelAssets {
    fn default() -> Self {
        Self { ready: true }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PointerAction {
    Down(PointerEvent),
    Move(PointerEvent),
    Up,
}

/// Pointer input captured this frame, consumed by the pick handler. Apps
/// with their own input handling may push into it directly.
#[derive(Resource, Debug, Default)]
pub struct PointerQueue {
    pub pending: Vec<(PointerAction, ViewportState)>,
}

impl PointerQueue {
    pub fn push(&mut self, action: PointerAction, viewport: ViewportState) {
        self.pending.push((action, viewport));
    }
}

#[derive(Resource, Debug, Default, Clone, Copy)]
pub struct OpacityState {
    pub translucent: bool,
}

/// Preview of the most recent submission, for the app's code panel.
#[derive(Resource, Debug, Default, Clone)]
pub struct LatestPreview(pub Option<CodePreview>);
