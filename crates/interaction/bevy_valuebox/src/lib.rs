//! bevy_valuebox: hosts the valuebox controllers inside a Bevy app.
//!
//! Add [`ValueboxPlugin`], spawn three entities with [`ValueContainer`] (one
//! per [`ValueKind`]) plus [`Interactive`], give their meshes [`PickBounds`],
//! and send [`SubmitValues`] to animate values into them. Labels land and are
//! reparented within `Update`, ahead of transform propagation.

use bevy::prelude::*;

pub mod components;
pub mod resources;
pub mod scene;
pub mod systems;

pub use components::{Interactive, PickBounds, ValueContainer, ValueLabel};
pub use resources::{
    LabelAssets, LatestPreview, OpacityState, PointerAction, PointerQueue, ValueboxAnimator,
    ValueboxPicker, ValueboxSettings,
};
pub use scene::WorldScene;

use valuebox_interaction_core::{
    InsertionAnimator, InsertionEvent, ManualClock, PickController, RawInputs,
    ValidationReport, ValueboxConfig,
};
pub use valuebox_interaction_core::ValueKind;

/// Ask the animator to insert these values.
#[derive(Event, Debug, Clone)]
pub struct SubmitValues {
    pub inputs: RawInputs,
}

/// A submission failed validation; nothing was changed.
#[derive(Event, Debug, Clone)]
pub struct SubmitRejected {
    pub report: ValidationReport,
}

/// Animator events, forwarded every frame.
#[derive(Event, Debug, Clone)]
pub struct InsertionOutput(pub InsertionEvent<Entity>);

#[derive(Event, Debug, Clone, Copy, Default)]
pub struct ToggleOpacity;

#[derive(Default, Clone)]
pub struct ValueboxPlugin {
    pub settings: ValueboxSettings,
}

impl ValueboxPlugin {
    pub fn with_config(config: ValueboxConfig) -> Self {
        Self {
            settings: ValueboxSettings {
                config,
                ..Default::default()
            },
        }
    }
}

impl Plugin for ValueboxPlugin {
    fn build(&self, app: &mut App) {
        let mut settings = self.settings.clone();
        if let Err(e) = settings.config.validate() {
            warn!("valuebox: invalid config ({e}); using defaults");
            settings.config = ValueboxConfig::default();
        }
        let animator = match InsertionAnimator::new(
            settings.config.insertion.clone(),
            ManualClock::default(),
        ) {
            Ok(animator) => animator,
            Err(e) => {
                warn!("valuebox: cannot build animator ({e}); using default insertion config");
                InsertionAnimator::with_defaults(ManualClock::default())
            }
        };

        app.insert_resource(ValueboxAnimator(animator))
            .insert_resource(ValueboxPicker(PickController::new(
                settings.config.pick.clone(),
            )))
            .insert_resource(settings)
            .init_resource::<LabelAssets>()
            .init_resource::<PointerQueue>()
            .init_resource::<OpacityState>()
            .init_resource::<LatestPreview>()
            .add_event::<SubmitValues>()
            .add_event::<SubmitRejected>()
            .add_event::<InsertionOutput>()
            .add_event::<ToggleOpacity>()
            .add_systems(
                Update,
                (
                    systems::sync_clock_system,
                    systems::capture_pointer_system,
                    systems::handle_pointer_system,
                    systems::handle_submit_system,
                    systems::tick_insertions_system,
                    systems::toggle_opacity_system,
                )
                    .chain(),
            );
    }
}
