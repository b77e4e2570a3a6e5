//! valuebox-interaction-core (engine-agnostic)
//!
//! The two controllers a host drives from its input handlers and render loop:
//! - [`PickController`]: pointer → ray → picked box, drag → rotation delta
//! - [`InsertionAnimator`]: validated values → labels flying into their boxes,
//!   one batch at a time, bound to the box when they land
//!
//! Both only hold scene handles and reach the scene through
//! [`valuebox_scene_core::SceneAdapter`].

pub mod config;
pub mod error;
pub mod input;
pub mod insertion;
pub mod outputs;
pub mod pick;

pub use config::{InsertionConfig, PickConfig, ValueboxConfig};
pub use error::{ConfigError, InsertionError};
pub use input::{
    validate, validate_field, AnimationRequest, CodePreview, FieldError, RawInputs,
    ValidationError, ValidationReport, ValueKind,
};
pub use insertion::{AnimatorPhase, BoundLabel, InsertionAnimator};
pub use outputs::{BatchId, InsertionEvent, SubmitOutcome};
pub use pick::{PickController, PickResult, PickState, RotationDelta};

pub use valuebox_animation_core::{Clock, Easing, ManualClock, SystemClock, Timestamp};
