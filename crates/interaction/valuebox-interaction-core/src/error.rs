//! Error types for configuration and label insertion.

use thiserror::Error;
use valuebox_animation_core::TimelineError;
use valuebox_scene_core::SceneError;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Why a single value could not be animated. Only affects that value; the
/// rest of the batch still runs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InsertionError {
    #[error(transparent)]
    Scene(#[from] SceneError),
    #[error(transparent)]
    Timeline(#[from] TimelineError),
}
