//! Configuration for the interaction controllers.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ConfigError;
use valuebox_animation_core::Easing;

/// Where labels appear, where they come to rest and how they get there.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InsertionConfig {
    /// World position every new label starts from (above the boxes).
    pub spawn_position: [f32; 3],
    /// Resting point inside a box, added to the box's world position.
    pub rest_offset: [f32; 3],
    /// Flight duration of one label.
    pub duration_ms: u64,
    pub easing: Easing,
}

impl Default for InsertionConfig {
    fn default() -> Self {
        Self {
            spawn_position: [0.0, 5.0, 0.0],
            rest_offset: [0.0, 0.3, 0.0],
            duration_ms: 1_000,
            easing: Easing::EaseInOutQuad,
        }
    }
}

impl InsertionConfig {
    pub fn spawn(&self) -> Vector3<f32> {
        Vector3::from(self.spawn_position)
    }

    pub fn rest(&self) -> Vector3<f32> {
        Vector3::from(self.rest_offset)
    }

    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.duration_ms == 0 {
            return Err(ConfigError::Invalid(
                "insertion.duration_ms must be greater than zero".into(),
            ));
        }
        if !self
            .spawn_position
            .iter()
            .chain(self.rest_offset.iter())
            .all(|c| c.is_finite())
        {
            return Err(ConfigError::Invalid(
                "insertion positions must be finite".into(),
            ));
        }
        Ok(())
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PickConfig {
    /// Radians of rotation per pixel of pointer travel.
    pub rotation_sensitivity: f32,
}

impl Default for PickConfig {
    fn default() -> Self {
        Self {
            rotation_sensitivity: 0.005,
        }
    }
}

impl PickConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.rotation_sensitivity.is_finite() {
            return Err(ConfigError::Invalid(
                "pick.rotation_sensitivity must be finite".into(),
            ));
        }
        Ok(())
    }
}

/// Aggregate configuration, as loaded by hosts.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValueboxConfig {
    pub insertion: InsertionConfig,
    pub pick: PickConfig,
}

impl ValueboxConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.insertion.validate()?;
        self.pick.validate()
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }
}
