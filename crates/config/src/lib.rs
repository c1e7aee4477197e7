//! Shared configuration for Impasto
//!
//! This crate is the single source of truth for texture resolution, stencil
//! LUT parameters, curve projection offsets and gizmo handle geometry. All
//! sections deserialize with defaults so a host can override only the fields
//! it cares about.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[cfg(feature = "bevy")]
use bevy::prelude::Resource;

/// Default paint layer resolution (square)
pub const DEFAULT_TEXTURE_SIZE: u32 = 1024;

/// Default stencil lookup texture resolution (square)
pub const DEFAULT_LUT_SIZE: u32 = 512;

/// Fraction of the grid bounds added on each side before the LUT is rendered
pub const DEFAULT_LUT_MARGIN: f32 = 0.05;

/// Lowest opacity multiplier reached at zero pressure
pub const DEFAULT_PRESSURE_OPACITY_FLOOR: f32 = 0.25;

/// Frames to wait between a bake request and the bake itself
pub const DEFAULT_BAKE_DELAY_FRAMES: u32 = 1;

/// Default canvas tile size for dirty tracking
pub const DEFAULT_TILE_SIZE: u32 = 128;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Top-level configuration for a painting session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "bevy", derive(Resource))]
#[serde(default)]
pub struct PaintConfig {
    /// Width and height of every layer canvas in pixels
    pub texture_size: u32,
    /// Tile size used for dirty-region tracking on layer canvases
    pub tile_size: u32,
    /// Width and height of the stencil lookup texture in pixels
    pub lut_size: u32,
    /// Padding added around the grid bounds, as a fraction of the larger extent
    pub lut_margin: f32,
    /// Opacity multiplier at zero pressure when pressure response is enabled
    pub pressure_opacity_floor: f32,
    /// Opacity applied to baked and previewed stencil color
    pub projection_opacity: f32,
    /// Skip surface fragments that face away from the stencil
    pub cull_backfaces: bool,
    /// Frames between a bake request and its execution
    pub bake_delay_frames: u32,
    /// Fixed seed for brush jitter; `None` seeds from the OS
    pub rng_seed: Option<u64>,
    pub sphere: SphereConfig,
    pub curve: CurveConfig,
    pub gizmo: GizmoConfig,
}

impl Default for PaintConfig {
    fn default() -> Self {
        Self {
            texture_size: DEFAULT_TEXTURE_SIZE,
            tile_size: DEFAULT_TILE_SIZE,
            lut_size: DEFAULT_LUT_SIZE,
            lut_margin: DEFAULT_LUT_MARGIN,
            pressure_opacity_floor: DEFAULT_PRESSURE_OPACITY_FLOOR,
            projection_opacity: 1.0,
            cull_backfaces: true,
            bake_delay_frames: DEFAULT_BAKE_DELAY_FRAMES,
            rng_seed: None,
            sphere: SphereConfig::default(),
            curve: CurveConfig::default(),
            gizmo: GizmoConfig::default(),
        }
    }
}

impl PaintConfig {
    /// Parse a JSON document and validate the result.
    ///
    /// Missing fields fall back to their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check ranges that the painting pipeline relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.texture_size == 0 {
            return Err(ConfigError::invalid("texture_size", "must be non-zero"));
        }
        if self.tile_size == 0 {
            return Err(ConfigError::invalid("tile_size", "must be non-zero"));
        }
        if self.lut_size == 0 {
            return Err(ConfigError::invalid("lut_size", "must be non-zero"));
        }
        if !(0.0..1.0).contains(&self.lut_margin) {
            return Err(ConfigError::invalid(
                "lut_margin",
                format!("{} is outside [0, 1)", self.lut_margin),
            ));
        }
        if !(0.0..=1.0).contains(&self.pressure_opacity_floor) {
            return Err(ConfigError::invalid(
                "pressure_opacity_floor",
                format!("{} is outside [0, 1]", self.pressure_opacity_floor),
            ));
        }
        if !(0.0..=1.0).contains(&self.projection_opacity) {
            return Err(ConfigError::invalid(
                "projection_opacity",
                format!("{} is outside [0, 1]", self.projection_opacity),
            ));
        }
        self.sphere.validate()?;
        self.curve.validate()?;
        self.gizmo.validate()
    }
}

/// The paintable UV sphere
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SphereConfig {
    pub radius: f32,
    pub width_segments: u32,
    pub height_segments: u32,
}

impl Default for SphereConfig {
    fn default() -> Self {
        Self {
            radius: 1.0,
            width_segments: 64,
            height_segments: 32,
        }
    }
}

impl SphereConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.radius > 0.0) {
            return Err(ConfigError::invalid("sphere.radius", "must be positive"));
        }
        if self.width_segments < 3 || self.height_segments < 2 {
            return Err(ConfigError::invalid(
                "sphere.segments",
                "need at least 3 width and 2 height segments",
            ));
        }
        Ok(())
    }
}

/// Bezier curve projection and sampling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurveConfig {
    /// Distance above the sphere surface where control points live
    pub surface_offset: f32,
    /// Samples taken per cubic segment when painting along the curve
    pub samples_per_segment: u32,
    /// How far each sample is pushed outward before casting back to the mesh
    pub raycast_lift: f32,
}

impl Default for CurveConfig {
    fn default() -> Self {
        Self {
            surface_offset: 0.02,
            samples_per_segment: 64,
            raycast_lift: 0.5,
        }
    }
}

impl CurveConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.surface_offset < 0.0 {
            return Err(ConfigError::invalid("curve.surface_offset", "must not be negative"));
        }
        if self.samples_per_segment == 0 {
            return Err(ConfigError::invalid("curve.samples_per_segment", "must be non-zero"));
        }
        if !(self.raycast_lift > 0.0) {
            return Err(ConfigError::invalid("curve.raycast_lift", "must be positive"));
        }
        Ok(())
    }
}

/// Logical gizmo geometry in unscaled local units.
///
/// The same numbers drive the rendered meshes and the hit tests so what the
/// user sees is what they can grab.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GizmoConfig {
    /// Length of each arrow from the center to the tip of its cone
    pub arrow_length: f32,
    /// Radius of the center sphere or cube handle
    pub center_radius: f32,
    /// Ray/axis distance below which an axis is hovered
    pub line_pick_radius: f32,
    /// Distance from the center to the near corner of a plane handle
    pub plane_offset: f32,
    /// Edge length of a plane handle
    pub plane_size: f32,
    /// Radius of a rotation ring
    pub ring_radius: f32,
    /// Half-width of the band around a ring that counts as a hit
    pub ring_band: f32,
    /// Local offset of the mode-switch cube
    pub switch_offset: [f32; 3],
    /// Half extent of the mode-switch cube
    pub switch_size: f32,
}

impl Default for GizmoConfig {
    fn default() -> Self {
        Self {
            arrow_length: 1.0,
            center_radius: 0.12,
            line_pick_radius: 0.08,
            plane_offset: 0.25,
            plane_size: 0.25,
            ring_radius: 1.0,
            ring_band: 0.08,
            switch_offset: [0.9, 0.9, 0.0],
            switch_size: 0.08,
        }
    }
}

impl GizmoConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("gizmo.arrow_length", self.arrow_length),
            ("gizmo.center_radius", self.center_radius),
            ("gizmo.line_pick_radius", self.line_pick_radius),
            ("gizmo.plane_size", self.plane_size),
            ("gizmo.ring_radius", self.ring_radius),
            ("gizmo.ring_band", self.ring_band),
            ("gizmo.switch_size", self.switch_size),
        ];
        for (field, value) in positive {
            if !(value > 0.0) {
                return Err(ConfigError::invalid(field, format!("{value} must be positive")));
            }
        }
        if self.plane_offset < 0.0 {
            return Err(ConfigError::invalid("gizmo.plane_offset", "must not be negative"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PaintConfig::default();
        assert_eq!(config.texture_size, DEFAULT_TEXTURE_SIZE);
        assert_eq!(config.lut_size, DEFAULT_LUT_SIZE);
        assert_eq!(config.bake_delay_frames, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = PaintConfig::from_json(r#"{ "texture_size": 256, "gizmo": { "arrow_length": 2.0 } }"#)
            .unwrap();
        assert_eq!(config.texture_size, 256);
        assert_eq!(config.gizmo.arrow_length, 2.0);
        assert_eq!(config.gizmo.ring_radius, GizmoConfig::default().ring_radius);
        assert_eq!(config.sphere, SphereConfig::default());
    }

    #[test]
    fn test_rejects_zero_texture_size() {
        let err = PaintConfig::from_json(r#"{ "texture_size": 0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "texture_size", .. }));
    }

    #[test]
    fn test_rejects_out_of_range_opacity() {
        let mut config = PaintConfig::default();
        config.projection_opacity = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_malformed_json() {
        let err = PaintConfig::from_json("{ texture_size: }").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_json_roundtrip_preserves_seed() {
        let mut config = PaintConfig::default();
        config.rng_seed = Some(7);
        let json = config.to_json().unwrap();
        let parsed = PaintConfig::from_json(&json).unwrap();
        assert_eq!(parsed, config);
    }
}
