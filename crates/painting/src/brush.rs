//! Brush settings and brush-tip masks
//!
//! Settings are a flat record the UI edits between strokes. Tips are the
//! preprocessed alpha masks a stroke stamps with; turning an arbitrary image
//! into a tip is delegated to a [`MaskPreprocessor`].

use std::collections::HashMap;

use image::RgbaImage;
use impasto_ipc::PaintTool;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::MIN_STAMP_STEP;
use crate::tiles::TipView;
use crate::types::{BlendMode, Rgba};
use crate::validation::from_rgba8;

/// What a stamp does to the canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BrushMode {
    /// Tinted source-over
    #[default]
    Paint,
    /// Destination-out using the tip alpha
    Erase,
    /// Source-over of the untinted mask
    MaskOnly,
}

/// Brush configuration, read once per stamp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrushSettings {
    /// Straight-alpha RGBA
    pub color: Rgba,
    /// Diameter in canvas pixels
    pub size: f32,
    pub opacity: f32,
    /// Per-stamp opacity multiplier
    pub flow: f32,
    /// Stamp spacing as a fraction of size
    pub spacing: f32,
    /// Edge hardness for the circle tip: 0.0 = soft, 1.0 = hard
    pub hardness: f32,
    /// Base tip rotation in radians
    pub rotation: f32,
    /// Maximum random rotation offset in radians
    pub rotation_jitter: f32,
    /// Maximum random center offset as a fraction of size
    pub position_jitter: f32,
    /// Handle of the tip mask; `None` stamps a filled circle
    pub mask: Option<String>,
    /// Blend between brush color (0.0) and the raw tip texture (1.0)
    pub texture_mix: f32,
    pub mode: BrushMode,
    /// Modulate size and opacity by stylus pressure
    pub pressure_enabled: bool,
}

impl Default for BrushSettings {
    fn default() -> Self {
        Self {
            color: [0.0, 0.0, 0.0, 1.0],
            size: 20.0,
            opacity: 1.0,
            flow: 1.0,
            spacing: 0.25,
            hardness: 1.0,
            rotation: 0.0,
            rotation_jitter: 0.0,
            position_jitter: 0.0,
            mask: None,
            texture_mix: 0.0,
            mode: BrushMode::Paint,
            pressure_enabled: false,
        }
    }
}

impl BrushSettings {
    /// Distance between consecutive stamps in pixels, never below one pixel
    #[inline]
    pub fn step(&self) -> f32 {
        (self.size * self.spacing).max(MIN_STAMP_STEP)
    }

    /// Size after pressure: 50% of `size` at zero pressure, 100% at full
    pub fn effective_size(&self, pressure: f32) -> f32 {
        if self.pressure_enabled {
            self.size * (0.5 + 0.5 * pressure.clamp(0.0, 1.0))
        } else {
            self.size
        }
    }

    /// Opacity after flow and pressure; pressure scales linearly down to `floor`
    pub fn effective_opacity(&self, pressure: f32, floor: f32) -> f32 {
        let base = (self.opacity * self.flow).clamp(0.0, 1.0);
        if self.pressure_enabled {
            let floor = floor.clamp(0.0, 1.0);
            base * (floor + (1.0 - floor) * pressure.clamp(0.0, 1.0))
        } else {
            base
        }
    }

    pub fn blend_mode(&self) -> BlendMode {
        match self.mode {
            BrushMode::Erase => BlendMode::Erase,
            BrushMode::Paint | BrushMode::MaskOnly => BlendMode::Normal,
        }
    }

    /// Tool reported with gesture events
    pub fn tool(&self) -> PaintTool {
        match self.mode {
            BrushMode::Erase => PaintTool::Eraser,
            BrushMode::Paint | BrushMode::MaskOnly => PaintTool::Brush,
        }
    }
}

/// A preprocessed brush tip.
///
/// `mask` is white with the tip coverage in alpha. `texture` keeps the
/// source colors for texture mixing.
#[derive(Debug, Clone)]
pub struct BrushTip {
    pub width: u32,
    pub height: u32,
    mask: Vec<Rgba>,
    texture: Vec<Rgba>,
}

impl BrushTip {
    /// Build a tip from matching mask and texture buffers.
    /// Returns `None` if either buffer has the wrong length.
    pub fn new(width: u32, height: u32, mask: Vec<Rgba>, texture: Vec<Rgba>) -> Option<Self> {
        let len = (width as usize) * (height as usize);
        (len > 0 && mask.len() == len && texture.len() == len).then_some(Self {
            width,
            height,
            mask,
            texture,
        })
    }

    pub fn mask_view(&self) -> TipView<'_> {
        TipView {
            width: self.width,
            height: self.height,
            pixels: &self.mask,
        }
    }

    pub fn mask(&self) -> &[Rgba] {
        &self.mask
    }

    pub fn texture(&self) -> &[Rgba] {
        &self.texture
    }
}

/// Turns an arbitrary source image into a brush tip
pub trait MaskPreprocessor {
    fn preprocess(&self, source: &RgbaImage) -> Option<BrushTip>;
}

/// Maps source luminance (times source alpha) to tip alpha, RGB forced to white
#[derive(Debug, Default, Clone, Copy)]
pub struct LuminanceMask;

impl MaskPreprocessor for LuminanceMask {
    fn preprocess(&self, source: &RgbaImage) -> Option<BrushTip> {
        let texture: Vec<Rgba> = source.pixels().map(|p| from_rgba8(p.0)).collect();
        let mask = texture
            .iter()
            .map(|c| {
                let luma = 0.299 * c[0] + 0.587 * c[1] + 0.114 * c[2];
                [1.0, 1.0, 1.0, (luma * c[3]).clamp(0.0, 1.0)]
            })
            .collect();
        BrushTip::new(source.width(), source.height(), mask, texture)
    }
}

/// Tips keyed by their mask handle.
///
/// Images load asynchronously, so a handle may be referenced before its tip
/// is registered; lookups simply miss until then.
#[derive(Default)]
pub struct TipLibrary {
    tips: HashMap<String, BrushTip>,
}

impl TipLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Preprocess `source` and store it under `handle`
    pub fn register(
        &mut self,
        handle: impl Into<String>,
        source: &RgbaImage,
        preprocessor: &dyn MaskPreprocessor,
    ) -> bool {
        let handle = handle.into();
        match preprocessor.preprocess(source) {
            Some(tip) => {
                debug!("TipLibrary: registered '{}' ({}x{})", handle, tip.width, tip.height);
                self.tips.insert(handle, tip);
                true
            }
            None => {
                debug!("TipLibrary: preprocessing '{}' produced no tip", handle);
                false
            }
        }
    }

    pub fn get(&self, handle: &str) -> Option<&BrushTip> {
        self.tips.get(handle)
    }

    /// The tip named by the settings, if it is loaded
    pub fn for_settings(&self, settings: &BrushSettings) -> Option<&BrushTip> {
        settings.mask.as_deref().and_then(|h| self.get(h))
    }

    pub fn remove(&mut self, handle: &str) -> Option<BrushTip> {
        self.tips.remove(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba as Pixel;

    #[test]
    fn test_step_has_one_pixel_floor() {
        let settings = BrushSettings {
            size: 1.0,
            spacing: 0.01,
            ..Default::default()
        };
        assert_eq!(settings.step(), 1.0);

        let settings = BrushSettings {
            size: 40.0,
            spacing: 0.5,
            ..Default::default()
        };
        assert_eq!(settings.step(), 20.0);
    }

    #[test]
    fn test_pressure_size_range() {
        let settings = BrushSettings {
            size: 40.0,
            pressure_enabled: true,
            ..Default::default()
        };
        assert!((settings.effective_size(0.0) - 20.0).abs() < 1e-6);
        assert!((settings.effective_size(0.5) - 30.0).abs() < 1e-6);
        assert!((settings.effective_size(1.0) - 40.0).abs() < 1e-6);
    }

    #[test]
    fn test_pressure_opacity_floor() {
        let settings = BrushSettings {
            opacity: 0.8,
            pressure_enabled: true,
            ..Default::default()
        };
        assert!((settings.effective_opacity(0.0, 0.25) - 0.2).abs() < 1e-6);
        assert!((settings.effective_opacity(1.0, 0.25) - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_pressure_ignored_when_disabled() {
        let settings = BrushSettings::default();
        assert_eq!(settings.effective_size(0.0), settings.size);
        assert_eq!(settings.effective_opacity(0.0, 0.25), 1.0);
    }

    #[test]
    fn test_settings_json_defaults() {
        let settings: BrushSettings = serde_json::from_str(r#"{ "size": 8.0, "mode": "Erase" }"#).unwrap();
        assert_eq!(settings.size, 8.0);
        assert_eq!(settings.mode, BrushMode::Erase);
        assert_eq!(settings.blend_mode(), BlendMode::Erase);
        assert_eq!(settings.tool(), PaintTool::Eraser);
        assert_eq!(settings.spacing, BrushSettings::default().spacing);
    }

    #[test]
    fn test_luminance_mask() {
        let mut source = RgbaImage::new(2, 1);
        source.put_pixel(0, 0, Pixel([255, 255, 255, 255]));
        source.put_pixel(1, 0, Pixel([0, 0, 0, 255]));

        let tip = LuminanceMask.preprocess(&source).unwrap();
        assert_eq!(&tip.mask()[0][..3], &[1.0, 1.0, 1.0]);
        assert!((tip.mask()[0][3] - 1.0).abs() < 1e-5);
        assert_eq!(tip.mask()[1], [1.0, 1.0, 1.0, 0.0]);
        assert_eq!(tip.texture()[1], [0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_empty_image_gives_no_tip() {
        assert!(LuminanceMask.preprocess(&RgbaImage::new(0, 0)).is_none());
    }

    #[test]
    fn test_library_lookup_by_settings() {
        let mut library = TipLibrary::new();
        let settings = BrushSettings {
            mask: Some("chalk".into()),
            ..Default::default()
        };
        assert!(library.for_settings(&settings).is_none());

        let source = RgbaImage::from_pixel(4, 4, Pixel([200, 200, 200, 255]));
        assert!(library.register("chalk", &source, &LuminanceMask));
        assert_eq!(library.for_settings(&settings).unwrap().width, 4);
    }
}
