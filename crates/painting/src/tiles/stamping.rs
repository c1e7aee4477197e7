//! Stamp rasterization onto tiled canvases

use glam::Vec2;
use tracing::debug;

use super::TiledSurface;
use crate::types::{BlendMode, Rgba};

/// Borrowed RGBA pixels of a brush tip (or a tinted copy of one)
#[derive(Debug, Clone, Copy)]
pub struct TipView<'a> {
    pub width: u32,
    pub height: u32,
    pub pixels: &'a [Rgba],
}

impl TipView<'_> {
    /// Nearest-neighbour sample at normalized tip coordinates
    #[inline]
    fn sample(&self, u: f32, v: f32) -> Option<Rgba> {
        if !(0.0..1.0).contains(&u) || !(0.0..1.0).contains(&v) {
            return None;
        }
        let x = ((u * self.width as f32) as u32).min(self.width.saturating_sub(1));
        let y = ((v * self.height as f32) as u32).min(self.height.saturating_sub(1));
        self.pixels.get((y * self.width + x) as usize).copied()
    }
}

/// Pixel rectangle (x, y, width, height)
pub type PixelRect = (u32, u32, u32, u32);

impl TiledSurface {
    /// Clamp a floating bounding box to the surface, or `None` if it misses.
    fn clamp_bounds(&self, center: Vec2, half: Vec2) -> Option<(u32, u32, u32, u32)> {
        let x_min = (((center.x - half.x).floor()).max(0.0) as u32).min(self.surface.width);
        let y_min = (((center.y - half.y).floor()).max(0.0) as u32).min(self.surface.height);
        let x_max = (((center.x + half.x).ceil()).max(0.0) as u32).min(self.surface.width);
        let y_max = (((center.y + half.y).ceil()).max(0.0) as u32).min(self.surface.height);
        (x_min < x_max && y_min < y_max).then_some((x_min, y_min, x_max, y_max))
    }

    #[inline]
    fn put(&mut self, px: u32, py: u32, color: Rgba, amount: f32, blend_mode: BlendMode) {
        match blend_mode {
            BlendMode::Normal => self.surface.blend_pixel(px, py, color, amount),
            BlendMode::Erase => self.surface.erase_pixel(px, py, color[3] * amount),
        }
    }

    /// Stamp a filled circle with hardness falloff.
    ///
    /// Returns the affected rectangle, or `None` if the stamp missed the
    /// surface entirely.
    pub fn apply_dab(
        &mut self,
        center_x: f32,
        center_y: f32,
        radius: f32,
        color: Rgba,
        opacity: f32,
        hardness: f32,
        blend_mode: BlendMode,
    ) -> Option<PixelRect> {
        if radius <= 0.0 || opacity <= 0.0 {
            return None;
        }
        let center = Vec2::new(center_x, center_y);
        let (x_min, y_min, x_max, y_max) = self.clamp_bounds(center, Vec2::splat(radius))?;

        let radius_sq = radius * radius;
        for py in y_min..y_max {
            for px in x_min..x_max {
                let d = Vec2::new(px as f32 + 0.5, py as f32 + 0.5) - center;
                let dist_sq = d.length_squared();
                if dist_sq > radius_sq {
                    continue;
                }
                let falloff = calculate_hardness_falloff(dist_sq.sqrt() / radius, hardness);
                if falloff > 0.0 {
                    self.put(px, py, color, opacity * falloff, blend_mode);
                }
            }
        }

        let rect = (x_min, y_min, x_max - x_min, y_max - y_min);
        self.mark_region_dirty(rect.0, rect.1, rect.2, rect.3);
        Some(rect)
    }

    /// Stamp a tip image centered at (`center_x`, `center_y`).
    ///
    /// The tip is scaled so its width spans `size` pixels (height follows the
    /// tip's aspect ratio) and rotated counter-clockwise by `rotation`
    /// radians in canvas space.
    ///
    /// # Arguments
    /// * `tip` - Pixels to stamp; their alpha is the coverage
    /// * `opacity` - Multiplier on tip alpha
    /// * `blend_mode` - `Erase` removes destination alpha by the tip alpha
    pub fn apply_tip(
        &mut self,
        center_x: f32,
        center_y: f32,
        tip: TipView<'_>,
        size: f32,
        rotation: f32,
        opacity: f32,
        blend_mode: BlendMode,
    ) -> Option<PixelRect> {
        if size <= 0.0 || opacity <= 0.0 || tip.width == 0 || tip.height == 0 {
            return None;
        }
        let extent = Vec2::new(size, size * tip.height as f32 / tip.width as f32);
        let (sin, cos) = rotation.sin_cos();
        // Bounding box of the rotated rectangle
        let half = Vec2::new(
            (extent.x * cos.abs() + extent.y * sin.abs()) * 0.5,
            (extent.x * sin.abs() + extent.y * cos.abs()) * 0.5,
        );
        let center = Vec2::new(center_x, center_y);
        let (x_min, y_min, x_max, y_max) = self.clamp_bounds(center, half)?;

        debug!(
            "apply_tip: center=({:.1}, {:.1}) size={:.1} rot={:.2} mode={:?}",
            center_x, center_y, size, rotation, blend_mode
        );

        for py in y_min..y_max {
            for px in x_min..x_max {
                let d = Vec2::new(px as f32 + 0.5, py as f32 + 0.5) - center;
                // Undo the stamp rotation to land in tip space
                let local = Vec2::new(d.x * cos + d.y * sin, -d.x * sin + d.y * cos);
                let u = local.x / extent.x + 0.5;
                let v = local.y / extent.y + 0.5;
                if let Some(texel) = tip.sample(u, v) {
                    if texel[3] > 0.0 {
                        self.put(px, py, texel, opacity, blend_mode);
                    }
                }
            }
        }

        let rect = (x_min, y_min, x_max - x_min, y_max - y_min);
        self.mark_region_dirty(rect.0, rect.1, rect.2, rect.3);
        Some(rect)
    }
}

/// Calculate falloff based on hardness
/// distance_normalized is 0 at center, 1 at edge
/// hardness is 0.0 (soft) to 1.0 (hard)
#[inline]
pub fn calculate_hardness_falloff(distance_normalized: f32, hardness: f32) -> f32 {
    if distance_normalized > 1.0 {
        return 0.0;
    }
    let hardness = hardness.clamp(0.0, 1.0);
    let t = distance_normalized.max(0.0);
    // Linear ramp for soft, flat for hard
    (1.0 - t) * (1.0 - hardness) + hardness
}
