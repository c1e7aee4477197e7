//! Stroke interpolation and stamping
//!
//! A stroke turns a sequence of surface UV samples into evenly spaced stamps
//! on a layer canvas. Spacing depends only on the path and the brush, never on
//! how often the pointer reported.

use glam::Vec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};

use crate::brush::{BrushMode, BrushSettings, BrushTip};
use crate::constants::{MAX_STAMPS_PER_SAMPLE, STAMP_STEP_TOLERANCE};
use crate::tiles::{PixelRect, TiledSurface, TipView};
use crate::types::Rgba;

/// Surface UV to canvas pixels. V is flipped because canvas Y grows down.
#[inline]
pub fn uv_to_pixel(uv: Vec2, width: u32, height: u32) -> Vec2 {
    Vec2::new(uv.x * width as f32, (1.0 - uv.y) * height as f32)
}

/// Ephemeral per-gesture state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StrokeState {
    /// Last stamped position in canvas pixels
    last: Option<Vec2>,
    /// Distance walked since the last stamp that has not yet earned one
    leftover: f32,
}

impl StrokeState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.last = None;
        self.leftover = 0.0;
    }

    pub fn last(&self) -> Option<Vec2> {
        self.last
    }

    pub fn leftover(&self) -> f32 {
        self.leftover
    }

    /// Stamp positions for a new sample at `target`.
    ///
    /// The first sample of a stroke (or a forced one) stamps in place.
    /// Otherwise the last stamp walks toward `target` in `step` increments,
    /// emitting a position per increment.
    pub fn advance(&mut self, target: Vec2, step: f32, force: bool, out: &mut Vec<Vec2>) {
        let last = match self.last {
            Some(last) if !force => last,
            _ => {
                self.last = Some(target);
                self.leftover = 0.0;
                out.push(target);
                return;
            }
        };

        let offset = target - last;
        let remaining = offset.length();
        if !remaining.is_finite() {
            return;
        }
        let Some(dir) = offset.try_normalize() else {
            return;
        };

        if !(step > 0.0) {
            return;
        }
        let count = ((remaining + STAMP_STEP_TOLERANCE) / step).floor() as usize;
        if count > MAX_STAMPS_PER_SAMPLE {
            warn!(
                "StrokeState: {:.0}px jump needs {} stamps, restarting at target",
                remaining, count
            );
            self.last = Some(target);
            self.leftover = 0.0;
            out.push(target);
            return;
        }

        out.reserve(count);
        for i in 1..=count {
            out.push(last + dir * (step * i as f32));
        }
        let walked = step * count as f32;
        self.last = Some(last + dir * walked);
        self.leftover = (remaining - walked).max(0.0);
    }
}

/// Paints strokes onto layer canvases.
///
/// Owns the jitter RNG and a scratch buffer for tinted tips, reused across
/// stamps so steady-state painting does not allocate.
pub struct StrokePainter {
    state: StrokeState,
    rng: StdRng,
    tint_scratch: Vec<Rgba>,
    positions: Vec<Vec2>,
    /// Opacity multiplier at zero pressure
    pub pressure_opacity_floor: f32,
}

impl StrokePainter {
    /// `seed` fixes jitter for reproducible strokes; `None` seeds from the OS
    pub fn new(seed: Option<u64>, pressure_opacity_floor: f32) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            state: StrokeState::new(),
            rng,
            tint_scratch: Vec::new(),
            positions: Vec::new(),
            pressure_opacity_floor,
        }
    }

    pub fn state(&self) -> &StrokeState {
        &self.state
    }

    pub fn begin_stroke(&mut self) {
        self.state.reset();
    }

    pub fn end_stroke(&mut self) {
        self.state.reset();
    }

    /// Feed one surface sample into the current stroke.
    ///
    /// Returns the number of stamps drawn.
    pub fn paint_stroke(
        &mut self,
        canvas: &mut TiledSurface,
        settings: &BrushSettings,
        tip: Option<&BrushTip>,
        uv: Vec2,
        pressure: f32,
        force: bool,
    ) -> usize {
        if !uv.is_finite() || !(0.0..=1.0).contains(&uv.x) || !(0.0..=1.0).contains(&uv.y) {
            warn!("paint_stroke: ignoring uv ({}, {}) outside the unit square", uv.x, uv.y);
            return 0;
        }
        let surface = canvas.surface();
        let target = uv_to_pixel(uv, surface.width, surface.height);

        let mut positions = std::mem::take(&mut self.positions);
        positions.clear();
        self.state.advance(target, settings.step(), force, &mut positions);
        for &pos in &positions {
            self.draw_stamp(canvas, settings, tip, pos, pressure);
        }
        let count = positions.len();
        self.positions = positions;

        if count > 0 {
            debug!(
                "paint_stroke: {} stamps toward ({:.1}, {:.1}), leftover {:.2}",
                count, target.x, target.y, self.state.leftover
            );
        }
        count
    }

    /// Draw a single stamp at a canvas pixel position
    pub fn draw_stamp(
        &mut self,
        canvas: &mut TiledSurface,
        settings: &BrushSettings,
        tip: Option<&BrushTip>,
        pos: Vec2,
        pressure: f32,
    ) -> Option<PixelRect> {
        let size = settings.effective_size(pressure);
        let opacity = settings.effective_opacity(pressure, self.pressure_opacity_floor);
        if size <= 0.0 || opacity <= 0.0 {
            return None;
        }

        let mut center = pos;
        if settings.position_jitter > 0.0 {
            let reach = settings.position_jitter * size * 0.5;
            center += Vec2::new(
                self.rng.random_range(-reach..=reach),
                self.rng.random_range(-reach..=reach),
            );
        }
        let mut rotation = settings.rotation;
        if settings.rotation_jitter > 0.0 {
            let j = settings.rotation_jitter;
            rotation += self.rng.random_range(-j..=j);
        }

        let blend_mode = settings.blend_mode();
        let Some(tip) = tip else {
            return canvas.apply_dab(
                center.x,
                center.y,
                size * 0.5,
                settings.color,
                opacity,
                settings.hardness,
                blend_mode,
            );
        };

        match settings.mode {
            BrushMode::Erase | BrushMode::MaskOnly => {
                canvas.apply_tip(center.x, center.y, tip.mask_view(), size, rotation, opacity, blend_mode)
            }
            BrushMode::Paint => {
                tint_tip(&mut self.tint_scratch, tip, settings.color, settings.texture_mix);
                let view = TipView {
                    width: tip.width,
                    height: tip.height,
                    pixels: &self.tint_scratch,
                };
                canvas.apply_tip(center.x, center.y, view, size, rotation, opacity, blend_mode)
            }
        }
    }
}

/// Brush color masked by tip alpha, mixed toward the raw tip texture by `mix`
fn tint_tip(scratch: &mut Vec<Rgba>, tip: &BrushTip, color: Rgba, mix: f32) {
    let mix = mix.clamp(0.0, 1.0);
    scratch.clear();
    scratch.extend(tip.mask().iter().zip(tip.texture()).map(|(m, t)| {
        [
            color[0] * (1.0 - mix) + t[0] * mix,
            color[1] * (1.0 - mix) + t[1] * mix,
            color[2] * (1.0 - mix) + t[2] * mix,
            m[3] * color[3],
        ]
    }));
}
