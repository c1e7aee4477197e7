//! Inverse-warp lookup texture.
//!
//! The grid mesh is drawn with an orthographic camera over its padded XY
//! bounds. Each covered texel stores the stencil UV that maps to it, so the
//! bake can turn a local-space position into a stencil UV with one lookup.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::mesh::GridMesh;
use crate::constants::{GEOMETRY_EPSILON, LUT_COVERAGE_THRESHOLD};
use crate::raster::{OrthoFrame, rasterize_triangle};
use crate::types::{Rgba, TRANSPARENT};

/// Local-space rectangle the LUT covers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LutBounds {
    pub min_x: f32,
    pub min_y: f32,
    pub width: f32,
    pub height: f32,
}

impl LutBounds {
    /// Map a local-space XY position to LUT texture coordinates
    #[inline]
    pub fn to_lut_uv(&self, local: Vec2) -> Vec2 {
        Vec2::new(
            (local.x - self.min_x) / self.width,
            (local.y - self.min_y) / self.height,
        )
    }

    pub fn min(&self) -> Vec2 {
        Vec2::new(self.min_x, self.min_y)
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }
}

/// Square float texture, row 0 at the bottom (minimum local Y).
///
/// Texels are `(u, v, 0, 1)` where the grid covers them and transparent
/// elsewhere.
#[derive(Debug, Clone, PartialEq)]
pub struct LutTexture {
    size: u32,
    texels: Vec<Rgba>,
}

impl LutTexture {
    fn new(size: u32) -> Self {
        Self {
            size,
            texels: vec![TRANSPARENT; (size as usize) * (size as usize)],
        }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn texel(&self, x: u32, row: u32) -> Option<Rgba> {
        if x >= self.size || row >= self.size {
            return None;
        }
        self.texels.get((row * self.size + x) as usize).copied()
    }

    /// Nearest-texel sample; `None` outside [0, 1]
    pub fn sample(&self, uv: Vec2) -> Option<Rgba> {
        if !(0.0..=1.0).contains(&uv.x) || !(0.0..=1.0).contains(&uv.y) {
            return None;
        }
        let last = self.size.saturating_sub(1);
        let x = ((uv.x * self.size as f32) as u32).min(last);
        let y = ((uv.y * self.size as f32) as u32).min(last);
        self.texel(x, y)
    }

    /// Stencil UV stored at `uv`, if that texel is covered
    pub fn lookup(&self, uv: Vec2) -> Option<Vec2> {
        let texel = self.sample(uv)?;
        (texel[3] >= LUT_COVERAGE_THRESHOLD).then(|| Vec2::new(texel[0], texel[1]))
    }

    pub fn covered_texels(&self) -> usize {
        self.texels
            .iter()
            .filter(|t| t[3] >= LUT_COVERAGE_THRESHOLD)
            .count()
    }
}

/// A rendered LUT together with the bounds it was rendered over. The two
/// are only ever replaced together.
#[derive(Debug, Clone, PartialEq)]
pub struct Lut {
    pub texture: LutTexture,
    pub bounds: LutBounds,
    /// Bumped on every render so consumers can tell a fresh LUT apart
    pub generation: u64,
}

impl Lut {
    /// Local-space XY to stencil UV, `None` where the grid does not reach
    pub fn stencil_uv(&self, local: Vec2) -> Option<Vec2> {
        self.texture.lookup(self.bounds.to_lut_uv(local))
    }
}

/// Render the LUT for `mesh`. `margin` pads the bounds by that fraction of
/// the larger extent on every side.
///
/// Returns `None` when the mesh is empty or collapses to a point.
pub fn render_lut(mesh: &GridMesh, size: u32, margin: f32, generation: u64) -> Option<Lut> {
    let (lo, hi) = super::grid::xy_bounds(mesh.positions().iter().copied())?;
    let extent = hi - lo;
    let pad = extent.max_element() * margin.max(0.0);
    if !(pad.is_finite() && extent.max_element() > GEOMETRY_EPSILON) {
        return None;
    }
    let min = lo - Vec2::splat(pad);
    let span = (extent + Vec2::splat(2.0 * pad)).max(Vec2::splat(GEOMETRY_EPSILON * 2.0));
    let frame = OrthoFrame::new(min, span, size, size)?;
    let bounds = LutBounds {
        min_x: min.x,
        min_y: min.y,
        width: span.x,
        height: span.y,
    };

    let mut texture = LutTexture::new(size);
    for i in 0..mesh.triangle_count() {
        let Some((positions, uvs)) = mesh.triangle(i) else {
            continue;
        };
        let pixels = positions.map(|p| frame.to_pixel(p.truncate()));
        rasterize_triangle(size, size, pixels, |frag| {
            let uv = uvs[0] * frag.bary.x + uvs[1] * frag.bary.y + uvs[2] * frag.bary.z;
            texture.texels[(frag.y * size + frag.x) as usize] = [uv.x, uv.y, 0.0, 1.0];
        });
    }

    debug!(
        "render_lut: {}x{} over ({:.3}, {:.3}) {:.3}x{:.3}, {} texels covered",
        size,
        size,
        bounds.min_x,
        bounds.min_y,
        bounds.width,
        bounds.height,
        texture.covered_texels()
    );
    Some(Lut {
        texture,
        bounds,
        generation,
    })
}
