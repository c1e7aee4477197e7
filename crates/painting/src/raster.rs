//! Software triangle rasterizer for the off-screen passes (stencil LUT and
//! projection bake).
//!
//! Targets follow render-target orientation: row 0 is the bottom of the
//! image (minimum Y), so readbacks must be flipped before they land on a
//! canvas.

use glam::{Vec2, Vec3};

use crate::constants::GEOMETRY_EPSILON;
use crate::math::edge;

/// Orthographic mapping from a world-space XY rectangle to a pixel grid
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrthoFrame {
    pub min: Vec2,
    pub size: Vec2,
    pub width: u32,
    pub height: u32,
}

impl OrthoFrame {
    /// Returns `None` for an empty rectangle or target
    pub fn new(min: Vec2, size: Vec2, width: u32, height: u32) -> Option<Self> {
        if width == 0 || height == 0 || !(size.x > GEOMETRY_EPSILON && size.y > GEOMETRY_EPSILON) {
            return None;
        }
        Some(Self {
            min,
            size,
            width,
            height,
        })
    }

    /// Unit square onto the full target (UV-space rendering)
    pub fn unit(width: u32, height: u32) -> Option<Self> {
        Self::new(Vec2::ZERO, Vec2::ONE, width, height)
    }

    /// World XY to continuous pixel coordinates
    #[inline]
    pub fn to_pixel(&self, p: Vec2) -> Vec2 {
        (p - self.min) / self.size * Vec2::new(self.width as f32, self.height as f32)
    }
}

/// Fragment produced by [`rasterize_triangle`]
#[derive(Debug, Clone, Copy)]
pub struct Fragment {
    pub x: u32,
    pub y: u32,
    /// Weights of the three vertices, summing to 1
    pub bary: Vec3,
}

/// Rasterize one triangle given in continuous pixel coordinates.
///
/// A pixel is covered when its center lies inside or on the triangle. Both
/// windings are accepted; degenerate triangles produce nothing.
pub fn rasterize_triangle(
    width: u32,
    height: u32,
    p: [Vec2; 3],
    mut shade: impl FnMut(Fragment),
) {
    let area = edge(p[0], p[1], p[2]);
    if area.abs() < GEOMETRY_EPSILON || !area.is_finite() {
        return;
    }

    let lo = p[0].min(p[1]).min(p[2]);
    let hi = p[0].max(p[1]).max(p[2]);
    let x_min = (lo.x - 0.5).ceil().max(0.0) as u32;
    let y_min = (lo.y - 0.5).ceil().max(0.0) as u32;
    let x_end = ((hi.x - 0.5).floor() + 1.0).clamp(0.0, width as f32) as u32;
    let y_end = ((hi.y - 0.5).floor() + 1.0).clamp(0.0, height as f32) as u32;

    let inv_area = 1.0 / area;
    for y in y_min..y_end {
        for x in x_min..x_end {
            let c = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
            let w0 = edge(p[1], p[2], c) * inv_area;
            let w1 = edge(p[2], p[0], c) * inv_area;
            let w2 = edge(p[0], p[1], c) * inv_area;
            if w0 >= 0.0 && w1 >= 0.0 && w2 >= 0.0 {
                shade(Fragment {
                    x,
                    y,
                    bary: Vec3::new(w0, w1, w2),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coverage(p: [Vec2; 3]) -> Vec<(u32, u32)> {
        let mut hits = Vec::new();
        rasterize_triangle(8, 8, p, |f| hits.push((f.x, f.y)));
        hits
    }

    #[test]
    fn test_both_windings_cover_same_pixels() {
        let ccw = [Vec2::new(0.0, 0.0), Vec2::new(8.0, 0.0), Vec2::new(0.0, 8.0)];
        let cw = [ccw[0], ccw[2], ccw[1]];
        let a = coverage(ccw);
        let b = coverage(cw);
        assert_eq!(a, b);
        // Pixel centers strictly below the diagonal plus those on it
        assert_eq!(a.len(), 36);
    }

    #[test]
    fn test_barycentrics_sum_to_one() {
        let p = [Vec2::new(1.0, 1.0), Vec2::new(7.0, 2.0), Vec2::new(3.0, 7.0)];
        rasterize_triangle(8, 8, p, |f| {
            assert!((f.bary.x + f.bary.y + f.bary.z - 1.0).abs() < 1e-5);
            assert!(f.bary.min_element() >= 0.0);
        });
    }

    #[test]
    fn test_degenerate_triangle_draws_nothing() {
        let p = [Vec2::ZERO, Vec2::new(4.0, 4.0), Vec2::new(8.0, 8.0)];
        assert!(coverage(p).is_empty());
    }

    #[test]
    fn test_clipped_to_target() {
        let p = [Vec2::new(-10.0, -10.0), Vec2::new(30.0, -10.0), Vec2::new(-10.0, 30.0)];
        let hits = coverage(p);
        assert_eq!(hits.len(), 64);
    }

    #[test]
    fn test_ortho_frame() {
        let frame = OrthoFrame::new(Vec2::new(-1.0, -1.0), Vec2::new(2.0, 2.0), 100, 100).unwrap();
        assert_eq!(frame.to_pixel(Vec2::ZERO), Vec2::new(50.0, 50.0));
        assert!(OrthoFrame::new(Vec2::ZERO, Vec2::new(0.0, 1.0), 10, 10).is_none());
    }
}
