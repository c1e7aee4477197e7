//! CPU raster canvas with straight (non-premultiplied) alpha

use image::RgbaImage;

use crate::types::{Rgba, TRANSPARENT};
use crate::validation::to_u8;

/// An RGBA float canvas.
/// Row 0 is the top of the image (canvas convention, Y grows downward).
pub struct CpuSurface {
    /// Surface dimensions
    pub width: u32,
    pub height: u32,
    /// Pixel data in row-major order, each pixel is [r, g, b, a] as f32
    pixels: Vec<Rgba>,
}

impl CpuSurface {
    /// Create a new surface with the given dimensions, initialized to transparent black
    pub fn new(width: u32, height: u32) -> Self {
        let pixel_count = (width as usize) * (height as usize);
        Self {
            width,
            height,
            pixels: vec![TRANSPARENT; pixel_count],
        }
    }

    /// Replace every pixel with `color`
    pub fn fill(&mut self, color: Rgba) {
        self.pixels.fill(color);
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> Option<usize> {
        (x < self.width && y < self.height)
            .then(|| (y as usize) * (self.width as usize) + (x as usize))
    }

    /// Get a pixel at the given coordinates
    /// Returns None if coordinates are out of bounds
    #[inline]
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        self.index(x, y).map(|i| self.pixels[i])
    }

    /// Set a pixel at the given coordinates
    /// Does nothing if coordinates are out of bounds
    #[inline]
    pub fn set_pixel(&mut self, x: u32, y: u32, color: Rgba) {
        if let Some(i) = self.index(x, y) {
            self.pixels[i] = color;
        }
    }

    /// Source-over blend of `color` scaled by `opacity`
    #[inline]
    pub fn blend_pixel(&mut self, x: u32, y: u32, color: Rgba, opacity: f32) {
        if let Some(i) = self.index(x, y) {
            self.pixels[i] = source_over(self.pixels[i], color, opacity);
        }
    }

    /// Destination-out: remove `amount` (0-1) of the existing alpha.
    /// Color channels are left alone since alpha is straight.
    #[inline]
    pub fn erase_pixel(&mut self, x: u32, y: u32, amount: f32) {
        if let Some(i) = self.index(x, y) {
            let remaining = (1.0 - amount.clamp(0.0, 1.0)).max(0.0);
            self.pixels[i][3] *= remaining;
        }
    }

    /// Source-over the whole of `other` (same size) at `opacity`
    pub fn composite_over(&mut self, other: &CpuSurface, opacity: f32) {
        if other.width != self.width || other.height != self.height || opacity <= 0.0 {
            return;
        }
        for (dst, src) in self.pixels.iter_mut().zip(other.pixels.iter()) {
            if src[3] > 0.0 {
                *dst = source_over(*dst, *src, opacity);
            }
        }
    }

    /// Quantize to an 8-bit image
    pub fn to_rgba8(&self) -> RgbaImage {
        let mut out = RgbaImage::new(self.width, self.height);
        for (dst, src) in out.pixels_mut().zip(self.pixels.iter()) {
            dst.0 = [to_u8(src[0]), to_u8(src[1]), to_u8(src[2]), to_u8(src[3])];
        }
        out
    }

    /// Get raw pixel data for GPU upload
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }

    /// Get the total number of pixels
    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.pixels.len()
    }

    #[inline]
    pub fn pixels(&self) -> &[Rgba] {
        &self.pixels
    }

    #[inline]
    pub fn pixels_mut(&mut self) -> &mut [Rgba] {
        &mut self.pixels
    }
}

/// Straight-alpha source-over of `src` (alpha scaled by `opacity`) onto `dst`
#[inline]
pub fn source_over(dst: Rgba, src: Rgba, opacity: f32) -> Rgba {
    let sa = (src[3] * opacity).clamp(0.0, 1.0);
    if sa <= 0.0 {
        return dst;
    }
    let da = dst[3] * (1.0 - sa);
    let out_a = sa + da;
    if out_a <= 0.0 {
        return TRANSPARENT;
    }
    [
        (src[0] * sa + dst[0] * da) / out_a,
        (src[1] * sa + dst[1] * da) / out_a,
        (src[2] * sa + dst[2] * da) / out_a,
        out_a,
    ]
}
