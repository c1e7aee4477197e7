//! Paint layers and the flattened composite
//!
//! Each layer owns a fixed-size square canvas. The brush engine and the
//! projection baker are the only writers; both go through [`LayerStack`] so the
//! composite is marked dirty on every mutation and redrawn at most once per
//! refresh.

use image::RgbaImage;
use impasto_ipc::LayerId;
use tracing::{debug, info, warn};

#[cfg(feature = "bevy")]
use bevy::prelude::Resource;

use crate::stencil::BakeOutput;
use crate::surface::CpuSurface;
use crate::tiles::{TileUpload, TiledSurface};
use crate::types::{Rgba, TRANSPARENT};
use crate::validation::from_rgba8;

pub struct Layer {
    pub id: LayerId,
    pub name: String,
    pub visible: bool,
    pub opacity: f32,
    canvas: TiledSurface,
    /// Bumped whenever this layer's pixels change, for texture sync
    generation: u64,
}

impl Layer {
    fn new(id: LayerId, name: String, size: u32, tile_size: u32) -> Self {
        Self {
            id,
            name,
            visible: true,
            opacity: 1.0,
            canvas: TiledSurface::new(size, size, tile_size),
            generation: 0,
        }
    }

    pub fn canvas(&self) -> &TiledSurface {
        &self.canvas
    }

    /// Mutable canvas access for painting. Counts as a pixel change.
    pub fn canvas_mut(&mut self) -> &mut TiledSurface {
        self.generation += 1;
        &mut self.canvas
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Drain changed tiles for texture sync. Not a pixel change.
    pub fn take_tile_uploads(&mut self) -> Vec<TileUpload> {
        self.canvas.take_tile_uploads()
    }

    pub fn size(&self) -> u32 {
        self.canvas.surface().width
    }

    /// Replace every pixel with `color`
    pub fn fill(&mut self, color: Rgba) {
        self.canvas_mut().fill(color);
    }

    /// Draw `source` stretched over the whole canvas (nearest sampling, source-over)
    pub fn draw_image(&mut self, source: &RgbaImage) {
        let (sw, sh) = source.dimensions();
        if sw == 0 || sh == 0 {
            return;
        }
        let size = self.size();
        let canvas = self.canvas_mut();
        for y in 0..size {
            let sy = ((y as u64 * sh as u64) / size as u64) as u32;
            for x in 0..size {
                let sx = ((x as u64 * sw as u64) / size as u64) as u32;
                let texel = from_rgba8(source.get_pixel(sx, sy).0);
                if texel[3] > 0.0 {
                    canvas.surface_mut().blend_pixel(x, y, texel, 1.0);
                }
            }
        }
        canvas.mark_all_dirty();
    }

    /// Source-over a bottom-up render-target readback onto the canvas.
    ///
    /// Render-target row 0 is the bottom of the image while canvas row 0 is
    /// the top, so rows are flipped. Returns false if the sizes differ.
    pub fn composite_render_target(&mut self, output: &BakeOutput) -> bool {
        let size = self.size();
        if output.width != size || output.height != size {
            warn!(
                "Layer {}: bake output {}x{} does not match canvas {}",
                self.id, output.width, output.height, size
            );
            return false;
        }

        let canvas = self.canvas_mut();
        let mut touched: Option<(u32, u32, u32, u32)> = None;
        for row in 0..size {
            let y = size - 1 - row;
            for x in 0..size {
                let texel = output.pixel(x, row);
                if texel[3] == 0 {
                    continue;
                }
                canvas.surface_mut().blend_pixel(x, y, from_rgba8(texel), 1.0);
                touched = Some(match touched {
                    None => (x, y, x, y),
                    Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
                });
            }
        }
        if let Some((x0, y0, x1, y1)) = touched {
            canvas.mark_region_dirty(x0, y0, x1 - x0 + 1, y1 - y0 + 1);
        }
        true
    }
}

/// Ordered layers (index 0 at the bottom) and their flattened composite
#[cfg_attr(feature = "bevy", derive(Resource))]
pub struct LayerStack {
    layers: Vec<Layer>,
    next_id: LayerId,
    size: u32,
    tile_size: u32,
    composite: CpuSurface,
    dirty: bool,
    refresh_count: u64,
}

impl LayerStack {
    pub fn new(size: u32, tile_size: u32) -> Self {
        Self {
            layers: Vec::new(),
            next_id: 1,
            size,
            tile_size,
            composite: CpuSurface::new(size, size),
            dirty: true,
            refresh_count: 0,
        }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Add a transparent layer on top of the stack
    pub fn create(&mut self, name: impl Into<String>) -> LayerId {
        let id = self.next_id;
        self.next_id += 1;
        let layer = Layer::new(id, name.into(), self.size, self.tile_size);
        info!("LayerStack: created layer {} '{}'", id, layer.name);
        self.layers.push(layer);
        self.dirty = true;
        id
    }

    pub fn get(&self, id: LayerId) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id == id)
    }

    /// Mutable access marks the composite dirty
    pub fn get_mut(&mut self, id: LayerId) -> Option<&mut Layer> {
        let layer = self.layers.iter_mut().find(|l| l.id == id)?;
        self.dirty = true;
        Some(layer)
    }

    /// Changed tiles of one layer. Leaves the composite clean.
    pub fn take_tile_uploads(&mut self, id: LayerId) -> Option<Vec<TileUpload>> {
        self.layers
            .iter_mut()
            .find(|l| l.id == id)
            .map(Layer::take_tile_uploads)
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn top_id(&self) -> Option<LayerId> {
        self.layers.last().map(|l| l.id)
    }

    /// Remove a layer. The last remaining layer is never removed.
    pub fn remove(&mut self, id: LayerId) -> bool {
        if self.layers.len() <= 1 {
            debug!("LayerStack: refusing to remove the only layer {}", id);
            return false;
        }
        let Some(index) = self.layers.iter().position(|l| l.id == id) else {
            return false;
        };
        self.layers.remove(index);
        self.dirty = true;
        true
    }

    /// Move a layer to `index` (clamped to the stack)
    pub fn move_to(&mut self, id: LayerId, index: usize) -> bool {
        let Some(from) = self.layers.iter().position(|l| l.id == id) else {
            return false;
        };
        let layer = self.layers.remove(from);
        let index = index.min(self.layers.len());
        self.layers.insert(index, layer);
        self.dirty = true;
        true
    }

    pub fn set_visible(&mut self, id: LayerId, visible: bool) -> bool {
        self.get_mut(id).map(|l| l.visible = visible).is_some()
    }

    pub fn set_opacity(&mut self, id: LayerId, opacity: f32) -> bool {
        self.get_mut(id)
            .map(|l| l.opacity = opacity.clamp(0.0, 1.0))
            .is_some()
    }

    pub fn fill(&mut self, id: LayerId, color: Rgba) -> bool {
        self.get_mut(id).map(|l| l.fill(color)).is_some()
    }

    pub fn draw_image(&mut self, id: LayerId, source: &RgbaImage) -> bool {
        self.get_mut(id).map(|l| l.draw_image(source)).is_some()
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Number of times the composite has actually been redrawn
    pub fn refresh_count(&self) -> u64 {
        self.refresh_count
    }

    /// Redraw the composite if anything changed since the last refresh.
    ///
    /// Returns true when a redraw happened.
    pub fn refresh_composite(&mut self) -> bool {
        if !self.dirty {
            return false;
        }
        self.composite.fill(TRANSPARENT);
        for layer in self.layers.iter().filter(|l| l.visible) {
            self.composite.composite_over(layer.canvas.surface(), layer.opacity);
        }
        self.dirty = false;
        self.refresh_count += 1;
        debug!("LayerStack: composite refreshed ({} layers)", self.layers.len());
        true
    }

    pub fn composite(&self) -> &CpuSurface {
        &self.composite
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::parse_hex_color;
    use image::Rgba as Pixel;

    #[test]
    fn test_filled_layer_composite() {
        let mut stack = LayerStack::new(32, 16);
        let id = stack.create("Base");
        let grey = parse_hex_color("#666666").unwrap();
        assert!(stack.fill(id, grey));

        assert!(stack.refresh_composite());
        for (x, y) in [(0, 0), (31, 31), (7, 20)] {
            assert_eq!(stack.composite().get_pixel(x, y), Some(grey));
        }
    }

    #[test]
    fn test_refresh_only_when_dirty() {
        let mut stack = LayerStack::new(8, 8);
        let id = stack.create("A");
        assert!(stack.refresh_composite());
        assert!(!stack.refresh_composite());
        assert_eq!(stack.refresh_count(), 1);

        stack.set_opacity(id, 0.5);
        assert!(stack.is_dirty());
        assert!(stack.refresh_composite());
        assert_eq!(stack.refresh_count(), 2);
    }

    #[test]
    fn test_tile_uploads_leave_composite_clean() {
        let mut stack = LayerStack::new(64, 32);
        let id = stack.create("A");
        stack.refresh_composite();
        stack.get_mut(id).unwrap().canvas_mut().mark_region_dirty(40, 40, 2, 2);
        stack.refresh_composite();

        let uploads = stack.take_tile_uploads(id).unwrap();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].rect, (32, 32, 32, 32));
        assert!(!stack.is_dirty());
        assert!(stack.take_tile_uploads(id).unwrap().is_empty());
        assert!(stack.take_tile_uploads(99).is_none());
    }

    #[test]
    fn test_cannot_remove_last_layer() {
        let mut stack = LayerStack::new(8, 8);
        let a = stack.create("A");
        assert!(!stack.remove(a));
        let b = stack.create("B");
        assert!(stack.remove(a));
        assert_eq!(stack.len(), 1);
        assert!(!stack.remove(b));
        assert!(!stack.remove(999));
    }

    #[test]
    fn test_hidden_layers_skip_composite() {
        let mut stack = LayerStack::new(4, 4);
        let base = stack.create("Base");
        let top = stack.create("Top");
        stack.fill(base, [0.0, 0.0, 1.0, 1.0]);
        stack.fill(top, [1.0, 0.0, 0.0, 1.0]);
        stack.set_visible(top, false);
        stack.refresh_composite();
        assert_eq!(stack.composite().get_pixel(0, 0), Some([0.0, 0.0, 1.0, 1.0]));
    }

    #[test]
    fn test_move_to_reorders() {
        let mut stack = LayerStack::new(4, 4);
        let a = stack.create("A");
        let b = stack.create("B");
        assert_eq!(stack.top_id(), Some(b));
        assert!(stack.move_to(a, 5));
        assert_eq!(stack.top_id(), Some(a));
    }

    #[test]
    fn test_draw_image_scales_to_canvas() {
        let mut stack = LayerStack::new(8, 8);
        let id = stack.create("Img");
        let mut source = RgbaImage::new(2, 2);
        source.put_pixel(1, 1, Pixel([255, 0, 0, 255]));
        stack.draw_image(id, &source);

        let canvas = stack.get(id).unwrap().canvas().surface();
        assert_eq!(canvas.get_pixel(6, 6), Some([1.0, 0.0, 0.0, 1.0]));
        assert_eq!(canvas.get_pixel(1, 1).unwrap()[3], 0.0);
    }

    #[test]
    fn test_render_target_is_flipped() {
        let mut stack = LayerStack::new(4, 4);
        let id = stack.create("Bake");
        let mut output = BakeOutput::new(4, 4);
        // Bottom-left texel of the render target
        output.set_pixel(0, 0, [0, 255, 0, 255]);

        let layer = stack.get_mut(id).unwrap();
        assert!(layer.composite_render_target(&output));
        let canvas = layer.canvas().surface();
        assert_eq!(canvas.get_pixel(0, 3), Some([0.0, 1.0, 0.0, 1.0]));
        assert_eq!(canvas.get_pixel(0, 0).unwrap()[3], 0.0);
    }

    #[test]
    fn test_render_target_size_mismatch() {
        let mut stack = LayerStack::new(4, 4);
        let id = stack.create("Bake");
        let layer = stack.get_mut(id).unwrap();
        let before = layer.generation();
        assert!(!layer.composite_render_target(&BakeOutput::new(8, 8)));
        assert_eq!(layer.generation(), before);
    }
}
