//! Layer canvases split into tiles for incremental texture upload
//!
//! Writers (stamps, fills, bakes) report the pixel rectangle they touched;
//! the covering tiles are flagged and later drained as [`TileUpload`]s so a
//! host only re-uploads what changed.

mod stamping;
mod upload;

pub use stamping::{PixelRect, TipView, calculate_hardness_falloff};
pub use upload::TileUpload;

use crate::surface::CpuSurface;
use crate::types::Rgba;

/// Column/row of a tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileCoord {
    pub x: u32,
    pub y: u32,
}

pub struct TiledSurface {
    pub(crate) surface: CpuSurface,
    tile_size: u32,
    tiles_x: u32,
    tiles_y: u32,
    /// One flag per tile, row-major
    dirty: Vec<bool>,
    dirty_count: usize,
}

impl TiledSurface {
    pub fn new(width: u32, height: u32, tile_size: u32) -> Self {
        let tile_size = tile_size.max(1);
        let tiles_x = width.div_ceil(tile_size);
        let tiles_y = height.div_ceil(tile_size);
        Self {
            surface: CpuSurface::new(width, height),
            tile_size,
            tiles_x,
            tiles_y,
            dirty: vec![false; (tiles_x * tiles_y) as usize],
            dirty_count: 0,
        }
    }

    #[inline]
    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    /// Tile columns and rows
    #[inline]
    pub fn tile_grid(&self) -> (u32, u32) {
        (self.tiles_x, self.tiles_y)
    }

    #[inline]
    pub fn surface(&self) -> &CpuSurface {
        &self.surface
    }

    /// Direct pixel access. Callers mark what they touch.
    #[inline]
    pub fn surface_mut(&mut self) -> &mut CpuSurface {
        &mut self.surface
    }

    pub fn fill(&mut self, color: Rgba) {
        self.surface.fill(color);
        self.mark_all_dirty();
    }

    fn flag(&mut self, tx: u32, ty: u32) {
        let slot = &mut self.dirty[(ty * self.tiles_x + tx) as usize];
        if !*slot {
            *slot = true;
            self.dirty_count += 1;
        }
    }

    /// Flag every tile overlapping the rectangle (clamped to the canvas)
    pub fn mark_region_dirty(&mut self, x: u32, y: u32, w: u32, h: u32) {
        let (width, height) = (self.surface.width, self.surface.height);
        if w == 0 || h == 0 || x >= width || y >= height {
            return;
        }
        let x_last = x.saturating_add(w).min(width) - 1;
        let y_last = y.saturating_add(h).min(height) - 1;
        for ty in y / self.tile_size..=y_last / self.tile_size {
            for tx in x / self.tile_size..=x_last / self.tile_size {
                self.flag(tx, ty);
            }
        }
    }

    /// After a fill or a whole-canvas copy
    pub fn mark_all_dirty(&mut self) {
        self.dirty.fill(true);
        self.dirty_count = self.dirty.len();
    }

    pub fn is_tile_dirty(&self, coord: TileCoord) -> bool {
        coord.x < self.tiles_x
            && coord.y < self.tiles_y
            && self.dirty[(coord.y * self.tiles_x + coord.x) as usize]
    }

    #[inline]
    pub fn has_dirty_tiles(&self) -> bool {
        self.dirty_count > 0
    }

    #[inline]
    pub fn dirty_tile_count(&self) -> usize {
        self.dirty_count
    }

    /// Pixel rectangle of a tile; edge tiles are clipped to the canvas
    pub fn tile_rect(&self, coord: TileCoord) -> PixelRect {
        let x = coord.x * self.tile_size;
        let y = coord.y * self.tile_size;
        (
            x,
            y,
            self.tile_size.min(self.surface.width.saturating_sub(x)),
            self.tile_size.min(self.surface.height.saturating_sub(y)),
        )
    }

    /// Clear every flag, returning the tiles that were dirty in row order
    pub(crate) fn drain_dirty(&mut self) -> Vec<TileCoord> {
        let mut coords = Vec::with_capacity(self.dirty_count);
        for (i, flag) in self.dirty.iter_mut().enumerate() {
            if std::mem::take(flag) {
                let i = i as u32;
                coords.push(TileCoord {
                    x: i % self.tiles_x,
                    y: i / self.tiles_x,
                });
            }
        }
        self.dirty_count = 0;
        coords
    }
}
