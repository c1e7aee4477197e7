//! Draining dirty tiles into texture uploads

use tracing::debug;

use super::{PixelRect, TileCoord, TiledSurface};
use crate::validation::to_u8;

/// RGBA8 pixels of one changed tile, rows top to bottom
#[derive(Debug, Clone, PartialEq)]
pub struct TileUpload {
    pub coord: TileCoord,
    pub rect: PixelRect,
    pub rgba8: Vec<u8>,
}

impl TileUpload {
    /// Bytes per row, for texture copy descriptors
    pub fn row_pitch(&self) -> u32 {
        self.rect.2 * 4
    }
}

impl TiledSurface {
    /// Copy every dirty tile out as RGBA8 and clear the dirty flags.
    pub fn take_tile_uploads(&mut self) -> Vec<TileUpload> {
        let coords = self.drain_dirty();
        let uploads: Vec<TileUpload> = coords
            .into_iter()
            .map(|coord| {
                let rect = self.tile_rect(coord);
                let (x0, y0, w, h) = rect;
                let mut rgba8 = Vec::with_capacity((w * h * 4) as usize);
                for y in y0..y0 + h {
                    let row = &self.surface.pixels()[(y * self.surface.width + x0) as usize..][..w as usize];
                    for px in row {
                        rgba8.extend(px.iter().map(|&c| to_u8(c)));
                    }
                }
                TileUpload { coord, rect, rgba8 }
            })
            .collect();
        if !uploads.is_empty() {
            debug!("take_tile_uploads: {} tile(s)", uploads.len());
        }
        uploads
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_uploads_every_tile() {
        let mut canvas = TiledSurface::new(300, 300, 128);
        canvas.fill([1.0, 0.0, 0.0, 1.0]);

        let uploads = canvas.take_tile_uploads();
        assert_eq!(uploads.len(), 9);
        assert_eq!(uploads[0].coord, TileCoord { x: 0, y: 0 });
        let edge = &uploads[8];
        assert_eq!(edge.rect, (256, 256, 44, 44));
        assert_eq!(edge.rgba8.len(), 44 * 44 * 4);
        assert_eq!(edge.row_pitch(), 176);
        assert_eq!(&edge.rgba8[..4], &[255, 0, 0, 255]);

        assert!(canvas.take_tile_uploads().is_empty());
    }

    #[test]
    fn test_upload_rows_follow_canvas_rows() {
        let mut canvas = TiledSurface::new(4, 4, 4);
        canvas.surface_mut().set_pixel(1, 2, [0.0, 0.0, 1.0, 1.0]);
        canvas.mark_region_dirty(1, 2, 1, 1);

        let upload = canvas.take_tile_uploads().remove(0);
        let offset = (2 * 4 + 1) * 4;
        assert_eq!(&upload.rgba8[offset..offset + 4], &[0, 0, 255, 255]);
        assert_eq!(&upload.rgba8[..4], &[0, 0, 0, 0]);
    }
}
