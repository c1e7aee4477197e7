//! Stencil pipeline: control grid -> grid mesh -> inverse-warp LUT.
//!
//! Every mutation marks the pipeline dirty and rebuilds synchronously, so
//! the LUT a caller sees always matches the grid's current state. The LUT
//! and the bounds it was rendered over are stored as one value.

mod bake;
mod grid;
mod lut;
mod mesh;

pub use bake::{BakeInputs, BakeOutput, ProjectionParams, ProjectionSampler, bake};
pub use grid::{CutAxis, GridError, StencilGrid};
pub use lut::{Lut, LutBounds, LutTexture, render_lut};
pub use mesh::{GridMesh, MeshUpdate};

use glam::Vec3;
#[cfg(feature = "bevy")]
use bevy::prelude::Resource;
use tracing::{debug, warn};

/// Result of [`StencilPipeline::rebuild`]
#[derive(Debug, Clone, PartialEq)]
pub enum RebuildOutcome {
    /// Nothing changed since the last rebuild
    Clean,
    Rebuilt { mesh: MeshUpdate },
    /// The grid failed validation; mesh and LUT were dropped
    Invalid(GridError),
}

/// Counters for tests and diagnostics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub topology_rebuilds: u64,
    pub position_updates: u64,
    pub lut_renders: u64,
}

#[cfg_attr(feature = "bevy", derive(Resource))]
#[derive(Debug, Clone)]
pub struct StencilPipeline {
    grid: StencilGrid,
    mesh: Option<GridMesh>,
    lut: Option<Lut>,
    dirty: bool,
    lut_size: u32,
    margin: f32,
    stats: PipelineStats,
}

impl StencilPipeline {
    /// Fresh 2x2 grid for an image of the given aspect ratio, built
    /// immediately.
    pub fn new(aspect: f32, lut_size: u32, margin: f32) -> Self {
        let mut pipeline = Self {
            grid: StencilGrid::new(aspect),
            mesh: None,
            lut: None,
            dirty: true,
            lut_size,
            margin,
            stats: PipelineStats::default(),
        };
        pipeline.rebuild();
        pipeline
    }

    pub fn grid(&self) -> &StencilGrid {
        &self.grid
    }

    pub fn mesh(&self) -> Option<&GridMesh> {
        self.mesh.as_ref()
    }

    /// Current LUT with its bounds. `None` while the grid is invalid.
    pub fn lut(&self) -> Option<&Lut> {
        self.lut.as_ref()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Start over with a 2x2 grid, e.g. after a new stencil image is loaded
    pub fn reset(&mut self, aspect: f32) {
        self.grid = StencilGrid::new(aspect);
        self.dirty = true;
        self.rebuild();
    }

    /// Replace the whole grid. An invalid grid is accepted and leaves the
    /// pipeline without a LUT until it is fixed.
    pub fn replace_grid(&mut self, grid: StencilGrid) -> RebuildOutcome {
        self.grid = grid;
        self.dirty = true;
        self.rebuild()
    }

    pub fn set_point(&mut self, row: usize, col: usize, p: Vec3) -> bool {
        if !self.grid.set_point(row, col, p) {
            return false;
        }
        self.dirty = true;
        self.rebuild();
        true
    }

    pub fn insert_row_loop(&mut self, v: f32) -> Option<usize> {
        let index = self.grid.insert_row_loop(v)?;
        self.dirty = true;
        self.rebuild();
        Some(index)
    }

    pub fn insert_col_loop(&mut self, u: f32) -> Option<usize> {
        let index = self.grid.insert_col_loop(u)?;
        self.dirty = true;
        self.rebuild();
        Some(index)
    }

    /// Regenerate mesh and LUT if anything changed.
    pub fn rebuild(&mut self) -> RebuildOutcome {
        if !self.dirty {
            return RebuildOutcome::Clean;
        }
        self.dirty = false;

        if let Err(err) = self.grid.validate() {
            warn!("StencilPipeline: skipping rebuild, {}", err);
            self.mesh = None;
            self.lut = None;
            return RebuildOutcome::Invalid(err);
        }

        let update = match self.mesh.as_mut() {
            Some(mesh) => mesh.sync(&self.grid),
            None => {
                self.mesh = Some(GridMesh::from_grid(&self.grid));
                MeshUpdate::Rebuilt
            }
        };
        match update {
            MeshUpdate::Rebuilt => self.stats.topology_rebuilds += 1,
            MeshUpdate::PositionsUpdated => self.stats.position_updates += 1,
        }

        let generation = self.stats.lut_renders + 1;
        self.lut = self
            .mesh
            .as_ref()
            .and_then(|mesh| render_lut(mesh, self.lut_size, self.margin, generation));
        if self.lut.is_some() {
            self.stats.lut_renders = generation;
        }
        debug!(
            "StencilPipeline: rebuilt {}x{} grid ({:?}), lut: {}",
            self.grid.rows(),
            self.grid.cols(),
            update,
            self.lut.is_some()
        );
        RebuildOutcome::Rebuilt { mesh: update }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    #[test]
    fn test_new_pipeline_has_lut() {
        let pipeline = StencilPipeline::new(1.0, 32, 0.05);
        assert!(!pipeline.is_dirty());
        assert!(pipeline.lut().is_some());
        assert_eq!(pipeline.stats().topology_rebuilds, 1);
    }

    #[test]
    fn test_point_move_updates_in_place() {
        let mut pipeline = StencilPipeline::new(1.0, 32, 0.0);
        let before = pipeline.lut().unwrap().bounds;
        assert!(pipeline.set_point(1, 1, Vec3::new(1.0, 1.0, 0.0)));
        let after = pipeline.lut().unwrap().bounds;

        assert_ne!(before, after);
        assert_eq!(after.min(), Vec2::new(-0.5, -0.5));
        assert_eq!(after.size(), Vec2::new(1.5, 1.5));
        let stats = pipeline.stats();
        assert_eq!(stats.topology_rebuilds, 1);
        assert_eq!(stats.position_updates, 1);
        assert_eq!(stats.lut_renders, 2);
        assert!(!pipeline.set_point(5, 5, Vec3::ZERO));
    }

    #[test]
    fn test_loop_insertion_rebuilds_topology() {
        let mut pipeline = StencilPipeline::new(1.0, 32, 0.05);
        assert_eq!(pipeline.insert_row_loop(0.5), Some(1));
        assert_eq!(pipeline.mesh().unwrap().dimensions(), (3, 2));
        assert_eq!(pipeline.stats().topology_rebuilds, 2);
        assert_eq!(pipeline.insert_row_loop(0.5), None);
        assert_eq!(pipeline.stats().topology_rebuilds, 2);
    }

    #[test]
    fn test_invalid_grid_drops_lut_and_bounds_together() {
        let mut pipeline = StencilPipeline::new(1.0, 32, 0.05);
        let broken = StencilGrid::from_parts(
            vec![vec![Vec3::ZERO; 2], vec![Vec3::ZERO; 3]],
            vec![0.0, 1.0],
            vec![0.0, 1.0],
        );
        assert!(matches!(
            pipeline.replace_grid(broken),
            RebuildOutcome::Invalid(GridError::ColCountMismatch { .. })
        ));
        assert!(pipeline.lut().is_none());
        assert!(pipeline.mesh().is_none());
        assert_eq!(pipeline.rebuild(), RebuildOutcome::Clean);

        assert!(matches!(
            pipeline.replace_grid(StencilGrid::new(2.0)),
            RebuildOutcome::Rebuilt { mesh: MeshUpdate::Rebuilt }
        ));
        let lut = pipeline.lut().unwrap();
        assert!((lut.bounds.width - 2.2).abs() < 1e-5);
    }

    fn assert_lut_tracks_grid(pipeline: &StencilPipeline, margin: f32, step: &str) {
        let (lo, hi) = pipeline.grid().bounds().unwrap();
        let pad = (hi - lo).max_element() * margin;
        let lut = pipeline.lut().unwrap();
        let min = lut.bounds.min();
        let size = lut.bounds.size();
        assert!((min - (lo - Vec2::splat(pad))).abs().max_element() < 1e-5, "{step}: min {min}");
        assert!(
            (size - (hi - lo + Vec2::splat(2.0 * pad))).abs().max_element() < 1e-5,
            "{step}: size {size}"
        );
    }

    #[test]
    fn test_lut_bounds_follow_every_mutation() {
        let margin = 0.05;
        let mut pipeline = StencilPipeline::new(1.5, 32, margin);
        assert_lut_tracks_grid(&pipeline, margin, "initial");

        for i in 0..12 {
            let k = i as f32;
            match i % 4 {
                0 => assert!(pipeline.insert_row_loop(0.1 + 0.07 * k).is_some()),
                1 => assert!(pipeline.insert_col_loop(0.9 - 0.07 * k).is_some()),
                _ => {
                    let row = i % pipeline.grid().rows();
                    let col = (i * 3) % pipeline.grid().cols();
                    let p = Vec3::new(0.3 * k - 1.5, 1.0 - 0.2 * k, 0.05 * k);
                    assert!(pipeline.set_point(row, col, p));
                }
            }
            assert!(!pipeline.is_dirty());
            assert_lut_tracks_grid(&pipeline, margin, &format!("step {i}"));
        }
        assert_eq!(pipeline.stats().lut_renders, 13);
    }

    #[test]
    fn test_lut_generation_advances() {
        let mut pipeline = StencilPipeline::new(1.0, 16, 0.05);
        let first = pipeline.lut().unwrap().generation;
        pipeline.insert_col_loop(0.3).unwrap();
        assert!(pipeline.lut().unwrap().generation > first);
    }
}
