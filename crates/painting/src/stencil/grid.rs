//! Deformable control-point grid behind a stencil.
//!
//! Points live in the stencil's local space. Row 0 is the bottom edge
//! (v = 0) and column 0 the left edge (u = 0), so cut values are the UV
//! coordinates each grid line carries.

use glam::{Vec2, Vec3};
use thiserror::Error;
use tracing::debug;

use crate::constants::GEOMETRY_EPSILON;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GridError {
    #[error("Grid needs at least 2x2 points, got {rows}x{cols}")]
    TooSmall { rows: usize, cols: usize },
    #[error("Grid has {points} point rows but {cuts} row cuts")]
    RowCountMismatch { points: usize, cuts: usize },
    #[error("Grid row {row} has {points} points but there are {cuts} column cuts")]
    ColCountMismatch { row: usize, points: usize, cuts: usize },
    #[error("{axis} cuts are not strictly increasing in [0, 1] at index {index}")]
    BadCuts { axis: CutAxis, index: usize },
    #[error("Grid point ({row}, {col}) is not finite")]
    NonFinitePoint { row: usize, col: usize },
}

/// Which set of cuts a loop belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CutAxis {
    /// Horizontal grid lines, indexed by v
    Row,
    /// Vertical grid lines, indexed by u
    Col,
}

impl std::fmt::Display for CutAxis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CutAxis::Row => f.write_str("row"),
            CutAxis::Col => f.write_str("column"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StencilGrid {
    points: Vec<Vec<Vec3>>,
    row_cuts: Vec<f32>,
    col_cuts: Vec<f32>,
}

impl StencilGrid {
    /// A 2x2 grid spanning a rectangle `aspect` wide and 1 tall, centered on
    /// the origin in the local XY plane.
    pub fn new(aspect: f32) -> Self {
        let aspect = if aspect.is_finite() && aspect > GEOMETRY_EPSILON { aspect } else { 1.0 };
        let hw = aspect * 0.5;
        Self {
            points: vec![
                vec![Vec3::new(-hw, -0.5, 0.0), Vec3::new(hw, -0.5, 0.0)],
                vec![Vec3::new(-hw, 0.5, 0.0), Vec3::new(hw, 0.5, 0.0)],
            ],
            row_cuts: vec![0.0, 1.0],
            col_cuts: vec![0.0, 1.0],
        }
    }

    /// Assemble a grid without checking it. Use [`StencilGrid::validate`]
    /// before relying on its shape.
    pub fn from_parts(points: Vec<Vec<Vec3>>, row_cuts: Vec<f32>, col_cuts: Vec<f32>) -> Self {
        Self {
            points,
            row_cuts,
            col_cuts,
        }
    }

    pub fn rows(&self) -> usize {
        self.row_cuts.len()
    }

    pub fn cols(&self) -> usize {
        self.col_cuts.len()
    }

    pub fn row_cuts(&self) -> &[f32] {
        &self.row_cuts
    }

    pub fn col_cuts(&self) -> &[f32] {
        &self.col_cuts
    }

    pub fn points(&self) -> &[Vec<Vec3>] {
        &self.points
    }

    pub fn point(&self, row: usize, col: usize) -> Option<Vec3> {
        self.points.get(row)?.get(col).copied()
    }

    pub fn set_point(&mut self, row: usize, col: usize, p: Vec3) -> bool {
        match self.points.get_mut(row).and_then(|r| r.get_mut(col)) {
            Some(slot) => {
                *slot = p;
                true
            }
            None => false,
        }
    }

    /// Check the shape and cut invariants.
    pub fn validate(&self) -> Result<(), GridError> {
        let (rows, cols) = (self.row_cuts.len(), self.col_cuts.len());
        if rows < 2 || cols < 2 {
            return Err(GridError::TooSmall { rows, cols });
        }
        if self.points.len() != rows {
            return Err(GridError::RowCountMismatch {
                points: self.points.len(),
                cuts: rows,
            });
        }
        for (row, points) in self.points.iter().enumerate() {
            if points.len() != cols {
                return Err(GridError::ColCountMismatch {
                    row,
                    points: points.len(),
                    cuts: cols,
                });
            }
            if let Some(col) = points.iter().position(|p| !p.is_finite()) {
                return Err(GridError::NonFinitePoint { row, col });
            }
        }
        check_cuts(&self.row_cuts, CutAxis::Row)?;
        check_cuts(&self.col_cuts, CutAxis::Col)
    }

    /// Insert a row of points at normalized `v`.
    ///
    /// Returns the new row index, or `None` if `v` is outside (0, 1), matches
    /// an existing cut, or the grid is currently invalid.
    pub fn insert_row_loop(&mut self, v: f32) -> Option<usize> {
        self.validate().ok()?;
        let (index, t) = insertion_point(&self.row_cuts, v)?;
        let row: Vec<Vec3> = self.points[index - 1]
            .iter()
            .zip(&self.points[index])
            .map(|(a, b)| a.lerp(*b, t))
            .collect();
        self.points.insert(index, row);
        self.row_cuts.insert(index, v);
        debug!("StencilGrid: row loop at v={:.3} (index {}, t={:.3})", v, index, t);
        Some(index)
    }

    /// Insert a column of points at normalized `u`.
    ///
    /// Returns the new column index; see [`StencilGrid::insert_row_loop`].
    pub fn insert_col_loop(&mut self, u: f32) -> Option<usize> {
        self.validate().ok()?;
        let (index, t) = insertion_point(&self.col_cuts, u)?;
        for row in &mut self.points {
            let p = row[index - 1].lerp(row[index], t);
            row.insert(index, p);
        }
        self.col_cuts.insert(index, u);
        debug!("StencilGrid: column loop at u={:.3} (index {}, t={:.3})", u, index, t);
        Some(index)
    }

    /// Axis-aligned XY bounds of all points
    pub fn bounds(&self) -> Option<(Vec2, Vec2)> {
        xy_bounds(self.points.iter().flatten().copied())
    }
}

/// Min and max of the XY components, `None` for an empty iterator
pub(crate) fn xy_bounds(points: impl Iterator<Item = Vec3>) -> Option<(Vec2, Vec2)> {
    points.fold(None, |acc, p| {
        let p = p.truncate();
        Some(match acc {
            None => (p, p),
            Some((lo, hi)) => (lo.min(p), hi.max(p)),
        })
    })
}

fn check_cuts(cuts: &[f32], axis: CutAxis) -> Result<(), GridError> {
    for (index, &c) in cuts.iter().enumerate() {
        let increasing = index == 0 || c > cuts[index - 1];
        if !(0.0..=1.0).contains(&c) || !increasing {
            return Err(GridError::BadCuts { axis, index });
        }
    }
    Ok(())
}

/// Where a new cut at `value` goes and how far it sits between its
/// neighbours. The fraction falls back to 0.5 when the neighbours coincide.
fn insertion_point(cuts: &[f32], value: f32) -> Option<(usize, f32)> {
    if !(value > 0.0 && value < 1.0) {
        return None;
    }
    let index = cuts.iter().position(|&c| c >= value)?;
    if index == 0 || (cuts[index] - value).abs() <= GEOMETRY_EPSILON {
        return None;
    }
    let (prev, next) = (cuts[index - 1], cuts[index]);
    let span = next - prev;
    let t = if span.abs() <= GEOMETRY_EPSILON {
        0.5
    } else {
        ((value - prev) / span).clamp(0.0, 1.0)
    };
    Some((index, t))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_invariants(grid: &StencilGrid) {
        grid.validate().unwrap();
        assert_eq!(grid.points().len(), grid.row_cuts().len());
        for row in grid.points() {
            assert_eq!(row.len(), grid.col_cuts().len());
        }
    }

    #[test]
    fn test_new_grid_matches_aspect() {
        let grid = StencilGrid::new(2.0);
        assert_invariants(&grid);
        let (lo, hi) = grid.bounds().unwrap();
        assert_eq!(lo, Vec2::new(-1.0, -0.5));
        assert_eq!(hi, Vec2::new(1.0, 0.5));
    }

    #[test]
    fn test_row_loop_at_midpoint() {
        let mut grid = StencilGrid::new(1.0);
        let original = grid.points().to_vec();

        assert_eq!(grid.insert_row_loop(0.5), Some(1));
        assert_eq!(grid.row_cuts(), &[0.0, 0.5, 1.0]);
        for col in 0..2 {
            let mid = (original[0][col] + original[1][col]) * 0.5;
            assert!((grid.point(1, col).unwrap() - mid).length() < 1e-6);
        }
        assert_invariants(&grid);
    }

    #[test]
    fn test_col_loop_interpolates_warped_grid() {
        let mut grid = StencilGrid::new(1.0);
        grid.set_point(1, 1, Vec3::new(1.5, 1.0, 0.2));
        assert_eq!(grid.insert_col_loop(0.25), Some(1));
        assert_eq!(grid.col_cuts(), &[0.0, 0.25, 1.0]);
        let expected = Vec3::new(-0.5, 0.5, 0.0).lerp(Vec3::new(1.5, 1.0, 0.2), 0.25);
        assert!((grid.point(1, 1).unwrap() - expected).length() < 1e-6);
        assert_invariants(&grid);
    }

    #[test]
    fn test_loop_at_existing_cut_is_ignored() {
        let mut grid = StencilGrid::new(1.0);
        grid.insert_row_loop(0.5).unwrap();
        assert_eq!(grid.insert_row_loop(0.5), None);
        assert_eq!(grid.insert_row_loop(0.0), None);
        assert_eq!(grid.insert_row_loop(1.0), None);
        assert_eq!(grid.row_cuts(), &[0.0, 0.5, 1.0]);
        assert_invariants(&grid);
    }

    #[test]
    fn test_loop_rejects_out_of_range() {
        let mut grid = StencilGrid::new(1.0);
        assert_eq!(grid.insert_col_loop(-0.1), None);
        assert_eq!(grid.insert_col_loop(1.5), None);
        assert_eq!(grid.insert_col_loop(f32::NAN), None);
    }

    #[test]
    fn test_many_loops_keep_cuts_sorted() {
        let mut grid = StencilGrid::new(1.5);
        for v in [0.9, 0.1, 0.5, 0.3, 0.7, 0.2] {
            grid.insert_row_loop(v).unwrap();
            grid.insert_col_loop(1.0 - v).unwrap();
            assert_invariants(&grid);
        }
        assert_eq!(grid.rows(), 8);
        assert_eq!(grid.cols(), 8);
    }

    #[test]
    fn test_insertion_point_fraction() {
        let (index, t) = insertion_point(&[0.0, 0.4, 0.4, 1.0], 0.3).unwrap();
        assert_eq!(index, 1);
        assert!((t - 0.75).abs() < 1e-5);
        assert_eq!(insertion_point(&[0.0, 0.4, 1.0], 0.4), None);
    }

    #[test]
    fn test_validate_reports_mismatch() {
        let grid = StencilGrid::from_parts(
            vec![vec![Vec3::ZERO; 2], vec![Vec3::ZERO; 3]],
            vec![0.0, 1.0],
            vec![0.0, 1.0],
        );
        assert_eq!(
            grid.validate(),
            Err(GridError::ColCountMismatch { row: 1, points: 3, cuts: 2 })
        );

        let mut grid = grid;
        assert_eq!(grid.insert_row_loop(0.5), None);
    }

    #[test]
    fn test_validate_rejects_unsorted_cuts() {
        let grid = StencilGrid::from_parts(
            vec![vec![Vec3::ZERO; 2]; 3],
            vec![0.0, 0.7, 0.3],
            vec![0.0, 1.0],
        );
        assert!(matches!(
            grid.validate(),
            Err(GridError::BadCuts { axis: CutAxis::Row, index: 2 })
        ));
    }
}
