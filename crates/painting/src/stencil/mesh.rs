//! Triangle mesh generated from a [`StencilGrid`].

use glam::{Vec2, Vec3};

use super::grid::StencilGrid;

/// What [`GridMesh::sync`] had to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshUpdate {
    /// Point count changed; buffers and index list were regenerated
    Rebuilt,
    /// Same topology; positions were rewritten in place
    PositionsUpdated,
}

/// Grid mesh buffers. Vertex `r * cols + c` is grid point `(r, c)` and
/// carries UV `(col_cuts[c], row_cuts[r])`.
#[derive(Debug, Clone, Default)]
pub struct GridMesh {
    positions: Vec<Vec3>,
    uvs: Vec<Vec2>,
    indices: Vec<u32>,
    rows: usize,
    cols: usize,
}

impl GridMesh {
    /// Build from a grid that has already passed validation.
    pub fn from_grid(grid: &StencilGrid) -> Self {
        let mut mesh = Self::default();
        mesh.sync(grid);
        mesh
    }

    /// Bring the buffers in line with `grid`.
    pub fn sync(&mut self, grid: &StencilGrid) -> MeshUpdate {
        if grid.rows() != self.rows || grid.cols() != self.cols || self.positions.is_empty() {
            self.rebuild(grid);
            return MeshUpdate::Rebuilt;
        }
        for (dst, src) in self.positions.iter_mut().zip(grid.points().iter().flatten()) {
            *dst = *src;
        }
        MeshUpdate::PositionsUpdated
    }

    fn rebuild(&mut self, grid: &StencilGrid) {
        let (rows, cols) = (grid.rows(), grid.cols());
        self.rows = rows;
        self.cols = cols;
        self.positions = grid.points().iter().flatten().copied().collect();
        self.uvs = grid
            .row_cuts()
            .iter()
            .flat_map(|&v| grid.col_cuts().iter().map(move |&u| Vec2::new(u, v)))
            .collect();

        self.indices.clear();
        self.indices
            .reserve(rows.saturating_sub(1) * cols.saturating_sub(1) * 6);
        for r in 0..rows.saturating_sub(1) {
            for c in 0..cols.saturating_sub(1) {
                let a = (r * cols + c) as u32;
                let b = a + 1;
                let d = ((r + 1) * cols + c) as u32;
                let cc = d + 1;
                self.indices.extend_from_slice(&[a, b, cc, a, cc, d]);
            }
        }
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn uvs(&self) -> &[Vec2] {
        &self.uvs
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Positions and UVs of one triangle
    pub fn triangle(&self, index: usize) -> Option<([Vec3; 3], [Vec2; 3])> {
        let tri = self.indices.get(index * 3..index * 3 + 3)?;
        let (a, b, c) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
        Some((
            [self.positions[a], self.positions[b], self.positions[c]],
            [self.uvs[a], self.uvs[b], self.uvs[c]],
        ))
    }
}
