//! Bezier curve drawn over the paint target
//!
//! Points are stored in groups of three as cubic segments
//! (anchor, control, control, anchor, ...). Every point is kept on a shell
//! slightly above the target sphere so the curve hugs the surface.

use glam::{Vec2, Vec3};
use tracing::debug;

use crate::math::Ray;
use crate::raycast::{MeshRaycastData, raycast_mesh};

#[derive(Debug, Clone, PartialEq)]
pub struct BezierCurve {
    points: Vec<Vec3>,
    center: Vec3,
    /// Sphere radius plus the surface offset
    shell_radius: f32,
}

impl BezierCurve {
    pub fn new(center: Vec3, surface_radius: f32, surface_offset: f32) -> Self {
        Self {
            points: Vec::new(),
            center,
            shell_radius: surface_radius + surface_offset,
        }
    }

    /// Push `p` radially onto the shell
    pub fn project(&self, p: Vec3) -> Vec3 {
        self.center + (p - self.center).normalize_or(Vec3::Y) * self.shell_radius
    }

    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn point(&self, index: usize) -> Option<Vec3> {
        self.points.get(index).copied()
    }

    /// Append a point, returning its index
    pub fn add_point(&mut self, p: Vec3) -> usize {
        let projected = self.project(p);
        self.points.push(projected);
        self.points.len() - 1
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    #[inline]
    pub fn is_anchor(index: usize) -> bool {
        index % 3 == 0
    }

    /// Move a point to `target` (re-projected onto the shell).
    ///
    /// Moving an anchor drags its neighbouring control points by the same
    /// delta; control points move alone.
    pub fn move_point(&mut self, index: usize, target: Vec3) -> bool {
        let Some(old) = self.point(index) else {
            return false;
        };
        let new = self.project(target);
        self.points[index] = new;

        if Self::is_anchor(index) {
            let delta = new - old;
            let neighbours = [index.checked_sub(1), Some(index + 1)];
            for i in neighbours.into_iter().flatten() {
                if let Some(p) = self.point(i) {
                    self.points[i] = self.project(p + delta);
                }
            }
        }
        true
    }

    /// Complete cubic segments
    pub fn segment_count(&self) -> usize {
        if self.points.len() < 4 {
            0
        } else {
            (self.points.len() - 1) / 3
        }
    }

    /// Point on segment `segment` at `t` in [0, 1]
    pub fn evaluate(&self, segment: usize, t: f32) -> Option<Vec3> {
        if segment >= self.segment_count() {
            return None;
        }
        let i = segment * 3;
        let [p0, p1, p2, p3] = [
            self.points[i],
            self.points[i + 1],
            self.points[i + 2],
            self.points[i + 3],
        ];
        let s = 1.0 - t;
        Some(p0 * (s * s * s) + p1 * (3.0 * s * s * t) + p2 * (3.0 * s * t * t) + p3 * (t * t * t))
    }

    /// Tessellate every segment with `samples_per_segment` steps.
    /// Shared anchors appear once.
    pub fn sample(&self, samples_per_segment: u32) -> Vec<Vec3> {
        let n = samples_per_segment.max(1);
        let segments = self.segment_count();
        let mut out = Vec::with_capacity(segments * n as usize + 1);
        for segment in 0..segments {
            let first = if segment == 0 { 0 } else { 1 };
            for k in first..=n {
                if let Some(p) = self.evaluate(segment, k as f32 / n as f32) {
                    out.push(p);
                }
            }
        }
        out
    }

    /// Surface UVs under the tessellated curve.
    ///
    /// Each sample is pushed `lift` further out along its radial direction
    /// and cast back toward the center onto `mesh`. Samples that miss are
    /// dropped.
    pub fn surface_uvs(&self, mesh: &MeshRaycastData, samples_per_segment: u32, lift: f32) -> Vec<Vec2> {
        let samples = self.sample(samples_per_segment);
        let uvs: Vec<Vec2> = samples
            .iter()
            .filter_map(|&p| {
                let outward = (p - self.center).try_normalize()?;
                let ray = Ray::new(p + outward * lift, -outward)?;
                raycast_mesh(&ray, mesh)?.uv
            })
            .collect();
        debug!(
            "BezierCurve::surface_uvs: {} of {} samples hit the mesh",
            uvs.len(),
            samples.len()
        );
        uvs
    }
}
