//! Static gizmo geometry.
//!
//! Seven unit-sized shapes are authored once in a canonical frame (stems,
//! cones and rings around +Y, quads on XY) and packed back to back into a
//! single vertex buffer. Every part is placed at draw time by composing one
//! of the constant orientation matrices below with a per-part scale and
//! offset.

use std::f32::consts::{PI, TAU};

use glam::{Mat4, Vec3};
use impasto_ipc::{LinearAxis, PlanarAxis};

use super::backend::{DrawRange, GizmoVertex};

const ROUND_SEGMENTS: u32 = 12;
const SPHERE_STACKS: u32 = 8;
const RING_SEGMENTS: u32 = 48;
const RING_SIDES: u32 = 6;
/// Tube radius of the unit ring
pub const RING_TUBE: f32 = 0.03;

/// Rotates +Y onto +X
const Y_TO_X: Mat4 = Mat4::from_cols_array(&[
    0.0, -1.0, 0.0, 0.0, //
    1.0, 0.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
]);

/// Rotates +Y onto +Z (and the XY plane onto XZ)
const Y_TO_Z: Mat4 = Mat4::from_cols_array(&[
    1.0, 0.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, -1.0, 0.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
]);

/// Rotates +X onto +Z, taking the XY plane onto YZ
const X_TO_Z: Mat4 = Mat4::from_cols_array(&[
    0.0, 0.0, 1.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    -1.0, 0.0, 0.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
]);

/// Orientation taking canonical +Y parts onto `axis`
pub fn axis_orientation(axis: LinearAxis) -> &'static Mat4 {
    match axis {
        LinearAxis::X => &Y_TO_X,
        LinearAxis::Y => &Mat4::IDENTITY,
        LinearAxis::Z => &Y_TO_Z,
    }
}

/// Orientation taking the canonical XY quad onto `plane`
pub fn plane_orientation(plane: PlanarAxis) -> &'static Mat4 {
    match plane {
        PlanarAxis::XY => &Mat4::IDENTITY,
        PlanarAxis::XZ => &Y_TO_Z,
        PlanarAxis::YZ => &X_TO_Z,
    }
}

/// Where each shape lives in the static buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShapeRanges {
    /// Radius 1, from y = 0 to y = 1
    pub cylinder: DrawRange,
    /// Base radius 1 at y = 0, apex at y = 1
    pub cone: DrawRange,
    /// Unit square from (0, 0) to (1, 1) on XY
    pub quad: DrawRange,
    /// Line list around the same square
    pub quad_outline: DrawRange,
    /// Radius 1
    pub sphere: DrawRange,
    /// Major radius 1 in the XZ plane
    pub ring: DrawRange,
    /// Side 1, centered
    pub cube: DrawRange,
}

/// Build the packed vertex list and the range of every shape.
pub fn build_geometry() -> (Vec<GizmoVertex>, ShapeRanges) {
    let mut vertices = Vec::with_capacity(4096);
    let mut ranges = ShapeRanges::default();

    ranges.cylinder = push_shape(&mut vertices, cylinder);
    ranges.cone = push_shape(&mut vertices, cone);
    ranges.quad = push_shape(&mut vertices, quad);
    ranges.quad_outline = push_shape(&mut vertices, quad_outline);
    ranges.sphere = push_shape(&mut vertices, sphere);
    ranges.ring = push_shape(&mut vertices, ring);
    ranges.cube = push_shape(&mut vertices, cube);

    (vertices, ranges)
}

fn push_shape(vertices: &mut Vec<GizmoVertex>, build: fn(&mut Vec<GizmoVertex>)) -> DrawRange {
    let first = vertices.len() as u32;
    build(vertices);
    DrawRange {
        first,
        count: vertices.len() as u32 - first,
    }
}

fn push_tri(out: &mut Vec<GizmoVertex>, a: Vec3, b: Vec3, c: Vec3) {
    out.extend([a, b, c].map(|p| GizmoVertex::new(p.x, p.y, p.z)));
}

fn push_quad(out: &mut Vec<GizmoVertex>, a: Vec3, b: Vec3, c: Vec3, d: Vec3) {
    push_tri(out, a, b, c);
    push_tri(out, a, c, d);
}

fn circle_point(i: u32, segments: u32) -> (f32, f32) {
    let angle = i as f32 / segments as f32 * TAU;
    (angle.cos(), angle.sin())
}

fn cylinder(out: &mut Vec<GizmoVertex>) {
    for i in 0..ROUND_SEGMENTS {
        let (c0, s0) = circle_point(i, ROUND_SEGMENTS);
        let (c1, s1) = circle_point(i + 1, ROUND_SEGMENTS);
        push_quad(
            out,
            Vec3::new(c0, 0.0, s0),
            Vec3::new(c0, 1.0, s0),
            Vec3::new(c1, 1.0, s1),
            Vec3::new(c1, 0.0, s1),
        );
    }
}

fn cone(out: &mut Vec<GizmoVertex>) {
    let apex = Vec3::Y;
    for i in 0..ROUND_SEGMENTS {
        let (c0, s0) = circle_point(i, ROUND_SEGMENTS);
        let (c1, s1) = circle_point(i + 1, ROUND_SEGMENTS);
        let p0 = Vec3::new(c0, 0.0, s0);
        let p1 = Vec3::new(c1, 0.0, s1);
        push_tri(out, p0, apex, p1);
        push_tri(out, Vec3::ZERO, p0, p1);
    }
}

fn quad(out: &mut Vec<GizmoVertex>) {
    push_quad(out, Vec3::ZERO, Vec3::X, Vec3::new(1.0, 1.0, 0.0), Vec3::Y);
}

fn quad_outline(out: &mut Vec<GizmoVertex>) {
    let corners = [Vec3::ZERO, Vec3::X, Vec3::new(1.0, 1.0, 0.0), Vec3::Y];
    for i in 0..4 {
        let (a, b) = (corners[i], corners[(i + 1) % 4]);
        out.push(GizmoVertex::new(a.x, a.y, a.z));
        out.push(GizmoVertex::new(b.x, b.y, b.z));
    }
}

fn sphere(out: &mut Vec<GizmoVertex>) {
    let point = |stack: u32, slice: u32| {
        let theta = stack as f32 / SPHERE_STACKS as f32 * PI;
        let (c, s) = circle_point(slice, ROUND_SEGMENTS);
        Vec3::new(c * theta.sin(), theta.cos(), s * theta.sin())
    };
    for stack in 0..SPHERE_STACKS {
        for slice in 0..ROUND_SEGMENTS {
            push_quad(
                out,
                point(stack, slice),
                point(stack, slice + 1),
                point(stack + 1, slice + 1),
                point(stack + 1, slice),
            );
        }
    }
}

fn ring(out: &mut Vec<GizmoVertex>) {
    let point = |seg: u32, side: u32| {
        let (cm, sm) = circle_point(seg, RING_SEGMENTS);
        let (ct, st) = circle_point(side, RING_SIDES);
        let radial = Vec3::new(cm, 0.0, sm);
        radial * (1.0 + RING_TUBE * ct) + Vec3::Y * (RING_TUBE * st)
    };
    for seg in 0..RING_SEGMENTS {
        for side in 0..RING_SIDES {
            push_quad(
                out,
                point(seg, side),
                point(seg + 1, side),
                point(seg + 1, side + 1),
                point(seg, side + 1),
            );
        }
    }
}

fn cube(out: &mut Vec<GizmoVertex>) {
    let h = 0.5;
    let c = |x: f32, y: f32, z: f32| Vec3::new(x * h, y * h, z * h);
    // +X, -X, +Y, -Y, +Z, -Z
    push_quad(out, c(1., -1., -1.), c(1., 1., -1.), c(1., 1., 1.), c(1., -1., 1.));
    push_quad(out, c(-1., -1., 1.), c(-1., 1., 1.), c(-1., 1., -1.), c(-1., -1., -1.));
    push_quad(out, c(-1., 1., -1.), c(-1., 1., 1.), c(1., 1., 1.), c(1., 1., -1.));
    push_quad(out, c(-1., -1., 1.), c(-1., -1., -1.), c(1., -1., -1.), c(1., -1., 1.));
    push_quad(out, c(-1., -1., 1.), c(1., -1., 1.), c(1., 1., 1.), c(-1., 1., 1.));
    push_quad(out, c(1., -1., -1.), c(-1., -1., -1.), c(-1., 1., -1.), c(1., 1., -1.));
}
