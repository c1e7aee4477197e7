//! Drag math: turning pointer rays into translate, rotate and scale deltas.
//!
//! A [`DragPlan`] is captured on pointer-down and holds the primitive the
//! drag is measured against. Later rays are intersected with that same
//! primitive; nothing is re-hit-tested mid drag.

use glam::{Quat, Vec3};
use impasto_ipc::{GizmoAxis, GizmoMode};
use painting::constants::GEOMETRY_EPSILON;
use painting::math::{
    Ray, Transform, closest_to_line, intersect_plane, orthonormal_basis, plane_angle, wrap_angle,
};

use super::hover::GizmoFrame;

/// Scale components never shrink below this
pub const MIN_SCALE: f32 = 1e-3;

/// Reference captured at drag start
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragPlan {
    /// Slide along a line through the gizmo center
    TranslateAxis { origin: Vec3, dir: Vec3, start_t: f32 },
    /// Slide inside a plane through the gizmo center
    TranslatePlane { origin: Vec3, normal: Vec3, start: Vec3 },
    /// Spin around `axis`; `angle` is the reference from the previous frame
    Rotate {
        center: Vec3,
        axis: Vec3,
        u: Vec3,
        v: Vec3,
        angle: f32,
    },
    /// Stretch one component by the distance moved along its axis
    ScaleAxis {
        origin: Vec3,
        dir: Vec3,
        component: usize,
        start_t: f32,
        unit: f32,
    },
    /// Stretch the masked components by the ratio of distances from center
    ScaleRatio {
        center: Vec3,
        normal: Vec3,
        mask: [bool; 3],
        start_distance: f32,
    },
}

/// What a pointer-move did to the target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragStep {
    Applied,
    /// Degenerate geometry this frame; target untouched
    Skipped,
    /// No drag in progress
    Idle,
}

/// Capture the reference for dragging `axis` in `mode`.
///
/// Returns `None` if the ray misses the primitive or the reference would be
/// degenerate; the caller then stays idle.
pub fn begin_drag(
    axis: GizmoAxis,
    mode: GizmoMode,
    ray: &Ray,
    frame: &GizmoFrame,
) -> Option<DragPlan> {
    let center = frame.position;
    let view_normal = -ray.direction;

    match (mode, axis) {
        (_, GizmoAxis::Switch) => None,
        (GizmoMode::Translate, GizmoAxis::Linear(a)) => {
            let dir = frame.axis_dir(a);
            let closest = closest_to_line(ray, center, dir)?;
            Some(DragPlan::TranslateAxis {
                origin: center,
                dir,
                start_t: closest.line_t,
            })
        }
        (GizmoMode::Translate, GizmoAxis::Planar(p)) => {
            let normal = frame.axis_dir(p.normal_axis());
            let hit = intersect_plane(ray, center, normal)?;
            Some(DragPlan::TranslatePlane {
                origin: center,
                normal,
                start: hit.point,
            })
        }
        (GizmoMode::Translate, GizmoAxis::Uniform) => {
            let hit = intersect_plane(ray, center, view_normal)?;
            Some(DragPlan::TranslatePlane {
                origin: center,
                normal: view_normal,
                start: hit.point,
            })
        }
        (GizmoMode::Rotate, GizmoAxis::Linear(a)) => rotate_plan(ray, center, frame.axis_dir(a)),
        (GizmoMode::Rotate, GizmoAxis::Uniform) => rotate_plan(ray, center, view_normal),
        (GizmoMode::Rotate, GizmoAxis::Planar(_)) => None,
        (GizmoMode::Scale, GizmoAxis::Linear(a)) => {
            let dir = frame.axis_dir(a);
            let closest = closest_to_line(ray, center, dir)?;
            Some(DragPlan::ScaleAxis {
                origin: center,
                dir,
                component: a.index(),
                start_t: closest.line_t,
                unit: frame.scale.max(GEOMETRY_EPSILON),
            })
        }
        (GizmoMode::Scale, GizmoAxis::Planar(p)) => {
            let normal = frame.axis_dir(p.normal_axis());
            scale_ratio_plan(ray, center, normal, axis.scale_mask())
        }
        (GizmoMode::Scale, GizmoAxis::Uniform) => {
            scale_ratio_plan(ray, center, view_normal, axis.scale_mask())
        }
    }
}

fn rotate_plan(ray: &Ray, center: Vec3, axis: Vec3) -> Option<DragPlan> {
    let hit = intersect_plane(ray, center, axis)?;
    let offset = hit.point - center;
    if offset.length_squared() < GEOMETRY_EPSILON {
        return None;
    }
    let (u, v) = orthonormal_basis(axis);
    Some(DragPlan::Rotate {
        center,
        axis,
        u,
        v,
        angle: plane_angle(offset, u, v),
    })
}

fn scale_ratio_plan(ray: &Ray, center: Vec3, normal: Vec3, mask: [bool; 3]) -> Option<DragPlan> {
    let hit = intersect_plane(ray, center, normal)?;
    let start_distance = (hit.point - center).length();
    if start_distance < GEOMETRY_EPSILON {
        return None;
    }
    Some(DragPlan::ScaleRatio {
        center,
        normal,
        mask,
        start_distance,
    })
}

/// Apply one pointer-move to `target`.
///
/// Translation and scale are recomputed from `snapshot` (the state at drag
/// start); rotation accumulates onto the current rotation.
pub fn update_drag(
    plan: &mut DragPlan,
    ray: &Ray,
    snapshot: &Transform,
    target: &mut Transform,
) -> DragStep {
    let mut next = *target;
    match plan {
        DragPlan::TranslateAxis { origin, dir, start_t } => {
            let Some(closest) = closest_to_line(ray, *origin, *dir) else {
                return DragStep::Skipped;
            };
            next.translation = snapshot.translation + *dir * (closest.line_t - *start_t);
        }
        DragPlan::TranslatePlane { origin, normal, start } => {
            let Some(hit) = intersect_plane(ray, *origin, *normal) else {
                return DragStep::Skipped;
            };
            next.translation = snapshot.translation + (hit.point - *start);
        }
        DragPlan::Rotate { center, axis, u, v, angle } => {
            let Some(hit) = intersect_plane(ray, *center, *axis) else {
                return DragStep::Skipped;
            };
            let offset = hit.point - *center;
            if offset.length_squared() < GEOMETRY_EPSILON {
                return DragStep::Skipped;
            }
            let current = plane_angle(offset, *u, *v);
            let delta = wrap_angle(current - *angle);
            if !delta.is_finite() {
                return DragStep::Skipped;
            }
            *angle = current;
            next.rotation = (Quat::from_axis_angle(*axis, delta) * target.rotation).normalize();
        }
        DragPlan::ScaleAxis { origin, dir, component, start_t, unit } => {
            let Some(closest) = closest_to_line(ray, *origin, *dir) else {
                return DragStep::Skipped;
            };
            let multiplier = 1.0 + (closest.line_t - *start_t) / *unit;
            next.scale = snapshot.scale;
            next.scale[*component] = (snapshot.scale[*component] * multiplier).max(MIN_SCALE);
        }
        DragPlan::ScaleRatio { center, normal, mask, start_distance } => {
            let Some(hit) = intersect_plane(ray, *center, *normal) else {
                return DragStep::Skipped;
            };
            let ratio = (hit.point - *center).length() / *start_distance;
            next.scale = snapshot.scale;
            for (i, _) in mask.iter().enumerate().filter(|(_, on)| **on) {
                next.scale[i] = (snapshot.scale[i] * ratio).max(MIN_SCALE);
            }
        }
    }

    if !next.is_finite() {
        return DragStep::Skipped;
    }
    *target = next;
    DragStep::Applied
}
