//! Gizmo hit testing against the logical handle shapes.

use glam::{Quat, Vec3};
use impasto_config::GizmoConfig;
use impasto_ipc::{GizmoAxis, GizmoMode, LinearAxis, PlanarAxis};
use painting::math::{Ray, intersect_plane, ray_segment_distance, ray_sphere};

/// Placement of the gizmo in the world for one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GizmoFrame {
    pub position: Vec3,
    pub rotation: Quat,
    /// Uniform on-screen size factor applied to every handle
    pub scale: f32,
}

impl GizmoFrame {
    pub fn new(position: Vec3, rotation: Option<Quat>, scale: f32) -> Self {
        Self {
            position,
            rotation: rotation.unwrap_or(Quat::IDENTITY),
            scale,
        }
    }

    /// World direction of a local axis
    #[inline]
    pub fn axis_dir(&self, axis: LinearAxis) -> Vec3 {
        self.rotation * Vec3::from(axis.unit())
    }

    /// Gizmo-local point to world space
    #[inline]
    pub fn to_world(&self, local: Vec3) -> Vec3 {
        self.position + self.rotation * (local * self.scale)
    }
}

/// Pick the handle under `ray`.
///
/// Checks run center, switch, lines, then planes (translate and scale) or
/// rings (rotate); the first check that hits wins, and among lines the
/// closest one does.
pub fn hit_test(
    ray: &Ray,
    frame: &GizmoFrame,
    mode: GizmoMode,
    show_switch: bool,
    config: &GizmoConfig,
) -> Option<GizmoAxis> {
    let s = frame.scale;

    if ray_sphere(ray, frame.position, config.center_radius * s).is_some() {
        return Some(GizmoAxis::Uniform);
    }

    if show_switch {
        let center = frame.to_world(Vec3::from(config.switch_offset));
        // Cube handle, tested as its bounding sphere
        if ray_sphere(ray, center, config.switch_size * s * 0.87).is_some() {
            return Some(GizmoAxis::Switch);
        }
    }

    match mode {
        GizmoMode::Translate | GizmoMode::Scale => {
            hit_lines(ray, frame, config).or_else(|| hit_planes(ray, frame, config))
        }
        GizmoMode::Rotate => hit_rings(ray, frame, config),
    }
}

fn hit_lines(ray: &Ray, frame: &GizmoFrame, config: &GizmoConfig) -> Option<GizmoAxis> {
    let threshold = config.line_pick_radius * frame.scale;
    let length = config.arrow_length * frame.scale;
    LinearAxis::ALL
        .into_iter()
        .filter_map(|axis| {
            let tip = frame.position + frame.axis_dir(axis) * length;
            let (distance, _) = ray_segment_distance(ray, frame.position, tip)?;
            (distance <= threshold).then_some((axis, distance))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(axis, _)| GizmoAxis::Linear(axis))
}

fn hit_planes(ray: &Ray, frame: &GizmoFrame, config: &GizmoConfig) -> Option<GizmoAxis> {
    let lo = config.plane_offset * frame.scale;
    let hi = (config.plane_offset + config.plane_size) * frame.scale;
    PlanarAxis::ALL.into_iter().find_map(|plane| {
        let normal = frame.axis_dir(plane.normal_axis());
        let hit = intersect_plane(ray, frame.position, normal)?;
        let (u_axis, v_axis) = plane.axes();
        let offset = hit.point - frame.position;
        let u = offset.dot(frame.axis_dir(u_axis));
        let v = offset.dot(frame.axis_dir(v_axis));
        (lo..=hi).contains(&u).then_some(())?;
        (lo..=hi).contains(&v).then_some(GizmoAxis::Planar(plane))
    })
}

fn hit_rings(ray: &Ray, frame: &GizmoFrame, config: &GizmoConfig) -> Option<GizmoAxis> {
    let inner = (config.ring_radius - config.ring_band) * frame.scale;
    let outer = (config.ring_radius + config.ring_band) * frame.scale;
    LinearAxis::ALL.into_iter().find_map(|axis| {
        let hit = intersect_plane(ray, frame.position, frame.axis_dir(axis))?;
        let r = (hit.point - frame.position).length();
        (inner..=outer).contains(&r).then_some(GizmoAxis::Linear(axis))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> GizmoConfig {
        GizmoConfig::default()
    }

    fn frame() -> GizmoFrame {
        GizmoFrame::new(Vec3::ZERO, None, 1.0)
    }

    fn down_at(x: f32, y: f32) -> Ray {
        // Looking down -Z from in front of the gizmo, slightly tilted so no
        // plane is viewed exactly edge-on
        Ray::new(Vec3::new(x, y, 5.0), Vec3::new(0.003, 0.005, -1.0)).unwrap()
    }

    fn pick(ray: &Ray, mode: GizmoMode) -> Option<GizmoAxis> {
        hit_test(ray, &frame(), mode, true, &config())
    }

    #[test]
    fn test_center_wins_over_everything() {
        assert_eq!(pick(&down_at(0.0, 0.0), GizmoMode::Translate), Some(GizmoAxis::Uniform));
        assert_eq!(pick(&down_at(0.0, 0.0), GizmoMode::Rotate), Some(GizmoAxis::Uniform));
    }

    #[test]
    fn test_linear_axes() {
        let hit = pick(&down_at(0.6, -0.05), GizmoMode::Translate);
        assert_eq!(hit, Some(GizmoAxis::Linear(LinearAxis::X)));
        let hit = pick(&down_at(-0.04, 0.7), GizmoMode::Scale);
        assert_eq!(hit, Some(GizmoAxis::Linear(LinearAxis::Y)));
    }

    #[test]
    fn test_plane_handle() {
        // Inside the XY quad, away from both arrows
        let hit = pick(&down_at(0.35, 0.35), GizmoMode::Translate);
        assert_eq!(hit, Some(GizmoAxis::Planar(PlanarAxis::XY)));
        assert_eq!(pick(&down_at(0.35, 0.35), GizmoMode::Rotate), None);
    }

    #[test]
    fn test_ring_band() {
        // On the Z ring (XY plane) at radius ~1
        let hit = pick(&down_at(-0.72, -0.72), GizmoMode::Rotate);
        assert_eq!(hit, Some(GizmoAxis::Linear(LinearAxis::Z)));
        assert_eq!(pick(&down_at(-0.4, -0.4), GizmoMode::Rotate), None);
    }

    #[test]
    fn test_switch_handle() {
        let hit = pick(&down_at(0.9, 0.9), GizmoMode::Translate);
        assert_eq!(hit, Some(GizmoAxis::Switch));
        let hidden = hit_test(&down_at(0.9, 0.9), &frame(), GizmoMode::Translate, false, &config());
        assert_ne!(hidden, Some(GizmoAxis::Switch));
    }

    #[test]
    fn test_miss() {
        assert_eq!(pick(&down_at(3.0, 3.0), GizmoMode::Translate), None);
    }

    #[test]
    fn test_scaled_and_rotated_frame() {
        let frame = GizmoFrame::new(
            Vec3::new(1.0, 0.0, 0.0),
            Some(Quat::from_rotation_z(std::f32::consts::FRAC_PI_2)),
            2.0,
        );
        // Local X now points along world +Y and reaches two units out
        let ray = Ray::new(Vec3::new(1.1, 1.5, 5.0), -Vec3::Z).unwrap();
        let hit = hit_test(&ray, &frame, GizmoMode::Translate, false, &config());
        assert_eq!(hit, Some(GizmoAxis::Linear(LinearAxis::X)));
    }
}
