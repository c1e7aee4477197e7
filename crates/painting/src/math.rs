//! Ray, plane and transform utilities.
//!
//! Vectors, quaternions and matrices come from glam. This module adds the
//! handful of ray queries the gizmo, stencil pipeline and curve painter share.
//! Every query returns `None` when its governing denominator is near zero so
//! callers can skip the frame instead of propagating NaN.

use glam::{Mat3, Mat4, Quat, Vec2, Vec3};
use impasto_ipc::PointerRay;
use serde::{Deserialize, Serialize};

use crate::constants::GEOMETRY_EPSILON;

/// A world-space ray with a unit direction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    /// Build a ray, normalizing the direction.
    ///
    /// Returns `None` for a zero or non-finite direction.
    pub fn new(origin: Vec3, direction: Vec3) -> Option<Self> {
        let direction = direction.try_normalize()?;
        origin.is_finite().then_some(Self { origin, direction })
    }

    pub fn from_pointer(pointer: &PointerRay) -> Option<Self> {
        Self::new(Vec3::from_array(pointer.origin), Vec3::from_array(pointer.direction))
    }

    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// Translation, rotation and non-uniform scale of a manipulated object
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    /// `translate * rotate * scale`
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }

    /// Inverse world matrix, or `None` when any scale component collapses
    pub fn inverse_matrix(&self) -> Option<Mat4> {
        invert(self.matrix())
    }

    /// Local +Z in world space
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::Z
    }

    /// Local axis `index` (0 = X, 1 = Y, 2 = Z) in world space, unscaled
    pub fn axis(&self, index: usize) -> Vec3 {
        self.rotation * Mat3::IDENTITY.col(index)
    }

    pub fn is_finite(&self) -> bool {
        self.translation.is_finite() && self.rotation.is_finite() && self.scale.is_finite()
    }
}

/// Invert a matrix, refusing singular or non-finite input
pub fn invert(matrix: Mat4) -> Option<Mat4> {
    let det = matrix.determinant();
    if !det.is_finite() || det.abs() < GEOMETRY_EPSILON {
        return None;
    }
    let inverse = matrix.inverse();
    inverse.is_finite().then_some(inverse)
}

/// Normal matrix (inverse transpose of the upper 3x3)
pub fn normal_matrix(model: Mat4) -> Option<Mat3> {
    let upper = Mat3::from_mat4(model);
    let det = upper.determinant();
    if !det.is_finite() || det.abs() < GEOMETRY_EPSILON {
        return None;
    }
    Some(upper.inverse().transpose())
}

/// Ray/plane intersection in front of the ray origin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneHit {
    pub t: f32,
    pub point: Vec3,
}

/// Intersect a ray with the plane through `point` with `normal`.
///
/// Grazing rays (|n·d| near zero) and hits behind the origin return `None`.
pub fn intersect_plane(ray: &Ray, point: Vec3, normal: Vec3) -> Option<PlaneHit> {
    let denom = normal.dot(ray.direction);
    if denom.abs() < GEOMETRY_EPSILON {
        return None;
    }
    let t = normal.dot(point - ray.origin) / denom;
    if t < 0.0 || !t.is_finite() {
        return None;
    }
    Some(PlaneHit { t, point: ray.at(t) })
}

/// Ray/sphere intersection.
/// Returns the distance to the closest intersection in front of the origin.
pub fn ray_sphere(ray: &Ray, center: Vec3, radius: f32) -> Option<f32> {
    let oc = ray.origin - center;
    // direction is unit length, so a == 1
    let b = oc.dot(ray.direction);
    let c = oc.dot(oc) - radius * radius;
    let discriminant = b * b - c;
    if discriminant < 0.0 {
        return None;
    }

    let sqrt_d = discriminant.sqrt();
    let t1 = -b - sqrt_d;
    let t2 = -b + sqrt_d;
    if t1 > GEOMETRY_EPSILON {
        Some(t1)
    } else if t2 > GEOMETRY_EPSILON {
        Some(t2)
    } else {
        None
    }
}

/// Closest approach between a ray and an infinite line
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineClosest {
    /// Parameter along the ray (may be negative)
    pub ray_t: f32,
    /// Parameter along the line, in units of `line_dir`
    pub line_t: f32,
    pub distance: f32,
}

/// Closest points between `ray` and the line `line_origin + t * line_dir`.
///
/// Returns `None` when the two are parallel.
pub fn closest_to_line(ray: &Ray, line_origin: Vec3, line_dir: Vec3) -> Option<LineClosest> {
    let d1 = ray.direction;
    let d2 = line_dir;
    let w = ray.origin - line_origin;

    let a = d1.dot(d1);
    let b = d1.dot(d2);
    let c = d2.dot(d2);
    let d = d1.dot(w);
    let e = d2.dot(w);

    let denom = a * c - b * b;
    if denom.abs() < GEOMETRY_EPSILON * (a * c).max(GEOMETRY_EPSILON) {
        return None;
    }

    let ray_t = (b * e - c * d) / denom;
    let line_t = (a * e - b * d) / denom;
    let distance = (ray.at(ray_t) - (line_origin + d2 * line_t)).length();
    Some(LineClosest {
        ray_t,
        line_t,
        distance,
    })
}

/// Distance between a ray and the segment `a..b`, with the ray parameter of
/// the closest point.
///
/// Both parameters are clamped (ray to t >= 0, segment to its ends).
/// Returns `None` when the ray runs parallel to the segment.
pub fn ray_segment_distance(ray: &Ray, a: Vec3, b: Vec3) -> Option<(f32, f32)> {
    let seg = b - a;
    let seg_len_sq = seg.length_squared();
    if seg_len_sq < GEOMETRY_EPSILON {
        return None;
    }

    let closest = closest_to_line(ray, a, seg)?;
    let line_t = closest.line_t.clamp(0.0, 1.0);
    let on_segment = a + seg * line_t;
    let ray_t = (on_segment - ray.origin).dot(ray.direction).max(0.0);
    let distance = (ray.at(ray_t) - on_segment).length();
    Some((distance, ray_t))
}

/// Two unit vectors perpendicular to `n` and to each other
pub fn orthonormal_basis(n: Vec3) -> (Vec3, Vec3) {
    let n = n.normalize_or(Vec3::Z);
    let arbitrary = if n.x.abs() < 0.9 { Vec3::X } else { Vec3::Y };
    let tangent = n.cross(arbitrary).normalize();
    let bitangent = n.cross(tangent).normalize();
    (tangent, bitangent)
}

/// Angle of `offset` inside the plane spanned by `u` and `v`, in (-PI, PI]
#[inline]
pub fn plane_angle(offset: Vec3, u: Vec3, v: Vec3) -> f32 {
    offset.dot(v).atan2(offset.dot(u))
}

/// Wrap an angle difference into (-PI, PI]
pub fn wrap_angle(angle: f32) -> f32 {
    use std::f32::consts::{PI, TAU};
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI { wrapped + TAU } else { wrapped }
}

/// Edge function for 2D rasterization: twice the signed area of (a, b, p)
#[inline]
pub fn edge(a: Vec2, b: Vec2, p: Vec2) -> f32 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, PI};

    const EPS: f32 = 1e-4;

    fn ray(origin: Vec3, dir: Vec3) -> Ray {
        Ray::new(origin, dir).unwrap()
    }

    #[test]
    fn test_ray_rejects_zero_direction() {
        assert!(Ray::new(Vec3::ZERO, Vec3::ZERO).is_none());
        assert!(Ray::new(Vec3::ZERO, Vec3::new(f32::NAN, 0.0, 0.0)).is_none());
    }

    #[test]
    fn test_transform_inverse_roundtrip() {
        let t = Transform {
            translation: Vec3::new(1.0, 2.0, 3.0),
            rotation: Quat::from_rotation_y(0.7),
            scale: Vec3::new(2.0, 1.0, 0.5),
        };
        let p = Vec3::new(0.3, -0.4, 0.9);
        let world = t.matrix().transform_point3(p);
        let back = t.inverse_matrix().unwrap().transform_point3(world);
        assert!((back - p).length() < EPS);
    }

    #[test]
    fn test_singular_transform_has_no_inverse() {
        let t = Transform {
            scale: Vec3::new(1.0, 0.0, 1.0),
            ..Transform::IDENTITY
        };
        assert!(t.inverse_matrix().is_none());
    }

    #[test]
    fn test_plane_hit() {
        let r = ray(Vec3::new(0.0, 0.0, 5.0), Vec3::NEG_Z);
        let hit = intersect_plane(&r, Vec3::ZERO, Vec3::Z).unwrap();
        assert!((hit.t - 5.0).abs() < EPS);
        assert!(hit.point.length() < EPS);
    }

    #[test]
    fn test_plane_grazing_and_behind() {
        let grazing = ray(Vec3::new(0.0, 0.0, 1.0), Vec3::X);
        assert!(intersect_plane(&grazing, Vec3::ZERO, Vec3::Z).is_none());

        let away = ray(Vec3::new(0.0, 0.0, 1.0), Vec3::Z);
        assert!(intersect_plane(&away, Vec3::ZERO, Vec3::Z).is_none());
    }

    #[test]
    fn test_ray_sphere() {
        let r = ray(Vec3::new(0.0, 0.0, 5.0), Vec3::NEG_Z);
        assert!((ray_sphere(&r, Vec3::ZERO, 1.0).unwrap() - 4.0).abs() < EPS);

        let miss = ray(Vec3::new(0.0, 5.0, 5.0), Vec3::NEG_Z);
        assert!(ray_sphere(&miss, Vec3::ZERO, 1.0).is_none());

        // From inside, the far side is hit
        let inside = ray(Vec3::ZERO, Vec3::X);
        assert!((ray_sphere(&inside, Vec3::ZERO, 1.0).unwrap() - 1.0).abs() < EPS);
    }

    #[test]
    fn test_closest_to_line() {
        // Ray along -Z at x = 2, line is the Y axis
        let r = ray(Vec3::new(2.0, 3.0, 5.0), Vec3::NEG_Z);
        let c = closest_to_line(&r, Vec3::ZERO, Vec3::Y).unwrap();
        assert!((c.line_t - 3.0).abs() < EPS);
        assert!((c.ray_t - 5.0).abs() < EPS);
        assert!((c.distance - 2.0).abs() < EPS);
    }

    #[test]
    fn test_closest_to_parallel_line() {
        let r = ray(Vec3::new(1.0, 0.0, 0.0), Vec3::Y);
        assert!(closest_to_line(&r, Vec3::ZERO, Vec3::Y).is_none());
    }

    #[test]
    fn test_segment_distance_clamps_to_end() {
        let r = ray(Vec3::new(0.0, 3.0, 5.0), Vec3::NEG_Z);
        let (dist, _) = ray_segment_distance(&r, Vec3::ZERO, Vec3::Y).unwrap();
        // Nearest segment point is the end at y = 1
        assert!((dist - 2.0).abs() < EPS);
    }

    #[test]
    fn test_orthonormal_basis() {
        for n in [Vec3::X, Vec3::Y, Vec3::Z, Vec3::new(1.0, 1.0, 1.0).normalize()] {
            let (u, v) = orthonormal_basis(n);
            assert!(u.dot(n).abs() < EPS);
            assert!(v.dot(n).abs() < EPS);
            assert!(u.dot(v).abs() < EPS);
            assert!((u.length() - 1.0).abs() < EPS);
        }
    }

    #[test]
    fn test_plane_angle() {
        assert!((plane_angle(Vec3::Y, Vec3::X, Vec3::Y) - FRAC_PI_2).abs() < EPS);
        assert!(plane_angle(Vec3::X, Vec3::X, Vec3::Y).abs() < EPS);
    }

    #[test]
    fn test_wrap_angle() {
        assert!((wrap_angle(3.0 * PI / 2.0) + FRAC_PI_2).abs() < EPS);
        assert!((wrap_angle(-3.0 * PI / 2.0) - FRAC_PI_2).abs() < EPS);
        assert!((wrap_angle(0.25) - 0.25).abs() < EPS);
        assert!((wrap_angle(-PI) - PI).abs() < EPS);
    }

    #[test]
    fn test_edge_sign() {
        let a = Vec2::ZERO;
        let b = Vec2::X;
        assert!(edge(a, b, Vec2::Y) > 0.0);
        assert!(edge(a, b, -Vec2::Y) < 0.0);
    }
}
