//! Ray-mesh intersection against the paintable surface.
//!
//! Curve painting stores its samples in 3D and recovers their UVs by casting
//! back onto the mesh with the Moller-Trumbore test. The UV sphere generator
//! lives here too since it is the default paint target.

use std::f32::consts::{PI, TAU};

use glam::{Mat4, Vec2, Vec3};

use crate::constants::GEOMETRY_EPSILON as EPSILON;
use crate::math::{Ray, normal_matrix};

/// Closest hit of a ray against a mesh
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshHit {
    /// Distance along the ray
    pub t: f32,
    pub position: Vec3,
    /// Triangle index
    pub face: u32,
    /// Weights of the triangle's three vertices
    pub barycentric: Vec3,
    /// Interpolated unit normal
    pub normal: Vec3,
    /// Interpolated UV, if the mesh has UVs
    pub uv: Option<Vec2>,
}

/// Result of a ray-triangle intersection test
#[derive(Debug, Clone, Copy)]
pub struct TriangleHit {
    /// Distance along the ray to the intersection point
    pub t: f32,
    /// Barycentric coordinate u (weight for vertex 1)
    pub u: f32,
    /// Barycentric coordinate v (weight for vertex 2)
    pub v: f32,
}

/// Moller-Trumbore ray-triangle intersection algorithm.
///
/// Returns the hit distance and barycentric coordinates if the ray intersects
/// the triangle.
///
/// # Arguments
/// * `ray_origin` - Origin point of the ray
/// * `ray_dir` - Direction of the ray (should be normalized for consistent t values)
/// * `v0`, `v1`, `v2` - Triangle vertices in counter-clockwise order
///
/// # Returns
/// `Some(TriangleHit)` if ray intersects, `None` otherwise
pub fn ray_triangle_intersection(
    ray_origin: Vec3,
    ray_dir: Vec3,
    v0: Vec3,
    v1: Vec3,
    v2: Vec3,
) -> Option<TriangleHit> {
    // Edge vectors
    let edge1 = v1 - v0;
    let edge2 = v2 - v0;

    // Begin calculating determinant - also used to calculate u parameter
    let pvec = ray_dir.cross(edge2);
    let det = edge1.dot(pvec);

    // If determinant is near zero, ray lies in plane of triangle or misses
    if det.abs() < EPSILON {
        return None;
    }

    let inv_det = 1.0 / det;

    // Calculate distance from v0 to ray origin
    let tvec = ray_origin - v0;

    // Calculate u parameter and test bounds
    let u = tvec.dot(pvec) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    // Prepare to test v parameter
    let qvec = tvec.cross(edge1);

    // Calculate v parameter and test bounds
    let v = ray_dir.dot(qvec) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    // Calculate t - ray intersection distance
    let t = edge2.dot(qvec) * inv_det;

    // Only accept hits in front of the ray
    if t < EPSILON {
        return None;
    }

    Some(TriangleHit { t, u, v })
}

/// Interpolate a Vec3 attribute using barycentric coordinates.
pub fn interpolate_vec3(v0: Vec3, v1: Vec3, v2: Vec3, u: f32, v: f32) -> Vec3 {
    let w = 1.0 - u - v;
    v0 * w + v1 * u + v2 * v
}

/// Interpolate a Vec2 attribute (like UVs) using barycentric coordinates.
pub fn interpolate_vec2(v0: Vec2, v1: Vec2, v2: Vec2, u: f32, v: f32) -> Vec2 {
    let w = 1.0 - u - v;
    v0 * w + v1 * u + v2 * v
}

/// Triangle mesh geometry for raycasting and baking.
#[derive(Debug, Clone, Default)]
pub struct MeshRaycastData {
    /// Vertex positions
    pub positions: Vec<Vec3>,
    /// Triangle indices (3 per triangle, counter-clockwise from outside)
    pub indices: Vec<u32>,
    /// Vertex normals (same length as positions)
    pub normals: Vec<Vec3>,
    /// Vertex UVs (same length as positions, or empty if no UVs)
    pub uvs: Vec<Vec2>,
}

impl MeshRaycastData {
    /// UV sphere centered at the origin.
    ///
    /// U wraps once around Y starting at -X; V runs from 0 at the south pole
    /// to 1 at the north pole. The seam column is duplicated so UVs stay
    /// continuous inside every triangle.
    pub fn uv_sphere(radius: f32, width_segments: u32, height_segments: u32) -> Self {
        let width_segments = width_segments.max(3);
        let height_segments = height_segments.max(2);
        let cols = width_segments + 1;

        let vertex_count = (cols * (height_segments + 1)) as usize;
        let mut positions = Vec::with_capacity(vertex_count);
        let mut normals = Vec::with_capacity(vertex_count);
        let mut uvs = Vec::with_capacity(vertex_count);

        for iy in 0..=height_segments {
            let v = iy as f32 / height_segments as f32;
            let theta = v * PI;
            for ix in 0..=width_segments {
                let u = ix as f32 / width_segments as f32;
                let phi = u * TAU;
                let normal = Vec3::new(
                    -phi.cos() * theta.sin(),
                    theta.cos(),
                    phi.sin() * theta.sin(),
                );
                positions.push(normal * radius);
                normals.push(normal);
                uvs.push(Vec2::new(u, 1.0 - v));
            }
        }

        let mut indices = Vec::with_capacity((width_segments * height_segments * 6) as usize);
        for iy in 0..height_segments {
            for ix in 0..width_segments {
                let a = iy * cols + ix + 1;
                let b = iy * cols + ix;
                let c = (iy + 1) * cols + ix;
                let d = (iy + 1) * cols + ix + 1;
                // Pole rows collapse to a single triangle per quad
                if iy != 0 {
                    indices.extend_from_slice(&[a, b, d]);
                }
                if iy != height_segments - 1 {
                    indices.extend_from_slice(&[b, c, d]);
                }
            }
        }

        Self {
            positions,
            indices,
            normals,
            uvs,
        }
    }

    /// Copy of this mesh with `model` applied to positions and normals
    pub fn transformed(&self, model: Mat4) -> Self {
        let normal_mat = normal_matrix(model);
        Self {
            positions: self.positions.iter().map(|p| model.transform_point3(*p)).collect(),
            indices: self.indices.clone(),
            normals: self
                .normals
                .iter()
                .map(|n| normal_mat.map_or(*n, |m| (m * *n).normalize_or_zero()))
                .collect(),
            uvs: self.uvs.clone(),
        }
    }

    /// Get the number of triangles in the mesh
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Get the vertex indices for a triangle
    pub fn triangle_indices(&self, tri_index: usize) -> [usize; 3] {
        let base = tri_index * 3;
        [
            self.indices[base] as usize,
            self.indices[base + 1] as usize,
            self.indices[base + 2] as usize,
        ]
    }

    /// Get the vertex positions for a triangle
    pub fn triangle_positions(&self, tri_index: usize) -> [Vec3; 3] {
        let [i0, i1, i2] = self.triangle_indices(tri_index);
        [self.positions[i0], self.positions[i1], self.positions[i2]]
    }

    /// True when every index is in range and attribute lengths agree
    pub fn is_consistent(&self) -> bool {
        let n = self.positions.len();
        self.indices.len() % 3 == 0
            && self.normals.len() == n
            && (self.uvs.is_empty() || self.uvs.len() == n)
            && self.indices.iter().all(|&i| (i as usize) < n)
    }
}

/// Cast a ray against mesh data and return the closest hit.
///
/// # Arguments
/// * `ray` - Ray in the mesh's space
/// * `mesh_data` - Mesh geometry
///
/// # Returns
/// `Some(MeshHit)` with the closest intersection, `None` if no hit
pub fn raycast_mesh(ray: &Ray, mesh_data: &MeshRaycastData) -> Option<MeshHit> {
    let mut closest_hit: Option<(TriangleHit, usize)> = None;

    // Brute force over all triangles
    for tri_idx in 0..mesh_data.triangle_count() {
        let [v0, v1, v2] = mesh_data.triangle_positions(tri_idx);
        if let Some(hit) = ray_triangle_intersection(ray.origin, ray.direction, v0, v1, v2) {
            let closer = closest_hit.as_ref().is_none_or(|(prev, _)| hit.t < prev.t);
            if closer {
                closest_hit = Some((hit, tri_idx));
            }
        }
    }

    let (hit, face) = closest_hit?;
    let [i0, i1, i2] = mesh_data.triangle_indices(face);
    let normal = interpolate_vec3(
        mesh_data.normals[i0],
        mesh_data.normals[i1],
        mesh_data.normals[i2],
        hit.u,
        hit.v,
    )
    .normalize_or_zero();
    let uv = (!mesh_data.uvs.is_empty()).then(|| {
        interpolate_vec2(
            mesh_data.uvs[i0],
            mesh_data.uvs[i1],
            mesh_data.uvs[i2],
            hit.u,
            hit.v,
        )
    });

    Some(MeshHit {
        t: hit.t,
        position: ray.at(hit.t),
        face: face as u32,
        barycentric: Vec3::new(1.0 - hit.u - hit.v, hit.u, hit.v),
        normal,
        uv,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ray_triangle_hit() {
        // Triangle in XY plane at z=0
        let v0 = Vec3::new(0.0, 0.0, 0.0);
        let v1 = Vec3::new(1.0, 0.0, 0.0);
        let v2 = Vec3::new(0.0, 1.0, 0.0);

        // Ray pointing down at center of triangle
        let origin = Vec3::new(0.25, 0.25, 1.0);
        let dir = Vec3::new(0.0, 0.0, -1.0);

        let hit = ray_triangle_intersection(origin, dir, v0, v1, v2);
        assert!(hit.is_some());

        let hit = hit.unwrap();
        assert!((hit.t - 1.0).abs() < EPSILON);
        assert!((hit.u - 0.25).abs() < EPSILON);
        assert!((hit.v - 0.25).abs() < EPSILON);
    }

    #[test]
    fn test_ray_triangle_miss() {
        // Triangle in XY plane at z=0
        let v0 = Vec3::new(0.0, 0.0, 0.0);
        let v1 = Vec3::new(1.0, 0.0, 0.0);
        let v2 = Vec3::new(0.0, 1.0, 0.0);

        // Ray pointing down but missing triangle
        let origin = Vec3::new(2.0, 2.0, 1.0);
        let dir = Vec3::new(0.0, 0.0, -1.0);

        let hit = ray_triangle_intersection(origin, dir, v0, v1, v2);
        assert!(hit.is_none());
    }

    #[test]
    fn test_ray_triangle_behind() {
        // Triangle in XY plane at z=0
        let v0 = Vec3::new(0.0, 0.0, 0.0);
        let v1 = Vec3::new(1.0, 0.0, 0.0);
        let v2 = Vec3::new(0.0, 1.0, 0.0);

        // Ray pointing away from triangle
        let origin = Vec3::new(0.25, 0.25, 1.0);
        let dir = Vec3::new(0.0, 0.0, 1.0);

        let hit = ray_triangle_intersection(origin, dir, v0, v1, v2);
        assert!(hit.is_none());
    }

    #[test]
    fn test_interpolate_vec2() {
        let v0 = Vec2::new(0.0, 0.0);
        let v1 = Vec2::new(1.0, 0.0);
        let v2 = Vec2::new(0.0, 1.0);

        // At vertex 0 (u=0, v=0)
        let result = interpolate_vec2(v0, v1, v2, 0.0, 0.0);
        assert!((result - v0).length() < EPSILON);

        // At vertex 1 (u=1, v=0)
        let result = interpolate_vec2(v0, v1, v2, 1.0, 0.0);
        assert!((result - v1).length() < EPSILON);

        // At vertex 2 (u=0, v=1)
        let result = interpolate_vec2(v0, v1, v2, 0.0, 1.0);
        assert!((result - v2).length() < EPSILON);

        // At center (u=1/3, v=1/3)
        let center = (v0 + v1 + v2) / 3.0;
        let result = interpolate_vec2(v0, v1, v2, 1.0 / 3.0, 1.0 / 3.0);
        assert!((result - center).length() < EPSILON);
    }

    fn sphere() -> MeshRaycastData {
        MeshRaycastData::uv_sphere(1.0, 32, 16)
    }

    #[test]
    fn test_uv_sphere_shape() {
        let mesh = sphere();
        assert!(mesh.is_consistent());
        assert_eq!(mesh.positions.len(), 33 * 17);
        // Two triangles per quad, minus one per quad in each pole row
        assert_eq!(mesh.triangle_count(), 32 * 16 * 2 - 2 * 32);
        for p in &mesh.positions {
            assert!((p.length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_uv_sphere_winding_faces_outward() {
        let mesh = sphere();
        for tri in 0..mesh.triangle_count() {
            let [a, b, c] = mesh.triangle_positions(tri);
            let n = (b - a).cross(c - a);
            let centroid = (a + b + c) / 3.0;
            assert!(n.dot(centroid) > 0.0, "triangle {tri} faces inward");
        }
    }

    #[test]
    fn test_raycast_sphere_front() {
        let mesh = sphere();
        // Slightly off the vertex at +Z so exactly one triangle owns the hit
        let ray = Ray::new(Vec3::new(0.01, 0.013, 5.0), Vec3::NEG_Z).unwrap();
        let hit = raycast_mesh(&ray, &mesh).unwrap();
        assert!((hit.position.z - 1.0).abs() < 0.02);
        assert!(hit.normal.z > 0.99);
        // +Z sits a quarter turn from the -X seam, on the equator
        let uv = hit.uv.unwrap();
        assert!((uv.x - 0.25).abs() < 0.01, "{uv}");
        assert!((uv.y - 0.5).abs() < 0.01, "{uv}");
    }

    #[test]
    fn test_raycast_sphere_miss() {
        let mesh = sphere();
        let ray = Ray::new(Vec3::new(3.0, 0.0, 5.0), Vec3::NEG_Z).unwrap();
        assert!(raycast_mesh(&ray, &mesh).is_none());
    }

    #[test]
    fn test_transformed_mesh() {
        let mesh = sphere().transformed(Mat4::from_translation(Vec3::new(10.0, 0.0, 0.0)));
        let ray = Ray::new(Vec3::new(10.01, 0.013, 5.0), Vec3::NEG_Z).unwrap();
        let hit = raycast_mesh(&ray, &mesh).unwrap();
        assert!(hit.normal.z > 0.99);
    }
}
