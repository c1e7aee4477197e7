//! Projection bake: transfer the stencil image onto a mesh's UV texture.
//!
//! The mesh is rasterized in UV space. Every covered texel gets its world
//! position and normal interpolated, moved into stencil-local space, looked
//! up in the LUT and finally sampled from the stencil image. The same
//! per-fragment routine drives the live preview.

use glam::{Mat4, Vec2, Vec3};
use image::RgbaImage;
use tracing::{debug, warn};

use super::lut::Lut;
use crate::constants::STENCIL_ALPHA_THRESHOLD;
use crate::math::{Transform, normal_matrix};
use crate::raster::{OrthoFrame, rasterize_triangle};
use crate::raycast::MeshRaycastData;
use crate::types::Rgba;
use crate::validation::{from_rgba8, to_u8};

/// RGBA8 render-target readback. Row 0 is the bottom of the texture
/// (v = 0); flip before writing onto a top-down canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct BakeOutput {
    pub width: u32,
    pub height: u32,
    pixels: Vec<[u8; 4]>,
}

impl BakeOutput {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![[0; 4]; (width as usize) * (height as usize)],
        }
    }

    /// Texel at `(x, row)`; transparent when out of range
    pub fn pixel(&self, x: u32, row: u32) -> [u8; 4] {
        if x >= self.width || row >= self.height {
            return [0; 4];
        }
        self.pixels[(row * self.width + x) as usize]
    }

    pub fn set_pixel(&mut self, x: u32, row: u32, texel: [u8; 4]) {
        if x < self.width && row < self.height {
            self.pixels[(row * self.width + x) as usize] = texel;
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }

    /// Texels with any coverage
    pub fn covered_count(&self) -> usize {
        self.pixels.iter().filter(|p| p[3] > 0).count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectionParams {
    /// Multiplies the alpha of every projected texel
    pub opacity: f32,
    /// Drop fragments whose normal faces away from the stencil
    pub cull_backfaces: bool,
}

impl Default for ProjectionParams {
    fn default() -> Self {
        Self {
            opacity: 1.0,
            cull_backfaces: true,
        }
    }
}

/// Per-fragment projection shared by the bake and the preview.
pub struct ProjectionSampler<'a> {
    world_to_stencil: Mat4,
    forward: Vec3,
    lut: &'a Lut,
    image: &'a RgbaImage,
    params: ProjectionParams,
}

impl<'a> ProjectionSampler<'a> {
    /// Returns `None` if the stencil transform cannot be inverted or the
    /// image is empty.
    pub fn new(
        transform: &Transform,
        image: &'a RgbaImage,
        lut: &'a Lut,
        params: ProjectionParams,
    ) -> Option<Self> {
        if image.width() == 0 || image.height() == 0 {
            return None;
        }
        Some(Self {
            world_to_stencil: transform.inverse_matrix()?,
            forward: transform.forward(),
            lut,
            image,
            params,
        })
    }

    /// Color projected onto a surface point, `None` where nothing lands.
    pub fn shade(&self, world: Vec3, normal: Vec3) -> Option<Rgba> {
        if self.params.cull_backfaces && normal.dot(self.forward) <= 0.0 {
            return None;
        }
        let local = self.world_to_stencil.transform_point3(world);
        let uv = self.lut.stencil_uv(local.truncate())?;
        let texel = sample_image(self.image, uv);
        if texel[3] < STENCIL_ALPHA_THRESHOLD {
            return None;
        }
        let alpha = texel[3] * self.params.opacity.clamp(0.0, 1.0);
        Some([texel[0], texel[1], texel[2], alpha])
    }
}

/// Nearest sample of the stencil image. Stencil v runs bottom to top while
/// image rows run top to bottom.
fn sample_image(image: &RgbaImage, uv: Vec2) -> Rgba {
    let (w, h) = image.dimensions();
    let x = ((uv.x.clamp(0.0, 1.0) * w as f32) as u32).min(w - 1);
    let y = (((1.0 - uv.y.clamp(0.0, 1.0)) * h as f32) as u32).min(h - 1);
    from_rgba8(image.get_pixel(x, y).0)
}

/// Everything a bake reads. Missing stencil pieces make the bake a no-op.
pub struct BakeInputs<'a> {
    pub mesh: &'a MeshRaycastData,
    /// Object-to-world matrix of the painted mesh
    pub mesh_model: Mat4,
    pub stencil_transform: Option<&'a Transform>,
    pub stencil_image: Option<&'a RgbaImage>,
    pub lut: Option<&'a Lut>,
    /// Edge length of the square target texture
    pub size: u32,
    pub params: ProjectionParams,
}

/// Run the bake. Returns `None` without side effects when the stencil is
/// incomplete, the mesh has no UVs, or the geometry is degenerate.
pub fn bake(inputs: &BakeInputs<'_>) -> Option<BakeOutput> {
    let (Some(transform), Some(image), Some(lut)) =
        (inputs.stencil_transform, inputs.stencil_image, inputs.lut)
    else {
        debug!(
            "bake: skipped (transform: {}, image: {}, lut: {})",
            inputs.stencil_transform.is_some(),
            inputs.stencil_image.is_some(),
            inputs.lut.is_some()
        );
        return None;
    };

    let mesh = inputs.mesh;
    if mesh.uvs.is_empty() || !mesh.is_consistent() {
        warn!("bake: mesh has no usable UVs");
        return None;
    }
    let Some(sampler) = ProjectionSampler::new(transform, image, lut, inputs.params) else {
        warn!("bake: stencil transform is singular or image is empty");
        return None;
    };
    let Some(normals) = normal_matrix(inputs.mesh_model) else {
        warn!("bake: mesh transform is singular");
        return None;
    };
    let frame = OrthoFrame::unit(inputs.size, inputs.size)?;

    let mut output = BakeOutput::new(inputs.size, inputs.size);
    for tri in 0..mesh.triangle_count() {
        let idx = mesh.triangle_indices(tri);
        let world = idx.map(|i| inputs.mesh_model.transform_point3(mesh.positions[i]));
        let normal = idx.map(|i| normals * mesh.normals[i]);
        let texel_pos = idx.map(|i| frame.to_pixel(mesh.uvs[i]));

        rasterize_triangle(inputs.size, inputs.size, texel_pos, |frag| {
            let b = frag.bary;
            let p = world[0] * b.x + world[1] * b.y + world[2] * b.z;
            let n = (normal[0] * b.x + normal[1] * b.y + normal[2] * b.z).normalize_or_zero();
            if let Some(color) = sampler.shade(p, n) {
                output.set_pixel(frag.x, frag.y, color.map(to_u8));
            }
        });
    }

    debug!(
        "bake: {}x{} target, {} texels covered",
        inputs.size,
        inputs.size,
        output.covered_count()
    );
    Some(output)
}
