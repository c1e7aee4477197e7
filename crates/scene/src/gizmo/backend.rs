//! Graphics seam for the gizmo renderer.
//!
//! The renderer never talks to a GPU API directly. Hosts implement
//! [`GraphicsContext`] over wgpu, WebGL or anything else that can draw
//! colored triangles and lines with a matrix.

use bytemuck::{Pod, Zeroable};
use glam::Mat4;

/// WGSL program the context is asked to compile: one MVP uniform, one flat
/// color, position-only vertices.
pub const GIZMO_SHADER: &str = r#"
struct Uniforms {
    mvp: mat4x4<f32>,
    color: vec4<f32>,
};

@group(0) @binding(0) var<uniform> uniforms: Uniforms;

@vertex
fn vs_main(@location(0) position: vec3<f32>) -> @builtin(position) vec4<f32> {
    return uniforms.mvp * vec4<f32>(position, 1.0);
}

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return uniforms.color;
}
"#;

/// Position-only vertex in the static gizmo buffer
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GizmoVertex {
    pub position: [f32; 3],
}

impl GizmoVertex {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { position: [x, y, z] }
    }
}

/// Features the renderer cannot work without
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    VertexBuffers,
    AlphaBlending,
    LinePrimitives,
}

impl Capability {
    pub const REQUIRED: [Capability; 3] = [
        Capability::VertexBuffers,
        Capability::AlphaBlending,
        Capability::LinePrimitives,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramHandle(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferHandle(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology {
    TriangleList,
    LineList,
}

/// Contiguous vertex run inside the static buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DrawRange {
    pub first: u32,
    pub count: u32,
}

impl DrawRange {
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// The slice of fixed-function state the gizmo pass changes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineState {
    pub depth_test: bool,
    pub blend: bool,
}

impl Default for PipelineState {
    fn default() -> Self {
        Self {
            depth_test: true,
            blend: false,
        }
    }
}

/// One draw of a vertex range
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawCall {
    pub program: ProgramHandle,
    pub buffer: BufferHandle,
    pub topology: Topology,
    pub range: DrawRange,
    pub mvp: Mat4,
    pub color: [f32; 4],
}

pub trait GraphicsContext {
    fn supports(&self, capability: Capability) -> bool;

    fn compile_program(&mut self, source: &str) -> Result<ProgramHandle, String>;

    /// Upload vertex bytes once; the buffer is never written again
    fn upload_static_vertices(&mut self, bytes: &[u8], stride: u32) -> Result<BufferHandle, String>;

    fn pipeline_state(&self) -> PipelineState;

    fn set_pipeline_state(&mut self, state: PipelineState);

    fn draw(&mut self, call: &DrawCall);
}
