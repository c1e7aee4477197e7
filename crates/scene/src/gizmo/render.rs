//! Gizmo renderer.
//!
//! Draws the handles for the current mode on top of the scene. All
//! per-frame matrices live in a small scratch arena owned by the renderer,
//! so a frame performs no heap allocation. The arena makes the renderer
//! single-threaded: use one renderer per frame loop.

use glam::{Mat4, Quat, Vec3};
use impasto_config::GizmoConfig;
use impasto_ipc::{GizmoAxis, GizmoMode, LinearAxis, PlanarAxis};
use tracing::{info, warn};

use super::backend::{
    BufferHandle, Capability, DrawCall, DrawRange, GIZMO_SHADER, GizmoVertex, GraphicsContext,
    PipelineState, ProgramHandle, Topology,
};
use super::geometry::{ShapeRanges, axis_orientation, build_geometry, plane_orientation};
use super::GizmoError;

pub const X_COLOR: [f32; 4] = [0.9, 0.2, 0.2, 1.0];
pub const Y_COLOR: [f32; 4] = [0.2, 0.9, 0.2, 1.0];
pub const Z_COLOR: [f32; 4] = [0.2, 0.2, 0.9, 1.0];
pub const UNIFORM_COLOR: [f32; 4] = [0.85, 0.85, 0.85, 0.9];
pub const SWITCH_COLOR: [f32; 4] = [0.6, 0.6, 0.6, 0.9];
pub const HIGHLIGHT_COLOR: [f32; 4] = [1.0, 1.0, 1.0, 1.0];
pub const SWITCH_HIGHLIGHT_COLOR: [f32; 4] = [1.0, 0.9, 0.1, 1.0];
const PLANE_FILL_ALPHA: f32 = 0.45;

/// Stem radius and head proportions relative to the arrow length
const STEM_RADIUS: f32 = 0.015;
const HEAD_RADIUS: f32 = 0.06;
const HEAD_LENGTH: f32 = 0.2;
/// Edge of the scale boxes and the scale-mode center cube
const BOX_SIZE: f32 = 0.1;

/// Per-frame inputs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GizmoDrawParams {
    pub view_projection: Mat4,
    pub position: Vec3,
    /// `None` draws world-aligned
    pub rotation: Option<Quat>,
    pub scale: f32,
    pub hover: Option<GizmoAxis>,
    pub active: Option<GizmoAxis>,
    pub mode: GizmoMode,
    pub show_switch: bool,
}

pub fn axis_color(axis: LinearAxis) -> [f32; 4] {
    match axis {
        LinearAxis::X => X_COLOR,
        LinearAxis::Y => Y_COLOR,
        LinearAxis::Z => Z_COLOR,
    }
}

/// Plane handles take the color of their normal axis
pub fn plane_color(plane: PlanarAxis) -> [f32; 4] {
    let [r, g, b, _] = axis_color(plane.normal_axis());
    [r, g, b, PLANE_FILL_ALPHA]
}

#[derive(Debug, Clone, Copy)]
struct GpuResources {
    program: ProgramHandle,
    buffer: BufferHandle,
}

/// Reusable matrices for one frame
#[derive(Debug, Clone, Copy, Default)]
struct MatrixArena {
    /// view_projection * translate * rotate * scale
    base: Mat4,
    part: Mat4,
}

#[derive(Debug)]
pub struct GizmoRenderer {
    config: GizmoConfig,
    resources: Option<GpuResources>,
    shapes: ShapeRanges,
    arena: MatrixArena,
}

impl GizmoRenderer {
    pub fn new(config: GizmoConfig) -> Self {
        Self {
            config,
            resources: None,
            shapes: ShapeRanges::default(),
            arena: MatrixArena::default(),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.resources.is_some()
    }

    pub fn shapes(&self) -> &ShapeRanges {
        &self.shapes
    }

    /// Check capabilities, compile the program and upload the static
    /// geometry. On failure the renderer stays inert for good.
    pub fn init(&mut self, ctx: &mut dyn GraphicsContext) -> Result<(), GizmoError> {
        self.resources = None;
        let result = self.try_init(ctx);
        if let Err(err) = &result {
            warn!("GizmoRenderer: disabled, {}", err);
        }
        result
    }

    fn try_init(&mut self, ctx: &mut dyn GraphicsContext) -> Result<(), GizmoError> {
        if let Some(missing) = Capability::REQUIRED.into_iter().find(|c| !ctx.supports(*c)) {
            return Err(GizmoError::Unsupported(missing));
        }
        let program = ctx.compile_program(GIZMO_SHADER).map_err(GizmoError::Compile)?;

        let (vertices, shapes) = build_geometry();
        let stride = std::mem::size_of::<GizmoVertex>() as u32;
        let buffer = ctx
            .upload_static_vertices(bytemuck::cast_slice(&vertices), stride)
            .map_err(GizmoError::Upload)?;

        self.shapes = shapes;
        self.resources = Some(GpuResources { program, buffer });
        info!("GizmoRenderer: ready, {} static vertices", vertices.len());
        Ok(())
    }

    /// Draw the handles for `params.mode`. Returns the number of draw calls;
    /// zero when the renderer is inert.
    pub fn render_gizmos(&mut self, ctx: &mut dyn GraphicsContext, params: &GizmoDrawParams) -> usize {
        let Some(resources) = self.resources else {
            return 0;
        };
        let rotation = params.rotation.unwrap_or(Quat::IDENTITY);
        self.arena.base = params.view_projection
            * Mat4::from_scale_rotation_translation(Vec3::splat(params.scale), rotation, params.position);

        let saved = ctx.pipeline_state();
        ctx.set_pipeline_state(PipelineState {
            depth_test: false,
            blend: true,
        });

        let mut pass = Pass {
            ctx: &mut *ctx,
            resources,
            arena: &mut self.arena,
            params,
            draws: 0,
        };
        let shapes = self.shapes;
        let config = &self.config;

        match params.mode {
            GizmoMode::Translate => {
                pass.solid(shapes.sphere, GizmoAxis::Uniform, UNIFORM_COLOR, &Mat4::from_scale(Vec3::splat(config.center_radius)));
                for plane in PlanarAxis::ALL {
                    pass.plane(&shapes, plane, config);
                }
                for axis in LinearAxis::ALL {
                    pass.arrow(&shapes, axis, config);
                }
            }
            GizmoMode::Rotate => {
                pass.solid(shapes.sphere, GizmoAxis::Uniform, UNIFORM_COLOR, &Mat4::from_scale(Vec3::splat(config.center_radius)));
                for axis in LinearAxis::ALL {
                    let local = Mat4::from_scale(Vec3::splat(config.ring_radius));
                    pass.oriented(shapes.ring, GizmoAxis::Linear(axis), axis_color(axis), axis_orientation(axis), &local);
                }
            }
            GizmoMode::Scale => {
                pass.solid(shapes.cube, GizmoAxis::Uniform, UNIFORM_COLOR, &Mat4::from_scale(Vec3::splat(BOX_SIZE * 1.2)));
                for plane in PlanarAxis::ALL {
                    pass.plane(&shapes, plane, config);
                }
                for axis in LinearAxis::ALL {
                    let local = Mat4::from_scale_rotation_translation(
                        Vec3::splat(BOX_SIZE),
                        Quat::IDENTITY,
                        Vec3::Y * config.arrow_length,
                    );
                    pass.oriented(shapes.cube, GizmoAxis::Linear(axis), axis_color(axis), axis_orientation(axis), &local);
                }
            }
        }

        if params.show_switch {
            let local = Mat4::from_scale_rotation_translation(
                Vec3::splat(config.switch_size),
                Quat::IDENTITY,
                Vec3::from(config.switch_offset),
            );
            pass.solid(shapes.cube, GizmoAxis::Switch, SWITCH_COLOR, &local);
        }

        let draws = pass.draws;
        ctx.set_pipeline_state(saved);
        draws
    }
}

/// One render pass over the arena
struct Pass<'a, 'p> {
    ctx: &'a mut dyn GraphicsContext,
    resources: GpuResources,
    arena: &'a mut MatrixArena,
    params: &'p GizmoDrawParams,
    draws: usize,
}

impl Pass<'_, '_> {
    fn is_highlighted(&self, axis: GizmoAxis) -> bool {
        self.params.hover == Some(axis) || self.params.active == Some(axis)
    }

    fn color_for(&self, axis: GizmoAxis, base: [f32; 4]) -> [f32; 4] {
        match (self.is_highlighted(axis), axis) {
            (false, _) => base,
            (true, GizmoAxis::Switch) => SWITCH_HIGHLIGHT_COLOR,
            (true, _) => HIGHLIGHT_COLOR,
        }
    }

    fn draw(&mut self, topology: Topology, range: DrawRange, color: [f32; 4]) {
        if range.is_empty() {
            return;
        }
        self.ctx.draw(&DrawCall {
            program: self.resources.program,
            buffer: self.resources.buffer,
            topology,
            range,
            mvp: self.arena.base * self.arena.part,
            color,
        });
        self.draws += 1;
    }

    fn solid(&mut self, range: DrawRange, axis: GizmoAxis, base: [f32; 4], local: &Mat4) {
        self.arena.part = *local;
        let color = self.color_for(axis, base);
        self.draw(Topology::TriangleList, range, color);
    }

    fn oriented(&mut self, range: DrawRange, axis: GizmoAxis, base: [f32; 4], orientation: &Mat4, local: &Mat4) {
        self.arena.part = *orientation * *local;
        let color = self.color_for(axis, base);
        self.draw(Topology::TriangleList, range, color);
    }

    fn arrow(&mut self, shapes: &ShapeRanges, axis: LinearAxis, config: &GizmoConfig) {
        let len = config.arrow_length;
        let stem_len = len * (1.0 - HEAD_LENGTH);
        let stem = Mat4::from_scale(Vec3::new(STEM_RADIUS * len, stem_len, STEM_RADIUS * len));
        let head = Mat4::from_scale_rotation_translation(
            Vec3::new(HEAD_RADIUS * len, HEAD_LENGTH * len, HEAD_RADIUS * len),
            Quat::IDENTITY,
            Vec3::Y * stem_len,
        );
        let handle = GizmoAxis::Linear(axis);
        let orientation = axis_orientation(axis);
        self.oriented(shapes.cylinder, handle, axis_color(axis), orientation, &stem);
        self.oriented(shapes.cone, handle, axis_color(axis), orientation, &head);
    }

    fn plane(&mut self, shapes: &ShapeRanges, plane: PlanarAxis, config: &GizmoConfig) {
        let handle = GizmoAxis::Planar(plane);
        let local = Mat4::from_scale_rotation_translation(
            Vec3::new(config.plane_size, config.plane_size, 1.0),
            Quat::IDENTITY,
            Vec3::new(config.plane_offset, config.plane_offset, 0.0),
        );
        self.oriented(shapes.quad, handle, plane_color(plane), plane_orientation(plane), &local);
        if self.is_highlighted(handle) {
            let [r, g, b, _] = axis_color(plane.normal_axis());
            let outline = [
                (r * 1.3).min(1.0),
                (g * 1.3).min(1.0),
                (b * 1.3).min(1.0),
                1.0,
            ];
            self.arena.part = *plane_orientation(plane) * local;
            self.draw(Topology::LineList, shapes.quad_outline, outline);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records every call; optionally refuses a capability or compile
    #[derive(Default)]
    struct RecordingContext {
        missing: Option<Capability>,
        fail_compile: bool,
        state: PipelineState,
        states_seen: Vec<PipelineState>,
        uploaded_bytes: usize,
        draws: Vec<DrawCall>,
    }

    impl GraphicsContext for RecordingContext {
        fn supports(&self, capability: Capability) -> bool {
            self.missing != Some(capability)
        }

        fn compile_program(&mut self, source: &str) -> Result<ProgramHandle, String> {
            if self.fail_compile {
                return Err("syntax error".into());
            }
            assert!(source.contains("vs_main"));
            Ok(ProgramHandle(7))
        }

        fn upload_static_vertices(&mut self, bytes: &[u8], stride: u32) -> Result<BufferHandle, String> {
            assert_eq!(stride, 12);
            self.uploaded_bytes += bytes.len();
            Ok(BufferHandle(3))
        }

        fn pipeline_state(&self) -> PipelineState {
            self.state
        }

        fn set_pipeline_state(&mut self, state: PipelineState) {
            self.state = state;
            self.states_seen.push(state);
        }

        fn draw(&mut self, call: &DrawCall) {
            assert_eq!(
                self.state,
                PipelineState {
                    depth_test: false,
                    blend: true
                }
            );
            self.draws.push(*call);
        }
    }

    fn params(mode: GizmoMode) -> GizmoDrawParams {
        GizmoDrawParams {
            view_projection: Mat4::IDENTITY,
            position: Vec3::ZERO,
            rotation: None,
            scale: 1.0,
            hover: None,
            active: None,
            mode,
            show_switch: false,
        }
    }

    fn ready() -> (GizmoRenderer, RecordingContext) {
        let mut ctx = RecordingContext::default();
        let mut renderer = GizmoRenderer::new(GizmoConfig::default());
        renderer.init(&mut ctx).unwrap();
        (renderer, ctx)
    }

    #[test]
    fn test_draw_counts_per_mode() {
        let (mut renderer, mut ctx) = ready();
        // sphere + 3 planes + 3 * (stem + head)
        assert_eq!(renderer.render_gizmos(&mut ctx, &params(GizmoMode::Translate)), 10);
        // sphere + 3 rings
        assert_eq!(renderer.render_gizmos(&mut ctx, &params(GizmoMode::Rotate)), 4);
        // cube + 3 planes + 3 boxes
        assert_eq!(renderer.render_gizmos(&mut ctx, &params(GizmoMode::Scale)), 7);

        let mut with_switch = params(GizmoMode::Rotate);
        with_switch.show_switch = true;
        assert_eq!(renderer.render_gizmos(&mut ctx, &with_switch), 5);
    }

    #[test]
    fn test_pipeline_state_is_restored() {
        let (mut renderer, mut ctx) = ready();
        let before = ctx.state;
        renderer.render_gizmos(&mut ctx, &params(GizmoMode::Translate));
        assert_eq!(ctx.state, before);
        assert_eq!(ctx.states_seen.len(), 2);
    }

    #[test]
    fn test_hover_highlight_and_outline() {
        let (mut renderer, mut ctx) = ready();
        let mut p = params(GizmoMode::Translate);
        p.hover = Some(GizmoAxis::Planar(PlanarAxis::XZ));
        // One extra draw for the outline
        assert_eq!(renderer.render_gizmos(&mut ctx, &p), 11);

        let outlines: Vec<_> = ctx.draws.iter().filter(|d| d.topology == Topology::LineList).collect();
        assert_eq!(outlines.len(), 1);
        assert_eq!(outlines[0].color[3], 1.0);
        let highlighted = ctx.draws.iter().filter(|d| d.color == HIGHLIGHT_COLOR).count();
        assert_eq!(highlighted, 1);
    }

    #[test]
    fn test_active_switch_is_yellow() {
        let (mut renderer, mut ctx) = ready();
        let mut p = params(GizmoMode::Scale);
        p.show_switch = true;
        p.hover = Some(GizmoAxis::Switch);
        renderer.render_gizmos(&mut ctx, &p);
        let last = ctx.draws.last().unwrap();
        assert_eq!(last.color, SWITCH_HIGHLIGHT_COLOR);
        assert_eq!(last.range, renderer.shapes().cube);
    }

    #[test]
    fn test_arrow_parts_follow_base_transform() {
        let (mut renderer, mut ctx) = ready();
        let mut p = params(GizmoMode::Translate);
        p.position = Vec3::new(1.0, 2.0, 3.0);
        p.scale = 2.0;
        renderer.render_gizmos(&mut ctx, &p);

        // Apex of the X arrow head: canonical +Y tip lands on +X
        let head = ctx
            .draws
            .iter()
            .find(|d| d.range == renderer.shapes().cone && d.color == X_COLOR)
            .unwrap();
        let apex = head.mvp.transform_point3(Vec3::Y);
        assert!((apex - Vec3::new(3.0, 2.0, 3.0)).length() < 1e-5);
    }

    #[test]
    fn test_missing_capability_makes_renderer_inert() {
        let mut ctx = RecordingContext {
            missing: Some(Capability::LinePrimitives),
            ..Default::default()
        };
        let mut renderer = GizmoRenderer::new(GizmoConfig::default());
        assert!(matches!(
            renderer.init(&mut ctx),
            Err(GizmoError::Unsupported(Capability::LinePrimitives))
        ));
        assert!(!renderer.is_ready());
        assert_eq!(renderer.render_gizmos(&mut ctx, &params(GizmoMode::Translate)), 0);
        assert!(ctx.states_seen.is_empty());
        assert_eq!(ctx.uploaded_bytes, 0);
    }

    #[test]
    fn test_compile_failure_makes_renderer_inert() {
        let mut ctx = RecordingContext {
            fail_compile: true,
            ..Default::default()
        };
        let mut renderer = GizmoRenderer::new(GizmoConfig::default());
        assert!(matches!(renderer.init(&mut ctx), Err(GizmoError::Compile(_))));
        assert_eq!(renderer.render_gizmos(&mut ctx, &params(GizmoMode::Rotate)), 0);
    }
}
