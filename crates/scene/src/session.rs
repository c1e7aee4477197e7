//! Frame-driven painting session
//!
//! [`PaintSession`] wires the layer stack, brush engine, bezier curve,
//! stencil pipeline, projection baker and gizmo controller together for one
//! viewport. Everything runs on the caller's thread: pointer handlers mutate
//! state directly, and [`PaintSession::tick`] is called once per rendered
//! frame to run deferred work: stencil rebuild, then any pending bake, then
//! the composite refresh.

use glam::{Mat4, Quat, Vec2, Vec3};
use image::RgbaImage;
use impasto_config::{ConfigError, PaintConfig};
use impasto_ipc::{
    CoreCommand, CoreEvent, EventSink, GizmoAxis, GizmoMode, LayerId, PaintTool, PointerRay,
};
use painting::{
    BakeInputs, BezierCurve, BrushMode, BrushSettings, ColorError, LayerStack, MeshRaycastData,
    ProjectionParams, ProjectionSampler, Ray, RebuildOutcome, Rgba, StencilPipeline,
    StrokePainter, TileUpload, TipLibrary, Transform, bake, parse_hex_color, raycast_mesh,
};
use tracing::{debug, info, warn};

use crate::gizmo::{
    DragStep, GizmoController, GizmoDrawParams, GizmoError, GizmoFrame, GizmoRenderer,
    GraphicsContext, PointerDown,
};

/// What the gizmo is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GizmoTarget {
    /// The stencil plane itself (full transform)
    StencilPlane,
    /// One stencil grid control point, edited in world space
    GridPoint { row: usize, col: usize },
    /// One bezier control point
    CurvePoint(usize),
}

/// Result of trying to run a bake right now
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BakeStatus {
    Baked,
    /// Stencil texture, transform or LUT missing
    NotReady,
    /// A paint gesture currently owns the layer's canvas
    Busy,
    UnknownLayer,
}

/// What one [`PaintSession::tick`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameReport {
    pub baked: Option<LayerId>,
    pub stencil_rebuilt: bool,
    pub composited: bool,
}

#[derive(Debug, Clone, Copy)]
struct Gesture {
    layer_id: LayerId,
    tool: PaintTool,
}

#[derive(Debug, Clone, Copy)]
struct PendingBake {
    layer_id: LayerId,
    frames_left: u32,
}

pub struct PaintSession<S: EventSink> {
    config: PaintConfig,
    layers: LayerStack,
    active_layer: LayerId,

    brush: BrushSettings,
    curve_tool: bool,
    tips: TipLibrary,
    painter: StrokePainter,
    gesture: Option<Gesture>,

    /// Paintable mesh in object space and its model transform
    mesh: MeshRaycastData,
    mesh_transform: Transform,
    /// `mesh` baked through `mesh_transform`, for world-space raycasts
    world_mesh: MeshRaycastData,
    curve: BezierCurve,

    stencil: StencilPipeline,
    stencil_transform: Option<Transform>,
    stencil_image: Option<RgbaImage>,
    projection: ProjectionParams,
    pending_bake: Option<PendingBake>,

    gizmo: GizmoController,
    gizmo_mode: GizmoMode,
    gizmo_target: Option<GizmoTarget>,
    /// Transform the active drag edits; point targets are copied back from it
    proxy: Transform,
    gizmo_scale: f32,
    renderer: GizmoRenderer,

    sink: S,
}

impl<S: EventSink> PaintSession<S> {
    /// Validate `config` and build a session with one empty layer.
    pub fn new(config: PaintConfig, sink: S) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut layers = LayerStack::new(config.texture_size, config.tile_size);
        let active_layer = layers.create("Layer 1");

        let sphere = &config.sphere;
        let mesh = MeshRaycastData::uv_sphere(sphere.radius, sphere.width_segments, sphere.height_segments);
        let mesh_transform = Transform::IDENTITY;
        let world_mesh = mesh.transformed(mesh_transform.matrix());
        let curve = BezierCurve::new(mesh_transform.translation, sphere.radius, config.curve.surface_offset);

        let projection = ProjectionParams {
            opacity: config.projection_opacity,
            cull_backfaces: config.cull_backfaces,
        };

        info!(
            "PaintSession: {}px layers, {}px LUT, bake delay {} frame(s)",
            config.texture_size, config.lut_size, config.bake_delay_frames
        );
        Ok(Self {
            layers,
            active_layer,
            brush: BrushSettings::default(),
            curve_tool: false,
            tips: TipLibrary::default(),
            painter: StrokePainter::new(config.rng_seed, config.pressure_opacity_floor),
            gesture: None,
            mesh,
            mesh_transform,
            world_mesh,
            curve,
            stencil: StencilPipeline::new(1.0, config.lut_size, config.lut_margin),
            stencil_transform: None,
            stencil_image: None,
            projection,
            pending_bake: None,
            gizmo: GizmoController::new(config.gizmo.clone(), true),
            gizmo_mode: GizmoMode::default(),
            gizmo_target: None,
            proxy: Transform::IDENTITY,
            gizmo_scale: sphere.radius,
            renderer: GizmoRenderer::new(config.gizmo.clone()),
            config,
            sink,
        })
    }

    pub fn config(&self) -> &PaintConfig {
        &self.config
    }

    pub fn layers(&self) -> &LayerStack {
        &self.layers
    }

    pub fn active_layer(&self) -> LayerId {
        self.active_layer
    }

    pub fn brush(&self) -> &BrushSettings {
        &self.brush
    }

    /// Brush edits take effect on the next stamp
    pub fn brush_mut(&mut self) -> &mut BrushSettings {
        &mut self.brush
    }

    pub fn tips_mut(&mut self) -> &mut TipLibrary {
        &mut self.tips
    }

    pub fn curve(&self) -> &BezierCurve {
        &self.curve
    }

    pub fn stencil(&self) -> &StencilPipeline {
        &self.stencil
    }

    pub fn stencil_transform(&self) -> Option<&Transform> {
        self.stencil_transform.as_ref()
    }

    pub fn projection(&self) -> ProjectionParams {
        self.projection
    }

    pub fn gizmo(&self) -> &GizmoController {
        &self.gizmo
    }

    pub fn gizmo_mode(&self) -> GizmoMode {
        self.gizmo_mode
    }

    pub fn gizmo_target(&self) -> Option<GizmoTarget> {
        self.gizmo_target
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn is_painting(&self) -> bool {
        self.gesture.is_some()
    }

    pub fn has_pending_bake(&self) -> bool {
        self.pending_bake.is_some()
    }

    // ---------------------------------------------------------------------
    // Layers
    // ---------------------------------------------------------------------

    /// Add a layer on top and make it active
    pub fn create_layer(&mut self, name: impl Into<String>) -> LayerId {
        let id = self.layers.create(name);
        self.active_layer = id;
        id
    }

    pub fn set_active_layer(&mut self, id: LayerId) -> bool {
        if self.layers.get(id).is_none() {
            return false;
        }
        self.active_layer = id;
        true
    }

    /// Remove a layer. The last remaining layer and a layer being painted
    /// are kept.
    pub fn remove_layer(&mut self, id: LayerId) -> bool {
        if self.gesture.is_some_and(|g| g.layer_id == id) {
            warn!("PaintSession: layer {} is being painted, not removed", id);
            return false;
        }
        if !self.layers.remove(id) {
            return false;
        }
        if self.pending_bake.is_some_and(|p| p.layer_id == id) {
            debug!("PaintSession: dropping pending bake for removed layer {}", id);
            self.pending_bake = None;
        }
        if self.active_layer == id {
            if let Some(top) = self.layers.top_id() {
                self.active_layer = top;
            }
        }
        true
    }

    /// Fill a layer with a `#rrggbb` / `#rrggbbaa` color
    pub fn fill_layer(&mut self, id: LayerId, hex: &str) -> Result<bool, ColorError> {
        let color = parse_hex_color(hex)?;
        Ok(self.layers.fill(id, color))
    }

    pub fn draw_image(&mut self, id: LayerId, source: &RgbaImage) -> bool {
        self.layers.draw_image(id, source)
    }

    /// Changed tiles of a layer since the last call, for GPU texture sync
    pub fn take_tile_uploads(&mut self, id: LayerId) -> Vec<TileUpload> {
        self.layers.take_tile_uploads(id).unwrap_or_default()
    }

    // ---------------------------------------------------------------------
    // Paintable mesh and stencil
    // ---------------------------------------------------------------------

    /// Move the paintable mesh. The curve lives on the mesh's shell, so it
    /// is cleared.
    pub fn set_mesh_transform(&mut self, transform: Transform) -> bool {
        if !transform.is_finite() || transform.inverse_matrix().is_none() {
            warn!("PaintSession: rejecting degenerate mesh transform");
            return false;
        }
        self.mesh_transform = transform;
        self.world_mesh = self.mesh.transformed(transform.matrix());
        let radius = self.config.sphere.radius * transform.scale.max_element();
        self.curve = BezierCurve::new(transform.translation, radius, self.config.curve.surface_offset);
        if matches!(self.gizmo_target, Some(GizmoTarget::CurvePoint(_))) {
            self.set_gizmo_target(None);
        }
        self.sink.emit(CoreEvent::CurveCleared);
        true
    }

    pub fn mesh_transform(&self) -> &Transform {
        &self.mesh_transform
    }

    /// Install (or clear) the stencil texture.
    ///
    /// A new image resets the grid to the image's aspect ratio and, if no
    /// stencil transform exists yet, places the stencil in front of the mesh.
    pub fn set_stencil_image(&mut self, image: Option<RgbaImage>) {
        let Some(image) = image else {
            self.stencil_image = None;
            return;
        };
        let (w, h) = image.dimensions();
        let aspect = if w > 0 && h > 0 { w as f32 / h as f32 } else { 1.0 };
        self.stencil.reset(aspect);
        if matches!(self.gizmo_target, Some(GizmoTarget::GridPoint { .. })) {
            self.set_gizmo_target(None);
        }
        if self.stencil_transform.is_none() {
            let radius = self.config.sphere.radius * self.mesh_transform.scale.max_element();
            self.stencil_transform = Some(Transform {
                translation: self.mesh_transform.translation + Vec3::Z * radius * 2.0,
                rotation: Quat::IDENTITY,
                scale: Vec3::splat(radius),
            });
        }
        info!("PaintSession: stencil image {}x{}", w, h);
        self.stencil_image = Some(image);
    }

    pub fn set_stencil_transform(&mut self, transform: Option<Transform>) {
        let on_stencil = matches!(
            self.gizmo_target,
            Some(GizmoTarget::StencilPlane | GizmoTarget::GridPoint { .. })
        );
        if transform.is_none() && on_stencil {
            self.set_gizmo_target(None);
        }
        self.stencil_transform = transform;
    }

    pub fn insert_stencil_row(&mut self, v: f32) -> Option<usize> {
        self.stencil.insert_row_loop(v)
    }

    pub fn insert_stencil_col(&mut self, u: f32) -> Option<usize> {
        self.stencil.insert_col_loop(u)
    }

    /// Live preview of the projected stencil at a world-space surface point
    pub fn preview_sample(&self, world: Vec3, normal: Vec3) -> Option<Rgba> {
        let transform = self.stencil_transform.as_ref()?;
        let image = self.stencil_image.as_ref()?;
        let lut = self.stencil.lut()?;
        ProjectionSampler::new(transform, image, lut, self.projection)?.shade(world, normal)
    }

    // ---------------------------------------------------------------------
    // Painting
    // ---------------------------------------------------------------------

    /// Select the tool for the next gesture
    pub fn set_tool(&mut self, tool: PaintTool) {
        match tool {
            PaintTool::Curve => self.curve_tool = true,
            PaintTool::Brush => {
                self.curve_tool = false;
                if self.brush.mode == BrushMode::Erase {
                    self.brush.mode = BrushMode::Paint;
                }
            }
            PaintTool::Eraser => {
                self.curve_tool = false;
                self.brush.mode = BrushMode::Erase;
            }
        }
    }

    pub fn tool(&self) -> PaintTool {
        if self.curve_tool {
            PaintTool::Curve
        } else {
            self.brush.tool()
        }
    }

    fn surface_uv(&self, pointer: &PointerRay) -> Option<Vec2> {
        if let Some(uv) = pointer.uv {
            let uv = Vec2::from_array(uv);
            let in_range = uv.is_finite() && uv.cmpge(Vec2::ZERO).all() && uv.cmple(Vec2::ONE).all();
            if !in_range {
                warn!("PaintSession: pointer uv {:?} is outside the unit square", uv);
                return None;
            }
            return Some(uv);
        }
        let ray = Ray::from_pointer(pointer)?;
        raycast_mesh(&ray, &self.world_mesh)?.uv
    }

    /// Pointer-down on the mesh.
    ///
    /// Brush and eraser stamp immediately; the curve tool adds a control
    /// point under the pointer instead. Returns false when nothing started.
    pub fn begin_paint(&mut self, pointer: &PointerRay) -> bool {
        if self.gesture.is_some() || self.gizmo.is_dragging() {
            return false;
        }
        let layer_id = self.active_layer;
        if self.layers.get(layer_id).is_none() {
            warn!("PaintSession: active layer {} is gone", layer_id);
            return false;
        }
        let tool = self.tool();

        let uv = if tool == PaintTool::Curve {
            let Some(hit) = Ray::from_pointer(pointer).and_then(|ray| raycast_mesh(&ray, &self.world_mesh))
            else {
                return false;
            };
            let index = self.curve.add_point(hit.position);
            debug!("PaintSession: curve point {} at {:?}", index, hit.position);
            hit.uv.unwrap_or(Vec2::ZERO)
        } else {
            let Some(uv) = self.surface_uv(pointer) else {
                return false;
            };
            self.painter.begin_stroke();
            let tip = self.tips.for_settings(&self.brush);
            if let Some(layer) = self.layers.get_mut(layer_id) {
                self.painter.paint_stroke(
                    layer.canvas_mut(),
                    &self.brush,
                    tip,
                    uv,
                    pointer.effective_pressure(),
                    true,
                );
            }
            uv
        };

        self.gesture = Some(Gesture { layer_id, tool });
        info!("PaintSession: {:?} gesture started on layer {}", tool, layer_id);
        self.sink.emit(CoreEvent::PaintGestureStarted {
            layer_id,
            tool,
            uv: uv.to_array(),
        });
        true
    }

    /// Pointer-move during a gesture. Returns the stamps drawn.
    pub fn paint_to(&mut self, pointer: &PointerRay) -> usize {
        let Some(gesture) = self.gesture else {
            return 0;
        };
        if gesture.tool == PaintTool::Curve {
            return 0;
        }
        let Some(uv) = self.surface_uv(pointer) else {
            return 0;
        };
        let tip = self.tips.for_settings(&self.brush);
        let Some(layer) = self.layers.get_mut(gesture.layer_id) else {
            return 0;
        };
        self.painter.paint_stroke(
            layer.canvas_mut(),
            &self.brush,
            tip,
            uv,
            pointer.effective_pressure(),
            false,
        )
    }

    /// Pointer-up (or capture loss) ends the gesture
    pub fn end_paint(&mut self) -> Option<LayerId> {
        let gesture = self.gesture.take()?;
        self.painter.end_stroke();
        info!("PaintSession: gesture ended on layer {}", gesture.layer_id);
        self.sink.emit(CoreEvent::PaintGestureEnded {
            layer_id: gesture.layer_id,
        });
        Some(gesture.layer_id)
    }

    /// Stamp along the whole curve into the active layer.
    ///
    /// Each tessellated sample is raycast back onto the mesh for its UV.
    /// Returns the stamps drawn.
    pub fn paint_curve(&mut self) -> usize {
        if self.gesture.is_some() {
            return 0;
        }
        let layer_id = self.active_layer;
        let curve = &self.config.curve;
        let uvs = self
            .curve
            .surface_uvs(&self.world_mesh, curve.samples_per_segment, curve.raycast_lift);
        let Some(&first) = uvs.first() else {
            debug!("PaintSession: curve has no samples on the mesh");
            return 0;
        };
        let tip = self.tips.for_settings(&self.brush);
        let Some(layer) = self.layers.get_mut(layer_id) else {
            return 0;
        };

        self.sink.emit(CoreEvent::PaintGestureStarted {
            layer_id,
            tool: PaintTool::Curve,
            uv: first.to_array(),
        });
        self.painter.begin_stroke();
        let canvas = layer.canvas_mut();
        let mut stamps = 0;
        for (i, &uv) in uvs.iter().enumerate() {
            stamps += self.painter.paint_stroke(canvas, &self.brush, tip, uv, 1.0, i == 0);
        }
        self.painter.end_stroke();
        self.sink.emit(CoreEvent::PaintGestureEnded { layer_id });
        info!(
            "PaintSession: curve stroke on layer {}, {} samples, {} stamps",
            layer_id,
            uvs.len(),
            stamps
        );
        stamps
    }

    pub fn clear_curve(&mut self) {
        self.curve.clear();
        if matches!(self.gizmo_target, Some(GizmoTarget::CurvePoint(_))) {
            self.set_gizmo_target(None);
        }
        self.sink.emit(CoreEvent::CurveCleared);
    }

    /// Pointer capture was lost: end whatever owned it, keeping partial edits
    pub fn lost_capture(&mut self) {
        self.end_paint();
        if let Some(axis) = self.gizmo.lost_capture() {
            self.sink.emit(CoreEvent::GizmoDragEnded { axis });
        }
    }

    // ---------------------------------------------------------------------
    // Gizmo
    // ---------------------------------------------------------------------

    /// Attach the gizmo. An active drag on the previous target ends first.
    pub fn set_gizmo_target(&mut self, target: Option<GizmoTarget>) {
        if let Some(axis) = self.gizmo.lost_capture() {
            self.sink.emit(CoreEvent::GizmoDragEnded { axis });
        }
        self.gizmo_target = target;
    }

    pub fn set_gizmo_mode(&mut self, mode: GizmoMode) {
        self.gizmo_mode = mode;
    }

    /// World-space gizmo size multiplier
    pub fn set_gizmo_scale(&mut self, scale: f32) {
        if scale.is_finite() && scale > 0.0 {
            self.gizmo_scale = scale;
        }
    }

    fn target_transform(&self, target: GizmoTarget) -> Option<Transform> {
        match target {
            GizmoTarget::StencilPlane => self.stencil_transform,
            GizmoTarget::GridPoint { row, col } => {
                let stencil = self.stencil_transform?;
                let local = self.stencil.grid().point(row, col)?;
                Some(Transform::from_translation(stencil.matrix().transform_point3(local)))
            }
            GizmoTarget::CurvePoint(index) => self.curve.point(index).map(Transform::from_translation),
        }
    }

    fn apply_target(&mut self, target: GizmoTarget, transform: Transform) -> bool {
        match target {
            GizmoTarget::StencilPlane => {
                self.stencil_transform = Some(transform);
                true
            }
            GizmoTarget::GridPoint { row, col } => {
                let Some(inverse) = self.stencil_transform.and_then(|t| t.inverse_matrix()) else {
                    return false;
                };
                let local = inverse.transform_point3(transform.translation);
                self.stencil.set_point(row, col, local)
            }
            GizmoTarget::CurvePoint(index) => self.curve.move_point(index, transform.translation),
        }
    }

    /// Where the gizmo is drawn and hit tested. Point targets are
    /// world-aligned.
    pub fn gizmo_frame(&self) -> Option<GizmoFrame> {
        let (position, rotation) = self.gizmo_placement()?;
        Some(GizmoFrame::new(position, rotation, self.gizmo_scale))
    }

    fn gizmo_placement(&self) -> Option<(Vec3, Option<Quat>)> {
        let target = self.gizmo_target?;
        let transform = self.target_transform(target)?;
        let rotation = match target {
            GizmoTarget::StencilPlane => Some(transform.rotation),
            GizmoTarget::GridPoint { .. } | GizmoTarget::CurvePoint(_) => None,
        };
        Some((transform.translation, rotation))
    }

    /// Hover while idle, drag while captured
    pub fn gizmo_pointer_move(&mut self, pointer: &PointerRay) -> DragStep {
        let Some(ray) = Ray::from_pointer(pointer) else {
            return DragStep::Idle;
        };
        if self.gizmo.is_dragging() {
            let Some(target) = self.gizmo_target else {
                return DragStep::Idle;
            };
            let mut proxy = self.proxy;
            let step = self.gizmo.pointer_move(&ray, &mut proxy);
            if step == DragStep::Applied {
                self.proxy = proxy;
                if !self.apply_target(target, proxy) {
                    debug!("PaintSession: gizmo target {:?} rejected the edit", target);
                }
            }
            return step;
        }
        if let Some(frame) = self.gizmo_frame() {
            self.gizmo.update_hover(&ray, &frame, self.gizmo_mode);
        }
        DragStep::Idle
    }

    pub fn gizmo_pointer_down(&mut self, pointer: &PointerRay) -> PointerDown {
        let Some(ray) = Ray::from_pointer(pointer) else {
            return PointerDown::Ignored;
        };
        let Some(target) = self.gizmo_target else {
            return PointerDown::Ignored;
        };
        let (Some(frame), Some(proxy)) = (self.gizmo_frame(), self.target_transform(target)) else {
            return PointerDown::Ignored;
        };
        let outcome = self.gizmo.pointer_down(&ray, &frame, &mut self.gizmo_mode, &proxy);
        if matches!(outcome, PointerDown::DragStarted(_)) {
            self.proxy = proxy;
        }
        outcome
    }

    pub fn gizmo_pointer_up(&mut self) -> Option<GizmoAxis> {
        let axis = self.gizmo.pointer_up()?;
        self.sink.emit(CoreEvent::GizmoDragEnded { axis });
        Some(axis)
    }

    /// Compile the gizmo program and upload its geometry. On failure the
    /// gizmo stays inert and the rest of the session is unaffected.
    pub fn init_gizmo_renderer(&mut self, ctx: &mut dyn GraphicsContext) -> Result<(), GizmoError> {
        self.renderer.init(ctx)
    }

    /// Draw the gizmo for the current target. Returns the draw calls issued.
    pub fn render_gizmo(&mut self, ctx: &mut dyn GraphicsContext, view_projection: Mat4) -> usize {
        let Some((position, rotation)) = self.gizmo_placement() else {
            return 0;
        };
        let params = GizmoDrawParams {
            view_projection,
            position,
            rotation,
            scale: self.gizmo_scale,
            hover: self.gizmo.hover(),
            active: self.gizmo.active(),
            mode: self.gizmo_mode,
            show_switch: self.gizmo.show_switch(),
        };
        self.renderer.render_gizmos(ctx, &params)
    }

    // ---------------------------------------------------------------------
    // Commands, bake and frame tick
    // ---------------------------------------------------------------------

    pub fn handle_command(&mut self, command: CoreCommand) {
        debug!("PaintSession: command {:?}", command);
        match command {
            CoreCommand::RequestBakeProjection { layer_id } => self.request_bake(layer_id),
            CoreCommand::ClearCurve => self.clear_curve(),
            CoreCommand::SetGizmoMode { mode } => self.set_gizmo_mode(mode),
            CoreCommand::SetProjectionOpacity { opacity } => self.set_projection_opacity(opacity),
        }
    }

    pub fn set_projection_opacity(&mut self, opacity: f32) {
        if !opacity.is_finite() {
            warn!("PaintSession: ignoring non-finite projection opacity");
            return;
        }
        self.projection.opacity = opacity.clamp(0.0, 1.0);
    }

    /// Queue a bake into `layer_id`, run after the configured frame delay.
    /// A newer request replaces an older pending one.
    pub fn request_bake(&mut self, layer_id: LayerId) {
        if let Some(previous) = self.pending_bake {
            debug!("PaintSession: bake for layer {} superseded", previous.layer_id);
        }
        info!(
            "PaintSession: bake into layer {} queued ({} frame delay)",
            layer_id, self.config.bake_delay_frames
        );
        self.pending_bake = Some(PendingBake {
            layer_id,
            frames_left: self.config.bake_delay_frames,
        });
    }

    /// Rebuild a dirty stencil and bake into `layer_id` immediately.
    pub fn bake_now(&mut self, layer_id: LayerId) -> BakeStatus {
        if self.gesture.is_some_and(|g| g.layer_id == layer_id) {
            return BakeStatus::Busy;
        }
        if self.layers.get(layer_id).is_none() {
            warn!("PaintSession: bake target layer {} does not exist", layer_id);
            return BakeStatus::UnknownLayer;
        }
        self.stencil.rebuild();

        let output = bake(&BakeInputs {
            mesh: &self.mesh,
            mesh_model: self.mesh_transform.matrix(),
            stencil_transform: self.stencil_transform.as_ref(),
            stencil_image: self.stencil_image.as_ref(),
            lut: self.stencil.lut(),
            size: self.layers.size(),
            params: self.projection,
        });
        let Some(output) = output else {
            warn!("PaintSession: projection not ready, bake into layer {} skipped", layer_id);
            return BakeStatus::NotReady;
        };

        let composited = self
            .layers
            .get_mut(layer_id)
            .is_some_and(|layer| layer.composite_render_target(&output));
        if !composited {
            return BakeStatus::NotReady;
        }
        info!(
            "PaintSession: baked {} texels into layer {}",
            output.covered_count(),
            layer_id
        );
        self.sink.emit(CoreEvent::ProjectionBaked { layer_id });
        BakeStatus::Baked
    }

    /// Once-per-frame update.
    pub fn tick(&mut self) -> FrameReport {
        let mut report = FrameReport {
            stencil_rebuilt: matches!(self.stencil.rebuild(), RebuildOutcome::Rebuilt { .. }),
            ..FrameReport::default()
        };

        if let Some(mut pending) = self.pending_bake.take() {
            if pending.frames_left > 0 {
                pending.frames_left -= 1;
                self.pending_bake = Some(pending);
            } else {
                match self.bake_now(pending.layer_id) {
                    BakeStatus::Baked => report.baked = Some(pending.layer_id),
                    BakeStatus::Busy => {
                        debug!("PaintSession: layer {} busy, bake deferred", pending.layer_id);
                        self.pending_bake = Some(pending);
                    }
                    BakeStatus::NotReady | BakeStatus::UnknownLayer => {}
                }
            }
        }

        report.composited = self.layers.refresh_composite();
        if report.composited {
            self.sink.emit(CoreEvent::CompositeRefreshRequested);
        }
        report
    }
}
