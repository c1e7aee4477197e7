//! Hand-rolled transform gizmo: static geometry, renderer, hit testing,
//! drag math and the interaction state machine.

mod backend;
mod geometry;
mod hover;
mod render;
mod state;
mod transform;

use thiserror::Error;

pub use backend::{
    BufferHandle, Capability, DrawCall, DrawRange, GIZMO_SHADER, GizmoVertex, GraphicsContext,
    PipelineState, ProgramHandle, Topology,
};
pub use geometry::{ShapeRanges, axis_orientation, build_geometry, plane_orientation};
pub use hover::{GizmoFrame, hit_test};
pub use render::{
    GizmoDrawParams, GizmoRenderer, HIGHLIGHT_COLOR, SWITCH_HIGHLIGHT_COLOR, X_COLOR, Y_COLOR,
    Z_COLOR, axis_color, plane_color,
};
pub use state::{GizmoController, PointerDown};
pub use transform::{DragPlan, DragStep, MIN_SCALE, begin_drag, update_drag};

/// Renderer setup failures. Any of these leaves the gizmo inert.
#[derive(Debug, Error)]
pub enum GizmoError {
    #[error("graphics context lacks {0:?}")]
    Unsupported(Capability),
    #[error("gizmo program failed to compile: {0}")]
    Compile(String),
    #[error("gizmo vertex upload failed: {0}")]
    Upload(String),
}
