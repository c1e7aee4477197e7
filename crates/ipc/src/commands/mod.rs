//! Command types accepted by the painting core.

mod gizmo;
mod paint;

pub use gizmo::*;
pub use paint::*;

use serde::{Deserialize, Serialize};

/// Identifier of a paint layer.
pub type LayerId = u32;

/// Commands the host sends into the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum CoreCommand {
    /// Bake the projected stencil into a layer after the configured frame delay
    RequestBakeProjection { layer_id: LayerId },
    /// Drop every bezier control point
    ClearCurve,
    /// Set the gizmo mode directly (the switch handle cycles it in-viewport)
    SetGizmoMode { mode: GizmoMode },
    /// Opacity used by bake and live preview
    SetProjectionOpacity { opacity: f32 },
}
