//! Paint tool identifiers carried by gesture events.

use serde::{Deserialize, Serialize};

/// The tool that produced a paint gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PaintTool {
    #[default]
    Brush,
    Eraser,
    /// Stamps along the bezier curve instead of the pointer path
    Curve,
}
