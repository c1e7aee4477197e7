//! Viewport-side pieces of Impasto
//!
//! - [`gizmo`] - Transform gizmo geometry, renderer, hit testing and drag math
//! - [`session`] - [`PaintSession`], the frame-driven owner of every painting
//!   component for one viewport

pub mod gizmo;
pub mod session;

pub use gizmo::*;
pub use session::{BakeStatus, FrameReport, GizmoTarget, PaintSession};
