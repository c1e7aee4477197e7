//! Gizmo interaction state machine.
//!
//! Idle: every pointer move re-runs hit testing and updates the hovered
//! handle. Pointer-down on a hovered handle captures the pointer and starts
//! a drag against the primitive hit at that moment. Pointer-up or lost
//! capture returns to idle.

use impasto_config::GizmoConfig;
use impasto_ipc::{GizmoAxis, GizmoMode};
use painting::math::{Ray, Transform};
use tracing::{debug, info};

#[cfg(feature = "bevy")]
use bevy::prelude::Resource;

use super::hover::{GizmoFrame, hit_test};
use super::transform::{DragPlan, DragStep, begin_drag, update_drag};

/// Outcome of [`GizmoController::pointer_down`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerDown {
    /// Nothing hovered, or the handle gave no usable reference
    Ignored,
    /// The switch handle cycled the mode; no drag started
    ModeSwitched(GizmoMode),
    DragStarted(GizmoAxis),
}

#[derive(Debug, Clone, Copy)]
struct ActiveDrag {
    axis: GizmoAxis,
    plan: DragPlan,
    snapshot: Transform,
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "bevy", derive(Resource))]
pub struct GizmoController {
    config: GizmoConfig,
    show_switch: bool,
    hover: Option<GizmoAxis>,
    drag: Option<ActiveDrag>,
}

impl GizmoController {
    pub fn new(config: GizmoConfig, show_switch: bool) -> Self {
        Self {
            config,
            show_switch,
            hover: None,
            drag: None,
        }
    }

    pub fn config(&self) -> &GizmoConfig {
        &self.config
    }

    pub fn show_switch(&self) -> bool {
        self.show_switch
    }

    pub fn set_show_switch(&mut self, show: bool) {
        self.show_switch = show;
    }

    pub fn hover(&self) -> Option<GizmoAxis> {
        self.hover
    }

    /// Handle being dragged; `Some` only while the pointer is captured
    pub fn active(&self) -> Option<GizmoAxis> {
        self.drag.as_ref().map(|d| d.axis)
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Re-run hit testing. Ignored while dragging.
    pub fn update_hover(&mut self, ray: &Ray, frame: &GizmoFrame, mode: GizmoMode) -> Option<GizmoAxis> {
        if self.drag.is_some() {
            return None;
        }
        let hit = hit_test(ray, frame, mode, self.show_switch, &self.config);
        if hit != self.hover {
            debug!("Gizmo: hover {:?} -> {:?}", self.hover, hit);
            self.hover = hit;
        }
        hit
    }

    /// Start a drag on the hovered handle, or cycle `mode` when the switch
    /// handle is hovered.
    pub fn pointer_down(
        &mut self,
        ray: &Ray,
        frame: &GizmoFrame,
        mode: &mut GizmoMode,
        target: &Transform,
    ) -> PointerDown {
        if self.drag.is_some() {
            return PointerDown::Ignored;
        }
        let Some(axis) = self.hover else {
            return PointerDown::Ignored;
        };

        if axis.is_switch() {
            *mode = mode.next();
            info!("Gizmo: mode switched to {:?}", mode);
            return PointerDown::ModeSwitched(*mode);
        }

        let Some(plan) = begin_drag(axis, *mode, ray, frame) else {
            debug!("Gizmo: no drag reference for {:?} in {:?}", axis, mode);
            return PointerDown::Ignored;
        };
        self.hover = None;
        self.drag = Some(ActiveDrag {
            axis,
            plan,
            snapshot: *target,
        });
        debug!("Gizmo: drag started on {:?}", axis);
        PointerDown::DragStarted(axis)
    }

    /// Continue the active drag.
    pub fn pointer_move(&mut self, ray: &Ray, target: &mut Transform) -> DragStep {
        let Some(drag) = self.drag.as_mut() else {
            return DragStep::Idle;
        };
        let step = update_drag(&mut drag.plan, ray, &drag.snapshot, target);
        if step == DragStep::Skipped {
            debug!("Gizmo: degenerate drag frame on {:?}, skipped", drag.axis);
        }
        step
    }

    /// Release capture. Returns the handle that was being dragged.
    pub fn pointer_up(&mut self) -> Option<GizmoAxis> {
        let drag = self.drag.take()?;
        info!("Gizmo: drag ended on {:?}", drag.axis);
        Some(drag.axis)
    }

    /// Losing capture ends the drag like a pointer-up; partial edits stay.
    pub fn lost_capture(&mut self) -> Option<GizmoAxis> {
        self.hover = None;
        self.pointer_up()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use impasto_ipc::LinearAxis;

    fn ray_at(x: f32, y: f32) -> Ray {
        Ray::new(Vec3::new(x, y, 10.0), Vec3::new(0.002, 0.003, -1.0)).unwrap()
    }

    fn frame() -> GizmoFrame {
        GizmoFrame::new(Vec3::ZERO, None, 1.0)
    }

    fn controller() -> GizmoController {
        GizmoController::new(GizmoConfig::default(), true)
    }

    /// At most one of hover and active is set
    fn assert_exclusive(c: &GizmoController) {
        assert!(!(c.hover().is_some() && c.active().is_some()));
    }

    #[test]
    fn test_full_translate_gesture() {
        let mut c = controller();
        let mut mode = GizmoMode::Translate;
        let mut target = Transform::IDENTITY;

        let down = ray_at(0.6, 0.0);
        assert_eq!(c.update_hover(&down, &frame(), mode), Some(GizmoAxis::Linear(LinearAxis::X)));
        assert_exclusive(&c);
        assert_eq!(c.active(), None);

        let started = c.pointer_down(&down, &frame(), &mut mode, &target);
        assert_eq!(started, PointerDown::DragStarted(GizmoAxis::Linear(LinearAxis::X)));
        assert_eq!(c.active(), Some(GizmoAxis::Linear(LinearAxis::X)));
        assert_exclusive(&c);

        // Hover is frozen during the drag
        assert_eq!(c.update_hover(&ray_at(0.0, 0.0), &frame(), mode), None);
        assert_exclusive(&c);

        assert_eq!(c.pointer_move(&ray_at(1.1, 0.5), &mut target), DragStep::Applied);
        assert!((target.translation.x - 0.5).abs() < 1e-3);
        assert!(target.translation.y.abs() < 1e-5);

        assert_eq!(c.pointer_up(), Some(GizmoAxis::Linear(LinearAxis::X)));
        assert_eq!(c.active(), None);
        assert_eq!(c.pointer_move(&ray_at(2.0, 0.0), &mut target), DragStep::Idle);
    }

    #[test]
    fn test_pointer_down_without_hover_is_ignored() {
        let mut c = controller();
        let mut mode = GizmoMode::Translate;
        let ray = ray_at(5.0, 5.0);
        c.update_hover(&ray, &frame(), mode);
        assert_eq!(
            c.pointer_down(&ray, &frame(), &mut mode, &Transform::IDENTITY),
            PointerDown::Ignored
        );
        assert_eq!(c.active(), None);
    }

    #[test]
    fn test_switch_cycles_mode_without_dragging() {
        let mut c = controller();
        let mut mode = GizmoMode::Translate;
        let ray = ray_at(0.9, 0.9);
        assert_eq!(c.update_hover(&ray, &frame(), mode), Some(GizmoAxis::Switch));

        for expected in [GizmoMode::Rotate, GizmoMode::Scale, GizmoMode::Translate] {
            let result = c.pointer_down(&ray, &frame(), &mut mode, &Transform::IDENTITY);
            assert_eq!(result, PointerDown::ModeSwitched(expected));
            assert_eq!(mode, expected);
            assert!(!c.is_dragging());
        }
    }

    #[test]
    fn test_lost_capture_keeps_partial_edit() {
        let mut c = controller();
        let mut mode = GizmoMode::Scale;
        let mut target = Transform::IDENTITY;
        let ray = ray_at(0.7, 0.0);
        c.update_hover(&ray, &frame(), mode);
        c.pointer_down(&ray, &frame(), &mut mode, &target);
        c.pointer_move(&ray_at(1.4, 0.0), &mut target);
        let scaled = target.scale;

        assert_eq!(c.lost_capture(), Some(GizmoAxis::Linear(LinearAxis::X)));
        assert_eq!(target.scale, scaled);
        assert!(scaled.x > 1.5);
        assert_eq!(scaled.y, 1.0);
        assert_eq!(scaled.z, 1.0);
        assert_eq!(c.hover(), None);
        assert_eq!(c.pointer_up(), None);
    }
}
