//! Gizmo mode and handle identifiers.

use serde::{Deserialize, Serialize};

/// Transform gizmo operation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GizmoMode {
    #[default]
    Translate,
    Rotate,
    Scale,
}

impl GizmoMode {
    /// The mode the switch handle moves to (translate, rotate, scale, repeat).
    pub fn next(self) -> Self {
        match self {
            GizmoMode::Translate => GizmoMode::Rotate,
            GizmoMode::Rotate => GizmoMode::Scale,
            GizmoMode::Scale => GizmoMode::Translate,
        }
    }
}

/// One of the three local axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinearAxis {
    X,
    Y,
    Z,
}

impl LinearAxis {
    pub const ALL: [LinearAxis; 3] = [LinearAxis::X, LinearAxis::Y, LinearAxis::Z];

    /// Component index (x = 0, y = 1, z = 2)
    #[inline]
    pub fn index(self) -> usize {
        match self {
            LinearAxis::X => 0,
            LinearAxis::Y => 1,
            LinearAxis::Z => 2,
        }
    }

    /// Unit direction in the gizmo's local frame
    #[inline]
    pub fn unit(self) -> [f32; 3] {
        let mut v = [0.0; 3];
        v[self.index()] = 1.0;
        v
    }
}

/// A pair of axes spanning a plane handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlanarAxis {
    XY,
    XZ,
    YZ,
}

impl PlanarAxis {
    pub const ALL: [PlanarAxis; 3] = [PlanarAxis::XY, PlanarAxis::XZ, PlanarAxis::YZ];

    /// The two axes spanning the plane, in (u, v) order
    pub fn axes(self) -> (LinearAxis, LinearAxis) {
        match self {
            PlanarAxis::XY => (LinearAxis::X, LinearAxis::Y),
            PlanarAxis::XZ => (LinearAxis::X, LinearAxis::Z),
            PlanarAxis::YZ => (LinearAxis::Y, LinearAxis::Z),
        }
    }

    /// The axis perpendicular to the plane
    pub fn normal_axis(self) -> LinearAxis {
        match self {
            PlanarAxis::XY => LinearAxis::Z,
            PlanarAxis::XZ => LinearAxis::Y,
            PlanarAxis::YZ => LinearAxis::X,
        }
    }
}

/// A gizmo handle.
///
/// Used both as the hover/active selector and as the key for direction and
/// plane lookups, so every consumer matches on it exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GizmoAxis {
    /// Single-axis arrow (translate/scale) or ring (rotate)
    Linear(LinearAxis),
    /// Two-axis plane handle
    Planar(PlanarAxis),
    /// View-aligned center handle
    Uniform,
    /// Mode-switch hotspot
    Switch,
}

impl GizmoAxis {
    pub fn is_switch(self) -> bool {
        matches!(self, GizmoAxis::Switch)
    }

    /// Which scale components a drag on this handle may change
    pub fn scale_mask(self) -> [bool; 3] {
        match self {
            GizmoAxis::Linear(axis) => {
                let mut mask = [false; 3];
                mask[axis.index()] = true;
                mask
            }
            GizmoAxis::Planar(plane) => {
                let (a, b) = plane.axes();
                let mut mask = [false; 3];
                mask[a.index()] = true;
                mask[b.index()] = true;
                mask
            }
            GizmoAxis::Uniform => [true; 3],
            GizmoAxis::Switch => [false; 3],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_cycle() {
        let mode = GizmoMode::Translate;
        assert_eq!(mode.next(), GizmoMode::Rotate);
        assert_eq!(mode.next().next(), GizmoMode::Scale);
        assert_eq!(mode.next().next().next(), GizmoMode::Translate);
    }

    #[test]
    fn test_plane_normal_is_missing_axis() {
        for plane in PlanarAxis::ALL {
            let (a, b) = plane.axes();
            let n = plane.normal_axis();
            assert_ne!(a, n);
            assert_ne!(b, n);
            assert_ne!(a, b);
        }
    }

    #[test]
    fn test_scale_mask() {
        assert_eq!(GizmoAxis::Linear(LinearAxis::X).scale_mask(), [true, false, false]);
        assert_eq!(GizmoAxis::Planar(PlanarAxis::YZ).scale_mask(), [false, true, true]);
        assert_eq!(GizmoAxis::Uniform.scale_mask(), [true; 3]);
        assert_eq!(GizmoAxis::Switch.scale_mask(), [false; 3]);
    }

    #[test]
    fn test_axis_json_shape() {
        let json = serde_json::to_string(&GizmoAxis::Planar(PlanarAxis::XZ)).unwrap();
        assert_eq!(json, r#"{"Planar":"XZ"}"#);
        let back: GizmoAxis = serde_json::from_str(&json).unwrap();
        assert_eq!(back, GizmoAxis::Planar(PlanarAxis::XZ));
    }
}
