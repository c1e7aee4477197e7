//! Pointer input as seen by the core.
//!
//! The host converts mouse, stylus or touch input into a world-space ray plus
//! an optional surface hit. The core never looks at screen coordinates.

use serde::{Deserialize, Serialize};

/// A world-space pointer sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerRay {
    pub origin: [f32; 3],
    /// Need not be normalized
    pub direction: [f32; 3],
    /// Stylus pressure in [0, 1]; `None` for devices without pressure
    pub pressure: Option<f32>,
    /// UV of the paintable surface under the pointer, if any
    pub uv: Option<[f32; 2]>,
}

impl PointerRay {
    pub fn new(origin: [f32; 3], direction: [f32; 3]) -> Self {
        Self {
            origin,
            direction,
            pressure: None,
            uv: None,
        }
    }

    pub fn with_pressure(mut self, pressure: f32) -> Self {
        self.pressure = Some(pressure.clamp(0.0, 1.0));
        self
    }

    pub fn with_uv(mut self, uv: [f32; 2]) -> Self {
        self.uv = Some(uv);
        self
    }

    /// Pressure to use for brush response; mice report full pressure
    pub fn effective_pressure(&self) -> f32 {
        self.pressure.unwrap_or(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pressure_is_clamped() {
        let ray = PointerRay::new([0.0; 3], [0.0, 0.0, -1.0]).with_pressure(1.7);
        assert_eq!(ray.pressure, Some(1.0));
    }

    #[test]
    fn test_mouse_reports_full_pressure() {
        let ray = PointerRay::new([0.0; 3], [0.0, 0.0, -1.0]);
        assert_eq!(ray.effective_pressure(), 1.0);
    }
}
