use serde::{Deserialize, Serialize};

/// How a stamp combines with the pixels under it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[repr(u8)]
pub enum BlendMode {
    /// Straight-alpha source-over
    #[default]
    Normal = 0,
    /// Destination-out: only the stamp's alpha matters
    Erase = 1,
}

/// Straight-alpha RGBA color, components in [0, 1]
pub type Rgba = [f32; 4];

pub const TRANSPARENT: Rgba = [0.0, 0.0, 0.0, 0.0];
