//! Impasto painting core - canvases, brushes and stencil projection
//!
//! This crate holds everything that touches pixels:
//! - [`surface`] / [`tiles`] - CPU RGBA canvas with tile dirty tracking
//! - [`layer`] - Layer stack and flattened composite
//! - [`brush`] / [`stroke`] - Brush settings, tip masks and spaced stamping
//! - [`curve`] - Cubic Bezier paths over a sphere shell
//! - [`stencil`] - Deformable stencil grid, inverse-warp LUT and projection bake
//! - [`raycast`] / [`raster`] / [`math`] - Geometry helpers shared by the above

pub mod brush;
pub mod constants;
pub mod curve;
pub mod layer;
pub mod math;
pub mod raster;
pub mod raycast;
pub mod stencil;
pub mod stroke;
pub mod surface;
pub mod tiles;
pub mod types;
pub mod validation;

pub use brush::*;
pub use constants::*;
pub use curve::*;
pub use layer::*;
pub use math::*;
pub use raycast::*;
pub use stencil::*;
pub use stroke::*;
pub use surface::*;
pub use tiles::*;
pub use types::*;
pub use validation::*;
