/// Smallest stamp step in pixels. Spacing that rounds to zero would
/// otherwise never advance the stroke.
pub const MIN_STAMP_STEP: f32 = 1.0;

/// Upper bound on stamps emitted for one stroke sample. A larger jump is a
/// discontinuity (teleported pointer, corrupt input), not a path to fill.
pub const MAX_STAMPS_PER_SAMPLE: usize = 1 << 16;

/// Slack when comparing the accumulated stroke distance against the step.
pub const STAMP_STEP_TOLERANCE: f32 = 1e-3;

/// Denominators below this are treated as degenerate (parallel rays,
/// grazing planes, zero reference distances).
pub const GEOMETRY_EPSILON: f32 = 1e-6;

/// LUT alpha at or above this means the texel is covered by the grid.
pub const LUT_COVERAGE_THRESHOLD: f32 = 0.5;

/// Stencil texels with alpha below this are not projected.
pub const STENCIL_ALPHA_THRESHOLD: f32 = 0.01;
