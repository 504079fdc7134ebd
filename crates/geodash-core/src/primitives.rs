//! # Engine Primitives
//!
//! Compiled-in constants for the Geodash engine.
//!
//! Defaults are only starting points: every configurable value is passed to
//! the pipeline explicitly through `PipelineConfig`.

/// Default node budget per layer.
///
/// No layer's collection ever grows beyond this many nodes.
pub const DEFAULT_MAX_OBJECTS: usize = 1000;

/// Default merge tolerance in playfield units.
pub const DEFAULT_ACCEPTABLE_DIFFERENCE: f64 = 2.0;

/// Default number of generated layers after the input layer.
pub const DEFAULT_INCEPTION_LEVELS: usize = 4;

/// Upper bound on generated layers.
///
/// Regeneration recurses once per layer, so this bounds the call depth.
pub const MAX_INCEPTION_LEVELS: usize = 64;

/// Tolerance for degenerate geometry (coincident points, parallel lines).
pub const EPSILON: f64 = 1e-9;

/// Scale applied to the angle between two lines (radians) when measuring how
/// far apart they are, so that angle and offset share playfield units.
pub const LINE_ANGLE_WEIGHT: f64 = 100.0;

/// Maximum number of elements accepted from one input source.
pub const MAX_INPUT_ELEMENTS: usize = 100_000;

/// Depth used when a caller wants the whole ancestry or descendancy.
pub const UNBOUNDED_DEPTH: usize = usize::MAX;
