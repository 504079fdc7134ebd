//! # Pipeline Configuration
//!
//! The global knobs of a pipeline, passed explicitly at construction and
//! changed only through the pipeline's setters.

use crate::primitives::{
    DEFAULT_ACCEPTABLE_DIFFERENCE, DEFAULT_INCEPTION_LEVELS, DEFAULT_MAX_OBJECTS,
    MAX_INCEPTION_LEVELS,
};
use crate::types::GeodashError;
use serde::{Deserialize, Serialize};

/// Global settings shared by every layer of a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Node budget per layer.
    pub max_objects: usize,
    /// Merge tolerance used by every similarity lookup.
    pub acceptable_difference: f64,
    /// Number of generated layers after the input layer.
    pub inception_levels: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_objects: DEFAULT_MAX_OBJECTS,
            acceptable_difference: DEFAULT_ACCEPTABLE_DIFFERENCE,
            inception_levels: DEFAULT_INCEPTION_LEVELS,
        }
    }
}

impl PipelineConfig {
    /// Check every value is in range.
    pub fn validate(&self) -> Result<(), GeodashError> {
        if self.max_objects == 0 {
            return Err(GeodashError::InvalidConfig(
                "max_objects must be at least 1".to_string(),
            ));
        }
        if !self.acceptable_difference.is_finite() || self.acceptable_difference < 0.0 {
            return Err(GeodashError::InvalidConfig(format!(
                "acceptable_difference must be a finite non-negative number, got {}",
                self.acceptable_difference
            )));
        }
        if self.inception_levels > MAX_INCEPTION_LEVELS {
            return Err(GeodashError::InvalidConfig(format!(
                "inception_levels must be at most {}, got {}",
                MAX_INCEPTION_LEVELS, self.inception_levels
            )));
        }
        Ok(())
    }

    /// Total layer count, input layer included.
    #[must_use]
    pub fn layer_count(&self) -> usize {
        self.inception_levels.saturating_add(1)
    }
}
