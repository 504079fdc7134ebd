//! # Application Configuration
//!
//! `geodash.toml` holds the pipeline knobs and per-generator overrides:
//!
//! ```toml
//! [pipeline]
//! max_objects = 1000
//! acceptable_difference = 2.0
//! inception_levels = 4
//!
//! [generators.circumcircle]
//! active = false
//!
//! [generators.midpoint]
//! is_deep = true
//! relevancy_ratio = 0.8
//! ```
//!
//! Command line flags override file values.

use geodash_core::{
    GeodashError, GeneratorSettings, Pipeline, PipelineConfig, TemporalPositioning, generators,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Maximum config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

/// Partial settings for one generator. Unset fields keep the generator's own
/// value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorOverride {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_deep: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_sequential: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generates_inheritable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relevancy_ratio: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temporal_positioning: Option<TemporalPositioning>,
}

impl GeneratorOverride {
    /// `base` with every set field replaced.
    #[must_use]
    pub fn apply_to(&self, base: &GeneratorSettings) -> GeneratorSettings {
        GeneratorSettings {
            is_deep: self.is_deep.unwrap_or(base.is_deep),
            is_sequential: self.is_sequential.unwrap_or(base.is_sequential),
            generates_inheritable: self
                .generates_inheritable
                .unwrap_or(base.generates_inheritable),
            relevancy_ratio: self.relevancy_ratio.unwrap_or(base.relevancy_ratio),
            input_predicate: base.input_predicate.clone(),
            temporal_positioning: self
                .temporal_positioning
                .unwrap_or(base.temporal_positioning),
        }
    }
}

/// Pipeline values given on the command line.
#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineOverrides {
    pub max_objects: Option<usize>,
    pub acceptable_difference: Option<f64>,
    pub inception_levels: Option<usize>,
}

/// Contents of `geodash.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub pipeline: PipelineConfig,
    pub generators: BTreeMap<String, GeneratorOverride>,
}

impl AppConfig {
    /// Parse a config from TOML text and validate the pipeline section.
    pub fn from_toml(text: &str) -> Result<Self, GeodashError> {
        let config: Self = toml::from_str(text)
            .map_err(|e| GeodashError::SerializationError(format!("Parse config: {}", e)))?;
        config.pipeline.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, GeodashError> {
        toml::to_string_pretty(self)
            .map_err(|e| GeodashError::SerializationError(format!("Write config: {}", e)))
    }

    /// Read a config file.
    pub fn load(path: &Path) -> Result<Self, GeodashError> {
        let metadata = std::fs::metadata(path)
            .map_err(|e| GeodashError::IoError(format!("Cannot read config metadata: {}", e)))?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(GeodashError::InvalidConfig(format!(
                "Config size {} bytes exceeds maximum allowed {} bytes",
                metadata.len(),
                MAX_CONFIG_FILE_SIZE
            )));
        }
        let text = std::fs::read_to_string(path)
            .map_err(|e| GeodashError::IoError(format!("Read config: {}", e)))?;
        Self::from_toml(&text)
    }

    /// Read a config file, falling back to defaults when it does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, GeodashError> {
        if path.exists() {
            tracing::debug!("Loading config from {:?}", path);
            Self::load(path)
        } else {
            tracing::debug!("No config at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    /// The config `geodash init` writes: defaults plus an entry for every
    /// built-in generator.
    #[must_use]
    pub fn template() -> Self {
        let generators = generators::builtin()
            .iter()
            .map(|generator| {
                (
                    generator.name().to_string(),
                    GeneratorOverride {
                        active: Some(generator.is_active()),
                        ..GeneratorOverride::default()
                    },
                )
            })
            .collect();
        Self {
            pipeline: PipelineConfig::default(),
            generators,
        }
    }

    /// Replace pipeline values with the ones given on the command line.
    pub fn apply_overrides(&mut self, overrides: PipelineOverrides) -> Result<(), GeodashError> {
        if let Some(max_objects) = overrides.max_objects {
            self.pipeline.max_objects = max_objects;
        }
        if let Some(tolerance) = overrides.acceptable_difference {
            self.pipeline.acceptable_difference = tolerance;
        }
        if let Some(levels) = overrides.inception_levels {
            self.pipeline.inception_levels = levels;
        }
        self.pipeline.validate()
    }

    /// An empty pipeline with the built-in generators registered and the
    /// generator overrides applied.
    pub fn build_pipeline(&self) -> Result<Pipeline, GeodashError> {
        let mut pipeline = Pipeline::new(self.pipeline)?;
        for generator in generators::builtin() {
            pipeline.register(generator)?;
        }

        for (name, entry) in &self.generators {
            let Some(generator) = pipeline.registry().find(name) else {
                tracing::warn!(generator = %name, "config names an unknown generator");
                return Err(GeodashError::UnknownGenerator(name.clone()));
            };
            let id = generator.id();
            let settings = entry.apply_to(generator.settings());
            pipeline.set_generator_settings(id, settings)?;
            if let Some(active) = entry.active {
                pipeline.set_generator_active(id, active);
            }
        }
        Ok(pipeline)
    }
}
