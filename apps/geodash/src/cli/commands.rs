//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use crate::config::{AppConfig, PipelineOverrides};
use geodash_core::{
    DVec2, GeodashError, Geometry, MapElement, Pipeline, PipelineSnapshot, ViewMode,
    primitives::MAX_INPUT_ELEMENTS, snap,
};
use std::path::{Path, PathBuf};

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum file size for map elements (100 MB).
///
/// This prevents memory exhaustion from malicious or accidental large files.
const MAX_ELEMENTS_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), GeodashError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| GeodashError::IoError(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(GeodashError::SerializationError(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Validate an input path.
///
/// Canonicalizes the path (resolving symlinks and ".."), and ensures it
/// names an existing regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, GeodashError> {
    let canonical = path.canonicalize().map_err(|e| {
        GeodashError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(GeodashError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), GeodashError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| GeodashError::SerializationError(format!("Encode output: {}", e)))?;
    println!("{}", text);
    Ok(())
}

// =============================================================================
// SHARED LOADING
// =============================================================================

/// Read map elements from a JSON array file.
pub fn load_elements(file: &Path) -> Result<Vec<MapElement>, GeodashError> {
    let validated_path = validate_file_path(file)?;
    validate_file_size(&validated_path, MAX_ELEMENTS_FILE_SIZE)?;

    let contents = std::fs::read(&validated_path)
        .map_err(|e| GeodashError::IoError(format!("Read file: {}", e)))?;
    let elements: Vec<MapElement> = serde_json::from_slice(&contents)
        .map_err(|e| GeodashError::InvalidElement(format!("Parse elements: {}", e)))?;

    if elements.len() > MAX_INPUT_ELEMENTS {
        return Err(GeodashError::InvalidElement(format!(
            "Element count {} exceeds maximum allowed {}",
            elements.len(),
            MAX_INPUT_ELEMENTS
        )));
    }
    Ok(elements)
}

/// Load the config, apply command line overrides, and run the pipeline over
/// the elements of `file`.
pub fn build_pipeline(
    config_path: &Path,
    overrides: PipelineOverrides,
    file: &Path,
) -> Result<Pipeline, GeodashError> {
    let mut config = AppConfig::load_or_default(config_path)?;
    config.apply_overrides(overrides)?;

    let elements = load_elements(file)?;
    tracing::info!("Loaded {} elements from {:?}", elements.len(), file);

    let mut pipeline = config.build_pipeline()?;
    let report = pipeline.ingest(&elements)?;
    tracing::debug!(
        added = report.added,
        rejected = report.rejected,
        "input layer reconciled"
    );
    Ok(pipeline)
}

fn describe(geometry: &Geometry) -> String {
    let kind = geometry.kind();
    match geometry {
        Geometry::Point(p) => format!("{:<6} ({:.2}, {:.2})", kind, p.x, p.y),
        Geometry::Line(line) => {
            let normal = line.normal();
            format!(
                "{:<6} normal ({:.3}, {:.3}) offset {:.2}",
                kind,
                normal.x,
                normal.y,
                line.offset()
            )
        }
        Geometry::Circle(circle) => format!(
            "{:<6} ({:.2}, {:.2}) r {:.2}",
            kind, circle.centre.x, circle.centre.y, circle.radius
        ),
    }
}

// =============================================================================
// RUN COMMAND
// =============================================================================

/// Build every layer and print the visible ones.
pub fn cmd_run(
    config_path: &Path,
    overrides: PipelineOverrides,
    json_mode: bool,
    file: &Path,
    view: ViewMode,
) -> Result<(), GeodashError> {
    let pipeline = build_pipeline(config_path, overrides, file)?;
    let snapshot = PipelineSnapshot::capture(&pipeline, view);

    if json_mode {
        return print_json(&snapshot);
    }

    println!("Geodash Layers");
    println!("==============");
    println!("Max Objects: {}", snapshot.config.max_objects);
    println!("Tolerance:   {}", snapshot.config.acceptable_difference);
    println!("Levels:      {}", snapshot.config.inception_levels);
    println!("Total Nodes: {}", pipeline.len());

    for layer in &snapshot.layers {
        println!();
        println!("Layer {} ({} nodes)", layer.level, layer.nodes.len());
        for node in &layer.nodes {
            println!(
                "  #{:<6} t={:<10.1} rel={:.2}  {}{}",
                node.id.0,
                node.time,
                node.relevancy,
                describe(&node.geometry),
                node.generator
                    .as_deref()
                    .map(|name| format!("  [{}]", name))
                    .unwrap_or_default()
            );
        }
    }

    Ok(())
}

// =============================================================================
// SNAP COMMAND
// =============================================================================

/// Cursor position and search radius for `snap`.
#[derive(Debug, Clone, Copy)]
pub struct SnapQuery {
    pub x: f64,
    pub y: f64,
    pub max_distance: f64,
    pub view: ViewMode,
}

/// Print the suggestion nearest to the cursor, if any is in range.
pub fn cmd_snap(
    config_path: &Path,
    overrides: PipelineOverrides,
    json_mode: bool,
    file: &Path,
    query: SnapQuery,
) -> Result<(), GeodashError> {
    if !query.max_distance.is_finite() || query.max_distance < 0.0 {
        return Err(GeodashError::InvalidConfig(format!(
            "max_distance must be a finite non-negative number, got {}",
            query.max_distance
        )));
    }

    let pipeline = build_pipeline(config_path, overrides, file)?;
    let target = snap(
        &pipeline,
        DVec2::new(query.x, query.y),
        query.view,
        query.max_distance,
    );

    if json_mode {
        return print_json(&serde_json::json!({ "target": target }));
    }

    match target {
        Some(target) => {
            let geometry = pipeline
                .node(target.node)
                .map(|node| describe(node.geometry()))
                .unwrap_or_default();
            println!(
                "Snapped to #{} at ({:.2}, {:.2}), distance {:.2}",
                target.node.0, target.point.x, target.point.y, target.distance
            );
            println!("  {}", geometry);
        }
        None => println!("Nothing within {} of ({}, {})", query.max_distance, query.x, query.y),
    }
    Ok(())
}

// =============================================================================
// GENERATORS COMMAND
// =============================================================================

/// List generators with the settings the config gives them.
pub fn cmd_generators(config_path: &Path, json_mode: bool) -> Result<(), GeodashError> {
    let config = AppConfig::load_or_default(config_path)?;
    let pipeline = config.build_pipeline()?;

    if json_mode {
        let output: Vec<_> = pipeline
            .registry()
            .iter()
            .map(|generator| {
                serde_json::json!({
                    "name": generator.name(),
                    "category": generator.category(),
                    "active": generator.is_active(),
                    "settings": generator.settings(),
                })
            })
            .collect();
        return print_json(&output);
    }

    println!("Geodash Generators");
    println!("==================");
    for generator in pipeline.registry().iter() {
        let settings = generator.settings();
        println!(
            "{:<26} {:<10} {:<8} deep={:<5} sequential={:<5} ratio={}",
            generator.name(),
            generator.category(),
            if generator.is_active() { "active" } else { "inactive" },
            settings.is_deep,
            settings.is_sequential,
            settings.relevancy_ratio
        );
    }
    Ok(())
}

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Write a starter config file.
pub fn cmd_init(config_path: &Path, force: bool) -> Result<(), GeodashError> {
    if config_path.exists() && !force {
        return Err(GeodashError::IoError(format!(
            "Config '{}' already exists. Use --force to overwrite.",
            config_path.display()
        )));
    }

    let text = AppConfig::template().to_toml()?;
    std::fs::write(config_path, text)
        .map_err(|e| GeodashError::IoError(format!("Write config: {}", e)))?;

    tracing::info!("Wrote {:?}", config_path);
    println!("Initialized config at {:?}", config_path);
    Ok(())
}
