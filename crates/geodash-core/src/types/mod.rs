//! # Core Type Definitions
//!
//! This module contains the small value types shared by every part of the
//! Geodash engine:
//! - Handles (`NodeId`, `GeneratorId`)
//! - Classification (`GeometryKind`, `Origin`, `TemporalPositioning`)
//! - Input seeds (`NodeSeed`)
//! - Error types (`GeodashError`)
//!
//! ## Determinism Guarantees
//!
//! Handles are monotonic integers and implement `Ord`, so every container in
//! the engine can be a `BTreeMap`/`BTreeSet` and iteration order never depends
//! on hashing.

use crate::geometry::Geometry;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// HANDLES
// =============================================================================

/// Stable handle of a node in the pipeline's node arena.
///
/// Handles are never reused. A handle whose node was disposed simply stops
/// resolving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u64);

/// Handle of a registered generator. Assigned by the registry in
/// registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GeneratorId(pub u32);

// =============================================================================
// CLASSIFICATION
// =============================================================================

/// The type classifier used to index collections and to type generator inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeometryKind {
    Point,
    Line,
    Circle,
}

impl GeometryKind {
    /// Lowercase name, as used in config files and CLI output.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            GeometryKind::Point => "point",
            GeometryKind::Line => "line",
            GeometryKind::Circle => "circle",
        }
    }
}

impl std::fmt::Display for GeometryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.name())
    }
}

/// How a derived node's time is computed from its parents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemporalPositioning {
    /// Mean of the parents' times.
    #[default]
    Average,
    /// Earliest parent time.
    Before,
    /// Latest parent time.
    After,
    /// The generator supplies the time; falls back to `Average` when it does not.
    Custom,
}

/// Where a node came from. Decides which reconciliation sweep may remove it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    /// Primitive supplied through the input boundary into layer 0.
    Input,
    /// Produced by a generator during a regeneration pass.
    Generated(GeneratorId),
    /// Locked copy or hand-inserted node. Never swept.
    Manual,
}

impl Origin {
    /// The producing generator, if any.
    #[must_use]
    pub fn generator(&self) -> Option<GeneratorId> {
        match self {
            Origin::Generated(id) => Some(*id),
            Origin::Input | Origin::Manual => None,
        }
    }
}

// =============================================================================
// NODE SEED
// =============================================================================

/// A primitive handed to the pipeline from outside: geometry plus the
/// externally assigned time and relevancy. Seeds carry no links.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSeed {
    pub geometry: Geometry,
    pub time: f64,
    #[serde(default = "full_relevancy")]
    pub relevancy: f64,
}

fn full_relevancy() -> f64 {
    1.0
}

impl NodeSeed {
    /// Seed with full relevancy.
    #[must_use]
    pub fn new(geometry: Geometry, time: f64) -> Self {
        Self {
            geometry,
            time,
            relevancy: 1.0,
        }
    }

    /// Override the relevancy.
    #[must_use]
    pub fn with_relevancy(mut self, relevancy: f64) -> Self {
        self.relevancy = relevancy;
        self
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur at the fallible seams of Geodash.
///
/// The engine itself never fails: operations on stale handles are no-ops.
/// Only configuration, registration and the outer boundaries return errors.
#[derive(Debug, Error)]
pub enum GeodashError {
    /// A pipeline or generator configuration value is out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A generator with the same name is already registered.
    #[error("Duplicate generator: {0}")]
    DuplicateGenerator(String),

    /// A generator cannot be registered as declared.
    #[error("Invalid generator: {0}")]
    InvalidGenerator(String),

    /// A configuration entry names a generator that is not registered.
    #[error("Unknown generator: {0}")]
    UnknownGenerator(String),

    /// A source element cannot be turned into primitives.
    #[error("Invalid input element: {0}")]
    InvalidElement(String),

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),
}

// =============================================================================
// TESTS
// =============================================================================
