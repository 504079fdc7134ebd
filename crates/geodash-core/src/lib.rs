//! # geodash-core
//!
//! The incremental derived-geometry graph for Geodash - THE ENGINE.
//!
//! Primitives from a map (layer 0) feed a chain of layers. Each layer runs
//! every active generator over the objects upstream of it, merges
//! near-identical candidates, remembers which inputs produced what, and
//! regenerates only what an edit invalidated.
//!
//! ## Architectural Constraints
//!
//! - Nodes live in a single arena addressed by `NodeId` handles; a disposed
//!   node is simply absent from it
//! - Generators are registered explicitly through `GeneratorRegistry`
//! - Node mutations go through `Command`s applied by the pipeline
//! - Has NO async, NO I/O: every operation runs to completion in the caller

// =============================================================================
// MODULES
// =============================================================================

pub mod collection;
pub mod combiner;
pub mod command;
pub mod config;
pub mod generator;
pub mod generators;
pub mod geometry;
pub mod ingest;
pub mod layer;
pub mod node;
pub mod pipeline;
pub mod primitives;
pub mod snap;
pub mod snapshot;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    GeneratorId, GeodashError, GeometryKind, NodeId, NodeSeed, Origin, TemporalPositioning,
};

// =============================================================================
// RE-EXPORTS: Graph Engine
// =============================================================================

pub use collection::Collection;
pub use combiner::ParameterCombiner;
pub use command::Command;
pub use config::PipelineConfig;
pub use generator::{
    Generator, GeneratorCategory, GeneratorMethod, GeneratorRegistry, GeneratorSettings,
    InputPredicate, Operand, Product, SelectionPredicate,
};
pub use geometry::{Circle, Geometry, Line};
pub use layer::{AddOutcome, Layer, PassReport};
pub use node::{Node, NodeMap};
pub use pipeline::Pipeline;

// =============================================================================
// RE-EXPORTS: Boundaries
// =============================================================================

pub use ingest::{ElementKind, Ingestor, InputSource, MapElement};
pub use snap::{SnapTarget, snap};
pub use snapshot::{LayerSnapshot, NodeSnapshot, PipelineSnapshot, ViewMode};

/// Re-exported so consumers build positions with the same vector type.
pub use glam::DVec2;
