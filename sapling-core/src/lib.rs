//! Procedural tree generation after Weber and Penn.
//!
//! Main components:
//! - [`config`]: the parameter set and its preset format.
//! - [`rng`]: the seeded random source threaded through a run.
//! - [`envelope`]: silhouette and pruning-envelope functions.
//! - [`tree`]: the stem arena.
//! - [`growth`]: recursive stem construction with splitting and pruning.
//! - [`curve`]: Bezier control points for each stem.
//! - [`leaves`]: leaf cards on terminal stems.
//! - [`armature`]: bones and wind sway.
//! - [`phases`]: the [`phases::generate`] pipeline.
//! - [`error`]: parameter errors and generation notices.
//! - [`types`]: shared type aliases and IDs.

pub mod armature;
pub mod config;
pub mod curve;
pub mod envelope;
pub mod error;
pub mod growth;
pub mod leaves;
pub mod phases;
pub mod rng;
pub mod tree;
pub mod types;
