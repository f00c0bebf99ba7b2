//! Ports layer: Trait definitions for external operations.
//!
//! Following Hexagonal Architecture, these traits define the boundaries
//! between the pipeline and its collaborators (solver, file formats).

mod classifier;
mod storage;

pub use classifier::{ClassifierStrategy, FitOutcome};
pub use storage::{ArtifactStore, CohortStore};
