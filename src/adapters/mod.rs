//! Adapters layer: Concrete implementations of ports.
//!
//! - `logistic`: multinomial logistic regression solver
//! - `dataset`: CSV cohort files
//! - `artifacts`: JSON artifact bundles with SHA-256 manifest
//! - `sanitize`: redaction of screening data in logs

pub mod artifacts;
pub mod dataset;
pub mod logistic;
pub mod sanitize;

pub use artifacts::{ArtifactError, JsonArtifactStore};
pub use dataset::{CsvCohortStore, DatasetError};
pub use logistic::{MultinomialLogisticRegression, SolverConfig};
