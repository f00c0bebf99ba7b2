//! Storage ports: Traits for persisting cohorts and trained bundles.
//!
//! These traits abstract the file formats (CSV, JSON) from the pipeline.

use crate::domain::{ArtifactBundle, CohortDataset};

/// Trait for artifact bundle persistence.
///
/// A bundle is always saved and loaded as a pair; implementations must never
/// hand out a scaler without its matching classifier.
pub trait ArtifactStore: Send + Sync {
    /// Error type for artifact operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Persist a bundle, replacing any previous one.
    ///
    /// # Errors
    /// Returns error if the bundle cannot be written.
    fn save_bundle(&self, bundle: &ArtifactBundle) -> Result<(), Self::Error>;

    /// Load and verify a bundle.
    ///
    /// # Errors
    /// Returns error if the bundle is missing, incomplete or corrupt.
    fn load_bundle(&self) -> Result<ArtifactBundle, Self::Error>;

    /// Check whether a bundle appears to be present (not verified).
    fn has_bundle(&self) -> bool;
}

/// Trait for cohort dataset persistence.
pub trait CohortStore {
    /// Error type for dataset operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Write a dataset in its current order.
    ///
    /// # Errors
    /// Returns error if the dataset cannot be written.
    fn write_cohort(&self, dataset: &CohortDataset) -> Result<(), Self::Error>;

    /// Read a dataset, validating the schema.
    ///
    /// # Errors
    /// Returns error on missing columns, invalid labels or I/O failure.
    fn read_cohort(&self) -> Result<CohortDataset, Self::Error>;
}
