//! # SoulSupport
//!
//! Mental-health risk classification pipeline.
//!
//! This crate provides:
//! - A seeded synthetic cohort generator over seven screening signals
//! - A fit pipeline: stratified split, standardization, class-weighted
//!   multinomial logistic regression and held-out evaluation
//! - A read-only inference service over a verified artifact bundle, with an
//!   optional triage layer that escalates severe signals
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Core types (features, labels, scaler, model, reports)
//! - `ports`: Trait definitions (classifier strategy, stores)
//! - `adapters`: Concrete implementations (logistic solver, CSV, JSON bundles)
//! - `application`: Use cases orchestrating domain and ports
//! - `config` / `logging`: Environment configuration and tracing setup

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod logging;
pub mod ports;

pub use domain::{FeatureVector, RiskLabel, RiskPrediction};

/// Result type for SoulSupport operations
pub type Result<T> = std::result::Result<T, SoulSupportError>;

/// Main error type for SoulSupport
#[derive(Debug, thiserror::Error)]
pub enum SoulSupportError {
    #[error("Cohort generation failed: {0}")]
    Cohort(#[from] domain::CohortError),

    #[error("Fit failed: {0}")]
    Fit(#[from] application::FitError),

    #[error("Inference failed: {0}")]
    Inference(#[from] application::InferenceError),

    #[error("Artifact error: {0}")]
    Artifact(#[from] adapters::ArtifactError),

    #[error("Dataset error: {0}")]
    Dataset(#[from] adapters::DatasetError),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
