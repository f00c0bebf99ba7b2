//! Application layer: Use cases and services.
//!
//! This module orchestrates domain logic with ports to implement
//! cohort generation, fitting, inference and triage.

mod cohort;
mod inference;
mod training;
mod triage;

pub use cohort::CohortGenerator;
pub use inference::{InferenceError, InferenceService};
pub use training::{
    balanced_class_weights, stratified_split, FitError, FitPipeline, FitResult, Split,
    DEFAULT_TEST_FRACTION,
};
pub use triage::{
    safety_override, DecisionSource, TriageDecision, TriageService, RULE_FALLBACK_CONFIDENCE,
};
