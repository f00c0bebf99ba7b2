//! Inference service: Scores feature vectors against a loaded bundle.
//!
//! The bundle is validated once at construction and then held behind an
//! `Arc`. `predict` only reads it, so one service can be shared by any number
//! of threads without locking.

use std::sync::Arc;

use thiserror::Error;

use crate::domain::{
    argmax, ArtifactBundle, FeatureError, FeatureVector, PredictionResponse, RiskLabel,
    RiskPrediction, NUM_CLASSES,
};
use crate::ports::ArtifactStore;

/// Errors from constructing the service or scoring a request.
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid features: {0}")]
    Feature(#[from] FeatureError),

    #[error("Artifact bundle unusable: {0}")]
    Bundle(String),

    #[error("Failed to load artifact bundle")]
    Load(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Read-only scoring service.
#[derive(Debug, Clone)]
pub struct InferenceService {
    bundle: Arc<ArtifactBundle>,
}

impl InferenceService {
    /// Wrap an already loaded bundle.
    ///
    /// # Errors
    /// Returns `InferenceError::Bundle` if the pair is inconsistent.
    pub fn new(bundle: ArtifactBundle) -> Result<Self, InferenceError> {
        bundle.check().map_err(InferenceError::Bundle)?;
        tracing::info!(
            "Inference service ready: bundle={}, trained_at={}",
            bundle.bundle_id,
            bundle.created_at.to_rfc3339()
        );
        Ok(Self {
            bundle: Arc::new(bundle),
        })
    }

    /// Load from a store. A missing or corrupt bundle is fatal.
    ///
    /// # Errors
    /// Returns `InferenceError::Load` when the store refuses the bundle.
    pub fn from_store<S: ArtifactStore>(store: &S) -> Result<Self, InferenceError> {
        let bundle = store
            .load_bundle()
            .map_err(|e| InferenceError::Load(Box::new(e)))?;
        Self::new(bundle)
    }

    #[must_use]
    pub fn bundle(&self) -> &ArtifactBundle {
        &self.bundle
    }

    /// Class probabilities in `RiskLabel::ALL` order.
    ///
    /// # Errors
    /// Returns error for non-finite or absurdly large values.
    pub fn probabilities(&self, features: &FeatureVector) -> Result<[f64; NUM_CLASSES], InferenceError> {
        features.check_sane()?;
        let scaled = self.bundle.scaler.transform(&features.to_array());
        let raw = self.bundle.model.predict_proba(&scaled);
        Ok(self.bundle.model.to_canonical_order(&raw))
    }

    /// Score one feature vector.
    ///
    /// Values outside the screening domains but within sane magnitude are
    /// still scored.
    ///
    /// # Errors
    /// Returns error for non-finite or absurdly large values.
    pub fn predict(&self, features: &FeatureVector) -> Result<RiskPrediction, InferenceError> {
        let probabilities = self.probabilities(features)?;
        if let Err(violations) = features.validate_domain() {
            tracing::debug!("Scoring out-of-domain request: {}", violations.join("; "));
        }
        Ok(RiskPrediction::from_probabilities(probabilities))
    }

    /// Score a positional vector in training column order.
    ///
    /// # Errors
    /// Returns error on wrong arity or insane values.
    pub fn predict_values(&self, values: &[f64]) -> Result<RiskPrediction, InferenceError> {
        let features = FeatureVector::from_slice(values)?;
        self.predict(&features)
    }

    /// Handle one JSON request body and build the response.
    ///
    /// Every field is required; unknown fields and non-numeric values are
    /// rejected.
    ///
    /// # Errors
    /// Returns `InvalidRequest` for malformed JSON or a bad schema.
    pub fn handle_request(&self, body: &str) -> Result<PredictionResponse, InferenceError> {
        let features: FeatureVector =
            serde_json::from_str(body).map_err(|e| InferenceError::InvalidRequest(e.to_string()))?;
        let probabilities = self.probabilities(&features)?;

        let best = argmax(&probabilities);
        let risk = best.map_or(crate::domain::UNKNOWN_LABEL, RiskLabel::name_for_index);
        Ok(PredictionResponse {
            risk: risk.to_string(),
            confidence: best.map_or(0.0, |i| probabilities[i]),
            probabilities: RiskLabel::ALL.into_iter().zip(probabilities).collect(),
        })
    }
}
