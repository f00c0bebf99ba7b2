//! The trained artifact pair: scaling transform + classifier.
//!
//! The two halves are only valid together. A bundle carries an id derived
//! from the content of both, so a scaler from one training run can never be
//! paired with a classifier from another.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::features::{FEATURE_NAMES, NUM_FEATURES};
use super::model::ClassifierModel;
use super::scaling::ScalingTransform;

/// On-disk format version of the artifact bundle.
pub const BUNDLE_FORMAT_VERSION: u32 = 1;

/// Facts about the run that produced a bundle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingSummary {
    pub seed: u64,
    pub train_size: usize,
    pub test_size: usize,
    pub iterations: usize,
    pub converged: bool,
    pub accuracy: f64,
    pub crisis_recall: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactBundle {
    pub bundle_id: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub feature_names: Vec<String>,
    pub scaler: ScalingTransform,
    pub model: ClassifierModel,
    pub training: TrainingSummary,
}

impl ArtifactBundle {
    /// Pair a scaler with the classifier fit on its output.
    #[must_use]
    pub fn new(scaler: ScalingTransform, model: ClassifierModel, training: TrainingSummary) -> Self {
        Self {
            bundle_id: bundle_fingerprint(&scaler, &model),
            created_at: chrono::Utc::now(),
            feature_names: FEATURE_NAMES.iter().map(|s| (*s).to_string()).collect(),
            scaler,
            model,
            training,
        }
    }

    /// Check the pair is internally consistent and usable.
    ///
    /// # Errors
    /// Returns a description of the first inconsistency.
    pub fn check(&self) -> Result<(), String> {
        if self.feature_names.len() != NUM_FEATURES
            || self.feature_names.iter().zip(FEATURE_NAMES).any(|(a, b)| a != b)
        {
            return Err(format!(
                "feature order {:?} does not match expected {:?}",
                self.feature_names, FEATURE_NAMES
            ));
        }
        self.scaler.check()?;
        self.model.check()?;

        let expected = bundle_fingerprint(&self.scaler, &self.model);
        if expected != self.bundle_id {
            return Err(format!(
                "bundle id {} does not match content fingerprint {expected}",
                self.bundle_id
            ));
        }
        Ok(())
    }
}

/// Content fingerprint over both halves of the pair.
///
/// First 8 bytes of SHA-256 over the IEEE-754 bytes of every parameter
/// and the class ordering, hex encoded.
#[must_use]
pub fn bundle_fingerprint(scaler: &ScalingTransform, model: &ClassifierModel) -> String {
    let mut hasher = Sha256::new();
    for v in scaler.mean.iter().chain(&scaler.std) {
        hasher.update(v.to_le_bytes());
    }
    for label in &model.labels {
        hasher.update([label.index() as u8]);
    }
    for v in model.weights.iter().flatten().chain(&model.bias) {
        hasher.update(v.to_le_bytes());
    }
    let digest = hasher.finalize();

    digest[..8].iter().map(|b| format!("{b:02x}")).collect()
}
