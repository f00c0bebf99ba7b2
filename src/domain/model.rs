//! Multinomial linear classifier parameters.

use serde::{Deserialize, Serialize};

use super::features::{FeatureArray, NUM_FEATURES};
use super::risk::{RiskLabel, NUM_CLASSES};

/// Numerically stable softmax.
#[must_use]
pub fn softmax(logits: &[f64; NUM_CLASSES]) -> [f64; NUM_CLASSES] {
    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exp = logits.map(|z| (z - max).exp());
    let sum: f64 = exp.iter().sum();
    exp.map(|e| e / sum)
}

/// Jointly normalized linear model over the four risk categories.
///
/// Row `k` of `weights` and `bias[k]` score `labels[k]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierModel {
    pub labels: [RiskLabel; NUM_CLASSES],
    pub weights: [FeatureArray; NUM_CLASSES],
    pub bias: [f64; NUM_CLASSES],
}

impl ClassifierModel {
    /// Model with all parameters at zero (uniform probabilities).
    #[must_use]
    pub fn zeros() -> Self {
        Self {
            labels: RiskLabel::ALL,
            weights: [[0.0; NUM_FEATURES]; NUM_CLASSES],
            bias: [0.0; NUM_CLASSES],
        }
    }

    /// Raw class scores for a scaled feature vector.
    #[must_use]
    pub fn logits(&self, scaled: &FeatureArray) -> [f64; NUM_CLASSES] {
        let mut out = self.bias;
        for (z, row) in out.iter_mut().zip(&self.weights) {
            *z += row.iter().zip(scaled).map(|(w, x)| w * x).sum::<f64>();
        }
        out
    }

    /// Class probabilities in `labels` order.
    #[must_use]
    pub fn predict_proba(&self, scaled: &FeatureArray) -> [f64; NUM_CLASSES] {
        softmax(&self.logits(scaled))
    }

    /// Reorder probabilities from `labels` order into `RiskLabel::ALL` order.
    #[must_use]
    pub fn to_canonical_order(&self, probabilities: &[f64; NUM_CLASSES]) -> [f64; NUM_CLASSES] {
        let mut out = [0.0; NUM_CLASSES];
        for (label, p) in self.labels.iter().zip(probabilities) {
            out[label.index()] = *p;
        }
        out
    }

    /// Check the parameters are usable for scoring.
    ///
    /// # Errors
    /// Returns a description of the first problem found.
    pub fn check(&self) -> Result<(), String> {
        let mut seen = [false; NUM_CLASSES];
        for label in &self.labels {
            if std::mem::replace(&mut seen[label.index()], true) {
                return Err(format!("label {} appears twice in class ordering", label.as_str()));
            }
        }
        let finite = self
            .weights
            .iter()
            .flatten()
            .chain(&self.bias)
            .all(|v| v.is_finite());
        if !finite {
            return Err("classifier parameters contain non-finite values".into());
        }
        Ok(())
    }
}
