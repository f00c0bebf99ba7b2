//! Risk categories and prediction results.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Number of risk categories.
pub const NUM_CLASSES: usize = 4;

/// Sentinel label for a class index outside the known categories.
pub const UNKNOWN_LABEL: &str = "unknown";

/// Ordinal mental-health risk category.
///
/// Ordering follows severity, even though the classifier treats the
/// categories as unordered.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum RiskLabel {
    /// No significant indicators
    Low,
    /// Follow-up recommended
    Moderate,
    /// Clinician outreach recommended
    High,
    /// Acute crisis, immediate escalation
    Crisis,
}

impl RiskLabel {
    /// All labels in class-index order.
    pub const ALL: [RiskLabel; NUM_CLASSES] = [Self::Low, Self::Moderate, Self::High, Self::Crisis];

    /// Class index used by the dataset file and the classifier (0-3).
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Self::Low => 0,
            Self::Moderate => 1,
            Self::High => 2,
            Self::Crisis => 3,
        }
    }

    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Wire name of the label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Moderate => "moderate",
            Self::High => "high",
            Self::Crisis => "crisis",
        }
    }

    /// Wire name for a class index, `"unknown"` when the index is out of range.
    #[must_use]
    pub fn name_for_index(index: usize) -> &'static str {
        Self::from_index(index).map_or(UNKNOWN_LABEL, Self::as_str)
    }

    /// Get a human-readable description.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Low => "Low risk - No significant indicators",
            Self::Moderate => "Moderate risk - Follow-up recommended",
            Self::High => "High risk - Clinician outreach recommended",
            Self::Crisis => "Crisis - Immediate escalation required",
        }
    }
}

impl std::fmt::Display for RiskLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "LOW"),
            Self::Moderate => write!(f, "MODERATE"),
            Self::High => write!(f, "HIGH"),
            Self::Crisis => write!(f, "CRISIS"),
        }
    }
}

/// Index of the largest value; ties resolve to the lowest index.
#[must_use]
pub fn argmax(values: &[f64]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f64)>, (i, &v)| match best {
            Some((_, b)) if b >= v => best,
            _ => Some((i, v)),
        })
        .map(|(i, _)| i)
}

/// Scored output of the classifier for one feature vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskPrediction {
    /// Most probable category
    pub label: RiskLabel,

    /// Probability of `label` (0.0 to 1.0)
    pub confidence: f64,

    /// Probability of every category; always holds all four
    pub probabilities: BTreeMap<RiskLabel, f64>,
}

impl RiskPrediction {
    /// Build a prediction from class probabilities in `RiskLabel::ALL` order.
    #[must_use]
    pub fn from_probabilities(probabilities: [f64; NUM_CLASSES]) -> Self {
        let best = argmax(&probabilities).unwrap_or(0);
        Self {
            label: RiskLabel::ALL[best],
            confidence: probabilities[best],
            probabilities: RiskLabel::ALL.into_iter().zip(probabilities).collect(),
        }
    }

    #[must_use]
    pub fn probability(&self, label: RiskLabel) -> f64 {
        self.probabilities.get(&label).copied().unwrap_or(0.0)
    }
}

/// Response body returned at the service boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    /// One of the four label names, or `"unknown"`
    pub risk: String,
    pub confidence: f64,
    pub probabilities: BTreeMap<RiskLabel, f64>,
}

impl From<&RiskPrediction> for PredictionResponse {
    fn from(prediction: &RiskPrediction) -> Self {
        Self {
            risk: prediction.label.as_str().to_string(),
            confidence: prediction.confidence,
            probabilities: prediction.probabilities.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_roundtrip() {
        for (i, label) in RiskLabel::ALL.iter().enumerate() {
            assert_eq!(label.index(), i);
            assert_eq!(RiskLabel::from_index(i), Some(*label));
        }
        assert_eq!(RiskLabel::from_index(4), None);
    }

    #[test]
    fn test_unknown_sentinel() {
        assert_eq!(RiskLabel::name_for_index(3), "crisis");
        assert_eq!(RiskLabel::name_for_index(7), UNKNOWN_LABEL);
    }

    #[test]
    fn test_argmax_ties_pick_lowest() {
        assert_eq!(argmax(&[0.1, 0.4, 0.4, 0.1]), Some(1));
        assert_eq!(argmax(&[0.7, 0.1, 0.1, 0.1]), Some(0));
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn test_prediction_from_probabilities() {
        let prediction = RiskPrediction::from_probabilities([0.05, 0.15, 0.2, 0.6]);
        assert_eq!(prediction.label, RiskLabel::Crisis);
        assert!((prediction.confidence - 0.6).abs() < f64::EPSILON);
        assert_eq!(prediction.probabilities.len(), NUM_CLASSES);
        assert!((prediction.probability(RiskLabel::Low) - 0.05).abs() < f64::EPSILON);
    }

    #[test]
    fn test_response_serializes_label_names() {
        let prediction = RiskPrediction::from_probabilities([0.7, 0.2, 0.1, 0.0]);
        let response = PredictionResponse::from(&prediction);
        let json = serde_json::to_value(&response).expect("Should serialize");

        assert_eq!(json["risk"], "low");
        let probs = json["probabilities"].as_object().expect("map");
        for name in ["low", "moderate", "high", "crisis"] {
            assert!(probs.contains_key(name), "missing {name}");
        }
    }
}
