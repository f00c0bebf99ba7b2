//! Triage: Model prediction behind a hard safety rail.
//!
//! Severe signals are escalated to crisis before the model is consulted.
//! Without a model the rule-based baseline answers instead, at a fixed
//! confidence of 0.5.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::inference::{InferenceError, InferenceService};
use crate::domain::baseline;
use crate::domain::{FeatureVector, RiskLabel};

/// Where a triage decision came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionSource {
    RuleOverride,
    Ml,
    RuleFallback,
}

/// Confidence reported for rule-based fallback decisions.
pub const RULE_FALLBACK_CONFIDENCE: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriageDecision {
    pub risk: RiskLabel,
    pub confidence: f64,
    pub source: DecisionSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probabilities: Option<BTreeMap<RiskLabel, f64>>,
    /// Rules that fired, for override and baseline decisions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reasons: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

/// Severe signals that bypass the model.
#[must_use]
pub fn safety_override(features: &FeatureVector) -> Option<Vec<String>> {
    let mut reasons = Vec::new();
    if features.phq9 >= 22.0 {
        reasons.push("PHQ-9 at or above 22".to_string());
    }
    if features.quiz >= 0.9 {
        reasons.push("questionnaire severity at or above 0.9".to_string());
    }
    if features.mood_avg < 1.5 && features.chat_neg > 0.85 {
        reasons.push("very low mood with strongly negative chat".to_string());
    }
    if reasons.is_empty() {
        None
    } else {
        Some(reasons)
    }
}

#[derive(Debug, Clone)]
pub struct TriageService {
    inference: Option<Arc<InferenceService>>,
    override_enabled: bool,
}

impl TriageService {
    #[must_use]
    pub fn new(inference: Option<Arc<InferenceService>>, override_enabled: bool) -> Self {
        Self {
            inference,
            override_enabled,
        }
    }

    /// Decide a risk level for one user.
    ///
    /// # Errors
    /// Returns error only when the model rejects the features (non-finite or
    /// absurd values).
    pub fn assess(&self, features: &FeatureVector) -> Result<TriageDecision, InferenceError> {
        features.check_sane()?;
        let timestamp = Utc::now();

        if self.override_enabled {
            if let Some(reasons) = safety_override(features) {
                tracing::warn!("Safety override triggered: {}", reasons.join("; "));
                return Ok(TriageDecision {
                    risk: RiskLabel::Crisis,
                    confidence: 1.0,
                    source: DecisionSource::RuleOverride,
                    probabilities: None,
                    reasons,
                    timestamp,
                });
            }
        }

        if let Some(inference) = &self.inference {
            let prediction = inference.predict(features)?;
            return Ok(TriageDecision {
                risk: prediction.label,
                confidence: prediction.confidence,
                source: DecisionSource::Ml,
                probabilities: Some(prediction.probabilities),
                reasons: Vec::new(),
                timestamp,
            });
        }

        let assessment = baseline::assess(features);
        tracing::debug!("No model loaded; baseline score {}", assessment.score);
        Ok(TriageDecision {
            risk: assessment.label,
            // Rule scores carry no calibrated probability.
            confidence: RULE_FALLBACK_CONFIDENCE,
            source: DecisionSource::RuleFallback,
            probabilities: None,
            reasons: assessment.reasons.iter().map(|r| (*r).to_string()).collect(),
            timestamp,
        })
    }
}
