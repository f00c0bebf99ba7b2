//! Transparent rule-based risk scoring.
//!
//! Uses common screening thresholds (PHQ-9, GAD-7, GHQ-12 bands) plus the
//! behavioral signals. Serves as a reference point for the learned model and
//! as a fallback when no model is loaded.

use super::features::{FeatureVector, MoodTrend};
use super::risk::RiskLabel;

/// Points contributed by each signal, with the reasons that fired.
#[derive(Debug, Clone, PartialEq)]
pub struct BaselineAssessment {
    pub label: RiskLabel,
    pub score: u32,
    pub reasons: Vec<&'static str>,
    /// Severe clinical and behavioral signals together
    pub crisis_override: bool,
}

fn band(value: f64, bands: &[(f64, u32, &'static str)], reasons: &mut Vec<&'static str>) -> u32 {
    for &(threshold, points, reason) in bands {
        if value >= threshold {
            reasons.push(reason);
            return points;
        }
    }
    0
}

/// Score a feature vector with fixed clinical bands.
#[must_use]
pub fn assess(features: &FeatureVector) -> BaselineAssessment {
    let mut reasons = Vec::new();
    let mut score = 0;

    score += band(
        features.phq9,
        &[
            (20.0, 6, "PHQ-9 severe (>=20)"),
            (15.0, 5, "PHQ-9 moderately severe (15-19)"),
            (10.0, 3, "PHQ-9 moderate (10-14)"),
            (5.0, 1, "PHQ-9 mild (5-9)"),
        ],
        &mut reasons,
    );
    score += band(
        features.gad7,
        &[
            (15.0, 4, "GAD-7 severe (>=15)"),
            (10.0, 2, "GAD-7 moderate (10-14)"),
            (5.0, 1, "GAD-7 mild (5-9)"),
        ],
        &mut reasons,
    );
    score += band(
        features.ghq12,
        &[
            (8.0, 3, "GHQ-12 high distress (>=8)"),
            (4.0, 1, "GHQ-12 possible distress (4-7)"),
        ],
        &mut reasons,
    );

    // Lower mood is worse; negate so the shared band helper applies.
    score += band(
        -features.mood_avg,
        &[
            (-2.0, 3, "Low average mood (<=2)"),
            (-3.0, 1, "Suboptimal average mood (<=3)"),
        ],
        &mut reasons,
    );

    let trend = features.trend();
    match trend {
        Some(MoodTrend::Declining) => {
            score += 2;
            reasons.push("Mood trend declining");
        }
        Some(MoodTrend::Stable) => {
            score += 1;
            reasons.push("Mood trend stable");
        }
        _ => {}
    }

    score += band(
        features.chat_neg,
        &[
            (0.7, 3, "High negative chat ratio (>=0.7)"),
            (0.4, 1, "Moderate negative chat ratio (>=0.4)"),
        ],
        &mut reasons,
    );
    score += band(
        features.quiz,
        &[
            (0.8, 3, "Quiz risk score very high (>=0.8)"),
            (0.5, 1, "Quiz risk score moderate (>=0.5)"),
        ],
        &mut reasons,
    );

    let clinical_severe = features.phq9 >= 20.0 || features.gad7 >= 15.0 || features.ghq12 >= 10.0;
    let behavior_severe = (features.mood_avg <= 2.0 && trend == Some(MoodTrend::Declining))
        || features.chat_neg >= 0.85
        || features.quiz >= 0.9;
    let crisis_override = clinical_severe && behavior_severe;

    let label = if crisis_override || score >= 12 {
        RiskLabel::Crisis
    } else if score >= 8 {
        RiskLabel::High
    } else if score >= 4 {
        RiskLabel::Moderate
    } else {
        RiskLabel::Low
    };

    BaselineAssessment {
        label,
        score,
        reasons,
        crisis_override,
    }
}
