//! Feature vector types for mental-health risk scoring.
//!
//! The seven signals are position-indexed: the scaler and the classifier
//! address them by column, never by name. `FEATURE_NAMES` fixes that order.

use serde::{Deserialize, Serialize};

use super::risk::RiskLabel;

/// Number of input signals.
pub const NUM_FEATURES: usize = 7;

/// A feature vector in training column order.
pub type FeatureArray = [f64; NUM_FEATURES];

/// Column order shared by the dataset file, the scaler and the classifier.
pub const FEATURE_NAMES: [&str; NUM_FEATURES] = [
    "phq9",
    "gad7",
    "ghq12",
    "quiz",
    "mood_avg",
    "mood_trend",
    "chat_neg",
];

/// Largest absolute value accepted at the scoring boundary.
///
/// Values outside the training domain are still scored; this only rejects
/// magnitudes that can only come from a broken client.
pub const SANE_ABS_LIMIT: f64 = 1.0e6;

/// Errors raised when a raw vector cannot be scored.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FeatureError {
    #[error("Expected {expected} features, got {got}")]
    Arity { expected: usize, got: usize },

    #[error("Feature {field} is not a finite number")]
    NonFinite { field: &'static str },

    #[error("Feature {field}={value} exceeds the sane magnitude limit {SANE_ABS_LIMIT}")]
    OutOfRange { field: &'static str, value: f64 },
}

/// Closed interval a feature occupies in generated data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureDomain {
    pub min: f64,
    pub max: f64,
    /// Integer-valued fields (clinical scores, mood trend)
    pub integral: bool,
}

impl FeatureDomain {
    const fn continuous(min: f64, max: f64) -> Self {
        Self {
            min,
            max,
            integral: false,
        }
    }

    const fn integer(min: f64, max: f64) -> Self {
        Self {
            min,
            max,
            integral: true,
        }
    }

    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        (self.min..=self.max).contains(&value) && (!self.integral || value.fract() == 0.0)
    }

    #[must_use]
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }
}

/// Global domain of each feature, in column order.
pub const FEATURE_DOMAINS: [FeatureDomain; NUM_FEATURES] = [
    FeatureDomain::integer(0.0, 27.0),
    FeatureDomain::integer(0.0, 21.0),
    FeatureDomain::integer(0.0, 12.0),
    FeatureDomain::continuous(0.0, 1.0),
    FeatureDomain::continuous(1.0, 5.0),
    FeatureDomain::integer(-1.0, 1.0),
    FeatureDomain::continuous(0.0, 1.0),
];

/// Direction of the rolling mood average.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoodTrend {
    Declining,
    Stable,
    Improving,
}

impl MoodTrend {
    /// Trend values in the order used for sampling weights.
    pub const ALL: [MoodTrend; 3] = [Self::Declining, Self::Stable, Self::Improving];

    /// Numeric encoding used by the classifier.
    #[must_use]
    pub fn value(self) -> i8 {
        match self {
            Self::Declining => -1,
            Self::Stable => 0,
            Self::Improving => 1,
        }
    }

    /// Decode a numeric trend. Only exact -1, 0 and 1 are recognized.
    #[must_use]
    pub fn from_value(value: f64) -> Option<Self> {
        if value == -1.0 {
            Some(Self::Declining)
        } else if value == 0.0 {
            Some(Self::Stable)
        } else if value == 1.0 {
            Some(Self::Improving)
        } else {
            None
        }
    }
}

/// The seven named signals for one user.
///
/// Deserialization requires every field and rejects unknown ones, so a
/// missing signal can never silently become zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeatureVector {
    /// PHQ-9 depression score (0-27)
    pub phq9: f64,
    /// GAD-7 anxiety score (0-21)
    pub gad7: f64,
    /// GHQ-12 general distress score (0-12, bimodal scoring)
    pub ghq12: f64,
    /// Self-report questionnaire severity (0-1)
    pub quiz: f64,
    /// Rolling mood average on the 1-5 scale
    pub mood_avg: f64,
    /// -1 declining, 0 stable, 1 improving
    pub mood_trend: f64,
    /// Fraction of chat messages with negative sentiment (0-1)
    pub chat_neg: f64,
}

impl FeatureVector {
    /// Convert to an array in training column order.
    #[must_use]
    pub fn to_array(&self) -> FeatureArray {
        [
            self.phq9,
            self.gad7,
            self.ghq12,
            self.quiz,
            self.mood_avg,
            self.mood_trend,
            self.chat_neg,
        ]
    }

    #[must_use]
    pub fn from_array(v: &FeatureArray) -> Self {
        Self {
            phq9: v[0],
            gad7: v[1],
            ghq12: v[2],
            quiz: v[3],
            mood_avg: v[4],
            mood_trend: v[5],
            chat_neg: v[6],
        }
    }

    /// Create features from a slice in column order.
    ///
    /// # Errors
    /// Returns `FeatureError::Arity` if the slice is not exactly 7 long.
    pub fn from_slice(v: &[f64]) -> Result<Self, FeatureError> {
        let arr: FeatureArray = v.try_into().map_err(|_| FeatureError::Arity {
            expected: NUM_FEATURES,
            got: v.len(),
        })?;
        Ok(Self::from_array(&arr))
    }

    /// Check that every value can be scored.
    ///
    /// # Errors
    /// Returns the first non-finite or absurdly large field.
    pub fn check_sane(&self) -> Result<(), FeatureError> {
        for (&field, value) in FEATURE_NAMES.iter().zip(self.to_array()) {
            if !value.is_finite() {
                return Err(FeatureError::NonFinite { field });
            }
            if value.abs() > SANE_ABS_LIMIT {
                return Err(FeatureError::OutOfRange { field, value });
            }
        }
        Ok(())
    }

    /// Validate that all features are within their declared domains.
    ///
    /// # Errors
    /// Returns one message per violating field.
    pub fn validate_domain(&self) -> Result<(), Vec<String>> {
        let errors: Vec<String> = FEATURE_NAMES
            .iter()
            .zip(FEATURE_DOMAINS.iter())
            .zip(self.to_array())
            .filter(|((_, domain), value)| !domain.contains(*value))
            .map(|((name, domain), value)| {
                if domain.integral {
                    format!(
                        "{name} {value} must be an integer in [{}, {}]",
                        domain.min, domain.max
                    )
                } else {
                    format!("{name} {value} out of range [{}, {}]", domain.min, domain.max)
                }
            })
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    #[must_use]
    pub fn trend(&self) -> Option<MoodTrend> {
        MoodTrend::from_value(self.mood_trend)
    }
}

/// A feature vector with its ground-truth label.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabeledExample {
    pub features: FeatureVector,
    pub label: RiskLabel,
}

impl LabeledExample {
    #[must_use]
    pub fn new(features: FeatureVector, label: RiskLabel) -> Self {
        Self { features, label }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FeatureVector {
        FeatureVector {
            phq9: 12.0,
            gad7: 9.0,
            ghq12: 6.0,
            quiz: 0.45,
            mood_avg: 3.1,
            mood_trend: 0.0,
            chat_neg: 0.4,
        }
    }

    #[test]
    fn test_array_order_matches_names() {
        let arr = sample().to_array();
        assert_eq!(arr.len(), FEATURE_NAMES.len());
        assert!((arr[0] - 12.0).abs() < f64::EPSILON);
        assert!((arr[4] - 3.1).abs() < f64::EPSILON);
        assert!((arr[6] - 0.4).abs() < f64::EPSILON);
        assert_eq!(FeatureVector::from_array(&arr), sample());
    }

    #[test]
    fn test_from_slice_rejects_wrong_arity() {
        let err = FeatureVector::from_slice(&[1.0, 2.0, 3.0]).unwrap_err();
        assert_eq!(err, FeatureError::Arity { expected: 7, got: 3 });
        assert!(FeatureVector::from_slice(&sample().to_array()).is_ok());
    }

    #[test]
    fn test_check_sane() {
        assert!(sample().check_sane().is_ok());

        let out_of_domain = FeatureVector {
            phq9: 40.0,
            mood_avg: 0.0,
            ..sample()
        };
        assert!(out_of_domain.check_sane().is_ok());

        let nan = FeatureVector {
            quiz: f64::NAN,
            ..sample()
        };
        assert_eq!(nan.check_sane(), Err(FeatureError::NonFinite { field: "quiz" }));

        let huge = FeatureVector {
            gad7: 1.0e9,
            ..sample()
        };
        assert!(matches!(
            huge.check_sane(),
            Err(FeatureError::OutOfRange { field: "gad7", .. })
        ));
    }

    #[test]
    fn test_validate_domain() {
        assert!(sample().validate_domain().is_ok());

        let invalid = FeatureVector {
            phq9: 12.5,
            mood_trend: 2.0,
            chat_neg: 1.5,
            ..sample()
        };
        let errors = invalid.validate_domain().unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors[0].starts_with("phq9"));
    }

    #[test]
    fn test_mood_trend_decoding() {
        assert_eq!(MoodTrend::from_value(-1.0), Some(MoodTrend::Declining));
        assert_eq!(MoodTrend::from_value(1.0), Some(MoodTrend::Improving));
        assert_eq!(MoodTrend::from_value(0.5), None);
        for trend in MoodTrend::ALL {
            assert_eq!(MoodTrend::from_value(f64::from(trend.value())), Some(trend));
        }
    }

    #[test]
    fn test_deserialize_requires_every_field() {
        let missing = r#"{"phq9":1,"gad7":1,"ghq12":1,"quiz":0.1,"mood_avg":4,"mood_trend":0}"#;
        assert!(serde_json::from_str::<FeatureVector>(missing).is_err());

        let extra = r#"{"phq9":1,"gad7":1,"ghq12":1,"quiz":0.1,"mood_avg":4,"mood_trend":0,"chat_neg":0.1,"age":30}"#;
        assert!(serde_json::from_str::<FeatureVector>(extra).is_err());

        let ok = r#"{"phq9":1,"gad7":1,"ghq12":1,"quiz":0.1,"mood_avg":4,"mood_trend":0,"chat_neg":0.1}"#;
        let parsed: FeatureVector = serde_json::from_str(ok).expect("Should parse");
        assert!((parsed.mood_avg - 4.0).abs() < f64::EPSILON);
    }
}
