//! Synthetic cohort types: class proportions, per-class distributions and
//! the immutable labeled dataset.

use serde::{Deserialize, Serialize};

use super::features::{FeatureDomain, LabeledExample, FEATURE_DOMAINS};
use super::risk::{RiskLabel, NUM_CLASSES};

/// Default cohort size.
pub const DEFAULT_COHORT_SIZE: usize = 5000;

/// Default generator seed.
pub const DEFAULT_SEED: u64 = 42;

/// Population skew: 55% low, 25% moderate, 15% high, 5% crisis.
pub const DEFAULT_FRACTIONS: [f64; NUM_CLASSES] = [0.55, 0.25, 0.15, 0.05];

/// Error type for cohort generation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CohortError {
    #[error("Class proportion for {label} must be finite and non-negative, got {value}")]
    NegativeProportion { label: RiskLabel, value: f64 },

    #[error("Class proportions must sum to a positive value")]
    EmptyProportions,

    #[error("Class counts sum to {actual}, expected {expected}")]
    CountMismatch { expected: usize, actual: usize },

    #[error("Invalid distribution for {label}.{field}: {reason}")]
    InvalidDistribution {
        label: RiskLabel,
        field: &'static str,
        reason: String,
    },
}

/// How the cohort is split between classes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ClassProportions {
    /// Relative shares, turned into exact counts by largest remainder.
    Fractions([f64; NUM_CLASSES]),
    /// Exact per-class counts; must sum to the requested total.
    Counts([usize; NUM_CLASSES]),
}

impl Default for ClassProportions {
    fn default() -> Self {
        Self::Fractions(DEFAULT_FRACTIONS)
    }
}

impl ClassProportions {
    /// Exact per-class counts for a cohort of `total` examples.
    ///
    /// Fractions are normalized, floored, and the remainder is handed out
    /// by largest fractional part (ties to the lower class index), so the
    /// counts always sum to `total`.
    ///
    /// # Errors
    /// Returns error for negative or non-finite fractions, all-zero
    /// fractions, or explicit counts that do not sum to `total`.
    pub fn counts_for(&self, total: usize) -> Result<[usize; NUM_CLASSES], CohortError> {
        match *self {
            Self::Counts(counts) => {
                let actual: usize = counts.iter().sum();
                if actual != total {
                    return Err(CohortError::CountMismatch {
                        expected: total,
                        actual,
                    });
                }
                Ok(counts)
            }
            Self::Fractions(fractions) => {
                for (label, &value) in RiskLabel::ALL.iter().zip(&fractions) {
                    if !value.is_finite() || value < 0.0 {
                        return Err(CohortError::NegativeProportion {
                            label: *label,
                            value,
                        });
                    }
                }
                let sum: f64 = fractions.iter().sum();
                if sum <= 0.0 {
                    return Err(CohortError::EmptyProportions);
                }

                let exact = fractions.map(|f| f / sum * total as f64);
                let mut counts = exact.map(|e| e.floor() as usize);
                let assigned: usize = counts.iter().sum();

                let mut order: Vec<usize> = (0..NUM_CLASSES).collect();
                order.sort_by(|&a, &b| {
                    let ra = exact[a] - exact[a].floor();
                    let rb = exact[b] - exact[b].floor();
                    rb.total_cmp(&ra).then(a.cmp(&b))
                });
                for &i in order.iter().take(total.saturating_sub(assigned)) {
                    counts[i] += 1;
                }

                let actual: usize = counts.iter().sum();
                if actual != total {
                    return Err(CohortError::CountMismatch {
                        expected: total,
                        actual,
                    });
                }
                Ok(counts)
            }
        }
    }
}

/// Normal distribution for an integer clinical score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalParams {
    pub mean: f64,
    pub std: f64,
}

/// Uniform sub-range of a continuous behavioral signal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UniformRange {
    pub min: f64,
    pub max: f64,
}

const fn normal(mean: f64, std: f64) -> NormalParams {
    NormalParams { mean, std }
}

const fn uniform(min: f64, max: f64) -> UniformRange {
    UniformRange { min, max }
}

/// Sampling parameters for one risk class.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassDistribution {
    pub phq9: NormalParams,
    pub gad7: NormalParams,
    pub ghq12: NormalParams,
    pub quiz: UniformRange,
    pub mood_avg: UniformRange,
    pub chat_neg: UniformRange,
    /// Weights for declining / stable / improving
    pub mood_trend_weights: [f64; 3],
}

const UNIFORM_TREND: [f64; 3] = [1.0, 1.0, 1.0];

impl ClassDistribution {
    /// Default parameters for a class.
    ///
    /// Crisis combines very high clinical scores, strongly negative chat,
    /// low mood and a predominantly declining trend.
    #[must_use]
    pub fn default_for(label: RiskLabel) -> Self {
        match label {
            RiskLabel::Low => Self {
                phq9: normal(5.0, 3.0),
                gad7: normal(4.0, 3.0),
                ghq12: normal(3.0, 2.0),
                quiz: uniform(0.0, 0.4),
                mood_avg: uniform(3.5, 5.0),
                chat_neg: uniform(0.0, 0.3),
                mood_trend_weights: UNIFORM_TREND,
            },
            RiskLabel::Moderate => Self {
                phq9: normal(12.0, 4.0),
                gad7: normal(10.0, 4.0),
                ghq12: normal(6.0, 3.0),
                quiz: uniform(0.3, 0.7),
                mood_avg: uniform(2.5, 3.5),
                chat_neg: uniform(0.3, 0.6),
                mood_trend_weights: UNIFORM_TREND,
            },
            RiskLabel::High => Self {
                phq9: normal(20.0, 4.0),
                gad7: normal(17.0, 3.0),
                ghq12: normal(9.0, 2.0),
                quiz: uniform(0.6, 1.0),
                mood_avg: uniform(1.0, 2.5),
                chat_neg: uniform(0.6, 1.0),
                mood_trend_weights: UNIFORM_TREND,
            },
            RiskLabel::Crisis => Self {
                phq9: normal(24.0, 2.0),
                gad7: normal(19.0, 2.0),
                ghq12: normal(11.0, 1.0),
                quiz: uniform(0.85, 1.0),
                mood_avg: uniform(1.0, 1.8),
                chat_neg: uniform(0.8, 1.0),
                mood_trend_weights: [0.80, 0.15, 0.05],
            },
        }
    }

    /// Integer fields with their domains, in column order.
    #[must_use]
    pub fn clinical(&self) -> [(&'static str, NormalParams, FeatureDomain); 3] {
        [
            ("phq9", self.phq9, FEATURE_DOMAINS[0]),
            ("gad7", self.gad7, FEATURE_DOMAINS[1]),
            ("ghq12", self.ghq12, FEATURE_DOMAINS[2]),
        ]
    }

    /// Continuous fields with their domains and rounding decimals.
    #[must_use]
    pub fn behavioral(&self) -> [(&'static str, UniformRange, FeatureDomain, i32); 3] {
        [
            ("quiz", self.quiz, FEATURE_DOMAINS[3], 3),
            ("mood_avg", self.mood_avg, FEATURE_DOMAINS[4], 2),
            ("chat_neg", self.chat_neg, FEATURE_DOMAINS[6], 3),
        ]
    }

    /// Reject parameters that cannot be sampled.
    ///
    /// # Errors
    /// Returns `CohortError::InvalidDistribution` for negative or
    /// non-finite std, inverted or non-finite ranges, and unusable trend
    /// weights.
    pub fn check(&self, label: RiskLabel) -> Result<(), CohortError> {
        let invalid = |field: &'static str, reason: String| CohortError::InvalidDistribution {
            label,
            field,
            reason,
        };

        for (field, p, _) in self.clinical() {
            if !p.mean.is_finite() || !p.std.is_finite() || p.std < 0.0 {
                return Err(invalid(field, format!("mean={} std={}", p.mean, p.std)));
            }
        }
        for (field, r, _, _) in self.behavioral() {
            if !r.min.is_finite() || !r.max.is_finite() || r.min > r.max {
                return Err(invalid(field, format!("range [{}, {}]", r.min, r.max)));
            }
        }
        let w = self.mood_trend_weights;
        if w.iter().any(|v| !v.is_finite() || *v < 0.0) || w.iter().sum::<f64>() <= 0.0 {
            return Err(invalid("mood_trend", format!("weights {w:?}")));
        }
        Ok(())
    }

    /// Fields whose draws collapse to a single value.
    ///
    /// Not fatal: the generator still runs, but the operator is warned.
    #[must_use]
    pub fn degenerate_fields(&self) -> Vec<(&'static str, String)> {
        // Beyond six standard deviations every draw lands on the same clamp bound.
        const TAIL: f64 = 6.0;
        let mut out = Vec::new();

        for (field, p, domain) in self.clinical() {
            if p.std == 0.0 {
                out.push((field, "std is zero".to_string()));
            } else if p.mean + TAIL * p.std < domain.min || p.mean - TAIL * p.std > domain.max {
                out.push((
                    field,
                    format!(
                        "N({}, {}) lies outside [{}, {}]; every draw is clamped",
                        p.mean, p.std, domain.min, domain.max
                    ),
                ));
            }
        }
        for (field, r, domain, _) in self.behavioral() {
            let lo = r.min.max(domain.min);
            let hi = r.max.min(domain.max);
            if hi <= lo {
                out.push((
                    field,
                    format!(
                        "range [{}, {}] clamped to [{}, {}] has zero width",
                        r.min, r.max, domain.min, domain.max
                    ),
                ));
            }
        }
        if self.mood_trend_weights.iter().filter(|w| **w > 0.0).count() == 1 {
            out.push(("mood_trend", "only one trend value has weight".to_string()));
        }
        out
    }
}

/// Per-class sampling configuration for the whole cohort.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CohortConfig {
    pub classes: [ClassDistribution; NUM_CLASSES],
}

impl Default for CohortConfig {
    fn default() -> Self {
        Self {
            classes: RiskLabel::ALL.map(ClassDistribution::default_for),
        }
    }
}

impl CohortConfig {
    #[must_use]
    pub fn class(&self, label: RiskLabel) -> &ClassDistribution {
        &self.classes[label.index()]
    }
}

/// Immutable, ordered collection of labeled examples.
#[derive(Debug, Clone, PartialEq)]
pub struct CohortDataset {
    examples: Vec<LabeledExample>,
}

impl CohortDataset {
    #[must_use]
    pub fn from_examples(examples: Vec<LabeledExample>) -> Self {
        Self { examples }
    }

    #[must_use]
    pub fn examples(&self) -> &[LabeledExample] {
        &self.examples
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.examples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    /// Number of examples per class, in class-index order.
    #[must_use]
    pub fn class_counts(&self) -> [usize; NUM_CLASSES] {
        let mut counts = [0; NUM_CLASSES];
        for example in &self.examples {
            counts[example.label.index()] += 1;
        }
        counts
    }
}
