//! Cohort generator: Seeded synthetic screening population.
//!
//! Each class is sampled column by column from its distribution, the class
//! blocks are concatenated in class order and the whole cohort is shuffled.
//! All randomness comes from one `ChaCha20Rng` seeded with the caller's
//! `u64`, so a seed plus configuration fully determines the output.

use rand::distributions::WeightedIndex;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use rand_distr::{Distribution, Normal};

use crate::domain::{
    ClassDistribution, ClassProportions, CohortConfig, CohortDataset, CohortError, FeatureDomain,
    FeatureVector, LabeledExample, MoodTrend, NormalParams, RiskLabel, UniformRange,
};

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Generator over a fixed per-class configuration.
#[derive(Debug, Clone, Default)]
pub struct CohortGenerator {
    config: CohortConfig,
}

impl CohortGenerator {
    #[must_use]
    pub fn new(config: CohortConfig) -> Self {
        Self { config }
    }

    /// Generate a labeled cohort of exactly `total` examples.
    ///
    /// # Errors
    /// Returns error for invalid proportions or distribution parameters.
    pub fn generate(
        &self,
        total: usize,
        proportions: &ClassProportions,
        seed: u64,
    ) -> Result<CohortDataset, CohortError> {
        let counts = proportions.counts_for(total)?;
        for label in RiskLabel::ALL {
            let dist = self.config.class(label);
            dist.check(label)?;
            for (field, reason) in dist.degenerate_fields() {
                tracing::warn!("Degenerate distribution for {}.{}: {}", label.as_str(), field, reason);
            }
        }

        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        let mut examples = Vec::with_capacity(total);
        for (label, &count) in RiskLabel::ALL.iter().zip(&counts) {
            let block = sample_class(&mut rng, *label, self.config.class(*label), count)?;
            examples.extend(block);
        }
        examples.shuffle(&mut rng);

        tracing::info!(
            "Generated cohort: total={}, low={}, moderate={}, high={}, crisis={}, seed={}",
            total,
            counts[0],
            counts[1],
            counts[2],
            counts[3],
            seed
        );
        Ok(CohortDataset::from_examples(examples))
    }
}

fn normal_column(
    rng: &mut ChaCha20Rng,
    label: RiskLabel,
    field: &'static str,
    params: NormalParams,
    domain: FeatureDomain,
    n: usize,
) -> Result<Vec<f64>, CohortError> {
    let normal = Normal::new(params.mean, params.std).map_err(|e| CohortError::InvalidDistribution {
        label,
        field,
        reason: e.to_string(),
    })?;
    Ok((0..n)
        .map(|_| domain.clamp(normal.sample(rng).round()))
        .collect())
}

fn uniform_column(
    rng: &mut ChaCha20Rng,
    range: UniformRange,
    domain: FeatureDomain,
    decimals: i32,
    n: usize,
) -> Vec<f64> {
    (0..n)
        .map(|_| {
            let raw = if range.min < range.max {
                rng.gen_range(range.min..range.max)
            } else {
                range.min
            };
            domain.clamp(round_to(raw, decimals))
        })
        .collect()
}

fn sample_class(
    rng: &mut ChaCha20Rng,
    label: RiskLabel,
    dist: &ClassDistribution,
    n: usize,
) -> Result<Vec<LabeledExample>, CohortError> {
    let [phq9, gad7, ghq12] = dist.clinical();
    let phq9 = normal_column(rng, label, phq9.0, phq9.1, phq9.2, n)?;
    let gad7 = normal_column(rng, label, gad7.0, gad7.1, gad7.2, n)?;
    let ghq12 = normal_column(rng, label, ghq12.0, ghq12.1, ghq12.2, n)?;

    let [quiz, mood_avg, chat_neg] = dist.behavioral();
    let quiz = uniform_column(rng, quiz.1, quiz.2, quiz.3, n);
    let mood_avg = uniform_column(rng, mood_avg.1, mood_avg.2, mood_avg.3, n);
    let chat_neg = uniform_column(rng, chat_neg.1, chat_neg.2, chat_neg.3, n);

    let trend_index =
        WeightedIndex::new(dist.mood_trend_weights).map_err(|e| CohortError::InvalidDistribution {
            label,
            field: "mood_trend",
            reason: e.to_string(),
        })?;
    let trend: Vec<f64> = (0..n)
        .map(|_| f64::from(MoodTrend::ALL[trend_index.sample(rng)].value()))
        .collect();

    Ok((0..n)
        .map(|i| {
            LabeledExample::new(
                FeatureVector {
                    phq9: phq9[i],
                    gad7: gad7[i],
                    ghq12: ghq12[i],
                    quiz: quiz[i],
                    mood_avg: mood_avg[i],
                    mood_trend: trend[i],
                    chat_neg: chat_neg[i],
                },
                label,
            )
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DEFAULT_COHORT_SIZE, DEFAULT_SEED, NUM_CLASSES};

    #[test]
    fn test_default_cohort_has_exact_class_counts() {
        let dataset = CohortGenerator::default()
            .generate(DEFAULT_COHORT_SIZE, &ClassProportions::default(), DEFAULT_SEED)
            .expect("Generation should succeed");

        assert_eq!(dataset.len(), 5000);
        assert_eq!(dataset.class_counts(), [2750, 1250, 750, 250]);
    }

    #[test]
    fn test_every_example_within_domain() {
        let generator = CohortGenerator::default();
        for seed in [0, 1, 7, 42, 1234, u64::MAX] {
            let dataset = generator
                .generate(800, &ClassProportions::default(), seed)
                .expect("Generation should succeed");
            for example in dataset.examples() {
                assert!(
                    example.features.validate_domain().is_ok(),
                    "seed {seed}: {:?}",
                    example.features
                );
            }
        }
    }

    #[test]
    fn test_same_seed_same_cohort() {
        let generator = CohortGenerator::default();
        let a = generator
            .generate(500, &ClassProportions::default(), 99)
            .expect("Generation should succeed");
        let b = generator
            .generate(500, &ClassProportions::default(), 99)
            .expect("Generation should succeed");
        let c = generator
            .generate(500, &ClassProportions::default(), 100)
            .expect("Generation should succeed");

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_same_seed_writes_identical_csv_bytes() {
        use crate::adapters::CsvCohortStore;
        use crate::ports::CohortStore;

        let dir = tempfile::tempdir().expect("Should create temp dir");
        let paths = [dir.path().join("a.csv"), dir.path().join("b.csv")];
        for path in &paths {
            let dataset = CohortGenerator::default()
                .generate(DEFAULT_COHORT_SIZE, &ClassProportions::default(), DEFAULT_SEED)
                .expect("Generation should succeed");
            CsvCohortStore::new(path).write_cohort(&dataset).expect("Write should succeed");
        }

        let a = std::fs::read(&paths[0]).expect("Should read first file");
        let b = std::fs::read(&paths[1]).expect("Should read second file");
        assert!(!a.is_empty());
        assert_eq!(a, b);
    }

    #[test]
    fn test_cohort_is_shuffled() {
        let dataset = CohortGenerator::default()
            .generate(1000, &ClassProportions::default(), 5)
            .expect("Generation should succeed");
        let first_block = &dataset.examples()[..550];
        assert!(first_block.iter().any(|e| e.label != RiskLabel::Low));
    }

    #[test]
    fn test_continuous_fields_are_rounded() {
        let dataset = CohortGenerator::default()
            .generate(300, &ClassProportions::default(), 3)
            .expect("Generation should succeed");
        for e in dataset.examples() {
            let f = e.features;
            assert!((f.quiz * 1000.0 - (f.quiz * 1000.0).round()).abs() < 1e-6);
            assert!((f.chat_neg * 1000.0 - (f.chat_neg * 1000.0).round()).abs() < 1e-6);
            assert!((f.mood_avg * 100.0 - (f.mood_avg * 100.0).round()).abs() < 1e-6);
        }
    }

    #[test]
    fn test_crisis_trend_mostly_declining() {
        let dataset = CohortGenerator::default()
            .generate(2000, &ClassProportions::Counts([0, 0, 0, 2000]), 11)
            .expect("Generation should succeed");
        let declining = dataset
            .examples()
            .iter()
            .filter(|e| e.features.trend() == Some(MoodTrend::Declining))
            .count();
        assert!(declining > 1400, "declining = {declining}");
    }

    #[test]
    fn test_explicit_counts_must_match_total() {
        let err = CohortGenerator::default()
            .generate(10, &ClassProportions::Counts([5, 5, 5, 5]), 1)
            .unwrap_err();
        assert_eq!(err, CohortError::CountMismatch { expected: 10, actual: 20 });
    }

    #[test]
    fn test_negative_std_rejected() {
        let mut config = CohortConfig::default();
        config.classes[1].gad7.std = -1.0;
        let err = CohortGenerator::new(config)
            .generate(100, &ClassProportions::default(), 1)
            .unwrap_err();
        assert!(matches!(
            err,
            CohortError::InvalidDistribution { label: RiskLabel::Moderate, field: "gad7", .. }
        ));
    }

    #[test]
    fn test_zero_width_range_is_constant() {
        let mut config = CohortConfig::default();
        for class in &mut config.classes {
            class.quiz = UniformRange { min: 0.5, max: 0.5 };
        }
        let dataset = CohortGenerator::new(config)
            .generate(40, &ClassProportions::Fractions([1.0; NUM_CLASSES]), 2)
            .expect("Degenerate ranges only warn");
        assert!(dataset.examples().iter().all(|e| e.features.quiz == 0.5));
    }
}
