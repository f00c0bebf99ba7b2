//! Fit pipeline: Stratified split, scaling, class-weighted fit, evaluation.
//!
//! The pipeline is generic over the classifier strategy; the scaler is always
//! fit on the training partition only and travels with the classifier as one
//! artifact bundle.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use thiserror::Error;

use crate::domain::baseline;
use crate::domain::{
    argmax, ArtifactBundle, BaselineComparison, ClassifierModel, CohortDataset, ConfusionMatrix,
    EvaluationReport, FeatureArray, FitWarning, LabeledExample, RiskLabel, ScalingTransform,
    TrainingSummary, NUM_CLASSES,
};
use crate::ports::ClassifierStrategy;

/// Default held-out share.
pub const DEFAULT_TEST_FRACTION: f64 = 0.20;

/// Errors that abort a fit.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FitError {
    #[error("Cannot fit on an empty dataset")]
    EmptyDataset,

    #[error("Test fraction must be in (0, 1), got {0}")]
    InvalidTestFraction(f64),

    #[error("Stratified split left the {0} partition empty")]
    EmptyPartition(&'static str),
}

/// Everything a fit produces.
#[derive(Debug, Clone)]
pub struct FitResult {
    pub scaler: ScalingTransform,
    pub model: ClassifierModel,
    pub report: EvaluationReport,
    pub seed: u64,
}

impl FitResult {
    /// Package scaler and classifier as one co-versioned bundle.
    #[must_use]
    pub fn bundle(&self) -> ArtifactBundle {
        let training = TrainingSummary {
            seed: self.seed,
            train_size: self.report.train_size,
            test_size: self.report.test_size,
            iterations: self.report.iterations,
            converged: self.report.converged,
            accuracy: self.report.accuracy,
            crisis_recall: self.report.crisis_recall,
        };
        ArtifactBundle::new(self.scaler.clone(), self.model.clone(), training)
    }
}

/// Stratified train/test partition.
#[derive(Debug, Clone)]
pub struct Split {
    pub train: Vec<LabeledExample>,
    pub test: Vec<LabeledExample>,
}

/// Split each class so that `round(n_c * test_fraction)` of its members go
/// to the test side, keeping at least one on each side when the class has
/// two or more members. Both partitions are shuffled.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
#[must_use]
pub fn stratified_split(examples: &[LabeledExample], test_fraction: f64, seed: u64) -> Split {
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    let mut by_class: [Vec<LabeledExample>; NUM_CLASSES] = Default::default();
    for example in examples {
        by_class[example.label.index()].push(*example);
    }

    let mut train = Vec::with_capacity(examples.len());
    let mut test = Vec::with_capacity(examples.len());
    for mut members in by_class {
        let n = members.len();
        let mut n_test = (n as f64 * test_fraction).round() as usize;
        if n >= 2 {
            n_test = n_test.clamp(1, n - 1);
        } else {
            n_test = 0;
        }
        members.shuffle(&mut rng);
        test.extend_from_slice(&members[..n_test]);
        train.extend_from_slice(&members[n_test..]);
    }

    train.shuffle(&mut rng);
    test.shuffle(&mut rng);
    Split { train, test }
}

/// Balanced weights `n / (k * n_c)` over the `k` classes present.
#[must_use]
pub fn balanced_class_weights(labels: &[RiskLabel]) -> [f64; NUM_CLASSES] {
    let mut counts = [0usize; NUM_CLASSES];
    for label in labels {
        counts[label.index()] += 1;
    }
    let present = counts.iter().filter(|&&c| c > 0).count();
    let n = labels.len() as f64;

    counts.map(|c| {
        if c == 0 {
            0.0
        } else {
            n / (present as f64 * c as f64)
        }
    })
}

/// Fit pipeline over a classifier strategy.
pub struct FitPipeline<C: ClassifierStrategy> {
    strategy: C,
    test_fraction: f64,
}

impl<C: ClassifierStrategy> FitPipeline<C> {
    #[must_use]
    pub fn new(strategy: C) -> Self {
        Self {
            strategy,
            test_fraction: DEFAULT_TEST_FRACTION,
        }
    }

    #[must_use]
    pub fn with_test_fraction(mut self, test_fraction: f64) -> Self {
        self.test_fraction = test_fraction;
        self
    }

    /// Split, scale, fit and evaluate.
    ///
    /// # Errors
    /// Returns error for an empty dataset, a test fraction outside (0, 1),
    /// or a split that leaves either partition empty.
    pub fn fit(&self, dataset: &CohortDataset, seed: u64) -> Result<FitResult, FitError> {
        if dataset.is_empty() {
            return Err(FitError::EmptyDataset);
        }
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(FitError::InvalidTestFraction(self.test_fraction));
        }

        let split = stratified_split(dataset.examples(), self.test_fraction, seed);
        if split.train.is_empty() {
            return Err(FitError::EmptyPartition("train"));
        }
        if split.test.is_empty() {
            return Err(FitError::EmptyPartition("test"));
        }
        tracing::info!(
            "Stratified split: train={}, test={}, test_fraction={}",
            split.train.len(),
            split.test.len(),
            self.test_fraction
        );

        let train_raw: Vec<FeatureArray> = split.train.iter().map(|e| e.features.to_array()).collect();
        let train_labels: Vec<RiskLabel> = split.train.iter().map(|e| e.label).collect();
        let scaler = ScalingTransform::fit(&train_raw).ok_or(FitError::EmptyPartition("train"))?;
        let train_x = scaler.transform_all(&train_raw);

        let class_weights = balanced_class_weights(&train_labels);
        tracing::debug!("Balanced class weights: {:?}", class_weights);
        let sample_weights: Vec<f64> = train_labels.iter().map(|l| class_weights[l.index()]).collect();

        tracing::info!("Fitting {} on {} examples", self.strategy.name(), train_x.len());
        let outcome = self.strategy.fit(&train_x, &train_labels, &sample_weights);

        let confusion = ConfusionMatrix::from_pairs(split.test.iter().map(|e| {
            let scaled = scaler.transform(&e.features.to_array());
            let probabilities = outcome.model.predict_proba(&scaled);
            let predicted = argmax(&probabilities)
                .map_or(RiskLabel::Low, |k| outcome.model.labels[k]);
            (e.label, predicted)
        }));

        let mut report = EvaluationReport::from_confusion(confusion, split.train.len());
        report.iterations = outcome.iterations;
        report.converged = outcome.converged;
        if !outcome.converged {
            report.warnings.insert(
                0,
                FitWarning::NotConverged {
                    iterations: outcome.iterations,
                },
            );
        }
        report.baseline = Some(baseline_comparison(&split.test));

        for warning in &report.warnings {
            tracing::warn!("{}", warning);
        }
        tracing::info!(
            "Evaluation: accuracy={:.4}, crisis_recall={:?}",
            report.accuracy,
            report.crisis_recall
        );

        Ok(FitResult {
            scaler,
            model: outcome.model,
            report,
            seed,
        })
    }
}

fn baseline_comparison(test: &[LabeledExample]) -> BaselineComparison {
    let confusion =
        ConfusionMatrix::from_pairs(test.iter().map(|e| (e.label, baseline::assess(&e.features).label)));
    BaselineComparison {
        name: "rule-based".to_string(),
        accuracy: confusion.accuracy(),
        crisis_recall: confusion.recall(RiskLabel::Crisis),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{MultinomialLogisticRegression, SolverConfig};
    use crate::application::{CohortGenerator, InferenceService};
    use crate::domain::{ClassProportions, FeatureVector, DEFAULT_COHORT_SIZE, DEFAULT_SEED};

    fn pipeline(max_iterations: usize) -> FitPipeline<MultinomialLogisticRegression> {
        FitPipeline::new(MultinomialLogisticRegression::new(SolverConfig {
            max_iterations,
            ..SolverConfig::default()
        }))
    }

    fn cohort(total: usize, seed: u64) -> CohortDataset {
        CohortGenerator::default()
            .generate(total, &ClassProportions::default(), seed)
            .expect("Generation should succeed")
    }

    #[test]
    fn test_split_preserves_class_proportions() {
        let data = cohort(1000, 1);
        let split = stratified_split(data.examples(), 0.2, 1);

        let count = |xs: &[LabeledExample], l: RiskLabel| xs.iter().filter(|e| e.label == l).count();
        assert_eq!(split.test.len(), 200);
        assert_eq!(count(&split.test, RiskLabel::Low), 110);
        assert_eq!(count(&split.test, RiskLabel::Moderate), 50);
        assert_eq!(count(&split.test, RiskLabel::High), 30);
        assert_eq!(count(&split.test, RiskLabel::Crisis), 10);
        assert_eq!(split.train.len(), 800);
    }

    #[test]
    fn test_split_keeps_one_on_each_side() {
        let example = |label| LabeledExample::new(FeatureVector::from_array(&[1.0, 1.0, 1.0, 0.1, 3.0, 0.0, 0.1]), label);
        let examples = vec![
            example(RiskLabel::Low),
            example(RiskLabel::Low),
            example(RiskLabel::Crisis),
        ];
        let split = stratified_split(&examples, 0.2, 3);

        assert_eq!(split.test.len(), 1);
        assert_eq!(split.test[0].label, RiskLabel::Low);
        assert_eq!(split.train.len(), 2);
    }

    #[test]
    fn test_balanced_weights() {
        let labels = [RiskLabel::Low, RiskLabel::Low, RiskLabel::Low, RiskLabel::Crisis];
        let w = balanced_class_weights(&labels);
        assert!((w[0] - 4.0 / 6.0).abs() < 1e-12);
        assert!((w[3] - 2.0).abs() < 1e-12);
        assert_eq!(w[1], 0.0);

        // Weighted class totals are equal across present classes.
        assert!((w[0] * 3.0 - w[3] * 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_fit_reaches_useful_accuracy() {
        let result = pipeline(300).fit(&cohort(1000, 42), 42).expect("Fit should succeed");

        assert!(result.report.accuracy > 0.75, "accuracy {}", result.report.accuracy);
        assert!(result.report.crisis_recall.is_some());
        assert_eq!(result.report.train_size + result.report.test_size, 1000);
        assert!(result.report.baseline.is_some());
    }

    #[test]
    fn test_scaled_training_mean_is_zero() {
        let result = pipeline(5).fit(&cohort(400, 8), 8).expect("Fit should succeed");
        let scaled = result.scaler.transform(&result.scaler.mean);
        assert!(scaled.iter().all(|v| v.abs() < 1e-12));
    }

    #[test]
    fn test_iteration_bound_warns_not_converged() {
        let result = pipeline(1).fit(&cohort(400, 9), 9).expect("Fit should succeed");
        assert!(!result.report.converged);
        assert!(result
            .report
            .warnings
            .contains(&FitWarning::NotConverged { iterations: 1 }));
    }

    #[test]
    fn test_missing_crisis_recall_is_undefined() {
        let data = CohortGenerator::default()
            .generate(300, &ClassProportions::Counts([150, 100, 50, 0]), 4)
            .expect("Generation should succeed");
        let result = pipeline(50).fit(&data, 4).expect("Fit should succeed");

        assert_eq!(result.report.crisis_recall, None);
        assert!(result
            .report
            .warnings
            .contains(&FitWarning::UndefinedRecall { label: RiskLabel::Crisis }));
    }

    #[test]
    fn test_same_seed_same_model() {
        let data = cohort(400, 12);
        let a = pipeline(40).fit(&data, 12).expect("Fit should succeed");
        let b = pipeline(40).fit(&data, 12).expect("Fit should succeed");
        assert_eq!(a.model, b.model);
        assert_eq!(a.scaler, b.scaler);
    }

    #[test]
    fn test_rejects_empty_and_bad_fraction() {
        let empty = CohortDataset::from_examples(Vec::new());
        assert_eq!(pipeline(1).fit(&empty, 0).unwrap_err(), FitError::EmptyDataset);

        let data = cohort(100, 1);
        let err = pipeline(1).with_test_fraction(1.0).fit(&data, 0).unwrap_err();
        assert_eq!(err, FitError::InvalidTestFraction(1.0));
    }

    #[test]
    fn test_bundle_carries_training_summary() {
        let result = pipeline(20).fit(&cohort(300, 2), 2).expect("Fit should succeed");
        let bundle = result.bundle();

        assert!(bundle.check().is_ok());
        assert_eq!(bundle.training.seed, 2);
        assert_eq!(bundle.training.test_size, result.report.test_size);
    }

    #[test]
    fn test_default_solver_converges_on_default_cohort() {
        let data = cohort(DEFAULT_COHORT_SIZE, DEFAULT_SEED);
        let result = FitPipeline::new(MultinomialLogisticRegression::default())
            .fit(&data, DEFAULT_SEED)
            .expect("Fit should succeed");

        assert!(result.report.converged, "iterations = {}", result.report.iterations);
        assert!(result.report.iterations < SolverConfig::default().max_iterations);
        assert!(!result
            .report
            .warnings
            .iter()
            .any(|w| matches!(w, FitWarning::NotConverged { .. })));
        assert!(result.bundle().training.converged);
    }

    #[test]
    fn test_evaluation_matches_served_predictions() {
        let data = cohort(600, 21);
        let result = pipeline(200).fit(&data, 21).expect("Fit should succeed");
        let service = InferenceService::new(result.bundle()).expect("Bundle should be valid");

        let split = stratified_split(data.examples(), DEFAULT_TEST_FRACTION, 21);
        let served = ConfusionMatrix::from_pairs(split.test.iter().map(|e| {
            let prediction = service.predict(&e.features).expect("Predict should succeed");
            (e.label, prediction.label)
        }));
        assert_eq!(served, result.report.confusion);
    }
}
