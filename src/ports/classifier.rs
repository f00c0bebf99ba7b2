//! Classifier port: Trait for the multinomial fitting strategy.
//!
//! The fit pipeline only depends on this contract, so any solver that can
//! fit `(X, y, sample_weights)` can replace the built-in logistic
//! regression. Scoring is not part of the contract: evaluation and inference
//! both go through `ClassifierModel::predict_proba`.

use crate::domain::{ClassifierModel, FeatureArray, RiskLabel};

/// Result of a fitting run.
#[derive(Debug, Clone)]
pub struct FitOutcome {
    /// Best model found (the final iterate when not converged)
    pub model: ClassifierModel,
    /// Solver iterations performed
    pub iterations: usize,
    /// Whether the stopping tolerance was reached before the bound
    pub converged: bool,
    /// Weighted training objective at `model`
    pub final_loss: f64,
}

/// Trait for multinomial classifier strategies.
pub trait ClassifierStrategy: Send + Sync {
    /// Short identifier for logs and reports.
    fn name(&self) -> &'static str;

    /// Fit on scaled features.
    ///
    /// `features`, `labels` and `sample_weights` are parallel slices. Fitting
    /// never fails: numeric trouble shows up as `converged == false`.
    fn fit(&self, features: &[FeatureArray], labels: &[RiskLabel], sample_weights: &[f64]) -> FitOutcome;
}
