//! Domain layer: Core risk-classification types and numeric kernels.
//!
//! Pure Rust types with no I/O. Everything here is deterministic and
//! serializable; failures surface as typed errors or `check()` results.

pub mod baseline;
mod bundle;
mod cohort;
mod evaluation;
mod features;
mod model;
pub mod questionnaire;
mod risk;
mod scaling;

pub use bundle::{bundle_fingerprint, ArtifactBundle, TrainingSummary, BUNDLE_FORMAT_VERSION};
pub use cohort::{
    ClassDistribution, ClassProportions, CohortConfig, CohortDataset, CohortError, NormalParams,
    UniformRange, DEFAULT_COHORT_SIZE, DEFAULT_FRACTIONS, DEFAULT_SEED,
};
pub use evaluation::{
    BaselineComparison, ClassMetrics, ConfusionMatrix, EvaluationReport, FitWarning,
};
pub use features::{
    FeatureArray, FeatureDomain, FeatureError, FeatureVector, LabeledExample, MoodTrend,
    FEATURE_DOMAINS, FEATURE_NAMES, NUM_FEATURES, SANE_ABS_LIMIT,
};
pub use model::{softmax, ClassifierModel};
pub use risk::{
    argmax, PredictionResponse, RiskLabel, RiskPrediction, NUM_CLASSES, UNKNOWN_LABEL,
};
pub use scaling::ScalingTransform;
