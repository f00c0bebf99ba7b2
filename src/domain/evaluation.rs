//! Evaluation metrics and the training report.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::risk::{RiskLabel, NUM_CLASSES};

/// Non-fatal conditions raised while fitting or evaluating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FitWarning {
    /// The solver hit its iteration bound; the best-so-far model was kept.
    NotConverged { iterations: usize },
    /// The test partition holds no examples of this class.
    UndefinedRecall { label: RiskLabel },
}

impl fmt::Display for FitWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConverged { iterations } => write!(
                f,
                "solver did not converge within {iterations} iterations; returning best-so-far model"
            ),
            Self::UndefinedRecall { label } => write!(
                f,
                "recall for {} is undefined: no {} examples in the test partition",
                label.as_str(),
                label.as_str()
            ),
        }
    }
}

/// Counts of (true, predicted) pairs. Rows are true labels.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub counts: [[usize; NUM_CLASSES]; NUM_CLASSES],
}

impl ConfusionMatrix {
    #[must_use]
    pub fn from_pairs(pairs: impl IntoIterator<Item = (RiskLabel, RiskLabel)>) -> Self {
        let mut matrix = Self::default();
        for (truth, predicted) in pairs {
            matrix.record(truth, predicted);
        }
        matrix
    }

    pub fn record(&mut self, truth: RiskLabel, predicted: RiskLabel) {
        self.counts[truth.index()][predicted.index()] += 1;
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }

    #[must_use]
    pub fn correct(&self) -> usize {
        (0..NUM_CLASSES).map(|i| self.counts[i][i]).sum()
    }

    /// Fraction of correct predictions; 0 for an empty matrix.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            n => self.correct() as f64 / n as f64,
        }
    }

    /// True positives over all true examples of `label`; `None` if there are none.
    #[must_use]
    pub fn recall(&self, label: RiskLabel) -> Option<f64> {
        let row = &self.counts[label.index()];
        let support: usize = row.iter().sum();
        (support > 0).then(|| row[label.index()] as f64 / support as f64)
    }

    /// True positives over all predictions of `label`; `None` if never predicted.
    #[must_use]
    pub fn precision(&self, label: RiskLabel) -> Option<f64> {
        let k = label.index();
        let predicted: usize = self.counts.iter().map(|row| row[k]).sum();
        (predicted > 0).then(|| self.counts[k][k] as f64 / predicted as f64)
    }

    #[must_use]
    pub fn support(&self, label: RiskLabel) -> usize {
        self.counts[label.index()].iter().sum()
    }
}

/// Per-class line of the classification report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub label: RiskLabel,
    pub precision: Option<f64>,
    pub recall: Option<f64>,
    pub f1: Option<f64>,
    pub support: usize,
}

/// Accuracy and crisis recall of a reference predictor on the same test set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineComparison {
    pub name: String,
    pub accuracy: f64,
    pub crisis_recall: Option<f64>,
}

/// Result of evaluating a fitted model on the held-out partition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub accuracy: f64,
    pub confusion: ConfusionMatrix,
    pub per_class: Vec<ClassMetrics>,
    /// `None` when the test partition has no crisis examples
    pub crisis_recall: Option<f64>,
    pub train_size: usize,
    pub test_size: usize,
    pub iterations: usize,
    pub converged: bool,
    pub baseline: Option<BaselineComparison>,
    pub warnings: Vec<FitWarning>,
}

impl EvaluationReport {
    /// Derive all metrics from a confusion matrix.
    ///
    /// Classes absent from the test partition get an `UndefinedRecall`
    /// warning.
    #[must_use]
    pub fn from_confusion(confusion: ConfusionMatrix, train_size: usize) -> Self {
        let mut warnings = Vec::new();
        let per_class = RiskLabel::ALL
            .iter()
            .map(|&label| {
                let precision = confusion.precision(label);
                let recall = confusion.recall(label);
                if recall.is_none() {
                    warnings.push(FitWarning::UndefinedRecall { label });
                }
                let f1 = match (precision, recall) {
                    (Some(p), Some(r)) if p + r > 0.0 => Some(2.0 * p * r / (p + r)),
                    (Some(_), Some(_)) => Some(0.0),
                    _ => None,
                };
                ClassMetrics {
                    label,
                    precision,
                    recall,
                    f1,
                    support: confusion.support(label),
                }
            })
            .collect();

        Self {
            accuracy: confusion.accuracy(),
            crisis_recall: confusion.recall(RiskLabel::Crisis),
            test_size: confusion.total(),
            train_size,
            confusion,
            per_class,
            iterations: 0,
            converged: true,
            baseline: None,
            warnings,
        }
    }
}

fn metric(value: Option<f64>) -> String {
    value.map_or_else(|| "undefined".to_string(), |v| format!("{v:.4}"))
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Train size: {}  Test size: {}", self.train_size, self.test_size)?;
        writeln!(
            f,
            "Solver: {} after {} iterations",
            if self.converged { "converged" } else { "NOT converged" },
            self.iterations
        )?;
        writeln!(f, "Accuracy: {:.4}", self.accuracy)?;

        writeln!(f, "\nClassification Report:")?;
        writeln!(f, "{:>10} {:>10} {:>10} {:>10} {:>8}", "", "precision", "recall", "f1", "support")?;
        for m in &self.per_class {
            writeln!(
                f,
                "{:>10} {:>10} {:>10} {:>10} {:>8}",
                m.label.as_str(),
                metric(m.precision),
                metric(m.recall),
                metric(m.f1),
                m.support
            )?;
        }

        writeln!(f, "\nConfusion Matrix (rows = true, cols = predicted):")?;
        for row in &self.confusion.counts {
            let cells: Vec<String> = row.iter().map(|c| format!("{c:>6}")).collect();
            writeln!(f, "  [{}]", cells.join(""))?;
        }

        writeln!(f, "\nRecall (crisis class): {}", metric(self.crisis_recall))?;

        if let Some(baseline) = &self.baseline {
            writeln!(
                f,
                "Baseline ({}): accuracy {:.4}, crisis recall {}",
                baseline.name,
                baseline.accuracy,
                metric(baseline.crisis_recall)
            )?;
        }

        for warning in &self.warnings {
            writeln!(f, "WARNING: {warning}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use RiskLabel::*;

    #[test]
    fn test_confusion_metrics() {
        let cm = ConfusionMatrix::from_pairs([
            (Low, Low),
            (Low, Low),
            (Low, Moderate),
            (Moderate, Moderate),
            (High, High),
            (Crisis, Crisis),
            (Crisis, High),
        ]);
        assert_eq!(cm.total(), 7);
        assert_eq!(cm.correct(), 5);
        assert!((cm.accuracy() - 5.0 / 7.0).abs() < 1e-12);
        assert_eq!(cm.recall(Crisis), Some(0.5));
        assert_eq!(cm.precision(High), Some(0.5));
        assert_eq!(cm.support(Low), 3);
    }

    #[test]
    fn test_missing_crisis_is_undefined_not_zero() {
        let cm = ConfusionMatrix::from_pairs([(Low, Low), (Moderate, Low), (High, High)]);
        let report = EvaluationReport::from_confusion(cm, 10);

        assert_eq!(report.crisis_recall, None);
        assert!(report
            .warnings
            .contains(&FitWarning::UndefinedRecall { label: Crisis }));
        assert!(report.to_string().contains("Recall (crisis class): undefined"));
    }

    #[test]
    fn test_zero_recall_is_defined() {
        let cm = ConfusionMatrix::from_pairs([(Crisis, High), (Low, Low)]);
        let report = EvaluationReport::from_confusion(cm, 2);
        assert_eq!(report.crisis_recall, Some(0.0));
        assert_eq!(report.per_class[Crisis.index()].f1, None);
    }

    #[test]
    fn test_report_lists_every_class() {
        let cm = ConfusionMatrix::from_pairs([(Low, Low), (Moderate, Moderate), (High, High), (Crisis, Crisis)]);
        let report = EvaluationReport::from_confusion(cm, 4);
        let text = report.to_string();
        for label in RiskLabel::ALL {
            assert!(text.contains(label.as_str()));
        }
        assert!(report.warnings.is_empty());
    }
}
