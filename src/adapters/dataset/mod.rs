//! Dataset adapter: CSV implementation of CohortStore.
//!
//! One row per labeled example, header
//! `phq9,gad7,ghq12,quiz,mood_avg,mood_trend,chat_neg,label`. Integer
//! features are written as integers and the label as its ordinal (0-3).

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, WriterBuilder};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{CohortDataset, FeatureVector, LabeledExample, RiskLabel, FEATURE_NAMES};
use crate::ports::CohortStore;

/// Name of the label column.
pub const LABEL_COLUMN: &str = "label";

/// Errors from reading or writing a cohort file.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Missing columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("Row {row}: invalid label {value} (expected 0-3)")]
    InvalidLabel { row: usize, value: i64 },

    #[error("Row {row}: {reason}")]
    OutOfDomain { row: usize, reason: String },
}

#[derive(Debug, Serialize)]
struct WriteRow {
    phq9: i64,
    gad7: i64,
    ghq12: i64,
    quiz: f64,
    mood_avg: f64,
    mood_trend: i64,
    chat_neg: f64,
    label: usize,
}

impl From<&LabeledExample> for WriteRow {
    #[allow(clippy::cast_possible_truncation)]
    fn from(example: &LabeledExample) -> Self {
        let f = &example.features;
        Self {
            phq9: f.phq9.round() as i64,
            gad7: f.gad7.round() as i64,
            ghq12: f.ghq12.round() as i64,
            quiz: f.quiz,
            mood_avg: f.mood_avg,
            mood_trend: f.mood_trend.round() as i64,
            chat_neg: f.chat_neg,
            label: example.label.index(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ReadRow {
    phq9: f64,
    gad7: f64,
    ghq12: f64,
    quiz: f64,
    mood_avg: f64,
    mood_trend: f64,
    chat_neg: f64,
    label: i64,
}

/// Cohort store backed by a single CSV file.
#[derive(Debug, Clone)]
pub struct CsvCohortStore {
    path: PathBuf,
}

impl CsvCohortStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> DatasetError {
        DatasetError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl CohortStore for CsvCohortStore {
    type Error = DatasetError;

    fn write_cohort(&self, dataset: &CohortDataset) -> Result<(), Self::Error> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        let file = File::create(&self.path).map_err(|e| self.io_error(e))?;
        let mut writer = WriterBuilder::new().has_headers(true).from_writer(file);
        for example in dataset.examples() {
            writer.serialize(WriteRow::from(example))?;
        }
        writer.flush().map_err(|e| self.io_error(e))?;

        tracing::info!("Wrote {} rows to {}", dataset.len(), self.path.display());
        Ok(())
    }

    fn read_cohort(&self) -> Result<CohortDataset, Self::Error> {
        let file = File::open(&self.path).map_err(|e| self.io_error(e))?;
        let mut reader = ReaderBuilder::new().has_headers(true).from_reader(file);

        let headers = reader.headers()?.clone();
        let missing: Vec<String> = FEATURE_NAMES
            .iter()
            .copied()
            .chain(std::iter::once(LABEL_COLUMN))
            .filter(|name| !headers.iter().any(|h| h.trim() == *name))
            .map(str::to_string)
            .collect();
        if !missing.is_empty() {
            return Err(DatasetError::MissingColumns(missing));
        }

        let mut examples = Vec::new();
        for (i, record) in reader.deserialize::<ReadRow>().enumerate() {
            // Row numbers are 1-based and count the header line.
            let row = i + 2;
            let raw = record?;
            let label = usize::try_from(raw.label)
                .ok()
                .and_then(RiskLabel::from_index)
                .ok_or(DatasetError::InvalidLabel {
                    row,
                    value: raw.label,
                })?;

            let features = FeatureVector {
                phq9: raw.phq9,
                gad7: raw.gad7,
                ghq12: raw.ghq12,
                quiz: raw.quiz,
                mood_avg: raw.mood_avg,
                mood_trend: raw.mood_trend,
                chat_neg: raw.chat_neg,
            };
            features
                .validate_domain()
                .map_err(|errors| DatasetError::OutOfDomain {
                    row,
                    reason: errors.join("; "),
                })?;

            examples.push(LabeledExample::new(features, label));
        }

        tracing::info!("Read {} rows from {}", examples.len(), self.path.display());
        Ok(CohortDataset::from_examples(examples))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn example(phq9: f64, label: RiskLabel) -> LabeledExample {
        LabeledExample::new(
            FeatureVector {
                phq9,
                gad7: 4.0,
                ghq12: 2.0,
                quiz: 0.125,
                mood_avg: 3.75,
                mood_trend: -1.0,
                chat_neg: 0.333,
            },
            label,
        )
    }

    #[test]
    fn test_write_then_read_preserves_rows() {
        let dir = tempdir().expect("Failed to create temp dir");
        let store = CsvCohortStore::new(dir.path().join("nested/cohort.csv"));
        let dataset = CohortDataset::from_examples(vec![
            example(3.0, RiskLabel::Low),
            example(24.0, RiskLabel::Crisis),
        ]);

        store.write_cohort(&dataset).expect("Write should succeed");
        let loaded = store.read_cohort().expect("Read should succeed");

        assert_eq!(loaded.examples(), dataset.examples());
    }

    #[test]
    fn test_integer_fields_written_as_integers() {
        let dir = tempdir().expect("Failed to create temp dir");
        let store = CsvCohortStore::new(dir.path().join("cohort.csv"));
        store
            .write_cohort(&CohortDataset::from_examples(vec![example(12.0, RiskLabel::Moderate)]))
            .expect("Write should succeed");

        let text = fs::read_to_string(store.path()).expect("Read file");
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("phq9,gad7,ghq12,quiz,mood_avg,mood_trend,chat_neg,label")
        );
        assert_eq!(lines.next(), Some("12,4,2,0.125,3.75,-1,0.333,1"));
    }

    #[test]
    fn test_missing_column_rejected() {
        let dir = tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("cohort.csv");
        fs::write(&path, "phq9,gad7,ghq12,quiz,mood_avg,chat_neg,label\n1,1,1,0.1,3,0.1,0\n")
            .expect("Write file");

        let err = CsvCohortStore::new(path).read_cohort().unwrap_err();
        assert!(matches!(err, DatasetError::MissingColumns(ref cols) if cols == &["mood_trend"]));
    }

    #[test]
    fn test_invalid_label_rejected() {
        let dir = tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("cohort.csv");
        fs::write(
            &path,
            "phq9,gad7,ghq12,quiz,mood_avg,mood_trend,chat_neg,label\n1,1,1,0.1,3,0,0.1,4\n",
        )
        .expect("Write file");

        let err = CsvCohortStore::new(path).read_cohort().unwrap_err();
        assert!(matches!(err, DatasetError::InvalidLabel { row: 2, value: 4 }));
    }

    #[test]
    fn test_out_of_domain_row_rejected() {
        let dir = tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("cohort.csv");
        fs::write(
            &path,
            "phq9,gad7,ghq12,quiz,mood_avg,mood_trend,chat_neg,label\n30,1,1,0.1,3,0,0.1,0\n",
        )
        .expect("Write file");

        let err = CsvCohortStore::new(path).read_cohort().unwrap_err();
        assert!(matches!(err, DatasetError::OutOfDomain { row: 2, .. }));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempdir().expect("Failed to create temp dir");
        let err = CsvCohortStore::new(dir.path().join("absent.csv"))
            .read_cohort()
            .unwrap_err();
        assert!(matches!(err, DatasetError::Io { .. }));
    }
}
