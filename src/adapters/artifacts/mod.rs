//! Artifacts adapter: JSON implementation of ArtifactStore.
//!
//! A bundle directory holds three files:
//! - `scaler.json`: per-feature mean/std
//! - `model.json`: class ordering, weights, bias
//! - `manifest.json`: format version, bundle id, training summary and the
//!   SHA-256 of the two blobs above
//!
//! Loading refuses to return anything unless both blobs are present, match
//! their manifest digests and carry the same bundle id.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::domain::{
    ArtifactBundle, ClassifierModel, FeatureArray, RiskLabel, ScalingTransform, TrainingSummary,
    BUNDLE_FORMAT_VERSION, NUM_CLASSES,
};
use crate::ports::ArtifactStore;

pub const SCALER_FILE: &str = "scaler.json";
pub const MODEL_FILE: &str = "model.json";
pub const MANIFEST_FILE: &str = "manifest.json";

/// Errors from saving or loading an artifact bundle.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("Artifact missing: {0}")]
    Missing(PathBuf),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Artifact corrupt: {0}")]
    Corrupt(String),

    #[error("Digest mismatch for {file}")]
    DigestMismatch { file: String },

    #[error("Bundle mismatch: manifest {expected}, found {found}")]
    BundleMismatch { expected: String, found: String },

    #[error("Unsupported bundle format version: {0}")]
    UnsupportedVersion(u32),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Serialize, Deserialize)]
struct ScalerFile {
    bundle_id: String,
    feature_names: Vec<String>,
    mean: FeatureArray,
    std: FeatureArray,
}

#[derive(Debug, Serialize, Deserialize)]
struct ModelFile {
    bundle_id: String,
    labels: [RiskLabel; NUM_CLASSES],
    weights: [FeatureArray; NUM_CLASSES],
    bias: [f64; NUM_CLASSES],
}

#[derive(Debug, Serialize, Deserialize)]
struct Manifest {
    version: u32,
    bundle_id: String,
    created_at: DateTime<Utc>,
    training: TrainingSummary,
    /// File name -> lowercase hex SHA-256
    files: BTreeMap<String, String>,
}

fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes).iter().map(|b| format!("{b:02x}")).collect()
}

fn constant_time_eq_str(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff: u8 = 0;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes().iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

/// Artifact store rooted at a directory.
#[derive(Debug, Clone)]
pub struct JsonArtifactStore {
    dir: PathBuf,
}

impl JsonArtifactStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn io_error(path: &Path, source: std::io::Error) -> ArtifactError {
        ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Write via a temporary sibling and rename, so readers never see a
    /// half-written blob.
    fn write_file(&self, name: &str, bytes: &[u8]) -> Result<(), ArtifactError> {
        let path = self.dir.join(name);
        let tmp = self.dir.join(format!(".{name}.tmp"));
        fs::write(&tmp, bytes).map_err(|e| Self::io_error(&tmp, e))?;
        fs::rename(&tmp, &path).map_err(|e| Self::io_error(&path, e))
    }

    fn read_file(&self, name: &str) -> Result<Vec<u8>, ArtifactError> {
        let path = self.dir.join(name);
        match fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ArtifactError::Missing(path)),
            Err(e) => Err(Self::io_error(&path, e)),
        }
    }

    fn verify_digest(manifest: &Manifest, name: &str, bytes: &[u8]) -> Result<(), ArtifactError> {
        let expected = manifest.files.get(name).ok_or_else(|| {
            ArtifactError::Corrupt(format!("{MANIFEST_FILE} does not bind {name}"))
        })?;
        if !constant_time_eq_str(&sha256_hex(bytes), expected) {
            return Err(ArtifactError::DigestMismatch {
                file: name.to_string(),
            });
        }
        Ok(())
    }
}

impl ArtifactStore for JsonArtifactStore {
    type Error = ArtifactError;

    fn save_bundle(&self, bundle: &ArtifactBundle) -> Result<(), Self::Error> {
        bundle.check().map_err(ArtifactError::Corrupt)?;
        fs::create_dir_all(&self.dir).map_err(|e| Self::io_error(&self.dir, e))?;

        let scaler = serde_json::to_vec_pretty(&ScalerFile {
            bundle_id: bundle.bundle_id.clone(),
            feature_names: bundle.feature_names.clone(),
            mean: bundle.scaler.mean,
            std: bundle.scaler.std,
        })?;
        let model = serde_json::to_vec_pretty(&ModelFile {
            bundle_id: bundle.bundle_id.clone(),
            labels: bundle.model.labels,
            weights: bundle.model.weights,
            bias: bundle.model.bias,
        })?;

        let mut files = BTreeMap::new();
        files.insert(SCALER_FILE.to_string(), sha256_hex(&scaler));
        files.insert(MODEL_FILE.to_string(), sha256_hex(&model));
        let manifest = serde_json::to_vec_pretty(&Manifest {
            version: BUNDLE_FORMAT_VERSION,
            bundle_id: bundle.bundle_id.clone(),
            created_at: bundle.created_at,
            training: bundle.training.clone(),
            files,
        })?;

        // Manifest last: until it is replaced, the old manifest no longer
        // matches the new blobs and loading fails closed.
        self.write_file(SCALER_FILE, &scaler)?;
        self.write_file(MODEL_FILE, &model)?;
        self.write_file(MANIFEST_FILE, &manifest)?;

        tracing::info!(
            "Saved bundle {} to {}",
            bundle.bundle_id,
            self.dir.display()
        );
        Ok(())
    }

    fn load_bundle(&self) -> Result<ArtifactBundle, Self::Error> {
        let manifest_bytes = self.read_file(MANIFEST_FILE)?;
        let scaler_bytes = self.read_file(SCALER_FILE)?;
        let model_bytes = self.read_file(MODEL_FILE)?;

        let manifest: Manifest = serde_json::from_slice(&manifest_bytes)
            .map_err(|e| ArtifactError::Corrupt(format!("invalid {MANIFEST_FILE}: {e}")))?;
        if manifest.version != BUNDLE_FORMAT_VERSION {
            return Err(ArtifactError::UnsupportedVersion(manifest.version));
        }

        Self::verify_digest(&manifest, SCALER_FILE, &scaler_bytes)?;
        Self::verify_digest(&manifest, MODEL_FILE, &model_bytes)?;

        let scaler: ScalerFile = serde_json::from_slice(&scaler_bytes)
            .map_err(|e| ArtifactError::Corrupt(format!("invalid {SCALER_FILE}: {e}")))?;
        let model: ModelFile = serde_json::from_slice(&model_bytes)
            .map_err(|e| ArtifactError::Corrupt(format!("invalid {MODEL_FILE}: {e}")))?;

        for found in [&scaler.bundle_id, &model.bundle_id] {
            if *found != manifest.bundle_id {
                return Err(ArtifactError::BundleMismatch {
                    expected: manifest.bundle_id.clone(),
                    found: found.clone(),
                });
            }
        }

        let bundle = ArtifactBundle {
            bundle_id: manifest.bundle_id,
            created_at: manifest.created_at,
            feature_names: scaler.feature_names,
            scaler: ScalingTransform {
                mean: scaler.mean,
                std: scaler.std,
            },
            model: ClassifierModel {
                labels: model.labels,
                weights: model.weights,
                bias: model.bias,
            },
            training: manifest.training,
        };
        bundle.check().map_err(ArtifactError::Corrupt)?;

        tracing::info!(
            "Loaded bundle {} from {}",
            bundle.bundle_id,
            self.dir.display()
        );
        Ok(bundle)
    }

    fn has_bundle(&self) -> bool {
        [MANIFEST_FILE, SCALER_FILE, MODEL_FILE]
            .iter()
            .all(|name| self.dir.join(name).is_file())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NUM_FEATURES;
    use tempfile::tempdir;

    fn sample_bundle(bias: f64) -> ArtifactBundle {
        let scaler = ScalingTransform {
            mean: [10.0, 8.0, 4.0, 0.3, 3.2, 0.1, 0.3],
            std: [5.0, 4.0, 3.0, 0.2, 0.9, 0.7, 0.2],
        };
        let mut model = ClassifierModel::zeros();
        for (k, row) in model.weights.iter_mut().enumerate() {
            for (j, w) in row.iter_mut().enumerate() {
                *w = (k as f64 - 1.5) * 0.1 * (j as f64 + 1.0) + 1e-13;
            }
        }
        model.bias = [bias, 0.2, -0.1, -0.6];
        ArtifactBundle::new(scaler, model, TrainingSummary::default())
    }

    #[test]
    fn test_save_then_load_returns_same_bundle() {
        let dir = tempdir().expect("Failed to create temp dir");
        let store = JsonArtifactStore::new(dir.path().join("models"));
        let bundle = sample_bundle(0.5);

        assert!(!store.has_bundle());
        store.save_bundle(&bundle).expect("Save should succeed");
        assert!(store.has_bundle());

        let loaded = store.load_bundle().expect("Load should succeed");
        assert_eq!(loaded, bundle);
        assert_eq!(loaded.model.weights[0].len(), NUM_FEATURES);
    }

    #[test]
    fn test_missing_blob_fails() {
        let dir = tempdir().expect("Failed to create temp dir");
        let store = JsonArtifactStore::new(dir.path());
        store.save_bundle(&sample_bundle(0.5)).expect("Save should succeed");
        fs::remove_file(dir.path().join(MODEL_FILE)).expect("Remove model");

        let err = store.load_bundle().unwrap_err();
        assert!(matches!(err, ArtifactError::Missing(ref p) if p.ends_with(MODEL_FILE)));
    }

    #[test]
    fn test_tampered_blob_fails_digest() {
        let dir = tempdir().expect("Failed to create temp dir");
        let store = JsonArtifactStore::new(dir.path());
        store.save_bundle(&sample_bundle(0.5)).expect("Save should succeed");

        let path = dir.path().join(SCALER_FILE);
        let text = fs::read_to_string(&path).expect("Read scaler");
        fs::write(&path, text.replacen("10.0", "11.0", 1)).expect("Write scaler");

        let err = store.load_bundle().unwrap_err();
        assert!(matches!(err, ArtifactError::DigestMismatch { ref file } if file == SCALER_FILE));
    }

    #[test]
    fn test_scaler_from_other_run_is_rejected() {
        let dir_a = tempdir().expect("Failed to create temp dir");
        let dir_b = tempdir().expect("Failed to create temp dir");
        let store_a = JsonArtifactStore::new(dir_a.path());
        let store_b = JsonArtifactStore::new(dir_b.path());
        store_a.save_bundle(&sample_bundle(0.5)).expect("Save a");
        store_b.save_bundle(&sample_bundle(0.9)).expect("Save b");

        // Mix: run A's scaler and manifest, run B's model. Re-bind the
        // digest so only the pairing check can catch it.
        let model_b = fs::read(dir_b.path().join(MODEL_FILE)).expect("Read model b");
        fs::write(dir_a.path().join(MODEL_FILE), &model_b).expect("Write model");
        let manifest_path = dir_a.path().join(MANIFEST_FILE);
        let mut manifest: Manifest =
            serde_json::from_slice(&fs::read(&manifest_path).expect("Read manifest"))
                .expect("Parse manifest");
        manifest
            .files
            .insert(MODEL_FILE.to_string(), sha256_hex(&model_b));
        fs::write(&manifest_path, serde_json::to_vec(&manifest).expect("Serialize"))
            .expect("Write manifest");

        let err = store_a.load_bundle().unwrap_err();
        assert!(matches!(err, ArtifactError::BundleMismatch { .. }));
    }

    #[test]
    fn test_unsupported_version_rejected() {
        let dir = tempdir().expect("Failed to create temp dir");
        let store = JsonArtifactStore::new(dir.path());
        store.save_bundle(&sample_bundle(0.5)).expect("Save should succeed");

        let manifest_path = dir.path().join(MANIFEST_FILE);
        let mut manifest: Manifest =
            serde_json::from_slice(&fs::read(&manifest_path).expect("Read manifest"))
                .expect("Parse manifest");
        manifest.version = BUNDLE_FORMAT_VERSION + 1;
        fs::write(&manifest_path, serde_json::to_vec(&manifest).expect("Serialize"))
            .expect("Write manifest");

        let err = store.load_bundle().unwrap_err();
        assert!(matches!(err, ArtifactError::UnsupportedVersion(v) if v == BUNDLE_FORMAT_VERSION + 1));
    }

    #[test]
    fn test_empty_directory_reports_missing_manifest() {
        let dir = tempdir().expect("Failed to create temp dir");
        let err = JsonArtifactStore::new(dir.path()).load_bundle().unwrap_err();
        assert!(matches!(err, ArtifactError::Missing(ref p) if p.ends_with(MANIFEST_FILE)));
    }
}
