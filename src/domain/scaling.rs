//! Per-feature standardization.

use serde::{Deserialize, Serialize};

use super::features::{FeatureArray, NUM_FEATURES};

/// Standardization fit on the training partition: `(x - mean) / std`.
///
/// Inference must apply the exact mean/std used during training. A mismatch
/// produces no error, only wrong predictions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalingTransform {
    pub mean: FeatureArray,
    /// Population standard deviation; zero-spread features store 1.0
    pub std: FeatureArray,
}

impl ScalingTransform {
    /// Fit mean and population standard deviation per column.
    ///
    /// Returns `None` for an empty partition.
    #[must_use]
    pub fn fit(rows: &[FeatureArray]) -> Option<Self> {
        if rows.is_empty() {
            return None;
        }
        let n = rows.len() as f64;

        let mut mean = [0.0; NUM_FEATURES];
        for row in rows {
            for (m, x) in mean.iter_mut().zip(row) {
                *m += x;
            }
        }
        mean.iter_mut().for_each(|m| *m /= n);

        let mut var = [0.0; NUM_FEATURES];
        for row in rows {
            for ((v, x), m) in var.iter_mut().zip(row).zip(&mean) {
                *v += (x - m).powi(2);
            }
        }

        let std = var.map(|v| {
            let s = (v / n).sqrt();
            if s > f64::EPSILON {
                s
            } else {
                1.0
            }
        });

        Some(Self { mean, std })
    }

    #[must_use]
    pub fn transform(&self, x: &FeatureArray) -> FeatureArray {
        let mut out = [0.0; NUM_FEATURES];
        for (i, o) in out.iter_mut().enumerate() {
            *o = (x[i] - self.mean[i]) / self.std[i];
        }
        out
    }

    #[must_use]
    pub fn transform_all(&self, rows: &[FeatureArray]) -> Vec<FeatureArray> {
        rows.iter().map(|r| self.transform(r)).collect()
    }

    /// Check the parameters are usable for scoring.
    ///
    /// # Errors
    /// Returns a description of the first invalid parameter.
    pub fn check(&self) -> Result<(), String> {
        for i in 0..NUM_FEATURES {
            if !self.mean[i].is_finite() {
                return Err(format!("scaler mean[{i}] is not finite"));
            }
            if !self.std[i].is_finite() || self.std[i] <= 0.0 {
                return Err(format!("scaler std[{i}] must be finite and > 0"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows() -> Vec<FeatureArray> {
        vec![
            [2.0, 4.0, 1.0, 0.1, 4.5, -1.0, 0.2],
            [4.0, 8.0, 3.0, 0.3, 3.5, 0.0, 0.4],
            [6.0, 12.0, 5.0, 0.5, 2.5, 1.0, 0.6],
        ]
    }

    #[test]
    fn test_fit_population_statistics() {
        let scaler = ScalingTransform::fit(&rows()).expect("non-empty");
        assert!((scaler.mean[0] - 4.0).abs() < 1e-12);
        // population std of {2,4,6} is sqrt(8/3)
        assert!((scaler.std[0] - (8.0f64 / 3.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_mean_maps_to_zero() {
        let scaler = ScalingTransform::fit(&rows()).expect("non-empty");
        let z = scaler.transform(&scaler.mean);
        assert!(z.iter().all(|v| v.abs() < 1e-12));
    }

    #[test]
    fn test_constant_column_uses_unit_std() {
        let constant = vec![[1.0; NUM_FEATURES]; 5];
        let scaler = ScalingTransform::fit(&constant).expect("non-empty");
        assert!(scaler.std.iter().all(|s| (*s - 1.0).abs() < f64::EPSILON));
        assert!(scaler.transform(&[1.0; NUM_FEATURES]).iter().all(|v| *v == 0.0));
        assert!(scaler.check().is_ok());
    }

    #[test]
    fn test_empty_partition() {
        assert!(ScalingTransform::fit(&[]).is_none());
    }

    #[test]
    fn test_check_rejects_zero_std() {
        let mut scaler = ScalingTransform::fit(&rows()).expect("non-empty");
        scaler.std[2] = 0.0;
        assert!(scaler.check().is_err());
    }
}
