//! Runtime configuration from `SOULSUPPORT_*` environment variables.
//!
//! | Variable | Default |
//! |---|---|
//! | `SOULSUPPORT_DATA_PATH` | `data/synthetic_data.csv` |
//! | `SOULSUPPORT_MODEL_DIR` | `models` |
//! | `SOULSUPPORT_SEED` | `42` |
//! | `SOULSUPPORT_COHORT_SIZE` | `5000` |
//! | `SOULSUPPORT_TEST_FRACTION` | `0.20` |
//! | `SOULSUPPORT_MAX_ITER` | `2000` |
//! | `SOULSUPPORT_TOLERANCE` | `1e-6` |
//! | `SOULSUPPORT_TRIAGE_OVERRIDE` | `true` |
//!
//! Unset variables take the default; set but unparsable ones are errors.
//! Binaries apply their command-line flags on top via [`PipelineConfig::apply_args`].

use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

use crate::adapters::SolverConfig;
use crate::application::DEFAULT_TEST_FRACTION;
use crate::domain::{DEFAULT_COHORT_SIZE, DEFAULT_SEED};

pub const DEFAULT_DATA_PATH: &str = "data/synthetic_data.csv";
pub const DEFAULT_MODEL_DIR: &str = "models";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value:?} ({reason})")]
    Invalid {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Missing value for {0}")]
    MissingValue(String),

    #[error("Unknown argument: {0}")]
    UnknownArgument(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub data_path: PathBuf,
    pub model_dir: PathBuf,
    pub seed: u64,
    pub cohort_size: usize,
    pub test_fraction: f64,
    pub max_iterations: usize,
    pub tolerance: f64,
    pub triage_override: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let solver = SolverConfig::default();
        Self {
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            model_dir: PathBuf::from(DEFAULT_MODEL_DIR),
            seed: DEFAULT_SEED,
            cohort_size: DEFAULT_COHORT_SIZE,
            test_fraction: DEFAULT_TEST_FRACTION,
            max_iterations: solver.max_iterations,
            tolerance: solver.tolerance,
            triage_override: true,
        }
    }
}

/// Parse a boolean flag value.
///
/// # Errors
/// Returns `ConfigError::Invalid` for anything but the usual spellings.
pub fn parse_bool(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim() {
        "1" | "true" | "TRUE" | "yes" | "YES" | "on" => Ok(true),
        "0" | "false" | "FALSE" | "no" | "NO" | "off" => Ok(false),
        other => Err(ConfigError::Invalid {
            name: name.to_string(),
            value: other.to_string(),
            reason: "expected a boolean".to_string(),
        }),
    }
}

fn parse_value<T>(name: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
        name: name.to_string(),
        value: value.to_string(),
        reason: e.to_string(),
    })
}

impl PipelineConfig {
    /// Read configuration from the process environment.
    ///
    /// # Errors
    /// Returns error for set-but-invalid variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    /// Returns error for set-but-invalid variables.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(v) = lookup("SOULSUPPORT_DATA_PATH") {
            config.data_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("SOULSUPPORT_MODEL_DIR") {
            config.model_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("SOULSUPPORT_SEED") {
            config.seed = parse_value("SOULSUPPORT_SEED", &v)?;
        }
        if let Some(v) = lookup("SOULSUPPORT_COHORT_SIZE") {
            config.cohort_size = parse_value("SOULSUPPORT_COHORT_SIZE", &v)?;
        }
        if let Some(v) = lookup("SOULSUPPORT_TEST_FRACTION") {
            config.test_fraction = parse_value("SOULSUPPORT_TEST_FRACTION", &v)?;
        }
        if let Some(v) = lookup("SOULSUPPORT_MAX_ITER") {
            config.max_iterations = parse_value("SOULSUPPORT_MAX_ITER", &v)?;
        }
        if let Some(v) = lookup("SOULSUPPORT_TOLERANCE") {
            config.tolerance = parse_value("SOULSUPPORT_TOLERANCE", &v)?;
        }
        if let Some(v) = lookup("SOULSUPPORT_TRIAGE_OVERRIDE") {
            config.triage_override = parse_bool("SOULSUPPORT_TRIAGE_OVERRIDE", &v)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Apply `--flag value` pairs on top of the current values.
    ///
    /// Returns the arguments this config does not recognize, in order, so a
    /// binary can handle its own flags.
    ///
    /// # Errors
    /// Returns error for a flag without a value or an unparsable value.
    pub fn apply_args<I>(&mut self, args: I) -> Result<Vec<String>, ConfigError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut rest = Vec::new();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            let mut value = || args.next().ok_or_else(|| ConfigError::MissingValue(arg.clone()));
            match arg.as_str() {
                "--data" | "--out" => self.data_path = PathBuf::from(value()?),
                "--model-dir" => self.model_dir = PathBuf::from(value()?),
                "--seed" => self.seed = parse_value(&arg, &value()?)?,
                "--size" => self.cohort_size = parse_value(&arg, &value()?)?,
                "--test-fraction" => self.test_fraction = parse_value(&arg, &value()?)?,
                "--max-iter" => self.max_iterations = parse_value(&arg, &value()?)?,
                "--tolerance" => self.tolerance = parse_value(&arg, &value()?)?,
                _ => rest.push(arg),
            }
        }
        self.validate()?;
        Ok(rest)
    }

    /// Solver settings derived from this config.
    #[must_use]
    pub fn solver(&self) -> SolverConfig {
        SolverConfig {
            max_iterations: self.max_iterations,
            tolerance: self.tolerance,
            ..SolverConfig::default()
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |name: &str, value: String, reason: &str| ConfigError::Invalid {
            name: name.to_string(),
            value,
            reason: reason.to_string(),
        };
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(invalid(
                "test_fraction",
                self.test_fraction.to_string(),
                "must be in (0, 1)",
            ));
        }
        if !(self.tolerance.is_finite() && self.tolerance >= 0.0) {
            return Err(invalid(
                "tolerance",
                self.tolerance.to_string(),
                "must be finite and non-negative",
            ));
        }
        if self.cohort_size == 0 {
            return Err(invalid("cohort_size", "0".to_string(), "must be positive"));
        }
        Ok(())
    }
}
