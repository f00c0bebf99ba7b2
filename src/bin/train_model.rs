//! Model training utility.
//!
//! Reads a cohort CSV, fits the scaler and classifier, prints the evaluation
//! report and persists both as one artifact bundle.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin train_model -- [--data <path>] [--model-dir <dir>] \
//!     [--seed <s>] [--test-fraction <f>] [--max-iter <n>]
//! ```

use anyhow::{bail, Result};

use soulsupport::adapters::{CsvCohortStore, JsonArtifactStore, MultinomialLogisticRegression};
use soulsupport::application::{FitPipeline, FitResult};
use soulsupport::config::PipelineConfig;
use soulsupport::logging::{self, LogSink};
use soulsupport::ports::{ArtifactStore, CohortStore};

fn usage() -> String {
    "Usage: train_model [--data <path>] [--model-dir <dir>] [--seed <s>] \
     [--test-fraction <f>] [--max-iter <n>]"
        .to_string()
}

fn train(config: &PipelineConfig) -> soulsupport::Result<FitResult> {
    let dataset = CsvCohortStore::new(&config.data_path).read_cohort()?;
    tracing::info!("Loaded {} examples from {}", dataset.len(), config.data_path.display());

    let pipeline = FitPipeline::new(MultinomialLogisticRegression::new(config.solver()))
        .with_test_fraction(config.test_fraction);
    let result = pipeline.fit(&dataset, config.seed)?;

    let bundle = result.bundle();
    JsonArtifactStore::new(&config.model_dir).save_bundle(&bundle)?;
    tracing::info!("Bundle {} written", bundle.bundle_id);
    Ok(result)
}

fn main() -> Result<()> {
    let _guard = logging::init(LogSink::Stderr)?;

    let mut config = PipelineConfig::from_env()?;
    for arg in config.apply_args(std::env::args().skip(1))? {
        match arg.as_str() {
            "-h" | "--help" => {
                println!("{}", usage());
                return Ok(());
            }
            other => bail!("Unknown argument: {other}\n{}", usage()),
        }
    }

    let result = train(&config)?;
    println!("{}", result.report);
    println!("Saved artifacts to {}", config.model_dir.display());
    Ok(())
}
