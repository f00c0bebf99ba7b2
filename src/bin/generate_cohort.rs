//! Synthetic cohort generator.
//!
//! Writes a labeled CSV cohort and prints its class distribution.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin generate_cohort -- [--out <path>] [--size <n>] [--seed <s>]
//! ```

use anyhow::{bail, Result};

use soulsupport::application::CohortGenerator;
use soulsupport::config::PipelineConfig;
use soulsupport::domain::ClassProportions;
use soulsupport::logging::{self, LogSink};
use soulsupport::ports::CohortStore;
use soulsupport::{adapters::CsvCohortStore, RiskLabel};

fn usage() -> String {
    "Usage: generate_cohort [--out <path>] [--size <n>] [--seed <s>]".to_string()
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

    let dataset = CohortGenerator::default().generate(
        config.cohort_size,
        &ClassProportions::default(),
        config.seed,
    )?;
    CsvCohortStore::new(&config.data_path).write_cohort(&dataset)?;

    let total = dataset.len() as f64;
    println!("Class distribution:");
    for (label, count) in RiskLabel::ALL.iter().zip(dataset.class_counts()) {
        println!(
            "  label={} ({}): {} samples ({:.2}%)",
            label.index(),
            label.as_str(),
            count,
            count as f64 / total * 100.0
        );
    }
    println!("Saved {} rows to {}", dataset.len(), config.data_path.display());
    Ok(())
}
