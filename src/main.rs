//! SoulSupport inference server.
//!
//! Loads the artifact bundle once, then answers one JSON request per stdin
//! line with one JSON response per stdout line. Logs go to stderr.
//!
//! # Usage
//!
//! ```bash
//! echo '{"phq9":24,"gad7":19,"ghq12":11,"quiz":0.95,"mood_avg":1.2,"mood_trend":-1,"chat_neg":0.9}' \
//!     | cargo run --bin soulsupport -- --model-dir models [--triage]
//! ```

use std::io::{BufRead, Write};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde_json::json;

use soulsupport::adapters::JsonArtifactStore;
use soulsupport::application::{InferenceError, InferenceService, TriageService};
use soulsupport::config::PipelineConfig;
use soulsupport::logging::{self, LogSink};
use soulsupport::FeatureVector;

fn usage() -> String {
    "Usage: soulsupport [--model-dir <dir>] [--triage]".to_string()
}

fn respond(service: &InferenceService, triage: Option<&TriageService>, line: &str) -> String {
    let outcome = match triage {
        Some(triage) => serde_json::from_str::<FeatureVector>(line)
            .map_err(|e| InferenceError::InvalidRequest(e.to_string()))
            .and_then(|features| triage.assess(&features))
            .map(serde_json::to_value),
        None => service.handle_request(line).map(serde_json::to_value),
    };

    match outcome {
        Ok(Ok(value)) => value.to_string(),
        Ok(Err(e)) => json!({ "error": e.to_string() }).to_string(),
        Err(e) => {
            tracing::warn!("Rejected request: {}", e);
            json!({ "error": e.to_string() }).to_string()
        }
    }
}

fn main() -> Result<()> {
    let _guard = logging::init(LogSink::Stderr).context("Failed to initialize logging")?;

    let mut config = PipelineConfig::from_env()?;
    let mut use_triage = false;
    for arg in config.apply_args(std::env::args().skip(1))? {
        match arg.as_str() {
            "--triage" => use_triage = true,
            "-h" | "--help" => {
                eprintln!("{}", usage());
                return Ok(());
            }
            other => bail!("Unknown argument: {other}\n{}", usage()),
        }
    }

    tracing::info!("Starting SoulSupport inference...");
    let store = JsonArtifactStore::new(&config.model_dir);
    let service = InferenceService::from_store(&store).with_context(|| {
        format!(
            "Refusing to start without a valid bundle in {}",
            config.model_dir.display()
        )
    })?;
    let service = Arc::new(service);
    let triage = use_triage
        .then(|| TriageService::new(Some(Arc::clone(&service)), config.triage_override));

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let mut served = 0usize;
    for line in stdin.lock().lines() {
        let line = line.context("Failed to read request")?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        writeln!(out, "{}", respond(&service, triage.as_ref(), line))?;
        out.flush()?;
        served += 1;
    }

    tracing::info!("SoulSupport shutdown complete ({} requests).", served);
    Ok(())
}
