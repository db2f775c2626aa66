//! Listen command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::{format_size, Output};
use crate::config::Settings;
use crate::orchestrator::QueryOrchestrator;
use anyhow::{Context, Result};
use std::path::Path;

/// Run the listen command on a recorded question.
pub async fn run_listen(file: &str, json: bool, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(&settings, Operation::Listen) {
        Output::error(&format!("{}", e));
        Output::info("Run 'hark doctor' for detailed diagnostics.");
        return Err(e.into());
    }
    for issue in preflight::degradations(&settings, Operation::Listen) {
        Output::warning(&issue);
    }

    let path = Settings::expand_path(file);
    let bytes = tokio::fs::read(&path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let file_name = Path::new(&path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "recording".to_string());

    if !json {
        Output::info(&format!("Listening to {} ({})", file_name, format_size(bytes.len() as u64)));
    }

    let orchestrator = QueryOrchestrator::new(&settings)?;

    let spinner = Output::spinner("Transcribing and matching...");
    let result = orchestrator.voice_query(&bytes, &file_name).await;
    spinner.finish_and_clear();

    match result {
        Ok(response) if json => {
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Ok(response) => Output::query_response(&response),
        Err(e) if e.is_conversion_error() => {
            Output::error("Could not decode the audio file.");
            return Err(e.into());
        }
        Err(e) => {
            Output::error(&format!("Failed to answer: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
