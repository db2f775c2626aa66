//! Ask command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::QueryOrchestrator;
use anyhow::Result;

/// Run the ask command.
pub async fn run_ask(text: &str, json: bool, settings: Settings) -> Result<()> {
    for issue in preflight::degradations(&settings, Operation::Ask) {
        Output::warning(&issue);
    }

    let orchestrator = QueryOrchestrator::new(&settings)?;

    let spinner = Output::spinner("Looking up an answer...");
    let result = orchestrator.text_query(text).await;
    spinner.finish_and_clear();

    match result {
        Ok(response) if json => {
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Ok(response) => Output::query_response(&response),
        Err(e) => {
            Output::error(&format!("Failed to answer: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
