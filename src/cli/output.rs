//! CLI output formatting utilities.

use crate::orchestrator::{QueryResponse, StageOutcome};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print a query response for humans.
    pub fn query_response(response: &QueryResponse) {
        if let Some(transcript) = &response.transcript {
            let heard = if transcript.ok {
                style(transcript.text.as_str()).italic()
            } else {
                style(transcript.text.as_str()).yellow()
            };
            println!("{} {}", style("heard:").dim(), heard);
        }

        println!("\n{}\n", response.reply);

        let verdict = if response.matched {
            style(format!("matched (score {})", response.score)).green()
        } else {
            style(format!("no match (best score {})", response.score)).yellow()
        };
        Output::kv("Result", &verdict.to_string());
        Output::kv("Audio", &response.audio_url);

        for record in &response.stages {
            if let StageOutcome::Degraded(reason) = &record.outcome {
                Output::warning(&format!("{:?} degraded: {}", record.stage, reason));
            }
        }
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}

/// Format file size in human-readable format.
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
