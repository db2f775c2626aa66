//! Doctor command - verify system requirements and configuration.

use crate::cli::{format_size, Output};
use crate::config::{Settings, SynthesisProvider, TranscriptionProvider};
use crate::knowledge;
use console::style;
use std::process::Command;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    /// Downgrade an error to a warning for optional collaborators.
    fn optional(mut self) -> Self {
        if self.status == CheckStatus::Error {
            self.status = CheckStatus::Warning;
        }
        self
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

fn print_section(title: &str, checks: &[CheckResult]) {
    println!("{}", style(title).bold());
    for check in checks {
        check.print();
    }
    println!();
}

/// Run all diagnostic checks.
pub fn run_doctor(settings: &Settings) -> anyhow::Result<()> {
    Output::header("Hark Doctor");
    println!();
    println!("Checking system requirements and configuration...\n");

    let mut checks = Vec::new();

    // Decoding is required for voice queries; recognizer and synthesizer
    // failures only degrade answers.
    let mut tools = vec![check_tool(
        &settings.audio.ffmpeg,
        "-version",
        install_hint_ffmpeg(),
    )];
    if settings.transcription.provider == TranscriptionProvider::Command {
        tools.push(
            check_tool(
                &settings.transcription.command,
                "--help",
                "Install whisper.cpp or set transcription.command",
            )
            .optional(),
        );
    }
    if settings.synthesis.provider == SynthesisProvider::Espeak {
        tools.push(check_tool(&settings.synthesis.program, "--version", install_hint_espeak()).optional());
    }
    print_section("External Tools", &tools);
    checks.extend(tools);

    let api = vec![check_openai_api_key(settings)];
    print_section("API Configuration", &api);
    checks.extend(api);

    let directories = check_directories(settings);
    print_section("Directories", &directories);
    checks.extend(directories);

    let kb = vec![check_knowledge(settings)];
    print_section("Knowledge Base", &kb);
    checks.extend(kb);

    let config = vec![check_config_file()];
    print_section("Configuration", &config);
    checks.extend(config);

    // Summary
    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before using Hark.",
            errors
        ));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! Hark is ready to use.");
    }

    Ok(())
}

/// Check if an external tool is available.
fn check_tool(name: &str, probe_arg: &str, hint: &str) -> CheckResult {
    match Command::new(name).arg(probe_arg).output() {
        Ok(output) if output.status.success() => {
            let version = first_line(&output.stdout).unwrap_or_else(|| "installed".to_string());
            CheckResult::ok(name, &truncate(&version, 50))
        }
        // Some recognizers exit non-zero on --help but are still usable.
        Ok(_) => CheckResult::ok(name, "installed"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            CheckResult::error(name, "not found", hint)
        }
        Err(e) => CheckResult::error(name, &format!("error: {}", e), hint),
    }
}

fn first_line(bytes: &[u8]) -> Option<String> {
    String::from_utf8_lossy(bytes)
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(str::to_string)
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() > max_chars {
        format!("{}...", s.chars().take(max_chars).collect::<String>())
    } else {
        s.to_string()
    }
}

/// Check if OpenAI API key is configured, when a provider needs it.
fn check_openai_api_key(settings: &Settings) -> CheckResult {
    let needed = settings.transcription.provider == TranscriptionProvider::Whisper
        || settings.synthesis.provider == SynthesisProvider::OpenAI;

    match std::env::var("OPENAI_API_KEY") {
        Ok(key) if key.starts_with("sk-") && key.len() > 20 => {
            CheckResult::ok("OPENAI_API_KEY", &format!("configured ({})", mask_key(&key)))
        }
        Ok(key) if !key.is_empty() => CheckResult::warning(
            "OPENAI_API_KEY",
            "set but format looks unusual",
            "Expected format: sk-... (OpenAI API key)",
        ),
        _ if !needed => CheckResult::ok("OPENAI_API_KEY", "not needed by configured providers"),
        _ => CheckResult::warning(
            "OPENAI_API_KEY",
            "not set",
            "Set with: export OPENAI_API_KEY='sk-...' (speech services will degrade without it)",
        ),
    }
}

/// Show the first 7 and last 4 characters of a key.
fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 11 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..7].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

/// Check data directories.
fn check_directories(settings: &Settings) -> Vec<CheckResult> {
    [
        ("Data directory", settings.data_dir()),
        ("Uploads", settings.upload_dir()),
        ("Synthesized audio", settings.audio_out_dir()),
    ]
    .into_iter()
    .map(|(name, dir)| {
        if dir.is_dir() {
            CheckResult::ok(name, &dir.display().to_string())
        } else {
            CheckResult::warning(
                name,
                &format!("{} (will be created)", dir.display()),
                "Directory will be created on first use",
            )
        }
    })
    .collect()
}

/// Check that the knowledge base parses.
fn check_knowledge(settings: &Settings) -> CheckResult {
    let source = settings.knowledge_source();
    let bytes = match std::fs::read(&source) {
        Ok(bytes) => bytes,
        Err(_) => {
            return CheckResult::warning(
                "Q&A file",
                &format!("{} not found", source.display()),
                "Built-in sample questions will be used",
            )
        }
    };

    match knowledge::parse_csv(&bytes) {
        Ok(entries) if !entries.is_empty() => CheckResult::ok(
            "Q&A file",
            &format!(
                "{} ({} pairs, {})",
                source.display(),
                entries.len(),
                format_size(bytes.len() as u64)
            ),
        ),
        Ok(_) => CheckResult::warning(
            "Q&A file",
            "no usable rows",
            "Each row needs a question and an answer column",
        ),
        Err(e) => CheckResult::warning(
            "Q&A file",
            &format!("unreadable: {}", e),
            "Expected a CSV with Question/Answer columns",
        ),
    }
}

/// Check if config file exists.
fn check_config_file() -> CheckResult {
    let config_path = Settings::default_config_path();
    if config_path.exists() {
        CheckResult::ok("Config file", &config_path.display().to_string())
    } else {
        CheckResult::warning(
            "Config file",
            "using defaults",
            "Create with: hark config edit",
        )
    }
}

/// Platform-specific install hint for ffmpeg.
fn install_hint_ffmpeg() -> &'static str {
    if cfg!(target_os = "macos") {
        "Install with: brew install ffmpeg"
    } else if cfg!(target_os = "linux") {
        "Install with: sudo apt install ffmpeg (or your package manager)"
    } else {
        "Install from: https://ffmpeg.org/download.html"
    }
}

/// Platform-specific install hint for espeak-ng.
fn install_hint_espeak() -> &'static str {
    if cfg!(target_os = "macos") {
        "Install with: brew install espeak-ng"
    } else if cfg!(target_os = "linux") {
        "Install with: sudo apt install espeak-ng (or your package manager)"
    } else {
        "Install from: https://github.com/espeak-ng/espeak-ng"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_result_ok() {
        let result = CheckResult::ok("test", "passed");
        assert_eq!(result.status, CheckStatus::Ok);
        assert!(result.hint.is_none());
    }

    #[test]
    fn test_optional_downgrades_errors() {
        let result = CheckResult::error("espeak-ng", "not found", "install it").optional();
        assert_eq!(result.status, CheckStatus::Warning);
        assert_eq!(result.hint, Some("install it".to_string()));
    }

    #[test]
    fn test_missing_tool() {
        let result = check_tool("hark-no-such-tool", "--version", "install it");
        assert_eq!(result.status, CheckStatus::Error);
    }

    #[test]
    fn test_knowledge_check_reads_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("qa.csv");
        std::fs::write(&path, "Question,Answer\nhi,hello\n").unwrap();

        let mut settings = Settings::default();
        settings.knowledge.source = path.to_string_lossy().into_owned();
        let result = check_knowledge(&settings);
        assert_eq!(result.status, CheckStatus::Ok);
        assert!(result.message.contains("1 pairs"));

        settings.knowledge.source = dir.path().join("missing.csv").to_string_lossy().into_owned();
        assert_eq!(check_knowledge(&settings).status, CheckStatus::Warning);
    }

    #[test]
    fn test_mask_key() {
        assert_eq!(mask_key("sk-proj-abcdefghijklmnop1234"), "sk-proj...1234");
        // Multi-byte characters at the cut points must not split.
        assert_eq!(mask_key("sk-ééééééééééééééééééé€€€€"), "sk-éééé...€€€€");
        assert_eq!(mask_key("short"), "*****");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 50), "short");
        assert_eq!(truncate("abcdef", 3), "abc...");
    }
}
