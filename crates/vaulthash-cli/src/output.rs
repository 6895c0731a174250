//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use anyhow::Result;

use vaulthash_core::{BatchReport, RenameDecision, Reporter, TracingReporter};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Check if output is in quiet mode
    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    /// Check if output is JSON
    pub fn is_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }

    /// Print the result of a rename batch
    pub fn print_report(&self, report: &BatchReport) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                let blocked: Vec<_> = report.blocked().collect();
                if !blocked.is_empty() {
                    println!();
                    println!("── Blocked ({}) ──", blocked.len());
                    for decision in blocked {
                        if let RenameDecision::Blocked { from, to, reason } = decision {
                            println!("{} -> {}: {}", from, to, reason);
                        }
                    }
                    println!();
                }
                println!("{}", report.summary());
            }
            OutputFormat::Json => {
                let value = serde_json::json!({
                    "renamed": report.action_count(),
                    "message": report.summary(),
                    "decisions": report.decisions,
                });
                println!("{}", serde_json::to_string_pretty(&value)?);
            }
            OutputFormat::Quiet => {
                println!("{}", report.action_count());
            }
        }
        Ok(())
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }
}

/// Engine reporter for the terminal
///
/// Everything goes to `tracing`; in human mode notices are also printed to
/// stdout and problems to stderr. JSON and quiet output rely on the batch
/// report instead.
pub struct OutputReporter<'a> {
    output: &'a Output,
}

impl<'a> OutputReporter<'a> {
    pub fn new(output: &'a Output) -> Self {
        Self { output }
    }

    fn is_human(&self) -> bool {
        !self.output.is_json() && !self.output.is_quiet()
    }
}

impl Reporter for OutputReporter<'_> {
    fn notify(&self, message: &str) {
        TracingReporter.notify(message);
        if self.is_human() {
            println!("{}", message);
        }
    }

    fn warn(&self, message: &str) {
        TracingReporter.warn(message);
        if self.is_human() {
            eprintln!("⚠ {}", message);
        }
    }

    fn log_error(&self, message: &str) {
        TracingReporter.log_error(message);
        if self.is_human() {
            eprintln!("✗ {}", message);
        }
    }
}
