//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use anyhow::Result;

use intake_core::{Field, PartialPatientRecord};

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

    /// Print a patient snapshot
    pub fn print_record(&self, record: &PartialPatientRecord) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                for line in record_lines(record) {
                    println!("{}", line);
                }
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(record)?);
            }
            OutputFormat::Quiet => {}
        }
        Ok(())
    }

    /// Print the nationality option list
    pub fn print_countries(&self, countries: &[String]) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                if countries.is_empty() {
                    println!("No countries found.");
                    return Ok(());
                }
                for name in countries {
                    println!("{}", name);
                }
                println!("\n{} country(ies)", countries.len());
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(countries)?);
            }
            OutputFormat::Quiet => {
                for name in countries {
                    println!("{}", name);
                }
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

/// `Label: value` lines for the fields present in a snapshot
fn record_lines(record: &PartialPatientRecord) -> Vec<String> {
    let mut lines: Vec<String> = Field::ALL
        .iter()
        .filter_map(|field| {
            record
                .get(*field)
                .map(|value| format!("{:<32}{}", format!("{}:", field.label()), value))
        })
        .collect();

    if let Some(status) = record.status {
        lines.push(format!("{:<32}{}", "Status:", status));
    }
    lines
}
