//! Config command handlers

use std::path::PathBuf;

use anyhow::{Context, Result};

use intake_core::Config;

use crate::output::{Output, OutputFormat};

/// Show current configuration
pub fn show(config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "server_addr": config.server_addr,
                    "server_url": config.server_url,
                    "debounce_ms": config.debounce_ms,
                    "inactivity_ms": config.inactivity_ms,
                    "countries_url": config.countries_url,
                    "data_dir": config.data_dir,
                    "log_file": config.log_file
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.server_url);
        }
        OutputFormat::Human => {
            let effective_path = config_path
                .cloned()
                .unwrap_or_else(Config::config_file_path);
            println!("Configuration:");
            println!("  server_addr:   {}", config.server_addr);
            println!("  server_url:    {}", config.server_url);
            println!("  debounce_ms:   {}", config.debounce_ms);
            println!("  inactivity_ms: {}", config.inactivity_ms);
            println!("  countries_url: {}", config.countries_url);
            println!("  data_dir:      {}", config.data_dir.display());
            println!(
                "  log_file:      {}",
                config
                    .log_file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(not set)".to_string())
            );
            println!();
            println!("Sync endpoint:  {}", config.sync_url());
            println!("Config file:    {}", effective_path.display());
        }
    }

    Ok(())
}

/// Set a configuration value
pub fn set(
    key: String,
    value: String,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    let mut config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    // "none" clears optional keys
    let effective = if value == "none" { "" } else { value.as_str() };
    config.set(&key, effective)?;

    // Save to the CLI-specified path or default
    let save_path = config_path
        .cloned()
        .unwrap_or_else(Config::config_file_path);
    config
        .save_to_path(&save_path)
        .context("Failed to save configuration")?;

    output.success(&format!("Set {} = {}", key, value));

    Ok(())
}
