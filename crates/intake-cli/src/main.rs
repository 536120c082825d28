//! Intake CLI
//!
//! Command-line interface for patient intake: the patient form, the staff
//! monitor and a few scripting helpers.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use intake_core::Config;

mod commands;
mod output;
mod tui;

use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "intake")]
#[command(about = "Patient intake - live form and staff monitor")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Config file to use instead of the default
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fill in the patient intake form (default)
    Form,
    /// Watch patient updates as staff
    Monitor,
    /// Send one JSON snapshot to the sync endpoint
    Push {
        /// JSON file, or - for stdin
        source: String,
    },
    /// List nationality options
    Countries,
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (server_addr, server_url, debounce_ms, inactivity_ms,
        /// countries_url, data_dir, log_file)
        key: String,
        /// Configuration value ("none" clears optional keys)
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));
    let config_path = cli.config.as_ref();

    let command = cli.command.unwrap_or(Commands::Form);

    // Config commands manage the file themselves
    if let Commands::Config { command } = command {
        return handle_config_command(command, config_path, &output);
    }

    let config = Config::load_with_cli_override(config_path)?;

    match command {
        Commands::Form => tui::form::run(&config).await,
        Commands::Monitor => tui::monitor::run(&config).await,
        Commands::Push { source } => commands::push::push(&config, &source, &output).await,
        Commands::Countries => commands::countries::list(&config, &output).await,
        Commands::Config { command } => handle_config_command(command, config_path, &output),
    }
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
        Some(ConfigCommands::Set { key, value }) => {
            commands::config::set(key, value, config_path, output)
        }
    }
}
