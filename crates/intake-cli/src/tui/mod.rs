//! Terminal user interfaces
//!
//! - `form`: the patient-facing intake form
//! - `monitor`: the staff-facing live monitor
//!
//! Both take over the terminal (raw mode, alternate screen) and poll
//! crossterm for keys every 50ms between background events.

pub mod form;
pub mod monitor;

use std::fs::File;
use std::io::{stdout, Stdout};

use anyhow::Result;
use crossterm::{
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::prelude::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

use intake_core::monitor::BadgeColor;
use intake_core::Config;

/// How often the UI checks for key presses
const TICK: std::time::Duration = std::time::Duration::from_millis(50);

/// Switch the terminal into TUI mode
fn enter_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    Ok(Terminal::new(CrosstermBackend::new(stdout()))?)
}

/// Give the terminal back to the shell
fn restore_terminal() -> Result<()> {
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;
    Ok(())
}

/// Terminal colour for a status badge
fn badge_color(color: BadgeColor) -> Color {
    match color {
        BadgeColor::Green => Color::Green,
        BadgeColor::Yellow => Color::Yellow,
        BadgeColor::Blue => Color::Blue,
        BadgeColor::Gray => Color::DarkGray,
    }
}

/// Initialize logging for TUI mode
///
/// Only initializes if INTAKE_LOG environment variable is set.
/// Logs to file (config.log_file or default {data_dir}/debug.log).
fn init_tui_logging(config: &Config) {
    let Ok(log_level) = std::env::var("INTAKE_LOG") else {
        return;
    };

    if let Err(e) = config.ensure_data_dir() {
        eprintln!("Warning: {:#}", e);
    }
    let log_path = config.log_path();

    let log_file = match File::create(&log_path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: Could not create log file {:?}: {}", log_path, e);
            return;
        }
    };

    let env_filter = EnvFilter::new(format!(
        "intake_core={},intake_cli={}",
        log_level, log_level
    ));

    // Ignore error if already initialized
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(log_file)
        .try_init();

    info!("TUI logging initialized to {:?}", log_path);
}
