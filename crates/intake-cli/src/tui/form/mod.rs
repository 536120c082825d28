//! Intake form TUI
//!
//! Every edit is forwarded to an autosync session, which posts snapshots to
//! the intake server: 500ms after typing stops (`active`), 5s after typing
//! stops (`inactive`), and once on submission (`submitted`).
//!
//! ## Keys
//!
//! - j/k or ↑/↓: Move between fields
//! - Enter or i: Edit field / open option list
//! - x: Clear field
//! - s: Submit
//! - ?: Help
//! - q: Quit

mod app;
mod ui;

use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::prelude::*;
use tokio::sync::mpsc;
use tracing::{info, warn};

use intake_core::countries::fetch_countries;
use intake_core::{spawn_session, AutosyncConfig, AutosyncHandle, Config, SessionCommand, SyncClient};

use app::{FormApp, InputMode};

/// How long to wait on exit for the submitted record to finish sending
const DELIVERY_WAIT: Duration = Duration::from_secs(10);

/// Run the intake form
pub async fn run(config: &Config) -> Result<()> {
    super::init_tui_logging(config);

    let client = SyncClient::from_config(config);
    info!("Syncing to {}", client.url());
    let mut session = spawn_session(AutosyncConfig::from(config), client.clone());

    // Load nationalities in the background
    let (countries_tx, mut countries_rx) = mpsc::channel(1);
    let countries_url = config.countries_url.clone();
    tokio::spawn(async move {
        let names = fetch_countries(&reqwest::Client::new(), &countries_url).await;
        let _ = countries_tx.send(names).await;
    });

    let mut terminal = super::enter_terminal()?;
    let mut app = FormApp::new();

    let result = run_app(&mut terminal, &mut app, &mut session, &client, &mut countries_rx).await;

    super::restore_terminal()?;

    // Cancel pending timers; in-flight sends finish on their own
    let _ = session.command_tx.send(SessionCommand::Shutdown).await;

    if app.is_submitted() {
        // The runtime stops when we return, taking unfinished sends with it
        if client.drain(DELIVERY_WAIT).await {
            println!("{}", app::SUBMITTED_MESSAGE);
        } else {
            warn!("Submitted record still sending after {:?}", DELIVERY_WAIT);
            eprintln!(
                "Registration could not be confirmed: {} did not answer in time.",
                client.url()
            );
        }
    }
    result
}

async fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut FormApp,
    session: &mut AutosyncHandle,
    client: &SyncClient,
    countries_rx: &mut mpsc::Receiver<Vec<String>>,
) -> Result<()> {
    loop {
        app.check_status_timeout();

        terminal.draw(|frame| ui::draw(frame, app))?;

        tokio::select! {
            biased;

            event = session.event_rx.recv() => {
                match event {
                    Some(event) => app.handle_session_event(event),
                    None => {
                        warn!("Autosync session ended unexpectedly");
                        break;
                    }
                }
            }

            _ = client.wait_idle(), if app.awaiting_delivery() => {
                app.confirm_delivered();
            }

            Some(countries) = countries_rx.recv() => {
                app.set_countries(countries);
            }

            _ = tokio::time::sleep(super::TICK) => {
                if !event::poll(std::time::Duration::from_millis(0))? {
                    continue;
                }
                let Event::Key(key) = event::read()? else {
                    continue;
                };
                // Only handle key press events (not release)
                if key.kind != KeyEventKind::Press {
                    continue;
                }

                // If help is showing, any key dismisses it
                if app.show_help {
                    app.show_help = false;
                    continue;
                }

                let command = match app.input_mode {
                    InputMode::Normal => handle_normal_mode(app, key),
                    InputMode::Editing => handle_editing_mode(app, key),
                    InputMode::Picking => handle_picking_mode(app, key),
                };

                if let Some(command) = command {
                    session.command_tx.send(command).await?;
                }
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

/// Handle key events while moving between fields
fn handle_normal_mode(app: &mut FormApp, key: KeyEvent) -> Option<SessionCommand> {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.should_quit = true
        }
        KeyCode::Char('k') | KeyCode::Up | KeyCode::BackTab => app.move_up(),
        KeyCode::Char('j') | KeyCode::Down | KeyCode::Tab => app.move_down(),
        KeyCode::Enter | KeyCode::Char('i') => app.begin_edit(),
        KeyCode::Char('x') | KeyCode::Delete => return app.clear_field(),
        KeyCode::Char('s') => return app.submit(),
        KeyCode::Char('?') => app.toggle_help(),
        _ => {}
    }
    None
}

/// Handle key events while typing into a field
fn handle_editing_mode(app: &mut FormApp, key: KeyEvent) -> Option<SessionCommand> {
    match key.code {
        KeyCode::Esc | KeyCode::Enter => app.finish_edit(),
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => app.finish_edit(),
        KeyCode::Tab => {
            app.finish_edit();
            app.move_down();
        }
        KeyCode::Char(c) => return app.insert_char(c),
        KeyCode::Backspace => return app.delete_char(),
        KeyCode::Left => app.cursor_left(),
        KeyCode::Right => app.cursor_right(),
        _ => {}
    }
    None
}

/// Handle key events in the option picker
fn handle_picking_mode(app: &mut FormApp, key: KeyEvent) -> Option<SessionCommand> {
    match key.code {
        KeyCode::Esc => app.finish_edit(),
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => app.finish_edit(),
        KeyCode::Enter => return app.pick(),
        KeyCode::Up => app.picker_up(),
        KeyCode::Down => app.picker_down(),
        KeyCode::Char(c) => app.picker_insert(c),
        KeyCode::Backspace => app.picker_backspace(),
        _ => {}
    }
    None
}
