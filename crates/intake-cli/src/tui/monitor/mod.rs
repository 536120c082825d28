//! Staff monitor TUI
//!
//! Subscribes to the `hospital-queue` relay channel and shows the latest
//! patient snapshot. Each update replaces the previous one.

mod ui;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use ratatui::prelude::*;

use intake_core::relay::{
    spawn_subscriber, ConnectionStatus, SubscriberCommand, SubscriberConfig, SubscriberEvent,
    SubscriberHandle, PATIENT_CHANNEL,
};
use intake_core::{Config, MonitorState};

/// Monitor application state
pub struct MonitorApp {
    /// Whether the app should exit
    pub should_quit: bool,
    /// Latest snapshot and derived view
    pub state: MonitorState,
    /// Relay connection status
    pub connection: ConnectionStatus,
    /// Most recent connection error
    pub last_error: Option<String>,
    /// Channel socket URL
    pub url: String,
}

impl MonitorApp {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            should_quit: false,
            state: MonitorState::new(),
            connection: ConnectionStatus::Disconnected,
            last_error: None,
            url: url.into(),
        }
    }

    pub fn handle_subscriber_event(&mut self, event: SubscriberEvent) {
        match event {
            SubscriberEvent::StatusChanged(status) => {
                self.connection = status;
                self.state
                    .set_connected(status == ConnectionStatus::Subscribed);
                if status == ConnectionStatus::Subscribed {
                    self.last_error = None;
                }
            }
            SubscriberEvent::Received(event) => {
                self.state.apply(&event);
            }
            SubscriberEvent::Error(message) => {
                self.last_error = Some(message);
            }
        }
    }
}

/// Run the monitor
pub async fn run(config: &Config) -> Result<()> {
    super::init_tui_logging(config);

    let url = config.channel_url(PATIENT_CHANNEL);
    let mut subscriber = spawn_subscriber(SubscriberConfig::new(url.clone()));

    let mut terminal = super::enter_terminal()?;
    let mut app = MonitorApp::new(url);

    let result = run_app(&mut terminal, &mut app, &mut subscriber).await;

    super::restore_terminal()?;

    // Unsubscribe
    let _ = subscriber.command_tx.send(SubscriberCommand::Shutdown).await;

    result
}

async fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut MonitorApp,
    subscriber: &mut SubscriberHandle,
) -> Result<()> {
    loop {
        terminal.draw(|frame| ui::draw(frame, app))?;

        tokio::select! {
            biased;

            event = subscriber.event_rx.recv() => {
                match event {
                    Some(event) => app.handle_subscriber_event(event),
                    None => break,
                }
            }

            _ = tokio::time::sleep(super::TICK) => {
                if event::poll(std::time::Duration::from_millis(0))? {
                    if let Event::Key(key) = event::read()? {
                        if key.kind != KeyEventKind::Press {
                            continue;
                        }
                        match key.code {
                            KeyCode::Char('q') | KeyCode::Esc => app.should_quit = true,
                            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                                app.should_quit = true;
                            }
                            _ => {}
                        }
                    }
                }
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
