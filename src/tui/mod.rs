//! Terminal dashboard for FXLens.
//!
//! A ratatui/crossterm front end over [`Dashboard`]. One question is answered
//! at a time; terminal events keep being polled while it runs so the user can
//! still quit.

pub mod app;
pub mod events;
mod ui;
pub mod widgets;

pub use app::App;
pub use events::{Event, EventHandler, EventPoll, EventSource};

use crate::app::Dashboard;
use crate::db::QueryParams;
use crate::error::{FxLensError, Result};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, Stdout};
use std::panic;
use tracing::{error, info, warn};

/// The main TUI application runner.
pub struct Tui {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    events: EventPoll<EventHandler>,
}

impl Tui {
    /// Creates a new TUI instance, initializing the terminal.
    pub fn new() -> Result<Self> {
        Ok(Self {
            terminal: Self::setup_terminal()?,
            events: EventPoll::new(EventHandler::new()),
        })
    }

    fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
        enable_raw_mode()
            .map_err(|e| FxLensError::internal(format!("Failed to enable raw mode: {e}")))?;

        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen).map_err(|e| {
            FxLensError::internal(format!("Failed to enter alternate screen: {e}"))
        })?;

        Terminal::new(CrosstermBackend::new(stdout))
            .map_err(|e| FxLensError::internal(format!("Failed to create terminal: {e}")))
    }

    fn restore_terminal(&mut self) -> Result<()> {
        disable_raw_mode()
            .map_err(|e| FxLensError::internal(format!("Failed to disable raw mode: {e}")))?;

        execute!(self.terminal.backend_mut(), LeaveAlternateScreen).map_err(|e| {
            FxLensError::internal(format!("Failed to leave alternate screen: {e}"))
        })?;

        self.terminal
            .show_cursor()
            .map_err(|e| FxLensError::internal(format!("Failed to show cursor: {e}")))
    }

    fn draw(&mut self, app: &App) -> Result<()> {
        self.terminal
            .draw(|frame| ui::render(frame, app))
            .map_err(|e| FxLensError::internal(format!("Failed to draw: {e}")))?;
        Ok(())
    }

    /// Polls for the next terminal event without blocking the runtime.
    async fn next_event(&mut self) -> Result<Event> {
        self.events.next().await
    }

    /// Runs the event loop until the user quits.
    pub async fn run(&mut self, dashboard: &Dashboard, app: &mut App) -> Result<()> {
        let original_hook = panic::take_hook();
        panic::set_hook(Box::new(move |panic_info| {
            let _ = disable_raw_mode();
            let _ = execute!(io::stdout(), LeaveAlternateScreen);
            original_hook(panic_info);
        }));

        let result = self.event_loop(dashboard, app).await;

        let _ = panic::take_hook();
        result
    }

    async fn event_loop(&mut self, dashboard: &Dashboard, app: &mut App) -> Result<()> {
        self.draw(app)?;
        app.atlas_status = dashboard.atlas_status().await.to_string();

        while app.running {
            self.draw(app)?;

            if let Some(question) = app.take_pending() {
                self.answer(dashboard, app, question).await?;
                continue;
            }

            if let Event::Key(key) = self.next_event().await? {
                app.handle_key(key);
            }
        }

        Ok(())
    }

    /// Answers one question, still handling keys (quit, focus) meanwhile.
    async fn answer(&mut self, dashboard: &Dashboard, app: &mut App, question: String) -> Result<()> {
        info!("Answering question from the dashboard");
        let params = app.params.clone();
        let ask = dashboard.ask(&question, &params, None);
        tokio::pin!(ask);

        loop {
            tokio::select! {
                result = &mut ask => {
                    match result {
                        Ok(answer) => app.set_answer(answer),
                        Err(e) => {
                            error!("Question failed: {}", e);
                            app.set_failure(question.clone(), e.to_string());
                        }
                    }
                    return Ok(());
                }
                event = self.next_event() => {
                    if let Event::Key(key) = event? {
                        app.handle_key(key);
                    }
                    if !app.running {
                        warn!("Quit while a question was being answered");
                        return Ok(());
                    }
                    self.draw(app)?;
                }
            }
        }
    }
}

impl Drop for Tui {
    fn drop(&mut self) {
        let _ = self.restore_terminal();
    }
}

/// Runs the terminal dashboard until the user quits.
pub async fn run(dashboard: Dashboard, params: QueryParams, db_label: String) -> Result<()> {
    let mut app = App::new(dashboard.store(), params, dashboard.atlas_enabled())
        .with_db_label(db_label);

    let mut tui = Tui::new()?;
    let result = tui.run(&dashboard, &mut app).await;
    drop(tui);

    if let Err(e) = dashboard.close().await {
        warn!("Error closing database connection: {}", e);
    }
    result
}
