//! Terminal event polling.

use crate::error::{FxLensError, Result};
use crossterm::event::{self, Event as CrosstermEvent, KeyEvent};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Application events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A key was pressed.
    Key(KeyEvent),
    /// The terminal was resized.
    Resize(u16, u16),
    /// Nothing happened within the tick rate.
    Tick,
}

/// Polls crossterm for events. Copyable so it can move into a blocking task.
#[derive(Debug, Clone, Copy)]
pub struct EventHandler {
    tick_rate: Duration,
}

impl EventHandler {
    pub fn new() -> Self {
        Self {
            tick_rate: Duration::from_millis(100),
        }
    }

    pub fn with_tick_rate(tick_rate: Duration) -> Self {
        Self { tick_rate }
    }

    /// Waits up to the tick rate for the next event.
    pub fn next(&self) -> Result<Event> {
        if !event::poll(self.tick_rate)
            .map_err(|e| FxLensError::internal(format!("Failed to poll events: {e}")))?
        {
            return Ok(Event::Tick);
        }

        let event = event::read()
            .map_err(|e| FxLensError::internal(format!("Failed to read event: {e}")))?;
        Ok(match event {
            CrosstermEvent::Key(key) => Event::Key(key),
            CrosstermEvent::Resize(width, height) => Event::Resize(width, height),
            _ => Event::Tick,
        })
    }
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new()
    }
}

/// A blocking source of events.
pub trait EventSource: Clone + Send + 'static {
    fn next_event(&self) -> Result<Event>;
}

impl EventSource for EventHandler {
    fn next_event(&self) -> Result<Event> {
        self.next()
    }
}

/// Runs an [`EventSource`] on the blocking pool.
///
/// [`EventPoll::next`] is cancel-safe: when it loses a `select!` race the
/// blocking read keeps going, and the next call picks up its event.
pub struct EventPoll<S: EventSource> {
    source: S,
    pending: Option<JoinHandle<Result<Event>>>,
}

impl<S: EventSource> EventPoll<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            pending: None,
        }
    }

    pub async fn next(&mut self) -> Result<Event> {
        let source = self.source.clone();
        let pending = self
            .pending
            .get_or_insert_with(|| tokio::task::spawn_blocking(move || source.next_event()));
        let joined = pending.await;
        self.pending = None;
        joined.map_err(|e| FxLensError::internal(format!("Event task failed: {e}")))?
    }
}
