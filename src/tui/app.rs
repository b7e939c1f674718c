//! Application state for the TUI.

use crate::app::{Answer, FOGGY_MESSAGE};
use crate::db::QueryParams;
use crate::registry::CuratedStore;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// Which panel currently has focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Focus {
    #[default]
    Input,
    Sidebar,
    Output,
}

impl Focus {
    /// Cycles to the next focus panel.
    pub fn next(self) -> Self {
        match self {
            Self::Input => Self::Sidebar,
            Self::Sidebar => Self::Output,
            Self::Output => Self::Input,
        }
    }
}

/// What the output panel shows.
#[derive(Debug, Clone, Default)]
pub enum OutputState {
    #[default]
    Welcome,
    /// A question is being answered.
    Thinking(String),
    Answer(Answer),
    /// A curated query failed to run.
    Failure { question: String, error: String },
}

/// Input state for text editing. The cursor counts characters, not bytes.
#[derive(Debug, Default)]
pub struct InputState {
    pub text: String,
    pub cursor: usize,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    fn byte_index(&self, cursor: usize) -> usize {
        self.text
            .char_indices()
            .nth(cursor)
            .map_or(self.text.len(), |(i, _)| i)
    }

    fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    pub fn insert(&mut self, c: char) {
        let at = self.byte_index(self.cursor);
        self.text.insert(at, c);
        self.cursor += 1;
    }

    /// Deletes the character before the cursor.
    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let at = self.byte_index(self.cursor);
            self.text.remove(at);
        }
    }

    /// Deletes the character at the cursor.
    pub fn delete(&mut self) {
        if self.cursor < self.char_count() {
            let at = self.byte_index(self.cursor);
            self.text.remove(at);
        }
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        if self.cursor < self.char_count() {
            self.cursor += 1;
        }
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.char_count();
    }

    /// Clears the input and returns the previous text.
    pub fn take(&mut self) -> String {
        self.cursor = 0;
        std::mem::take(&mut self.text)
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Main application state.
pub struct App {
    pub running: bool,
    pub focus: Focus,
    pub input: InputState,
    /// Curated questions listed in the sidebar.
    pub questions: Vec<String>,
    /// Index of the highlighted sidebar question.
    pub selected: usize,
    pub output: OutputState,
    /// Output panel scroll offset in lines.
    pub output_scroll: u16,
    pub params: QueryParams,
    /// "Curated" or "Curated + Atlas".
    pub mode: &'static str,
    pub atlas_status: String,
    pub db_label: String,
    /// Question waiting to be answered by the runner.
    pending: Option<String>,
}

impl App {
    pub fn new(store: &CuratedStore, params: QueryParams, atlas_enabled: bool) -> Self {
        Self {
            running: true,
            focus: Focus::default(),
            input: InputState::new(),
            questions: store.queries().iter().map(|q| q.question.clone()).collect(),
            selected: 0,
            output: OutputState::Welcome,
            output_scroll: 0,
            params,
            mode: if atlas_enabled {
                "Curated + Atlas"
            } else {
                "Curated"
            },
            atlas_status: "disabled".to_string(),
            db_label: String::new(),
            pending: None,
        }
    }

    pub fn with_db_label(mut self, label: impl Into<String>) -> Self {
        self.db_label = label.into();
        self
    }

    /// Takes the question queued by the last key press, if any.
    pub fn take_pending(&mut self) -> Option<String> {
        self.pending.take()
    }

    pub fn is_processing(&self) -> bool {
        matches!(self.output, OutputState::Thinking(_))
    }

    fn ask(&mut self, question: String) {
        self.output = OutputState::Thinking(question.clone());
        self.output_scroll = 0;
        self.pending = Some(question);
    }

    pub fn set_answer(&mut self, answer: Answer) {
        self.output = OutputState::Answer(answer);
        self.output_scroll = 0;
    }

    pub fn set_failure(&mut self, question: String, error: String) {
        self.output = OutputState::Failure { question, error };
        self.output_scroll = 0;
    }

    /// Headline shown for a failure.
    pub fn failure_title() -> &'static str {
        FOGGY_MESSAGE
    }

    /// Handles one key press.
    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }

        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('c') | KeyCode::Char('q') if ctrl => {
                self.running = false;
                return;
            }
            KeyCode::Esc => {
                self.running = false;
                return;
            }
            KeyCode::Tab => {
                self.focus = self.focus.next();
                return;
            }
            _ => {}
        }

        if self.is_processing() {
            return;
        }

        match self.focus {
            Focus::Input => self.handle_input_key(key),
            Focus::Sidebar => self.handle_sidebar_key(key),
            Focus::Output => self.handle_output_key(key),
        }
    }

    fn handle_input_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => {
                if !self.input.is_empty() {
                    let question = self.input.take().trim().to_string();
                    self.ask(question);
                }
            }
            KeyCode::Char(c) => self.input.insert(c),
            KeyCode::Backspace => self.input.backspace(),
            KeyCode::Delete => self.input.delete(),
            KeyCode::Left => self.input.move_left(),
            KeyCode::Right => self.input.move_right(),
            KeyCode::Home => self.input.move_home(),
            KeyCode::End => self.input.move_end(),
            _ => {}
        }
    }

    fn handle_sidebar_key(&mut self, key: KeyEvent) {
        if self.questions.is_empty() {
            return;
        }
        match key.code {
            KeyCode::Up => self.selected = self.selected.saturating_sub(1),
            KeyCode::Down => self.selected = (self.selected + 1).min(self.questions.len() - 1),
            KeyCode::Enter => {
                let question = self.questions[self.selected].clone();
                self.ask(question);
            }
            _ => {}
        }
    }

    fn handle_output_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Up => self.output_scroll = self.output_scroll.saturating_sub(1),
            KeyCode::Down => self.output_scroll = self.output_scroll.saturating_add(1),
            KeyCode::PageUp => self.output_scroll = self.output_scroll.saturating_sub(10),
            KeyCode::PageDown => self.output_scroll = self.output_scroll.saturating_add(10),
            KeyCode::Home => self.output_scroll = 0,
            _ => {}
        }
    }
}
