//! Main application state and TUI event loop for CSV Tally.
//!
//! [`App`] owns the theme, the drop zone input and the outcome of the last
//! finished batch. Pasted text (what a terminal produces when files are
//! dragged onto it) counts as a drop; typed paths confirmed with Enter count
//! as a picker selection. Both are submitted to the batch service, and the
//! display only ever changes when a whole batch has finished.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use crossterm::{
    event::{
        self, DisableBracketedPaste, EnableBracketedPaste, Event, KeyCode, KeyEvent,
        KeyEventKind, KeyModifiers,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame, Terminal,
};
use tokio::sync::mpsc;

use tally_runtime::orchestrator::{BatchEvent, BatchOutcome, BatchSubmitter};

use crate::components::drop_zone::{parse_dropped_paths, DropZone};
use crate::components::header::Header;
use crate::themes::Theme;
use crate::totals_view;

/// Most diagnostic lines shown before the list scrolls off.
const MAX_DIAGNOSTIC_ROWS: u16 = 6;

// ── App ───────────────────────────────────────────────────────────────────────

/// Root application state for the CSV Tally TUI.
pub struct App {
    /// Active colour theme.
    pub theme: Theme,
    /// Field delimiter shown in the header.
    pub delimiter: char,
    /// Accepted file suffix shown in the header.
    pub extension: String,
    /// Paths typed into the drop zone, not yet submitted.
    pub input: String,
    /// Set to `true` to break out of the event loop on the next iteration.
    pub should_quit: bool,
    /// Id of the batch being processed, if any.
    pub processing: Option<u64>,
    /// Batches submitted but not started yet.
    pub queued: usize,
    /// Outcome of the last finished batch, `None` until one finishes.
    pub last_outcome: Option<BatchOutcome>,
}

impl App {
    pub fn new(theme_name: &str, delimiter: char, extension: String) -> Self {
        Self {
            theme: Theme::from_name(theme_name),
            delimiter,
            extension,
            input: String::new(),
            should_quit: false,
            processing: None,
            queued: 0,
            last_outcome: None,
        }
    }

    // ── Event loop ────────────────────────────────────────────────────────────

    /// Run the interactive drop zone until the user quits.
    ///
    /// Terminal events are polled with a 250 ms timeout; batch events arrive
    /// on `rx` and are drained with `try_recv` between polls.
    pub async fn run(
        mut self,
        submitter: BatchSubmitter,
        mut rx: mpsc::Receiver<BatchEvent>,
    ) -> io::Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let tick_rate = Duration::from_millis(250);

        let result = loop {
            if let Err(e) = terminal.draw(|frame| self.render(frame)) {
                break Err(e);
            }

            match event::poll(tick_rate) {
                Ok(true) => match event::read() {
                    Ok(ev) => {
                        if let Some(files) = self.handle_event(ev) {
                            self.submit(&submitter, files);
                        }
                    }
                    Err(e) => break Err(e),
                },
                Ok(false) => {}
                Err(e) => break Err(e),
            }

            loop {
                match rx.try_recv() {
                    Ok(batch_event) => self.apply(batch_event),
                    Err(mpsc::error::TryRecvError::Empty) => break,
                    Err(mpsc::error::TryRecvError::Disconnected) => {
                        tracing::warn!("batch service stopped");
                        self.should_quit = true;
                        break;
                    }
                }
            }

            if self.should_quit {
                break Ok(());
            }
        };

        // Restore terminal state unconditionally.
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            DisableBracketedPaste,
            LeaveAlternateScreen
        )?;
        terminal.show_cursor()?;

        result
    }

    /// Translate a terminal event into state changes.
    ///
    /// Returns the files to submit when the event completes a drop or a
    /// selection. Blank drops return `None`.
    pub fn handle_event(&mut self, event: Event) -> Option<Vec<PathBuf>> {
        match event {
            Event::Paste(text) => {
                let files = parse_dropped_paths(&text);
                (!files.is_empty()).then_some(files)
            }
            Event::Key(key) => self.handle_key(key),
            _ => None,
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> Option<Vec<PathBuf>> {
        if key.kind != KeyEventKind::Press {
            return None;
        }

        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true;
                None
            }
            KeyCode::Char('q') | KeyCode::Char('Q') if self.input.is_empty() => {
                self.should_quit = true;
                None
            }
            KeyCode::Char(c) => {
                self.input.push(c);
                None
            }
            KeyCode::Backspace => {
                self.input.pop();
                None
            }
            KeyCode::Esc => {
                self.input.clear();
                None
            }
            KeyCode::Enter => {
                let files = parse_dropped_paths(&std::mem::take(&mut self.input));
                (!files.is_empty()).then_some(files)
            }
            _ => None,
        }
    }

    fn submit(&mut self, submitter: &BatchSubmitter, files: Vec<PathBuf>) {
        tracing::info!(files = files.len(), "batch submitted");
        if submitter.submit(files) {
            self.queued += 1;
        } else {
            tracing::warn!("batch service stopped; quitting");
            self.should_quit = true;
        }
    }

    /// Apply a batch event.
    ///
    /// A finished outcome replaces the previous one in a single step.
    pub fn apply(&mut self, event: BatchEvent) {
        match event {
            BatchEvent::Started { batch_id, files } => {
                tracing::debug!(batch_id, files, "batch started");
                self.processing = Some(batch_id);
                self.queued = self.queued.saturating_sub(1);
            }
            BatchEvent::Finished(outcome) => {
                if self.processing == Some(outcome.batch_id) {
                    self.processing = None;
                }
                self.last_outcome = Some(outcome);
            }
        }
    }

    // ── Rendering ─────────────────────────────────────────────────────────────

    fn render(&self, frame: &mut Frame) {
        let diagnostics = self
            .last_outcome
            .as_ref()
            .map(|o| o.diagnostics.as_slice())
            .unwrap_or_default();
        let diagnostics_height = if diagnostics.is_empty() {
            0
        } else {
            (diagnostics.len() as u16).min(MAX_DIAGNOSTIC_ROWS) + 2
        };

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(4),
                Constraint::Length(5),
                Constraint::Min(4),
                Constraint::Length(diagnostics_height),
                Constraint::Length(1),
            ])
            .split(frame.area());

        let header = Header::new(self.delimiter, &self.extension, &self.theme);
        frame.render_widget(Paragraph::new(header.to_lines()), chunks[0]);

        let zone = DropZone {
            input: &self.input,
            processing: self.processing,
            queued: self.queued,
            theme: &self.theme,
        };
        let border = if self.processing.is_some() {
            self.theme.drop_zone_busy
        } else {
            self.theme.drop_zone
        };
        frame.render_widget(
            Paragraph::new(zone.to_lines()).block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(border)
                    .title(" Drop zone "),
            ),
            chunks[1],
        );

        match &self.last_outcome {
            Some(outcome) if !outcome.totals.is_empty() => {
                totals_view::render_totals_view(frame, chunks[2], &outcome.totals, &self.theme);
            }
            Some(_) => totals_view::render_no_data(frame, chunks[2], &self.theme, true),
            None => totals_view::render_no_data(frame, chunks[2], &self.theme, false),
        }

        if !diagnostics.is_empty() {
            totals_view::render_diagnostics(frame, chunks[3], diagnostics, &self.theme);
        }

        frame.render_widget(Paragraph::new(self.status_line()), chunks[4]);
    }

    fn status_line(&self) -> Line<'_> {
        let mut spans = Vec::new();
        if let Some(outcome) = &self.last_outcome {
            spans.push(Span::styled(
                format!(
                    "Batch #{}: {} of {} files tallied  ",
                    outcome.batch_id + 1,
                    outcome.files_tallied,
                    outcome.files_received
                ),
                self.theme.info,
            ));
        }
        spans.push(Span::styled(
            "Enter submit · Esc clear · q quit",
            self.theme.dim,
        ));
        Line::from(spans)
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::backend::TestBackend;
    use tally_core::models::CategoryTotals;
    use tally_runtime::data::aggregator::AggregateStats;
    use tally_runtime::diagnostics::Diagnostic;

    fn new_app() -> App {
        App::new("dark", ',', ".csv".to_string())
    }

    fn key(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            assert!(app.handle_event(key(KeyCode::Char(c))).is_none());
        }
    }

    fn outcome(batch_id: u64, totals: CategoryTotals, diagnostics: Vec<Diagnostic>) -> BatchOutcome {
        BatchOutcome {
            batch_id,
            totals,
            diagnostics,
            files_received: 2,
            files_tallied: 1,
            stats: AggregateStats::default(),
        }
    }

    fn screen(app: &App, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|frame| app.render(frame)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    // ── App::new ──────────────────────────────────────────────────────────────

    #[test]
    fn test_app_creation_defaults() {
        let app = new_app();
        assert_eq!(app.delimiter, ',');
        assert_eq!(app.extension, ".csv");
        assert!(app.input.is_empty());
        assert!(!app.should_quit);
        assert!(app.processing.is_none());
        assert!(app.last_outcome.is_none());
    }

    #[test]
    fn test_app_creation_unknown_theme_falls_back() {
        let app = App::new("neon", ';', ".txt".to_string());
        assert!(app.theme.header.fg.is_some());
    }

    // ── handle_event ──────────────────────────────────────────────────────────

    #[test]
    fn test_paste_is_a_drop() {
        let mut app = new_app();
        let files = app.handle_event(Event::Paste("'/tmp/a b.csv' /tmp/c.csv".to_string()));
        assert_eq!(
            files,
            Some(vec![PathBuf::from("/tmp/a b.csv"), PathBuf::from("/tmp/c.csv")])
        );
        assert!(app.input.is_empty());
    }

    #[test]
    fn test_blank_paste_is_ignored() {
        let mut app = new_app();
        assert!(app.handle_event(Event::Paste("  \n".to_string())).is_none());
    }

    #[test]
    fn test_enter_submits_typed_paths() {
        let mut app = new_app();
        type_text(&mut app, "/tmp/x.csv");
        assert_eq!(app.input, "/tmp/x.csv");

        let files = app.handle_event(key(KeyCode::Enter));
        assert_eq!(files, Some(vec![PathBuf::from("/tmp/x.csv")]));
        assert!(app.input.is_empty());
    }

    #[test]
    fn test_enter_on_empty_input_submits_nothing() {
        let mut app = new_app();
        assert!(app.handle_event(key(KeyCode::Enter)).is_none());
    }

    #[test]
    fn test_backspace_and_esc_edit_input() {
        let mut app = new_app();
        type_text(&mut app, "ab");
        app.handle_event(key(KeyCode::Backspace));
        assert_eq!(app.input, "a");
        app.handle_event(key(KeyCode::Esc));
        assert!(app.input.is_empty());
    }

    #[test]
    fn test_q_quits_only_with_empty_input() {
        let mut app = new_app();
        type_text(&mut app, "sq");
        assert!(!app.should_quit);
        assert_eq!(app.input, "sq");

        let mut app = new_app();
        app.handle_event(key(KeyCode::Char('q')));
        assert!(app.should_quit);
    }

    #[test]
    fn test_ctrl_c_quits() {
        let mut app = new_app();
        type_text(&mut app, "half typed");
        app.handle_event(Event::Key(KeyEvent::new(
            KeyCode::Char('c'),
            KeyModifiers::CONTROL,
        )));
        assert!(app.should_quit);
    }

    #[test]
    fn test_key_release_is_ignored() {
        let mut app = new_app();
        let release =
            KeyEvent::new_with_kind(KeyCode::Char('x'), KeyModifiers::NONE, KeyEventKind::Release);
        app.handle_event(Event::Key(release));
        assert!(app.input.is_empty());
    }

    // ── apply ─────────────────────────────────────────────────────────────────

    #[test]
    fn test_apply_started_tracks_queue() {
        let mut app = new_app();
        app.queued = 2;
        app.apply(BatchEvent::Started {
            batch_id: 0,
            files: 3,
        });
        assert_eq!(app.processing, Some(0));
        assert_eq!(app.queued, 1);
    }

    #[test]
    fn test_apply_finished_replaces_previous_outcome() {
        let mut app = new_app();
        let mut first = CategoryTotals::new();
        first.add("USD", 1.0);
        app.apply(BatchEvent::Started {
            batch_id: 0,
            files: 1,
        });
        app.apply(BatchEvent::Finished(outcome(0, first, vec![])));
        assert!(app.processing.is_none());

        let mut second = CategoryTotals::new();
        second.add("EUR", 2.0);
        app.apply(BatchEvent::Finished(outcome(1, second, vec![])));

        let last = app.last_outcome.as_ref().unwrap();
        assert_eq!(last.batch_id, 1);
        assert_eq!(last.totals.categories(), vec!["EUR"]);
        assert!(last.totals.get("USD").is_none());
    }

    #[test]
    fn test_apply_finished_keeps_newer_processing_batch() {
        let mut app = new_app();
        app.processing = Some(3);
        app.apply(BatchEvent::Finished(outcome(2, CategoryTotals::new(), vec![])));
        assert_eq!(app.processing, Some(3));
    }

    // ── render ────────────────────────────────────────────────────────────────

    #[test]
    fn test_render_before_first_batch() {
        let text = screen(&new_app(), 80, 20);
        assert!(text.contains("CSV CATEGORY TALLY"));
        assert!(text.contains("Drag 'n' drop files here"));
        assert!(text.contains("No totals yet"));
    }

    #[test]
    fn test_render_with_totals_and_diagnostics() {
        let mut app = new_app();
        let mut totals = CategoryTotals::new();
        totals.add("USD", 10.0);
        totals.add("EUR", 2.5);
        app.apply(BatchEvent::Finished(outcome(
            0,
            totals,
            vec![Diagnostic::UnsupportedFileType {
                file: PathBuf::from("notes.txt"),
            }],
        )));

        let text = screen(&app, 80, 24);
        assert!(text.contains("USD"));
        assert!(text.contains("12.5"));
        assert!(text.contains("notes.txt"));
        assert!(text.contains("Batch #1: 1 of 2 files tallied"));
    }

    #[test]
    fn test_render_batch_without_amounts() {
        let mut app = new_app();
        app.apply(BatchEvent::Finished(outcome(
            0,
            CategoryTotals::new(),
            vec![],
        )));
        let text = screen(&app, 80, 20);
        assert!(text.contains("No amounts found"));
    }
}
