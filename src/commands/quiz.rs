use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use crossterm::{
    event::{
        self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, KeyboardEnhancementFlags,
        PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Paragraph, Wrap},
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::QuizError;
use crate::llm::gemini::GeminiClient;
use crate::palette::Tone;
use crate::pipeline::{PipelineEvent, run_pipeline};
use crate::quiz::{QuizItem, QuizRequest};
use crate::session::{ItemState, Mark, QuizPhase, QuizSession};
use crate::tui::{LineInput, Theme};
use crate::utils::pluralize;

const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
const SPINNER_FRAME_MS: u128 = 80;

type PipelineTask = JoinHandle<Result<Vec<QuizItem>, QuizError>>;

pub async fn run(config: Config, topic: String, difficulty: u8, count: u8) -> Result<()> {
    let client = Arc::new(GeminiClient::new(&config)?);
    let app = QuizApp::new(&topic, difficulty, count);
    start_quiz_session(client, config.timeout, app).await
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Topic,
    Difficulty,
    Count,
}

impl Field {
    fn next(self) -> Self {
        match self {
            Field::Topic => Field::Difficulty,
            Field::Difficulty => Field::Count,
            Field::Count => Field::Topic,
        }
    }

    fn previous(self) -> Self {
        match self {
            Field::Topic => Field::Count,
            Field::Difficulty => Field::Topic,
            Field::Count => Field::Difficulty,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum KeyOutcome {
    Continue,
    Quit,
    Start(QuizRequest),
}

struct QuizApp {
    session: QuizSession,
    topic_input: LineInput,
    focus: Field,
    selected: usize,
    diagnostic_scroll: u16,
    started_at: Instant,
}

impl QuizApp {
    fn new(topic: &str, difficulty: u8, count: u8) -> Self {
        Self {
            session: QuizSession::new(topic, difficulty, count),
            topic_input: LineInput::new(topic),
            focus: Field::Topic,
            selected: 0,
            diagnostic_scroll: 0,
            started_at: Instant::now(),
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> KeyOutcome {
        if key.code == KeyCode::Esc
            || (key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL))
        {
            return KeyOutcome::Quit;
        }

        match self.session.phase() {
            phase if phase.is_busy() => KeyOutcome::Continue,
            QuizPhase::Success => self.handle_quiz_key(key),
            QuizPhase::Idle | QuizPhase::Failed => self.handle_form_key(key),
            _ => KeyOutcome::Continue,
        }
    }

    fn handle_form_key(&mut self, key: KeyEvent) -> KeyOutcome {
        match key.code {
            KeyCode::Enter => return self.start(),
            KeyCode::Tab | KeyCode::Down => self.focus = self.focus.next(),
            KeyCode::BackTab | KeyCode::Up => self.focus = self.focus.previous(),
            KeyCode::PageUp => self.diagnostic_scroll = self.diagnostic_scroll.saturating_sub(5),
            KeyCode::PageDown => self.diagnostic_scroll = self.diagnostic_scroll.saturating_add(5),
            code => match self.focus {
                Field::Topic => self.edit_topic(code, key.modifiers),
                Field::Difficulty => {
                    if let Some(delta) = stepper_delta(code) {
                        self.session.adjust_difficulty(delta);
                    }
                }
                Field::Count => {
                    if let Some(delta) = stepper_delta(code) {
                        self.session.adjust_count(delta);
                    }
                }
            },
        }
        KeyOutcome::Continue
    }

    fn edit_topic(&mut self, code: KeyCode, modifiers: KeyModifiers) {
        match code {
            KeyCode::Char('u') if modifiers.contains(KeyModifiers::CONTROL) => {
                self.topic_input.clear()
            }
            KeyCode::Char(c) if !modifiers.contains(KeyModifiers::CONTROL) => {
                self.topic_input.insert_char(c)
            }
            KeyCode::Backspace => self.topic_input.backspace(),
            KeyCode::Delete => self.topic_input.delete(),
            KeyCode::Left => self.topic_input.move_left(),
            KeyCode::Right => self.topic_input.move_right(),
            KeyCode::Home => self.topic_input.move_home(),
            KeyCode::End => self.topic_input.move_end(),
            _ => return,
        }
        self.session.set_topic(self.topic_input.text());
    }

    fn handle_quiz_key(&mut self, key: KeyEvent) -> KeyOutcome {
        let total = self.session.items().len();
        match key.code {
            KeyCode::Down | KeyCode::Char('j') if total > 0 => {
                self.selected = (self.selected + 1).min(total - 1);
            }
            KeyCode::Up => self.selected = self.selected.saturating_sub(1),
            KeyCode::Char(' ') | KeyCode::Enter => self.session.reveal(self.selected),
            KeyCode::Char('k') | KeyCode::Char('K') => self.session.mark(self.selected, Mark::Known),
            KeyCode::Char('d') | KeyCode::Char('D') => {
                self.session.mark(self.selected, Mark::Unknown)
            }
            KeyCode::Char('r') | KeyCode::Char('R') => {
                self.session.reset();
                self.selected = 0;
                self.focus = Field::Topic;
            }
            KeyCode::Char('g') | KeyCode::Char('G') => return self.start(),
            _ => {}
        }
        KeyOutcome::Continue
    }

    fn start(&mut self) -> KeyOutcome {
        match self.session.start() {
            Some(request) => {
                self.selected = 0;
                self.diagnostic_scroll = 0;
                self.started_at = Instant::now();
                KeyOutcome::Start(request)
            }
            None => KeyOutcome::Continue,
        }
    }

    fn drain_events(&mut self, events: &mut mpsc::UnboundedReceiver<PipelineEvent>) {
        while let Ok(event) = events.try_recv() {
            self.session.apply(event);
        }
    }

    /// Applies a finished request. Its task has exited, so every event it sent is
    /// already queued; they are drained here so none can reach the next request.
    fn complete(
        &mut self,
        result: Result<Vec<QuizItem>, QuizError>,
        events: &mut mpsc::UnboundedReceiver<PipelineEvent>,
    ) {
        self.session.finish(result);
        self.drain_events(events);
    }

    fn spinner(&self) -> &'static str {
        let frame = self.started_at.elapsed().as_millis() / SPINNER_FRAME_MS;
        SPINNER_FRAMES[(frame % SPINNER_FRAMES.len() as u128) as usize]
    }
}

fn stepper_delta(code: KeyCode) -> Option<i16> {
    match code {
        KeyCode::Left | KeyCode::Char('-') => Some(-1),
        KeyCode::Right | KeyCode::Char('+') | KeyCode::Char('=') => Some(1),
        _ => None,
    }
}

fn spawn_pipeline(
    client: Arc<GeminiClient>,
    request: QuizRequest,
    deadline: Option<Duration>,
    events: mpsc::UnboundedSender<PipelineEvent>,
) -> PipelineTask {
    tokio::spawn(async move {
        run_pipeline(client.as_ref(), &request, deadline, |event| {
            let _ = events.send(event);
        })
        .await
    })
}

async fn start_quiz_session(
    client: Arc<GeminiClient>,
    deadline: Option<Duration>,
    mut app: QuizApp,
) -> Result<()> {
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(
        stdout,
        EnterAlternateScreen,
        PushKeyboardEnhancementFlags(
            KeyboardEnhancementFlags::REPORT_ALL_KEYS_AS_ESCAPE_CODES
                | KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES
        )
    )
    .context("failed to configure terminal")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("failed to start terminal")?;

    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let mut in_flight: Option<PipelineTask> = None;

    let loop_result: Result<()> = async {
        loop {
            app.drain_events(&mut events_rx);

            if let Some(handle) = &mut in_flight
                && handle.is_finished()
            {
                let result = handle
                    .await
                    .map_err(|err| anyhow!("quiz generation task failed: {err}"))?;
                if let Err(err) = &result {
                    warn!(kind = err.kind().label(), "quiz generation failed");
                }
                app.complete(result, &mut events_rx);
                in_flight = None;
            }

            terminal
                .draw(|frame| draw(frame, &app, client.model()))
                .context("failed to render frame")?;

            if event::poll(Duration::from_millis(16))?
                && let Event::Key(key) = event::read()?
            {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match app.handle_key(key) {
                    KeyOutcome::Quit => break Ok(()),
                    KeyOutcome::Start(request) => {
                        info!(topic = request.topic(), "quiz requested from form");
                        in_flight = Some(spawn_pipeline(
                            Arc::clone(&client),
                            request,
                            deadline,
                            events_tx.clone(),
                        ));
                    }
                    KeyOutcome::Continue => {}
                }
            }
        }
    }
    .await;

    teardown_terminal(&mut terminal)?;

    loop_result
}

fn teardown_terminal(terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(
        terminal.backend_mut(),
        PopKeyboardEnhancementFlags,
        LeaveAlternateScreen
    )
    .context("failed to restore terminal")?;
    terminal.show_cursor().context("failed to show cursor")?;
    Ok(())
}

fn draw(frame: &mut Frame<'_>, app: &QuizApp, model: &str) {
    let area = frame.area();
    frame.render_widget(Theme::backdrop(), area);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(5), Constraint::Length(4)])
        .split(area);

    let title = Line::from(vec![
        Theme::label_span(" quizgen "),
        Theme::bullet(),
        Span::styled(model.to_string(), Theme::muted()),
    ]);

    match app.session.phase() {
        QuizPhase::Success => draw_quiz(frame, app, chunks[0], title),
        phase if phase.is_busy() => draw_busy(frame, app, chunks[0], title),
        _ => draw_form_screen(frame, app, chunks[0], title),
    }

    let footer = Paragraph::new(instructions_text(app))
        .block(Theme::panel_with_line(Theme::section_header("Controls")))
        .wrap(Wrap { trim: true });
    frame.render_widget(footer, chunks[1]);
}

fn draw_form_screen(frame: &mut Frame<'_>, app: &QuizApp, area: Rect, title: Line<'static>) {
    let form_height = 7;
    let (error_area, form_area) = match app.session.failure() {
        Some(_) => {
            let split = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(3), Constraint::Length(form_height)])
                .split(area);
            (Some(split[0]), split[1])
        }
        None => (None, area),
    };

    if let (Some(error_area), Some(failure)) = (error_area, app.session.failure()) {
        let diagnostic = Paragraph::new(failure.diagnostic())
            .style(Theme::danger())
            .block(Theme::highlighted_panel(
                format!("Generation failed: {}", failure.kind().label()),
                Tone::Danger,
            ))
            .wrap(Wrap { trim: false })
            .scroll((app.diagnostic_scroll, 0));
        frame.render_widget(diagnostic, error_area);
    }

    let form = Paragraph::new(form_lines(app)).block(Theme::panel_with_line(title));
    frame.render_widget(form, form_area);

    if app.focus == Field::Topic {
        let prefix = TOPIC_LABEL.chars().count() as u16;
        let cursor_x = form_area.x
            + 1
            + (prefix + app.topic_input.cursor() as u16).min(form_area.width.saturating_sub(2));
        let cursor_y = form_area.y + 2;
        frame.set_cursor_position((cursor_x, cursor_y));
    }
}

const TOPIC_LABEL: &str = "Topic:       ";

fn form_lines(app: &QuizApp) -> Vec<Line<'static>> {
    let field_style = |field: Field| {
        if app.focus == field {
            Theme::selected()
        } else {
            Theme::emphasis()
        }
    };

    let mut lines = vec![
        Line::from(Span::styled(
            "Choose a topic and difficulty, then press Enter to generate.",
            Theme::muted(),
        )),
        Line::from(vec![
            Span::styled(TOPIC_LABEL, field_style(Field::Topic)),
            Theme::span(app.topic_input.text().to_string()),
        ]),
        Line::from(vec![
            Span::styled("Difficulty:  ", field_style(Field::Difficulty)),
            Theme::span(format!("◀ {:>2} ▶", app.session.difficulty())),
            Span::styled(" / 10", Theme::muted()),
        ]),
        Line::from(vec![
            Span::styled("Questions:   ", field_style(Field::Count)),
            Theme::span(format!("◀ {:>2} ▶", app.session.count())),
        ]),
    ];

    if let Some(warning) = app.session.warning() {
        lines.push(Line::from(Span::styled(warning.to_string(), Theme::warning())));
    }
    lines
}

fn draw_busy(frame: &mut Frame<'_>, app: &QuizApp, area: Rect, title: Line<'static>) {
    let status = match app.session.phase() {
        QuizPhase::Building => "Preparing prompt".to_string(),
        QuizPhase::Streaming { received_bytes: 0 } => "Waiting for the model".to_string(),
        QuizPhase::Streaming { received_bytes } => {
            format!("Receiving response ({received_bytes} bytes)")
        }
        QuizPhase::Validating => "Checking questions".to_string(),
        _ => String::new(),
    };

    let lines = vec![
        Line::from(format!(
            "Generating {} on '{}' (difficulty {}/10)…",
            pluralize("question", usize::from(app.session.count())),
            app.session.topic().trim(),
            app.session.difficulty()
        )),
        Line::default(),
        Line::from(vec![
            Span::styled(app.spinner(), Theme::label()),
            Theme::span(format!(" {status}")),
        ]),
    ];
    let busy = Paragraph::new(lines)
        .block(Theme::panel_with_line(title))
        .wrap(Wrap { trim: false });
    frame.render_widget(busy, area);
}

fn draw_quiz(frame: &mut Frame<'_>, app: &QuizApp, area: Rect, title: Line<'static>) {
    let items = app.session.items();
    let mut lines = Vec::new();
    let mut selected_line = 0usize;

    if items.is_empty() {
        lines.push(Line::from(Span::styled(
            "No questions were generated. Try again with a different topic or difficulty.",
            Theme::warning(),
        )));
    } else {
        lines.push(Line::from(Span::styled(
            format!("Generated {}!", pluralize("question", items.len())),
            Theme::success(),
        )));
        lines.push(Line::default());
        for (idx, state) in items.iter().enumerate() {
            if idx == app.selected {
                selected_line = lines.len();
            }
            lines.extend(item_lines(idx, state, idx == app.selected));
        }
    }

    let view_height = area.height.saturating_sub(2) as usize;
    let scroll = selected_line.saturating_sub(view_height / 2) as u16;
    let quiz = Paragraph::new(lines)
        .block(Theme::panel_with_line(title))
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0));
    frame.render_widget(quiz, area);
}

fn item_lines(idx: usize, state: &ItemState, selected: bool) -> Vec<Line<'static>> {
    let marker = if selected { "▶ " } else { "  " };
    let question_style = if selected {
        Theme::selected()
    } else {
        Theme::emphasis()
    };

    let mut header = vec![
        Span::styled(marker, Theme::label()),
        Span::styled(format!("Q{}: {}", idx + 1, state.item.question), question_style),
    ];
    match state.mark {
        Some(Mark::Known) => {
            header.push(Theme::bullet());
            header.push(Span::styled("Known", Theme::success()));
        }
        Some(Mark::Unknown) => {
            header.push(Theme::bullet());
            header.push(Span::styled("Review", Theme::warning()));
        }
        None => {}
    }

    let answer = if state.revealed {
        Line::from(vec![
            Theme::span("    "),
            Span::styled("Answer: ", Theme::label()),
            Theme::span(state.item.answer.clone()),
        ])
    } else {
        Line::from(Span::styled("    Answer hidden", Theme::muted()))
    };

    vec![Line::from(header), answer, Line::default()]
}

fn exit_chips() -> Vec<Span<'static>> {
    vec![
        Theme::key_chip("Esc"),
        Theme::span(" / "),
        Theme::key_chip("Ctrl+C"),
        Theme::span(" exit"),
    ]
}

fn instructions_text(app: &QuizApp) -> Vec<Line<'static>> {
    let mut line = match app.session.phase() {
        QuizPhase::Success => vec![
            Theme::key_chip("↑/↓"),
            Theme::span(" select"),
            Theme::bullet(),
            Theme::key_chip("Space"),
            Theme::span(" reveal"),
            Theme::bullet(),
            Theme::key_chip("K"),
            Span::styled(" know", Theme::success()),
            Theme::bullet(),
            Theme::key_chip("D"),
            Span::styled(" don't know", Theme::warning()),
            Theme::bullet(),
            Theme::key_chip("G"),
            Theme::span(" regenerate"),
            Theme::bullet(),
            Theme::key_chip("R"),
            Theme::span(" reset"),
            Theme::bullet(),
        ],
        phase if phase.is_busy() => vec![Theme::span("Generating questions"), Theme::bullet()],
        phase => {
            let mut line = vec![
                Theme::key_chip("Enter"),
                Theme::span(" generate"),
                Theme::bullet(),
                Theme::key_chip("Tab"),
                Theme::span(" next field"),
                Theme::bullet(),
                Theme::key_chip("←/→"),
                Theme::span(" adjust"),
                Theme::bullet(),
            ];
            if phase == QuizPhase::Failed {
                line.extend([
                    Theme::key_chip("PgUp/PgDn"),
                    Theme::span(" scroll error"),
                    Theme::bullet(),
                ]);
            }
            line
        }
    };
    line.extend(exit_chips());
    vec![Line::from(line)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationFailure;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn flatten(lines: &[Line<'_>]) -> String {
        lines
            .iter()
            .flat_map(|line| line.spans.iter().map(|span| span.content.to_string()))
            .collect::<String>()
    }

    fn app_with_items() -> QuizApp {
        let mut app = QuizApp::new("Photosynthesis", 5, 2);
        assert!(matches!(app.handle_key(press(KeyCode::Enter)), KeyOutcome::Start(_)));
        app.session.finish(Ok(vec![
            QuizItem::new("What pigment captures light?", "Chlorophyll"),
            QuizItem::new("What gas is released?", "Oxygen"),
        ]));
        app
    }

    #[test]
    fn enter_on_form_starts_request_once() {
        let mut app = QuizApp::new("Photosynthesis", 5, 2);
        let outcome = app.handle_key(press(KeyCode::Enter));
        assert_eq!(
            outcome,
            KeyOutcome::Start(QuizRequest::new("Photosynthesis", 5, 2).unwrap())
        );
        assert_eq!(app.handle_key(press(KeyCode::Enter)), KeyOutcome::Continue);
    }

    #[test]
    fn typing_edits_topic_and_steppers_adjust_numbers() {
        let mut app = QuizApp::new("", 5, 5);
        for c in "Rust".chars() {
            app.handle_key(press(KeyCode::Char(c)));
        }
        assert_eq!(app.session.topic(), "Rust");

        app.handle_key(press(KeyCode::Tab));
        app.handle_key(press(KeyCode::Right));
        app.handle_key(press(KeyCode::Tab));
        app.handle_key(press(KeyCode::Left));
        app.handle_key(press(KeyCode::Char('-')));
        assert_eq!(app.session.difficulty(), 6);
        assert_eq!(app.session.count(), 3);

        assert_eq!(
            app.handle_key(press(KeyCode::Enter)),
            KeyOutcome::Start(QuizRequest::new("Rust", 6, 3).unwrap())
        );
    }

    #[test]
    fn empty_topic_shows_warning_instead_of_starting() {
        let mut app = QuizApp::new("", 5, 5);
        assert_eq!(app.handle_key(press(KeyCode::Enter)), KeyOutcome::Continue);
        assert!(flatten(&form_lines(&app)).contains("Please enter a topic."));
    }

    #[test]
    fn escape_and_ctrl_c_quit_in_every_phase() {
        let mut app = app_with_items();
        assert_eq!(app.handle_key(press(KeyCode::Esc)), KeyOutcome::Quit);
        assert_eq!(
            app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            KeyOutcome::Quit
        );
    }

    #[test]
    fn answers_stay_hidden_until_revealed() {
        let mut app = app_with_items();
        let hidden = flatten(&item_lines(0, &app.session.items()[0], true));
        assert!(hidden.contains("Q1: What pigment captures light?"));
        assert!(!hidden.contains("Chlorophyll"));

        app.handle_key(press(KeyCode::Char(' ')));
        let shown = flatten(&item_lines(0, &app.session.items()[0], true));
        assert!(shown.contains("Answer: Chlorophyll"));
    }

    #[test]
    fn dont_know_reveals_and_marks_selected_item() {
        let mut app = app_with_items();
        app.handle_key(press(KeyCode::Down));
        app.handle_key(press(KeyCode::Down));
        assert_eq!(app.selected, 1);
        app.handle_key(press(KeyCode::Char('d')));

        let state = &app.session.items()[1];
        assert_eq!(state.mark, Some(Mark::Unknown));
        assert!(state.revealed);
        let rendered = flatten(&item_lines(1, state, true));
        assert!(rendered.contains("Review"));
        assert!(rendered.contains("Answer: Oxygen"));

        app.handle_key(press(KeyCode::Up));
        app.handle_key(press(KeyCode::Char('k')));
        assert_eq!(app.session.items()[0].mark, Some(Mark::Known));
        assert!(!app.session.items()[0].revealed);
    }

    #[test]
    fn reset_returns_to_form_with_last_topic() {
        let mut app = app_with_items();
        app.handle_key(press(KeyCode::Char('r')));
        assert_eq!(app.session.phase(), QuizPhase::Idle);
        assert!(app.session.items().is_empty());
        assert_eq!(app.topic_input.text(), "Photosynthesis");
    }

    #[test]
    fn keys_are_ignored_while_generating() {
        let mut app = QuizApp::new("Photosynthesis", 5, 2);
        app.handle_key(press(KeyCode::Enter));
        app.handle_key(press(KeyCode::Char('x')));
        app.handle_key(press(KeyCode::Char('r')));
        assert_eq!(app.session.topic(), "Photosynthesis");
        assert!(app.session.is_busy());
        assert!(flatten(&instructions_text(&app)).contains("Generating questions"));
    }

    #[test]
    fn stale_events_do_not_leak_into_next_request() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut app = QuizApp::new("Photosynthesis", 5, 2);
        app.handle_key(press(KeyCode::Enter));
        tx.send(PipelineEvent::Streaming).unwrap();
        app.drain_events(&mut rx);
        tx.send(PipelineEvent::Validating).unwrap();

        app.complete(Ok(vec![QuizItem::new("Q", "A")]), &mut rx);
        assert_eq!(app.session.phase(), QuizPhase::Success);

        assert!(matches!(
            app.handle_key(press(KeyCode::Char('g'))),
            KeyOutcome::Start(_)
        ));
        app.drain_events(&mut rx);
        assert_eq!(app.session.phase(), QuizPhase::Building);
    }

    #[test]
    fn failed_form_offers_error_scrolling() {
        let mut app = QuizApp::new("Photosynthesis", 5, 2);
        app.handle_key(press(KeyCode::Enter));
        app.session.finish(Err(QuizError::from(ValidationFailure::MalformedJson {
            message: "expected value at line 1 column 1".into(),
            raw_text: "not json".into(),
        })));

        let controls = flatten(&instructions_text(&app));
        assert!(controls.contains("scroll error"));
        assert!(controls.contains("generate"));

        app.handle_key(press(KeyCode::PageDown));
        assert_eq!(app.diagnostic_scroll, 5);
        assert!(matches!(
            app.handle_key(press(KeyCode::Enter)),
            KeyOutcome::Start(_)
        ));
        assert!(app.session.failure().is_none());
    }
}
