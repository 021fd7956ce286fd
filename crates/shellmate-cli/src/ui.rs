use std::io;
use std::sync::OnceLock;
use std::time::Duration;
use std::time::Instant;

use anyhow::Context;
use crossterm::event;
use crossterm::event::Event;
use crossterm::event::KeyCode;
use crossterm::event::KeyEvent;
use crossterm::event::KeyEventKind;
use crossterm::event::KeyModifiers;
use crossterm::execute;
use crossterm::terminal::disable_raw_mode;
use crossterm::terminal::enable_raw_mode;
use crossterm::terminal::EnterAlternateScreen;
use crossterm::terminal::LeaveAlternateScreen;
use ratatui::backend::Backend;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::Alignment;
use ratatui::layout::Constraint;
use ratatui::layout::Direction;
use ratatui::layout::Layout;
use ratatui::layout::Rect;
use ratatui::style::Color;
use ratatui::style::Modifier;
use ratatui::style::Style;
use ratatui::text::Line;
use ratatui::text::Span;
use ratatui::widgets::Block;
use ratatui::widgets::Borders;
use ratatui::widgets::Clear;
use ratatui::widgets::List;
use ratatui::widgets::ListItem;
use ratatui::widgets::ListState;
use ratatui::widgets::Paragraph;
use ratatui::Frame;
use ratatui::Terminal;
use shellmate_core::actions::UserAction;
use shellmate_core::engine::WorkflowSnapshot;
use shellmate_core::state::OutputEntry;
use shellmate_core::state::OutputLevel;
use shellmate_core::state::OutputLog;
use shellmate_exec::gateway::TextGenerator;
use shellmate_exec::runner::CommandRunner;
use syntect::easy::HighlightLines;
use syntect::highlighting::ThemeSet;
use syntect::parsing::SyntaxSet;
use tracing::info;

use crate::runtime::Session;

const SYNTAX_THEME: &str = "base16-ocean.dark";
const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

static SYNTAX_SET: OnceLock<SyntaxSet> = OnceLock::new();
static THEME_SET: OnceLock<ThemeSet> = OnceLock::new();

fn get_syntax_set() -> &'static SyntaxSet {
    SYNTAX_SET.get_or_init(SyntaxSet::load_defaults_newlines)
}

fn get_theme_set() -> &'static ThemeSet {
    THEME_SET.get_or_init(ThemeSet::load_defaults)
}

struct TuiGuard;

impl Drop for TuiGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, crossterm::cursor::Show);
    }
}

#[derive(Clone, Copy)]
struct UiPalette {
    accent: Color,
    accent_alt: Color,
    success: Color,
    danger: Color,
    muted: Color,
    border: Color,
    selected_bg: Color,
}

const PALETTE: UiPalette = UiPalette {
    accent: Color::Cyan,
    accent_alt: Color::Blue,
    success: Color::Green,
    danger: Color::Red,
    muted: Color::DarkGray,
    border: Color::Gray,
    selected_bg: Color::DarkGray,
};

/// Presentation-only state. Everything else lives in the engine.
#[derive(Debug, Default)]
struct UiState {
    input: String,
    picker: Option<HistoryPicker>,
    /// Lines scrolled back from the bottom of the output area.
    scroll_back: u16,
}

#[derive(Debug)]
struct HistoryPicker {
    /// Most recent first.
    entries: Vec<String>,
    selected: usize,
}

impl HistoryPicker {
    fn open(history: &[String]) -> Self {
        Self {
            entries: history.iter().rev().cloned().collect(),
            selected: 0,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum KeyHandlerResult {
    Continue(Vec<UserAction>),
    Exit,
}

pub fn run<G, R>(session: &mut Session<G, R>) -> anyhow::Result<()>
where
    G: TextGenerator + 'static,
    R: CommandRunner + 'static,
{
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, crossterm::cursor::Hide)
        .context("failed to enter alternate screen")?;
    let _guard = TuiGuard;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("failed to initialise terminal")?;

    run_app(&mut terminal, session).context("terminal UI failed")
}

fn run_app<B, G, R>(terminal: &mut Terminal<B>, session: &mut Session<G, R>) -> io::Result<()>
where
    B: Backend,
    G: TextGenerator + 'static,
    R: CommandRunner + 'static,
{
    let mut ui_state = UiState::default();
    let started = Instant::now();
    info!("terminal UI started");

    loop {
        session.pump();
        let snapshot = session.snapshot();
        let output = &session.engine().state().output;
        let tick = (started.elapsed().as_millis() / 100) as usize;

        terminal.draw(|f| draw(f, &snapshot, output, &ui_state, tick))?;

        if !event::poll(Duration::from_millis(16))? {
            continue;
        }
        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match handle_key(key, &mut ui_state, &snapshot) {
                KeyHandlerResult::Continue(actions) => {
                    for action in actions {
                        if matches!(action, UserAction::Clear) {
                            ui_state.scroll_back = 0;
                        }
                        session.submit(action);
                    }
                }
                KeyHandlerResult::Exit => {
                    info!("terminal UI closed");
                    return Ok(());
                }
            }
        }
    }
}

fn handle_key(key: KeyEvent, ui: &mut UiState, snapshot: &WorkflowSnapshot) -> KeyHandlerResult {
    if ui.picker.is_some() {
        return handle_history_keys(key, ui);
    }

    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let actions = match key.code {
        KeyCode::Esc => return KeyHandlerResult::Exit,
        KeyCode::Char('c') if ctrl => return KeyHandlerResult::Exit,
        KeyCode::Char('e') if ctrl => vec![UserAction::Execute],
        KeyCode::Char('x') if ctrl => vec![UserAction::Explain],
        KeyCode::Char('y') if ctrl => vec![UserAction::Copy],
        KeyCode::Char('s') if ctrl => vec![UserAction::QuickScan],
        KeyCode::Char('l') if ctrl => {
            ui.input.clear();
            vec![UserAction::Clear]
        }
        KeyCode::Char('r') if ctrl => {
            ui.picker = Some(HistoryPicker::open(&snapshot.history));
            Vec::new()
        }
        KeyCode::Enter => vec![UserAction::Submit(ui.input.clone())],
        KeyCode::Backspace => {
            ui.input.pop();
            Vec::new()
        }
        KeyCode::PageUp => {
            ui.scroll_back = ui.scroll_back.saturating_add(5);
            Vec::new()
        }
        KeyCode::PageDown => {
            ui.scroll_back = ui.scroll_back.saturating_sub(5);
            Vec::new()
        }
        KeyCode::Char(c) if !ctrl => {
            ui.input.push(c);
            Vec::new()
        }
        _ => Vec::new(),
    };
    KeyHandlerResult::Continue(actions)
}

fn handle_history_keys(key: KeyEvent, ui: &mut UiState) -> KeyHandlerResult {
    let Some(picker) = ui.picker.as_mut() else {
        return KeyHandlerResult::Continue(Vec::new());
    };
    let actions = match key.code {
        KeyCode::Esc => {
            ui.picker = None;
            Vec::new()
        }
        KeyCode::Up => {
            picker.selected = picker.selected.saturating_sub(1);
            Vec::new()
        }
        KeyCode::Down => {
            if picker.selected + 1 < picker.entries.len() {
                picker.selected += 1;
            }
            Vec::new()
        }
        KeyCode::Enter => {
            let chosen = picker.entries.get(picker.selected).cloned();
            ui.picker = None;
            chosen
                .map(|command| vec![UserAction::SelectFromHistory(command)])
                .unwrap_or_default()
        }
        _ => Vec::new(),
    };
    KeyHandlerResult::Continue(actions)
}

fn spinner(tick: usize) -> &'static str {
    SPINNER_FRAMES[tick % SPINNER_FRAMES.len()]
}

fn draw(
    f: &mut Frame,
    snapshot: &WorkflowSnapshot,
    output: &OutputLog,
    ui: &UiState,
    tick: usize,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(5),
            Constraint::Min(5),
            Constraint::Length(3),
        ])
        .split(f.area());

    render_query(f, chunks[0], ui);
    render_command(f, chunks[1], snapshot);
    render_output(f, chunks[2], output, ui.scroll_back);
    render_status_bar(f, chunks[3], snapshot, tick);

    if let Some(picker) = &ui.picker {
        render_history(f, picker);
    }
}

fn panel(title: &str) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(PALETTE.border))
        .title(Span::styled(
            title,
            Style::default()
                .fg(PALETTE.accent)
                .add_modifier(Modifier::BOLD),
        ))
}

fn render_query(f: &mut Frame, area: Rect, ui: &UiState) {
    let line = Line::from(vec![
        Span::styled("> ", Style::default().fg(PALETTE.accent)),
        Span::raw(ui.input.clone()),
        Span::styled("▏", Style::default().fg(PALETTE.accent)),
    ]);
    f.render_widget(Paragraph::new(line).block(panel("Query")), area);
}

fn render_command(f: &mut Frame, area: Rect, snapshot: &WorkflowSnapshot) {
    let lines = match (&snapshot.command, &snapshot.last_error) {
        (Some(command), _) => highlight_command(command),
        (None, Some(error)) => vec![Line::from(Span::styled(
            format!("{}: {}", error.kind.label(), error.message),
            Style::default().fg(PALETTE.danger),
        ))],
        (None, None) => vec![Line::from(Span::styled(
            "No command yet. Describe what you want and press Enter.",
            Style::default().fg(PALETTE.muted),
        ))],
    };
    f.render_widget(Paragraph::new(lines).block(panel("Command")), area);
}

fn highlight_command(command: &str) -> Vec<Line<'static>> {
    let ps = get_syntax_set();
    let Some(theme) = get_theme_set().themes.get(SYNTAX_THEME) else {
        return command.lines().map(|line| Line::from(line.to_string())).collect();
    };
    let syntax = ps
        .find_syntax_by_token("bash")
        .unwrap_or_else(|| ps.find_syntax_plain_text());
    let mut h = HighlightLines::new(syntax, theme);

    command
        .lines()
        .map(|line| {
            let ranges = h.highlight_line(line, ps).unwrap_or_default();
            if ranges.is_empty() {
                return Line::from(line.to_string());
            }
            let spans: Vec<Span<'static>> = ranges
                .into_iter()
                .map(|(style, text)| {
                    let fg = Color::Rgb(style.foreground.r, style.foreground.g, style.foreground.b);
                    Span::styled(text.to_string(), Style::default().fg(fg))
                })
                .collect();
            Line::from(spans)
        })
        .collect()
}

fn output_lines<'a>(entries: impl Iterator<Item = &'a OutputEntry>) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for entry in entries {
        let color = match entry.level {
            OutputLevel::Info => PALETTE.success,
            OutputLevel::Error => PALETTE.danger,
        };
        let stamp = entry.at.format("%H:%M:%S").to_string();
        for (i, text) in entry.message.split('\n').enumerate() {
            let prefix = if i == 0 {
                format!("[{stamp}] ")
            } else {
                " ".repeat(stamp.len() + 3)
            };
            lines.push(Line::from(vec![
                Span::styled(prefix, Style::default().fg(PALETTE.muted)),
                Span::styled(text.to_string(), Style::default().fg(color)),
            ]));
        }
    }
    lines
}

/// Number of trailing entries needed to fill `rows` rendered lines.
fn tail_len(output: &OutputLog, rows: usize) -> usize {
    let mut covered = 0;
    let mut taken = 0;
    for entry in output.iter().rev() {
        if covered >= rows {
            break;
        }
        covered += entry.message.split('\n').count();
        taken += 1;
    }
    taken
}

fn render_output(f: &mut Frame, area: Rect, output: &OutputLog, scroll_back: u16) {
    let visible = area.height.saturating_sub(2) as usize;
    let taken = tail_len(output, visible + scroll_back as usize);
    let lines = output_lines(output.iter().skip(output.len() - taken));
    let bottom = lines.len().saturating_sub(visible);
    let offset = bottom.saturating_sub(scroll_back as usize);
    let scroll = u16::try_from(offset).unwrap_or(u16::MAX);
    let p = Paragraph::new(lines)
        .block(panel("Output"))
        .scroll((scroll, 0));
    f.render_widget(p, area);
}

fn render_status_bar(f: &mut Frame, area: Rect, snapshot: &WorkflowSnapshot, tick: usize) {
    let stage_style = Style::default()
        .fg(PALETTE.accent_alt)
        .add_modifier(Modifier::BOLD);
    let mut spans = Vec::new();
    if snapshot.busy {
        spans.push(Span::styled(
            format!("{} ", spinner(tick)),
            Style::default().fg(PALETTE.accent),
        ));
    }
    spans.push(Span::styled(snapshot.stage.label(), stage_style));
    spans.push(Span::styled(" | ", Style::default().fg(PALETTE.muted)));

    let hint = |key: &'static str, label: &'static str, enabled: bool| {
        let (key_style, label_style) = if enabled {
            (
                Style::default().fg(PALETTE.accent),
                Style::default().fg(PALETTE.border),
            )
        } else {
            (
                Style::default().fg(PALETTE.muted),
                Style::default()
                    .fg(PALETTE.muted)
                    .add_modifier(Modifier::DIM),
            )
        };
        [
            Span::styled(key, key_style),
            Span::styled(format!(" {label}  "), label_style),
        ]
    };
    let settled = !snapshot.busy;
    spans.extend(hint("Enter", "generate", settled));
    spans.extend(hint("^E", "execute", snapshot.can_execute));
    spans.extend(hint("^X", "explain", snapshot.can_explain));
    spans.extend(hint("^Y", "copy", snapshot.command.is_some()));
    spans.extend(hint("^R", "history", !snapshot.history.is_empty()));
    spans.extend(hint("^S", "scan", settled));
    spans.extend(hint("^L", "clear", true));
    spans.extend(hint("Esc", "quit", true));

    let p = Paragraph::new(Line::from(spans))
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(PALETTE.border)),
        );
    f.render_widget(p, area);
}

fn render_history(f: &mut Frame, picker: &HistoryPicker) {
    let area = centered_rect(60, 60, f.area());
    f.render_widget(Clear, area);

    let items: Vec<ListItem> = if picker.entries.is_empty() {
        vec![ListItem::new(Span::styled(
            "No commands yet.",
            Style::default().fg(PALETTE.muted),
        ))]
    } else {
        picker
            .entries
            .iter()
            .map(|entry| ListItem::new(entry.replace('\n', " ")))
            .collect()
    };
    let list = List::new(items)
        .block(panel("History (Enter select, Esc close)"))
        .highlight_style(
            Style::default()
                .bg(PALETTE.selected_bg)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");
    let mut state = ListState::default();
    if !picker.entries.is_empty() {
        state.select(Some(picker.selected));
    }
    f.render_stateful_widget(list, area, &mut state);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
