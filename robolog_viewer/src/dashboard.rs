//! Terminal dashboard
//! ==================
//!
//! Draws the viewer with Ratatui and drives it from two Crossbeam channels:
//! a timer ticking at the playback period and terminal input read on its own
//! thread.
//!
//! Layout:
//! - Header with the log, robot and playback state
//! - Signal browser (left) and plot tabs with a value inspector (right)
//! - Timeline slider, console tail and key help

use std::io;
use std::thread;

use crossbeam::channel::{self, select};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Chart, Dataset, Gauge, GraphType, List, ListItem, ListState, Paragraph, Tabs},
    Frame, Terminal,
};
use robolog_core::{FrameSnapshot, PlaybackState, Rgb};

use crate::app::{App, Focus};
use crate::keys::HELP;
use crate::plots::{series, value_bounds};

/// Points per curve sent to the chart.
const MAX_PLOT_POINTS: usize = 2000;

/// Console lines shown under the timeline.
const CONSOLE_LINES: usize = 6;

/// Runs the viewer until the user quits.
pub fn run(app: &mut App) -> anyhow::Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = event_loop(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    result
}

fn event_loop<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> anyhow::Result<()> {
    let (tx, events) = channel::unbounded();
    thread::spawn(move || loop {
        let event = event::read();
        let failed = event.is_err();
        if tx.send(event).is_err() || failed {
            break;
        }
    });
    let ticker = channel::tick(app.config.period());

    app.startup();
    while !app.should_quit {
        terminal.draw(|f| ui(f, app))?;

        select! {
            recv(ticker) -> _ => app.on_tick(),
            recv(events) -> event => match event {
                Ok(Ok(event)) => app.handle_event(event),
                Ok(Err(e)) => return Err(e.into()),
                Err(_) => break,
            },
        }
    }
    Ok(())
}

fn color(rgb: Rgb) -> Color {
    Color::Rgb(rgb.0, rgb.1, rgb.2)
}

fn pane(title: impl Into<String>, focused: bool) -> Block<'static> {
    let style = if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    Block::default()
        .title(title.into())
        .borders(Borders::ALL)
        .border_style(style)
}

/// Render the UI
pub fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),                        // Header
            Constraint::Min(8),                           // Browser + plot
            Constraint::Length(3),                        // Timeline
            Constraint::Length(CONSOLE_LINES as u16 + 2), // Console
            Constraint::Length(1),                        // Footer
        ])
        .split(f.area());

    // one capture per redraw so the inspector and the timeline agree
    let frame = app.frame();

    draw_header(f, app, chunks[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(30), Constraint::Percentage(70)])
        .split(chunks[1]);
    draw_browser(f, app, body[0]);
    draw_plot(f, app, frame.as_ref(), body[1]);

    draw_timeline(f, app, frame.as_ref(), chunks[2]);
    draw_console(f, app, chunks[3]);
    draw_footer(f, app, chunks[4]);
}

fn draw_header(f: &mut Frame, app: &App, area: Rect) {
    let mut spans = vec![Span::styled("robolog", Style::default().add_modifier(Modifier::BOLD))];
    if let Some(session) = &app.session {
        let (state, state_color) = match session.playback.state() {
            PlaybackState::Running => ("PLAYING", Color::Green),
            PlaybackState::Paused => ("PAUSED", Color::Yellow),
            PlaybackState::Closed => ("CLOSED", Color::DarkGray),
        };
        let robot = session
            .model
            .as_ref()
            .map(|m| m.name.clone())
            .or_else(|| session.log.robot_name.clone())
            .unwrap_or_else(|| "-".to_string());
        spans.extend([
            Span::raw("  |  "),
            Span::styled(session.log.title(), Style::default().fg(Color::Cyan)),
            Span::raw("  |  "),
            Span::raw(format!("robot: {}", robot)),
            Span::raw("  |  "),
            Span::styled(state, Style::default().fg(state_color).add_modifier(Modifier::BOLD)),
            Span::raw(format!("  x{:.2}", session.playback.speed)),
        ]);
    } else {
        spans.push(Span::raw("  |  no log loaded"));
    }
    let header = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::BOTTOM));
    f.render_widget(header, area);
}

fn draw_browser(f: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = app
        .browser
        .labels()
        .iter()
        .map(|label| ListItem::new(label.clone()))
        .collect();
    let title = format!("Signals ({})", items.len());
    let list = List::new(items)
        .block(pane(title, app.focus == Focus::Signals))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .highlight_symbol("> ");
    let mut state = ListState::default().with_selected((!app.browser.is_empty()).then(|| app.browser.selected_index()));
    f.render_stateful_widget(list, area, &mut state);
}

fn draw_plot(f: &mut Frame, app: &App, frame: Option<&FrameSnapshot>, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(2), Constraint::Min(5), Constraint::Length(6)])
        .split(area);

    // === TABS ===
    let titles: Vec<String> = app.plots.tabs().iter().map(|t| t.title.clone()).collect();
    let tabs = Tabs::new(titles)
        .select(app.plots.active_index())
        .highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
        .block(Block::default().borders(Borders::BOTTOM));
    f.render_widget(tabs, chunks[0]);

    let focused = app.focus == Focus::Plot;
    let tab = app.plots.active();
    let Some(session) = &app.session else {
        f.render_widget(Paragraph::new("Open a log with 'o'").block(pane("Plot", focused)), chunks[1]);
        return;
    };

    // === CHART ===
    let curves: Vec<Vec<(f64, f64)>> = tab
        .curves
        .iter()
        .map(|key| series(&session.log, key, MAX_PLOT_POINTS))
        .collect();
    let duration = session.log.axis.duration().max(f64::EPSILON);
    let [lo, hi] = value_bounds(curves.iter().map(Vec::as_slice));
    let now = frame.map_or(0.0, |frame| frame.time);
    let cursor_line = [(now, lo), (now, hi)];

    let mut datasets: Vec<Dataset> = tab
        .curves
        .iter()
        .zip(&curves)
        .enumerate()
        .map(|(i, (key, points))| {
            Dataset::default()
                .name(key.to_string())
                .marker(Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(color(tab.color(i))))
                .data(points)
        })
        .collect();
    datasets.push(
        Dataset::default()
            .marker(Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::White))
            .data(&cursor_line),
    );

    let chart = Chart::new(datasets)
        .block(pane(format!("{} ({} curves)", tab.title, tab.curves.len()), focused))
        .x_axis(
            Axis::default()
                .title("time [s]")
                .bounds([0.0, duration])
                .labels([format!("{:.1}", 0.0), format!("{:.1}", duration / 2.0), format!("{:.1}", duration)]),
        )
        .y_axis(
            Axis::default()
                .bounds([lo, hi])
                .labels([format!("{:.3}", lo), format!("{:.3}", (lo + hi) / 2.0), format!("{:.3}", hi)]),
        );
    f.render_widget(chart, chunks[1]);

    // === VALUE INSPECTOR ===
    let lines: Vec<Line> = match frame {
        Some(frame) => frame
            .values
            .iter()
            .enumerate()
            .map(|(i, curve)| {
                let marker = if focused && i == tab.selected { "> " } else { "  " };
                let value = curve
                    .value
                    .map(|v| format!("{:>12.5}", v))
                    .unwrap_or_else(|| format!("{:>12}", "-"));
                Line::from(vec![
                    Span::raw(marker),
                    Span::styled("■ ", Style::default().fg(color(tab.color(i)))),
                    Span::raw(format!("{} {}", value, curve.label)),
                ])
            })
            .collect(),
        None => Vec::new(),
    };
    let inspector = Paragraph::new(lines).block(Block::default().title("Values at cursor").borders(Borders::ALL));
    f.render_widget(inspector, chunks[2]);
}

fn draw_timeline(f: &mut Frame, app: &mut App, frame: Option<&FrameSnapshot>, area: Rect) {
    let block = Block::default().title("Timeline").borders(Borders::ALL);
    let inner = block.inner(area);
    app.timeline_area = inner;

    let (ratio, label) = match (&app.session, frame) {
        (Some(session), Some(frame)) => (
            frame.fraction.clamp(0.0, 1.0),
            format!(
                "t={:.2} s / {:.2} s  [{}/{}]",
                frame.time,
                session.log.axis.duration(),
                frame.index,
                session.cursor.len().saturating_sub(1)
            ),
        ),
        _ => (0.0, "-".to_string()),
    };
    let gauge = Gauge::default()
        .block(block)
        .gauge_style(Style::default().fg(Color::Cyan))
        .ratio(ratio)
        .label(label);
    f.render_widget(gauge, area);
}

fn draw_console(f: &mut Frame, app: &App, area: Rect) {
    let lines: Vec<Line> = app
        .console
        .tail(CONSOLE_LINES)
        .iter()
        .map(|entry| Line::styled(entry.format(), Style::default().fg(entry.level.color())))
        .collect();
    let console = Paragraph::new(lines).block(Block::default().title("Console").borders(Borders::ALL));
    f.render_widget(console, area);
}

fn draw_footer(f: &mut Frame, app: &App, area: Rect) {
    let footer = match &app.prompt {
        Some(prompt) => Paragraph::new(Line::from(vec![
            Span::styled(
                format!("{}: ", prompt.kind.title()),
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!("{}_", prompt.text)),
        ])),
        None => Paragraph::new(HELP).style(Style::default().fg(Color::DarkGray)),
    };
    f.render_widget(footer, area);
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::{sample_log, test_app};
    use crate::keys::Action;
    use ratatui::backend::TestBackend;

    fn screen(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_empty_viewer_renders() {
        let (mut app, _ctx) = test_app();
        let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();
        terminal.draw(|f| ui(f, &mut app)).unwrap();

        let text = screen(&terminal);
        assert!(text.contains("no log loaded"));
        assert!(text.contains("Plot 1"));
    }

    #[test]
    fn test_loaded_log_renders() {
        let (mut app, _ctx) = test_app();
        app.load_log(sample_log());
        app.apply(Action::ToggleCurve);
        app.apply(Action::End);

        let mut terminal = Terminal::new(TestBackend::new(140, 45)).unwrap();
        terminal.draw(|f| ui(f, &mut app)).unwrap();

        let text = screen(&terminal);
        assert!(text.contains("PAUSED"));
        assert!(text.contains("balancing/com/0"));
        assert!(text.contains("t=9.99 s / 9.99 s"));
        assert_eq!(app.timeline_area.height, 1);
        assert_eq!(app.timeline_area.width, 138);
    }

    #[test]
    fn test_prompt_in_footer() {
        let (mut app, _ctx) = test_app();
        app.apply(Action::OpenPrompt);
        app.apply(Action::PromptInput('a'));

        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|f| ui(f, &mut app)).unwrap();
        assert!(screen(&terminal).contains("Open: a_"));
    }

    #[test]
    fn test_rename_prompt_in_footer() {
        let (mut app, _ctx) = test_app();
        app.apply(Action::RenameTab);
        app.apply(Action::PromptInput('!'));

        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|f| ui(f, &mut app)).unwrap();
        assert!(screen(&terminal).contains("Rename: Plot 1!_"));
    }

    #[test]
    fn test_timeline_and_inspector_share_the_frame() {
        let (mut app, _ctx) = test_app();
        app.load_log(sample_log());
        app.apply(Action::ToggleCurve);
        app.apply(Action::Step(250));

        let frame = app.frame().unwrap();
        let mut terminal = Terminal::new(TestBackend::new(140, 45)).unwrap();
        terminal.draw(|f| ui(f, &mut app)).unwrap();

        let text = screen(&terminal);
        assert!(text.contains(&format!("t={:.2} s", frame.time)));
        assert!(text.contains(&format!("[{}/", frame.index)));
        let value = frame.values[0].value.unwrap();
        assert!(text.contains(&format!("{:>12.5}", value)));
    }
}
