//! Full-screen scene drawn with ratatui
//!
//! WRITE mode shows the sentence, a window onto the alphabet ring, the
//! suggestion list and the dwell gauge. CAPTION mode swaps the editing panes
//! for the transcript. While a diagonal is held, a banner above the gauge
//! names the action it will fire. Layout is computed from the frame size
//! every draw.

use crate::controller::Mode;
use crate::error::Result;
use crate::render::ui::{SceneRenderer, SceneTheme};
use crate::render::RenderSnapshot;
use ratatui::crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph, Wrap},
    Frame, Terminal,
};
use std::io::{self, Stdout};

type CrosstermTerminal = Terminal<CrosstermBackend<Stdout>>;

/// Characters shown either side of the cursor in the ring window
const RING_RADIUS: usize = 6;

/// Terminal scene with ratatui backend
pub struct TerminalScene {
    terminal: Option<CrosstermTerminal>,
    theme: SceneTheme,
}

impl TerminalScene {
    pub fn with_theme(theme: SceneTheme) -> Result<Self> {
        Ok(Self {
            terminal: None,
            theme,
        })
    }
}

/// Draw one frame for `snapshot`.
pub fn draw_scene(frame: &mut Frame, snapshot: &RenderSnapshot, theme: &SceneTheme) {
    let area = frame.size();
    let shortcut = snapshot.shortcut_label();
    let banner_height = if shortcut.is_some() { 3 } else { 0 };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(banner_height),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(area);

    match snapshot.mode {
        Mode::Write => draw_write_panes(frame, chunks[0], snapshot, theme),
        Mode::Caption => draw_caption_pane(frame, chunks[0], snapshot, theme),
    }

    let ratio = if snapshot.dwell_percent.is_finite() {
        snapshot.dwell_percent.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let gauge = Gauge::default()
        .gauge_style(Style::default().fg(theme.gauge))
        .ratio(ratio)
        .label(format!(
            "{} {:>3.0}%",
            snapshot.direction,
            snapshot.dwell_percent * 100.0
        ));
    if let Some(label) = shortcut {
        let banner = Paragraph::new(Line::styled(label, theme.highlight))
            .alignment(Alignment::Center)
            .block(pane("Hold", theme));
        frame.render_widget(banner, chunks[1]);
    }
    frame.render_widget(gauge, chunks[2]);

    frame.render_widget(status_line(snapshot, theme), chunks[3]);
}

fn draw_write_panes(frame: &mut Frame, area: Rect, snapshot: &RenderSnapshot, theme: &SceneTheme) {
    let panes = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),
            Constraint::Length(3),
            Constraint::Length(snapshot.suggestions.len().max(1) as u16 + 2),
        ])
        .split(area);

    let sentence = Paragraph::new(Line::from(vec![
        Span::styled(snapshot.sentence.clone(), theme.text()),
        Span::styled(snapshot.prefix.clone(), theme.prefix),
    ]))
    .wrap(Wrap { trim: false })
    .block(pane("Message", theme));
    frame.render_widget(sentence, panes[0]);

    let ring = Paragraph::new(ring_line(snapshot, theme))
        .alignment(Alignment::Center)
        .block(pane("Alphabet", theme));
    frame.render_widget(ring, panes[1]);

    let title = format!("Suggestions {} {}", snapshot.ngram_level, snapshot.ngram_context);
    let suggestions = Paragraph::new(suggestion_lines(snapshot, theme)).block(pane(&title, theme));
    frame.render_widget(suggestions, panes[2]);
}

fn draw_caption_pane(frame: &mut Frame, area: Rect, snapshot: &RenderSnapshot, theme: &SceneTheme) {
    let title = if snapshot.paused {
        "Captions (paused)"
    } else {
        "Captions"
    };
    let block = pane(title, theme);
    let height = block.inner(area).height as usize;

    let mut lines: Vec<Line> = snapshot
        .visible_transcript(height.saturating_sub(1).max(1))
        .iter()
        .map(|line| Line::styled(line.clone(), theme.text()))
        .collect();
    if snapshot.paused {
        lines.push(Line::styled("PAUSED", Style::default().fg(theme.paused_text)));
    } else if !snapshot.partial.is_empty() && snapshot.transcript_scroll == 0 {
        lines.push(Line::styled(snapshot.partial.clone(), theme.prefix));
    }

    let paragraph = Paragraph::new(lines).wrap(Wrap { trim: true }).block(block);
    frame.render_widget(paragraph, area);
}

fn pane<'a>(title: &'a str, theme: &SceneTheme) -> Block<'a> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.border))
        .title(title)
}

/// Window onto the alphabet ring with the cursor in the middle
fn ring_line(snapshot: &RenderSnapshot, theme: &SceneTheme) -> Line<'static> {
    let window = snapshot.ring_window(RING_RADIUS);
    let middle = window.len() / 2;
    let spans: Vec<Span> = window
        .into_iter()
        .enumerate()
        .map(|(idx, ch)| {
            let text = format!(" {ch} ");
            if idx == middle && snapshot.sugg_index == 0 {
                Span::styled(text, theme.highlight)
            } else {
                Span::styled(text, theme.text())
            }
        })
        .collect();
    Line::from(spans)
}

fn suggestion_lines(snapshot: &RenderSnapshot, theme: &SceneTheme) -> Vec<Line<'static>> {
    if snapshot.suggestions.is_empty() {
        return vec![Line::styled("(none)", theme.text())];
    }
    snapshot
        .suggestions
        .iter()
        .enumerate()
        .map(|(idx, word)| {
            let text = format!("{}. {}", idx + 1, word);
            if snapshot.sugg_index == idx + 1 {
                Line::styled(text, theme.highlight)
            } else {
                Line::styled(text, theme.text())
            }
        })
        .collect()
}

fn status_line(snapshot: &RenderSnapshot, theme: &SceneTheme) -> Paragraph<'static> {
    let mut spans = vec![Span::styled(
        format!(" {} | {} ", snapshot.mode, snapshot.direction),
        theme.status(),
    )];
    if let Some(flash) = snapshot.flash {
        spans.push(Span::styled(format!(" {} ", flash.label()), theme.flash));
    }
    Paragraph::new(Line::from(spans)).style(theme.status())
}

impl SceneRenderer for TerminalScene {
    fn render(&mut self, snapshot: &RenderSnapshot) -> Result<()> {
        if let Some(ref mut terminal) = self.terminal {
            let theme = &self.theme;
            terminal.draw(move |frame| draw_scene(frame, snapshot, theme))?;
        }
        Ok(())
    }

    fn initialize(&mut self) -> Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;

        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;
        self.terminal = Some(terminal);

        Ok(())
    }

    fn cleanup(&mut self) -> Result<()> {
        if self.terminal.is_some() {
            disable_raw_mode()?;
            execute!(io::stdout(), LeaveAlternateScreen)?;
            self.terminal = None;
        }
        Ok(())
    }
}

impl Drop for TerminalScene {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::Flash;
    use crate::input::Direction as Tilt;
    use crate::predict::NGramLevel;
    use ratatui::backend::TestBackend;
    use ratatui::style::Color;

    fn screen_text(snapshot: &RenderSnapshot) -> String {
        let mut terminal = Terminal::new(TestBackend::new(60, 20)).unwrap();
        let theme = SceneTheme::default();
        terminal
            .draw(|frame| draw_scene(frame, snapshot, &theme))
            .unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    fn write_snapshot() -> RenderSnapshot {
        RenderSnapshot {
            mode: Mode::Write,
            direction: Tilt::Center,
            dwell_percent: 0.5,
            alphabet: "ABCDEFGHIJKLMNOPQRSTUVWXYZ_<[].".chars().collect(),
            cursor_index: 7,
            sentence: "HELLO ".into(),
            prefix: "WO".into(),
            suggestions: vec!["WORLD".into(), "WORK".into()],
            sugg_index: 0,
            ngram_level: NGramLevel::Bi,
            ngram_context: "HELLO".into(),
            ..RenderSnapshot::default()
        }
    }

    #[test]
    fn test_terminal_scene_creation() {
        let scene = TerminalScene::with_theme(SceneTheme::default()).unwrap();
        assert!(scene.terminal.is_none());
        assert_eq!(scene.theme.status_bg, Color::Blue);

        let scene = TerminalScene::with_theme(SceneTheme::monochrome()).unwrap();
        assert_eq!(scene.theme.status_bg, Color::Black);
    }

    #[test]
    fn write_scene_shows_message_ring_and_suggestions() {
        let text = screen_text(&write_snapshot());
        assert!(text.contains("HELLO WO"));
        assert!(text.contains(" H "));
        assert!(text.contains("1. WORLD"));
        assert!(text.contains("2. WORK"));
        assert!(text.contains("2G HELLO"));
        assert!(text.contains("WRITE | CENTER"));
        assert!(text.contains("50%"));
    }

    #[test]
    fn ring_highlight_moves_to_suggestions() {
        let theme = SceneTheme::default();
        let snapshot = write_snapshot();
        let line = ring_line(&snapshot, &theme);
        let middle = &line.spans[line.spans.len() / 2];
        assert_eq!(middle.content, " H ");
        assert_eq!(middle.style, theme.highlight);

        let selecting = RenderSnapshot {
            sugg_index: 2,
            ..snapshot
        };
        let line = ring_line(&selecting, &theme);
        assert!(line.spans.iter().all(|span| span.style != theme.highlight));
        let lines = suggestion_lines(&selecting, &theme);
        assert_eq!(lines[1].style, theme.highlight);
    }

    #[test]
    fn caption_scene_shows_transcript_and_pause() {
        let snapshot = RenderSnapshot {
            mode: Mode::Caption,
            transcript: vec!["GOOD MORNING".into(), "HOW ARE YOU".into()],
            partial: "I AM".into(),
            ..RenderSnapshot::default()
        };
        let text = screen_text(&snapshot);
        assert!(text.contains("GOOD MORNING"));
        assert!(text.contains("HOW ARE YOU"));
        assert!(text.contains("I AM"));
        assert!(text.contains("CAPTION"));

        let paused = RenderSnapshot {
            paused: true,
            ..snapshot
        };
        let text = screen_text(&paused);
        assert!(text.contains("Captions (paused)"));
        assert!(text.contains("PAUSED"));
    }

    #[test]
    fn held_diagonal_names_its_action() {
        let cases = [
            (Mode::Write, Tilt::NE, "ACCEPT WORLD"),
            (Mode::Write, Tilt::SE, "BACKSPACE"),
            (Mode::Write, Tilt::SW, "DEL WORD"),
            (Mode::Write, Tilt::NW, "CAPTION MODE"),
            (Mode::Caption, Tilt::NE, "WRITE YOU"),
            (Mode::Caption, Tilt::SE, "PAUSE"),
            (Mode::Caption, Tilt::SW, "CLEAR"),
            (Mode::Caption, Tilt::NW, "WRITE MODE"),
        ];
        for (mode, direction, label) in cases {
            let snapshot = RenderSnapshot {
                mode,
                direction,
                dwell_percent: 0.4,
                transcript: vec!["HOW ARE YOU".into()],
                ..write_snapshot()
            };
            let text = screen_text(&snapshot);
            assert!(text.contains(label), "{mode} {direction}: missing {label:?}");
            assert!(text.contains("40%"));
        }

        let paused = RenderSnapshot {
            mode: Mode::Caption,
            direction: Tilt::SE,
            paused: true,
            ..write_snapshot()
        };
        assert!(screen_text(&paused).contains("RESUME"));
    }

    #[test]
    fn no_banner_without_a_diagonal() {
        let text = screen_text(&write_snapshot());
        assert!(!text.contains("Hold"));
        assert!(!text.contains("ACCEPT"));
    }

    #[test]
    fn flash_appears_in_status_line() {
        let snapshot = RenderSnapshot {
            flash: Some(Flash::Gesture(Tilt::SE)),
            ..write_snapshot()
        };
        let text = screen_text(&snapshot);
        assert!(text.contains(" SE "));
    }

    #[test]
    fn tiny_terminal_does_not_panic() {
        let mut terminal = Terminal::new(TestBackend::new(4, 2)).unwrap();
        let theme = SceneTheme::default();
        let snapshot = write_snapshot();
        terminal
            .draw(|frame| draw_scene(frame, &snapshot, &theme))
            .unwrap();
    }
}
