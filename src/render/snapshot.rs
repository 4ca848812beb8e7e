//! Read-only view of the controller handed to renderers each tick.

use crate::controller::{Flash, Mode};
use crate::input::Direction;
use crate::predict::NGramLevel;

/// Everything a renderer needs to draw one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSnapshot {
    pub mode: Mode,
    pub direction: Direction,
    pub dwell_percent: f64,

    pub alphabet: Vec<char>,
    pub cursor_index: usize,
    pub sentence: String,
    pub prefix: String,
    pub suggestions: Vec<String>,
    /// 0 is the alphabet row, 1..=N a suggestion
    pub sugg_index: usize,
    pub ngram_level: NGramLevel,
    pub ngram_context: String,

    pub transcript: Vec<String>,
    pub partial: String,
    /// Lines scrolled back from the newest
    pub transcript_scroll: usize,
    pub paused: bool,

    pub flash: Option<Flash>,
}

impl RenderSnapshot {
    /// Character under the cursor, if the alphabet is non-empty
    pub fn current_char(&self) -> Option<char> {
        if self.alphabet.is_empty() {
            None
        } else {
            Some(self.alphabet[self.cursor_index % self.alphabet.len()])
        }
    }

    /// `radius` characters either side of the cursor, wrapping around
    pub fn ring_window(&self, radius: usize) -> Vec<char> {
        let len = self.alphabet.len();
        if len == 0 {
            return Vec::new();
        }
        let width = (2 * radius + 1).min(len);
        let start = (self.cursor_index % len + len * radius - width / 2) % len;
        (0..width).map(|offset| self.alphabet[(start + offset) % len]).collect()
    }

    /// What the held diagonal will do once its dwell completes.
    ///
    /// `None` unless a diagonal is held.
    pub fn shortcut_label(&self) -> Option<String> {
        let label = match (self.mode, self.direction) {
            (Mode::Write, Direction::NW) => "CAPTION MODE".to_string(),
            (Mode::Write, Direction::NE) => match self.suggestions.first() {
                Some(word) => format!("ACCEPT {word}"),
                None => "NO SUGGESTION".to_string(),
            },
            (Mode::Write, Direction::SE) => "BACKSPACE".to_string(),
            (Mode::Write, Direction::SW) => "DEL WORD".to_string(),
            (Mode::Caption, Direction::NW) => "WRITE MODE".to_string(),
            (Mode::Caption, Direction::NE) => {
                match self.transcript.last().and_then(|line| line.split_whitespace().last()) {
                    Some(word) => format!("WRITE {word}"),
                    None => "NO WORD YET".to_string(),
                }
            }
            (Mode::Caption, Direction::SE) if self.paused => "RESUME".to_string(),
            (Mode::Caption, Direction::SE) => "PAUSE".to_string(),
            (Mode::Caption, Direction::SW) => "CLEAR".to_string(),
            _ => return None,
        };
        Some(label)
    }

    /// The sentence as typed, prefix included
    pub fn composed_text(&self) -> String {
        format!("{}{}", self.sentence, self.prefix)
    }

    /// Transcript lines visible in a pane `height` lines tall, oldest first.
    ///
    /// Scrolling moves the window back from the newest line.
    pub fn visible_transcript(&self, height: usize) -> &[String] {
        let len = self.transcript.len();
        let end = len.saturating_sub(self.transcript_scroll.min(len.saturating_sub(1)));
        let start = end.saturating_sub(height);
        &self.transcript[start..end]
    }
}

impl Default for RenderSnapshot {
    fn default() -> Self {
        Self {
            mode: Mode::Caption,
            direction: Direction::Center,
            dwell_percent: 0.0,
            alphabet: Vec::new(),
            cursor_index: 0,
            sentence: String::new(),
            prefix: String::new(),
            suggestions: Vec::new(),
            sugg_index: 0,
            ngram_level: NGramLevel::None,
            ngram_context: String::new(),
            transcript: Vec::new(),
            partial: String::new(),
            transcript_scroll: 0,
            paused: false,
            flash: None,
        }
    }
}
