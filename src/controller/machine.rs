//! The selection state machine.
//!
//! One [`SelectionStateMachine::update`] call per tick turns the classified
//! tilt into edits. Cardinals step a cursor (rate limited), diagonals fire a
//! mode-dependent action once per dwell episode, and holding the centre long
//! enough commits the highlighted character or suggestion.
//!
//! All timing is driven by the `now` passed in, so the machine is fully
//! deterministic under test.

use crate::bridge::{SpeechSink, Transcript};
use crate::config::{Config, TimingConfig};
use crate::controller::edit::{Alphabet, EditBuffer, Glyph};
use crate::input::{Direction, DirectionClassifier};
use crate::predict::{PredictiveEngine, Suggestions, DEFAULT_MAX_RESULTS};
use crate::render::RenderSnapshot;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Top-level operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "config",
    derive(serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum Mode {
    /// Composing a sentence from the alphabet ring and suggestions
    Write,
    /// Reading the live transcript
    Caption,
}

impl Mode {
    pub fn toggled(self) -> Self {
        match self {
            Mode::Write => Mode::Caption,
            Mode::Caption => Mode::Write,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Mode::Write => "WRITE",
            Mode::Caption => "CAPTION",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

/// Short-lived visual acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flash {
    /// A diagonal gesture fired
    Gesture(Direction),
    /// A message went to speech
    Send,
}

impl Flash {
    pub fn label(self) -> &'static str {
        match self {
            Flash::Gesture(direction) => direction.label(),
            Flash::Send => ".",
        }
    }
}

/// Owns all mutable controller state.
pub struct SelectionStateMachine {
    timing: TimingConfig,
    alphabet: Alphabet,
    classifier: DirectionClassifier,
    engine: Arc<PredictiveEngine>,
    transcript: Transcript,
    speech: Arc<dyn SpeechSink>,

    mode: Mode,
    buffer: EditBuffer,
    suggestions: Suggestions,
    transcript_scroll: usize,
    dwell_percent: f64,

    last_cardinal_at: Option<Instant>,
    center_cooldown_until: Option<Instant>,
    was_off_center: bool,
    action_lock: Option<Direction>,
    flash: Option<Flash>,
    flash_until: Option<Instant>,
    restart_requested: bool,
}

impl fmt::Debug for SelectionStateMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectionStateMachine")
            .field("mode", &self.mode)
            .field("buffer", &self.buffer)
            .field("direction", &self.classifier.direction())
            .field("dwell_percent", &self.dwell_percent)
            .field("action_lock", &self.action_lock)
            .finish_non_exhaustive()
    }
}

impl SelectionStateMachine {
    pub fn new(
        config: &Config,
        engine: Arc<PredictiveEngine>,
        transcript: Transcript,
        speech: Arc<dyn SpeechSink>,
    ) -> Self {
        let mut machine = Self {
            timing: config.timing.clone(),
            alphabet: Alphabet::new(&config.alphabet),
            classifier: DirectionClassifier::new(config.gesture.clone()),
            engine,
            transcript,
            speech,
            mode: config.initial_mode,
            buffer: EditBuffer::new(),
            suggestions: Suggestions::none(),
            transcript_scroll: 0,
            dwell_percent: 0.0,
            last_cardinal_at: None,
            center_cooldown_until: None,
            was_off_center: false,
            action_lock: None,
            flash: None,
            flash_until: None,
            restart_requested: false,
        };
        if machine.mode == Mode::Write {
            machine.refresh_suggestions();
        }
        machine
    }

    /// Start in `mode` instead of the configured one
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        if mode == Mode::Write {
            self.refresh_suggestions();
        }
        self
    }

    /// Advance one tick with the latest tilt sample.
    pub fn update(&mut self, roll: f64, pitch: f64, now: Instant) {
        let (direction, _) = self.classifier.classify(roll, pitch, now);

        if self.flash_until.is_some_and(|until| now > until) {
            self.flash = None;
            self.flash_until = None;
        }

        // Coming back to centre must not instantly count towards a commit
        if direction != Direction::Center {
            self.was_off_center = true;
        } else if self.was_off_center {
            self.was_off_center = false;
            self.center_cooldown_until = Some(now + self.timing.center_return_cooldown());
            self.classifier.reset_dwell(now);
        }

        if self.action_lock.is_some_and(|locked| locked != direction) {
            self.action_lock = None;
        }

        if self.mode == Mode::Write {
            self.refresh_suggestions();
        }

        match direction {
            Direction::Center => self.handle_center(now),
            Direction::N | Direction::S | Direction::E | Direction::W => {
                self.handle_cardinal(direction, now)
            }
            Direction::NE | Direction::NW | Direction::SE | Direction::SW => {
                self.handle_diagonal(direction, now)
            }
        }

        self.dwell_percent = self.dwell_percent_at(now);
    }

    /// Progress of the current dwell towards its action, in [0, 1].
    pub fn dwell_percent_at(&self, now: Instant) -> f64 {
        let dwell = self.classifier.dwell();
        match self.classifier.direction() {
            Direction::Center => {
                if self.mode == Mode::Caption {
                    return 0.0;
                }
                if self.center_cooldown_until.is_some_and(|until| now < until) {
                    return 0.0;
                }
                // Time spent inside the return cooldown does not count
                let remaining = match (self.center_cooldown_until, now.checked_sub(dwell)) {
                    (Some(until), Some(dwell_start)) => until.saturating_duration_since(dwell_start),
                    _ => Duration::ZERO,
                };
                let active = dwell.as_secs_f64() - remaining.as_secs_f64();
                clamp_unit(active / self.timing.center_dwell_secs)
            }
            Direction::NE | Direction::NW | Direction::SE | Direction::SW => {
                clamp_unit(dwell.as_secs_f64() / self.timing.diagonal_dwell_secs)
            }
            Direction::N | Direction::S | Direction::E | Direction::W => 0.0,
        }
    }

    fn handle_center(&mut self, now: Instant) {
        if self.center_cooldown_until.is_some_and(|until| now < until) {
            return;
        }
        if self.mode == Mode::Write && self.dwell_percent_at(now) >= 1.0 {
            self.commit_selection(now);
            self.classifier.reset_dwell(now);
            self.center_cooldown_until = Some(now + self.timing.center_return_cooldown());
        }
    }

    fn handle_cardinal(&mut self, direction: Direction, now: Instant) {
        if let Some(last) = self.last_cardinal_at {
            if now.saturating_duration_since(last) < self.timing.cardinal_cooldown() {
                return;
            }
        }
        self.last_cardinal_at = Some(now);

        match (self.mode, direction) {
            (Mode::Write, Direction::E) => {
                self.buffer.cursor_index = self.alphabet.step(self.buffer.cursor_index, 1);
            }
            (Mode::Write, Direction::W) => {
                self.buffer.cursor_index = self.alphabet.step(self.buffer.cursor_index, -1);
            }
            (Mode::Write, Direction::S) => {
                self.buffer.sugg_index = (self.buffer.sugg_index + 1).min(self.suggestions.len());
            }
            (Mode::Write, Direction::N) => {
                self.buffer.sugg_index = self.buffer.sugg_index.saturating_sub(1);
            }
            (Mode::Caption, Direction::N) => {
                let max_scroll = self.transcript.len().saturating_sub(1);
                self.transcript_scroll = (self.transcript_scroll + 1).min(max_scroll);
            }
            (Mode::Caption, Direction::S) => {
                self.transcript_scroll = self.transcript_scroll.saturating_sub(1);
            }
            _ => {}
        }
    }

    fn handle_diagonal(&mut self, direction: Direction, now: Instant) {
        if self.action_lock == Some(direction) {
            return;
        }
        if self.dwell_percent_at(now) < 1.0 {
            return;
        }

        self.action_lock = Some(direction);
        self.classifier.reset_dwell(now);
        self.show_flash(Flash::Gesture(direction), now);
        log::debug!("{} fired in {} mode", direction, self.mode);

        match (self.mode, direction) {
            (_, Direction::NW) => {
                self.mode = self.mode.toggled();
                log::info!("Switched to {} mode", self.mode);
            }
            (Mode::Write, Direction::NE) => self.accept_top_suggestion(),
            (Mode::Write, Direction::SE) => self.buffer.backspace(),
            (Mode::Write, Direction::SW) => self.buffer.delete_word(),
            (Mode::Caption, Direction::NE) => {
                if let Some(word) = self.transcript.last_word() {
                    self.buffer.prefix = word;
                    self.mode = Mode::Write;
                    log::info!("Took {:?} from transcript", self.buffer.prefix);
                }
            }
            (Mode::Caption, Direction::SE) => {
                self.transcript.toggle_pause();
            }
            (Mode::Caption, Direction::SW) => {
                self.transcript.clear();
                self.transcript_scroll = 0;
            }
            _ => {}
        }
    }

    fn accept_top_suggestion(&mut self) {
        if let Some(word) = self.suggestions.top().map(str::to_owned) {
            self.buffer.accept_word(&word);
        }
    }

    /// Apply whatever the cursor or suggestion selector points at.
    fn commit_selection(&mut self, now: Instant) {
        if self.buffer.sugg_index == 0 {
            match self.alphabet.glyph_at(self.buffer.cursor_index) {
                Glyph::Space => self.buffer.commit_prefix(),
                Glyph::Backspace => self.buffer.backspace(),
                Glyph::DeleteWord => self.buffer.delete_word(),
                Glyph::Clear => self.buffer.clear(),
                Glyph::Send => self.send_message(now),
                Glyph::Letter(ch) => self.buffer.push_char(ch),
            }
        } else {
            let slot = self.buffer.sugg_index - 1;
            if let Some(word) = self.suggestions.get(slot).map(str::to_owned) {
                self.buffer.accept_word(&word);
            }
            self.buffer.sugg_index = 0;
        }
    }

    fn send_message(&mut self, now: Instant) {
        if let Some(message) = self.buffer.take_message() {
            log::info!("Speaking {:?}", message);
            self.speech.speak(&message);
            self.show_flash(Flash::Send, now);
        }
    }

    fn show_flash(&mut self, flash: Flash, now: Instant) {
        self.flash = Some(flash);
        self.flash_until = Some(now + self.timing.flash());
    }

    fn refresh_suggestions(&mut self) {
        self.suggestions = self.engine.get_suggestions(
            &self.buffer.prefix,
            &self.buffer.sentence,
            DEFAULT_MAX_RESULTS,
        );
        self.buffer.sugg_index = self.buffer.sugg_index.min(self.suggestions.len());
    }

    /// Ask the host to rebuild the controller
    pub fn request_restart(&mut self) {
        self.restart_requested = true;
    }

    /// Consume a pending restart request
    pub fn take_restart_request(&mut self) -> bool {
        std::mem::take(&mut self.restart_requested)
    }

    pub fn snapshot(&self) -> RenderSnapshot {
        RenderSnapshot {
            mode: self.mode,
            direction: self.classifier.direction(),
            dwell_percent: self.dwell_percent,
            alphabet: self.alphabet.chars().to_vec(),
            cursor_index: self.buffer.cursor_index,
            sentence: self.buffer.sentence.clone(),
            prefix: self.buffer.prefix.clone(),
            suggestions: self.suggestions.candidates.clone(),
            sugg_index: self.buffer.sugg_index,
            ngram_level: self.suggestions.level,
            ngram_context: self.suggestions.context_key.clone(),
            transcript: self.transcript.lines(),
            partial: self.transcript.partial(),
            transcript_scroll: self.transcript_scroll,
            paused: self.transcript.is_paused(),
            flash: self.flash,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn buffer(&self) -> &EditBuffer {
        &self.buffer
    }

    /// Direct access for hosts that seed or inspect the buffer
    pub fn buffer_mut(&mut self) -> &mut EditBuffer {
        &mut self.buffer
    }

    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    pub fn current_char(&self) -> char {
        self.alphabet.char_at(self.buffer.cursor_index)
    }

    pub fn suggestions(&self) -> &Suggestions {
        &self.suggestions
    }

    pub fn direction(&self) -> Direction {
        self.classifier.direction()
    }

    pub fn dwell(&self) -> Duration {
        self.classifier.dwell()
    }

    /// Dwell progress as of the last tick
    pub fn dwell_percent(&self) -> f64 {
        self.dwell_percent
    }

    pub fn flash(&self) -> Option<Flash> {
        self.flash
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn transcript_scroll(&self) -> usize {
        self.transcript_scroll
    }

    pub fn restart_requested(&self) -> bool {
        self.restart_requested
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
