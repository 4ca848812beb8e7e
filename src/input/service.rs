//! Keyboard tilt simulator.
//!
//! Terminals report key presses, not key holds, so each key latches a simulated
//! head position that stays put until another key moves it. The latched tilt is
//! fed to the controller every tick exactly like a real sensor sample.

use crate::error::{Result, TiltError};
use crate::input::direction::Direction;
use crate::input::raw::TiltSample;
use ratatui::crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

/// Magnitude of a simulated tilt, comfortably outside the deadzone.
const SIMULATED_TILT: f64 = 0.6;
/// Poll timeout used when the caller does not provide one.
const DEFAULT_POLL_TIMEOUT_MS: u64 = 50;

/// High-level actions produced from terminal events.
#[derive(Debug, Clone, PartialEq)]
pub enum InputAction {
    /// Latch a new simulated head position
    Tilt(TiltSample),
    RequestRestart,
    Quit,
    Resize {
        width: u16,
        height: u16,
    },
    NoAction,
}

/// Maps keys to simulated tilts: vi/roguelike letters or arrows for
/// directions, space for centre.
#[derive(Debug, Clone, Copy)]
pub struct KeyTiltMapper {
    magnitude: f64,
}

impl KeyTiltMapper {
    pub fn new() -> Self {
        Self {
            magnitude: SIMULATED_TILT,
        }
    }

    pub fn handle_key_event(&self, key_event: KeyEvent) -> InputAction {
        if key_event.kind != KeyEventKind::Press {
            return InputAction::NoAction;
        }

        if key_event.modifiers.contains(KeyModifiers::CONTROL) {
            return match key_event.code {
                KeyCode::Char('c') => InputAction::Quit,
                _ => InputAction::NoAction,
            };
        }

        let direction = match key_event.code {
            KeyCode::Char('k') | KeyCode::Up => Direction::N,
            KeyCode::Char('j') | KeyCode::Down => Direction::S,
            KeyCode::Char('l') | KeyCode::Right => Direction::E,
            KeyCode::Char('h') | KeyCode::Left => Direction::W,
            KeyCode::Char('u') => Direction::NE,
            KeyCode::Char('y') => Direction::NW,
            KeyCode::Char('n') => Direction::SE,
            KeyCode::Char('b') => Direction::SW,
            KeyCode::Char(' ') | KeyCode::Char('.') => Direction::Center,
            KeyCode::Char('r') => return InputAction::RequestRestart,
            KeyCode::Char('q') | KeyCode::Esc => return InputAction::Quit,
            _ => return InputAction::NoAction,
        };

        InputAction::Tilt(self.tilt_toward(direction))
    }

    /// Sample sitting in the middle of `direction`'s zone
    pub fn tilt_toward(&self, direction: Direction) -> TiltSample {
        let (roll, pitch) = direction.unit_vector();
        TiltSample::new(roll * self.magnitude, pitch * self.magnitude)
    }
}

impl Default for KeyTiltMapper {
    fn default() -> Self {
        Self::new()
    }
}

/// Service responsible for producing `InputAction`s from terminal events.
pub struct InputService {
    mapper: KeyTiltMapper,
}

impl InputService {
    pub fn new() -> Self {
        Self {
            mapper: KeyTiltMapper::new(),
        }
    }

    /// Wait up to `timeout` for terminal events and translate everything pending.
    pub fn poll_actions(&mut self, timeout: Option<Duration>) -> Result<Vec<InputAction>> {
        let mut actions = Vec::new();
        let mut wait = timeout.unwrap_or(Duration::from_millis(DEFAULT_POLL_TIMEOUT_MS));

        while event::poll(wait).map_err(|e| TiltError::ui(format!("poll failed: {e}")))? {
            let event = event::read().map_err(|e| TiltError::ui(format!("read failed: {e}")))?;
            actions.extend(self.process_event(event));
            wait = Duration::ZERO;
        }

        Ok(actions)
    }

    pub fn process_event(&mut self, event: Event) -> Option<InputAction> {
        let action = match event {
            Event::Key(key_event) => self.mapper.handle_key_event(key_event),
            Event::Resize(width, height) => InputAction::Resize { width, height },
            _ => InputAction::NoAction,
        };

        match action {
            InputAction::NoAction => None,
            _ => Some(action),
        }
    }
}

impl Default for InputService {
    fn default() -> Self {
        Self::new()
    }
}

/// Spawn a blocking thread that polls for terminal events and forwards actions to the tick loop.
pub fn spawn_input_thread(
    tx: UnboundedSender<InputAction>,
    shutdown: Arc<AtomicBool>,
    poll_interval: Duration,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut service = InputService::new();
        while !shutdown.load(Ordering::SeqCst) {
            match service.poll_actions(Some(poll_interval)) {
                Ok(actions) => {
                    for action in actions {
                        if tx.send(action).is_err() {
                            return;
                        }
                    }
                }
                Err(err) => {
                    log::error!("Input thread error: {}", err);
                    break;
                }
            }
        }
    })
}
