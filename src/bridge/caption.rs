//! Live caption transcript.
//!
//! A recognizer process writes one line of text per utterance to stdout.
//! Lines starting with `~` are partial hypotheses that replace the pending
//! partial; every other non-blank line is final and is appended to the
//! transcript in upper case. While paused, incoming text is discarded.

use crate::error::{Result, TiltError};
use parking_lot::RwLock;
use std::io::{BufRead, BufReader};
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

/// Prefix marking a partial recognition result.
const PARTIAL_MARKER: char = '~';

#[derive(Debug, Default)]
struct TranscriptState {
    lines: Vec<String>,
    partial: String,
    paused: bool,
}

/// Shared, append-only (until cleared) list of recognised lines.
///
/// Cloning is cheap and every clone sees the same transcript.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    state: Arc<RwLock<TranscriptState>>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let transcript = Self::new();
        for line in lines {
            transcript.push_line(line.as_ref());
        }
        transcript
    }

    /// Append a final line. Returns false if it was blank or the feed is paused.
    pub fn push_line(&self, text: &str) -> bool {
        let text = text.trim();
        let mut state = self.state.write();
        if state.paused || text.is_empty() {
            return false;
        }
        state.lines.push(text.to_uppercase());
        state.partial.clear();
        true
    }

    pub fn set_partial(&self, text: &str) {
        let mut state = self.state.write();
        if !state.paused {
            state.partial = text.trim().to_uppercase();
        }
    }

    pub fn partial(&self) -> String {
        self.state.read().partial.clone()
    }

    pub fn lines(&self) -> Vec<String> {
        self.state.read().lines.clone()
    }

    pub fn len(&self) -> usize {
        self.state.read().lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().lines.is_empty()
    }

    /// Last word of the most recent line
    pub fn last_word(&self) -> Option<String> {
        let state = self.state.read();
        state
            .lines
            .last()
            .and_then(|line| line.split_whitespace().last())
            .map(str::to_string)
    }

    /// Flip the paused flag and return the new value
    pub fn toggle_pause(&self) -> bool {
        let mut state = self.state.write();
        state.paused = !state.paused;
        if state.paused {
            state.partial.clear();
        }
        log::info!("Captions {}", if state.paused { "paused" } else { "resumed" });
        state.paused
    }

    pub fn is_paused(&self) -> bool {
        self.state.read().paused
    }

    pub fn clear(&self) {
        let mut state = self.state.write();
        state.lines.clear();
        state.partial.clear();
    }

    /// Route one line of recognizer output.
    pub fn ingest(&self, raw: &str) {
        match raw.trim().strip_prefix(PARTIAL_MARKER) {
            Some(partial) => self.set_partial(partial),
            None => {
                self.push_line(raw);
            }
        }
    }
}

/// Running recognizer process feeding a [`Transcript`]. Killed on drop.
pub struct CaptionFeed {
    child: Child,
    reader: Option<thread::JoinHandle<()>>,
}

impl CaptionFeed {
    pub fn is_running(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }
}

impl Drop for CaptionFeed {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
        if let Some(reader) = self.reader.take() {
            let _ = reader.join();
        }
    }
}

/// Start `command` and append its stdout lines to `transcript`.
pub fn spawn_caption_feed(
    command: &[String],
    transcript: Transcript,
    shutdown: Arc<AtomicBool>,
) -> Result<CaptionFeed> {
    let (program, args) = command
        .split_first()
        .ok_or_else(|| TiltError::caption("empty caption command"))?;

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| TiltError::caption(format!("failed to start {program}: {e}")))?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| TiltError::caption("recognizer has no stdout"))?;

    log::info!("Caption feed started: {}", program);
    let reader = thread::spawn(move || {
        for line in BufReader::new(stdout).lines() {
            if shutdown.load(Ordering::Relaxed) {
                break;
            }
            match line {
                Ok(line) => transcript.ingest(&line),
                Err(err) => {
                    log::warn!("Caption feed read error: {}", err);
                    break;
                }
            }
        }
        log::debug!("Caption feed reader exiting");
    });

    Ok(CaptionFeed {
        child,
        reader: Some(reader),
    })
}
