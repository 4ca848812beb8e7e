//! Headless renderer that reports state changes through the logger.
//!
//! Used when there is no terminal to draw on (a sensor-driven kiosk, a pipe,
//! or tests). Only changes are logged, so a 60 Hz tick loop stays quiet while
//! nothing happens.

use crate::controller::Mode;
use crate::error::Result;
use crate::render::ui::SceneRenderer;
use crate::render::RenderSnapshot;

/// Width of the text dwell bar
const BAR_WIDTH: usize = 10;

#[derive(Debug, Default)]
pub struct LogScene {
    last_line: Option<String>,
    lines_logged: usize,
}

impl LogScene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct lines reported so far
    pub fn lines_logged(&self) -> usize {
        self.lines_logged
    }
}

/// One-line textual summary of a snapshot.
///
/// The dwell bar is quantised so that small timer movements do not count
/// as a change.
pub fn describe(snapshot: &RenderSnapshot) -> String {
    let filled = (snapshot.dwell_percent.clamp(0.0, 1.0) * BAR_WIDTH as f64).floor() as usize;
    let bar = format!("{}{}", "#".repeat(filled), "-".repeat(BAR_WIDTH - filled));
    let flash = snapshot
        .flash
        .map(|flash| format!(" !{}", flash.label()))
        .unwrap_or_default();
    let shortcut = snapshot
        .shortcut_label()
        .map(|label| format!(" => {label}"))
        .unwrap_or_default();

    match snapshot.mode {
        Mode::Write => {
            let cursor = match (snapshot.sugg_index, snapshot.current_char()) {
                (0, Some(ch)) => format!("[{ch}]"),
                (0, None) => "[ ]".to_string(),
                (idx, _) => format!(
                    "<{}>",
                    snapshot
                        .suggestions
                        .get(idx - 1)
                        .map(String::as_str)
                        .unwrap_or("")
                ),
            };
            format!(
                "WRITE {:<6} {} {} \"{}\" {} {}{}{}",
                snapshot.direction,
                bar,
                cursor,
                snapshot.composed_text(),
                snapshot.ngram_level,
                snapshot.suggestions.join("/"),
                shortcut,
                flash
            )
        }
        Mode::Caption => {
            let latest = snapshot.visible_transcript(1).first().cloned().unwrap_or_default();
            format!(
                "CAPTION {:<6} {} lines={} scroll={}{} \"{}\"{}{}",
                snapshot.direction,
                bar,
                snapshot.transcript.len(),
                snapshot.transcript_scroll,
                if snapshot.paused { " paused" } else { "" },
                latest,
                shortcut,
                flash
            )
        }
    }
}

impl SceneRenderer for LogScene {
    fn render(&mut self, snapshot: &RenderSnapshot) -> Result<()> {
        let line = describe(snapshot);
        if self.last_line.as_deref() != Some(line.as_str()) {
            log::info!("{}", line);
            self.lines_logged += 1;
            self.last_line = Some(line);
        }
        Ok(())
    }

    fn initialize(&mut self) -> Result<()> {
        log::info!("Headless scene active");
        Ok(())
    }

    fn cleanup(&mut self) -> Result<()> {
        self.last_line = None;
        Ok(())
    }
}
