//! Color theme and styling definitions using ratatui colors
//!
//! The scene is meant to be read from a distance by someone who cannot move
//! much more than their head, so every theme keeps the highlighted elements
//! well apart from ordinary text.

use crate::config::ThemeName;
use ratatui::style::{Color, Modifier, Style};

/// Color theme for the scene
#[derive(Debug, Clone)]
pub struct SceneTheme {
    /// Normal text color (None uses terminal default)
    pub normal_text: Option<Color>,

    /// Character or suggestion the selector rests on
    pub highlight: Style,

    /// Word under construction
    pub prefix: Style,

    /// Filled portion of the dwell gauge
    pub gauge: Color,

    /// Diagonal-fired / message-sent banner
    pub flash: Style,

    /// Status line background
    pub status_bg: Color,

    /// Status line text
    pub status_fg: Color,

    /// Paused caption indicator
    pub paused_text: Color,

    /// Pane borders
    pub border: Color,
}

impl Default for SceneTheme {
    fn default() -> Self {
        Self {
            normal_text: None,
            highlight: Style::default()
                .fg(Color::Black)
                .bg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
            prefix: Style::default().fg(Color::LightCyan).add_modifier(Modifier::BOLD),
            gauge: Color::Green,
            flash: Style::default().fg(Color::Black).bg(Color::LightMagenta),
            status_bg: Color::Blue,
            status_fg: Color::White,
            paused_text: Color::Red,
            border: Color::DarkGray,
        }
    }
}

impl SceneTheme {
    pub fn named(name: ThemeName) -> Self {
        match name {
            ThemeName::Default => Self::default(),
            ThemeName::Monochrome => Self::monochrome(),
            ThemeName::HighContrast => Self::high_contrast(),
        }
    }

    /// Theme for terminals without color support
    pub fn monochrome() -> Self {
        Self {
            normal_text: None,
            highlight: Style::default().add_modifier(Modifier::REVERSED | Modifier::BOLD),
            prefix: Style::default().add_modifier(Modifier::UNDERLINED),
            gauge: Color::White,
            flash: Style::default().add_modifier(Modifier::REVERSED),
            status_bg: Color::Black,
            status_fg: Color::White,
            paused_text: Color::White,
            border: Color::White,
        }
    }

    /// High-contrast theme for low-vision users
    pub fn high_contrast() -> Self {
        Self {
            normal_text: Some(Color::White),
            highlight: Style::default()
                .fg(Color::Black)
                .bg(Color::LightYellow)
                .add_modifier(Modifier::BOLD),
            prefix: Style::default().fg(Color::LightYellow).add_modifier(Modifier::BOLD),
            gauge: Color::LightGreen,
            flash: Style::default().fg(Color::Black).bg(Color::White),
            status_bg: Color::White,
            status_fg: Color::Black,
            paused_text: Color::LightRed,
            border: Color::White,
        }
    }

    /// Base style for ordinary text
    pub fn text(&self) -> Style {
        match self.normal_text {
            Some(color) => Style::default().fg(color),
            None => Style::default(),
        }
    }

    pub fn status(&self) -> Style {
        Style::default().bg(self.status_bg).fg(self.status_fg)
    }
}
