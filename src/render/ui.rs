//! Scene rendering components.
//!
//! This module hosts the ratatui terminal scene, the headless log scene and
//! the styling they share.

pub mod log_scene;
pub mod renderer;
pub mod terminal;
pub mod theme;

pub use log_scene::LogScene;
pub use renderer::SceneRenderer;
pub use terminal::{draw_scene, TerminalScene};
pub use theme::SceneTheme;

#[cfg(test)]
pub use renderer::tests::MockSceneRenderer;
