//! Rendering subsystem.
//!
//! The controller publishes a [`RenderSnapshot`] every tick; renderers only
//! ever read it.

pub mod snapshot;
pub mod ui;

pub use snapshot::RenderSnapshot;
pub use ui::{LogScene, SceneRenderer, SceneTheme, TerminalScene};
