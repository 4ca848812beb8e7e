//! Gesture-driven editing controller.
//!
//! [`SelectionStateMachine`] owns every piece of mutable state: the mode,
//! the sentence being written, cooldowns and the per-episode action lock.

pub mod edit;
pub mod machine;

pub use edit::{Alphabet, EditBuffer, Glyph};
pub use machine::{Flash, Mode, SelectionStateMachine};
