//! # tiltwrite - Head-Tilt Dwell Controller
//!
//! Lets someone whose only reliable input is head tilt compose sentences and
//! read live captions. A (roll, pitch) stream is discretised into nine zones,
//! dwelling in a zone triggers editing actions, and a context-backoff n-gram
//! model offers word completions.
//!
//! ## Architecture
//!
//! - [`error`] - Centralized error types and handling
//! - [`config`] - Tunables and optional TOML loading
//! - [`input`] - Direction/dwell classification, sensor bridge, keyboard simulator
//! - [`predict`] - Ranked n-gram tables and the backoff prediction engine
//! - [`controller`] - The selection state machine and its editing primitives
//! - [`bridge`] - Speech output queue and caption transcript
//! - [`render`] - Render snapshot, terminal and headless scenes
//! - [`app`] - Fixed-rate tick loop wiring everything together

// Core modules
pub mod config;
pub mod error;

// The controller core
pub mod controller;
pub mod input;
pub mod predict;

// Collaborators and presentation
pub mod app;
pub mod bridge;
pub mod render;

// Re-export commonly used types for convenience
pub use error::{Result, TiltError};

// Public API surface for external usage
pub use app::{Application, Collaborators, TiltSource};
pub use config::Config;
pub use controller::{Flash, Mode, SelectionStateMachine};
pub use input::{Direction, DirectionClassifier};
pub use predict::{PredictiveEngine, Suggestions};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
