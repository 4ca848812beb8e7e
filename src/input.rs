//! Input subsystem.
//!
//! Turns whatever moves the user's head into discrete directions: sensor
//! samples or simulated keyboard tilts come in, [`Direction`]s and dwell
//! durations go out.

pub mod direction;
pub mod raw;
pub mod service;

// Public re-exports for convenience. Modules outside this crate should prefer importing
// from `crate::input` rather than reaching into submodules.
pub use direction::{snap_direction, Direction, DirectionClassifier};
pub use raw::{
    parse_sample_line, sample_channel, spawn_sensor_thread, LatestSample, SensorSource,
    TiltSample,
};
pub use service::{spawn_input_thread, InputAction, InputService, KeyTiltMapper};
