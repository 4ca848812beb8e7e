//! Direction and dwell classification.
//!
//! Discretises a continuous (roll, pitch) tilt into one of nine zones and
//! tracks how long the current zone has been held. Two hysteresis devices keep
//! the output stable: a central deadzone and a dead band carved out of both
//! sides of every sector boundary. Samples landing in either resolve to
//! [`Direction::Center`].

use crate::config::GestureConfig;
use std::fmt;
use std::time::{Duration, Instant};

/// Angular half-width of an undivided 45 degree sector.
const SECTOR_HALF_WIDTH_DEG: f64 = 22.5;

/// One of the nine discrete tilt zones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Center,
    N,
    NE,
    E,
    SE,
    S,
    SW,
    W,
    NW,
}

/// Sector centres counter-clockwise from East.
const SECTORS: [(f64, Direction); 8] = [
    (0.0, Direction::E),
    (45.0, Direction::NE),
    (90.0, Direction::N),
    (135.0, Direction::NW),
    (180.0, Direction::W),
    (225.0, Direction::SW),
    (270.0, Direction::S),
    (315.0, Direction::SE),
];

impl Direction {
    pub const CARDINALS: [Direction; 4] = [Direction::N, Direction::S, Direction::E, Direction::W];
    pub const DIAGONALS: [Direction; 4] =
        [Direction::NE, Direction::NW, Direction::SE, Direction::SW];

    pub fn is_cardinal(self) -> bool {
        matches!(self, Direction::N | Direction::S | Direction::E | Direction::W)
    }

    pub fn is_diagonal(self) -> bool {
        matches!(
            self,
            Direction::NE | Direction::NW | Direction::SE | Direction::SW
        )
    }

    /// Angle of the sector centre in degrees, `None` for the centre zone
    pub fn center_angle_deg(self) -> Option<f64> {
        SECTORS
            .iter()
            .find(|(_, direction)| *direction == self)
            .map(|(angle, _)| *angle)
    }

    /// Unit (roll, pitch) pointing at the middle of this zone.
    ///
    /// Roll is mirrored: East sits at negative roll.
    pub fn unit_vector(self) -> (f64, f64) {
        match self.center_angle_deg() {
            Some(angle) => {
                let rad = angle.to_radians();
                (-rad.cos(), rad.sin())
            }
            None => (0.0, 0.0),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Direction::Center => "CENTER",
            Direction::N => "N",
            Direction::NE => "NE",
            Direction::E => "E",
            Direction::SE => "SE",
            Direction::S => "S",
            Direction::SW => "SW",
            Direction::W => "W",
            Direction::NW => "NW",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

/// Pure zone lookup for a single sample.
///
/// Non-finite input never matches a sector and therefore yields `Center`.
pub fn snap_direction(roll: f64, pitch: f64, gesture: &GestureConfig) -> Direction {
    let magnitude = (roll * roll + pitch * pitch).sqrt();
    if magnitude < gesture.deadzone_radius {
        return Direction::Center;
    }

    // pitch is up (north), mirrored roll is east
    let angle_deg = pitch.atan2(-roll).to_degrees().rem_euclid(360.0);
    let max_distance = SECTOR_HALF_WIDTH_DEG - gesture.dead_band_deg;

    SECTORS
        .iter()
        .find(|(center, _)| angular_distance(angle_deg, *center) <= max_distance)
        .map(|(_, direction)| *direction)
        .unwrap_or(Direction::Center)
}

/// Shortest distance between two angles, in [0, 180]
fn angular_distance(a_deg: f64, b_deg: f64) -> f64 {
    (((a_deg - b_deg) + 180.0).rem_euclid(360.0) - 180.0).abs()
}

/// Classifier holding the dwell timer for the current zone.
#[derive(Debug, Clone)]
pub struct DirectionClassifier {
    gesture: GestureConfig,
    current: Direction,
    dwell_start: Option<Instant>,
    dwell: Duration,
}

impl DirectionClassifier {
    pub fn new(gesture: GestureConfig) -> Self {
        Self {
            gesture,
            current: Direction::Center,
            dwell_start: None,
            dwell: Duration::ZERO,
        }
    }

    /// Classify a sample and update the dwell timer.
    ///
    /// Dwell is zero on the tick the direction changes and grows while it is
    /// held. The timer starts on the first sample ever seen.
    pub fn classify(&mut self, roll: f64, pitch: f64, now: Instant) -> (Direction, Duration) {
        let direction = snap_direction(roll, pitch, &self.gesture);

        match self.dwell_start {
            Some(start) if direction == self.current => {
                self.dwell = now.saturating_duration_since(start);
            }
            _ => {
                self.current = direction;
                self.dwell_start = Some(now);
                self.dwell = Duration::ZERO;
            }
        }

        (self.current, self.dwell)
    }

    /// Restart the dwell timer without a direction change
    pub fn reset_dwell(&mut self, now: Instant) {
        self.dwell_start = Some(now);
        self.dwell = Duration::ZERO;
    }

    pub fn direction(&self) -> Direction {
        self.current
    }

    pub fn dwell(&self) -> Duration {
        self.dwell
    }

    pub fn dwell_secs(&self) -> f64 {
        self.dwell.as_secs_f64()
    }
}

impl Default for DirectionClassifier {
    fn default() -> Self {
        Self::new(GestureConfig::default())
    }
}
