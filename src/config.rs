//! Runtime configuration.
//!
//! Every tunable of the controller lives here as an immutable value handed to
//! constructors; nothing is read from process-wide state. The defaults are the
//! tuning the head-tilt rig ships with. When built with the `config` feature
//! the values can be overridden from a TOML file.

use crate::controller::Mode;
use crate::error::{Result, TiltError};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[cfg(feature = "config")]
use serde::Deserialize;

/// Upper bound for every timing value; anything longer is a typo.
pub const MAX_TIMING_SECS: f64 = 3600.0;

/// Letters plus the control glyphs `_ < [ ] .`
pub const DEFAULT_ALPHABET: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ_<[].";

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "config", derive(Deserialize))]
#[cfg_attr(feature = "config", serde(default, deny_unknown_fields))]
pub struct Config {
    pub gesture: GestureConfig,
    pub timing: TimingConfig,
    pub alphabet: String,
    pub initial_mode: Mode,
    pub data: DataPaths,
    pub speech: SpeechConfig,
    pub captions: CaptionConfig,
    pub theme: ThemeName,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gesture: GestureConfig::default(),
            timing: TimingConfig::default(),
            alphabet: DEFAULT_ALPHABET.to_string(),
            initial_mode: Mode::Caption,
            data: DataPaths::default(),
            speech: SpeechConfig::default(),
            captions: CaptionConfig::default(),
            theme: ThemeName::default(),
        }
    }
}

/// Color scheme of the terminal scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "config", derive(Deserialize))]
#[cfg_attr(feature = "config", serde(rename_all = "snake_case"))]
pub enum ThemeName {
    #[default]
    Default,
    /// For terminals without color
    Monochrome,
    /// White on black with bright accents, for low vision
    HighContrast,
}

impl ThemeName {
    pub const NAMES: [&'static str; 3] = ["default", "monochrome", "high_contrast"];

    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "default" => Some(ThemeName::Default),
            "monochrome" => Some(ThemeName::Monochrome),
            "high_contrast" => Some(ThemeName::HighContrast),
            _ => None,
        }
    }
}

/// Geometry of the direction classifier.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "config", derive(Deserialize))]
#[cfg_attr(feature = "config", serde(default, deny_unknown_fields))]
pub struct GestureConfig {
    /// Tilt magnitude below which the head counts as centred
    pub deadzone_radius: f64,
    /// Angular gap carved out of each side of a sector boundary
    pub dead_band_deg: f64,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            deadzone_radius: 0.12,
            dead_band_deg: 10.0,
        }
    }
}

/// Dwell thresholds, cooldowns and the tick rate, all in seconds unless noted.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "config", derive(Deserialize))]
#[cfg_attr(feature = "config", serde(default, deny_unknown_fields))]
pub struct TimingConfig {
    pub center_dwell_secs: f64,
    pub diagonal_dwell_secs: f64,
    pub cardinal_cooldown_secs: f64,
    pub center_return_cooldown_secs: f64,
    pub flash_secs: f64,
    pub tick_interval_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            center_dwell_secs: 3.0,
            diagonal_dwell_secs: 2.0,
            cardinal_cooldown_secs: 0.5,
            center_return_cooldown_secs: 1.0,
            flash_secs: 0.3,
            tick_interval_ms: 16,
        }
    }
}

impl TimingConfig {
    pub fn cardinal_cooldown(&self) -> Duration {
        secs(self.cardinal_cooldown_secs)
    }

    pub fn center_return_cooldown(&self) -> Duration {
        secs(self.center_return_cooldown_secs)
    }

    pub fn flash(&self) -> Duration {
        secs(self.flash_secs)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    fn validate(&self) -> Result<()> {
        let positive = [
            ("center_dwell_secs", self.center_dwell_secs),
            ("diagonal_dwell_secs", self.diagonal_dwell_secs),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(TiltError::config(format!(
                    "timing.{name} must be a positive number of seconds, got {value}"
                )));
            }
            check_upper_bound("timing", name, value)?;
        }
        let non_negative = [
            ("cardinal_cooldown_secs", self.cardinal_cooldown_secs),
            ("center_return_cooldown_secs", self.center_return_cooldown_secs),
            ("flash_secs", self.flash_secs),
        ];
        for (name, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(TiltError::config(format!(
                    "timing.{name} must not be negative, got {value}"
                )));
            }
            check_upper_bound("timing", name, value)?;
        }
        Ok(())
    }
}

fn check_upper_bound(section: &str, name: &str, value: f64) -> Result<()> {
    if value > MAX_TIMING_SECS {
        return Err(TiltError::config(format!(
            "{section}.{name} must be at most {MAX_TIMING_SECS} seconds, got {value}"
        )));
    }
    Ok(())
}

/// Locations of the five ranked word tables, index 0 holding the unigrams.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "config", derive(Deserialize))]
#[cfg_attr(feature = "config", serde(default, deny_unknown_fields))]
pub struct DataPaths {
    pub unigrams: PathBuf,
    pub bigrams: PathBuf,
    pub trigrams: PathBuf,
    pub quadrigrams: PathBuf,
    pub pentagrams: PathBuf,
}

impl Default for DataPaths {
    fn default() -> Self {
        Self::in_dir("data")
    }
}

impl DataPaths {
    /// Standard file names (`1grams_english.csv` ... `5grams_english.csv`) under `dir`
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        let file = |order: usize| dir.join(format!("{order}grams_english.csv"));
        Self {
            unigrams: file(1),
            bigrams: file(2),
            trigrams: file(3),
            quadrigrams: file(4),
            pentagrams: file(5),
        }
    }

    /// Paths ordered by n-gram order, 1 through 5
    pub fn by_order(&self) -> [&Path; 5] {
        [
            &self.unigrams,
            &self.bigrams,
            &self.trigrams,
            &self.quadrigrams,
            &self.pentagrams,
        ]
    }
}

/// Speech output pipeline: a synthesizer reading text on stdin, optionally
/// piped into a player.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "config", derive(Deserialize))]
#[cfg_attr(feature = "config", serde(default, deny_unknown_fields))]
pub struct SpeechConfig {
    pub synth_command: Vec<String>,
    pub player_command: Option<Vec<String>>,
    pub synth_timeout_secs: f64,
    pub player_timeout_secs: f64,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            synth_command: vec![
                "piper".to_string(),
                "--model".to_string(),
                "en_US-lessac-medium.onnx".to_string(),
                "--output_raw".to_string(),
                "--length-scale".to_string(),
                "1.3".to_string(),
            ],
            player_command: Some(vec![
                "pacat".to_string(),
                "--raw".to_string(),
                "--rate=22050".to_string(),
                "--format=s16le".to_string(),
                "--channels=1".to_string(),
                "--latency-msec=500".to_string(),
            ]),
            synth_timeout_secs: 15.0,
            player_timeout_secs: 30.0,
        }
    }
}

impl SpeechConfig {
    pub fn synth_timeout(&self) -> Duration {
        secs(self.synth_timeout_secs)
    }

    pub fn player_timeout(&self) -> Duration {
        secs(self.player_timeout_secs)
    }
}

/// Optional speech recognizer whose stdout lines become transcript lines.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "config", derive(Deserialize))]
#[cfg_attr(feature = "config", serde(default, deny_unknown_fields))]
pub struct CaptionConfig {
    pub command: Option<Vec<String>>,
}

impl Config {
    /// Load configuration, falling back to defaults.
    ///
    /// An explicit `path` must exist and parse. Without one, the per-user file
    /// `<config_dir>/tiltwrite/config.toml` is used when present.
    #[cfg(feature = "config")]
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, required) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => match dirs::config_dir() {
                Some(dir) => (dir.join("tiltwrite").join("config.toml"), false),
                None => return Ok(Self::default()),
            },
        };

        if !required && !path.exists() {
            log::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(&path).map_err(|e| {
            TiltError::file_error(format!("Failed to read config: {}", path.display()), e)
        })?;
        let config = Self::from_toml(&text)?;
        log::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Without the `config` feature only the built-in defaults are available.
    #[cfg(not(feature = "config"))]
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Err(TiltError::config(format!(
                "cannot read {}: built without the `config` feature",
                path.display()
            ))),
            None => Ok(Self::default()),
        }
    }

    #[cfg(feature = "config")]
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| TiltError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the values the controller relies on being sane.
    pub fn validate(&self) -> Result<()> {
        if self.alphabet.is_empty() {
            return Err(TiltError::config("alphabet must not be empty"));
        }
        if !(self.gesture.deadzone_radius.is_finite() && self.gesture.deadzone_radius >= 0.0) {
            return Err(TiltError::config("gesture.deadzone_radius must not be negative"));
        }
        if !(0.0..22.5).contains(&self.gesture.dead_band_deg) {
            return Err(TiltError::config(
                "gesture.dead_band_deg must lie in [0, 22.5)",
            ));
        }
        if self.speech.synth_command.is_empty() {
            return Err(TiltError::config("speech.synth_command must name a program"));
        }
        for (name, value) in [
            ("synth_timeout_secs", self.speech.synth_timeout_secs),
            ("player_timeout_secs", self.speech.player_timeout_secs),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(TiltError::config(format!(
                    "speech.{name} must be a positive number of seconds, got {value}"
                )));
            }
            check_upper_bound("speech", name, value)?;
        }
        self.timing.validate()
    }
}

/// Seconds to a `Duration`, saturating at [`MAX_TIMING_SECS`]; NaN and
/// negative values become zero.
fn secs(value: f64) -> Duration {
    if value.is_nan() {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(value.min(MAX_TIMING_SECS)).unwrap_or(Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_device_constants() {
        let config = Config::default();
        assert_eq!(config.gesture.deadzone_radius, 0.12);
        assert_eq!(config.gesture.dead_band_deg, 10.0);
        assert_eq!(config.timing.center_dwell_secs, 3.0);
        assert_eq!(config.timing.diagonal_dwell_secs, 2.0);
        assert_eq!(config.timing.cardinal_cooldown(), Duration::from_millis(500));
        assert_eq!(config.timing.center_return_cooldown(), Duration::from_secs(1));
        assert_eq!(config.timing.flash(), Duration::from_millis(300));
        assert_eq!(config.initial_mode, Mode::Caption);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn data_paths_follow_order() {
        let paths = DataPaths::in_dir("/opt/words");
        let ordered = paths.by_order();
        assert_eq!(ordered[0], Path::new("/opt/words/1grams_english.csv"));
        assert_eq!(ordered[4], Path::new("/opt/words/5grams_english.csv"));
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut config = Config::default();
        config.alphabet.clear();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.gesture.dead_band_deg = 30.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.timing.diagonal_dwell_secs = 0.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.timing.flash_secs = -1.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.speech.player_timeout_secs = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn huge_timing_values_are_rejected_not_panicked_on() {
        let mut config = Config::default();
        config.timing.flash_secs = 1e20;
        match config.validate() {
            Err(TiltError::ConfigError { message }) => assert!(message.contains("flash_secs")),
            other => panic!("expected ConfigError, got {other:?}"),
        }

        let mut config = Config::default();
        config.speech.synth_timeout_secs = 1e300;
        assert!(config.validate().is_err());

        // Unvalidated values still convert without panicking
        assert_eq!(config.timing.flash(), Duration::from_millis(300));
        let timing = TimingConfig {
            flash_secs: 1e20,
            cardinal_cooldown_secs: f64::NAN,
            center_return_cooldown_secs: -2.0,
            ..TimingConfig::default()
        };
        assert_eq!(timing.flash(), Duration::from_secs(3600));
        assert_eq!(timing.cardinal_cooldown(), Duration::ZERO);
        assert_eq!(timing.center_return_cooldown(), Duration::ZERO);
    }

    #[test]
    fn theme_names_parse() {
        assert_eq!(Config::default().theme, ThemeName::Default);
        assert_eq!(ThemeName::parse("high-contrast"), Some(ThemeName::HighContrast));
        assert_eq!(ThemeName::parse("MONOCHROME"), Some(ThemeName::Monochrome));
        assert_eq!(ThemeName::parse("neon"), None);
        for name in ThemeName::NAMES {
            assert!(ThemeName::parse(name).is_some());
        }
    }

    #[test]
    fn zero_tick_interval_is_clamped() {
        let timing = TimingConfig {
            tick_interval_ms: 0,
            ..TimingConfig::default()
        };
        assert_eq!(timing.tick_interval(), Duration::from_millis(1));
    }

    #[cfg(not(feature = "config"))]
    #[test]
    fn explicit_path_requires_feature() {
        assert!(Config::load(None).is_ok());
        assert!(Config::load(Some(Path::new("tiltwrite.toml"))).is_err());
    }

    #[cfg(feature = "config")]
    #[test]
    fn toml_overrides_selected_fields() {
        let config = Config::from_toml(
            r#"
            alphabet = "ABC_."
            initial_mode = "write"

            [timing]
            center_dwell_secs = 2.5

            [captions]
            command = ["vosk-lines", "--model", "small"]
            "#,
        )
        .unwrap();

        assert_eq!(config.alphabet, "ABC_.");
        assert_eq!(config.initial_mode, Mode::Write);
        assert_eq!(config.timing.center_dwell_secs, 2.5);
        assert_eq!(config.timing.diagonal_dwell_secs, 2.0);
        assert_eq!(config.captions.command.as_ref().map(Vec::len), Some(3));
        assert_eq!(config.theme, ThemeName::Default);

        let config = Config::from_toml(r#"theme = "high_contrast""#).unwrap();
        assert_eq!(config.theme, ThemeName::HighContrast);
    }

    #[cfg(feature = "config")]
    #[test]
    fn toml_rejects_unknown_keys_and_bad_values() {
        assert!(Config::from_toml("colour = \"red\"").is_err());
        assert!(Config::from_toml("[timing]\ncenter_dwell_secs = -3.0").is_err());
    }

    #[cfg(feature = "config")]
    #[test]
    fn load_reads_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"[gesture]\ndeadzone_radius = 0.2\n").unwrap();
        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.gesture.deadzone_radius, 0.2);

        assert!(Config::load(Some(Path::new("/definitely/not/here.toml"))).is_err());
    }
}
