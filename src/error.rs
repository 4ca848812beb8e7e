//! Error types and handling infrastructure for tiltwrite.
//!
//! Errors only surface at the edges of the system: loading ranked word tables,
//! opening the sensor stream, spawning speech or caption processes, driving the
//! terminal. The per-tick controller path never produces an error.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for tiltwrite operations.
#[derive(Error, Debug)]
pub enum TiltError {
    /// File system related errors (file not found, permission denied, etc.)
    #[error("File operation failed: {message}")]
    FileError {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// A ranked word table contained something we could not interpret
    #[error("Malformed data in {} at line {}: {}", .path.display(), .line, .message)]
    DataFormat {
        path: PathBuf,
        line: usize,
        message: String,
    },

    /// Tilt sensor stream errors
    #[error("Sensor error: {message}")]
    SensorError { message: String },

    /// Speech synthesis or playback errors
    #[error("Speech error: {message}")]
    SpeechError { message: String },

    /// Caption feed errors
    #[error("Caption error: {message}")]
    CaptionError { message: String },

    /// UI and terminal related errors
    #[error("UI operation failed: {message}")]
    UIError { message: String },

    /// Configuration related errors
    #[error("Configuration error: {message}")]
    ConfigError { message: String },
}

/// Standard Result type for tiltwrite operations.
pub type Result<T> = std::result::Result<T, TiltError>;

impl TiltError {
    /// Create a FileError from an io::Error with additional context
    pub fn file_error(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::FileError {
            message: message.into(),
            source,
        }
    }

    /// Create a DataFormat error pointing at a specific line of a table file
    pub fn data_format(path: impl Into<PathBuf>, line: usize, message: impl Into<String>) -> Self {
        Self::DataFormat {
            path: path.into(),
            line,
            message: message.into(),
        }
    }

    pub fn sensor(message: impl Into<String>) -> Self {
        Self::SensorError {
            message: message.into(),
        }
    }

    pub fn speech(message: impl Into<String>) -> Self {
        Self::SpeechError {
            message: message.into(),
        }
    }

    pub fn caption(message: impl Into<String>) -> Self {
        Self::CaptionError {
            message: message.into(),
        }
    }

    /// Create a UIError with a descriptive message
    pub fn ui(message: impl Into<String>) -> Self {
        Self::UIError {
            message: message.into(),
        }
    }

    /// Create a ConfigError with a descriptive message
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }
}

// Automatic conversion from io::Error to TiltError
impl From<std::io::Error> for TiltError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::FileError {
                message: "File not found".to_string(),
                source: err,
            },
            std::io::ErrorKind::PermissionDenied => Self::FileError {
                message: "Permission denied".to_string(),
                source: err,
            },
            _ => Self::FileError {
                message: "IO operation failed".to_string(),
                source: err,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        let malformed = TiltError::data_format("/data/2grams.csv", 7, "missing ngram column");
        assert_eq!(
            malformed.to_string(),
            "Malformed data in /data/2grams.csv at line 7: missing ngram column"
        );

        let sensor = TiltError::sensor("device unplugged");
        assert_eq!(sensor.to_string(), "Sensor error: device unplugged");

        let config = TiltError::config("unknown key `foo`");
        assert_eq!(config.to_string(), "Configuration error: unknown key `foo`");
    }

    #[test]
    fn test_error_constructors() {
        assert!(matches!(
            TiltError::speech("piper missing"),
            TiltError::SpeechError { .. }
        ));
        assert!(matches!(
            TiltError::caption("recognizer exited"),
            TiltError::CaptionError { .. }
        ));
        assert!(matches!(TiltError::ui("no tty"), TiltError::UIError { .. }));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let err: TiltError = io_err.into();

        match err {
            TiltError::FileError { message, .. } => {
                assert_eq!(message, "File not found");
            }
            _ => panic!("Expected FileError variant"),
        }
    }
}
