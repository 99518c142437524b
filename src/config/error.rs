//! Configuration error types for loading and parsing TOML config files.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when loading or parsing configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("Failed to read configuration file: {path}")]
    ReadError {
        /// Path to the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("Invalid configuration at {path}:{line}:{column}: {message}")]
    ParseError {
        /// Path to the file containing the error.
        path: PathBuf,
        /// One-based line index of the error (0 if unknown).
        line: usize,
        /// One-based column index of the error (0 if unknown).
        column: usize,
        /// Human-readable description of the parse failure.
        message: String,
    },

    /// An explicitly requested configuration file does not exist.
    #[error("Configuration file not found: {path}")]
    NotFound {
        /// Path that was requested but does not exist.
        path: PathBuf,
    },

    /// A configuration file already exists at the target path.
    #[error("Configuration file already exists: {path}")]
    AlreadyExists {
        /// Path where the file already exists.
        path: PathBuf,
    },

    /// Failed to write a configuration file to disk.
    #[error("Failed to write configuration file: {path}")]
    WriteError {
        /// Path to the file that could not be written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A duration field could not be parsed.
    #[error("Invalid duration for '{field}': '{value}' ({message})")]
    InvalidDuration {
        /// Dotted name of the offending field.
        field: &'static str,
        /// Raw value from the file.
        value: String,
        /// Parser explanation.
        message: String,
    },

    /// The configured password command failed or printed nothing.
    #[error("Password command '{command}' failed: {message}")]
    PasswordCommand {
        /// Command as written in the config file.
        command: String,
        /// What went wrong.
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_read_error() {
        let err = ConfigError::ReadError {
            path: PathBuf::from("/etc/mmterm/config.toml"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied"),
        };
        let msg = err.to_string();
        assert!(
            msg.contains("/etc/mmterm/config.toml"),
            "ReadError display should include the path"
        );
        assert!(
            std::error::Error::source(&err).is_some(),
            "ReadError should chain the I/O source"
        );
    }

    #[test]
    fn display_parse_error() {
        let err = ConfigError::ParseError {
            path: PathBuf::from("config.toml"),
            line: 5,
            column: 12,
            message: "expected `=`".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("5:12"), "ParseError should include line:column");
        assert!(
            msg.contains("expected `=`"),
            "ParseError should include the message"
        );
    }

    #[test]
    fn display_invalid_duration() {
        let err = ConfigError::InvalidDuration {
            field: "timing.presence_interval",
            value: "soon".to_string(),
            message: "unknown unit".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("timing.presence_interval"));
        assert!(msg.contains("soon"));
    }

    #[test]
    fn display_password_command_keeps_command_verbatim() {
        let err = ConfigError::PasswordCommand {
            command: "pass show chat/work".to_string(),
            message: "exit status 1".to_string(),
        };
        assert!(err.to_string().contains("pass show chat/work"));
    }
}
