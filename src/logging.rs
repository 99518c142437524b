//! Logging initialization.
//!
//! Configures the `tracing` subscriber with level filtering via the
//! `MMTERM_LOG` environment variable. Falls back to the configured level
//! when the variable is unset or invalid.
//!
//! # Usage
//!
//! ```bash
//! # Configured level, written to the log file if one is set
//! mmterm
//!
//! # Debug level
//! MMTERM_LOG=debug mmterm --log-file /tmp/mmterm.log
//!
//! # Module-specific filtering
//! MMTERM_LOG=mmterm::workers=debug,warn mmterm
//! ```

use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::{fmt, EnvFilter};

use crate::config::schema::LogLevel;

/// Environment variable holding filter directives.
pub const LOG_ENV_VAR: &str = "MMTERM_LOG";

/// Builds the filter from [`LOG_ENV_VAR`], or `default_level`.
pub fn filter(default_level: LogLevel) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV_VAR)
        .unwrap_or_else(|_| EnvFilter::new(default_level.as_directive()))
}

/// Initialize the tracing subscriber.
///
/// Logs are appended to `file` when given, otherwise written to stderr.
///
/// # Errors
///
/// Returns an error if the log file cannot be opened.
///
/// # Panics
///
/// Panics if a global subscriber has already been set (should only be
/// called once, at startup).
pub fn init(default_level: LogLevel, file: Option<&Path>) -> std::io::Result<()> {
    let builder = fmt().with_env_filter(filter(default_level)).with_target(false);
    match file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        None => builder.with_writer(std::io::stderr).init(),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn env_filter_parses_valid_directives() {
        let directives = ["info", "debug", "warn", "error", "trace"];
        for d in directives {
            let filter = EnvFilter::try_new(d);
            assert!(filter.is_ok(), "failed to parse directive: {}", d);
        }
    }

    #[test]
    fn env_filter_parses_module_directive() {
        let filter = EnvFilter::try_new("mmterm::workers=debug,warn");
        assert!(filter.is_ok());
    }

    #[test]
    #[serial]
    fn configured_level_used_without_env_var() {
        std::env::remove_var(LOG_ENV_VAR);
        assert_eq!(filter(LogLevel::Debug).to_string(), "debug");
    }

    #[test]
    #[serial]
    fn env_var_overrides_configured_level() {
        std::env::set_var(LOG_ENV_VAR, "trace");
        let rendered = filter(LogLevel::Error).to_string();
        std::env::remove_var(LOG_ENV_VAR);
        assert_eq!(rendered, "trace");
    }
}
