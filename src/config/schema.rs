//! TOML configuration schema types for mmterm.
//!
//! All structs derive `Deserialize` and `Serialize` with sensible defaults via
//! `#[serde(default)]`. Server fields are optional: anything missing is
//! collected interactively at startup.
//!
//! Duration fields use human-readable strings (e.g. `"30s"`, `"5m"`,
//! `"500ms"`) parsed by the `humantime` crate in [`TimingConfig::parse`].

use std::fmt;
use std::time::Duration;

use mm_client::{ConnectionData, TransportKind};
use serde::{Deserialize, Serialize};

use crate::config::error::ConfigError;
use crate::credentials::Credentials;

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root configuration encompassing all sections.
///
/// Corresponds to the full TOML file structure:
/// ```toml
/// [server]
/// [features]
/// [theme]
/// [timing]
/// [logging]
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Server address, login and team selection.
    pub server: ServerConfig,
    /// Optional client capabilities.
    pub features: FeaturesConfig,
    /// Colour theme selection.
    pub theme: ThemeConfig,
    /// Background worker intervals.
    pub timing: TimingConfig,
    /// Log output settings.
    pub logging: LoggingConfig,
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// Connection and login settings from the `[server]` section.
#[derive(Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Server hostname.
    pub host: Option<String>,
    /// Server port.
    pub port: Option<u16>,
    /// Login name or email.
    pub user: Option<String>,
    /// Account password. Takes precedence over `pass_cmd`.
    pub pass: Option<String>,
    /// Shell command whose first line of output is the password.
    pub pass_cmd: Option<String>,
    /// Path prefix when the server is not mounted at `/`.
    pub url_path: Option<String>,
    /// Use plain HTTP instead of HTTPS.
    pub unsafe_use_http: bool,
    /// Reject invalid TLS certificates.
    pub validate_server_certificate: bool,
    /// Name of the team to open on startup.
    pub team: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: None,
            user: None,
            pass: None,
            pass_cmd: None,
            url_path: None,
            unsafe_use_http: false,
            validate_server_certificate: true,
            team: None,
        }
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("pass", &self.pass.as_ref().map(|_| "<redacted>"))
            .field("pass_cmd", &self.pass_cmd)
            .field("url_path", &self.url_path)
            .field("unsafe_use_http", &self.unsafe_use_http)
            .field("validate_server_certificate", &self.validate_server_certificate)
            .field("team", &self.team)
            .finish()
    }
}

impl ServerConfig {
    /// Transport selected by `unsafe_use_http`.
    pub fn transport(&self) -> TransportKind {
        if self.unsafe_use_http {
            TransportKind::Insecure
        } else {
            TransportKind::Secure
        }
    }

    /// Connection data for a login attempt with the given credentials.
    pub fn connection_data(&self, credentials: &Credentials) -> ConnectionData {
        let mut data = ConnectionData::new(
            credentials.hostname.clone(),
            credentials.port,
            self.transport(),
        );
        data.url_path = self.url_path.clone();
        data.validate_certificate = self.validate_server_certificate;
        data
    }

    /// Records the credentials that actually worked.
    ///
    /// A later "save credentials" action persists these rather than
    /// whatever was in the file at startup.
    pub fn apply_credentials(&mut self, credentials: &Credentials) {
        self.host = Some(credentials.hostname.clone());
        self.port = Some(credentials.port);
        self.user = Some(credentials.username.clone());
        self.pass = Some(credentials.password.clone());
    }
}

// ---------------------------------------------------------------------------
// Features
// ---------------------------------------------------------------------------

/// Optional capabilities from the `[features]` section.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct FeaturesConfig {
    /// Show (and expire) "user is typing" indicators.
    pub show_typing_indicator: bool,
    /// Run an external aspell process for spell checking.
    pub enable_spell_check: bool,
    /// Aspell dictionary name, e.g. `en_US`. System default when unset.
    pub aspell_dictionary: Option<String>,
    /// Aspell executable. `aspell` from `PATH` when unset.
    pub aspell_command: Option<String>,
    /// Program used to open URLs. The URL is passed as its only argument.
    pub url_open_command: Option<String>,
}

// ---------------------------------------------------------------------------
// Theme
// ---------------------------------------------------------------------------

/// Colour theme settings from the `[theme]` section.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ThemeConfig {
    /// Built-in base theme name.
    pub name: String,
    /// Optional TOML file with attribute overrides. Tilde is expanded.
    pub customization_file: Option<String>,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            name: crate::theme::DEFAULT_THEME.to_string(),
            customization_file: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Timing
// ---------------------------------------------------------------------------

/// Worker intervals from the `[timing]` section, as human-readable strings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TimingConfig {
    /// How often tracked users' presence is refreshed.
    pub presence_interval: String,
    /// Age after which a typing indicator is considered stale.
    pub typing_expiry: String,
    /// How often stale typing indicators are cleared.
    pub typing_refresh: String,
    /// How often the local timezone is re-resolved.
    pub timezone_interval: String,
    /// Idle time after the last edit before a spell check runs.
    pub spell_check_delay: String,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            presence_interval: "30s".to_string(),
            typing_expiry: "3s".to_string(),
            typing_refresh: "1s".to_string(),
            timezone_interval: "5m".to_string(),
            spell_check_delay: "500ms".to_string(),
        }
    }
}

/// Parsed worker intervals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    /// See [`TimingConfig::presence_interval`].
    pub presence_interval: Duration,
    /// See [`TimingConfig::typing_expiry`].
    pub typing_expiry: Duration,
    /// See [`TimingConfig::typing_refresh`].
    pub typing_refresh: Duration,
    /// See [`TimingConfig::timezone_interval`].
    pub timezone_interval: Duration,
    /// See [`TimingConfig::spell_check_delay`].
    pub spell_check_delay: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            presence_interval: Duration::from_secs(30),
            typing_expiry: Duration::from_secs(3),
            typing_refresh: Duration::from_secs(1),
            timezone_interval: Duration::from_secs(300),
            spell_check_delay: Duration::from_millis(500),
        }
    }
}

impl TimingConfig {
    /// Parses every duration string.
    ///
    /// Returns `ConfigError::InvalidDuration` naming the first bad field.
    pub fn parse(&self) -> Result<Timings, ConfigError> {
        Ok(Timings {
            presence_interval: parse_duration("timing.presence_interval", &self.presence_interval)?,
            typing_expiry: parse_duration("timing.typing_expiry", &self.typing_expiry)?,
            typing_refresh: parse_duration("timing.typing_refresh", &self.typing_refresh)?,
            timezone_interval: parse_duration("timing.timezone_interval", &self.timezone_interval)?,
            spell_check_delay: parse_duration("timing.spell_check_delay", &self.spell_check_delay)?,
        })
    }
}

fn parse_duration(field: &'static str, value: &str) -> Result<Duration, ConfigError> {
    let duration = humantime::parse_duration(value).map_err(|e| ConfigError::InvalidDuration {
        field,
        value: value.to_string(),
        message: e.to_string(),
    })?;
    if duration.is_zero() {
        return Err(ConfigError::InvalidDuration {
            field,
            value: value.to_string(),
            message: "must be greater than zero".to_string(),
        });
    }
    Ok(duration)
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// Log output settings from the `[logging]` section.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Verbosity used when `MMTERM_LOG` is not set.
    pub level: LogLevel,
    /// Log file path. Logs go to stderr when unset.
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            file: None,
        }
    }
}

/// Log verbosity levels (kebab-case in TOML).
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum LogLevel {
    /// Only errors.
    Error,
    /// Errors and warnings.
    Warn,
    /// Informational messages (default).
    Info,
    /// Debug-level detail.
    Debug,
    /// Full trace output.
    Trace,
}

impl LogLevel {
    /// Filter directive understood by `tracing_subscriber::EnvFilter`.
    pub fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
