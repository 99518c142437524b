//! Configuration file loader with position-aware error reporting.
//!
//! Loads TOML configuration from a specific path or the default XDG location.
//! When the default location has no file, returns `Config::default()`.

use std::fs;
use std::path::Path;
use std::process::Command;

use crate::config::error::ConfigError;
use crate::config::schema::Config;
use crate::config::xdg;

/// Stateless configuration loader.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load from `path` when given, otherwise from the default location.
    pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Self::load_default(),
        }
    }

    /// Load configuration from a specific path.
    ///
    /// Returns `ConfigError::NotFound` if the file does not exist, or
    /// `ConfigError::ReadError` for other I/O failures.
    pub fn load_from_path(path: &Path) -> Result<Config, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound {
                    path: path.to_path_buf(),
                }
            } else {
                ConfigError::ReadError {
                    path: path.to_path_buf(),
                    source: e,
                }
            }
        })?;
        Self::parse_toml(&content, path)
    }

    /// Load configuration from the default XDG location.
    ///
    /// If no file exists at the default path, returns `Config::default()`
    /// instead of an error.
    pub fn load_default() -> Result<Config, ConfigError> {
        let path = xdg::config_path();
        if path.exists() {
            Self::load_from_path(&path)
        } else {
            tracing::debug!("No config file at {:?}, using defaults", path);
            Ok(Config::default())
        }
    }

    /// Fills `server.pass` from `server.pass_cmd` when no password is set.
    ///
    /// The command runs through `sh -c`; the first line of its stdout,
    /// without the trailing newline, becomes the password.
    pub fn resolve_password_command(config: &mut Config) -> Result<(), ConfigError> {
        if config.server.pass.is_some() {
            return Ok(());
        }
        let Some(command) = config.server.pass_cmd.clone() else {
            return Ok(());
        };

        let output = Command::new("sh")
            .arg("-c")
            .arg(&command)
            .output()
            .map_err(|e| ConfigError::PasswordCommand {
                command: command.clone(),
                message: e.to_string(),
            })?;
        if !output.status.success() {
            return Err(ConfigError::PasswordCommand {
                command,
                message: format!("exited with {}", output.status),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        match stdout.lines().next().filter(|line| !line.is_empty()) {
            Some(line) => {
                config.server.pass = Some(line.to_string());
                Ok(())
            }
            None => Err(ConfigError::PasswordCommand {
                command,
                message: "produced no output".to_string(),
            }),
        }
    }

    /// Parse a TOML string into `Config` with position-aware error reporting.
    fn parse_toml(content: &str, path: &Path) -> Result<Config, ConfigError> {
        toml::from_str(content).map_err(|e| {
            let (line, column) = e
                .span()
                .map(|span| {
                    let line = content[..span.start].matches('\n').count() + 1;
                    let last_newline = content[..span.start]
                        .rfind('\n')
                        .map(|p| p + 1)
                        .unwrap_or(0);
                    let column = span.start - last_newline + 1;
                    (line, column)
                })
                .unwrap_or((0, 0));
            ConfigError::ParseError {
                path: path.to_path_buf(),
                line,
                column,
                message: e.message().to_string(),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::path::PathBuf;

    /// Run a closure with `XDG_CONFIG_HOME` temporarily set, then restore.
    fn with_xdg_config<F: FnOnce()>(value: &str, f: F) {
        let original = std::env::var("XDG_CONFIG_HOME").ok();
        std::env::set_var("XDG_CONFIG_HOME", value);
        f();
        match original {
            Some(v) => std::env::set_var("XDG_CONFIG_HOME", v),
            None => std::env::remove_var("XDG_CONFIG_HOME"),
        }
    }

    fn config_with_pass_cmd(command: &str) -> Config {
        let mut config = Config::default();
        config.server.pass_cmd = Some(command.to_string());
        config
    }

    // -----------------------------------------------------------------------
    // parse_toml
    // -----------------------------------------------------------------------

    #[test]
    fn parse_partial_config_fills_defaults() {
        let toml_str = r#"
[server]
host = "chat.example.com"
"#;
        let path = PathBuf::from("partial.toml");
        let config =
            ConfigLoader::parse_toml(toml_str, &path).expect("partial config should parse");
        assert_eq!(config.server.host.as_deref(), Some("chat.example.com"));
        assert!(config.server.user.is_none());
        assert_eq!(config.timing.presence_interval, "30s");
    }

    #[test]
    fn parse_invalid_toml_returns_parse_error_with_position() {
        let toml_str = "[server]\nport = \"not a number\"\n";
        let path = PathBuf::from("bad.toml");
        let err = ConfigLoader::parse_toml(toml_str, &path).expect_err("should fail");
        match err {
            ConfigError::ParseError {
                path: p,
                line,
                column,
                message,
            } => {
                assert_eq!(p, path);
                assert_eq!(line, 2, "error should point at the port line");
                assert!(column > 0, "column should be > 0 for known span");
                assert!(!message.is_empty(), "message should not be empty");
            }
            other => panic!("expected ParseError, got: {other:?}"),
        }
    }

    // -----------------------------------------------------------------------
    // load_from_path / load_default
    // -----------------------------------------------------------------------

    #[test]
    fn load_from_path_valid_file() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let file = dir.path().join("config.toml");
        fs::write(&file, "[server]\nuser = \"alice\"\n").expect("failed to write temp file");
        let config = ConfigLoader::load(Some(&file)).expect("should load");
        assert_eq!(config.server.user.as_deref(), Some("alice"));
    }

    #[test]
    fn load_from_path_missing_file_returns_not_found() {
        let path = PathBuf::from("/tmp/nonexistent_mmterm_test_config.toml");
        let err = ConfigLoader::load_from_path(&path).expect_err("should fail");
        match err {
            ConfigError::NotFound { path: p } => assert_eq!(p, path),
            other => panic!("expected NotFound, got: {other:?}"),
        }
    }

    #[test]
    fn load_from_path_directory_returns_read_error() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let err = ConfigLoader::load_from_path(dir.path()).expect_err("should fail");
        assert!(matches!(err, ConfigError::ReadError { .. }), "got {err:?}");
    }

    #[test]
    #[serial]
    fn load_default_with_no_file_returns_defaults() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        with_xdg_config(dir.path().to_str().expect("non-utf8 path"), || {
            let config = ConfigLoader::load(None).expect("should return defaults");
            assert_eq!(config, Config::default());
        });
    }

    #[test]
    #[serial]
    fn load_default_with_existing_file_parses_it() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let config_dir = dir.path().join("mmterm");
        fs::create_dir_all(&config_dir).expect("failed to create config dir");
        fs::write(config_dir.join("config.toml"), "[server]\nteam = \"eng\"\n")
            .expect("failed to write config");
        with_xdg_config(dir.path().to_str().expect("non-utf8 path"), || {
            let config = ConfigLoader::load_default().expect("should load");
            assert_eq!(config.server.team.as_deref(), Some("eng"));
        });
    }

    // -----------------------------------------------------------------------
    // resolve_password_command
    // -----------------------------------------------------------------------

    #[test]
    fn password_command_fills_missing_password() {
        let mut config = config_with_pass_cmd("printf 'from-cmd\\nsecond-line\\n'");
        ConfigLoader::resolve_password_command(&mut config).expect("command should run");
        assert_eq!(config.server.pass.as_deref(), Some("from-cmd"));
    }

    #[test]
    fn explicit_password_wins_over_command() {
        let mut config = config_with_pass_cmd("exit 1");
        config.server.pass = Some("explicit".to_string());
        ConfigLoader::resolve_password_command(&mut config).expect("command should not run");
        assert_eq!(config.server.pass.as_deref(), Some("explicit"));
    }

    #[test]
    fn failing_password_command_is_an_error() {
        let mut config = config_with_pass_cmd("exit 3");
        let err = ConfigLoader::resolve_password_command(&mut config).expect_err("should fail");
        assert!(matches!(err, ConfigError::PasswordCommand { .. }), "got {err:?}");
        assert!(config.server.pass.is_none());
    }

    #[test]
    fn silent_password_command_is_an_error() {
        let mut config = config_with_pass_cmd("true");
        let err = ConfigLoader::resolve_password_command(&mut config).expect_err("should fail");
        assert!(err.to_string().contains("no output"));
    }

    #[test]
    fn no_password_and_no_command_is_left_absent() {
        let mut config = Config::default();
        ConfigLoader::resolve_password_command(&mut config).expect("nothing to do");
        assert!(config.server.pass.is_none());
    }
}
