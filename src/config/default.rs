//! Default configuration template and file creation utilities.
//!
//! Provides a well-commented TOML template that matches `Config::default()`
//! and functions to write it to the XDG config path.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::error::ConfigError;
use crate::config::xdg;

// ---------------------------------------------------------------------------
// Default TOML template
// ---------------------------------------------------------------------------

/// A well-commented TOML template with all default values.
///
/// Every value here must match `Config::default()` from `schema.rs`.
/// Sections: `[server]`, `[features]`, `[theme]`, `[timing]`, `[logging]`.
pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"# mmterm configuration
#
# This file was auto-generated with default values.
# Uncomment and modify options to customize the client.
#
# Location: $XDG_CONFIG_HOME/mmterm/config.toml

# ==============================================================================
# Server
# ==============================================================================

[server]

# Any of host, port, user and pass that are left unset are asked for
# interactively when mmterm starts.
# host = "chat.example.com"
# port = 443
# user = "alice"

# Password. Prefer pass_cmd so the secret does not live in this file.
# pass = ""

# Shell command whose first line of output is the password.
# Only used when `pass` is not set.
# pass_cmd = "pass show chat/work"

# Path prefix when the server is not mounted at the root of the host.
# url_path = "/mattermost"

# Talk plain HTTP instead of HTTPS. Only for servers without TLS.
unsafe_use_http = false

# Reject servers presenting invalid TLS certificates.
validate_server_certificate = true

# Team to open on startup (matched against the team's name or display name).
# When unset or not found, you are asked to pick one.
# team = "Engineering"

# ==============================================================================
# Features
# ==============================================================================

[features]

# Show and expire "user is typing" indicators.
show_typing_indicator = false

# Spell-check the message editor with an external aspell process.
enable_spell_check = false

# Aspell dictionary to use. The system default is used when unset.
# aspell_dictionary = "en_US"

# Aspell executable. "aspell" from PATH is used when unset.
# aspell_command = "/usr/bin/aspell"

# Program used to open URLs; it receives the URL as its only argument.
# url_open_command = "xdg-open"

# ==============================================================================
# Theme
# ==============================================================================

[theme]

# Built-in base theme.
# Options: "builtin:dark", "builtin:light"
name = "builtin:dark"

# TOML file overriding individual attributes of the base theme.
# A file that cannot be read or parsed stops mmterm at startup.
# customization_file = "~/.config/mmterm/theme.toml"

# ==============================================================================
# Timing
# ==============================================================================

[timing]

# How often presence of visible users is refreshed.
presence_interval = "30s"

# Age after which a "user is typing" indicator disappears.
typing_expiry = "3s"

# How often stale typing indicators are cleared.
typing_refresh = "1s"

# How often the local timezone is re-checked.
timezone_interval = "5m"

# Idle time after the last edit before the spell checker runs.
spell_check_delay = "500ms"

# ==============================================================================
# Logging
# ==============================================================================

[logging]

# Verbosity when MMTERM_LOG is not set.
# Options: "error", "warn", "info", "debug", "trace"
level = "info"

# Log file. Logs go to stderr when unset.
# file = "~/.cache/mmterm/mmterm.log"
"#;

// ---------------------------------------------------------------------------
// File creation functions
// ---------------------------------------------------------------------------

/// Creates (or force-overwrites) the default config file at `path`, or at
/// the XDG config path when `path` is `None`.
///
/// - If the file exists and `force` is `false`, returns `ConfigError::AlreadyExists`.
/// - If the file exists and `force` is `true`, backs it up to `.toml.backup` first.
/// - Returns the path where the config was written.
pub fn create_default_config(path: Option<&Path>, force: bool) -> Result<PathBuf, ConfigError> {
    let path = path.map_or_else(xdg::config_path, Path::to_path_buf);

    if path.exists() {
        if !force {
            return Err(ConfigError::AlreadyExists { path: path.clone() });
        }
        let backup_path = path.with_extension("toml.backup");
        fs::rename(&path, &backup_path).map_err(|e| ConfigError::WriteError {
            path: backup_path.clone(),
            source: e,
        })?;
        tracing::info!("Backed up existing config to {}", backup_path.display());
    }

    write_default_config(&path)?;
    Ok(path)
}

/// Writes the default template to `path`, creating parent dirs and setting 0600 permissions.
fn write_default_config(path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty() && !p.exists()) {
        xdg::ensure_dir(parent).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            source: e,
        })?;
    }

    fs::write(path, DEFAULT_CONFIG_TEMPLATE).map_err(|e| ConfigError::WriteError {
        path: path.to_path_buf(),
        source: e,
    })?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(|e| {
            ConfigError::WriteError {
                path: path.to_path_buf(),
                source: e,
            }
        })?;
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
