//! Platform-aware path resolution for mmterm.
//!
//! On **Linux**, follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/mmterm` or `~/.config/mmterm`
//! - Cache (history, last-run state, subprocess logs): `$XDG_CACHE_HOME/mmterm` or `~/.cache/mmterm`
//!
//! On **macOS**, uses Apple conventions with XDG env var overrides:
//! - Config: `$XDG_CONFIG_HOME/mmterm` or `~/Library/Application Support/mmterm`
//! - Cache: `$XDG_CACHE_HOME/mmterm` or `~/Library/Caches/mmterm`

use std::fs;
use std::path::{Path, PathBuf};

const APP_NAME: &str = "mmterm";

/// Returns the configuration directory for mmterm.
///
/// Resolution order:
/// 1. `$XDG_CONFIG_HOME/mmterm` (if env var set, any platform)
/// 2. Platform default:
///    - Linux: `~/.config/mmterm`
///    - macOS: `~/Library/Application Support/mmterm`
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join(APP_NAME);
    }
    platform_config_dir().join(APP_NAME)
}

/// Platform-native config base directory (without XDG override).
fn platform_config_dir() -> PathBuf {
    #[cfg(target_os = "macos")]
    {
        dirs::config_dir().unwrap_or_else(|| home_dir().join("Library/Application Support"))
    }
    #[cfg(not(target_os = "macos"))]
    {
        home_dir().join(".config")
    }
}

/// Returns the path to the main configuration file.
///
/// Resolves to `config_dir()/config.toml`.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// Returns the cache directory for persisted client state.
///
/// Resolution order:
/// 1. `$XDG_CACHE_HOME/mmterm` (if set, any platform)
/// 2. Platform default via `dirs::cache_dir()`, falling back to `~/.cache`
pub fn cache_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CACHE_HOME") {
        return PathBuf::from(xdg).join(APP_NAME);
    }
    dirs::cache_dir()
        .unwrap_or_else(|| home_dir().join(".cache"))
        .join(APP_NAME)
}

/// Home directory, or the current directory when it cannot be determined.
fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

/// Expands a leading `~` in a path string to the user's home directory.
///
/// If the path does not start with `~`, it is returned as-is.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        home_dir().join(rest)
    } else if path == "~" {
        home_dir()
    } else {
        PathBuf::from(path)
    }
}

/// Creates a directory and all parent directories with mode 0700.
///
/// Equivalent to `mkdir -p` with restricted permissions.
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    fs::create_dir_all(path)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o700))?;
    }
    Ok(())
}
