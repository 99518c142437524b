//! Colour themes and user customization files.
//!
//! A theme maps attribute names (`"channel.header"`, `"error"`, ...) to a
//! foreground colour, background colour and text styles. Two themes are
//! built in; a customization file can override individual attributes:
//!
//! ```toml
//! [attrs]
//! "channel.header" = { fg = "yellow", style = ["bold"] }
//! "error" = { fg = "white", bg = "dark_red" }
//! ```
//!
//! Colour names are those accepted by `crossterm` (`red`, `dark_red`,
//! `grey`, ...) plus `default` for the terminal's own colour.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crossterm::style::{Attribute, Color};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

/// Theme used when none is configured or the configured one is unknown.
pub const DEFAULT_THEME: &str = "builtin:dark";

/// Name of the light built-in theme.
pub const LIGHT_THEME: &str = "builtin:light";

/// Every attribute a theme defines.
pub const ATTRIBUTE_NAMES: &[&str] = &[
    "default",
    "channel.header",
    "channel.list.selected",
    "channel.list.unread",
    "message.time",
    "message.author",
    "message.mention",
    "typing.indicator",
    "status.online",
    "status.away",
    "status.dnd",
    "status.offline",
    "url",
    "misspelled",
    "error",
    "help.emphasis",
];

/// Errors from loading a theme customization file.
#[derive(Error, Debug)]
pub enum ThemeError {
    /// The file could not be read.
    #[error("Failed to read theme customization {path}: {source}")]
    Read {
        /// Customization file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML for this format.
    #[error("Invalid theme customization {path}: {message}")]
    Parse {
        /// Customization file.
        path: PathBuf,
        /// Parser explanation.
        message: String,
    },

    /// The file names an attribute no theme defines.
    #[error("Unknown theme attribute '{attr}'")]
    UnknownAttribute {
        /// Offending attribute name.
        attr: String,
    },

    /// A colour value is not recognised.
    #[error("Unknown colour '{value}' for attribute '{attr}'")]
    UnknownColor {
        /// Attribute being customized.
        attr: String,
        /// Offending colour name.
        value: String,
    },

    /// A style value is not recognised.
    #[error("Unknown style '{value}' for attribute '{attr}'")]
    UnknownStyle {
        /// Attribute being customized.
        attr: String,
        /// Offending style name.
        value: String,
    },
}

/// Presentation of one attribute. `None` colours use the terminal default.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AttrStyle {
    /// Foreground colour.
    pub fg: Option<Color>,
    /// Background colour.
    pub bg: Option<Color>,
    /// Text styles.
    pub style: Vec<Attribute>,
}

impl AttrStyle {
    fn fg(color: Color) -> Self {
        Self {
            fg: Some(color),
            ..Self::default()
        }
    }

    fn with_bg(mut self, color: Color) -> Self {
        self.bg = Some(color);
        self
    }

    fn with(mut self, attribute: Attribute) -> Self {
        self.style.push(attribute);
        self
    }
}

/// A named set of attribute styles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Theme {
    /// Theme name, e.g. [`DEFAULT_THEME`].
    pub name: String,
    attrs: BTreeMap<String, AttrStyle>,
}

impl Theme {
    /// Style for `attr`, or the `default` attribute's style.
    pub fn style(&self, attr: &str) -> AttrStyle {
        self.attrs
            .get(attr)
            .or_else(|| self.attrs.get("default"))
            .cloned()
            .unwrap_or_default()
    }

    fn from_pairs(name: &str, pairs: Vec<(&str, AttrStyle)>) -> Self {
        Self {
            name: name.to_string(),
            attrs: pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        }
    }
}

/// Looks up a built-in theme by name.
pub fn builtin(name: &str) -> Option<Theme> {
    match name {
        DEFAULT_THEME => Some(dark()),
        LIGHT_THEME => Some(light()),
        _ => None,
    }
}

/// Resolves the configured theme name, falling back to [`DEFAULT_THEME`].
pub fn resolve_base(name: &str) -> Theme {
    builtin(name).unwrap_or_else(|| {
        warn!(theme = name, "unknown theme, using {DEFAULT_THEME}");
        dark()
    })
}

fn dark() -> Theme {
    Theme::from_pairs(
        DEFAULT_THEME,
        vec![
            ("default", AttrStyle::default()),
            ("channel.header", AttrStyle::fg(Color::White).with(Attribute::Bold)),
            ("channel.list.selected", AttrStyle::fg(Color::Black).with_bg(Color::Yellow)),
            ("channel.list.unread", AttrStyle::fg(Color::White).with(Attribute::Bold)),
            ("message.time", AttrStyle::fg(Color::DarkGrey)),
            ("message.author", AttrStyle::fg(Color::Cyan)),
            ("message.mention", AttrStyle::fg(Color::Yellow).with(Attribute::Bold)),
            ("typing.indicator", AttrStyle::fg(Color::Green)),
            ("status.online", AttrStyle::fg(Color::Green)),
            ("status.away", AttrStyle::fg(Color::Yellow)),
            ("status.dnd", AttrStyle::fg(Color::Red)),
            ("status.offline", AttrStyle::fg(Color::DarkGrey)),
            ("url", AttrStyle::fg(Color::Blue).with(Attribute::Underlined)),
            ("misspelled", AttrStyle::fg(Color::Red).with(Attribute::Underlined)),
            ("error", AttrStyle::fg(Color::Red)),
            ("help.emphasis", AttrStyle::fg(Color::White).with(Attribute::Bold)),
        ],
    )
}

fn light() -> Theme {
    Theme::from_pairs(
        LIGHT_THEME,
        vec![
            ("default", AttrStyle::default()),
            ("channel.header", AttrStyle::fg(Color::Black).with(Attribute::Bold)),
            ("channel.list.selected", AttrStyle::fg(Color::White).with_bg(Color::DarkBlue)),
            ("channel.list.unread", AttrStyle::fg(Color::Black).with(Attribute::Bold)),
            ("message.time", AttrStyle::fg(Color::Grey)),
            ("message.author", AttrStyle::fg(Color::DarkBlue)),
            ("message.mention", AttrStyle::fg(Color::DarkMagenta).with(Attribute::Bold)),
            ("typing.indicator", AttrStyle::fg(Color::DarkGreen)),
            ("status.online", AttrStyle::fg(Color::DarkGreen)),
            ("status.away", AttrStyle::fg(Color::DarkYellow)),
            ("status.dnd", AttrStyle::fg(Color::DarkRed)),
            ("status.offline", AttrStyle::fg(Color::Grey)),
            ("url", AttrStyle::fg(Color::DarkBlue).with(Attribute::Underlined)),
            ("misspelled", AttrStyle::fg(Color::DarkRed).with(Attribute::Underlined)),
            ("error", AttrStyle::fg(Color::DarkRed)),
            ("help.emphasis", AttrStyle::fg(Color::Black).with(Attribute::Bold)),
        ],
    )
}

// ---------------------------------------------------------------------------
// Customization
// ---------------------------------------------------------------------------

/// Applies a customization file on top of a base theme.
pub trait ThemeLoader {
    /// Reads `path` and returns `base` with its overrides applied.
    fn load(&self, path: &Path, base: Theme) -> Result<Theme, ThemeError>;
}

/// Loads customization files from disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileThemeLoader;

impl ThemeLoader for FileThemeLoader {
    fn load(&self, path: &Path, base: Theme) -> Result<Theme, ThemeError> {
        let content = fs::read_to_string(path).map_err(|source| ThemeError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let theme = apply_customization(&content, path, base)?;
        debug!(path = %path.display(), "applied theme customization");
        Ok(theme)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct Customization {
    #[serde(default)]
    attrs: BTreeMap<String, AttrOverride>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct AttrOverride {
    fg: Option<String>,
    bg: Option<String>,
    style: Option<Vec<String>>,
}

/// Parses customization TOML and applies it to `base`.
pub fn apply_customization(content: &str, path: &Path, base: Theme) -> Result<Theme, ThemeError> {
    let customization: Customization =
        toml::from_str(content).map_err(|e| ThemeError::Parse {
            path: path.to_path_buf(),
            message: e.message().to_string(),
        })?;

    let mut theme = base;
    for (attr, over) in customization.attrs {
        if !ATTRIBUTE_NAMES.contains(&attr.as_str()) {
            return Err(ThemeError::UnknownAttribute { attr });
        }
        let mut style = theme.style(&attr);
        if let Some(fg) = &over.fg {
            style.fg = parse_color(&attr, fg)?;
        }
        if let Some(bg) = &over.bg {
            style.bg = parse_color(&attr, bg)?;
        }
        if let Some(names) = &over.style {
            style.style = names
                .iter()
                .map(|name| parse_style(&attr, name))
                .collect::<Result<_, _>>()?;
        }
        theme.attrs.insert(attr, style);
    }
    Ok(theme)
}

fn parse_color(attr: &str, value: &str) -> Result<Option<Color>, ThemeError> {
    if value.eq_ignore_ascii_case("default") {
        return Ok(None);
    }
    Color::try_from(value)
        .map(Some)
        .map_err(|()| ThemeError::UnknownColor {
            attr: attr.to_string(),
            value: value.to_string(),
        })
}

fn parse_style(attr: &str, value: &str) -> Result<Attribute, ThemeError> {
    match value.to_ascii_lowercase().as_str() {
        "bold" => Ok(Attribute::Bold),
        "dim" => Ok(Attribute::Dim),
        "italic" => Ok(Attribute::Italic),
        "underline" => Ok(Attribute::Underlined),
        "blink" => Ok(Attribute::SlowBlink),
        "reverse" => Ok(Attribute::Reverse),
        "strikethrough" => Ok(Attribute::CrossedOut),
        _ => Err(ThemeError::UnknownStyle {
            attr: attr.to_string(),
            value: value.to_string(),
        }),
    }
}
