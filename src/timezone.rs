//! Local timezone resolution.

use std::fmt;
use std::path::Path;

use chrono::{Local, Offset};

/// Link whose target names the system zone on Unix.
const LOCALTIME_LINK: &str = "/etc/localtime";

/// A resolved local timezone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeZone {
    /// IANA name when known (`Europe/Berlin`), otherwise the numeric offset.
    pub name: String,
    /// Seconds east of UTC at resolution time.
    pub utc_offset_seconds: i32,
}

impl fmt::Display for TimeZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, format_offset(self.utc_offset_seconds))
    }
}

/// Something that can report the current local timezone.
pub trait TimezoneSource: Send + Sync {
    /// Resolves the timezone now.
    fn current(&self) -> TimeZone;
}

/// Reads the zone from `TZ`, then `/etc/localtime`, with the offset from
/// the system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTimezone;

impl TimezoneSource for SystemTimezone {
    fn current(&self) -> TimeZone {
        let offset = Local::now().offset().fix().local_minus_utc();
        let name = std::env::var("TZ")
            .ok()
            .map(|tz| tz.trim_start_matches(':').to_string())
            .filter(|tz| !tz.is_empty())
            .or_else(|| zone_from_link(Path::new(LOCALTIME_LINK)))
            .unwrap_or_else(|| format_offset(offset));
        TimeZone {
            name,
            utc_offset_seconds: offset,
        }
    }
}

/// Extracts `Area/City` from a `.../zoneinfo/Area/City` symlink target.
fn zone_from_link(link: &Path) -> Option<String> {
    let target = std::fs::read_link(link).ok()?;
    let target = target.to_string_lossy();
    let (_, zone) = target.split_once("zoneinfo/")?;
    (!zone.is_empty()).then(|| zone.to_string())
}

/// Formats an offset as `UTC+HH:MM`.
pub fn format_offset(seconds: i32) -> String {
    let sign = if seconds < 0 { '-' } else { '+' };
    let minutes = seconds.unsigned_abs() / 60;
    format!("UTC{sign}{:02}:{:02}", minutes / 60, minutes % 60)
}
