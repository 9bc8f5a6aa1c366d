/*
 * Severity levels and the level filter
 *
 * This module defines:
 * - The Severity enum (Debug < Info < Warning < Error) used for filtering and display
 * - The `accepts` comparison the sink applies at write time
 * - Case-insensitive parsing from text and from configuration files
 * - Rendering of raw numeric levels that may fall outside the enum
 */

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

/// Log severity levels, ordered from least to most important
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
#[repr(u8)]
pub enum Severity {
    Debug = 0,
    Info = 1,
    Warning = 2,
    Error = 3,
}

/// Names accepted by the parser, used in error messages and help text
pub const SEVERITY_NAMES: [&str; 4] = ["DEBUG", "INFO", "WARNING", "ERROR"];

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Debug,
        Severity::Info,
        Severity::Warning,
        Severity::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
        }
    }

    /// Renders a raw numeric level. Values outside the enum come back as
    /// `UNKNOWN(<n>)` instead of failing.
    pub fn render_raw(raw: u8) -> Cow<'static, str> {
        match Severity::try_from(raw) {
            Ok(level) => Cow::Borrowed(level.as_str()),
            Err(_) => Cow::Owned(format!("UNKNOWN({})", raw)),
        }
    }
}

/// True iff an entry of `entry` severity passes a sink whose threshold is `threshold`.
#[inline]
pub fn accepts(entry: Severity, threshold: Severity) -> bool {
    entry >= threshold
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when text does not name a severity level
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid log level '{0}' (expected one of DEBUG, INFO, WARNING, ERROR)")]
pub struct ParseSeverityError(pub String);

impl FromStr for Severity {
    type Err = ParseSeverityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(Severity::Debug),
            "info" => Ok(Severity::Info),
            "warn" | "warning" => Ok(Severity::Warning),
            "error" => Ok(Severity::Error),
            _ => Err(ParseSeverityError(s.to_string())),
        }
    }
}

impl TryFrom<u8> for Severity {
    type Error = u8;

    fn try_from(raw: u8) -> Result<Self, u8> {
        match raw {
            0 => Ok(Severity::Debug),
            1 => Ok(Severity::Info),
            2 => Ok(Severity::Warning),
            3 => Ok(Severity::Error),
            other => Err(other),
        }
    }
}

// Separate implementation of Deserialize to handle case-insensitive values
impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse::<Severity>().map_err(|_| {
            serde::de::Error::unknown_variant(&s, &["debug", "info", "warn", "warning", "error"])
        })
    }
}
