//! Verbosity levels
//!
//! `Level` is an ordered integer with four named points. Any other value is
//! a valid out-of-band severity and displays relative to the named level
//! at or below it (`ERROR+247`, `DEBUG-2`).

use std::fmt;

/// Verbosity level. Higher is more severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Level(pub i32);

impl Level {
    pub const DEBUG: Level = Level(-4);
    pub const INFO: Level = Level(0);
    pub const WARN: Level = Level(4);
    pub const ERROR: Level = Level(8);

    /// Look up a level by its case-insensitive name or abbreviation
    pub fn from_name(name: &str) -> Option<Level> {
        match name.to_ascii_lowercase().as_str() {
            "debug" | "debg" | "d" => Some(Level::DEBUG),
            "info" | "inf" | "i" => Some(Level::INFO),
            "warn" | "wrn" | "w" => Some(Level::WARN),
            "error" | "erro" | "err" | "e" => Some(Level::ERROR),
            _ => None,
        }
    }

    /// Level shifted by `delta`, saturating at the integer bounds
    pub fn offset(self, delta: i32) -> Level {
        Level(self.0.saturating_add(delta))
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (base, anchor) = if *self < Level::INFO {
            ("DEBUG", Level::DEBUG)
        } else if *self < Level::WARN {
            ("INFO", Level::INFO)
        } else if *self < Level::ERROR {
            ("WARN", Level::WARN)
        } else {
            ("ERROR", Level::ERROR)
        };

        let delta = i64::from(self.0) - i64::from(anchor.0);
        if delta == 0 {
            f.write_str(base)
        } else {
            write!(f, "{}{:+}", base, delta)
        }
    }
}

/// A level as supplied by an operator: typed, numeric or textual.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LevelValue {
    Named(Level),
    /// Used verbatim as the level ordinal
    Numeric(i64),
    /// Case-insensitive name or abbreviation
    Text(String),
}

impl LevelValue {
    /// Resolve to a level, `None` if the value is not recognized
    pub fn parse(&self) -> Option<Level> {
        match self {
            Self::Named(level) => Some(*level),
            Self::Numeric(n) => i32::try_from(*n).ok().map(Level),
            Self::Text(s) => Level::from_name(s),
        }
    }
}

impl From<Level> for LevelValue {
    fn from(level: Level) -> Self {
        Self::Named(level)
    }
}

impl From<i32> for LevelValue {
    fn from(n: i32) -> Self {
        Self::Numeric(i64::from(n))
    }
}

impl From<i64> for LevelValue {
    fn from(n: i64) -> Self {
        Self::Numeric(n)
    }
}

impl From<&str> for LevelValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for LevelValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

/// ERROR for a failed result, INFO otherwise
pub fn error_level<T, E>(result: &std::result::Result<T, E>) -> Level {
    match result {
        Ok(_) => Level::INFO,
        Err(_) => Level::ERROR,
    }
}
