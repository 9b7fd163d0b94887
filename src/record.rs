//! Structured log records
//!
//! A `Record` is one log event: time, level, message, call site and a list of
//! key/value attributes. Attribute values may nest as groups.

use crate::constants::RECORD_TIME_FORMAT;
use crate::level::Level;
use chrono::{DateTime, Local};
use std::fmt;
use std::panic::Location;
use std::time::Duration;

/// Attribute value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Int(i64),
    Uint(u64),
    Float(f64),
    Bool(bool),
    Duration(Duration),
    Time(DateTime<Local>),
    Level(Level),
    Group(Vec<Attr>),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            Self::Int(n) => write!(f, "{}", n),
            Self::Uint(n) => write!(f, "{}", n),
            Self::Float(n) => write!(f, "{}", n),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Duration(d) => write!(f, "{:?}", d),
            Self::Time(t) => write!(f, "{}", t.format(RECORD_TIME_FORMAT)),
            Self::Level(l) => write!(f, "{}", l),
            Self::Group(attrs) => {
                f.write_str("[")?;
                for (i, attr) in attrs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{}={}", attr.key, attr.value)?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Self::Uint(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<Duration> for Value {
    fn from(d: Duration) -> Self {
        Self::Duration(d)
    }
}

/// Key/value pair attached to a record or a logger
#[derive(Debug, Clone, PartialEq)]
pub struct Attr {
    pub key: String,
    pub value: Value,
}

impl Attr {
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn string(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(key, Value::Str(value.into()))
    }

    pub fn int(key: impl Into<String>, value: i64) -> Self {
        Self::new(key, Value::Int(value))
    }

    pub fn uint(key: impl Into<String>, value: u64) -> Self {
        Self::new(key, Value::Uint(value))
    }

    pub fn float(key: impl Into<String>, value: f64) -> Self {
        Self::new(key, Value::Float(value))
    }

    pub fn bool(key: impl Into<String>, value: bool) -> Self {
        Self::new(key, Value::Bool(value))
    }

    pub fn duration(key: impl Into<String>, value: Duration) -> Self {
        Self::new(key, Value::Duration(value))
    }

    pub fn time(key: impl Into<String>, value: DateTime<Local>) -> Self {
        Self::new(key, Value::Time(value))
    }

    /// Group of attributes; an empty key inlines the members when rendered
    ///
    /// Members may be `Attr` or `Option<Attr>`; `None` members are skipped.
    pub fn group<I>(key: impl Into<String>, attrs: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Option<Attr>>,
    {
        let members = attrs.into_iter().filter_map(Into::into).collect();
        Self::new(key, Value::Group(members))
    }

    /// `Some(attr)` when `include` is set, for optional fields in a group
    pub fn when(include: bool, attr: Attr) -> Option<Attr> {
        include.then_some(attr)
    }

    pub fn is_group(&self) -> bool {
        matches!(self.value, Value::Group(_))
    }
}

/// Call site of a logging statement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Source {
    pub file: &'static str,
    pub line: u32,
}

impl Source {
    /// Location of the caller (propagates through `#[track_caller]`)
    #[track_caller]
    pub fn caller() -> Self {
        let loc = Location::caller();
        Self {
            file: loc.file(),
            line: loc.line(),
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// One log event
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// `None` means the time is not rendered
    pub time: Option<DateTime<Local>>,
    pub level: Level,
    pub message: String,
    pub attrs: Vec<Attr>,
    pub source: Option<Source>,
}

impl Record {
    /// Record stamped with the current local time
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            time: Some(Local::now()),
            level,
            message: message.into(),
            attrs: Vec::new(),
            source: None,
        }
    }

    pub fn with_attrs(mut self, attrs: impl IntoIterator<Item = Attr>) -> Self {
        self.attrs.extend(attrs);
        self
    }

    pub fn with_source(mut self, source: Source) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_time(mut self, time: Option<DateTime<Local>>) -> Self {
        self.time = time;
        self
    }
}
