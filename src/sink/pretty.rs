//! Colorized console sink
//!
//! Each record is encoded by an embedded `JsonSink` into a scratch buffer,
//! decoded back into a sorted field map and re-emitted as one line:
//!
//! ```text
//! [15:04:05.000] INFO: message {"key":"value"}
//! ```
//!
//! The scratch buffer and its lock are shared by every sink derived through
//! `with_attrs`/`with_group`, so encoding is serialized per sink family.

use super::{Destination, JsonSink};
use crate::constants::{LEVEL_KEY, MESSAGE_KEY, PRETTY_TIME_FORMAT, TIME_KEY};
use crate::error::{LogError, Result};
use crate::handler::{Handler, HandlerOptions, ReplaceAttr};
use crate::level::Level;
use crate::record::{Attr, Record, Value};
use bytes::{BufMut, BytesMut};
use crossterm::style::{Color, Stylize};
use parking_lot::Mutex;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::sync::Arc;

pub struct PrettySink {
    destination: Destination,
    /// Caller's options; the rewrite hook re-derives the built-in segments
    options: HandlerOptions,
    inner: JsonSink,
    scratch: Arc<Mutex<BytesMut>>,
}

impl PrettySink {
    pub fn new(destination: Destination, options: HandlerOptions) -> Self {
        let inner_options = HandlerOptions {
            level: options.level,
            add_source: options.add_source,
            replace_attr: Some(suppress_defaults(options.replace_attr.clone())),
        };
        Self {
            inner: JsonSink::new(destination.clone(), inner_options),
            destination,
            options,
            scratch: Arc::new(Mutex::new(BytesMut::with_capacity(1024))),
        }
    }

    fn derived(&self, inner: JsonSink) -> Self {
        Self {
            destination: self.destination.clone(),
            options: self.options.clone(),
            inner,
            scratch: self.scratch.clone(),
        }
    }

    /// Encode through the embedded JSON sink and decode the remaining fields
    fn compute_attrs(&self, record: &Record) -> Result<BTreeMap<String, JsonValue>> {
        let mut scratch = self.scratch.lock();
        decode_scratch(&mut scratch, |buf| self.inner.encode_into(record, buf.writer()))
    }

    fn segment(&self, key: &str, value: Value) -> Option<String> {
        self.options
            .replace(&[], Attr::new(key, value))
            .map(|attr| attr.value.to_string())
            .filter(|s| !s.is_empty())
    }

    /// Render one record as a newline-terminated line
    pub fn format(&self, record: &Record) -> Result<String> {
        let timestamp = record
            .time
            .and_then(|t| self.segment(TIME_KEY, Value::Str(t.format(PRETTY_TIME_FORMAT).to_string())))
            .map(|s| s.with(Color::Grey).to_string());
        let level = self
            .segment(LEVEL_KEY, Value::Level(record.level))
            .map(|s| format!("{}:", s).with(level_color(record.level)).to_string());
        let message = self
            .segment(MESSAGE_KEY, Value::Str(record.message.clone()))
            .map(|s| s.with(Color::White).to_string());

        let attrs = self.compute_attrs(record)?;
        let fields = if attrs.is_empty() {
            None
        } else {
            let json = serde_json::to_string(&attrs).map_err(|source| LogError::Encode {
                format: "json",
                source,
            })?;
            Some(json.with(Color::DarkGrey).to_string())
        };

        let mut line = [timestamp, level, message, fields]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        line.push('\n');
        Ok(line)
    }
}

/// Run `encode` into `scratch` and decode the bytes as a field map. The
/// buffer is empty on return, whether encoding or decoding failed or not.
fn decode_scratch<F>(scratch: &mut BytesMut, encode: F) -> Result<BTreeMap<String, JsonValue>>
where
    F: FnOnce(&mut BytesMut) -> Result<()>,
{
    let fields = encode(&mut *scratch).and_then(|()| {
        serde_json::from_slice(&scratch[..]).map_err(|source| LogError::Decode {
            format: "json",
            source,
        })
    });
    scratch.clear();
    fields
}

/// Color band for a level token
pub fn level_color(level: Level) -> Color {
    if level <= Level::DEBUG {
        Color::Grey
    } else if level <= Level::INFO {
        Color::Cyan
    } else if level < Level::WARN {
        Color::Blue
    } else if level < Level::ERROR {
        Color::Yellow
    } else if level <= Level::ERROR.offset(1) {
        Color::Red
    } else {
        Color::Magenta
    }
}

/// Drop the top-level `time`, `level` and `msg` keys before `next` runs;
/// the console line renders those itself.
fn suppress_defaults(next: Option<ReplaceAttr>) -> ReplaceAttr {
    Arc::new(move |groups: &[String], attr: Attr| {
        if groups.is_empty()
            && (attr.key == TIME_KEY || attr.key == LEVEL_KEY || attr.key == MESSAGE_KEY)
        {
            return None;
        }
        match &next {
            Some(next) => next(groups, attr),
            None => Some(attr),
        }
    })
}

impl Handler for PrettySink {
    fn enabled(&self, level: Level) -> bool {
        self.inner.options().admits(level)
    }

    fn handle(&self, record: &Record) -> Result<()> {
        let line = self.format(record)?;
        self.destination.write_line(line.as_bytes())
    }

    fn with_attrs(&self, attrs: Vec<Attr>) -> Arc<dyn Handler> {
        Arc::new(self.derived(self.inner.derive_attrs(attrs)))
    }

    fn with_group(&self, name: &str) -> Arc<dyn Handler> {
        Arc::new(self.derived(self.inner.derive_group(name)))
    }
}
