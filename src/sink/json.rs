//! JSON sink: one object per line
//!
//! Keys appear in the order `time`, `level`, `source`, `msg`, then the
//! attributes. Groups become nested objects, durations integer nanoseconds.

use super::Destination;
use crate::constants::{LEVEL_KEY, MESSAGE_KEY, SOURCE_KEY, TIME_KEY};
use crate::error::{LogError, Result};
use crate::handler::{Handler, HandlerOptions, HandlerState};
use crate::level::Level;
use crate::record::{Attr, Record, Value};
use serde_json::{Map, Number, Value as JsonValue};
use std::io::Write;
use std::sync::Arc;

pub struct JsonSink {
    destination: Destination,
    state: HandlerState,
}

impl JsonSink {
    pub fn new(destination: Destination, options: HandlerOptions) -> Self {
        Self {
            destination,
            state: HandlerState::new(options),
        }
    }

    fn derived(&self, state: HandlerState) -> Self {
        Self {
            destination: self.destination.clone(),
            state,
        }
    }

    pub(crate) fn derive_attrs(&self, attrs: Vec<Attr>) -> Self {
        self.derived(self.state.with_attrs(attrs))
    }

    pub(crate) fn derive_group(&self, name: &str) -> Self {
        self.derived(self.state.with_group(name))
    }

    pub(crate) fn options(&self) -> &HandlerOptions {
        &self.state.options
    }

    /// Serialize `record` as one newline-terminated JSON object into `writer`
    pub fn encode_into<W: Write>(&self, record: &Record, mut writer: W) -> Result<()> {
        let object = self.to_object(record);
        serde_json::to_writer(&mut writer, &object).map_err(|source| LogError::Encode {
            format: "json",
            source,
        })?;
        writer.write_all(b"\n")?;
        Ok(())
    }

    fn to_object(&self, record: &Record) -> Map<String, JsonValue> {
        let mut object = Map::new();

        if let Some(time) = record.time {
            if let Some(attr) = self.state.builtin(TIME_KEY, Value::Time(time)) {
                insert_attr(&mut object, attr);
            }
        }
        if let Some(attr) = self.state.builtin(LEVEL_KEY, Value::Level(record.level)) {
            insert_attr(&mut object, attr);
        }
        if self.state.options.add_source {
            if let Some(source) = record.source {
                if let Some(attr) = self.state.builtin(SOURCE_KEY, Value::Str(source.to_string())) {
                    insert_attr(&mut object, attr);
                }
            }
        }
        if let Some(attr) = self.state.builtin(MESSAGE_KEY, Value::Str(record.message.clone())) {
            insert_attr(&mut object, attr);
        }
        for attr in self.state.resolve(&record.attrs) {
            insert_attr(&mut object, attr);
        }

        object
    }
}

fn insert_attr(object: &mut Map<String, JsonValue>, attr: Attr) {
    object.insert(attr.key, to_json(attr.value));
}

fn to_json(value: Value) -> JsonValue {
    match value {
        Value::Str(s) => JsonValue::String(s),
        Value::Int(n) => JsonValue::from(n),
        Value::Uint(n) => JsonValue::from(n),
        Value::Float(n) => Number::from_f64(n)
            .map(JsonValue::Number)
            .unwrap_or_else(|| JsonValue::String(n.to_string())),
        Value::Bool(b) => JsonValue::Bool(b),
        Value::Duration(d) => JsonValue::from(u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)),
        value @ (Value::Time(_) | Value::Level(_)) => JsonValue::String(value.to_string()),
        Value::Group(members) => {
            let mut object = Map::new();
            for member in members {
                insert_attr(&mut object, member);
            }
            JsonValue::Object(object)
        }
    }
}

impl Handler for JsonSink {
    fn enabled(&self, level: Level) -> bool {
        self.state.options.admits(level)
    }

    fn handle(&self, record: &Record) -> Result<()> {
        let mut line = Vec::with_capacity(256);
        self.encode_into(record, &mut line)?;
        self.destination.write_line(&line)
    }

    fn with_attrs(&self, attrs: Vec<Attr>) -> Arc<dyn Handler> {
        Arc::new(self.derive_attrs(attrs))
    }

    fn with_group(&self, name: &str) -> Arc<dyn Handler> {
        Arc::new(self.derive_group(name))
    }
}
