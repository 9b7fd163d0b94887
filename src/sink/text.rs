//! Text sink: `time=... level=... msg=... key=value` lines

use super::Destination;
use crate::constants::{LEVEL_KEY, MESSAGE_KEY, SOURCE_KEY, TIME_KEY};
use crate::error::Result;
use crate::handler::{Handler, HandlerOptions, HandlerState};
use crate::level::Level;
use crate::record::{Attr, Record, Value};
use std::sync::Arc;

pub struct TextSink {
    destination: Destination,
    state: HandlerState,
}

impl TextSink {
    pub fn new(destination: Destination, options: HandlerOptions) -> Self {
        Self {
            destination,
            state: HandlerState::new(options),
        }
    }

    /// Render one record as a newline-terminated line
    pub fn format(&self, record: &Record) -> String {
        let mut line = String::with_capacity(128);

        if let Some(time) = record.time {
            if let Some(attr) = self.state.builtin(TIME_KEY, Value::Time(time)) {
                push_attr(&mut line, "", &attr);
            }
        }
        if let Some(attr) = self.state.builtin(LEVEL_KEY, Value::Level(record.level)) {
            push_attr(&mut line, "", &attr);
        }
        if self.state.options.add_source {
            if let Some(source) = record.source {
                if let Some(attr) = self.state.builtin(SOURCE_KEY, Value::Str(source.to_string())) {
                    push_attr(&mut line, "", &attr);
                }
            }
        }
        if let Some(attr) = self.state.builtin(MESSAGE_KEY, Value::Str(record.message.clone())) {
            push_attr(&mut line, "", &attr);
        }
        for attr in self.state.resolve(&record.attrs) {
            push_attr(&mut line, "", &attr);
        }

        line.push('\n');
        line
    }
}

fn push_attr(line: &mut String, prefix: &str, attr: &Attr) {
    if let Value::Group(members) = &attr.value {
        let prefix = format!("{}{}.", prefix, attr.key);
        for member in members {
            push_attr(line, &prefix, member);
        }
        return;
    }

    if !line.is_empty() {
        line.push(' ');
    }
    line.push_str(&quote(&format!("{}{}", prefix, attr.key)));
    line.push('=');
    line.push_str(&quote(&attr.value.to_string()));
}

/// Quote values that would break `key=value` parsing
fn quote(s: &str) -> String {
    let needs_quotes = s.is_empty()
        || s
            .chars()
            .any(|c| c == ' ' || c == '=' || c == '"' || c == '\\' || c.is_control());
    if needs_quotes {
        format!("{:?}", s)
    } else {
        s.to_string()
    }
}

impl Handler for TextSink {
    fn enabled(&self, level: Level) -> bool {
        self.state.options.admits(level)
    }

    fn handle(&self, record: &Record) -> Result<()> {
        self.destination.write_line(self.format(record).as_bytes())
    }

    fn with_attrs(&self, attrs: Vec<Attr>) -> Arc<dyn Handler> {
        Arc::new(Self {
            destination: self.destination.clone(),
            state: self.state.with_attrs(attrs),
        })
    }

    fn with_group(&self, name: &str) -> Arc<dyn Handler> {
        Arc::new(Self {
            destination: self.destination.clone(),
            state: self.state.with_group(name),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{with_replace_attr, with_source};
    use crate::record::Source;
    use crate::testing::SharedBuffer;
    use chrono::{Local, TimeZone};

    fn sink(options: HandlerOptions) -> (SharedBuffer, TextSink) {
        let buf = SharedBuffer::new();
        (buf.clone(), TextSink::new(Destination::from_writer(buf), options))
    }

    fn record(level: Level, msg: &str) -> Record {
        Record::new(level, msg).with_time(None)
    }

    #[test]
    fn test_basic_line() {
        let (buf, sink) = sink(HandlerOptions::default());
        sink.handle(&record(Level::DEBUG, "debug2").with_attrs([Attr::string("foo2", "bar2")]))
            .unwrap();
        assert_eq!(buf.contents(), "level=DEBUG msg=debug2 foo2=bar2\n");
    }

    #[test]
    fn test_time_is_rfc3339_millis() {
        let (_, sink) = sink(HandlerOptions::default());
        let time = Local.with_ymd_and_hms(2024, 4, 11, 14, 40, 27).unwrap();
        let line = sink.format(&record(Level::INFO, "x").with_time(Some(time)));
        assert!(line.starts_with("time=2024-04-11T14:40:27.000"), "{}", line);
    }

    #[test]
    fn test_quoting() {
        let (_, sink) = sink(HandlerOptions::default());
        let line = sink.format(
            &record(Level::DEBUG, "setting level for name")
                .with_attrs([Attr::string("empty", ""), Attr::string("eq", "a=b")]),
        );
        assert_eq!(
            line,
            "level=DEBUG msg=\"setting level for name\" empty=\"\" eq=\"a=b\"\n"
        );
    }

    #[test]
    fn test_source_annotation() {
        let mut opts = HandlerOptions::default();
        with_source(true)(&mut opts);
        let (_, sink) = sink(opts);
        let line = sink.format(&record(Level::WARN, "w").with_source(Source {
            file: "src/app.rs",
            line: 12,
        }));
        assert_eq!(line, "level=WARN source=src/app.rs:12 msg=w\n");
    }

    #[test]
    fn test_groups_use_dotted_keys() {
        let (buf, sink) = sink(HandlerOptions::default());
        let derived = sink
            .with_attrs(vec![Attr::int("pid", 1)])
            .with_group("req")
            .with_attrs(vec![Attr::string("id", "r1")]);
        derived
            .handle(&record(Level::INFO, "done").with_attrs([Attr::int("status", 200)]))
            .unwrap();
        assert_eq!(
            buf.contents(),
            "level=INFO msg=done pid=1 req.id=r1 req.status=200\n"
        );
    }

    #[test]
    fn test_replace_attr_drops_level() {
        let mut opts = HandlerOptions::default();
        with_replace_attr(|_: &[String], a: Attr| (a.key != "level").then_some(a))(&mut opts);
        let (_, sink) = sink(opts);
        assert_eq!(sink.format(&record(Level::INFO, "m")), "msg=m\n");
    }

    #[test]
    fn test_static_floor() {
        let (_, sink) = sink(HandlerOptions {
            level: Some(Level::INFO),
            ..Default::default()
        });
        assert!(!sink.enabled(Level::DEBUG));
        assert!(sink.enabled(Level::INFO));
    }
}
