//! `tracing` bridge
//!
//! Routes `tracing` events through the registry: the event target is the
//! channel name, so `tracing::debug!(target: "db", ...)` is gated by the
//! `db` channel's level cell and written by its sink.

use crate::error::{LogError, Result};
use crate::level::Level;
use crate::logger::Logger;
use crate::record::{Attr, Record, Source};
use crate::registry::Registry;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

/// Layer that hands events to the registry channel named by their target
pub struct ChannelLayer {
    registry: Arc<Registry>,
    loggers: RwLock<HashMap<String, Logger>>,
}

impl ChannelLayer {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            loggers: RwLock::new(HashMap::new()),
        }
    }

    fn logger(&self, target: &str) -> Logger {
        if let Some(logger) = self.loggers.read().get(target) {
            return logger.clone();
        }
        self.loggers
            .write()
            .entry(target.to_string())
            .or_insert_with(|| self.registry.named(target))
            .clone()
    }
}

/// TRACE sits one step below DEBUG
pub fn level_from_tracing(level: &tracing::Level) -> Level {
    match *level {
        tracing::Level::TRACE => Level::DEBUG.offset(-4),
        tracing::Level::DEBUG => Level::DEBUG,
        tracing::Level::INFO => Level::INFO,
        tracing::Level::WARN => Level::WARN,
        _ => Level::ERROR,
    }
}

/// Collects the message and typed fields of an event
#[derive(Default)]
struct EventVisitor {
    message: String,
    attrs: Vec<Attr>,
}

impl Visit for EventVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else {
            self.attrs
                .push(Attr::string(field.name(), format!("{:?}", value)));
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.attrs.push(Attr::string(field.name(), value));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.attrs.push(Attr::int(field.name(), value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.attrs.push(Attr::uint(field.name(), value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.attrs.push(Attr::float(field.name(), value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.attrs.push(Attr::bool(field.name(), value));
    }
}

impl<S> Layer<S> for ChannelLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let level = level_from_tracing(metadata.level());
        let logger = self.logger(metadata.target());
        if !logger.enabled(level) {
            return;
        }

        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);

        let mut record = Record::new(level, visitor.message).with_attrs(visitor.attrs);
        if let (Some(file), Some(line)) = (metadata.file(), metadata.line()) {
            record = record.with_source(Source { file, line });
        }

        // A subscriber has nowhere to report write failures
        let _ = logger.log_record(&record);
    }
}

/// Install a `ChannelLayer` over `registry` as the global default subscriber
pub fn install(registry: Arc<Registry>) -> Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(ChannelLayer::new(registry))
        .try_init()
        .map_err(|e| LogError::SubscriberInit {
            reason: e.to_string(),
        })
}
