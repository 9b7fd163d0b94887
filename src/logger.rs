//! Logger front-end over a `Handler`

use crate::error::Result;
use crate::handler::Handler;
use crate::level::Level;
use crate::record::{Attr, Record, Source};
use std::fmt;
use std::sync::Arc;

/// Cheap, cloneable logging handle
#[derive(Clone)]
pub struct Logger {
    handler: Arc<dyn Handler>,
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger").finish_non_exhaustive()
    }
}

impl Logger {
    pub fn new(handler: Arc<dyn Handler>) -> Self {
        Self { handler }
    }

    pub fn handler(&self) -> &Arc<dyn Handler> {
        &self.handler
    }

    pub fn enabled(&self, level: Level) -> bool {
        self.handler.enabled(level)
    }

    /// Build and emit a record if `level` is enabled
    #[track_caller]
    pub fn log(
        &self,
        level: Level,
        message: &str,
        attrs: impl IntoIterator<Item = Attr>,
    ) -> Result<()> {
        if !self.handler.enabled(level) {
            return Ok(());
        }
        let record = Record::new(level, message)
            .with_attrs(attrs)
            .with_source(Source::caller());
        self.handler.handle(&record)
    }

    /// Emit a prepared record if its level is enabled
    pub fn log_record(&self, record: &Record) -> Result<()> {
        if !self.handler.enabled(record.level) {
            return Ok(());
        }
        self.handler.handle(record)
    }

    #[track_caller]
    pub fn debug(&self, message: &str, attrs: impl IntoIterator<Item = Attr>) -> Result<()> {
        self.log(Level::DEBUG, message, attrs)
    }

    #[track_caller]
    pub fn info(&self, message: &str, attrs: impl IntoIterator<Item = Attr>) -> Result<()> {
        self.log(Level::INFO, message, attrs)
    }

    #[track_caller]
    pub fn warn(&self, message: &str, attrs: impl IntoIterator<Item = Attr>) -> Result<()> {
        self.log(Level::WARN, message, attrs)
    }

    #[track_caller]
    pub fn error(&self, message: &str, attrs: impl IntoIterator<Item = Attr>) -> Result<()> {
        self.log(Level::ERROR, message, attrs)
    }

    /// Logger whose records also carry `attrs`
    pub fn with(&self, attrs: impl IntoIterator<Item = Attr>) -> Logger {
        Logger::new(self.handler.with_attrs(attrs.into_iter().collect()))
    }

    /// Logger that nests subsequent attributes under `name`
    pub fn with_group(&self, name: &str) -> Logger {
        Logger::new(self.handler.with_group(name))
    }
}
