//! Output sinks
//!
//! - `TextSink` - `key=value` lines
//! - `JsonSink` - one JSON object per line
//! - `PrettySink` - colorized console lines
//!
//! Sinks are built per channel through a `SinkBuilder`, which the registry
//! stores and calls on every `named` request.

pub mod json;
pub mod pretty;
pub mod text;

pub use json::JsonSink;
pub use pretty::PrettySink;
pub use text::TextSink;

use crate::error::Result;
use crate::handler::{Handler, HandlerOptions};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;

// =============================================================================
// Destination
// =============================================================================

/// Shared output stream. Each line is written and flushed under one lock.
#[derive(Clone)]
pub struct Destination {
    inner: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl fmt::Debug for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Destination").finish_non_exhaustive()
    }
}

impl Default for Destination {
    fn default() -> Self {
        Self::stdout()
    }
}

impl Destination {
    pub fn stdout() -> Self {
        Self::from_writer(io::stdout())
    }

    pub fn stderr() -> Self {
        Self::from_writer(io::stderr())
    }

    pub fn from_writer<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    /// Write one complete, newline-terminated line
    pub fn write_line(&self, line: &[u8]) -> Result<()> {
        let mut writer = self.inner.lock();
        writer.write_all(line)?;
        writer.flush()?;
        Ok(())
    }
}

// =============================================================================
// Builders
// =============================================================================

/// Per-channel sink constructor
pub trait SinkBuilder: Send + Sync {
    fn build(
        &self,
        channel: &str,
        destination: &Destination,
        options: &HandlerOptions,
    ) -> Arc<dyn Handler>;
}

impl<F> SinkBuilder for F
where
    F: Fn(&str, &Destination, &HandlerOptions) -> Arc<dyn Handler> + Send + Sync,
{
    fn build(
        &self,
        channel: &str,
        destination: &Destination,
        options: &HandlerOptions,
    ) -> Arc<dyn Handler> {
        self(channel, destination, options)
    }
}

/// Built-in sink formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SinkFormat {
    /// `key=value` lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
    /// Colorized console lines
    Pretty,
}

impl SinkFormat {
    pub fn builder(self) -> Arc<dyn SinkBuilder> {
        match self {
            Self::Text => Arc::new(TextSinkBuilder),
            Self::Json => Arc::new(JsonSinkBuilder),
            Self::Pretty => Arc::new(PrettySinkBuilder),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TextSinkBuilder;

impl SinkBuilder for TextSinkBuilder {
    fn build(&self, _: &str, destination: &Destination, options: &HandlerOptions) -> Arc<dyn Handler> {
        Arc::new(TextSink::new(destination.clone(), options.clone()))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSinkBuilder;

impl SinkBuilder for JsonSinkBuilder {
    fn build(&self, _: &str, destination: &Destination, options: &HandlerOptions) -> Arc<dyn Handler> {
        Arc::new(JsonSink::new(destination.clone(), options.clone()))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PrettySinkBuilder;

impl SinkBuilder for PrettySinkBuilder {
    fn build(&self, _: &str, destination: &Destination, options: &HandlerOptions) -> Arc<dyn Handler> {
        Arc::new(PrettySink::new(destination.clone(), options.clone()))
    }
}
