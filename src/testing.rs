//! Helpers for tests that exercise loggers and registries

use crate::cell::LevelCell;
use crate::error::Result;
use crate::gate::{GateMode, GatedHandler};
use crate::handler::{Handler, HandlerOptions};
use crate::level::Level;
use crate::logger::Logger;
use crate::record::{Attr, Record};
use crate::sink::{Destination, TextSink};
use parking_lot::Mutex;
use std::io::{self, Write};
use std::sync::Arc;

/// Cloneable in-memory writer; every clone appends to the same buffer
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.bytes.lock()).into_owned()
    }

    /// Contents, leaving the buffer empty
    pub fn take(&self) -> String {
        let bytes = std::mem::take(&mut *self.bytes.lock());
        String::from_utf8_lossy(&bytes).into_owned()
    }

    pub fn destination(&self) -> Destination {
        Destination::from_writer(self.clone())
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Handler that is disabled at every level and discards every record
#[derive(Debug, Clone, Copy, Default)]
pub struct NullHandler;

impl Handler for NullHandler {
    fn enabled(&self, _: Level) -> bool {
        false
    }

    fn handle(&self, _: &Record) -> Result<()> {
        Ok(())
    }

    fn with_attrs(&self, _: Vec<Attr>) -> Arc<dyn Handler> {
        Arc::new(*self)
    }

    fn with_group(&self, _: &str) -> Arc<dyn Handler> {
        Arc::new(*self)
    }
}

/// Standalone gated logger at DEBUG, writing text lines to `destination`
/// or discarding records when `None`
pub fn test_logger(destination: Option<Destination>) -> (Arc<LevelCell>, Logger) {
    let cell = Arc::new(LevelCell::new(Level::DEBUG));
    let inner: Arc<dyn Handler> = match destination {
        Some(destination) => Arc::new(TextSink::new(destination, HandlerOptions::default())),
        None => Arc::new(NullHandler),
    };
    let logger = Logger::new(Arc::new(GatedHandler::new(inner, cell.clone(), GateMode::Inclusive)));
    (cell, logger)
}
