//! Level-gated handler
//!
//! Wraps any handler with a shared `LevelCell`. The cell is read on every
//! `enabled` call, so level changes made through the registry reach loggers
//! that were created before the change.

use crate::cell::LevelCell;
use crate::error::Result;
use crate::handler::Handler;
use crate::level::Level;
use crate::record::{Attr, Record};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// How a record level is compared against the channel threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GateMode {
    /// Emit when `level >= threshold`
    #[default]
    Inclusive,
    /// Emit when `level > threshold`
    Exclusive,
}

impl GateMode {
    #[inline]
    pub fn admits(self, level: Level, threshold: Level) -> bool {
        match self {
            Self::Inclusive => level >= threshold,
            Self::Exclusive => level > threshold,
        }
    }
}

pub struct GatedHandler {
    inner: Arc<dyn Handler>,
    cell: Arc<LevelCell>,
    mode: GateMode,
}

impl GatedHandler {
    pub fn new(inner: Arc<dyn Handler>, cell: Arc<LevelCell>, mode: GateMode) -> Self {
        Self { inner, cell, mode }
    }

    pub fn cell(&self) -> &Arc<LevelCell> {
        &self.cell
    }

    pub fn mode(&self) -> GateMode {
        self.mode
    }

    fn wrap(&self, inner: Arc<dyn Handler>) -> Arc<dyn Handler> {
        Arc::new(Self {
            inner,
            cell: self.cell.clone(),
            mode: self.mode,
        })
    }
}

impl Handler for GatedHandler {
    fn enabled(&self, level: Level) -> bool {
        self.mode.admits(level, self.cell.get()) && self.inner.enabled(level)
    }

    fn handle(&self, record: &Record) -> Result<()> {
        self.inner.handle(record)
    }

    fn with_attrs(&self, attrs: Vec<Attr>) -> Arc<dyn Handler> {
        self.wrap(self.inner.with_attrs(attrs))
    }

    fn with_group(&self, name: &str) -> Arc<dyn Handler> {
        self.wrap(self.inner.with_group(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::Logger;
    use crate::testing::SharedBuffer;
    use crate::sink::{Destination, TextSink};
    use crate::handler::HandlerOptions;

    fn gated(mode: GateMode, level: Level) -> (Arc<LevelCell>, GatedHandler) {
        let cell = Arc::new(LevelCell::new(level));
        let inner = TextSink::new(Destination::from_writer(std::io::sink()), HandlerOptions::default());
        (cell.clone(), GatedHandler::new(Arc::new(inner), cell, mode))
    }

    #[test]
    fn test_inclusive_threshold() {
        let (_, gate) = gated(GateMode::Inclusive, Level::INFO);
        assert!(!gate.enabled(Level::DEBUG));
        assert!(gate.enabled(Level::INFO));
        assert!(gate.enabled(Level::ERROR));
    }

    #[test]
    fn test_exclusive_threshold() {
        let (_, gate) = gated(GateMode::Exclusive, Level::INFO);
        assert!(!gate.enabled(Level::DEBUG));
        assert!(!gate.enabled(Level::INFO));
        assert!(gate.enabled(Level::INFO.offset(1)));
        assert!(gate.enabled(Level::WARN));
    }

    #[test]
    fn test_reads_cell_on_every_call() {
        let (cell, gate) = gated(GateMode::Inclusive, Level::ERROR);
        assert!(!gate.enabled(Level::WARN));
        cell.set(Level::DEBUG);
        assert!(gate.enabled(Level::WARN));
        cell.set(Level(255));
        assert!(!gate.enabled(Level::ERROR));
    }

    fn enabled_levels(gate: &GatedHandler) -> Vec<bool> {
        (-8..12).map(|l| gate.enabled(Level(l))).collect()
    }

    #[test]
    fn test_raising_threshold_only_adds_suppression() {
        for mode in [GateMode::Inclusive, GateMode::Exclusive] {
            let (cell, gate) = gated(mode, Level(-8));
            let mut previous = enabled_levels(&gate);
            for threshold in -7..12 {
                cell.set(Level(threshold));
                let current = enabled_levels(&gate);
                for (before, after) in previous.iter().zip(&current) {
                    assert!(*before || !*after, "mode {:?} threshold {}", mode, threshold);
                }
                previous = current;
            }
        }
    }

    #[test]
    fn test_lowering_threshold_only_removes_suppression() {
        for mode in [GateMode::Inclusive, GateMode::Exclusive] {
            let (cell, gate) = gated(mode, Level(12));
            let mut previous = enabled_levels(&gate);
            for threshold in (-8..12).rev() {
                cell.set(Level(threshold));
                let current = enabled_levels(&gate);
                for (before, after) in previous.iter().zip(&current) {
                    assert!(!*before || *after, "mode {:?} threshold {}", mode, threshold);
                }
                previous = current;
            }
        }
    }

    #[test]
    fn test_inner_floor_still_applies() {
        let cell = Arc::new(LevelCell::new(Level::DEBUG));
        let inner = TextSink::new(
            Destination::from_writer(std::io::sink()),
            HandlerOptions {
                level: Some(Level::WARN),
                ..Default::default()
            },
        );
        let gate = GatedHandler::new(Arc::new(inner), cell, GateMode::Inclusive);
        assert!(!gate.enabled(Level::INFO));
        assert!(gate.enabled(Level::WARN));
    }

    #[test]
    fn test_derived_handlers_share_cell() {
        let buf = SharedBuffer::new();
        let cell = Arc::new(LevelCell::new(Level::INFO));
        let sink = TextSink::new(Destination::from_writer(buf.clone()), HandlerOptions::default());
        let logger = Logger::new(Arc::new(GatedHandler::new(
            Arc::new(sink),
            cell.clone(),
            GateMode::Inclusive,
        )));
        let child = logger.with_group("req").with([Attr::string("id", "r1")]);

        child.debug("hidden", []).unwrap();
        cell.set(Level::DEBUG);
        child.debug("shown", []).unwrap();

        let out = buf.contents();
        assert!(!out.contains("hidden"));
        assert!(out.contains("msg=shown req.id=r1"), "{}", out);
    }
}
