//! Shared level cell
//!
//! One cell per channel, shared by the registry (which writes it) and by
//! every gated handler built for the channel (which reads it on each
//! emission decision).

use crate::level::{Level, LevelValue};
use std::sync::atomic::{AtomicI32, Ordering};

/// Concurrency-safe holder of a single verbosity threshold
#[derive(Debug, Default)]
pub struct LevelCell {
    level: AtomicI32,
}

impl LevelCell {
    pub fn new(level: Level) -> Self {
        Self {
            level: AtomicI32::new(level.0),
        }
    }

    /// Current threshold
    #[inline]
    pub fn get(&self) -> Level {
        Level(self.level.load(Ordering::Acquire))
    }

    /// Replace the threshold; visible to every reader immediately
    #[inline]
    pub fn set(&self, level: Level) {
        self.level.store(level.0, Ordering::Release);
    }
}

impl From<&LevelCell> for LevelValue {
    fn from(cell: &LevelCell) -> Self {
        LevelValue::Named(cell.get())
    }
}
