//! Named level registry and logger factory
//!
//! The registry owns one `LevelCell` per channel name and builds loggers
//! whose handlers are gated by those cells. Changing a channel's level
//! through `set_level` affects every logger already handed out for it.
//!
//! Locking: the table sits behind one `RwLock`. Lookups and iteration take
//! the shared side; creation, deletion and bulk `set_level` take the
//! exclusive side. Cells are atomics and are read without the table lock.

use crate::cell::LevelCell;
use crate::config::RegistryConfig;
use crate::constants::{CORE_CHANNEL, INTERNAL_CHANNEL};
use crate::error::Result;
use crate::gate::{GateMode, GatedHandler};
use crate::handler::{HandlerOption, HandlerOptions};
use crate::level::{Level, LevelValue};
use crate::logger::Logger;
use crate::matcher::matches;
use crate::record::{Attr, Value};
use crate::sink::{Destination, SinkBuilder};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

// =============================================================================
// Operation set
// =============================================================================

/// Capability surface of a channel registry
pub trait LogManager: Send + Sync {
    fn new_level(&self, name: &str) -> Arc<LevelCell>;
    fn named(&self, name: &str) -> Logger;
    /// `named` with per-logger level and handler overrides
    fn named_with(&self, name: &str, overrides: Vec<NamedOption>) -> Logger;
    fn iterate(&self, visitor: &mut dyn FnMut(&str, &Arc<LevelCell>) -> Result<()>) -> Result<()>;
    fn is_logger(&self, name: &str) -> bool;
    fn set_level(&self, pattern: &str, value: LevelValue) -> bool;
    fn delete(&self, name: &str) -> bool;
    fn dump(&self) -> String;
}

// =============================================================================
// Per-logger overrides
// =============================================================================

/// Override passed to `Registry::named_with`
pub enum NamedOption {
    /// Set this channel's level (exact name, never a pattern)
    Level(LevelValue),
    /// Adjust a copy of the registry's handler options
    Handler(HandlerOption),
}

impl fmt::Debug for NamedOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Level(value) => f.debug_tuple("Level").field(value).finish(),
            Self::Handler(_) => f.write_str("Handler(..)"),
        }
    }
}

impl From<Level> for NamedOption {
    fn from(level: Level) -> Self {
        Self::Level(level.into())
    }
}

impl From<LevelValue> for NamedOption {
    fn from(value: LevelValue) -> Self {
        Self::Level(value)
    }
}

impl From<HandlerOption> for NamedOption {
    fn from(option: HandlerOption) -> Self {
        Self::Handler(option)
    }
}

// =============================================================================
// Registry
// =============================================================================

struct Channel {
    /// Spelling used when the channel was first created
    name: String,
    cell: Arc<LevelCell>,
}

pub struct Registry {
    /// Keyed by lower-cased name
    channels: RwLock<HashMap<String, Channel>>,
    default_level: LevelCell,
    options: HandlerOptions,
    destination: Destination,
    sink: Arc<dyn SinkBuilder>,
    gate: GateMode,
    internal: Logger,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("channels", &self.dump())
            .field("default_level", &self.default_level.get())
            .field("gate", &self.gate)
            .finish_non_exhaustive()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(RegistryConfig::default())
    }
}

impl Registry {
    pub fn new(config: RegistryConfig) -> Self {
        let RegistryConfig {
            destination,
            default_level,
            internal_level,
            options,
            sink,
            gate,
        } = config;

        let internal_cell = Arc::new(LevelCell::new(internal_level));
        let internal = build_logger(
            sink.as_ref(),
            INTERNAL_CHANNEL,
            &destination,
            &options,
            internal_cell.clone(),
            gate,
        );

        let mut channels = HashMap::new();
        channels.insert(
            key(INTERNAL_CHANNEL),
            Channel {
                name: INTERNAL_CHANNEL.to_string(),
                cell: internal_cell,
            },
        );

        Self {
            channels: RwLock::new(channels),
            default_level: LevelCell::new(default_level),
            options,
            destination,
            sink,
            gate,
            internal,
        }
    }

    /// Given handle, or a default registry that warns on its `Core` channel
    /// that none was provided
    pub fn or_fallback(registry: Option<Arc<Registry>>) -> Arc<Registry> {
        if let Some(registry) = registry {
            return registry;
        }

        let registry = Arc::new(Registry::default());
        let _ = registry.named(CORE_CHANNEL).warn(
            "no registry was provided, returning a new registry",
            [],
        );
        registry
    }

    pub fn gate(&self) -> GateMode {
        self.gate
    }

    /// Level seeded into channels created from now on
    pub fn default_level(&self) -> Level {
        self.default_level.get()
    }

    /// Change the seed level. Existing channels keep their level. Returns
    /// false if `value` does not parse.
    pub fn set_default_level(&self, value: impl Into<LevelValue>) -> bool {
        match value.into().parse() {
            Some(level) => {
                self.default_level.set(level);
                true
            }
            None => false,
        }
    }

    /// Existing cell for `name`, or a new one at the default level
    pub fn new_level(&self, name: &str) -> Arc<LevelCell> {
        let key = key(name);
        if let Some(channel) = self.channels.read().get(&key) {
            return channel.cell.clone();
        }

        let mut channels = self.channels.write();
        channels
            .entry(key)
            .or_insert_with(|| Channel {
                name: name.to_string(),
                cell: Arc::new(LevelCell::new(self.default_level.get())),
            })
            .cell
            .clone()
    }

    /// Set the level of every channel matching `pattern`. Returns true if at
    /// least one cell was changed; an unparseable value changes nothing.
    pub fn set_level(&self, pattern: &str, value: impl Into<LevelValue>) -> bool {
        let _ = self
            .internal
            .debug("SetLevel", [Attr::string("name", pattern)]);

        let level = value.into().parse();
        let mut found = false;

        let channels = self.channels.write();
        for channel in channels.values() {
            if !matches(&channel.name, pattern) {
                continue;
            }
            let Some(level) = level else {
                continue;
            };
            self.report(pattern, &channel.name, level);
            channel.cell.set(level);
            found = true;
        }

        found
    }

    fn report(&self, pattern: &str, channel: &str, level: Level) {
        let _ = self.internal.debug(
            "setting level for name",
            [
                Attr::string("name", pattern),
                Attr::string("match", channel),
                Attr::new("level", Value::Level(level)),
            ],
        );
    }

    pub fn is_logger(&self, name: &str) -> bool {
        self.channels.read().contains_key(&key(name))
    }

    /// Remove a channel. Loggers built for it keep their cell and its last
    /// level. The diagnostics channel cannot be removed.
    pub fn delete(&self, name: &str) -> bool {
        let name = key(name);
        if name == key(INTERNAL_CHANNEL) {
            return false;
        }
        self.channels.write().remove(&name).is_some()
    }

    /// Call `visitor` for every channel under the shared lock, stopping at
    /// the first error. The visitor must not call back into the registry's
    /// mutating operations.
    pub fn iterate<F>(&self, mut visitor: F) -> Result<()>
    where
        F: FnMut(&str, &Arc<LevelCell>) -> Result<()>,
    {
        let channels = self.channels.read();
        for channel in channels.values() {
            visitor(&channel.name, &channel.cell)?;
        }
        Ok(())
    }

    /// Snapshot of every channel and its level, sorted by name
    pub fn levels(&self) -> Vec<(String, Level)> {
        let mut levels: Vec<_> = self
            .channels
            .read()
            .values()
            .map(|channel| (channel.name.clone(), channel.cell.get()))
            .collect();
        levels.sort_by(|a, b| a.0.cmp(&b.0));
        levels
    }

    /// `name:LEVEL` pairs sorted by name, comma-joined
    pub fn dump(&self) -> String {
        self.levels()
            .iter()
            .map(|(name, level)| format!("{}:{}", name, level))
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn named(&self, name: &str) -> Logger {
        self.named_with(name, [])
    }

    /// Logger for channel `name`. Every call builds a new sink; loggers for
    /// the same name share one level cell.
    pub fn named_with(&self, name: &str, overrides: impl IntoIterator<Item = NamedOption>) -> Logger {
        let cell = self.new_level(name);
        let mut options = self.options.clone();

        for option in overrides {
            match option {
                NamedOption::Level(value) => {
                    if let Some(level) = value.parse() {
                        self.report(name, name, level);
                        cell.set(level);
                    }
                }
                NamedOption::Handler(mutate) => mutate(&mut options),
            }
        }

        build_logger(
            self.sink.as_ref(),
            name,
            &self.destination,
            &options,
            cell,
            self.gate,
        )
    }
}

impl LogManager for Registry {
    fn new_level(&self, name: &str) -> Arc<LevelCell> {
        Registry::new_level(self, name)
    }

    fn named(&self, name: &str) -> Logger {
        Registry::named(self, name)
    }

    fn named_with(&self, name: &str, overrides: Vec<NamedOption>) -> Logger {
        Registry::named_with(self, name, overrides)
    }

    fn iterate(&self, visitor: &mut dyn FnMut(&str, &Arc<LevelCell>) -> Result<()>) -> Result<()> {
        Registry::iterate(self, visitor)
    }

    fn is_logger(&self, name: &str) -> bool {
        Registry::is_logger(self, name)
    }

    fn set_level(&self, pattern: &str, value: LevelValue) -> bool {
        Registry::set_level(self, pattern, value)
    }

    fn delete(&self, name: &str) -> bool {
        Registry::delete(self, name)
    }

    fn dump(&self) -> String {
        Registry::dump(self)
    }
}

impl fmt::Display for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.dump())
    }
}

fn key(name: &str) -> String {
    name.to_ascii_lowercase()
}

fn build_logger(
    sink: &dyn SinkBuilder,
    name: &str,
    destination: &Destination,
    options: &HandlerOptions,
    cell: Arc<LevelCell>,
    gate: GateMode,
) -> Logger {
    let inner = sink.build(name, destination, options);
    Logger::new(Arc::new(GatedHandler::new(inner, cell, gate)))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::INTERNAL_DEFAULT_LEVEL;
    use crate::error::LogError;
    use crate::handler::{with_level, with_source};
    use crate::testing::SharedBuffer;

    fn registry() -> (SharedBuffer, Registry) {
        let buf = SharedBuffer::new();
        let registry =
            Registry::new(RegistryConfig::default().with_destination(Destination::from_writer(buf.clone())));
        (buf, registry)
    }

    // =========================================================================
    // Table operations
    // =========================================================================

    #[test]
    fn test_internal_channel_exists() {
        let (_, registry) = registry();
        assert!(registry.is_logger(INTERNAL_CHANNEL));
        assert_eq!(registry.dump(), "Internal.Registry:ERROR+247");
        assert_eq!(registry.new_level(INTERNAL_CHANNEL).get(), INTERNAL_DEFAULT_LEVEL);
    }

    #[test]
    fn test_new_level_is_idempotent() {
        let (_, registry) = registry();
        let a = registry.new_level("sublog");
        let b = registry.new_level("SubLog");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.get(), Level::INFO);
        assert_eq!(registry.levels().len(), 2);
    }

    #[test]
    fn test_new_level_uses_current_default() {
        let (_, registry) = registry();
        assert!(registry.set_default_level("warn"));
        assert_eq!(registry.new_level("late").get(), Level::WARN);
        assert!(!registry.set_default_level("loud"));
        assert_eq!(registry.default_level(), Level::WARN);
    }

    #[test]
    fn test_name_keeps_first_spelling() {
        let (_, registry) = registry();
        registry.new_level("HTTP.Server");
        registry.new_level("http.server");
        assert!(registry.is_logger("HTTP.SERVER"));
        assert!(registry.dump().starts_with("HTTP.Server:INFO,"));
    }

    #[test]
    fn test_dump_sorted_by_name() {
        let (_, registry) = registry();
        for (name, level) in [("b", Level::WARN), ("a", Level::DEBUG), ("c", Level::ERROR)] {
            registry.named_with(name, [NamedOption::from(level)]);
        }
        assert_eq!(
            registry.dump(),
            "Internal.Registry:ERROR+247,a:DEBUG,b:WARN,c:ERROR"
        );
        assert_eq!(registry.to_string(), registry.dump());
    }

    #[test]
    fn test_delete() {
        let (_, registry) = registry();
        registry.new_level("gone");
        assert!(registry.delete("GONE"));
        assert!(!registry.is_logger("gone"));
        assert!(!registry.delete("gone"));
        assert!(!registry.delete(INTERNAL_CHANNEL));
        assert!(registry.is_logger(INTERNAL_CHANNEL));
    }

    #[test]
    fn test_iterate_visits_all() {
        let (_, registry) = registry();
        registry.new_level("one");
        registry.new_level("two");

        let mut seen = Vec::new();
        registry
            .iterate(|name, cell| {
                seen.push(format!("{}={}", name, cell.get()));
                Ok(())
            })
            .unwrap();
        seen.sort();
        assert_eq!(seen, ["Internal.Registry=ERROR+247", "one=INFO", "two=INFO"]);
    }

    #[test]
    fn test_iterate_stops_at_first_error() {
        let (_, registry) = registry();
        registry.new_level("one");
        registry.new_level("two");

        let mut calls = 0;
        let err = registry
            .iterate(|name, _| {
                calls += 1;
                Err(LogError::Visitor {
                    message: format!("stop at {}", name),
                })
            })
            .unwrap_err();
        assert_eq!(calls, 1);
        assert!(matches!(err, LogError::Visitor { .. }));
    }

    // =========================================================================
    // set_level
    // =========================================================================

    #[test]
    fn test_set_level_values() {
        let (_, registry) = registry();
        let cell = registry.new_level("sublog");

        assert!(registry.set_level("sublog", Level::WARN));
        assert_eq!(cell.get(), Level::WARN);
        assert!(registry.set_level("sublog", -4));
        assert_eq!(cell.get(), Level::DEBUG);
        assert!(registry.set_level("sublog", "ERR"));
        assert_eq!(cell.get(), Level::ERROR);
        assert!(registry.set_level("sublog", LevelValue::from(&LevelCell::new(Level(2)))));
        assert_eq!(cell.get(), Level(2));
    }

    #[test]
    fn test_set_level_unparseable_is_skipped() {
        let (_, registry) = registry();
        let cell = registry.new_level("sublog");
        assert!(!registry.set_level("sublog", "verbose"));
        assert!(!registry.set_level("*", i64::MAX));
        assert_eq!(cell.get(), Level::INFO);
    }

    #[test]
    fn test_set_level_pattern() {
        let (_, registry) = registry();
        let suba = registry.new_level("suba");
        let subb = registry.new_level("subb");
        let other = registry.new_level("other");

        assert!(registry.set_level("sub*", Level::DEBUG));
        assert_eq!(suba.get(), Level::DEBUG);
        assert_eq!(subb.get(), Level::DEBUG);
        assert_eq!(other.get(), Level::INFO);
        assert!(!registry.set_level("nomatch*", Level::DEBUG));
    }

    #[test]
    fn test_wildcard_skips_internal_channel() {
        let (_, registry) = registry();
        registry.new_level("app");
        assert!(registry.set_level("*", "error"));
        assert_eq!(registry.dump(), "Internal.Registry:ERROR+247,app:ERROR");

        assert!(registry.set_level("internal.registry", "debug"));
        assert_eq!(registry.dump(), "Internal.Registry:DEBUG,app:ERROR");
    }

    #[test]
    fn test_set_level_reports_on_internal_channel() {
        let (buf, registry) = registry();
        registry.new_level("app");
        registry.set_level("app", "warn");
        assert!(buf.contents().is_empty());

        registry.set_level(INTERNAL_CHANNEL, "debug");
        registry.set_level("ap*", "warn");
        let out = buf.contents();
        assert!(out.contains("msg=SetLevel name=ap*"), "{}", out);
        assert!(
            out.contains("msg=\"setting level for name\" name=ap* match=app level=WARN"),
            "{}",
            out
        );
    }

    // =========================================================================
    // named
    // =========================================================================

    #[test]
    fn test_named_follows_live_level() {
        let (buf, registry) = registry();
        let logger = registry.named("sublog");

        logger.debug("first", []).unwrap();
        registry.set_level("sublog", "debug");
        logger.debug("second", []).unwrap();
        registry.set_level("sublog", "error");
        logger.warn("third", []).unwrap();
        logger.error("fourth", []).unwrap();

        let out = buf.contents();
        assert!(!out.contains("first"));
        assert!(out.contains("msg=second"));
        assert!(!out.contains("third"));
        assert!(out.contains("msg=fourth"));
    }

    #[test]
    fn test_named_level_option_is_exact() {
        let (_, registry) = registry();
        let suba = registry.new_level("suba");
        registry.named_with("sub*", [NamedOption::from(Level::ERROR)]);
        assert_eq!(suba.get(), Level::INFO);
        assert_eq!(registry.new_level("sub*").get(), Level::ERROR);
    }

    #[test]
    fn test_named_handler_options_are_per_logger() {
        let (buf, registry) = registry();
        let floored = registry.named_with("app", [NamedOption::from(with_level("warn"))]);
        let sourced = registry.named_with("app", [NamedOption::from(with_source(true))]);

        floored.info("hidden", []).unwrap();
        sourced.info("shown", []).unwrap();

        let out = buf.contents();
        assert!(!out.contains("hidden"));
        assert!(out.contains("source="), "{}", out);
    }

    #[test]
    fn test_or_fallback() {
        let (_, registry) = registry();
        let registry = Arc::new(registry);
        let same = Registry::or_fallback(Some(registry.clone()));
        assert!(Arc::ptr_eq(&registry, &same));

        let fallback = Registry::or_fallback(None);
        assert!(fallback.is_logger(CORE_CHANNEL));
    }

    #[test]
    fn test_log_manager_object() {
        let (_, registry) = registry();
        let manager: &dyn LogManager = &registry;
        manager.new_level("svc");
        assert!(manager.set_level("svc", LevelValue::from("w")));
        let mut count = 0;
        manager
            .iterate(&mut |_, _| {
                count += 1;
                Ok(())
            })
            .unwrap();
        assert_eq!(count, 2);
        assert!(manager.delete("svc"));
        assert_eq!(manager.dump(), "Internal.Registry:ERROR+247");
    }

    #[test]
    fn test_log_manager_named_with_overrides() {
        let (buf, registry) = registry();
        let manager: &dyn LogManager = &registry;

        let logger = manager.named_with(
            "svc",
            vec![NamedOption::from(Level::DEBUG), NamedOption::from(with_source(true))],
        );
        assert_eq!(manager.dump(), "Internal.Registry:ERROR+247,svc:DEBUG");

        logger.debug("visible", []).unwrap();
        let out = buf.contents();
        assert!(out.contains("msg=visible"), "{}", out);
        assert!(out.contains("source="), "{}", out);
    }
}
