//! Configuration management
//!
//! `RegistryConfig` is the programmatic construction object for a
//! `Registry`. `LogConfig` is its file form (`chanlvl.toml`), loaded with
//! serde + toml and converted with `LogConfig::registry_config`.

use crate::constants::INTERNAL_DEFAULT_LEVEL;
use crate::error::{LogError, Result};
use crate::gate::GateMode;
use crate::handler::{HandlerOptions, ReplaceAttr};
use crate::level::{Level, LevelValue};
use crate::record::Attr;
use crate::registry::Registry;
use crate::sink::{Destination, SinkBuilder, SinkFormat};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

// =============================================================================
// Registry Configuration
// =============================================================================

/// Construction options for a `Registry`
#[derive(Clone)]
pub struct RegistryConfig {
    pub(crate) destination: Destination,
    pub(crate) default_level: Level,
    pub(crate) internal_level: Level,
    pub(crate) options: HandlerOptions,
    pub(crate) sink: Arc<dyn SinkBuilder>,
    pub(crate) gate: GateMode,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            destination: Destination::stdout(),
            default_level: Level::INFO,
            internal_level: INTERNAL_DEFAULT_LEVEL,
            options: HandlerOptions::default(),
            sink: SinkFormat::Text.builder(),
            gate: GateMode::default(),
        }
    }
}

impl fmt::Debug for RegistryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryConfig")
            .field("default_level", &self.default_level)
            .field("internal_level", &self.internal_level)
            .field("options", &self.options)
            .field("gate", &self.gate)
            .finish_non_exhaustive()
    }
}

impl RegistryConfig {
    pub fn with_destination(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self
    }

    /// Seed level for new channels. Unrecognized values fall back to INFO.
    pub fn with_default_level(mut self, value: impl Into<LevelValue>) -> Self {
        self.default_level = value.into().parse().unwrap_or(Level::INFO);
        self
    }

    /// Diagnostics channel level. Unrecognized values are ignored.
    pub fn with_internal_level(mut self, value: impl Into<LevelValue>) -> Self {
        if let Some(level) = value.into().parse() {
            self.internal_level = level;
        }
        self
    }

    pub fn with_source(mut self, add_source: bool) -> Self {
        self.options.add_source = add_source;
        self
    }

    pub fn with_replace_attr<F>(mut self, replace: F) -> Self
    where
        F: Fn(&[String], Attr) -> Option<Attr> + Send + Sync + 'static,
    {
        let replace: ReplaceAttr = Arc::new(replace);
        self.options.replace_attr = Some(replace);
        self
    }

    /// Custom per-channel sink constructor
    pub fn with_sink(mut self, sink: impl SinkBuilder + 'static) -> Self {
        self.sink = Arc::new(sink);
        self
    }

    /// One of the built-in sinks
    pub fn with_format(mut self, format: SinkFormat) -> Self {
        self.sink = format.builder();
        self
    }

    pub fn with_gate(mut self, gate: GateMode) -> Self {
        self.gate = gate;
        self
    }
}

// =============================================================================
// File Configuration
// =============================================================================

/// A level as written in the config file: a name or a raw ordinal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LevelSetting {
    Numeric(i64),
    Text(String),
}

impl From<&LevelSetting> for LevelValue {
    fn from(setting: &LevelSetting) -> Self {
        match setting {
            LevelSetting::Numeric(n) => LevelValue::Numeric(*n),
            LevelSetting::Text(s) => LevelValue::Text(s.clone()),
        }
    }
}

impl From<&str> for LevelSetting {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

/// Output stream for every channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Output {
    #[default]
    Stdout,
    Stderr,
}

impl Output {
    pub fn destination(self) -> Destination {
        match self {
            Self::Stdout => Destination::stdout(),
            Self::Stderr => Destination::stderr(),
        }
    }
}

/// Logging configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Seed level for new channels
    pub default_level: LevelSetting,
    /// Diagnostics channel level (unset keeps `ERROR+247`)
    pub internal_level: Option<LevelSetting>,
    /// Sink used for every channel: "text", "json" or "pretty"
    pub format: SinkFormat,
    /// Annotate records with their call site
    pub add_source: bool,
    pub output: Output,
    /// Threshold comparison: "inclusive" or "exclusive"
    pub gate: GateMode,
    /// `pattern = level` entries applied after the registry is built
    pub channels: BTreeMap<String, LevelSetting>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            default_level: LevelSetting::from("info"),
            internal_level: None,
            format: SinkFormat::Text,
            add_source: false,
            output: Output::Stdout,
            gate: GateMode::Inclusive,
            channels: BTreeMap::new(),
        }
    }
}

impl LogConfig {
    /// Reject level settings that do not parse
    pub fn validate(&self) -> Result<()> {
        check_level("default_level", &self.default_level)?;
        if let Some(level) = &self.internal_level {
            check_level("internal_level", level)?;
        }
        for level in self.channels.values() {
            check_level("channels", level)?;
        }
        Ok(())
    }

    /// Programmatic form, writing to the configured output
    pub fn registry_config(&self) -> RegistryConfig {
        self.registry_config_to(self.output.destination())
    }

    /// Programmatic form with an explicit destination
    pub fn registry_config_to(&self, destination: Destination) -> RegistryConfig {
        let mut config = RegistryConfig::default()
            .with_destination(destination)
            .with_default_level(&self.default_level)
            .with_source(self.add_source)
            .with_format(self.format)
            .with_gate(self.gate);
        if let Some(level) = &self.internal_level {
            config = config.with_internal_level(level);
        }
        config
    }

    /// Apply the `[channels]` table. Plain names are created first so the
    /// level is in place before any logger asks for them; patterns only
    /// touch channels that already exist.
    pub fn apply_channels(&self, registry: &Registry) {
        for (pattern, level) in &self.channels {
            if !pattern.contains('*') {
                registry.new_level(pattern);
            }
            registry.set_level(pattern, level);
        }
    }

    /// Build a registry and apply the channel table
    pub fn build(&self) -> Registry {
        let registry = Registry::new(self.registry_config());
        self.apply_channels(&registry);
        registry
    }
}

fn check_level(field: &'static str, setting: &LevelSetting) -> Result<()> {
    match LevelValue::from(setting).parse() {
        Some(_) => Ok(()),
        None => Err(LogError::ConfigValidation {
            field,
            reason: format!("unrecognized level {:?}", setting),
        }),
    }
}

/// Load and validate a config file
pub fn load(path: &Path) -> Result<LogConfig> {
    let content = fs::read_to_string(path).map_err(|e| LogError::ConfigRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    let config: LogConfig = toml::from_str(&content).map_err(|e| LogError::ConfigValidation {
        field: "file",
        reason: format!("invalid config {:?}: {}", path, e),
    })?;

    config.validate()?;
    Ok(config)
}

/// Load a config file, falling back to defaults on any failure
pub fn load_or_default(path: &Path) -> LogConfig {
    match load(path) {
        Ok(config) => config,
        Err(e) => {
            warn!("{}, using defaults", e);
            LogConfig::default()
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
