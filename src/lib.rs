//! Named logging channels with runtime-adjustable levels
//!
//! - `Registry` - channel name to shared `LevelCell`, wildcard `set_level`,
//!   logger factory
//! - `GatedHandler` - reads the channel's cell on every emission decision
//! - `sink` - text, JSON and colorized console output
//! - `access` - request logging boundary for HTTP servers
//! - `layer` - routes `tracing` events through the registry
//!
//! ```no_run
//! use channel_levels::{bootstrap, RegistryConfig};
//!
//! let (registry, core) = bootstrap(false, RegistryConfig::default());
//! let db = registry.named("db");
//! db.debug("hidden", []).ok();
//! registry.set_level("d*", "debug");
//! db.debug("visible", []).ok();
//! core.info("started", []).ok();
//! ```

pub mod access;
pub mod bootstrap;
pub mod cell;
pub mod config;
pub mod constants;
pub mod error;
pub mod gate;
pub mod handler;
pub mod layer;
pub mod level;
pub mod logger;
pub mod matcher;
pub mod record;
pub mod registry;
pub mod sink;
pub mod testing;

pub use bootstrap::bootstrap;
pub use cell::LevelCell;
pub use config::{LogConfig, RegistryConfig};
pub use error::{LogError, Result};
pub use gate::{GateMode, GatedHandler};
pub use handler::{with_level, with_replace_attr, with_source, Handler, HandlerOptions};
pub use level::{error_level, Level, LevelValue};
pub use logger::Logger;
pub use matcher::matches;
pub use record::{Attr, Record, Value};
pub use registry::{LogManager, NamedOption, Registry};
pub use sink::{Destination, SinkBuilder, SinkFormat};
