//! Process start-up helper
//!
//! Builds the registry once and hands back the `Core` channel logger. The
//! registry handle is then passed explicitly to whatever needs it.

use crate::config::RegistryConfig;
use crate::constants::CORE_CHANNEL;
use crate::level::Level;
use crate::logger::Logger;
use crate::registry::Registry;
use crate::sink::{Destination, SinkFormat};
use std::sync::Arc;

/// Build a registry from `config`. With `debug`, channels start at DEBUG
/// and write colorized lines to stdout.
pub fn bootstrap(debug: bool, config: RegistryConfig) -> (Arc<Registry>, Logger) {
    let config = if debug {
        config
            .with_default_level(Level::DEBUG)
            .with_format(SinkFormat::Pretty)
            .with_destination(Destination::stdout())
    } else {
        config
    };

    let registry = Arc::new(Registry::new(config));
    let core = registry.named(CORE_CHANNEL);
    (registry, core)
}
