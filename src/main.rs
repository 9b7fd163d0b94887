//! chanlvl - exercise named logging channels with runtime levels
//!
//! Usage:
//!   chanlvl                                  Log one record per level on Core
//!   chanlvl --channel db --level 'd*=debug'  Pick channels and levels
//!   chanlvl --config chanlvl.toml --format json

mod cli;

use channel_levels::config::{self, LogConfig};
use channel_levels::constants::CORE_CHANNEL;
use channel_levels::error::Result;
use channel_levels::level::Level;
use channel_levels::record::Attr;
use channel_levels::registry::Registry;
use clap::Parser;
use cli::Cli;
use tracing::{debug, warn};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut log_config = match &cli.config {
        Some(path) => config::load_or_default(path),
        None => LogConfig::default(),
    };
    if let Some(format) = cli.format {
        log_config.format = format.into();
    }
    if cli.verbose {
        log_config.default_level = "debug".into();
    }
    debug!("Config: {:?}", log_config);

    let channels = if cli.channels.is_empty() {
        vec![CORE_CHANNEL.to_string()]
    } else {
        cli.channels.clone()
    };

    let registry = Registry::new(log_config.registry_config());
    for name in &channels {
        registry.new_level(name);
    }
    log_config.apply_channels(&registry);
    for (pattern, level) in &cli.levels {
        if !pattern.contains('*') {
            registry.new_level(pattern);
        }
        if !registry.set_level(pattern, level.as_str()) {
            warn!("Level '{}' not applied to '{}'", level, pattern);
        }
    }

    for name in &channels {
        let logger = registry.named(name).with([Attr::string("channel", name.as_str())]);
        for level in [Level::DEBUG, Level::INFO, Level::WARN, Level::ERROR] {
            logger.log(level, "demo record", [Attr::int("ordinal", i64::from(level.0))])?;
        }
    }

    eprintln!("{}", registry.dump());
    Ok(())
}

/// Initialize tracing for chanlvl's own diagnostics (stderr)
///
/// Set `verbose` to true for debug-level output.
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let level = if verbose { "debug" } else { "warn" };

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_file(false)
                .compact(),
        )
        .with(tracing_subscriber::EnvFilter::new(level))
        .try_init();
}
