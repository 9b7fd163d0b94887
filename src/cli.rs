//! Command-line interface definition using clap
//!
//! Provides structured argument parsing with automatic help generation.

use channel_levels::sink::SinkFormat;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

// =============================================================================
// CLI Definition
// =============================================================================

/// Exercise named logging channels with runtime levels
#[derive(Parser, Debug, Default)]
#[command(name = "chanlvl")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file (TOML)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose debug output and start every channel at DEBUG
    #[arg(short, long)]
    pub verbose: bool,

    /// Output format (overrides config)
    #[arg(short, long, value_enum)]
    pub format: Option<FormatArg>,

    /// Channel level as PATTERN=LEVEL, e.g. `http.*=debug` (repeatable)
    #[arg(short, long = "level", value_name = "PATTERN=LEVEL", value_parser = parse_level_arg)]
    pub levels: Vec<(String, String)>,

    /// Channel to exercise (repeatable, default: Core)
    #[arg(long = "channel", value_name = "NAME")]
    pub channels: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Text,
    Json,
    Pretty,
}

impl From<FormatArg> for SinkFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Text => SinkFormat::Text,
            FormatArg::Json => SinkFormat::Json,
            FormatArg::Pretty => SinkFormat::Pretty,
        }
    }
}

fn parse_level_arg(s: &str) -> Result<(String, String), String> {
    match s.rsplit_once('=') {
        Some((pattern, level)) if !pattern.is_empty() && !level.is_empty() => {
            Ok((pattern.to_string(), level.to_string()))
        }
        _ => Err(format!("expected PATTERN=LEVEL, got '{}'", s)),
    }
}

// ============================================================================
// Tests
// ============================================================================
