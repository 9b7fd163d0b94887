//! Crate-wide constants
//!
//! Centralized constants to avoid duplication and ensure consistency.

use crate::level::Level;

// =============================================================================
// Channels
// =============================================================================

/// Reserved channel used by the registry for its own diagnostics.
/// Never targeted by wildcard patterns.
pub const INTERNAL_CHANNEL: &str = "Internal.Registry";

/// Starting level of the diagnostics channel (displays as `ERROR+247`)
pub const INTERNAL_DEFAULT_LEVEL: Level = Level(255);

/// Channel returned by bootstrap helpers for application-level logging
pub const CORE_CHANNEL: &str = "Core";

// =============================================================================
// Record keys
// =============================================================================

pub const TIME_KEY: &str = "time";
pub const LEVEL_KEY: &str = "level";
pub const MESSAGE_KEY: &str = "msg";
pub const SOURCE_KEY: &str = "source";

// =============================================================================
// Time formats (chrono strftime)
// =============================================================================

/// Text and JSON sinks: RFC 3339 with milliseconds
pub const RECORD_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f%:z";

/// Console formatter timestamp
pub const PRETTY_TIME_FORMAT: &str = "[%H:%M:%S%.3f]";

// =============================================================================
// Access log
// =============================================================================

/// Request header carrying the authenticated user name
pub const HEADER_USERNAME: &str = "X-Logging-Username";

/// Request header that suppresses the access record
pub const HEADER_NOOP: &str = "X-Logging-Noop";

/// Request header copied into `forwarded_for` when enabled
pub const HEADER_FORWARDED_FOR: &str = "X-Forwarded-For";
