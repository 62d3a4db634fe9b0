//! # talescore-logging
//!
//! Logging for the talescore content scoring pipeline.
//!
//! This crate provides structured logging for scoring run events.
//!
//! ## Key Types
//!
//! - [`Logger`] - Structured event logging
//! - [`LogEvent`] - Log event types
//! - [`LogFormat`] - Output formats (Pretty, JSON, Compact)
//!
//! ## Log Formats
//!
//! - `Pretty` - Human-readable colored output
//! - `JSON` - Structured JSON lines
//! - `Compact` - Minimal text output

mod events;

pub use events::{LogEvent, LogFormat, Logger};

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize tracing. The diagnostic layer tracks the event format the
/// `Logger` was given so both streams read consistently.
pub fn init_tracing(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => {
            registry
                .with(fmt::layer().json().with_target(false))
                .init();
        }
        LogFormat::Compact => {
            registry
                .with(fmt::layer().compact().with_target(false).without_time())
                .init();
        }
        LogFormat::Pretty => {
            registry.with(fmt::layer().with_target(false)).init();
        }
    }
}
