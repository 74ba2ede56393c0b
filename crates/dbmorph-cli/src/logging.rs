//! Logging setup for the command line
//!
//! Logs always go to stderr so that scripts and snapshots written to stdout
//! stay clean. Filter precedence: `-v`/`-q` flags, then RUST_LOG, then the
//! `[logging] filter` setting.

use std::io::IsTerminal;

use anyhow::{Context, Result};
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LoggingSettings;

const CRATES: &[&str] = &[
    "dbmorph",
    "dbmorph_core",
    "dbmorph_schema_tools",
    "dbmorph_driver_mysql",
];

/// Filter directive selected by the verbosity flags, if any
pub fn verbosity_directive(verbose: u8, quiet: bool) -> Option<String> {
    if quiet {
        return Some("error".to_string());
    }
    let level = match verbose {
        0 => return None,
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let crates = CRATES
        .iter()
        .map(|name| format!("{}={}", name, level))
        .collect::<Vec<_>>()
        .join(",");
    Some(format!("warn,{}", crates))
}

pub fn init(settings: &LoggingSettings, verbose: u8, quiet: bool) -> Result<()> {
    let filter = match verbosity_directive(verbose, quiet) {
        Some(directive) => EnvFilter::new(directive),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&settings.filter)),
    };

    let layer = if settings.json {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_ansi(false)
            .json()
            .with_current_span(true)
            .with_filter(filter)
            .boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_ansi(std::io::stderr().is_terminal())
            .with_filter(filter)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(layer)
        .try_init()
        .context("Failed to initialize logging")?;

    tracing::debug!(json = settings.json, "logging initialized");
    Ok(())
}
