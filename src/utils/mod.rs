//! Utilities: logging setup (level from -v/-q, RUST_LOG override, optional file sink)
//! and KEY=VALUE option parsing shared by the CLI subcommands.
//!
//! Key items:
//!   derive_level / init_logging
//!   parse_kv_options

use anyhow::{Context, Result, bail};
use std::path::Path;
use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::patlite::{OptionValue, Options};

/* ---- Logging ---- */

pub fn derive_level(verbose: u8, quiet: bool) -> Level {
    if quiet {
        return Level::ERROR;
    }
    match verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Install the global subscriber. `RUST_LOG`, when set, wins over `level`.
pub fn init_logging(level: Level, log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_ascii_lowercase()));

    match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file: {}", path.display()))?;
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(file)
                        .with_ansi(false),
                )
                .try_init()
                .context("failed to install log subscriber")?;
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .try_init()
                .context("failed to install log subscriber")?;
        }
    }
    Ok(())
}

/* ---- Option parsing ---- */

/// Parse repeated `KEY=VALUE` flags into an option map. Later entries win.
pub fn parse_kv_options(pairs: &[String]) -> Result<Options> {
    let mut options = Options::new();
    for kv in pairs {
        let Some((k, v)) = kv.split_once('=') else {
            bail!("invalid --opt (expected KEY=VALUE): {kv}");
        };
        let key = k.trim();
        if key.is_empty() {
            bail!("invalid --opt (empty key): {kv}");
        }
        options.insert(key.to_string(), OptionValue::Str(v.trim().to_string()));
    }
    Ok(options)
}
