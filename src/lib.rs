//! # Serena CLI
//!
//! A command-line client for a Serena semantic code engine. Commands are
//! parsed into typed requests, checked against the project lifecycle and
//! forwarded to the engine; results are printed as text or JSON.
//!
//! ## Features
//!
//! - `project init`, `project index` and `project status`
//! - `query find-symbol`, `query file-overview` and `query references`
//! - Stable JSON records for scripting
//! - Pluggable engine boundary for testing
//!
//! ## Example
//!
//! ```no_run
//! use serena_cli::core::{Dispatcher, Request};
//! use serena_cli::engine::SerenaEngine;
//! use serena_cli::config::EngineConfig;
//!
//! let root = std::path::PathBuf::from("./repo");
//! let engine = SerenaEngine::new(EngineConfig::default(), root.clone(), false);
//! let mut dispatcher = Dispatcher::new(engine, root)?;
//! let outcome = dispatcher.dispatch(&Request::ProjectStatus)?;
//! println!("{outcome:?}");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod engine;
pub mod error;
pub mod utils;

use anyhow::Result;
use crate::error::{SerenaError, exitcode};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable that overrides the log filter
pub const LOG_ENV: &str = "SERENA_CLI_LOG";

/// Initialize logging on stderr with appropriate verbosity
pub fn setup_logging(debug: bool) -> Result<()> {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| {
        if debug {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("warn")
        }
    });

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_level(true)
                .compact(),
        )
        .with(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

/// Exit code for an error chain, taken from the first [`SerenaError`] in it
pub fn exit_code(err: &anyhow::Error) -> u8 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<SerenaError>())
        .map_or(exitcode::SOFTWARE, SerenaError::exit_code)
}
