//! Command implementations for the CLI

use crate::{
    cli::{Command, OutputFormat},
    config::Config,
    core::{Dispatcher, Request, render},
    engine::{Engine, SerenaEngine},
};
use anyhow::Context;
use std::io::Write;
use tracing::{debug, instrument};

/// Execute the appropriate command based on CLI arguments
#[instrument(skip(config))]
pub fn execute_command(config: &Config, command: &Command) -> anyhow::Result<()> {
    let engine = SerenaEngine::new(
        config.engine.clone(),
        config.project_root.clone(),
        config.debug,
    );
    let mut dispatcher = Dispatcher::new(engine, config.project_root.clone())?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    execute_request(&mut dispatcher, &Request::from(command), config.format, &mut out)
}

/// Dispatch one request and render its outcome to `out`
pub fn execute_request<E: Engine, W: Write>(
    dispatcher: &mut Dispatcher<E>,
    request: &Request,
    format: OutputFormat,
    out: &mut W,
) -> anyhow::Result<()> {
    let action = request.action();
    debug!("Executing {}", action);

    let outcome = dispatcher
        .dispatch(request)
        .with_context(|| format!("{action} failed"))?;

    render(&outcome, format, out).context("Failed to write output")?;
    out.flush().context("Failed to write output")?;
    Ok(())
}
