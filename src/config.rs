//! Configuration management for the CLI
//!
//! Centralizes configuration options and provides validation.

use crate::{
    cli::{Args, OutputFormat},
    error::SerenaError,
    utils::process::CommandLine,
};
use std::path::{Path, PathBuf};

/// Server command used when none is configured
pub const DEFAULT_SERVER_COMMAND: &str =
    "uvx --from git+https://github.com/oraios/serena serena start-mcp-server";

/// Index command used when none is configured
pub const DEFAULT_INDEX_COMMAND: &str =
    "uvx --from git+https://github.com/oraios/serena serena project index";

/// Main configuration structure
#[derive(Debug, Clone)]
pub struct Config {
    /// Enable debug logging
    pub debug: bool,
    /// Project root the command operates on
    pub project_root: PathBuf,
    /// Output rendering
    pub format: OutputFormat,
    /// Engine process configuration
    pub engine: EngineConfig,
}

/// How to reach the Serena engine
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Command line that starts the MCP server over stdio
    pub server_command: String,
    /// Command line that indexes a project
    pub index_command: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            debug: false,
            project_root: PathBuf::from("."),
            format: OutputFormat::Text,
            engine: EngineConfig::default(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            server_command: DEFAULT_SERVER_COMMAND.to_string(),
            index_command: DEFAULT_INDEX_COMMAND.to_string(),
        }
    }
}

impl Config {
    /// Create configuration from command line arguments
    pub fn from_args(args: &Args) -> Result<Self, SerenaError> {
        let mut config = Self {
            debug: args.debug,
            format: args.format,
            ..Self::default()
        };

        if let Some(root) = &args.project_root {
            config.project_root = root.clone();
        }
        config.project_root = resolve_root(&config.project_root)?;

        if let Some(cmd) = &args.server_command {
            config.engine.server_command = cmd.clone();
        }
        if let Some(cmd) = &args.index_command {
            config.engine.index_command = cmd.clone();
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), SerenaError> {
        self.engine.server_cmd()?;
        self.engine.index_cmd()?;
        Ok(())
    }
}

impl EngineConfig {
    /// Command line that starts the MCP server
    pub fn server_cmd(&self) -> Result<CommandLine, SerenaError> {
        CommandLine::parse(&self.server_command)
            .ok_or_else(|| SerenaError::config("server command is empty"))
    }

    /// Command line that indexes a project; the root is appended on use
    pub fn index_cmd(&self) -> Result<CommandLine, SerenaError> {
        CommandLine::parse(&self.index_command)
            .ok_or_else(|| SerenaError::config("index command is empty"))
    }
}

/// Make the project root absolute, canonicalizing it when it exists
fn resolve_root(root: &Path) -> Result<PathBuf, SerenaError> {
    if let Ok(canonical) = root.canonicalize() {
        return Ok(canonical);
    }

    if root.is_absolute() {
        return Ok(root.to_path_buf());
    }

    let cwd = std::env::current_dir()
        .map_err(|e| SerenaError::file_system("read current directory", root, e))?;
    Ok(cwd.join(root))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    #[test]
    fn test_default_commands() {
        let engine = EngineConfig::default();
        let server = engine.server_cmd().unwrap();
        assert_eq!(server.program, "uvx");
        assert_eq!(server.args.last().map(String::as_str), Some("start-mcp-server"));

        let index = engine.index_cmd().unwrap();
        assert_eq!(index.args[index.args.len() - 2..], ["project", "index"]);
    }

    #[test]
    fn test_from_args_overrides_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().to_str().unwrap();
        let args = Args::try_parse_from([
            "serena-cli",
            "--project-root",
            root,
            "--server-command",
            "fake-serena serve",
            "--format",
            "json",
            "project",
            "status",
        ])
        .unwrap();

        let config = Config::from_args(&args).unwrap();
        assert_eq!(config.project_root, temp_dir.path().canonicalize().unwrap());
        assert_eq!(config.engine.server_command, "fake-serena serve");
        assert_eq!(config.engine.index_command, DEFAULT_INDEX_COMMAND);
        assert_eq!(config.format, OutputFormat::Json);
    }

    #[test]
    fn test_missing_root_stays_absolute() {
        let resolved = resolve_root(Path::new("definitely/not/here")).unwrap();
        assert!(resolved.is_absolute());
        assert!(resolved.ends_with("definitely/not/here"));
    }

    #[test]
    fn test_validate_rejects_empty_commands() {
        let mut config = Config::default();
        config.engine.server_command = "   ".to_string();
        assert!(matches!(
            config.validate(),
            Err(SerenaError::Config { .. })
        ));
    }
}
