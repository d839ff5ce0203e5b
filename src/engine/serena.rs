//! Serena-backed engine.
//!
//! Queries and project activation go through an MCP session with a
//! `start-mcp-server` child process. Indexing runs Serena's own
//! `project index` command.

use crate::{
    config::EngineConfig,
    engine::{Engine, EngineRequest, McpSession, mcp::ToolResult},
    error::{Result, SerenaError},
    utils::process::{CommandLine, ProcessRunner},
};
use serde_json::{Value, json};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout};
use tracing::{debug, info, instrument};

type StdioSession = McpSession<BufReader<ChildStdout>, ChildStdin>;

/// Running server process and the session talking to it
struct Connection {
    child: Child,
    session: StdioSession,
}

impl Drop for Connection {
    fn drop(&mut self) {
        if let Err(e) = self.child.kill() {
            debug!("Engine process already gone: {}", e);
        }
        let _ = self.child.wait();
    }
}

/// Engine client for a Serena installation
pub struct SerenaEngine {
    config: EngineConfig,
    project_root: PathBuf,
    process_runner: ProcessRunner,
    connection: Option<Connection>,
}

impl SerenaEngine {
    /// Create a client for `project_root`. Nothing is spawned until the
    /// first request.
    #[must_use]
    pub fn new(config: EngineConfig, project_root: PathBuf, debug: bool) -> Self {
        Self {
            config,
            project_root,
            process_runner: ProcessRunner::new(debug),
            connection: None,
        }
    }

    /// Server command line with headless defaults filled in
    fn server_line(&self, mut line: CommandLine) -> CommandLine {
        let defaults = [
            ("--project", self.project_root.to_string_lossy().into_owned()),
            ("--enable-web-dashboard", "False".to_string()),
            ("--enable-gui-log-window", "False".to_string()),
        ];

        for (flag, value) in defaults {
            if !line.has_flag(flag) {
                line = line.arg(flag).arg(value);
            }
        }
        line
    }

    fn ensure_available(&self, line: &CommandLine) -> Result<()> {
        if self.process_runner.locate(&line.program).is_none() {
            return Err(SerenaError::engine(format!(
                "Command '{}' not found. Please ensure it is in your PATH.",
                line.program
            )));
        }
        Ok(())
    }

    fn session(&mut self) -> Result<&mut StdioSession> {
        if self.connection.is_none() {
            self.connection = Some(self.connect()?);
        }

        match self.connection.as_mut() {
            Some(connection) => Ok(&mut connection.session),
            None => Err(SerenaError::protocol("engine connection unavailable")),
        }
    }

    #[instrument(skip(self))]
    fn connect(&self) -> Result<Connection> {
        let line = self.config.server_cmd()?;
        self.ensure_available(&line)?;

        let line = self.server_line(line);
        info!("Starting engine: {}", line);

        let mut child = self.process_runner.spawn_session(&line)?;
        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            let _ = child.kill();
            return Err(SerenaError::protocol("engine stdio was not captured"));
        };

        let mut connection = Connection {
            child,
            session: McpSession::new(BufReader::new(stdout), stdin),
        };
        connection.session.initialize()?;
        Ok(connection)
    }

    fn call_tool(&mut self, name: &str, arguments: Value) -> Result<ToolResult> {
        let result = self.session()?.call_tool(name, arguments)?;

        if result.is_error {
            let message = result.text();
            debug!("Tool '{}' reported an error: {}", name, message);
            return Err(SerenaError::engine(if message.is_empty() {
                format!("Error calling tool '{name}'")
            } else {
                message
            }));
        }

        Ok(result)
    }

    #[instrument(skip(self))]
    fn index(&self, root: &Path) -> Result<Vec<Value>> {
        let line = self.config.index_cmd()?;
        self.ensure_available(&line)?;
        let line = line.arg(root.to_string_lossy());

        info!("Indexing {}", root.display());
        let output = self
            .process_runner
            .capture(&line)
            .map_err(|e| match e {
                SerenaError::Process { stderr, .. } if !stderr.trim().is_empty() => {
                    SerenaError::engine(stderr.trim().to_string())
                }
                other => other,
            })?;
        debug!("Index output: {}", output.stdout.trim());
        if !output.stderr.trim().is_empty() {
            debug!("Index diagnostics: {}", output.stderr.trim());
        }

        Ok(Vec::new())
    }
}

/// Disables the server's answer-size cap; `--limit` is applied locally
const UNLIMITED_ANSWER: i64 = -1;

/// MCP tool name and arguments for a request, `None` for requests that
/// are not served over MCP
fn tool_call(request: &EngineRequest) -> Option<(&'static str, Value)> {
    match request {
        EngineRequest::ActivateProject { root } => Some((
            "activate_project",
            json!({ "project": root.to_string_lossy() }),
        )),
        EngineRequest::IndexProject { .. } => None,
        EngineRequest::FindSymbol { pattern, within } => {
            let mut args = json!({
                "name_path_pattern": pattern,
                "max_answer_chars": UNLIMITED_ANSWER,
            });
            if let Some(within) = within {
                args["relative_path"] = json!(within);
            }
            Some(("find_symbol", args))
        }
        EngineRequest::SymbolsOverview { path } => {
            Some(("get_symbols_overview", json!({ "relative_path": path })))
        }
        EngineRequest::ReferencingSymbols { name, path } => Some((
            "find_referencing_symbols",
            json!({
                "name_path": name,
                "relative_path": path,
                "max_answer_chars": UNLIMITED_ANSWER,
            }),
        )),
    }
}

impl Engine for SerenaEngine {
    fn execute(&mut self, request: &EngineRequest) -> Result<Vec<Value>> {
        if let EngineRequest::IndexProject { root } = request {
            return self.index(root);
        }

        let Some((name, arguments)) = tool_call(request) else {
            return Err(SerenaError::protocol(format!(
                "no engine route for {request:?}"
            )));
        };
        let result = self.call_tool(name, arguments)?;

        match request {
            EngineRequest::ActivateProject { .. } => {
                info!("{}", result.text().trim());
                Ok(Vec::new())
            }
            _ => result.records(),
        }
    }

    fn is_available(&self) -> bool {
        self.config
            .server_cmd()
            .is_ok_and(|line| self.process_runner.locate(&line.program).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(server_command: &str) -> SerenaEngine {
        let config = EngineConfig {
            server_command: server_command.to_string(),
            index_command: "true".to_string(),
        };
        SerenaEngine::new(config, PathBuf::from("/repo"), false)
    }

    #[test]
    fn test_server_line_fills_headless_defaults() {
        let engine = engine("serena start-mcp-server");
        let line = engine.server_line(engine.config.server_cmd().unwrap());
        assert_eq!(line.program, "serena");
        assert_eq!(
            line.args,
            vec![
                "start-mcp-server",
                "--project",
                "/repo",
                "--enable-web-dashboard",
                "False",
                "--enable-gui-log-window",
                "False",
            ]
        );
    }

    #[test]
    fn test_server_line_keeps_explicit_project() {
        let engine = engine("serena start-mcp-server --project other");
        let line = engine.server_line(engine.config.server_cmd().unwrap());
        assert_eq!(line.args.iter().filter(|a| *a == "--project").count(), 1);
        assert_eq!(line.args[2], "other");
        assert!(line.has_flag("--enable-web-dashboard"));
    }

    #[test]
    fn test_tool_call_mapping() {
        let (name, args) = tool_call(&EngineRequest::FindSymbol {
            pattern: "Widget".to_string(),
            within: None,
        })
        .unwrap();
        assert_eq!(name, "find_symbol");
        assert_eq!(
            args,
            json!({ "name_path_pattern": "Widget", "max_answer_chars": -1 })
        );

        let (_, args) = tool_call(&EngineRequest::FindSymbol {
            pattern: "Widget".to_string(),
            within: Some("src".to_string()),
        })
        .unwrap();
        assert_eq!(args["relative_path"], "src");
        assert_eq!(args["max_answer_chars"], -1);

        let (name, args) = tool_call(&EngineRequest::ReferencingSymbols {
            name: "Widget".to_string(),
            path: "src/widget.py".to_string(),
        })
        .unwrap();
        assert_eq!(name, "find_referencing_symbols");
        assert_eq!(
            args,
            json!({
                "name_path": "Widget",
                "relative_path": "src/widget.py",
                "max_answer_chars": -1
            })
        );

        let (_, args) = tool_call(&EngineRequest::SymbolsOverview {
            path: "src/widget.py".to_string(),
        })
        .unwrap();
        assert!(args.get("max_answer_chars").is_none());

        assert!(
            tool_call(&EngineRequest::IndexProject {
                root: PathBuf::from("/repo")
            })
            .is_none()
        );
    }

    #[test]
    fn test_missing_server_executable_is_engine_error() {
        let mut engine = engine("nonexistent_command_12345 start-mcp-server");
        let err = engine
            .execute(&EngineRequest::SymbolsOverview {
                path: "a.py".to_string(),
            })
            .unwrap_err();
        assert!(matches!(err, SerenaError::Engine { .. }));
        assert!(err.to_string().contains("nonexistent_command_12345"));
    }

    #[test]
    fn test_availability_follows_server_program() {
        assert!(engine("sh -c true").is_available());
        assert!(!engine("nonexistent_command_12345 start-mcp-server").is_available());
    }

    #[test]
    fn test_index_runs_index_command() {
        let mut engine = engine("serena");
        let records = engine
            .execute(&EngineRequest::IndexProject {
                root: PathBuf::from("/repo"),
            })
            .unwrap();
        assert!(records.is_empty());
    }
}
