//! Process execution utilities
//!
//! Runs one-shot engine commands with captured output and spawns the
//! long-lived server process with piped stdio.

use crate::error::{Result, SerenaError};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use tracing::{debug, instrument};

/// A program and its arguments, split from a configured command string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandLine {
    /// Split on whitespace. `None` for a blank line.
    pub fn parse(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
        })
    }

    /// Append one argument
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Whether `flag` is already among the arguments
    pub fn has_flag(&self, flag: &str) -> bool {
        self.args
            .iter()
            .any(|a| a == flag || a.strip_prefix(flag).is_some_and(|rest| rest.starts_with('=')))
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd
    }
}

impl std::fmt::Display for CommandLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Output of a command that exited successfully
#[derive(Debug)]
pub struct Captured {
    pub stdout: String,
    pub stderr: String,
}

/// Utility for running external processes
#[derive(Debug)]
pub struct ProcessRunner {
    debug: bool,
}

impl ProcessRunner {
    /// Create a new process runner
    #[must_use]
    pub const fn new(debug: bool) -> Self {
        Self { debug }
    }

    /// Run to completion with stdin closed, capturing both streams.
    /// A non-zero exit is a `Process` error carrying the output.
    #[instrument(skip_all, fields(command = %line))]
    pub fn capture(&self, line: &CommandLine) -> Result<Captured> {
        debug!("Running: {}", line);

        let output = line
            .command()
            .stdin(Stdio::null())
            .output()
            .map_err(|e| {
                SerenaError::process(
                    line.to_string(),
                    None,
                    String::new(),
                    format!("Failed to execute command: {e}"),
                )
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        debug!(
            "Exited with {:?} (stdout {} bytes, stderr {} bytes)",
            output.status.code(),
            stdout.len(),
            stderr.len()
        );

        if !output.status.success() {
            return Err(SerenaError::process(
                line.to_string(),
                output.status.code(),
                stdout,
                stderr,
            ));
        }

        Ok(Captured { stdout, stderr })
    }

    /// Spawn with piped stdin/stdout for a request/response session.
    /// The child's stderr is only shown in debug mode.
    #[instrument(skip_all, fields(command = %line))]
    pub fn spawn_session(&self, line: &CommandLine) -> Result<Child> {
        debug!("Spawning: {}", line);

        let stderr = if self.debug {
            Stdio::inherit()
        } else {
            Stdio::null()
        };

        line.command()
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(stderr)
            .spawn()
            .map_err(|e| {
                SerenaError::process(
                    line.to_string(),
                    None,
                    String::new(),
                    format!("Failed to spawn command: {e}"),
                )
            })
    }

    /// Find `program` on `PATH`. Names containing a separator are checked
    /// as paths.
    pub fn locate(&self, program: &str) -> Option<PathBuf> {
        if program.contains(std::path::MAIN_SEPARATOR) {
            let path = Path::new(program);
            return path.is_file().then(|| path.to_path_buf());
        }

        let found = std::env::var_os("PATH").and_then(|paths| {
            std::env::split_paths(&paths)
                .map(|dir| dir.join(program))
                .find(|candidate| candidate.is_file())
        });
        debug!("Located '{}': {:?}", program, found);
        found
    }
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Write};

    fn line(s: &str) -> CommandLine {
        CommandLine::parse(s).unwrap()
    }

    #[test]
    fn test_parse_command_line() {
        let cmd = line("uvx --from git+x  serena start-mcp-server");
        assert_eq!(cmd.program, "uvx");
        assert_eq!(cmd.args, vec!["--from", "git+x", "serena", "start-mcp-server"]);
        assert_eq!(cmd.to_string(), "uvx --from git+x serena start-mcp-server");
        assert!(CommandLine::parse("   ").is_none());
    }

    #[test]
    fn test_has_flag() {
        let cmd = line("serena start-mcp-server --project=/repo");
        assert!(cmd.has_flag("--project"));
        assert!(!cmd.has_flag("--project-file"));
        assert!(!cmd.has_flag("--context"));
    }

    #[test]
    fn test_capture() {
        let runner = ProcessRunner::new(false);
        let out = runner.capture(&line("echo hello world")).unwrap();
        assert_eq!(out.stdout.trim(), "hello world");
        assert!(out.stderr.is_empty());
    }

    #[test]
    fn test_capture_failing_command() {
        let runner = ProcessRunner::new(false);
        let result = runner.capture(&line("sh -c").arg("echo boom >&2; exit 3"));

        match result {
            Err(SerenaError::Process {
                exit_code, stderr, ..
            }) => {
                assert_eq!(exit_code, Some(3));
                assert_eq!(stderr.trim(), "boom");
            }
            other => panic!("Expected process error, got {other:?}"),
        }
    }

    #[test]
    fn test_locate() {
        let runner = ProcessRunner::default();
        assert!(runner.locate("sh").is_some());
        assert!(runner.locate("nonexistent_command_12345").is_none());
        assert!(runner.locate("/nonexistent/dir/serena").is_none());
    }

    #[test]
    fn test_spawn_session_round_trip() {
        let runner = ProcessRunner::new(false);
        let mut child = runner.spawn_session(&line("cat")).unwrap();

        let mut stdin = child.stdin.take().unwrap();
        writeln!(stdin, "ping").unwrap();
        drop(stdin);

        let mut reply = String::new();
        BufReader::new(child.stdout.take().unwrap())
            .read_line(&mut reply)
            .unwrap();
        assert_eq!(reply.trim(), "ping");
        assert!(child.wait().unwrap().success());
    }

    #[test]
    fn test_spawn_missing_command_fails() {
        let runner = ProcessRunner::new(true);
        let result = runner.spawn_session(&line("nonexistent_command_12345"));
        assert!(matches!(result, Err(SerenaError::Process { .. })));
    }
}
