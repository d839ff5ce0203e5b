//! Error types for the Serena CLI
//!
//! Provides structured error handling with context and proper error chains.
//! Every variant maps to a process exit code through [`SerenaError::exit_code`].

use std::path::PathBuf;
use thiserror::Error;

/// Lifecycle step a project root is missing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingStep {
    /// `project init` has never succeeded for the root
    Init,
    /// `project index` has never succeeded for the root
    Index,
}

impl MissingStep {
    /// The command the user has to run to satisfy the precondition
    pub const fn command(self) -> &'static str {
        match self {
            Self::Init => "project init",
            Self::Index => "project index",
        }
    }

    const fn describe(self) -> &'static str {
        match self {
            Self::Init => "not initialized",
            Self::Index => "not indexed",
        }
    }
}

impl std::fmt::Display for MissingStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.describe())
    }
}

/// Main error type for the CLI
#[derive(Error, Debug)]
pub enum SerenaError {
    /// Bad or missing command-line options, detected before any engine call
    #[error("Usage error: {message}")]
    Usage { message: String },

    /// The project lifecycle has not reached the required state
    #[error("Project {} is {missing}; run `{}` first", .root.display(), .missing.command())]
    Precondition { root: PathBuf, missing: MissingStep },

    /// The project root does not exist
    #[error("Project root not found: {}", .path.display())]
    ProjectNotFound { path: PathBuf },

    /// A file argument resolves outside the project root
    #[error("File {path} is outside the indexed project {}", .root.display())]
    FileNotIndexed { path: String, root: PathBuf },

    /// A file argument does not exist inside the project
    #[error("File not found in project: {path}")]
    NotFound { path: String },

    /// The engine reported a failure; the message is passed through verbatim
    #[error("{message}")]
    Engine { message: String },

    /// The engine spoke something other than the expected protocol
    #[error("Protocol error: {message}")]
    Protocol {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Process execution errors
    #[error("Process error: {command} failed")]
    Process {
        command: String,
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// File system operation errors
    #[error("File system error: {operation} failed on {}", .path.display())]
    FileSystem {
        operation: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl SerenaError {
    /// Create a new usage error
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
        }
    }

    /// Create a new precondition error
    pub fn precondition<P: Into<PathBuf>>(root: P, missing: MissingStep) -> Self {
        Self::Precondition {
            root: root.into(),
            missing,
        }
    }

    /// Create a new project-not-found error
    pub fn project_not_found<P: Into<PathBuf>>(path: P) -> Self {
        Self::ProjectNotFound { path: path.into() }
    }

    /// Create a new file-not-indexed error
    pub fn file_not_indexed<P: Into<PathBuf>>(path: impl Into<String>, root: P) -> Self {
        Self::FileNotIndexed {
            path: path.into(),
            root: root.into(),
        }
    }

    /// Create a new not-found error
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Create a new engine error
    pub fn engine(message: impl Into<String>) -> Self {
        Self::Engine {
            message: message.into(),
        }
    }

    /// Create a new protocol error
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
            source: None,
        }
    }

    /// Create a new protocol error wrapping its cause
    pub fn protocol_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Protocol {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a new process error
    pub fn process(
        command: impl Into<String>,
        exit_code: Option<i32>,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
    ) -> Self {
        Self::Process {
            command: command.into(),
            exit_code,
            stdout: stdout.into(),
            stderr: stderr.into(),
            source: None,
        }
    }

    /// Create a new file system error
    pub fn file_system<P: Into<PathBuf>>(
        operation: impl Into<String>,
        path: P,
        source: std::io::Error,
    ) -> Self {
        Self::FileSystem {
            operation: operation.into(),
            path: path.into(),
            source,
        }
    }

    /// Create a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Exit code for this error (BSD sysexits.h compatible)
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Usage { .. } => exitcode::USAGE,
            Self::ProjectNotFound { .. } | Self::FileNotIndexed { .. } | Self::NotFound { .. } => {
                exitcode::NOINPUT
            }
            Self::Engine { .. } | Self::Process { .. } => exitcode::UNAVAILABLE,
            Self::Protocol { .. } => exitcode::SOFTWARE,
            Self::FileSystem { .. } => exitcode::IOERR,
            Self::Precondition { .. } | Self::Config { .. } => exitcode::CONFIG,
        }
    }
}

/// Standard exit codes
pub mod exitcode {
    /// Successful termination
    pub const OK: u8 = 0;
    /// Command line usage error
    pub const USAGE: u8 = 64;
    /// Cannot open input
    pub const NOINPUT: u8 = 66;
    /// Service unavailable
    pub const UNAVAILABLE: u8 = 69;
    /// Internal software error
    pub const SOFTWARE: u8 = 70;
    /// Input/output error
    pub const IOERR: u8 = 74;
    /// Configuration error
    pub const CONFIG: u8 = 78;
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, SerenaError>;
