//! Command-line argument parsing and validation

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Serena CLI - query a Serena semantic code engine from the shell
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "serena-cli")]
pub struct Args {
    /// Enable debug output
    #[arg(long, global = true)]
    pub debug: bool,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Project root to operate on (defaults to the current directory)
    #[arg(long, global = true, env = "SERENA_CLI_PROJECT_ROOT")]
    pub project_root: Option<PathBuf>,

    /// Command that starts the Serena MCP server
    #[arg(long, global = true, env = "SERENA_SERVER_COMMAND")]
    pub server_command: Option<String>,

    /// Command that indexes a project (the project root is appended)
    #[arg(long, global = true, env = "SERENA_INDEX_COMMAND")]
    pub index_command: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Rendering of command results
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable, line-oriented output
    #[default]
    Text,
    /// A JSON array of record objects
    Json,
}

/// Command groups
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Project lifecycle management
    #[command(subcommand)]
    Project(ProjectCommand),

    /// Semantic queries against an indexed project
    #[command(subcommand)]
    Query(QueryCommand),
}

/// Project subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ProjectCommand {
    /// Register the project root with the engine
    Init,

    /// (Re)index the project
    Index,

    /// Show the lifecycle state of the project
    Status,
}

/// Query subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum QueryCommand {
    /// Find symbols by name or name-path pattern
    FindSymbol {
        /// Symbol name or pattern
        #[arg(long)]
        name: String,

        /// Restrict the search to a file or directory
        #[arg(long)]
        path: Option<String>,

        /// Keep only symbols whose file is in this language
        #[arg(long)]
        language: Option<String>,

        /// Maximum number of results
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Structural overview of one file
    FileOverview {
        /// File path, relative to the project root
        #[arg(long)]
        path: String,
    },

    /// Find references to a symbol
    References {
        /// Symbol name or name path
        #[arg(long)]
        name: String,

        /// File containing the symbol declaration
        #[arg(long)]
        path: String,
    },
}

/// Parse command line arguments
pub fn parse_args() -> Args {
    Args::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_project_init() {
        let args = Args::try_parse_from(["serena-cli", "project", "init"]).unwrap();
        assert!(!args.debug);
        assert_eq!(args.format, OutputFormat::Text);
        assert!(matches!(args.command, Command::Project(ProjectCommand::Init)));
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let args = Args::try_parse_from([
            "serena-cli",
            "query",
            "find-symbol",
            "--name",
            "Widget",
            "--format",
            "json",
            "--project-root",
            "./repo",
            "--debug",
        ])
        .unwrap();
        assert!(args.debug);
        assert_eq!(args.format, OutputFormat::Json);
        assert_eq!(args.project_root, Some(PathBuf::from("./repo")));
    }

    #[test]
    fn test_parse_find_symbol_with_options() {
        let args = Args::try_parse_from([
            "serena-cli",
            "query",
            "find-symbol",
            "--name",
            "Widget",
            "--language",
            "python",
            "--limit",
            "3",
        ])
        .unwrap();
        match args.command {
            Command::Query(QueryCommand::FindSymbol {
                name,
                path,
                language,
                limit,
            }) => {
                assert_eq!(name, "Widget");
                assert_eq!(path, None);
                assert_eq!(language.as_deref(), Some("python"));
                assert_eq!(limit, Some(3));
            }
            other => panic!("Expected FindSymbol command, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_required_options_are_rejected() {
        let cases: [&[&str]; 4] = [
            &["serena-cli", "query", "find-symbol"],
            &["serena-cli", "query", "file-overview"],
            &["serena-cli", "query", "references", "--name", "Widget"],
            &["serena-cli", "query", "references", "--path", "src/widget.py"],
        ];
        for argv in cases {
            let err = Args::try_parse_from(argv).unwrap_err();
            assert_eq!(
                err.kind(),
                clap::error::ErrorKind::MissingRequiredArgument,
                "{argv:?}"
            );
        }
    }

    #[test]
    fn test_unknown_format_is_rejected() {
        let result = Args::try_parse_from(["serena-cli", "--format", "yaml", "project", "status"]);
        assert!(result.is_err());
    }
}
