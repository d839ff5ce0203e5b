//! Command dispatch
//!
//! Maps a validated [`Request`] to engine calls and collects the results.
//! Validation and lifecycle checks always run before the engine is touched.

use crate::{
    cli::{Command, ProjectCommand, QueryCommand},
    core::{
        project::{LifecycleState, ProjectRecord, ProjectStore},
        records::{Record, RecordNormalizer, RecordSource},
    },
    engine::{Engine, EngineRequest},
    error::{Result, SerenaError},
};
use std::path::PathBuf;
use tracing::{debug, info, instrument};

/// Options of `query find-symbol`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FindSymbolQuery {
    pub name: String,
    pub path: Option<String>,
    pub language: Option<String>,
    pub limit: Option<usize>,
}

/// One CLI action with its options
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    InitProject,
    IndexProject,
    ProjectStatus,
    FindSymbol(FindSymbolQuery),
    FileOverview { path: String },
    References { name: String, path: String },
}

/// Action names as they appear on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Init,
    Index,
    Status,
    FindSymbol,
    FileOverview,
    References,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Init => "project init",
            Self::Index => "project index",
            Self::Status => "project status",
            Self::FindSymbol => "query find-symbol",
            Self::FileOverview => "query file-overview",
            Self::References => "query references",
        };
        f.write_str(name)
    }
}

impl Request {
    /// The action this request performs
    pub const fn action(&self) -> Action {
        match self {
            Self::InitProject => Action::Init,
            Self::IndexProject => Action::Index,
            Self::ProjectStatus => Action::Status,
            Self::FindSymbol(_) => Action::FindSymbol,
            Self::FileOverview { .. } => Action::FileOverview,
            Self::References { .. } => Action::References,
        }
    }

    /// Reject empty required options
    pub fn validate(&self) -> Result<()> {
        fn required(option: &str, value: &str) -> Result<()> {
            if value.trim().is_empty() {
                return Err(SerenaError::usage(format!("{option} must not be empty")));
            }
            Ok(())
        }

        match self {
            Self::InitProject | Self::IndexProject | Self::ProjectStatus => Ok(()),
            Self::FindSymbol(query) => {
                required("--name", &query.name)?;
                if let Some(path) = &query.path {
                    required("--path", path)?;
                }
                if let Some(language) = &query.language {
                    required("--language", language)?;
                }
                if query.limit == Some(0) {
                    return Err(SerenaError::usage("--limit must be at least 1"));
                }
                Ok(())
            }
            Self::FileOverview { path } => required("--path", path),
            Self::References { name, path } => {
                required("--name", name)?;
                required("--path", path)
            }
        }
    }
}

impl From<&ProjectCommand> for Request {
    fn from(command: &ProjectCommand) -> Self {
        match command {
            ProjectCommand::Init => Self::InitProject,
            ProjectCommand::Index => Self::IndexProject,
            ProjectCommand::Status => Self::ProjectStatus,
        }
    }
}

impl From<&QueryCommand> for Request {
    fn from(command: &QueryCommand) -> Self {
        match command {
            QueryCommand::FindSymbol {
                name,
                path,
                language,
                limit,
            } => Self::FindSymbol(FindSymbolQuery {
                name: name.clone(),
                path: path.clone(),
                language: language.clone(),
                limit: *limit,
            }),
            QueryCommand::FileOverview { path } => Self::FileOverview { path: path.clone() },
            QueryCommand::References { name, path } => Self::References {
                name: name.clone(),
                path: path.clone(),
            },
        }
    }
}

impl From<&Command> for Request {
    fn from(command: &Command) -> Self {
        match command {
            Command::Project(project) => project.into(),
            Command::Query(query) => query.into(),
        }
    }
}

/// What a dispatched request produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Result of a project command
    Project {
        action: Action,
        project: ProjectRecord,
    },
    /// Ordered query results
    Records { action: Action, records: Vec<Record> },
}

/// Executes requests against an engine for one project root
pub struct Dispatcher<E> {
    engine: E,
    store: ProjectStore,
    normalizer: RecordNormalizer,
}

impl<E: Engine> Dispatcher<E> {
    /// Create a dispatcher for `project_root` using `engine`
    pub fn new(engine: E, project_root: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self {
            engine,
            store: ProjectStore::new(project_root),
            normalizer: RecordNormalizer::new()?,
        })
    }

    /// Lifecycle ledger of the project root
    pub const fn store(&self) -> &ProjectStore {
        &self.store
    }

    /// Validate, check preconditions, call the engine
    #[instrument(skip(self))]
    pub fn dispatch(&mut self, request: &Request) -> Result<Outcome> {
        request.validate()?;
        let action = request.action();

        match request {
            Request::InitProject => Ok(Outcome::Project {
                action,
                project: self.init_project()?,
            }),
            Request::IndexProject => Ok(Outcome::Project {
                action,
                project: self.index_project()?,
            }),
            Request::ProjectStatus => Ok(Outcome::Project {
                action,
                project: self.project_status()?,
            }),
            Request::FindSymbol(query) => Ok(Outcome::Records {
                action,
                records: self.find_symbol(query)?,
            }),
            Request::FileOverview { path } => Ok(Outcome::Records {
                action,
                records: self.file_overview(path)?,
            }),
            Request::References { name, path } => Ok(Outcome::Records {
                action,
                records: self.references(name, path)?,
            }),
        }
    }

    fn require_root(&self) -> Result<PathBuf> {
        if !self.store.root_exists() {
            return Err(SerenaError::project_not_found(self.store.root()));
        }
        Ok(self.store.root().to_path_buf())
    }

    /// Ledger state plus whether the engine can be started
    pub fn project_status(&self) -> Result<ProjectRecord> {
        let mut project = self.store.record()?;
        project.engine_available = Some(self.engine.is_available());
        Ok(project)
    }

    /// Register the project root with the engine
    pub fn init_project(&mut self) -> Result<ProjectRecord> {
        let root = self.require_root()?;
        info!("Initializing project: {}", root.display());

        self.engine
            .execute(&EngineRequest::ActivateProject { root })?;
        self.store.mark_initialized()
    }

    /// (Re)index the project; safe to repeat
    pub fn index_project(&mut self) -> Result<ProjectRecord> {
        let root = self.require_root()?;
        self.store.require(LifecycleState::Initialized)?;
        info!("Indexing project: {}", root.display());

        self.engine.execute(&EngineRequest::IndexProject { root })?;
        self.store.mark_indexed()
    }

    /// Symbols matching the query, filtered and limited
    pub fn find_symbol(&mut self, query: &FindSymbolQuery) -> Result<Vec<Record>> {
        self.store.require(LifecycleState::Indexed)?;
        let within = query
            .path
            .as_deref()
            .map(|p| self.store.resolve_file(p))
            .transpose()?;

        let raw = self.engine.execute(&EngineRequest::FindSymbol {
            pattern: query.name.clone(),
            within,
        })?;
        let mut records = self.normalizer.normalize_all(raw, RecordSource::Symbols);

        if let Some(language) = &query.language {
            let wanted = language.to_lowercase();
            records.retain(|r| r.language() == Some(wanted.as_str()));
            debug!("{} records left after language filter", records.len());
        }

        if let Some(limit) = query.limit {
            records.truncate(limit);
        }

        Ok(records)
    }

    /// Structural summary of one file
    pub fn file_overview(&mut self, path: &str) -> Result<Vec<Record>> {
        self.store.require(LifecycleState::Indexed)?;
        let relative = self.store.resolve_file(path)?;

        let raw = self.engine.execute(&EngineRequest::SymbolsOverview {
            path: relative.clone(),
        })?;
        Ok(self
            .normalizer
            .normalize_all(raw, RecordSource::Overview { file: &relative }))
    }

    /// References to `name` declared in `path`
    pub fn references(&mut self, name: &str, path: &str) -> Result<Vec<Record>> {
        self.store.require(LifecycleState::Indexed)?;
        let relative = self.store.resolve_file(path)?;

        let raw = self.engine.execute(&EngineRequest::ReferencingSymbols {
            name: name.to_string(),
            path: relative,
        })?;
        Ok(self
            .normalizer
            .normalize_all(raw, RecordSource::References))
    }
}
