//! Project lifecycle tracking
//!
//! A project root moves through `Uninitialized -> Initialized -> Indexed`.
//! The state is kept in a small ledger file inside the project so that
//! query preconditions can be checked without contacting the engine.

use crate::{
    error::{MissingStep, Result, SerenaError},
    utils::fs::{FileSystemUtils, relative_to_root},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

/// Ledger location, relative to the project root
pub const LEDGER_PATH: &str = ".serena/serena-cli.json";

/// Lifecycle state of a project root
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    Uninitialized,
    Initialized,
    Indexed,
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::Initialized => "initialized",
            Self::Indexed => "indexed",
        };
        f.write_str(name)
    }
}

/// On-disk ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Ledger {
    state: LifecycleState,
    initialized_at: DateTime<Utc>,
    #[serde(default)]
    indexed_at: Option<DateTime<Utc>>,
}

/// Result of project commands
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ProjectRecord {
    /// Absolute project root
    pub root: String,
    /// Current lifecycle state
    pub state: LifecycleState,
    /// When `project init` first succeeded
    pub initialized_at: Option<DateTime<Utc>>,
    /// When `project index` last succeeded
    pub indexed_at: Option<DateTime<Utc>>,
    /// Whether the engine program can be found; only set by `project status`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine_available: Option<bool>,
}

/// Lifecycle ledger for one project root
#[derive(Debug)]
pub struct ProjectStore {
    root: PathBuf,
    fs_utils: FileSystemUtils,
}

impl ProjectStore {
    /// Create a store for `root`; nothing is read until asked
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            fs_utils: FileSystemUtils::new(),
        }
    }

    /// Project root this store tracks
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of the ledger file
    pub fn ledger_path(&self) -> PathBuf {
        self.root.join(LEDGER_PATH)
    }

    /// Whether the root exists as a directory
    pub fn root_exists(&self) -> bool {
        self.root.is_dir()
    }

    fn load(&self) -> Result<Option<Ledger>> {
        let path = self.ledger_path();
        let Some(content) = self
            .fs_utils
            .read_file_if_exists(&path)
            .map_err(|e| SerenaError::file_system("read", &path, e))?
        else {
            return Ok(None);
        };

        serde_json::from_str(&content).map(Some).map_err(|e| {
            SerenaError::file_system(
                "parse",
                &path,
                std::io::Error::new(std::io::ErrorKind::InvalidData, e),
            )
        })
    }

    fn save(&self, ledger: &Ledger) -> Result<()> {
        let path = self.ledger_path();
        let content = serde_json::to_string_pretty(ledger).map_err(|e| {
            SerenaError::file_system(
                "encode",
                &path,
                std::io::Error::new(std::io::ErrorKind::InvalidData, e),
            )
        })?;

        debug!("Saving ledger: {} -> {}", ledger.state, path.display());
        self.fs_utils
            .write_file(&path, content)
            .map_err(|e| SerenaError::file_system("write", &path, e))
    }

    fn to_record(&self, ledger: Option<&Ledger>) -> ProjectRecord {
        ProjectRecord {
            root: self.root.to_string_lossy().into_owned(),
            state: ledger.map_or(LifecycleState::Uninitialized, |l| l.state),
            initialized_at: ledger.map(|l| l.initialized_at),
            indexed_at: ledger.and_then(|l| l.indexed_at),
            engine_available: None,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> Result<LifecycleState> {
        Ok(self
            .load()?
            .map_or(LifecycleState::Uninitialized, |l| l.state))
    }

    /// Current state as a record
    pub fn record(&self) -> Result<ProjectRecord> {
        let ledger = self.load()?;
        Ok(self.to_record(ledger.as_ref()))
    }

    /// Fail with a precondition error unless the project reached `required`
    #[instrument(skip(self))]
    pub fn require(&self, required: LifecycleState) -> Result<()> {
        let state = self.state()?;
        if state >= required {
            return Ok(());
        }

        let missing = if state == LifecycleState::Uninitialized {
            MissingStep::Init
        } else {
            MissingStep::Index
        };
        Err(SerenaError::precondition(&self.root, missing))
    }

    /// Record a successful `project init`. An indexed project stays indexed.
    pub fn mark_initialized(&self) -> Result<ProjectRecord> {
        let ledger = self.load()?.unwrap_or_else(|| Ledger {
            state: LifecycleState::Initialized,
            initialized_at: Utc::now(),
            indexed_at: None,
        });

        self.save(&ledger)?;
        info!("Project {} is {}", self.root.display(), ledger.state);
        Ok(self.to_record(Some(&ledger)))
    }

    /// Record a successful `project index`
    pub fn mark_indexed(&self) -> Result<ProjectRecord> {
        let now = Utc::now();
        let mut ledger = self.load()?.unwrap_or(Ledger {
            state: LifecycleState::Initialized,
            initialized_at: now,
            indexed_at: None,
        });
        ledger.state = LifecycleState::Indexed;
        ledger.indexed_at = Some(now);

        self.save(&ledger)?;
        info!("Project {} is {}", self.root.display(), ledger.state);
        Ok(self.to_record(Some(&ledger)))
    }

    /// Resolve a user-supplied file argument to a project-relative path.
    ///
    /// Paths leaving the root are `FileNotIndexed`; paths inside the root
    /// that do not exist are `NotFound`.
    pub fn resolve_file(&self, path: &str) -> Result<String> {
        let given = Path::new(path);
        let candidate = if given.is_absolute() {
            given.canonicalize().unwrap_or_else(|_| given.to_path_buf())
        } else {
            given.to_path_buf()
        };

        let relative = relative_to_root(&self.root, &candidate)
            .ok_or_else(|| SerenaError::file_not_indexed(path, &self.root))?;

        let relative_str = relative.to_string_lossy().into_owned();
        if !self.root.join(&relative).exists() {
            return Err(SerenaError::not_found(relative_str));
        }

        Ok(relative_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn store(temp_dir: &TempDir) -> ProjectStore {
        ProjectStore::new(temp_dir.path().canonicalize().unwrap())
    }

    #[test]
    fn test_fresh_root_is_uninitialized() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);

        assert_eq!(store.state().unwrap(), LifecycleState::Uninitialized);
        let record = store.record().unwrap();
        assert!(record.initialized_at.is_none());
        assert!(record.indexed_at.is_none());
    }

    #[test]
    fn test_lifecycle_transitions() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);

        let record = store.mark_initialized().unwrap();
        assert_eq!(record.state, LifecycleState::Initialized);
        assert!(store.ledger_path().exists());

        let record = store.mark_indexed().unwrap();
        assert_eq!(record.state, LifecycleState::Indexed);
        assert!(record.indexed_at.is_some());

        // Re-initializing keeps the index
        let record = store.mark_initialized().unwrap();
        assert_eq!(record.state, LifecycleState::Indexed);
    }

    #[test]
    fn test_require_names_missing_step() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);

        let err = store.require(LifecycleState::Indexed).unwrap_err();
        assert!(matches!(
            err,
            SerenaError::Precondition {
                missing: MissingStep::Init,
                ..
            }
        ));

        store.mark_initialized().unwrap();
        let err = store.require(LifecycleState::Indexed).unwrap_err();
        assert!(matches!(
            err,
            SerenaError::Precondition {
                missing: MissingStep::Index,
                ..
            }
        ));
        assert!(store.require(LifecycleState::Initialized).is_ok());

        store.mark_indexed().unwrap();
        assert!(store.require(LifecycleState::Indexed).is_ok());
    }

    #[test]
    fn test_corrupt_ledger_is_reported() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);

        fs::create_dir_all(temp_dir.path().join(".serena")).unwrap();
        fs::write(store.ledger_path(), "not json").unwrap();

        assert!(matches!(
            store.state(),
            Err(SerenaError::FileSystem { .. })
        ));
    }

    #[test]
    fn test_resolve_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);
        fs::create_dir_all(temp_dir.path().join("src")).unwrap();
        fs::write(temp_dir.path().join("src/widget.py"), "class Widget: ...").unwrap();

        assert_eq!(store.resolve_file("src/widget.py").unwrap(), "src/widget.py");
        assert_eq!(
            store.resolve_file("./src/../src/widget.py").unwrap(),
            "src/widget.py"
        );

        let absolute = store.root().join("src/widget.py");
        assert_eq!(
            store.resolve_file(absolute.to_str().unwrap()).unwrap(),
            "src/widget.py"
        );
    }

    #[test]
    fn test_resolve_file_errors() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);

        assert!(matches!(
            store.resolve_file("../outside.py"),
            Err(SerenaError::FileNotIndexed { .. })
        ));
        assert!(matches!(
            store.resolve_file("src/missing.py"),
            Err(SerenaError::NotFound { .. })
        ));
    }
}
