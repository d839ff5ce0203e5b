//! Core functionality of the CLI
//!
//! Contains request dispatch, the project lifecycle ledger, record
//! normalization and output rendering.

pub mod dispatcher;
pub mod project;
pub mod records;
pub mod render;

pub use dispatcher::{Action, Dispatcher, FindSymbolQuery, Outcome, Request};
pub use project::{LifecycleState, ProjectRecord, ProjectStore};
pub use records::{Record, RecordNormalizer};
pub use render::render;
