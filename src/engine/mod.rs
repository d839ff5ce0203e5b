//! Boundary to the external code-understanding engine
//!
//! The dispatcher only sees the [`Engine`] trait. [`SerenaEngine`] is the
//! production implementation; tests plug in their own.

pub mod mcp;
pub mod serena;

pub use mcp::McpSession;
pub use serena::SerenaEngine;

use crate::error::Result;
use serde_json::Value;
use std::path::PathBuf;

/// A single structured call to the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineRequest {
    /// Make sure the engine knows the project at `root`
    ActivateProject { root: PathBuf },
    /// (Re)build the engine's index for `root`
    IndexProject { root: PathBuf },
    /// Look up symbols matching a name or name-path pattern
    FindSymbol {
        pattern: String,
        within: Option<String>,
    },
    /// Top-level symbols of one project-relative file
    SymbolsOverview { path: String },
    /// Symbols referencing `name`, declared in project-relative `path`
    ReferencingSymbols { name: String, path: String },
}

/// Something that answers [`EngineRequest`]s.
///
/// A successful call yields the raw records the engine returned, in order.
/// Failures reported by the engine come back as `SerenaError::Engine`.
pub trait Engine {
    fn execute(&mut self, request: &EngineRequest) -> Result<Vec<Value>>;

    /// Whether the engine could be reached, without contacting it
    fn is_available(&self) -> bool {
        true
    }
}

impl<E: Engine + ?Sized> Engine for &mut E {
    fn execute(&mut self, request: &EngineRequest) -> Result<Vec<Value>> {
        (**self).execute(request)
    }

    fn is_available(&self) -> bool {
        (**self).is_available()
    }
}

impl<E: Engine + ?Sized> Engine for Box<E> {
    fn execute(&mut self, request: &EngineRequest) -> Result<Vec<Value>> {
        (**self).execute(request)
    }

    fn is_available(&self) -> bool {
        (**self).is_available()
    }
}
