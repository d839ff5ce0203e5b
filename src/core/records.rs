//! Normalization of engine payloads into stable records
//!
//! The engine returns loosely shaped symbol dictionaries. Everything the CLI
//! prints goes through [`RecordNormalizer`] first so that field names and
//! types stay the same across calls.

use crate::error::{Result, SerenaError};
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::Path;
use tracing::{debug, instrument};

/// A symbol, file-overview entry or reference, as rendered
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Record {
    /// Symbol name
    pub name: String,
    /// Lower-cased symbol kind (`class`, `function`, ...)
    pub kind: String,
    /// Project-relative file path
    pub path: String,
    /// Line reported by the engine
    pub line: u64,
    /// Code around a reference; only present on reference records
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    /// Language the engine attached to the symbol, if any
    #[serde(skip)]
    pub language: Option<String>,
}

impl Record {
    /// Identity of the record independent of rendering
    pub fn identity(&self) -> (&str, &str, &str, u64) {
        (&self.name, &self.kind, &self.path, self.line)
    }

    /// Language reported by the engine, else inferred from the file extension
    pub fn language(&self) -> Option<&str> {
        self.language
            .as_deref()
            .or_else(|| language_for_path(&self.path))
    }
}

/// Which query produced a payload
#[derive(Debug, Clone, Copy)]
pub enum RecordSource<'a> {
    /// `find_symbol` results
    Symbols,
    /// Symbols of a single file
    Overview { file: &'a str },
    /// Referencing symbols
    References,
}

/// Turns raw engine dictionaries into [`Record`]s
pub struct RecordNormalizer {
    /// Matches a trailing overload index such as `[0]`
    re_overload: Regex,
}

impl RecordNormalizer {
    /// Create a new normalizer
    pub fn new() -> Result<Self> {
        Ok(Self {
            re_overload: Regex::new(r"\[\d+\]$")
                .map_err(|e| SerenaError::config(format!("Failed to compile regex: {e}")))?,
        })
    }

    /// Normalize every raw item, preserving engine order
    #[instrument(skip(self, raw))]
    pub fn normalize_all(&self, raw: Vec<Value>, source: RecordSource<'_>) -> Vec<Record> {
        let mut records = Vec::with_capacity(raw.len());

        for item in raw {
            match item {
                Value::Object(map) if is_grouped_overview(&map) => {
                    self.expand_grouped(&map, source, &mut records);
                }
                Value::Object(map) => records.push(self.normalize(&map, source, None)),
                other => debug!("Skipping non-object record: {}", other),
            }
        }

        debug!("Normalized {} records", records.len());
        records
    }

    /// Normalize one symbol dictionary
    fn normalize(
        &self,
        item: &Map<String, Value>,
        source: RecordSource<'_>,
        default_kind: Option<&str>,
    ) -> Record {
        let name = self.name_of(item);

        let kind = match item.get("kind") {
            Some(Value::Number(n)) => n
                .as_u64()
                .map_or_else(|| n.to_string(), symbol_kind_name),
            Some(Value::String(s)) => s.to_lowercase(),
            _ => default_kind.map_or_else(|| "unknown".to_string(), str::to_lowercase),
        };

        let path = ["relative_path", "file", "path"]
            .iter()
            .find_map(|key| item.get(*key).and_then(Value::as_str))
            .map(str::to_string)
            .or_else(|| match source {
                RecordSource::Overview { file } => Some(file.to_string()),
                RecordSource::Symbols | RecordSource::References => None,
            })
            .unwrap_or_default();

        let snippet = match source {
            RecordSource::References => Some(
                item.get("content_around_reference")
                    .and_then(Value::as_str)
                    .map(str::trim)
                    .unwrap_or_default()
                    .to_string(),
            ),
            RecordSource::Symbols | RecordSource::Overview { .. } => None,
        };

        Record {
            name,
            kind,
            path,
            line: line_of(item).unwrap_or(0),
            snippet,
            language: item
                .get("language")
                .and_then(Value::as_str)
                .map(str::to_lowercase)
                .filter(|l| !l.is_empty()),
        }
    }

    fn name_of(&self, item: &Map<String, Value>) -> String {
        if let Some(name) = item.get("name").and_then(Value::as_str) {
            return name.to_string();
        }

        item.get("name_path")
            .and_then(Value::as_str)
            .and_then(|path| path.rsplit('/').next())
            .map(|last| self.re_overload.replace(last, "").into_owned())
            .unwrap_or_else(|| "unknown".to_string())
    }

    /// `{"Class": ["Widget"], "Function": [{"name_path": "main", ...}]}`
    fn expand_grouped(
        &self,
        map: &Map<String, Value>,
        source: RecordSource<'_>,
        records: &mut Vec<Record>,
    ) {
        for (kind, entries) in map {
            let Some(entries) = entries.as_array() else {
                continue;
            };
            for entry in entries {
                match entry {
                    Value::String(name) => {
                        let mut item = Map::new();
                        item.insert("name_path".to_string(), Value::String(name.clone()));
                        records.push(self.normalize(&item, source, Some(kind.as_str())));
                    }
                    Value::Object(item) => {
                        records.push(self.normalize(item, source, Some(kind.as_str())));
                    }
                    other => debug!("Skipping grouped entry: {}", other),
                }
            }
        }
    }
}

/// A grouped overview maps kind names to arrays and has no symbol fields
fn is_grouped_overview(map: &Map<String, Value>) -> bool {
    !map.is_empty()
        && !map.contains_key("name")
        && !map.contains_key("name_path")
        && map.values().all(Value::is_array)
}

/// First line number found among the location shapes the engine uses
fn line_of(item: &Map<String, Value>) -> Option<u64> {
    const POINTERS: [&str; 6] = [
        "/body_location/start_line",
        "/range/start_line",
        "/range/start/line",
        "/selection_range/start/line",
        "/location/line",
        "/line",
    ];

    let item = Value::Object(item.clone());
    POINTERS
        .iter()
        .find_map(|pointer| item.pointer(pointer).and_then(Value::as_u64))
}

/// Lower-cased name of an LSP `SymbolKind`
pub fn symbol_kind_name(kind: u64) -> String {
    let name = match kind {
        1 => "file",
        2 => "module",
        3 => "namespace",
        4 => "package",
        5 => "class",
        6 => "method",
        7 => "property",
        8 => "field",
        9 => "constructor",
        10 => "enum",
        11 => "interface",
        12 => "function",
        13 => "variable",
        14 => "constant",
        15 => "string",
        16 => "number",
        17 => "boolean",
        18 => "array",
        19 => "object",
        20 => "key",
        21 => "null",
        22 => "enummember",
        23 => "struct",
        24 => "event",
        25 => "operator",
        26 => "typeparameter",
        other => return other.to_string(),
    };
    name.to_string()
}

/// Guess a source language from a file extension
pub fn language_for_path(path: &str) -> Option<&'static str> {
    let ext = Path::new(path).extension()?.to_str()?.to_ascii_lowercase();
    let language = match ext.as_str() {
        "py" | "pyi" => "python",
        "ts" | "tsx" => "typescript",
        "js" | "jsx" | "mjs" | "cjs" => "javascript",
        "java" => "java",
        "rs" => "rust",
        "go" => "go",
        "rb" => "ruby",
        "cs" => "csharp",
        "c" | "h" => "c",
        "cc" | "cpp" | "cxx" | "hpp" | "hh" => "cpp",
        "php" => "php",
        "kt" | "kts" => "kotlin",
        "swift" => "swift",
        "dart" => "dart",
        "scala" => "scala",
        "lua" => "lua",
        "ex" | "exs" => "elixir",
        _ => return None,
    };
    Some(language)
}
