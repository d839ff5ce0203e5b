//! Output rendering
//!
//! `text` is meant for people, `json` for tools: always a compact array of
//! record objects, `[]` when nothing matched.

use crate::{
    cli::OutputFormat,
    core::{
        dispatcher::{Action, Outcome},
        project::ProjectRecord,
        records::Record,
    },
};
use std::io::{self, Write};

/// Write `outcome` to `out` in the requested format
pub fn render<W: Write>(outcome: &Outcome, format: OutputFormat, out: &mut W) -> io::Result<()> {
    match format {
        OutputFormat::Json => render_json(outcome, out),
        OutputFormat::Text => render_text(outcome, out),
    }
}

fn render_json<W: Write>(outcome: &Outcome, out: &mut W) -> io::Result<()> {
    match outcome {
        Outcome::Project { project, .. } => serde_json::to_writer(&mut *out, &[project])?,
        Outcome::Records { records, .. } => serde_json::to_writer(&mut *out, records)?,
    }
    writeln!(out)
}

fn render_text<W: Write>(outcome: &Outcome, out: &mut W) -> io::Result<()> {
    match outcome {
        Outcome::Project { action, project } => project_text(*action, project, out),
        Outcome::Records { action, records } => match action {
            Action::FileOverview => overview_text(records, out),
            Action::References => references_text(records, out),
            _ => symbols_text(records, out),
        },
    }
}

fn project_text<W: Write>(action: Action, project: &ProjectRecord, out: &mut W) -> io::Result<()> {
    match action {
        Action::Init => writeln!(out, "Initialized project at {}", project.root)?,
        Action::Index => writeln!(out, "Indexed project at {}", project.root)?,
        _ => writeln!(out, "Project: {}", project.root)?,
    }
    writeln!(out, "State: {}", project.state)?;
    match project.engine_available {
        Some(true) => writeln!(out, "Engine: available")?,
        Some(false) => writeln!(out, "Engine: not found")?,
        None => {}
    }

    if let Some(at) = project.initialized_at {
        writeln!(out, "Initialized: {}", at.to_rfc3339())?;
    }
    if let Some(at) = project.indexed_at {
        writeln!(out, "Indexed: {}", at.to_rfc3339())?;
    }
    Ok(())
}

fn symbols_text<W: Write>(records: &[Record], out: &mut W) -> io::Result<()> {
    if records.is_empty() {
        return writeln!(out, "No symbols found.");
    }
    for r in records {
        writeln!(out, "{:<30} {:<15} {}:{}", r.name, r.kind, r.path, r.line)?;
    }
    Ok(())
}

fn overview_text<W: Write>(records: &[Record], out: &mut W) -> io::Result<()> {
    if records.is_empty() {
        return writeln!(out, "No symbols found in file.");
    }
    for r in records {
        writeln!(out, "{:<15} {:<30} (line {})", r.kind, r.name, r.line)?;
    }
    Ok(())
}

fn references_text<W: Write>(records: &[Record], out: &mut W) -> io::Result<()> {
    if records.is_empty() {
        return writeln!(out, "No references found.");
    }
    for r in records {
        writeln!(
            out,
            "Referenced by {} ({}) in {}:{}",
            r.name, r.kind, r.path, r.line
        )?;
        if let Some(snippet) = r.snippet.as_deref().filter(|s| !s.is_empty()) {
            for line in snippet.lines() {
                writeln!(out, "    {line}")?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::project::LifecycleState;

    fn widget() -> Record {
        Record {
            name: "Widget".to_string(),
            kind: "class".to_string(),
            path: "src/widget.py".to_string(),
            line: 10,
            snippet: None,
            language: None,
        }
    }

    fn rendered(outcome: &Outcome, format: OutputFormat) -> String {
        let mut out = Vec::new();
        render(outcome, format, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_json_records() {
        let outcome = Outcome::Records {
            action: Action::FindSymbol,
            records: vec![widget()],
        };
        assert_eq!(
            rendered(&outcome, OutputFormat::Json),
            "[{\"name\":\"Widget\",\"kind\":\"class\",\"path\":\"src/widget.py\",\"line\":10}]\n"
        );
    }

    #[test]
    fn test_json_empty_is_array() {
        let outcome = Outcome::Records {
            action: Action::References,
            records: Vec::new(),
        };
        assert_eq!(rendered(&outcome, OutputFormat::Json), "[]\n");
    }

    #[test]
    fn test_text_layouts() {
        let records = vec![widget()];

        let text = rendered(
            &Outcome::Records {
                action: Action::FindSymbol,
                records: records.clone(),
            },
            OutputFormat::Text,
        );
        assert_eq!(text, format!("{:<30} {:<15} src/widget.py:10\n", "Widget", "class"));

        let text = rendered(
            &Outcome::Records {
                action: Action::FileOverview,
                records,
            },
            OutputFormat::Text,
        );
        assert_eq!(text, format!("{:<15} {:<30} (line 10)\n", "class", "Widget"));
    }

    #[test]
    fn test_text_references_with_snippet() {
        let mut reference = widget();
        reference.name = "main".to_string();
        reference.kind = "function".to_string();
        reference.snippet = Some("w = Widget()\nw.show()".to_string());

        let text = rendered(
            &Outcome::Records {
                action: Action::References,
                records: vec![reference],
            },
            OutputFormat::Text,
        );
        assert_eq!(
            text,
            "Referenced by main (function) in src/widget.py:10\n    w = Widget()\n    w.show()\n"
        );
    }

    #[test]
    fn test_text_empty_messages() {
        for (action, expected) in [
            (Action::FindSymbol, "No symbols found.\n"),
            (Action::FileOverview, "No symbols found in file.\n"),
            (Action::References, "No references found.\n"),
        ] {
            let outcome = Outcome::Records {
                action,
                records: Vec::new(),
            };
            assert_eq!(rendered(&outcome, OutputFormat::Text), expected);
        }
    }

    #[test]
    fn test_project_outputs() {
        let outcome = Outcome::Project {
            action: Action::Status,
            project: ProjectRecord {
                root: "/repo".to_string(),
                state: LifecycleState::Uninitialized,
                initialized_at: None,
                indexed_at: None,
                engine_available: Some(false),
            },
        };

        assert_eq!(
            rendered(&outcome, OutputFormat::Text),
            "Project: /repo\nState: uninitialized\nEngine: not found\n"
        );
        assert_eq!(
            rendered(&outcome, OutputFormat::Json),
            "[{\"root\":\"/repo\",\"state\":\"uninitialized\",\"initialized_at\":null,\"indexed_at\":null,\"engine_available\":false}]\n"
        );
    }
}
