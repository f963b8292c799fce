//! Aggregation files (`routes/mod.rs` and the `mod.rs` barrels).
//!
//! Files are read into a structured entry list with anchored line probes, then
//! missing lines are spliced in. Nothing already present is rewritten, so a
//! merge is idempotent and merging entities in any order yields the same set.

use super::{ArtifactKind, Layout};
use crate::error::GenerateError;
use crate::schema::ModelDescriptor;
use regex::Regex;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::OnceLock;

const INDEX_HEADER: &str = "// Maintained by scaffold. Entries are merged in; other edits are kept.\n";

fn import_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(?:pub\s+)?mod\s+((?:r#)?[A-Za-z_][A-Za-z0-9_]*)\s*;").expect("valid regex")
    })
}

fn registration_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"router\.nest\(\s*"([^"]*)"\s*,\s*((?:r#)?[A-Za-z_][A-Za-z0-9_]*)::routes\("#)
            .expect("valid regex")
    })
}

fn register_fn_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*pub\s+fn\s+register\s*\(").expect("valid regex"))
}

/// One entity as seen by an aggregation file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexEntry {
    /// Module identifier, e.g. `song` or `r#type`.
    pub module: String,
    /// Route prefix, e.g. `/songs`.
    pub prefix: String,
}

impl IndexEntry {
    pub fn for_model(model: &ModelDescriptor) -> Self {
        Self {
            module: model.module_ident(),
            prefix: model.route_prefix(),
        }
    }

    fn import_line(&self, kind: ArtifactKind) -> String {
        match kind {
            ArtifactKind::Route => format!("mod {};", self.module),
            _ => format!("pub mod {};", self.module),
        }
    }

    fn registration_line(&self) -> String {
        format!("    router = router.nest(\"{}\", {}::routes(ctx));", self.prefix, self.module)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MergeOutcome {
    Unchanged,
    Updated,
    Rebuilt,
}

/// Entries found in an aggregation file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IndexContents {
    pub imports: Vec<String>,
    /// `(prefix, module)` pairs.
    pub registrations: Vec<(String, String)>,
}

impl IndexContents {
    pub fn parse(text: &str) -> Self {
        let mut out = Self::default();
        for line in text.lines() {
            if let Some(c) = import_re().captures(line) {
                out.imports.push(c[1].to_string());
            }
            if let Some(c) = registration_re().captures(line) {
                out.registrations.push((c[1].to_string(), c[2].to_string()));
            }
        }
        out
    }

    pub fn has_import(&self, module: &str) -> bool {
        self.imports.iter().any(|m| m == module)
    }

    pub fn has_registration(&self, entry: &IndexEntry) -> bool {
        self.registrations
            .iter()
            .any(|(prefix, module)| *prefix == entry.prefix && *module == entry.module)
    }
}

/// The registry has no `register` function to splice into.
#[derive(Debug, PartialEq, Eq)]
pub struct MissingRegisterFn;

/// Full contents of an aggregation file for `entries`, in order.
pub fn render_full(kind: ArtifactKind, crate_ident: &str, entries: &[IndexEntry]) -> String {
    let mut out = String::from(INDEX_HEADER);
    out.push('\n');
    if kind == ArtifactKind::Route {
        out.push_str(&format!("use axum::Router;\nuse {}::state::RouteContext;\n\n", crate_ident));
    }
    for entry in entries {
        out.push_str(&entry.import_line(kind));
        out.push('\n');
    }
    if kind == ArtifactKind::Route {
        if !entries.is_empty() {
            out.push('\n');
        }
        out.push_str("#[allow(unused_mut, unused_variables)]\n");
        out.push_str("pub fn register(mut router: Router, ctx: &RouteContext) -> Router {\n");
        for entry in entries {
            out.push_str(&entry.registration_line());
            out.push('\n');
        }
        out.push_str("    router\n}\n");
    }
    out
}

/// Splice `entry` into `text`. `Ok(None)` when nothing is missing.
pub fn merge_text(
    text: &str,
    kind: ArtifactKind,
    entry: &IndexEntry,
) -> Result<Option<String>, MissingRegisterFn> {
    let contents = IndexContents::parse(text);
    let mut lines: Vec<String> = text.lines().map(str::to_string).collect();
    let fn_line = lines.iter().position(|l| register_fn_re().is_match(l));

    let needs_registration = kind == ArtifactKind::Route && !contents.has_registration(entry);
    let needs_import = !contents.has_import(&entry.module);
    if kind == ArtifactKind::Route && fn_line.is_none() {
        return Err(MissingRegisterFn);
    }
    if !needs_registration && !needs_import {
        return Ok(None);
    }

    // Registration first: it sits below every import, so import positions stay valid.
    if needs_registration {
        if let Some(at) = fn_line {
            lines.insert(at + 1, entry.registration_line());
        }
    }

    if needs_import {
        let last_import = lines.iter().rposition(|l| import_re().is_match(l));
        match (last_import, fn_line) {
            (Some(at), _) => lines.insert(at + 1, entry.import_line(kind)),
            (None, Some(at)) => {
                let mut at = at;
                while at > 0 && lines[at - 1].trim_start().starts_with("#[") {
                    at -= 1;
                }
                lines.insert(at, String::new());
                lines.insert(at, entry.import_line(kind));
            }
            (None, None) => {
                while lines.last().is_some_and(|l| l.trim().is_empty()) {
                    lines.pop();
                }
                if !lines.is_empty() {
                    lines.push(String::new());
                }
                lines.push(entry.import_line(kind));
            }
        }
    }

    let mut out = lines.join("\n");
    out.push('\n');
    Ok(Some(out))
}

/// Reads and writes aggregation files under a layout.
pub struct IndexMaintainer<'a> {
    layout: &'a Layout,
}

impl<'a> IndexMaintainer<'a> {
    pub fn new(layout: &'a Layout) -> Self {
        Self { layout }
    }

    /// Merge one entity; falls back to a rebuild from `all` when the file is unreadable or malformed.
    pub fn merge(
        &self,
        kind: ArtifactKind,
        entry: &IndexEntry,
        all: &[IndexEntry],
    ) -> Result<MergeOutcome, GenerateError> {
        let path = self.layout.index(kind);
        let existing = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => render_full(kind, self.layout.crate_ident(), &[]),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "index unreadable, rebuilding");
                self.rebuild(kind, all)?;
                return Ok(MergeOutcome::Rebuilt);
            }
        };
        match merge_text(&existing, kind, entry) {
            Ok(None) => {
                tracing::debug!(path = %path.display(), module = %entry.module, "index already up to date");
                Ok(MergeOutcome::Unchanged)
            }
            Ok(Some(text)) => {
                write(&path, &text)?;
                tracing::info!(path = %path.display(), module = %entry.module, "index updated");
                Ok(MergeOutcome::Updated)
            }
            Err(MissingRegisterFn) => {
                tracing::warn!(path = %path.display(), "registry has no register fn, rebuilding");
                self.rebuild(kind, all)?;
                Ok(MergeOutcome::Rebuilt)
            }
        }
    }

    pub fn rebuild(&self, kind: ArtifactKind, all: &[IndexEntry]) -> Result<(), GenerateError> {
        let path = self.layout.index(kind);
        write(&path, &render_full(kind, self.layout.crate_ident(), all))?;
        tracing::info!(path = %path.display(), entries = all.len(), "index rebuilt");
        Ok(())
    }
}

fn write(path: &Path, text: &str) -> Result<(), GenerateError> {
    std::fs::write(path, text).map_err(|e| GenerateError::io(path, e))
}
