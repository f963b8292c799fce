//! Output tree layout: one directory per artifact kind under the output root.

use crate::error::GenerateError;
use std::path::{Path, PathBuf};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    Access,
    Service,
    Schema,
    Route,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 4] = [
        ArtifactKind::Access,
        ArtifactKind::Service,
        ArtifactKind::Schema,
        ArtifactKind::Route,
    ];

    pub fn dir_name(self) -> &'static str {
        match self {
            ArtifactKind::Access => "access",
            ArtifactKind::Service => "services",
            ArtifactKind::Schema => "schemas",
            ArtifactKind::Route => "routes",
        }
    }
}

/// A file the generator writes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratedArtifact {
    pub path: PathBuf,
    pub contents: String,
}

#[derive(Clone, Debug)]
pub struct Layout {
    root: PathBuf,
    crate_ident: String,
}

impl Layout {
    /// `crate_name` may use dashes; generated `use` paths need the underscore form.
    pub fn new(root: impl Into<PathBuf>, crate_name: &str) -> Self {
        Self {
            root: root.into(),
            crate_ident: crate_name.replace('-', "_"),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn crate_ident(&self) -> &str {
        &self.crate_ident
    }

    pub fn dir(&self, kind: ArtifactKind) -> PathBuf {
        self.root.join(kind.dir_name())
    }

    /// Per-entity file, named after the lower-cased model.
    pub fn file(&self, kind: ArtifactKind, module_name: &str) -> PathBuf {
        self.dir(kind).join(format!("{}.rs", module_name))
    }

    /// Aggregation file of a directory.
    pub fn index(&self, kind: ArtifactKind) -> PathBuf {
        self.dir(kind).join("mod.rs")
    }

    pub fn ensure_dirs(&self) -> Result<(), GenerateError> {
        for kind in ArtifactKind::ALL {
            let dir = self.dir(kind);
            std::fs::create_dir_all(&dir).map_err(|e| GenerateError::io(&dir, e))?;
        }
        Ok(())
    }
}
