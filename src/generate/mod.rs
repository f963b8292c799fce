//! Scaffolding generator: schema in, per-entity modules and aggregation files out.

pub mod emit;
mod index;
mod layout;

pub use index::{
    merge_text, render_full, IndexContents, IndexEntry, IndexMaintainer, MergeOutcome, MissingRegisterFn,
};
pub use layout::{ArtifactKind, GeneratedArtifact, Layout};

use crate::error::GenerateError;
use crate::schema::{parse_schema, ModelDescriptor};
use crate::settings::GeneratorSettings;
use std::path::PathBuf;

/// What a run did. Per-model failures do not abort the batch; they are listed here.
#[derive(Debug, Default)]
pub struct GenerationReport {
    pub generated: Vec<PathBuf>,
    /// Route files left untouched because they already existed.
    pub skipped_routes: Vec<PathBuf>,
    pub failed: Vec<(String, GenerateError)>,
}

impl GenerationReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct Generator {
    settings: GeneratorSettings,
    layout: Layout,
}

impl Generator {
    pub fn new(settings: GeneratorSettings) -> Self {
        let layout = Layout::new(&settings.out_dir, &settings.crate_name);
        Self { settings, layout }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Generate one entity (matched case-insensitively) or, with `None`, every model.
    pub fn run(&self, entity: Option<&str>) -> Result<GenerationReport, GenerateError> {
        let models = parse_schema(&self.settings.schema_path)?;
        let selected: Vec<&ModelDescriptor> = match entity {
            Some(name) => {
                let found: Vec<&ModelDescriptor> =
                    models.iter().filter(|m| m.name.eq_ignore_ascii_case(name)).collect();
                if found.is_empty() {
                    return Err(GenerateError::ModelNotFound(name.to_string()));
                }
                found
            }
            None => models.iter().collect(),
        };
        self.layout.ensure_dirs()?;
        tracing::info!(
            schema = %self.settings.schema_path.display(),
            out = %self.layout.root().display(),
            models = selected.len(),
            "generating"
        );

        let mut report = GenerationReport::default();
        for model in &selected {
            if let Err(e) = self.generate_model(model, &mut report) {
                tracing::error!(model = %model.name, error = %e, "generation failed");
                report.failed.push((model.name.clone(), e));
            }
        }

        let all: Vec<IndexEntry> = models.iter().map(IndexEntry::for_model).collect();
        let indexes = IndexMaintainer::new(&self.layout);
        match entity {
            Some(_) => {
                for model in &selected {
                    let entry = IndexEntry::for_model(model);
                    for kind in ArtifactKind::ALL {
                        if let Err(e) = indexes.merge(kind, &entry, &all) {
                            tracing::error!(model = %model.name, error = %e, "index merge failed");
                            report.failed.push((model.name.clone(), e));
                        }
                    }
                }
            }
            None => {
                for kind in ArtifactKind::ALL {
                    indexes.rebuild(kind, &all)?;
                }
            }
        }
        Ok(report)
    }

    fn generate_model(
        &self,
        model: &ModelDescriptor,
        report: &mut GenerationReport,
    ) -> Result<(), GenerateError> {
        let artifacts = [
            emit::access::emit(model, &self.layout),
            emit::service::emit(model, &self.layout),
            emit::schema::emit(model, &self.layout),
        ];
        for artifact in artifacts {
            write_artifact(&artifact)?;
            report.generated.push(artifact.path);
        }

        let route = emit::route::emit(model, &self.layout);
        if route.path.exists() {
            tracing::info!(path = %route.path.display(), "route file exists, skipping");
            report.skipped_routes.push(route.path);
        } else {
            write_artifact(&route)?;
            report.generated.push(route.path);
        }
        Ok(())
    }
}

fn write_artifact(artifact: &GeneratedArtifact) -> Result<(), GenerateError> {
    std::fs::write(&artifact.path, &artifact.contents).map_err(|e| GenerateError::io(&artifact.path, e))?;
    tracing::info!(path = %artifact.path.display(), "generated");
    Ok(())
}
