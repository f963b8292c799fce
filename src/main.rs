//! `scaffold [ENTITY] [--schema PATH] [--out DIR] [--crate-name NAME]`
//!
//! Generates access, service, schema and route modules for one entity, or for
//! every model when ENTITY is omitted.

use clap::Parser;
use scaffold_sdk::{GeneratorSettings, Generator};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "scaffold", version, about = "Generate CRUD modules from a data-model schema")]
struct Cli {
    /// Model to generate (case-insensitive). Omit to generate every model.
    entity: Option<String>,

    /// Schema JSON file [env: SCAFFOLD_SCHEMA, default: schema.json]
    #[arg(long)]
    schema: Option<PathBuf>,

    /// Output root for the generated directories [env: SCAFFOLD_OUT_DIR, default: src]
    #[arg(long)]
    out: Option<PathBuf>,

    /// Crate the generated code imports the runtime from [env: SCAFFOLD_CRATE_NAME]
    #[arg(long)]
    crate_name: Option<String>,
}

impl Cli {
    fn settings(self) -> (GeneratorSettings, Option<String>) {
        let env = GeneratorSettings::from_env();
        let settings = GeneratorSettings {
            schema_path: self.schema.unwrap_or(env.schema_path),
            out_dir: self.out.unwrap_or(env.out_dir),
            crate_name: self.crate_name.unwrap_or(env.crate_name),
        };
        (settings, self.entity)
    }
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("scaffold_sdk=info,scaffold=info")),
        )
        .init();

    let (settings, entity) = Cli::parse().settings();
    match Generator::new(settings).run(entity.as_deref()) {
        Ok(report) => {
            tracing::info!(
                generated = report.generated.len(),
                skipped_routes = report.skipped_routes.len(),
                failed = report.failed.len(),
                "done"
            );
            for (model, err) in &report.failed {
                tracing::error!(model = %model, error = %err, "not generated");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "generation aborted");
            ExitCode::FAILURE
        }
    }
}
