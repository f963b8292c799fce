//! Example consumer: serves every model of a schema under `/v1` without generated code.
//!
//! Run from repo root: `cargo run -p example-consumer`
//! Uses PostgreSQL when `DATABASE_URL` is set, an in-memory store otherwise.

use scaffold_sdk::{
    api_routes, common_routes, ensure_database_exists, parse_schema, resolve, MemoryStore, PgStore,
    RecordStore, RouteContext, ServerSettings,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::TcpListener;

fn schema_path(settings: &ServerSettings) -> PathBuf {
    if settings.schema_path.exists() {
        settings.schema_path.clone()
    } else {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("schema.json")
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("scaffold_sdk=info,example_consumer=info")),
        )
        .init();

    let settings = ServerSettings::from_env();
    let models = parse_schema(&schema_path(&settings))?;
    let model = resolve(&models);

    let store: Arc<dyn RecordStore> = match &settings.database_url {
        Some(url) => {
            ensure_database_exists(url).await?;
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(5)
                .connect(url)
                .await?;
            let pg = PgStore::new(pool, settings.pg_schema.clone());
            pg.ensure_collections(model.entities.iter().map(|e| e.meta.collection.clone()))
                .await?;
            Arc::new(pg)
        }
        None => {
            tracing::info!("DATABASE_URL not set, using the in-memory store");
            Arc::new(MemoryStore::new())
        }
    };

    let ctx = RouteContext::new(store.clone(), settings.authorizer());
    let app = axum::Router::new()
        .merge(common_routes(store))
        .nest("/v1", api_routes(&ctx, &model));

    let listener = TcpListener::bind(settings.bind_addr()).await?;
    tracing::info!(
        addr = %listener.local_addr()?,
        entities = model.entities.len(),
        "example consumer listening"
    );
    axum::serve(listener, app).await?;
    Ok(())
}
