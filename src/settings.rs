//! Environment-backed settings for the generator and the runtime server.
//! Callers load `.env` with `dotenvy` before reading these.

use crate::auth::{AllowAll, Authorizer, StaticBearer};
use crate::store::DEFAULT_PG_SCHEMA;
use std::path::PathBuf;
use std::sync::Arc;

pub const DEFAULT_SCHEMA_PATH: &str = "schema.json";
pub const DEFAULT_OUT_DIR: &str = "src";
pub const DEFAULT_CRATE_NAME: &str = "scaffold_sdk";
pub const DEFAULT_PORT: u16 = 3000;

fn var(key: &str) -> Option<String> {
    std::env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn flag(key: &str) -> bool {
    var(key)
        .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratorSettings {
    pub schema_path: PathBuf,
    pub out_dir: PathBuf,
    /// Crate whose runtime the generated code imports.
    pub crate_name: String,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            schema_path: PathBuf::from(DEFAULT_SCHEMA_PATH),
            out_dir: PathBuf::from(DEFAULT_OUT_DIR),
            crate_name: DEFAULT_CRATE_NAME.to_string(),
        }
    }
}

impl GeneratorSettings {
    /// `SCAFFOLD_SCHEMA`, `SCAFFOLD_OUT_DIR`, `SCAFFOLD_CRATE_NAME`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            schema_path: var("SCAFFOLD_SCHEMA").map(PathBuf::from).unwrap_or(defaults.schema_path),
            out_dir: var("SCAFFOLD_OUT_DIR").map(PathBuf::from).unwrap_or(defaults.out_dir),
            crate_name: var("SCAFFOLD_CRATE_NAME").unwrap_or(defaults.crate_name),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ServerSettings {
    /// No URL means the in-memory store.
    pub database_url: Option<String>,
    pub pg_schema: String,
    pub host: String,
    pub port: u16,
    pub auth_enabled: bool,
    pub auth_token: Option<String>,
    pub schema_path: PathBuf,
}

impl ServerSettings {
    pub fn from_env() -> Self {
        Self {
            database_url: var("DATABASE_URL"),
            pg_schema: var("SCAFFOLD_PG_SCHEMA").unwrap_or_else(|| DEFAULT_PG_SCHEMA.to_string()),
            host: var("APP_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: var("APP_PORT").and_then(|p| p.parse().ok()).unwrap_or(DEFAULT_PORT),
            auth_enabled: flag("AUTH_ENABLED"),
            auth_token: var("AUTH_TOKEN"),
            schema_path: var("SCAFFOLD_SCHEMA")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SCHEMA_PATH)),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Static bearer check when auth is enabled and a token is set; otherwise allow all.
    pub fn authorizer(&self) -> Arc<dyn Authorizer> {
        match (self.auth_enabled, &self.auth_token) {
            (true, Some(token)) => Arc::new(StaticBearer::new(token.clone())),
            (true, None) => {
                tracing::warn!("AUTH_ENABLED is set without AUTH_TOKEN; requests are not checked");
                Arc::new(AllowAll)
            }
            (false, _) => Arc::new(AllowAll),
        }
    }
}
