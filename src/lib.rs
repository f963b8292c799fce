//! Scaffold SDK: schema-driven CRUD scaffolding generator and the generic runtime
//! (data access, service, HTTP surface) that generated modules build on.

pub mod access;
pub mod auth;
pub mod case;
pub mod error;
pub mod export;
pub mod extractors;
pub mod generate;
pub mod handlers;
pub mod response;
pub mod routes;
pub mod schema;
pub mod service;
pub mod settings;
pub mod sql;
pub mod state;
pub mod store;

pub use access::{DataAccess, EntityMeta, ExportOptions, Page, Record, RelationMeta, SearchOptions};
pub use auth::{AllowAll, Authorizer, StaticBearer};
pub use error::{AppError, GenerateError, StoreError};
pub use export::{Export, ExportFormat};
pub use generate::{GenerationReport, Generator};
pub use response::{success_one, success_one_ok};
pub use routes::{api_routes, common_routes, entity_router};
pub use schema::{parse_schema, resolve, ModelDescriptor, ResolvedEntity, ResolvedModel};
pub use service::{EntitySchemas, RouteSchema, SearchOutcome, SearchParams, Service};
pub use settings::{GeneratorSettings, ServerSettings};
pub use state::{EntityState, RouteContext};
pub use store::{ensure_database_exists, MemoryStore, PgStore, RecordStore};
