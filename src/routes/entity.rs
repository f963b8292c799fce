//! Entity routes. `entity_router` wires the seven endpoints for one record type;
//! `api_routes` mounts an untyped router per entity of a resolved model.

use crate::access::{DataAccess, Record};
use crate::auth::{require_auth, Authorizer};
use crate::handlers::entity::{create, delete, export, find, list, read, search, update};
use crate::schema::ResolvedModel;
use crate::service::{EntitySchemas, Service};
use crate::state::{EntityState, RouteContext};
use axum::{middleware, routing::get, Router};
use serde_json::Value;
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;

/// Request bodies above this are rejected before reaching a handler.
pub const BODY_LIMIT_BYTES: usize = 2 * 1024 * 1024;

pub fn entity_router<T: Record>(
    service: Service<T>,
    schemas: EntitySchemas,
    authorizer: Arc<dyn Authorizer>,
) -> Router {
    Router::new()
        .route("/", get(list::<T>).post(create::<T>))
        .route("/export/:format", get(export::<T>))
        .route("/search", get(search::<T>))
        .route("/find", get(find::<T>))
        .route("/:id", get(read::<T>).put(update::<T>).delete(delete::<T>))
        .route_layer(middleware::from_fn_with_state(authorizer, require_auth))
        .with_state(EntityState::new(service, schemas))
}

/// One `/{segment}` router per entity, records handled as plain JSON.
pub fn api_routes(ctx: &RouteContext, model: &ResolvedModel) -> Router {
    let mut router = Router::new();
    for entity in &model.entities {
        let service: Service<Value> = Service::new(DataAccess::new(ctx.store(), entity.meta.clone()));
        tracing::debug!(entity = %entity.meta.name, path = %entity.path_segment, "mounting entity routes");
        router = router.nest(
            &format!("/{}", entity.path_segment),
            entity_router(service, entity.schemas.clone(), ctx.authorizer()),
        );
    }
    router.layer(RequestBodyLimitLayer::new(BODY_LIMIT_BYTES))
}
