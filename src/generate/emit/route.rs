//! Route module. Written once; later runs leave it alone so hand edits survive.

use super::access::record_type;
use super::header;
use crate::generate::{ArtifactKind, GeneratedArtifact, Layout};
use crate::schema::ModelDescriptor;

pub fn emit(model: &ModelDescriptor, layout: &Layout) -> GeneratedArtifact {
    let krate = layout.crate_ident();
    let module = model.module_ident();
    let record = record_type(model);
    let contents = format!(
        "{header}
use axum::{{middleware, routing::get, Router}};
use {krate}::auth::require_auth;
use {krate}::handlers::entity;
use {krate}::state::{{EntityState, RouteContext}};

use crate::access::{module}::{record};
use crate::schemas::{module}::schemas;
use crate::services::{module}::service;

pub fn routes(ctx: &RouteContext) -> Router {{
    let state = EntityState::new(service(ctx.store()), schemas());
    Router::new()
        .route(\"/\", get(entity::list::<{record}>).post(entity::create::<{record}>))
        .route(\"/export/:format\", get(entity::export::<{record}>))
        .route(\"/search\", get(entity::search::<{record}>))
        .route(\"/find\", get(entity::find::<{record}>))
        .route(
            \"/:id\",
            get(entity::read::<{record}>)
                .put(entity::update::<{record}>)
                .delete(entity::delete::<{record}>),
        )
        .route_layer(middleware::from_fn_with_state(ctx.authorizer(), require_auth))
        .with_state(state)
}}
",
        header = header(model, "Created once; edit freely."),
    );
    GeneratedArtifact {
        path: layout.file(ArtifactKind::Route, &model.module_name()),
        contents,
    }
}
