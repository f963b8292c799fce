//! Router builders.

mod common;
mod entity;

pub use common::common_routes;
pub use entity::{api_routes, entity_router, BODY_LIMIT_BYTES};
