//! Shared state for generated and generic entity routes.

use crate::auth::Authorizer;
use crate::service::{EntitySchemas, Service};
use crate::store::RecordStore;
use serde_json::Value;
use std::sync::Arc;

/// What every route module needs at registration: the injected store and the auth hook.
#[derive(Clone)]
pub struct RouteContext {
    store: Arc<dyn RecordStore>,
    authorizer: Arc<dyn Authorizer>,
}

impl RouteContext {
    pub fn new(store: Arc<dyn RecordStore>, authorizer: Arc<dyn Authorizer>) -> Self {
        Self { store, authorizer }
    }

    pub fn store(&self) -> Arc<dyn RecordStore> {
        self.store.clone()
    }

    pub fn authorizer(&self) -> Arc<dyn Authorizer> {
        self.authorizer.clone()
    }
}

/// Per-entity router state.
pub struct EntityState<T = Value> {
    pub service: Arc<Service<T>>,
    pub schemas: Arc<EntitySchemas>,
}

impl<T> Clone for EntityState<T> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            schemas: self.schemas.clone(),
        }
    }
}

impl<T> EntityState<T> {
    pub fn new(service: Service<T>, schemas: EntitySchemas) -> Self {
        Self {
            service: Arc::new(service),
            schemas: Arc::new(schemas),
        }
    }
}
