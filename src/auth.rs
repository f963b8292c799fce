//! Authorization hook for entity routes.
//!
//! Token issuance and verification against an identity provider live outside
//! this crate; plug them in by implementing [`Authorizer`].

use crate::error::AppError;
use crate::extractors::BearerToken;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

pub trait Authorizer: Send + Sync {
    fn authorize(&self, token: &BearerToken) -> Result<(), AppError>;
}

/// Lets every request through.
#[derive(Clone, Copy, Debug, Default)]
pub struct AllowAll;

impl Authorizer for AllowAll {
    fn authorize(&self, _token: &BearerToken) -> Result<(), AppError> {
        Ok(())
    }
}

/// Accepts exactly one pre-shared bearer token.
#[derive(Clone, Debug)]
pub struct StaticBearer {
    token: String,
}

impl StaticBearer {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }
}

impl Authorizer for StaticBearer {
    fn authorize(&self, token: &BearerToken) -> Result<(), AppError> {
        match token.as_deref() {
            Some(t) if t == self.token => Ok(()),
            _ => Err(AppError::Unauthorized),
        }
    }
}

/// Middleware for `route_layer(middleware::from_fn_with_state(authorizer, require_auth))`.
pub async fn require_auth(
    State(authorizer): State<Arc<dyn Authorizer>>,
    token: BearerToken,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if let Err(e) = authorizer.authorize(&token) {
        tracing::debug!(path = %request.uri().path(), "request rejected by authorizer");
        return Err(e);
    }
    Ok(next.run(request).await)
}
