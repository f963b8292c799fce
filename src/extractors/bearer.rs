//! Extract the bearer token from the `Authorization` header.

use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

const BEARER_PREFIX: &str = "Bearer ";

/// Token from `Authorization: Bearer <token>`, if any. Never rejects; the
/// authorizer decides what a missing token means.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BearerToken(pub Option<String>);

impl BearerToken {
    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| {
                s.get(..BEARER_PREFIX.len())
                    .filter(|p| p.eq_ignore_ascii_case(BEARER_PREFIX))
                    .map(|_| &s[BEARER_PREFIX.len()..])
            })
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        Ok(BearerToken(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(header: Option<&str>) -> BearerToken {
        let mut builder = Request::builder();
        if let Some(h) = header {
            builder = builder.header(AUTHORIZATION, h);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        BearerToken::from_request_parts(&mut parts, &()).await.unwrap()
    }

    #[tokio::test]
    async fn reads_bearer_token() {
        assert_eq!(extract(Some("Bearer abc")).await, BearerToken(Some("abc".into())));
        assert_eq!(extract(Some("bearer  abc ")).await, BearerToken(Some("abc".into())));
    }

    #[tokio::test]
    async fn other_schemes_and_missing_header_are_none() {
        assert_eq!(extract(Some("Basic Zm9v")).await, BearerToken(None));
        assert_eq!(extract(Some("Bearer ")).await, BearerToken(None));
        assert_eq!(extract(None).await, BearerToken(None));
    }
}
