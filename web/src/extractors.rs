//! Custom Axum extractors.
//!
//! - [`OwnerIdentity`]: the authenticated owner, from `X-Owner-Id`
//! - [`CorrelationId`]: the id the correlation middleware assigned
//!
//! Authentication itself happens upstream; by the time a request reaches
//! this service the gateway has verified the caller and set `X-Owner-Id`.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use pgpal_core::OwnerId;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::incoming_correlation_id;

/// Header carrying the authenticated owner's id.
pub const OWNER_ID_HEADER: &str = "x-owner-id";

/// The owner on whose behalf the request runs.
///
/// Rejects with 401 when the header is missing or not a UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnerIdentity(pub OwnerId);

#[async_trait]
impl<S> FromRequestParts<S> for OwnerIdentity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(OWNER_ID_HEADER)
            .ok_or_else(|| AppError::unauthorized("Missing owner identity"))?;

        raw.to_str()
            .ok()
            .and_then(|s| Uuid::parse_str(s.trim()).ok())
            .map(|uuid| Self(OwnerId::from_uuid(uuid)))
            .ok_or_else(|| AppError::unauthorized("Malformed owner identity"))
    }
}

/// Correlation id of the current request.
///
/// Set by [`correlation_id_layer`](crate::middleware::correlation_id_layer).
/// Outside that layer the caller's header is used, or a fresh UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorrelationId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(id) = parts.extensions.get::<Self>() {
            return Ok(*id);
        }
        Ok(Self(
            incoming_correlation_id(&parts.headers).unwrap_or_else(Uuid::new_v4),
        ))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::middleware::CORRELATION_ID_HEADER;
    use axum::http::{Request, StatusCode};

    fn parts_with(header: Option<(&str, &str)>) -> Parts {
        let mut builder = Request::builder().uri("/");
        if let Some((name, value)) = header {
            builder = builder.header(name, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn test_owner_identity_from_header() {
        let owner = Uuid::new_v4();
        let mut parts = parts_with(Some((OWNER_ID_HEADER, &owner.to_string())));

        let identity = OwnerIdentity::from_request_parts(&mut parts, &()).await;

        assert_eq!(identity.ok(), Some(OwnerIdentity(OwnerId::from_uuid(owner))));
    }

    #[tokio::test]
    async fn test_missing_owner_is_unauthorized() {
        let mut parts = parts_with(None);

        let rejection = OwnerIdentity::from_request_parts(&mut parts, &()).await;

        assert!(matches!(rejection, Err(ref e) if e.status() == StatusCode::UNAUTHORIZED));
    }

    #[tokio::test]
    async fn test_malformed_owner_is_unauthorized() {
        let mut parts = parts_with(Some((OWNER_ID_HEADER, "owner-42")));

        let rejection = OwnerIdentity::from_request_parts(&mut parts, &()).await;

        assert!(matches!(rejection, Err(ref e) if e.status() == StatusCode::UNAUTHORIZED));
    }

    #[tokio::test]
    async fn test_correlation_id_prefers_extension() {
        let stored = Uuid::new_v4();
        let mut parts = parts_with(Some((CORRELATION_ID_HEADER, &Uuid::new_v4().to_string())));
        parts.extensions.insert(CorrelationId(stored));

        let CorrelationId(id) = CorrelationId::from_request_parts(&mut parts, &()).await.unwrap();

        assert_eq!(id, stored);
    }

    #[tokio::test]
    async fn test_correlation_id_generates_new() {
        let mut parts = parts_with(None);

        let CorrelationId(id) = CorrelationId::from_request_parts(&mut parts, &()).await.unwrap();

        assert!(!id.is_nil());
    }
}
