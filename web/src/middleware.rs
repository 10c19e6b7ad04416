//! Request correlation.
//!
//! Every request gets a [`CorrelationId`]: the caller's `X-Correlation-Id`
//! when it is a UUID, otherwise a fresh one. The id is stored in the request
//! extensions for handlers, attached to the `pgpal_request` span with the
//! caller's owner header, and returned on the response.

use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue},
    response::Response,
};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tracing::Instrument;
use uuid::Uuid;

use crate::extractors::{CorrelationId, OWNER_ID_HEADER};

/// Header carrying the correlation id in both directions.
pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

/// The caller-supplied correlation id, if it parses.
pub(crate) fn incoming_correlation_id(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get(CORRELATION_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|raw| Uuid::parse_str(raw.trim()).ok())
}

/// Layer applied once, outermost, by [`router`](crate::router).
#[must_use]
pub const fn correlation_id_layer() -> CorrelationLayer {
    CorrelationLayer
}

/// See the module docs.
#[derive(Clone, Copy, Debug)]
pub struct CorrelationLayer;

impl<S> Layer<S> for CorrelationLayer {
    type Service = Correlated<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Correlated { inner }
    }
}

/// Service produced by [`CorrelationLayer`].
#[derive(Clone, Debug)]
pub struct Correlated<S> {
    inner: S,
}

impl<S> Service<Request> for Correlated<S>
where
    S: Service<Request, Response = Response> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request) -> Self::Future {
        let id = incoming_correlation_id(req.headers()).unwrap_or_else(Uuid::new_v4);
        req.extensions_mut().insert(CorrelationId(id));

        let owner = req
            .headers()
            .get(OWNER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("-")
            .to_string();
        let span = tracing::info_span!(
            "pgpal_request",
            correlation_id = %id,
            owner = %owner,
            method = %req.method(),
            path = %req.uri().path(),
        );

        let response = self.inner.call(req);
        Box::pin(async move {
            let mut response = response.instrument(span).await?;
            if let Ok(value) = HeaderValue::from_str(&id.to_string()) {
                response.headers_mut().insert(CORRELATION_ID_HEADER, value);
            }
            Ok(response)
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::{Router, body::Body, routing::get};
    use tower::ServiceExt;

    async fn echoed(header: Option<&str>) -> (String, String) {
        let app = Router::new()
            .route("/", get(|CorrelationId(id): CorrelationId| async move { id.to_string() }))
            .layer(correlation_id_layer());

        let mut request = Request::builder().uri("/");
        if let Some(value) = header {
            request = request.header(CORRELATION_ID_HEADER, value);
        }
        let response = app
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap();

        let returned = response.headers()[CORRELATION_ID_HEADER]
            .to_str()
            .unwrap()
            .to_string();
        let seen = axum::body::to_bytes(response.into_body(), 64).await.unwrap();
        (returned, String::from_utf8(seen.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn caller_id_reaches_handler_and_response() {
        let id = Uuid::new_v4().to_string();

        let (returned, seen) = echoed(Some(&id)).await;

        assert_eq!(returned, id);
        assert_eq!(seen, id);
    }

    #[tokio::test]
    async fn unusable_id_is_replaced() {
        let (returned, seen) = echoed(Some("req-17")).await;

        assert!(Uuid::parse_str(&returned).is_ok());
        assert_eq!(returned, seen);
    }

    #[test]
    fn incoming_id_tolerates_padding() {
        let id = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        headers.insert(
            CORRELATION_ID_HEADER,
            HeaderValue::from_str(&format!(" {id} ")).unwrap(),
        );

        assert_eq!(incoming_correlation_id(&headers), Some(id));
        assert_eq!(incoming_correlation_id(&HeaderMap::new()), None);
    }
}
