//! Axum HTTP surface for PG-Pal.
//!
//! Thin handlers over `pgpal-runtime`: each one extracts the owner identity
//! and the request body, calls one lifecycle or runner operation, and maps
//! the result to JSON. Every failure goes through [`AppError`], so the
//! status codes are decided in one place.
//!
//! # Request Flow
//!
//! 1. **Correlation id** is read or generated and attached to a span
//! 2. **Owner identity** is extracted from `X-Owner-Id` (401 if absent)
//! 3. **Operation** runs in its own store transaction
//! 4. **Result** is serialised, or the error mapped to 403/404/409/422/500
//!
//! # Example
//!
//! ```ignore
//! use pgpal_web::{AppState, router};
//!
//! let app = router(AppState::new(lifecycle, runner));
//! axum::serve(listener, app).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use error::AppError;
pub use extractors::{CorrelationId, OWNER_ID_HEADER, OwnerIdentity};
pub use middleware::{CORRELATION_ID_HEADER, correlation_id_layer};
pub use router::router;
pub use state::AppState;
