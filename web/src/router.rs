//! Route table.

use axum::{
    Router,
    routing::{delete, get, post, put},
};
use tower_http::trace::TraceLayer;

use crate::handlers::{beds, health_check, payments, tenants};
use crate::middleware::correlation_id_layer;
use crate::state::AppState;

/// Build the application router.
///
/// `/health` is open; everything under `/api` requires `X-Owner-Id`.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/tenants", post(tenants::create_tenant))
        .route("/tenants/:id", put(tenants::update_tenant))
        .route("/tenants/:id/vacate", put(tenants::vacate_tenant))
        .route("/tenants/:id/transfer", put(tenants::transfer_tenant))
        .route("/tenants/:id/payments", get(tenants::payment_history))
        .route("/beds/reset-statuses", post(beds::reset_statuses))
        .route("/beds/:id", delete(beds::delete_bed))
        .route("/payments/generate-dues", post(payments::generate_dues))
        .route("/payments/outstanding", get(payments::outstanding_payments))
        .route("/payments/:id/mark-paid", put(payments::mark_paid));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(correlation_id_layer())
        .with_state(state)
}
