//! Payment endpoints.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use pgpal_core::{Payment, PaymentId, PropertyId};
use pgpal_runtime::{DuesReport, Trigger};
use serde::Deserialize;

use crate::error::AppError;
use crate::extractors::{CorrelationId, OwnerIdentity};
use crate::state::AppState;

/// Query of `GET /api/payments/outstanding`.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutstandingQuery {
    /// Limit the listing to one property
    pub property_id: Option<PropertyId>,
}

/// `POST /api/payments/generate-dues`
///
/// Runs the dues generator now. Waits for a scheduled run already in
/// progress, then bills whatever that run left.
///
/// # Errors
///
/// Internal error if the tenant list cannot be read.
pub async fn generate_dues(
    State(state): State<AppState>,
    OwnerIdentity(owner_id): OwnerIdentity,
    CorrelationId(correlation_id): CorrelationId,
) -> Result<(StatusCode, Json<DuesReport>), AppError> {
    tracing::info!(requested_by = %owner_id, %correlation_id, "Manual dues run requested");
    let report = state.runner.run(Trigger::Manual).await?;
    tracing::info!(%correlation_id, created = report.created, "Manual dues run finished");
    Ok((StatusCode::CREATED, Json(report)))
}

/// `GET /api/payments/outstanding[?propertyId=]`
///
/// The owner's unpaid dues, oldest first.
///
/// # Errors
///
/// Not found or forbidden when a property filter names someone else's
/// property.
pub async fn outstanding_payments(
    State(state): State<AppState>,
    OwnerIdentity(owner_id): OwnerIdentity,
    Query(query): Query<OutstandingQuery>,
) -> Result<Json<Vec<Payment>>, AppError> {
    let payments = state
        .lifecycle
        .outstanding_payments(owner_id, query.property_id)
        .await?;
    Ok(Json(payments))
}

/// `PUT /api/payments/:id/mark-paid`
///
/// # Errors
///
/// Not found, forbidden, or `ALREADY_PAID`.
pub async fn mark_paid(
    State(state): State<AppState>,
    OwnerIdentity(owner_id): OwnerIdentity,
    Path(payment_id): Path<PaymentId>,
) -> Result<Json<Payment>, AppError> {
    let payment = state.lifecycle.mark_paid(owner_id, payment_id).await?;
    Ok(Json(payment))
}
