//! Bed endpoints.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use pgpal_core::BedId;
use serde::Serialize;

use crate::error::AppError;
use crate::extractors::OwnerIdentity;
use crate::state::AppState;

/// Response of `POST /api/beds/reset-statuses`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetStatusesResponse {
    /// Beds moved back to `Available`
    pub beds_reset: usize,
}

/// `DELETE /api/beds/:id`
///
/// # Errors
///
/// Not found, forbidden, or `BED_IN_USE` while a tenant holds the bed.
pub async fn delete_bed(
    State(state): State<AppState>,
    OwnerIdentity(owner_id): OwnerIdentity,
    Path(bed_id): Path<BedId>,
) -> Result<StatusCode, AppError> {
    state.lifecycle.delete_bed(owner_id, bed_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/beds/reset-statuses`
///
/// # Errors
///
/// Internal error if the store fails.
pub async fn reset_statuses(
    State(state): State<AppState>,
    OwnerIdentity(owner_id): OwnerIdentity,
) -> Result<Json<ResetStatusesResponse>, AppError> {
    let beds_reset = state.lifecycle.reconcile_beds(owner_id).await?;
    Ok(Json(ResetStatusesResponse { beds_reset }))
}
