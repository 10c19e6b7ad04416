//! Tenant endpoints.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use pgpal_core::{BedId, Payment, Tenant, TenantId};
use pgpal_runtime::{CreatedTenant, NewTenant, TenantUpdate};
use serde::Deserialize;

use crate::error::AppError;
use crate::extractors::OwnerIdentity;
use crate::state::AppState;

/// Body of `PUT /api/tenants/:id/transfer`.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    /// Bed to move the tenant to
    pub new_bed_id: BedId,
}

/// `POST /api/tenants`
///
/// # Errors
///
/// Any [`LifecycleError`](pgpal_core::LifecycleError) from the create,
/// mapped by [`AppError`].
pub async fn create_tenant(
    State(state): State<AppState>,
    OwnerIdentity(owner_id): OwnerIdentity,
    Json(body): Json<NewTenant>,
) -> Result<(StatusCode, Json<CreatedTenant>), AppError> {
    let created = state.lifecycle.create_tenant(owner_id, body).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// `PUT /api/tenants/:id`
///
/// # Errors
///
/// Validation, not found, forbidden, `DUPLICATE_PHONE` or
/// `DUPLICATE_EMAIL`.
pub async fn update_tenant(
    State(state): State<AppState>,
    OwnerIdentity(owner_id): OwnerIdentity,
    Path(tenant_id): Path<TenantId>,
    Json(body): Json<TenantUpdate>,
) -> Result<Json<Tenant>, AppError> {
    let tenant = state.lifecycle.update_tenant(owner_id, tenant_id, body).await?;
    Ok(Json(tenant))
}

/// `PUT /api/tenants/:id/vacate`
///
/// # Errors
///
/// Not found, forbidden, or `ALREADY_VACATED`.
pub async fn vacate_tenant(
    State(state): State<AppState>,
    OwnerIdentity(owner_id): OwnerIdentity,
    Path(tenant_id): Path<TenantId>,
) -> Result<Json<Tenant>, AppError> {
    let tenant = state.lifecycle.vacate_tenant(owner_id, tenant_id).await?;
    Ok(Json(tenant))
}

/// `PUT /api/tenants/:id/transfer`
///
/// # Errors
///
/// Not found, forbidden, `BED_OCCUPIED` or `ALREADY_VACATED`.
pub async fn transfer_tenant(
    State(state): State<AppState>,
    OwnerIdentity(owner_id): OwnerIdentity,
    Path(tenant_id): Path<TenantId>,
    Json(body): Json<TransferRequest>,
) -> Result<Json<Tenant>, AppError> {
    let tenant = state
        .lifecycle
        .transfer_tenant(owner_id, tenant_id, body.new_bed_id)
        .await?;
    Ok(Json(tenant))
}

/// `GET /api/tenants/:id/payments`
///
/// # Errors
///
/// Not found or forbidden.
pub async fn payment_history(
    State(state): State<AppState>,
    OwnerIdentity(owner_id): OwnerIdentity,
    Path(tenant_id): Path<TenantId>,
) -> Result<Json<Vec<Payment>>, AppError> {
    let payments = state.lifecycle.payment_history(owner_id, tenant_id).await?;
    Ok(Json(payments))
}
