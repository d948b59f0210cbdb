use axum::{
    extract::{Query, State},
    Json,
};
use service_core::error::AppError;
use validator::Validate;

use crate::dtos::{AggregateRequest, ComputeResponse, UserCurrencyQuery};
use crate::models::{AggregateResult, InvoiceAggregateRecord, InvoicePayload, InvoiceStatistics};
use crate::services::compute_payload;
use crate::startup::AppState;

/// Validate a payload and return its annotated items and computed totals.
pub async fn compute_invoice(
    Json(payload): Json<InvoicePayload>,
) -> Result<Json<ComputeResponse>, AppError> {
    let (items, result) = compute_payload(&payload)?;

    tracing::info!(
        items = items.len(),
        total = %result.total,
        total_overridden = result.total_overridden,
        "Computed invoice totals"
    );

    Ok(Json(ComputeResponse { items, result }))
}

/// Aggregate caller-supplied invoice snapshots into a target currency.
pub async fn aggregate_invoices(
    State(state): State<AppState>,
    Json(req): Json<AggregateRequest>,
) -> Result<Json<AggregateResult>, AppError> {
    req.validate()?;

    let target = req.target();
    let records = req
        .invoices
        .into_iter()
        .map(|inv| inv.into_record())
        .collect::<Result<Vec<InvoiceAggregateRecord>, _>>()?;

    tracing::info!(
        target_currency = %target,
        invoices = records.len(),
        "Aggregating invoices"
    );

    let result = state.engine.aggregate(&records, &target).await?;
    Ok(Json(result))
}

/// Status counts and converted amounts for a user's stored invoices.
pub async fn invoice_statistics(
    State(state): State<AppState>,
    Query(query): Query<UserCurrencyQuery>,
) -> Result<Json<InvoiceStatistics>, AppError> {
    let target = query.target();
    let stats = state.dashboard.statistics(query.user_id, &target).await?;
    Ok(Json(stats))
}
