use axum::{
    extract::{Query, State},
    Json,
};
use service_core::error::AppError;

use crate::dtos::UserCurrencyQuery;
use crate::models::DashboardSummary;
use crate::startup::AppState;

pub async fn dashboard_summary(
    State(state): State<AppState>,
    Query(query): Query<UserCurrencyQuery>,
) -> Result<Json<DashboardSummary>, AppError> {
    let target = query.target();
    tracing::info!(user_id = %query.user_id, target_currency = %target, "Building dashboard summary");

    let summary = state.dashboard.summary(query.user_id, &target).await?;
    Ok(Json(summary))
}
