//! Report handlers

use axum::{
    extract::{Query, State},
    Extension, Json,
};

use domain_directory::Actor;
use domain_reporting::{ExportOptions, ExportTable, GroupSummary, ReportSummary};

use crate::dto::reports::ReportQuery;
use crate::{error::ApiError, AppState};

/// Dashboard totals and per-status shares
pub async fn summary(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<ReportSummary>, ApiError> {
    let filter = query.filter()?;
    Ok(Json(state.reports.summary(&actor, filter).await?))
}

/// Subtotals per status, user, event or month
pub async fn breakdown(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<Vec<GroupSummary>>, ApiError> {
    let filter = query.filter()?;
    let key = query.group_key()?;
    Ok(Json(state.reports.breakdown(&actor, filter, key).await?))
}

/// Flat export rows with the selected fields
pub async fn export(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(options): Json<ExportOptions>,
) -> Result<Json<ExportTable>, ApiError> {
    Ok(Json(state.reports.export(&actor, &options).await?))
}
