//! Claims handlers

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    Extension, Json,
};
use validator::Validate;

use core_kernel::{ClaimId, ExpenseItemId, StoredFile};
use domain_directory::Actor;
use domain_reimbursement::NewClaim;

use super::parse_id;
use crate::dto::claims::*;
use crate::{error::ApiError, AppState};

/// Submits a new claim
pub async fn create_claim(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<NewClaim>,
) -> Result<(StatusCode, Json<ClaimResponse>), ApiError> {
    let claim = state.claims.create_claim(&actor, request).await?;
    Ok((StatusCode::CREATED, Json(claim.try_into()?)))
}

/// Lists claims; plain users only ever see their own
pub async fn list_claims(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<ClaimListQuery>,
) -> Result<Json<Vec<ClaimResponse>>, ApiError> {
    let claims = state.claims.list_claims(&actor, query.into()).await?;
    let claims = claims
        .into_iter()
        .map(ClaimResponse::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(claims))
}

/// Gets a claim by ID
pub async fn get_claim(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
) -> Result<Json<ClaimResponse>, ApiError> {
    let id: ClaimId = parse_id(&id, "claim")?;
    Ok(Json(state.claims.get_claim(&actor, id).await?.try_into()?))
}

pub async fn approve(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
    Json(request): Json<VersionRequest>,
) -> Result<Json<ClaimResponse>, ApiError> {
    let id: ClaimId = parse_id(&id, "claim")?;
    let claim = state.claims.approve(&actor, id, request.version).await?;
    Ok(Json(claim.try_into()?))
}

pub async fn reject(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
    Json(request): Json<RejectRequest>,
) -> Result<Json<ClaimResponse>, ApiError> {
    request.validate()?;
    let id: ClaimId = parse_id(&id, "claim")?;
    let claim = state
        .claims
        .reject(&actor, id, &request.reason, request.version)
        .await?;
    Ok(Json(claim.try_into()?))
}

pub async fn request_clarification(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
    Json(request): Json<ClarificationRequestBody>,
) -> Result<Json<ClaimResponse>, ApiError> {
    let id: ClaimId = parse_id(&id, "claim")?;
    let claim = state
        .claims
        .request_clarification(&actor, id, request.input, request.version)
        .await?;
    Ok(Json(claim.try_into()?))
}

pub async fn respond_to_clarification(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
    Json(request): Json<RespondRequest>,
) -> Result<Json<ClaimResponse>, ApiError> {
    request.validate()?;
    let id: ClaimId = parse_id(&id, "claim")?;
    let claim = state
        .claims
        .respond_to_clarification(&actor, id, &request.message, request.version)
        .await?;
    Ok(Json(claim.try_into()?))
}

/// Files a new claim from a rejected one
pub async fn resubmit(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
    Json(request): Json<ResubmitRequest>,
) -> Result<(StatusCode, Json<ClaimResponse>), ApiError> {
    let id: ClaimId = parse_id(&id, "claim")?;
    let claim = state.claims.resubmit_claim(&actor, id, request.items).await?;
    Ok((StatusCode::CREATED, Json(claim.try_into()?)))
}

pub async fn set_validator_note(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
    Json(request): Json<NoteRequest>,
) -> Result<Json<ClaimResponse>, ApiError> {
    request.validate()?;
    let id: ClaimId = parse_id(&id, "claim")?;
    let claim = state
        .claims
        .set_validator_note(&actor, id, &request.note, request.version)
        .await?;
    Ok(Json(claim.try_into()?))
}

pub async fn decide_item(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path((id, item_id)): Path<(String, String)>,
    Json(request): Json<ItemDecisionRequest>,
) -> Result<Json<ClaimResponse>, ApiError> {
    let id: ClaimId = parse_id(&id, "claim")?;
    let item_id: ExpenseItemId = parse_id(&item_id, "expense item")?;
    let claim = state
        .claims
        .decide_item(&actor, id, item_id, request.decision, request.note.as_deref(), request.version)
        .await?;
    Ok(Json(claim.try_into()?))
}

pub async fn annotate_item(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path((id, item_id)): Path<(String, String)>,
    Json(request): Json<NoteRequest>,
) -> Result<Json<ClaimResponse>, ApiError> {
    request.validate()?;
    let id: ClaimId = parse_id(&id, "claim")?;
    let item_id: ExpenseItemId = parse_id(&item_id, "expense item")?;
    let claim = state
        .claims
        .annotate_item(&actor, id, item_id, &request.note, request.version)
        .await?;
    Ok(Json(claim.try_into()?))
}

/// Resolves the download URL of an item's receipt
pub async fn receipt_url(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path((id, item_id)): Path<(String, String)>,
) -> Result<Json<ReceiptUrlResponse>, ApiError> {
    let id: ClaimId = parse_id(&id, "claim")?;
    let item_id: ExpenseItemId = parse_id(&item_id, "expense item")?;
    let url = state.claims.receipt_url(&actor, id, item_id).await?;
    Ok(Json(ReceiptUrlResponse { url }))
}

/// Stores a receipt file; the returned reference goes into a claim item
pub async fn upload_receipt(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<UploadQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<StoredFile>), ApiError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream");
    let stored = state
        .claims
        .upload_receipt(&actor, &query.file_name, content_type, body.to_vec())
        .await?;
    Ok((StatusCode::CREATED, Json(stored)))
}
