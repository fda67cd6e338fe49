//! Event and user handlers
//!
//! Reads are open to every signed-in user; writes need the admin role,
//! which the directory service enforces.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use validator::Validate;

use core_kernel::{EventId, UserId, Versioned};
use domain_directory::{Actor, Event, EventUpdate, NewEvent, NewUser, User, UserUpdate};

use super::parse_id;
use crate::dto::directory::*;
use crate::{error::ApiError, AppState};

pub async fn create_event(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<NewEvent>,
) -> Result<(StatusCode, Json<Versioned<Event>>), ApiError> {
    request.validate()?;
    let event = state.directory.create_event(&actor, request).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

pub async fn list_events(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<EventListQuery>,
) -> Result<Json<Vec<Versioned<Event>>>, ApiError> {
    state.directory.ensure_active(&actor).await?;
    Ok(Json(state.directory.list_events(query.status).await?))
}

pub async fn get_event(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
) -> Result<Json<Versioned<Event>>, ApiError> {
    let id: EventId = parse_id(&id, "event")?;
    state.directory.ensure_active(&actor).await?;
    Ok(Json(state.directory.get_event(id).await?))
}

pub async fn update_event(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
    Query(query): Query<VersionQuery>,
    Json(request): Json<EventUpdate>,
) -> Result<Json<Versioned<Event>>, ApiError> {
    let id: EventId = parse_id(&id, "event")?;
    let event = state
        .directory
        .update_event(&actor, id, request, query.version)
        .await?;
    Ok(Json(event))
}

/// Deletes an event no claim refers to
pub async fn delete_event(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id: EventId = parse_id(&id, "event")?;
    state.claims.delete_event(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn create_user(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<NewUser>,
) -> Result<(StatusCode, Json<Versioned<User>>), ApiError> {
    request.validate()?;
    let user = state.directory.create_user(&actor, request).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn list_users(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<UserListQuery>,
) -> Result<Json<Vec<Versioned<User>>>, ApiError> {
    let caller = state.directory.ensure_active(&actor).await?;
    if !caller.role.can_review() {
        return Err(ApiError::Forbidden("reviewer role required".to_string()));
    }
    Ok(Json(state.directory.list_users(query.role).await?))
}

/// The signed-in user's own record
pub async fn current_user(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Versioned<User>>, ApiError> {
    state.directory.ensure_active(&actor).await?;
    Ok(Json(state.directory.get_user(actor.user_id).await?))
}

pub async fn get_user(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
) -> Result<Json<Versioned<User>>, ApiError> {
    let id: UserId = parse_id(&id, "user")?;
    let caller = state.directory.ensure_active(&actor).await?;
    if id != caller.id && !caller.role.can_review() {
        return Err(ApiError::Forbidden("users may only read their own record".to_string()));
    }
    Ok(Json(state.directory.get_user(id).await?))
}

pub async fn update_user(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
    Query(query): Query<VersionQuery>,
    Json(request): Json<UserUpdate>,
) -> Result<Json<Versioned<User>>, ApiError> {
    let id: UserId = parse_id(&id, "user")?;
    let user = state
        .directory
        .update_user(&actor, id, request, query.version)
        .await?;
    Ok(Json(user))
}

pub async fn deactivate_user(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
) -> Result<Json<Versioned<User>>, ApiError> {
    let id: UserId = parse_id(&id, "user")?;
    Ok(Json(state.directory.deactivate_user(&actor, id).await?))
}
