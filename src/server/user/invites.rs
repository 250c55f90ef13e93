use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::auth::RequireUser;
use crate::error::Error;
use crate::invites::{self, InviteError};
use crate::server::AppState;
use crate::server::dto::CreateInviteRequest;
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};

use super::super::access::require_namespace_owner;

/// Only the tree owner may invite, and only on a namespace they can see by
/// definition. Lifecycle failures surface as field errors on `handle`.
pub async fn create_invite(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<CreateInviteRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let ns = store
        .get_namespace(id)
        .api_err("Failed to get namespace")?
        .or_not_found("Namespace not found")?;

    require_namespace_owner(&ns, &auth.user)?;

    let invite = invites::invite(store, &auth.user, &ns, &req.handle).map_err(|e| match e {
        InviteError::Store(_) => ApiError::internal("Failed to create invite"),
        e => ApiError::validation(e.field(), e.to_string()),
    })?;

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(invite))))
}

pub async fn list_invites(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let invites = state
        .store
        .list_invites_for(auth.user.id)
        .api_err("Failed to list invites")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(invites)))
}

pub async fn accept_invite(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let collaborator =
        invites::accept(state.store.as_ref(), id, &auth.user).map_err(|e| match e {
            Error::NotFound => ApiError::not_found("Invite not found"),
            _ => ApiError::internal("Failed to accept invite"),
        })?;

    Ok::<_, ApiError>(Json(ApiResponse::success(collaborator)))
}

pub async fn reject_invite(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    invites::reject(state.store.as_ref(), id, &auth.user).map_err(|e| match e {
        Error::NotFound => ApiError::not_found("Invite not found"),
        _ => ApiError::internal("Failed to reject invite"),
    })?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
