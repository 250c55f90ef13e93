use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::auth::{MaybeUser, RequireUser};
use crate::server::AppState;
use crate::server::dto::CreateBuildRequest;
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};
use crate::types::NewBuild;

use super::super::access::{Action, require_resource_access, resolve_scope};

/// Builds are append-only: once submitted they are never updated or
/// deleted through the API, so only create/list/get exist here.
pub async fn create_build(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateBuildRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    if req.manifest.trim().is_empty() {
        return Err(ApiError::validation("manifest", "manifest cannot be empty"));
    }

    let namespace_id = resolve_scope(store, &auth.user, req.namespace.as_deref())?;

    let build = store
        .create_build(&NewBuild {
            user_id: auth.user.id,
            namespace_id,
            manifest: &req.manifest,
            note: req.note.as_deref(),
        })
        .api_err("Failed to create build")?;

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(build))))
}

pub async fn list_builds(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let builds = state
        .store
        .list_builds(auth.user.id)
        .api_err("Failed to list builds")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(builds)))
}

pub async fn get_build(
    MaybeUser(user): MaybeUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let build = store
        .get_build(id)
        .api_err("Failed to get build")?
        .or_not_found("Build not found")?;

    require_resource_access(store, &build, user.as_ref(), Action::Read, "Build not found")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(build)))
}
