use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::auth::{MaybeUser, RequireUser};
use crate::server::AppState;
use crate::server::dto::CreateObjectRequest;
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};
use crate::server::validation::validate_resource_name;
use crate::types::NewObject;

use super::super::access::{Action, require_resource_access, resolve_scope};

pub async fn create_object(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateObjectRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    validate_resource_name(&req.name, "name")?;
    if req.size < 0 {
        return Err(ApiError::validation("size", "size cannot be negative"));
    }

    let namespace_id = resolve_scope(store, &auth.user, req.namespace.as_deref())?;

    let object = store
        .create_object(&NewObject {
            user_id: auth.user.id,
            namespace_id,
            name: &req.name,
            size: req.size,
        })
        .api_err("Failed to create object")?;

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(object))))
}

pub async fn list_objects(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let objects = state
        .store
        .list_objects(auth.user.id)
        .api_err("Failed to list objects")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(objects)))
}

pub async fn get_object(
    MaybeUser(user): MaybeUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let object = store
        .get_object(id)
        .api_err("Failed to get object")?
        .or_not_found("Object not found")?;

    require_resource_access(store, &object, user.as_ref(), Action::Read, "Object not found")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(object)))
}

pub async fn delete_object(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let object = store
        .get_object(id)
        .api_err("Failed to get object")?
        .or_not_found("Object not found")?;

    require_resource_access(
        store,
        &object,
        Some(&auth.user),
        Action::Write,
        "Object not found",
    )?;

    store
        .delete_object(object.id)
        .api_err("Failed to delete object")?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
