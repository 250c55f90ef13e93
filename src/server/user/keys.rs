use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::auth::{MaybeUser, RequireUser};
use crate::server::AppState;
use crate::server::dto::CreateKeyRequest;
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};
use crate::server::validation::validate_resource_name;
use crate::types::NewKey;

use super::super::access::{Action, require_resource_access, resolve_scope};

pub async fn create_key(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateKeyRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    validate_resource_name(&req.name, "name")?;
    if req.key.trim().is_empty() {
        return Err(ApiError::validation("key", "key cannot be empty"));
    }

    let namespace_id = resolve_scope(store, &auth.user, req.namespace.as_deref())?;

    let key = store
        .create_key(&NewKey {
            user_id: auth.user.id,
            namespace_id,
            name: &req.name,
            key: &req.key,
            config: req.config.as_deref(),
        })
        .api_err("Failed to create key")?;

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(key))))
}

pub async fn list_keys(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let keys = state
        .store
        .list_keys(auth.user.id)
        .api_err("Failed to list keys")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(keys)))
}

pub async fn get_key(
    MaybeUser(user): MaybeUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let key = store
        .get_key(id)
        .api_err("Failed to get key")?
        .or_not_found("Key not found")?;

    require_resource_access(store, &key, user.as_ref(), Action::Read, "Key not found")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(key)))
}

pub async fn delete_key(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let key = store
        .get_key(id)
        .api_err("Failed to get key")?
        .or_not_found("Key not found")?;

    require_resource_access(store, &key, Some(&auth.user), Action::Write, "Key not found")?;

    store.delete_key(key.id).api_err("Failed to delete key")?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
