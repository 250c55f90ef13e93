use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::auth::{MaybeUser, RequireUser};
use crate::server::AppState;
use crate::server::dto::CreateVariableRequest;
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};
use crate::server::validation::validate_resource_name;
use crate::types::NewVariable;

use super::super::access::{Action, require_resource_access, resolve_scope};

pub async fn create_variable(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateVariableRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    validate_resource_name(&req.key, "key")?;
    if req.value.is_empty() {
        return Err(ApiError::validation("value", "value cannot be empty"));
    }

    let namespace_id = resolve_scope(store, &auth.user, req.namespace.as_deref())?;

    let variable = store
        .create_variable(&NewVariable {
            user_id: auth.user.id,
            namespace_id,
            key: &req.key,
            value: &req.value,
        })
        .api_err("Failed to create variable")?;

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(variable))))
}

pub async fn list_variables(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let variables = state
        .store
        .list_variables(auth.user.id)
        .api_err("Failed to list variables")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(variables)))
}

pub async fn get_variable(
    MaybeUser(user): MaybeUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let variable = store
        .get_variable(id)
        .api_err("Failed to get variable")?
        .or_not_found("Variable not found")?;

    require_resource_access(store, &variable, user.as_ref(), Action::Read, "Variable not found")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(variable)))
}

pub async fn delete_variable(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let variable = store
        .get_variable(id)
        .api_err("Failed to get variable")?
        .or_not_found("Variable not found")?;

    require_resource_access(
        store,
        &variable,
        Some(&auth.user),
        Action::Write,
        "Variable not found",
    )?;

    store
        .delete_variable(variable.id)
        .api_err("Failed to delete variable")?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
