use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::auth::{MaybeUser, RequireUser};
use crate::error::Error;
use crate::invites;
use crate::namespace;
use crate::server::AppState;
use crate::server::dto::{CreateNamespaceRequest, UpdateNamespaceRequest};
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};
use crate::types::Visibility;

use super::super::access::{require_namespace_access, require_namespace_owner};

/// Maps tree-operation failures onto per-field validation errors. Creation
/// and update endpoints report bad input against the offending field rather
/// than a bare status code.
fn tree_err(e: Error) -> ApiError {
    match e {
        Error::NotFound => ApiError::validation("parent", "namespace does not exist"),
        Error::AlreadyExists => ApiError::validation("name", "namespace already exists"),
        Error::DepthExceeded => ApiError::validation(
            "parent",
            format!("namespace cannot exceed a depth of {}", namespace::MAX_DEPTH),
        ),
        Error::BadRequest(msg) => ApiError::validation("name", msg),
        _ => ApiError::internal("Failed to save namespace"),
    }
}

pub async fn create_namespace(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateNamespaceRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let ns = namespace::create(
        store,
        auth.user.id,
        req.parent.as_deref(),
        &req.name,
        req.description.as_deref(),
        req.visibility.unwrap_or(Visibility::Private),
    )
    .map_err(tree_err)?;

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(ns))))
}

pub async fn list_namespaces(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let namespaces = state
        .store
        .list_namespaces(auth.user.id)
        .api_err("Failed to list namespaces")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(namespaces)))
}

pub async fn get_namespace(
    MaybeUser(user): MaybeUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let ns = store
        .get_namespace(id)
        .api_err("Failed to get namespace")?
        .or_not_found("Namespace not found")?;

    require_namespace_access(store, &ns, user.as_ref())?;

    Ok::<_, ApiError>(Json(ApiResponse::success(ns)))
}

pub async fn update_namespace(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateNamespaceRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let ns = store
        .get_namespace(id)
        .api_err("Failed to get namespace")?
        .or_not_found("Namespace not found")?;

    require_namespace_owner(&ns, &auth.user)?;

    let ns = namespace::update(
        store,
        &ns,
        req.name.as_deref(),
        req.description.as_deref(),
        req.visibility,
    )
    .map_err(tree_err)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(ns)))
}

pub async fn delete_namespace(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let ns = store
        .get_namespace(id)
        .api_err("Failed to get namespace")?
        .or_not_found("Namespace not found")?;

    require_namespace_owner(&ns, &auth.user)?;

    namespace::delete(store, &ns).api_err("Failed to delete namespace")?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}

pub async fn list_collaborators(
    MaybeUser(user): MaybeUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let ns = store
        .get_namespace(id)
        .api_err("Failed to get namespace")?
        .or_not_found("Namespace not found")?;

    require_namespace_access(store, &ns, user.as_ref())?;

    let collaborators = store
        .list_collaborators(ns.root_id)
        .api_err("Failed to list collaborators")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(collaborators)))
}

pub async fn remove_collaborator(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path((id, handle)): Path<(i64, String)>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let ns = store
        .get_namespace(id)
        .api_err("Failed to get namespace")?
        .or_not_found("Namespace not found")?;

    let target = store
        .get_user_by_handle(&handle)
        .api_err("Failed to get user")?
        .or_not_found("Collaborator not found")?;

    invites::remove_collaborator(store, &ns, &auth.user, target.id).map_err(|e| match e {
        Error::NotFound => ApiError::not_found("Collaborator not found"),
        _ => ApiError::internal("Failed to remove collaborator"),
    })?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
