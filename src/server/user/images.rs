use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::auth::{MaybeUser, RequireUser};
use crate::server::AppState;
use crate::server::dto::CreateImageRequest;
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};
use crate::server::validation::validate_resource_name;
use crate::types::NewImage;

use super::super::access::{Action, require_resource_access, resolve_scope};

const DRIVERS: &[&str] = &["qemu", "docker"];

pub async fn create_image(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateImageRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    validate_resource_name(&req.name, "name")?;
    if !DRIVERS.contains(&req.driver.as_str()) {
        return Err(ApiError::validation("driver", "unknown driver"));
    }

    let namespace_id = resolve_scope(store, &auth.user, req.namespace.as_deref())?;

    let image = store
        .create_image(&NewImage {
            user_id: auth.user.id,
            namespace_id,
            name: &req.name,
            driver: &req.driver,
        })
        .api_err("Failed to create image")?;

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(image))))
}

pub async fn list_images(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let images = state
        .store
        .list_images(auth.user.id)
        .api_err("Failed to list images")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(images)))
}

pub async fn get_image(
    MaybeUser(user): MaybeUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let image = store
        .get_image(id)
        .api_err("Failed to get image")?
        .or_not_found("Image not found")?;

    require_resource_access(store, &image, user.as_ref(), Action::Read, "Image not found")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(image)))
}

pub async fn delete_image(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let image = store
        .get_image(id)
        .api_err("Failed to get image")?
        .or_not_found("Image not found")?;

    require_resource_access(
        store,
        &image,
        Some(&auth.user),
        Action::Write,
        "Image not found",
    )?;

    store
        .delete_image(image.id)
        .api_err("Failed to delete image")?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
