mod builds;
mod images;
mod invites;
mod keys;
mod namespaces;
mod objects;
mod variables;

use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, patch, post},
};

use crate::server::AppState;

pub fn user_router() -> Router<Arc<AppState>> {
    Router::new()
        // Namespaces
        .route("/namespaces", post(namespaces::create_namespace))
        .route("/namespaces", get(namespaces::list_namespaces))
        .route("/namespaces/{id}", get(namespaces::get_namespace))
        .route("/namespaces/{id}", patch(namespaces::update_namespace))
        .route("/namespaces/{id}", delete(namespaces::delete_namespace))
        // Collaborators
        .route(
            "/namespaces/{id}/collaborators",
            get(namespaces::list_collaborators),
        )
        .route(
            "/namespaces/{id}/collaborators/{handle}",
            delete(namespaces::remove_collaborator),
        )
        // Invites
        .route("/namespaces/{id}/invites", post(invites::create_invite))
        .route("/invites", get(invites::list_invites))
        .route("/invites/{id}", patch(invites::accept_invite))
        .route("/invites/{id}", delete(invites::reject_invite))
        // Builds
        .route("/builds", post(builds::create_build))
        .route("/builds", get(builds::list_builds))
        .route("/builds/{id}", get(builds::get_build))
        // Objects
        .route("/objects", post(objects::create_object))
        .route("/objects", get(objects::list_objects))
        .route("/objects/{id}", get(objects::get_object))
        .route("/objects/{id}", delete(objects::delete_object))
        // Variables
        .route("/variables", post(variables::create_variable))
        .route("/variables", get(variables::list_variables))
        .route("/variables/{id}", get(variables::get_variable))
        .route("/variables/{id}", delete(variables::delete_variable))
        // SSH keys
        .route("/keys", post(keys::create_key))
        .route("/keys", get(keys::list_keys))
        .route("/keys/{id}", get(keys::get_key))
        .route("/keys/{id}", delete(keys::delete_key))
        // Images
        .route("/images", post(images::create_image))
        .route("/images", get(images::list_images))
        .route("/images/{id}", get(images::get_image))
        .route("/images/{id}", delete(images::delete_image))
}
