mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use crate::error::Result;
use crate::types::*;

/// Store defines the database interface.
///
/// Reads return `Ok(None)` when a row is absent; callers decide whether
/// that is a 404 or something else. Only genuine persistence failures are
/// errors.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // User operations
    fn create_user(&self, user: &NewUser) -> Result<User>;
    fn get_user(&self, id: i64) -> Result<Option<User>>;
    /// Looks a user up by username or email.
    fn get_user_by_handle(&self, handle: &str) -> Result<Option<User>>;
    fn list_users(&self, cursor: i64, limit: i32) -> Result<Vec<User>>;
    fn delete_user(&self, id: i64) -> Result<bool>;

    // Namespace operations
    /// Inserts one namespace row. A root (no parent) is created with a
    /// placeholder root pointer and updated to reference itself inside the
    /// same transaction; a child row copies its parent's root pointer.
    fn create_namespace(&self, ns: &NewNamespace) -> Result<Namespace>;
    fn get_namespace(&self, id: i64) -> Result<Option<Namespace>>;
    fn get_namespace_by_path(&self, user_id: i64, path: &str) -> Result<Option<Namespace>>;
    /// Creates any missing segments of `path` under `user_id` in a single
    /// transaction, inheriting visibility downward. `path` must already be
    /// validated. Returns the namespace at the full path.
    fn ensure_namespace_path(&self, user_id: i64, path: &str) -> Result<Namespace>;
    /// Namespaces the user owns plus the roots they collaborate on.
    fn list_namespaces(&self, user_id: i64) -> Result<Vec<Namespace>>;
    fn update_namespace(&self, ns: &Namespace) -> Result<()>;
    /// Rewrites the visibility of every row in a tree, root included, as one
    /// set-based update.
    fn cascade_visibility(&self, root_id: i64, visibility: Visibility) -> Result<()>;
    /// Rewrites the path prefix of every namespace under `old_path` after a
    /// rename. The renamed row itself is covered by `update_namespace`.
    fn rename_namespace_paths(&self, user_id: i64, old_path: &str, new_path: &str) -> Result<()>;
    /// Removes the row only; descendants and resources are kept.
    fn delete_namespace(&self, id: i64) -> Result<bool>;

    // Collaborator operations
    fn get_collaborator(&self, namespace_id: i64, user_id: i64) -> Result<Option<Collaborator>>;
    fn list_collaborators(&self, namespace_id: i64) -> Result<Vec<Collaborator>>;
    fn delete_collaborator(&self, namespace_id: i64, user_id: i64) -> Result<bool>;

    // Invite operations
    fn create_invite(&self, namespace_id: i64, inviter_id: i64, invitee_id: i64)
    -> Result<Invite>;
    fn get_invite(&self, id: i64) -> Result<Option<Invite>>;
    fn get_invite_for(&self, namespace_id: i64, invitee_id: i64) -> Result<Option<Invite>>;
    fn list_invites_for(&self, invitee_id: i64) -> Result<Vec<Invite>>;
    /// Consumes an invite: inserts the collaborator row and deletes the
    /// invite in one transaction. `Ok(None)` if the invite no longer exists.
    fn accept_invite(&self, id: i64) -> Result<Option<Collaborator>>;
    fn delete_invite(&self, id: i64) -> Result<bool>;

    // Token operations
    fn create_token(&self, token: &Token) -> Result<()>;
    fn get_token_by_id(&self, id: &str) -> Result<Option<Token>>;
    fn get_token_by_lookup(&self, lookup: &str) -> Result<Option<Token>>;
    fn list_user_tokens(&self, user_id: i64) -> Result<Vec<Token>>;
    fn delete_token(&self, id: &str) -> Result<bool>;
    fn update_token_last_used(&self, id: &str) -> Result<()>;
    fn has_admin_token(&self) -> Result<bool>;

    // Build operations
    fn create_build(&self, build: &NewBuild) -> Result<Build>;
    fn get_build(&self, id: i64) -> Result<Option<Build>>;
    fn list_builds(&self, user_id: i64) -> Result<Vec<Build>>;

    // Object operations
    fn create_object(&self, object: &NewObject) -> Result<Object>;
    fn get_object(&self, id: i64) -> Result<Option<Object>>;
    fn list_objects(&self, user_id: i64) -> Result<Vec<Object>>;
    fn delete_object(&self, id: i64) -> Result<bool>;

    // Variable operations
    fn create_variable(&self, variable: &NewVariable) -> Result<Variable>;
    fn get_variable(&self, id: i64) -> Result<Option<Variable>>;
    fn list_variables(&self, user_id: i64) -> Result<Vec<Variable>>;
    fn delete_variable(&self, id: i64) -> Result<bool>;

    // SSH key operations
    fn create_key(&self, key: &NewKey) -> Result<Key>;
    fn get_key(&self, id: i64) -> Result<Option<Key>>;
    fn list_keys(&self, user_id: i64) -> Result<Vec<Key>>;
    fn delete_key(&self, id: i64) -> Result<bool>;

    // Image operations
    fn create_image(&self, image: &NewImage) -> Result<Image>;
    fn get_image(&self, id: i64) -> Result<Option<Image>>;
    fn list_images(&self, user_id: i64) -> Result<Vec<Image>>;
    fn delete_image(&self, id: i64) -> Result<bool>;
}
