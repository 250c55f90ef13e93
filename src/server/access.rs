//! The authorization gate.
//!
//! Every decision funnels through [`accessible_by`], evaluated against the
//! **root** of the namespace tree that scopes an entity. Visibility and
//! collaborator status only ever grant read access; mutation of a namespace
//! record is owner-only, and mutation of a scoped resource requires owner or
//! collaborator. A failed gate on an existing entity is reported as 404,
//! never 403, so inaccessible resources are indistinguishable from absent
//! ones.

use crate::error::Error;
use crate::namespace;
use crate::server::response::{ApiError, StoreResultExt};
use crate::server::validation::split_namespace_target;
use crate::store::Store;
use crate::types::{Namespace, OwnedResource, User, Visibility};

/// What a request wants to do with an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Write,
}

/// The core decision function: may `user` see the tree rooted at `root`?
///
/// Anonymous callers only see public trees. The owner always passes.
/// Otherwise visibility decides: public and internal admit any
/// authenticated user, private admits collaborators only.
#[must_use]
pub fn accessible_by(root: &Namespace, collaborators: &[i64], user: Option<&User>) -> bool {
    let Some(user) = user else {
        return root.visibility == Visibility::Public;
    };

    if user.id == root.user_id {
        return true;
    }

    match root.visibility {
        Visibility::Public | Visibility::Internal => true,
        Visibility::Private => collaborators.contains(&user.id),
    }
}

fn collaborator_ids(store: &dyn Store, root_id: i64) -> Result<Vec<i64>, ApiError> {
    Ok(store
        .list_collaborators(root_id)
        .api_err("Failed to list collaborators")?
        .into_iter()
        .map(|c| c.user_id)
        .collect())
}

/// Authorizes `user` to perform `action` on a loaded resource of any kind.
///
/// Namespaced resources are governed entirely by their tree: reads go
/// through [`accessible_by`], writes require the tree owner or a
/// collaborator. Unscoped resources are private to their owner. A resource
/// whose root row no longer exists degrades to owner-only.
pub fn check_resource_access<R: OwnedResource>(
    store: &dyn Store,
    resource: &R,
    user: Option<&User>,
    action: Action,
) -> Result<bool, ApiError> {
    let Some(ns_id) = resource.namespace_id() else {
        return Ok(user.is_some_and(|u| u.id == resource.owner_id()));
    };

    let root = namespace::resolve_root(store, ns_id).api_err("Failed to resolve namespace root")?;
    let Some(root) = root else {
        return Ok(user.is_some_and(|u| u.id == resource.owner_id()));
    };

    match action {
        Action::Read => {
            let collaborators = collaborator_ids(store, root.id)?;
            Ok(accessible_by(&root, &collaborators, user))
        }
        Action::Write => {
            let Some(user) = user else {
                return Ok(false);
            };
            if user.id == root.user_id {
                return Ok(true);
            }
            Ok(store
                .get_collaborator(root.id, user.id)
                .api_err("Failed to check collaborator")?
                .is_some())
        }
    }
}

/// [`check_resource_access`] that hides denied entities behind a 404.
pub fn require_resource_access<R: OwnedResource>(
    store: &dyn Store,
    resource: &R,
    user: Option<&User>,
    action: Action,
    message: &'static str,
) -> Result<(), ApiError> {
    if !check_resource_access(store, resource, user, action)? {
        return Err(ApiError::not_found(message));
    }
    Ok(())
}

/// Read gate for a namespace record itself, evaluated at its root.
pub fn check_namespace_access(
    store: &dyn Store,
    ns: &Namespace,
    user: Option<&User>,
) -> Result<bool, ApiError> {
    let root = namespace::resolve_root(store, ns.id)
        .api_err("Failed to resolve namespace root")?;
    let Some(root) = root else {
        return Ok(user.is_some_and(|u| u.id == ns.user_id));
    };

    let collaborators = collaborator_ids(store, root.id)?;
    Ok(accessible_by(&root, &collaborators, user))
}

pub fn require_namespace_access(
    store: &dyn Store,
    ns: &Namespace,
    user: Option<&User>,
) -> Result<(), ApiError> {
    if !check_namespace_access(store, ns, user)? {
        return Err(ApiError::not_found("Namespace not found"));
    }
    Ok(())
}

/// Mutating a namespace record is owner-only regardless of visibility or
/// collaborator status.
pub fn require_namespace_owner(ns: &Namespace, user: &User) -> Result<(), ApiError> {
    if ns.user_id != user.id {
        return Err(ApiError::not_found("Namespace not found"));
    }
    Ok(())
}

/// Resolves the optional inline namespace target of a resource-creation
/// request ("team/project" or "team/project@owner") into a namespace id.
///
/// Creating under one's own tree creates missing path segments on the fly.
/// Creating under another owner's tree requires the tree to exist and the
/// requester to be a collaborator; failures surface as a `namespace` field
/// error, not a 404, since the route itself is a creation endpoint.
pub fn resolve_scope(
    store: &dyn Store,
    user: &User,
    target: Option<&str>,
) -> Result<Option<i64>, ApiError> {
    let Some(target) = target.map(str::trim).filter(|t| !t.is_empty()) else {
        return Ok(None);
    };

    let (path, owner_name) = split_namespace_target(target);

    let owner_id = match owner_name {
        Some(name) if name != user.username => {
            let owner = store
                .get_user_by_handle(name)
                .api_err("Failed to look up namespace owner")?
                .ok_or_else(|| cannot_submit())?;
            owner.id
        }
        _ => user.id,
    };

    if owner_id == user.id {
        let ns = namespace::find_or_create(store, user.id, path).map_err(|e| match e {
            Error::DepthExceeded => ApiError::validation(
                "namespace",
                format!("namespace cannot exceed a depth of {}", namespace::MAX_DEPTH),
            ),
            Error::BadRequest(msg) => ApiError::validation("namespace", msg),
            _ => ApiError::internal("Failed to create namespace"),
        })?;
        return Ok(Some(ns.id));
    }

    // Someone else's tree: it must exist and the requester must be a
    // collaborator on its root.
    let segments = namespace::normalize_path(path).map_err(|_| cannot_submit())?;
    let ns = store
        .get_namespace_by_path(owner_id, &segments.join("/"))
        .api_err("Failed to look up namespace")?
        .ok_or_else(cannot_submit)?;

    let is_collaborator = store
        .get_collaborator(ns.root_id, user.id)
        .api_err("Failed to check collaborator")?
        .is_some();
    if !is_collaborator {
        return Err(cannot_submit());
    }

    Ok(Some(ns.id))
}

fn cannot_submit() -> ApiError {
    ApiError::validation("namespace", "you cannot submit to this namespace")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invites;
    use crate::store::SqliteStore;
    use crate::types::{NewUser, NewVariable};

    fn test_store() -> (tempfile::TempDir, SqliteStore) {
        let dir = tempfile::TempDir::new().unwrap();
        let store = SqliteStore::new(dir.path().join("test.db")).unwrap();
        store.initialize().unwrap();
        (dir, store)
    }

    fn test_user(store: &SqliteStore, name: &str) -> User {
        store
            .create_user(&NewUser {
                username: name,
                email: &format!("{name}@example.com"),
                password_hash: "$argon2id$test",
            })
            .unwrap()
    }

    fn root_ns(store: &SqliteStore, owner: &User, visibility: Visibility) -> Namespace {
        let ns = namespace::create(store, owner.id, None, "tree", None, visibility).unwrap();
        assert_eq!(ns.root_id, ns.id);
        ns
    }

    #[test]
    fn test_owner_omnipotence() {
        let (_dir, store) = test_store();
        let owner = test_user(&store, "owner");

        for v in [Visibility::Private, Visibility::Internal, Visibility::Public] {
            let root = namespace::create(&store, owner.id, None, v.as_str(), None, v).unwrap();
            assert!(accessible_by(&root, &[], Some(&owner)), "{v}");
        }
    }

    #[test]
    fn test_visibility_gating() {
        let (_dir, store) = test_store();
        let owner = test_user(&store, "owner");
        let stranger = test_user(&store, "stranger");
        let collab = test_user(&store, "collab");

        let private = root_ns(&store, &owner, Visibility::Private);
        assert!(!accessible_by(&private, &[], Some(&stranger)));
        assert!(accessible_by(&private, &[collab.id], Some(&collab)));
        assert!(!accessible_by(&private, &[collab.id], Some(&stranger)));
        assert!(!accessible_by(&private, &[collab.id], None));

        let internal = Namespace {
            visibility: Visibility::Internal,
            ..private.clone()
        };
        assert!(accessible_by(&internal, &[], Some(&stranger)));
        assert!(!accessible_by(&internal, &[], None));

        let public = Namespace {
            visibility: Visibility::Public,
            ..private
        };
        assert!(accessible_by(&public, &[], Some(&stranger)));
        assert!(accessible_by(&public, &[], None));
    }

    #[test]
    fn test_resource_gate_scoped() {
        let (_dir, store) = test_store();
        let owner = test_user(&store, "owner");
        let stranger = test_user(&store, "stranger");
        let root = root_ns(&store, &owner, Visibility::Public);

        let variable = store
            .create_variable(&NewVariable {
                user_id: owner.id,
                namespace_id: Some(root.id),
                key: "PGPASSWORD",
                value: "secret",
            })
            .unwrap();

        // Public grants read to anyone, including anonymous.
        assert!(check_resource_access(&store, &variable, None, Action::Read).unwrap());
        assert!(
            check_resource_access(&store, &variable, Some(&stranger), Action::Read).unwrap()
        );

        // Mutation stays owner/collaborator-only.
        assert!(
            !check_resource_access(&store, &variable, Some(&stranger), Action::Write).unwrap()
        );
        assert!(!check_resource_access(&store, &variable, None, Action::Write).unwrap());
        assert!(check_resource_access(&store, &variable, Some(&owner), Action::Write).unwrap());
    }

    #[test]
    fn test_resource_gate_collaborator_write() {
        let (_dir, store) = test_store();
        let owner = test_user(&store, "owner");
        let guest = test_user(&store, "guest");
        let root = root_ns(&store, &owner, Visibility::Private);

        let variable = store
            .create_variable(&NewVariable {
                user_id: guest.id,
                namespace_id: Some(root.id),
                key: "TOKEN",
                value: "v",
            })
            .unwrap();

        // Not a collaborator yet: the guest cannot even read their own
        // variable because the namespace governs it entirely.
        assert!(!check_resource_access(&store, &variable, Some(&guest), Action::Read).unwrap());

        let inv = invites::invite(&store, &owner, &root, "guest").unwrap();
        invites::accept(&store, inv.id, &guest).unwrap();

        assert!(check_resource_access(&store, &variable, Some(&guest), Action::Read).unwrap());
        assert!(check_resource_access(&store, &variable, Some(&guest), Action::Write).unwrap());
    }

    #[test]
    fn test_resource_gate_unscoped() {
        let (_dir, store) = test_store();
        let owner = test_user(&store, "owner");
        let stranger = test_user(&store, "stranger");

        let variable = store
            .create_variable(&NewVariable {
                user_id: owner.id,
                namespace_id: None,
                key: "LOCAL",
                value: "v",
            })
            .unwrap();

        assert!(check_resource_access(&store, &variable, Some(&owner), Action::Read).unwrap());
        assert!(
            !check_resource_access(&store, &variable, Some(&stranger), Action::Read).unwrap()
        );
        assert!(!check_resource_access(&store, &variable, None, Action::Read).unwrap());
    }

    #[test]
    fn test_resource_gate_deleted_tree_degrades_to_owner() {
        let (_dir, store) = test_store();
        let owner = test_user(&store, "owner");
        let stranger = test_user(&store, "stranger");
        let root = root_ns(&store, &owner, Visibility::Public);

        let variable = store
            .create_variable(&NewVariable {
                user_id: owner.id,
                namespace_id: Some(root.id),
                key: "K",
                value: "v",
            })
            .unwrap();

        store.delete_namespace(root.id).unwrap();

        assert!(check_resource_access(&store, &variable, Some(&owner), Action::Read).unwrap());
        assert!(
            !check_resource_access(&store, &variable, Some(&stranger), Action::Read).unwrap()
        );
    }

    #[test]
    fn test_resolve_scope_own_tree() {
        let (_dir, store) = test_store();
        let me = test_user(&store, "me");

        let id = resolve_scope(&store, &me, Some("team/project")).unwrap();
        let ns = store.get_namespace(id.unwrap()).unwrap().unwrap();
        assert_eq!(ns.path, "team/project");

        assert_eq!(resolve_scope(&store, &me, None).unwrap(), None);
        assert_eq!(resolve_scope(&store, &me, Some("  ")).unwrap(), None);
    }

    #[test]
    fn test_resolve_scope_foreign_tree_requires_collaboration() {
        let (_dir, store) = test_store();
        let me = test_user(&store, "me");
        let you = test_user(&store, "you");

        namespace::create(&store, me.id, None, "conclave", None, Visibility::Private).unwrap();

        // Not a collaborator: rejected as a field error.
        let err = resolve_scope(&store, &you, Some("conclave@me")).unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::BAD_REQUEST);

        let root = store.get_namespace_by_path(me.id, "conclave").unwrap().unwrap();
        let inv = invites::invite(&store, &me, &root, "you").unwrap();
        invites::accept(&store, inv.id, &you).unwrap();

        let id = resolve_scope(&store, &you, Some("conclave@me")).unwrap();
        assert_eq!(id, Some(root.id));
    }
}
