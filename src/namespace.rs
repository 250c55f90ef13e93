//! Namespace tree operations.
//!
//! Namespaces form a per-owner forest. Each row carries a denormalized
//! `root_id` maintained at write time, so resolving the root that governs
//! visibility and collaborators is two point reads, never a parent walk.
//! Visibility is authoritative only at the root: children inherit it on
//! creation and are rewritten whenever the root changes.

use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{Namespace, NewNamespace, Visibility};

/// Maximum nesting depth of a namespace tree; roots sit at level 0.
pub const MAX_DEPTH: i64 = 20;

const MAX_NAME_LEN: usize = 255;

/// Namespace names are limited to letters, digits, and dashes.
pub fn validate_name(name: &str) -> std::result::Result<(), String> {
    if name.is_empty() {
        return Err("Name cannot be empty".to_string());
    }
    if name.len() > MAX_NAME_LEN {
        return Err(format!("Name cannot exceed {MAX_NAME_LEN} characters"));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err("Name can only contain letters, digits, and dashes".to_string());
    }
    Ok(())
}

/// Splits and validates a namespace path like "team/project".
pub fn normalize_path(path: &str) -> Result<Vec<&str>> {
    let segments: Vec<&str> = path
        .trim_matches('/')
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();

    if segments.is_empty() {
        return Err(Error::BadRequest("Path cannot be empty".to_string()));
    }
    if segments.len() as i64 > MAX_DEPTH {
        return Err(Error::DepthExceeded);
    }
    for segment in &segments {
        validate_name(segment).map_err(Error::BadRequest)?;
    }

    Ok(segments)
}

/// Creates one namespace, optionally as a child of an existing one
/// identified by `parent_path`.
///
/// A child inherits the parent's visibility; the caller-supplied value only
/// applies to roots. Fails with [`Error::NotFound`] for an unknown parent,
/// [`Error::DepthExceeded`] at the depth limit, and [`Error::AlreadyExists`]
/// for a duplicate path under the same owner.
pub fn create(
    store: &dyn Store,
    owner_id: i64,
    parent_path: Option<&str>,
    name: &str,
    description: Option<&str>,
    visibility: Visibility,
) -> Result<Namespace> {
    validate_name(name).map_err(Error::BadRequest)?;

    let parent = match parent_path.filter(|p| !p.is_empty()) {
        Some(p) => Some(
            store
                .get_namespace_by_path(owner_id, p)?
                .ok_or(Error::NotFound)?,
        ),
        None => None,
    };

    let level = parent.as_ref().map_or(0, |p| p.level + 1);
    if level >= MAX_DEPTH {
        return Err(Error::DepthExceeded);
    }

    let path = match &parent {
        Some(p) => format!("{}/{}", p.path, name),
        None => name.to_string(),
    };

    if store.get_namespace_by_path(owner_id, &path)?.is_some() {
        return Err(Error::AlreadyExists);
    }

    let visibility = parent.as_ref().map_or(visibility, |p| p.visibility);

    store.create_namespace(&NewNamespace {
        user_id: owner_id,
        parent: parent.as_ref(),
        name,
        path: &path,
        description,
        visibility,
        level,
    })
}

/// Resolves `path` under `owner_id`, creating any missing segments as a
/// single transactional chain. Used by resource-creation flows that accept
/// a namespace path inline.
pub fn find_or_create(store: &dyn Store, owner_id: i64, path: &str) -> Result<Namespace> {
    let segments = normalize_path(path)?;
    store.ensure_namespace_path(owner_id, &segments.join("/"))
}

/// Applies an update to a namespace.
///
/// On a root the new visibility is persisted and cascaded to every
/// descendant. On a non-root the caller-supplied visibility is ignored and
/// overwritten with the parent's current value. A rename rewrites the path
/// prefix of the whole subtree.
pub fn update(
    store: &dyn Store,
    ns: &Namespace,
    name: Option<&str>,
    description: Option<&str>,
    visibility: Option<Visibility>,
) -> Result<Namespace> {
    let mut ns = ns.clone();
    let old_path = ns.path.clone();

    if let Some(name) = name {
        if name != ns.name {
            validate_name(name).map_err(Error::BadRequest)?;

            let new_path = match ns.path.rsplit_once('/') {
                Some((prefix, _)) => format!("{prefix}/{name}"),
                None => name.to_string(),
            };
            if store.get_namespace_by_path(ns.user_id, &new_path)?.is_some() {
                return Err(Error::AlreadyExists);
            }
            ns.name = name.to_string();
            ns.path = new_path;
        }
    }

    if let Some(description) = description {
        ns.description = Some(description.to_string());
    }

    // Visibility is authoritative only at the root.
    let cascade = if ns.is_root() {
        match visibility {
            Some(v) if v != ns.visibility => {
                ns.visibility = v;
                true
            }
            _ => false,
        }
    } else {
        if let Some(parent_id) = ns.parent_id {
            if let Some(parent) = store.get_namespace(parent_id)? {
                ns.visibility = parent.visibility;
            }
        }
        false
    };

    store.update_namespace(&ns)?;

    if ns.path != old_path {
        store.rename_namespace_paths(ns.user_id, &old_path, &ns.path)?;
    }
    if cascade {
        store.cascade_visibility(ns.id, ns.visibility)?;
    }

    Ok(ns)
}

/// Removes the namespace row only; descendants and resources deliberately
/// outlive it.
pub fn delete(store: &dyn Store, ns: &Namespace) -> Result<bool> {
    store.delete_namespace(ns.id)
}

/// Resolves the root namespace governing `namespace_id` in two point reads.
/// Absence is `Ok(None)`, not an error.
pub fn resolve_root(store: &dyn Store, namespace_id: i64) -> Result<Option<Namespace>> {
    let Some(ns) = store.get_namespace(namespace_id)? else {
        return Ok(None);
    };
    if ns.is_root() {
        return Ok(Some(ns));
    }
    store.get_namespace(ns.root_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;
    use crate::types::NewUser;

    fn test_store() -> (tempfile::TempDir, SqliteStore, i64) {
        let dir = tempfile::TempDir::new().unwrap();
        let store = SqliteStore::new(dir.path().join("test.db")).unwrap();
        store.initialize().unwrap();
        let user = store
            .create_user(&NewUser {
                username: "me",
                email: "me@example.com",
                password_hash: "$argon2id$test",
            })
            .unwrap();
        (dir, store, user.id)
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("conclave").is_ok());
        assert!(validate_name("blue-shift2").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("no/slash").is_err());
        assert!(validate_name("no space").is_err());
        assert!(validate_name("no.dot").is_err());
        assert!(validate_name("no_underscore").is_err());
    }

    #[test]
    fn test_create_root() {
        let (_dir, store, me) = test_store();

        let ns = create(&store, me, None, "conclave", None, Visibility::Private).unwrap();
        assert_eq!(ns.root_id, ns.id);
        assert_eq!(ns.path, "conclave");
        assert_eq!(ns.level, 0);
    }

    #[test]
    fn test_create_child_inherits_visibility() {
        let (_dir, store, me) = test_store();

        create(&store, me, None, "top", None, Visibility::Public).unwrap();
        // The caller asks for private; the parent wins.
        let child = create(
            &store,
            me,
            Some("top"),
            "sub",
            None,
            Visibility::Private,
        )
        .unwrap();

        assert_eq!(child.visibility, Visibility::Public);
        assert_eq!(child.path, "top/sub");
        assert_eq!(child.level, 1);
    }

    #[test]
    fn test_create_unknown_parent() {
        let (_dir, store, me) = test_store();
        let err = create(&store, me, Some("ghost"), "sub", None, Visibility::Private);
        assert!(matches!(err, Err(Error::NotFound)));
    }

    #[test]
    fn test_create_duplicate_path() {
        let (_dir, store, me) = test_store();
        create(&store, me, None, "dup", None, Visibility::Private).unwrap();
        let err = create(&store, me, None, "dup", None, Visibility::Private);
        assert!(matches!(err, Err(Error::AlreadyExists)));
    }

    #[test]
    fn test_create_depth_limit() {
        let (_dir, store, me) = test_store();

        let mut path = String::new();
        for i in 0..MAX_DEPTH {
            let parent = (!path.is_empty()).then_some(path.as_str());
            let ns = create(&store, me, parent, &format!("n{i}"), None, Visibility::Private)
                .unwrap();
            path = ns.path;
        }

        // Creating at level MAX_DEPTH fails and persists nothing.
        let err = create(&store, me, Some(&path), "toodeep", None, Visibility::Private);
        assert!(matches!(err, Err(Error::DepthExceeded)));
        let deep = format!("{path}/toodeep");
        assert!(store.get_namespace_by_path(me, &deep).unwrap().is_none());
    }

    #[test]
    fn test_find_or_create_depth_limit_persists_nothing() {
        let (_dir, store, me) = test_store();

        let path: Vec<String> = (0..=MAX_DEPTH).map(|i| format!("n{i}")).collect();
        let err = find_or_create(&store, me, &path.join("/"));
        assert!(matches!(err, Err(Error::DepthExceeded)));
        assert!(store.get_namespace_by_path(me, "n0").unwrap().is_none());
    }

    #[test]
    fn test_update_root_cascades() {
        let (_dir, store, me) = test_store();

        let leaf = find_or_create(&store, me, "a/b/c").unwrap();
        let root = resolve_root(&store, leaf.id).unwrap().unwrap();

        update(&store, &root, None, None, Some(Visibility::Internal)).unwrap();

        for path in ["a", "a/b", "a/b/c"] {
            let ns = store.get_namespace_by_path(me, path).unwrap().unwrap();
            assert_eq!(ns.visibility, Visibility::Internal, "{path}");
        }
    }

    #[test]
    fn test_update_child_visibility_forced_to_parent() {
        let (_dir, store, me) = test_store();

        find_or_create(&store, me, "a/b").unwrap();
        let child = store.get_namespace_by_path(me, "a/b").unwrap().unwrap();

        let updated = update(&store, &child, None, None, Some(Visibility::Public)).unwrap();
        assert_eq!(updated.visibility, Visibility::Private);

        let row = store.get_namespace(child.id).unwrap().unwrap();
        assert_eq!(row.visibility, Visibility::Private);
    }

    #[test]
    fn test_update_rename_rewrites_subtree_paths() {
        let (_dir, store, me) = test_store();

        find_or_create(&store, me, "old/mid/leaf").unwrap();
        let root = store.get_namespace_by_path(me, "old").unwrap().unwrap();

        update(&store, &root, Some("new"), None, None).unwrap();

        assert!(store.get_namespace_by_path(me, "old").unwrap().is_none());
        assert!(store.get_namespace_by_path(me, "new").unwrap().is_some());
        assert!(
            store
                .get_namespace_by_path(me, "new/mid/leaf")
                .unwrap()
                .is_some()
        );
    }

    #[test]
    fn test_resolve_root() {
        let (_dir, store, me) = test_store();

        let leaf = find_or_create(&store, me, "r/s/t").unwrap();
        let root = resolve_root(&store, leaf.id).unwrap().unwrap();
        assert_eq!(root.path, "r");
        assert_eq!(root.id, leaf.root_id);

        assert!(resolve_root(&store, 9999).unwrap().is_none());
    }
}
