//! Collaborator/invite lifecycle.
//!
//! Cross-user sharing is granted through a small state machine per
//! (root namespace, candidate user) pair:
//!
//! ```text
//! NoRelation --invite(by owner)--> Pending --accept(by invitee)--> Collaborator
//! Pending --reject(by invitee)--> NoRelation
//! Collaborator --remove(by owner, or self)--> NoRelation
//! ```
//!
//! Invites and collaborator rows are always keyed on a tree's **root**
//! namespace so that grants are tree-wide. Owner-only enforcement for
//! creating invites sits with the caller.

use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{Collaborator, Invite, Namespace, User};

/// A validation failure while creating an invite, carrying the form field
/// it belongs to.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum InviteError {
    #[error("handle is required")]
    HandleRequired,

    #[error("you cannot invite yourself")]
    SelfInvite,

    #[error("no such user")]
    UserNotFound,

    #[error("user has already been invited")]
    AlreadyInvited,

    #[error("user is already a collaborator")]
    AlreadyCollaborator,

    #[error("database error: {0}")]
    Store(String),
}

impl InviteError {
    /// The form field the error should be reported against.
    #[must_use]
    pub fn field(&self) -> &'static str {
        match self {
            InviteError::Store(_) => "",
            _ => "handle",
        }
    }
}

impl From<Error> for InviteError {
    fn from(err: Error) -> Self {
        InviteError::Store(err.to_string())
    }
}

/// Creates a pending invite for the user identified by `handle` (username
/// or email) on the tree rooted at `root`.
///
/// Validation runs in order: handle present, not the inviter themselves,
/// user exists, not already invited, not already a collaborator. A
/// self-invite is rejected before touching persistence.
pub fn invite(
    store: &dyn Store,
    inviter: &User,
    root: &Namespace,
    handle: &str,
) -> std::result::Result<Invite, InviteError> {
    let handle = handle.trim();
    if handle.is_empty() {
        return Err(InviteError::HandleRequired);
    }
    if handle == inviter.username || handle == inviter.email {
        return Err(InviteError::SelfInvite);
    }

    let invitee = store
        .get_user_by_handle(handle)?
        .ok_or(InviteError::UserNotFound)?;
    if invitee.id == inviter.id {
        return Err(InviteError::SelfInvite);
    }

    if store.get_invite_for(root.root_id, invitee.id)?.is_some() {
        return Err(InviteError::AlreadyInvited);
    }
    if store.get_collaborator(root.root_id, invitee.id)?.is_some() {
        return Err(InviteError::AlreadyCollaborator);
    }

    Ok(store.create_invite(root.root_id, inviter.id, invitee.id)?)
}

/// Accepts a pending invite, consuming it into a collaborator row in one
/// transaction. Only the invitee may accept; anyone else sees `NotFound`.
pub fn accept(store: &dyn Store, invite_id: i64, acting: &User) -> Result<Collaborator> {
    let invite = store.get_invite(invite_id)?.ok_or(Error::NotFound)?;
    if invite.invitee_id != acting.id {
        return Err(Error::NotFound);
    }

    store.accept_invite(invite.id)?.ok_or(Error::NotFound)
}

/// Rejects a pending invite, deleting it. Only the invitee may reject.
pub fn reject(store: &dyn Store, invite_id: i64, acting: &User) -> Result<()> {
    let invite = store.get_invite(invite_id)?.ok_or(Error::NotFound)?;
    if invite.invitee_id != acting.id {
        return Err(Error::NotFound);
    }

    if !store.delete_invite(invite.id)? {
        return Err(Error::NotFound);
    }
    Ok(())
}

/// Removes a collaborator from the tree rooted at `root`. The tree owner
/// may remove anyone; a collaborator may remove themselves. Everyone else
/// sees `NotFound`.
pub fn remove_collaborator(
    store: &dyn Store,
    root: &Namespace,
    acting: &User,
    target_user_id: i64,
) -> Result<()> {
    if acting.id != root.user_id && acting.id != target_user_id {
        return Err(Error::NotFound);
    }

    if !store.delete_collaborator(root.root_id, target_user_id)? {
        return Err(Error::NotFound);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespace;
    use crate::store::SqliteStore;
    use crate::types::{NewUser, Visibility};

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

    fn test_root(store: &SqliteStore, owner: &User) -> Namespace {
        namespace::create(store, owner.id, None, "shared", None, Visibility::Private).unwrap()
    }

    #[test]
    fn test_invite_validation_order() {
        let (_dir, store) = test_store();
        let owner = test_user(&store, "owner");
        let root = test_root(&store, &owner);

        assert_eq!(
            invite(&store, &owner, &root, "  ").unwrap_err(),
            InviteError::HandleRequired
        );
        assert_eq!(
            invite(&store, &owner, &root, "owner").unwrap_err(),
            InviteError::SelfInvite
        );
        assert_eq!(
            invite(&store, &owner, &root, "owner@example.com").unwrap_err(),
            InviteError::SelfInvite
        );
        assert_eq!(
            invite(&store, &owner, &root, "nobody").unwrap_err(),
            InviteError::UserNotFound
        );
    }

    #[test]
    fn test_self_invite_touches_nothing() {
        let (_dir, store) = test_store();
        let owner = test_user(&store, "owner");
        let root = test_root(&store, &owner);

        let _ = invite(&store, &owner, &root, "owner");
        assert!(store.list_invites_for(owner.id).unwrap().is_empty());
    }

    #[test]
    fn test_invite_accept_creates_collaborator() {
        let (_dir, store) = test_store();
        let owner = test_user(&store, "owner");
        let guest = test_user(&store, "guest");
        let root = test_root(&store, &owner);

        let inv = invite(&store, &owner, &root, "guest").unwrap();
        assert_eq!(inv.invitee_id, guest.id);

        // Duplicate pending invite is rejected.
        assert_eq!(
            invite(&store, &owner, &root, "guest").unwrap_err(),
            InviteError::AlreadyInvited
        );

        let collab = accept(&store, inv.id, &guest).unwrap();
        assert_eq!(collab.namespace_id, root.id);

        // Once a collaborator, a fresh invite is rejected too.
        assert_eq!(
            invite(&store, &owner, &root, "guest").unwrap_err(),
            InviteError::AlreadyCollaborator
        );
    }

    #[test]
    fn test_accept_is_single_use() {
        let (_dir, store) = test_store();
        let owner = test_user(&store, "owner");
        let guest = test_user(&store, "guest");
        let root = test_root(&store, &owner);

        let inv = invite(&store, &owner, &root, "guest").unwrap();
        accept(&store, inv.id, &guest).unwrap();

        assert!(matches!(
            accept(&store, inv.id, &guest),
            Err(Error::NotFound)
        ));
    }

    #[test]
    fn test_only_invitee_may_accept_or_reject() {
        let (_dir, store) = test_store();
        let owner = test_user(&store, "owner");
        let guest = test_user(&store, "guest");
        let other = test_user(&store, "other");
        let root = test_root(&store, &owner);

        let inv = invite(&store, &owner, &root, "guest").unwrap();

        assert!(matches!(
            accept(&store, inv.id, &other),
            Err(Error::NotFound)
        ));
        assert!(matches!(
            reject(&store, inv.id, &owner),
            Err(Error::NotFound)
        ));

        reject(&store, inv.id, &guest).unwrap();
        assert!(store.get_collaborator(root.id, guest.id).unwrap().is_none());
        assert!(store.get_invite(inv.id).unwrap().is_none());
    }

    #[test]
    fn test_remove_collaborator_owner_and_self() {
        let (_dir, store) = test_store();
        let owner = test_user(&store, "owner");
        let guest = test_user(&store, "guest");
        let other = test_user(&store, "other");
        let root = test_root(&store, &owner);

        let inv = invite(&store, &owner, &root, "guest").unwrap();
        accept(&store, inv.id, &guest).unwrap();

        // A third party cannot remove anyone.
        assert!(matches!(
            remove_collaborator(&store, &root, &other, guest.id),
            Err(Error::NotFound)
        ));

        // The owner can.
        remove_collaborator(&store, &root, &owner, guest.id).unwrap();
        assert!(store.get_collaborator(root.id, guest.id).unwrap().is_none());

        // A collaborator can remove themselves.
        let inv = invite(&store, &owner, &root, "guest").unwrap();
        accept(&store, inv.id, &guest).unwrap();
        remove_collaborator(&store, &root, &guest, guest.id).unwrap();
        assert!(store.get_collaborator(root.id, guest.id).unwrap().is_none());
    }
}
