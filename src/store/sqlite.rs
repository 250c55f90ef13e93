use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};

use super::Store;
use super::schema::SCHEMA;
use crate::error::{Error, Result};
use crate::types::*;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

/// Unique-constraint violations are contended duplicates, not store
/// failures; they surface as `AlreadyExists` so handlers report them as
/// input errors.
fn map_unique_violation(e: rusqlite::Error) -> Error {
    match e {
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Error::AlreadyExists
        }
        e => Error::Database(e),
    }
}

fn parse_visibility(s: &str) -> Visibility {
    Visibility::parse(s).unwrap_or_else(|| {
        tracing::error!("Invalid visibility in database: '{}'", s);
        Visibility::Private
    })
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        created_at: parse_datetime(&row.get::<_, String>(4)?),
    })
}

fn namespace_from_row(row: &Row<'_>) -> rusqlite::Result<Namespace> {
    Ok(Namespace {
        id: row.get(0)?,
        user_id: row.get(1)?,
        root_id: row.get(2)?,
        parent_id: row.get(3)?,
        name: row.get(4)?,
        path: row.get(5)?,
        description: row.get(6)?,
        visibility: parse_visibility(&row.get::<_, String>(7)?),
        level: row.get(8)?,
        created_at: parse_datetime(&row.get::<_, String>(9)?),
    })
}

fn collaborator_from_row(row: &Row<'_>) -> rusqlite::Result<Collaborator> {
    Ok(Collaborator {
        namespace_id: row.get(0)?,
        user_id: row.get(1)?,
        created_at: parse_datetime(&row.get::<_, String>(2)?),
    })
}

fn invite_from_row(row: &Row<'_>) -> rusqlite::Result<Invite> {
    Ok(Invite {
        id: row.get(0)?,
        namespace_id: row.get(1)?,
        inviter_id: row.get(2)?,
        invitee_id: row.get(3)?,
        created_at: parse_datetime(&row.get::<_, String>(4)?),
    })
}

const NAMESPACE_COLS: &str =
    "id, user_id, root_id, parent_id, name, path, description, visibility, level, created_at";

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    // User operations

    fn create_user(&self, user: &NewUser) -> Result<User> {
        let conn = self.conn();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO users (username, email, password_hash, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                user.username,
                user.email,
                user.password_hash,
                format_datetime(&now),
            ],
        )?;

        Ok(User {
            id: conn.last_insert_rowid(),
            username: user.username.to_string(),
            email: user.email.to_string(),
            password_hash: user.password_hash.to_string(),
            created_at: now,
        })
    }

    fn get_user(&self, id: i64) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, username, email, password_hash, created_at FROM users WHERE id = ?1",
            params![id],
            user_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_user_by_handle(&self, handle: &str) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, username, email, password_hash, created_at
             FROM users WHERE username = ?1 OR email = ?1",
            params![handle],
            user_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_users(&self, cursor: i64, limit: i32) -> Result<Vec<User>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, username, email, password_hash, created_at
             FROM users WHERE id > ?1 ORDER BY id LIMIT ?2",
        )?;

        let rows = stmt.query_map(params![cursor, limit], user_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn delete_user(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM users WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // Namespace operations

    fn create_namespace(&self, ns: &NewNamespace) -> Result<Namespace> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let now = Utc::now();

        tx.execute(
            "INSERT INTO namespaces
             (user_id, root_id, parent_id, name, path, description, visibility, level, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                ns.user_id,
                ns.parent.map_or(0, |p| p.root_id),
                ns.parent.map(|p| p.id),
                ns.name,
                ns.path,
                ns.description,
                ns.visibility.as_str(),
                ns.level,
                format_datetime(&now),
            ],
        )
        .map_err(map_unique_violation)?;

        let id = tx.last_insert_rowid();

        // A root's id is unknown before insertion, so the self-reference is
        // written in a required second step within the same transaction.
        let root_id = match ns.parent {
            Some(parent) => parent.root_id,
            None => {
                tx.execute(
                    "UPDATE namespaces SET root_id = id WHERE id = ?1",
                    params![id],
                )?;
                id
            }
        };

        tx.commit()?;

        Ok(Namespace {
            id,
            user_id: ns.user_id,
            root_id,
            parent_id: ns.parent.map(|p| p.id),
            name: ns.name.to_string(),
            path: ns.path.to_string(),
            description: ns.description.map(str::to_string),
            visibility: ns.visibility,
            level: ns.level,
            created_at: now,
        })
    }

    fn get_namespace(&self, id: i64) -> Result<Option<Namespace>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {NAMESPACE_COLS} FROM namespaces WHERE id = ?1"),
            params![id],
            namespace_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_namespace_by_path(&self, user_id: i64, path: &str) -> Result<Option<Namespace>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {NAMESPACE_COLS} FROM namespaces WHERE user_id = ?1 AND path = ?2"),
            params![user_id, path],
            namespace_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn ensure_namespace_path(&self, user_id: i64, path: &str) -> Result<Namespace> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let mut parent: Option<Namespace> = None;
        let mut current_path = String::new();

        for segment in path.split('/') {
            if !current_path.is_empty() {
                current_path.push('/');
            }
            current_path.push_str(segment);

            let existing = tx
                .query_row(
                    &format!(
                        "SELECT {NAMESPACE_COLS} FROM namespaces WHERE user_id = ?1 AND path = ?2"
                    ),
                    params![user_id, current_path],
                    namespace_from_row,
                )
                .optional()?;

            let ns = match existing {
                Some(ns) => ns,
                None => {
                    let now = Utc::now();
                    // Children inherit the parent's visibility; a new root
                    // starts private.
                    let visibility = parent.as_ref().map_or(Visibility::Private, |p| p.visibility);
                    let level = parent.as_ref().map_or(0, |p| p.level + 1);

                    tx.execute(
                        "INSERT INTO namespaces
                         (user_id, root_id, parent_id, name, path, description, visibility, level, created_at)
                         VALUES (?1, ?2, ?3, ?4, ?5, NULL, ?6, ?7, ?8)",
                        params![
                            user_id,
                            parent.as_ref().map_or(0, |p| p.root_id),
                            parent.as_ref().map(|p| p.id),
                            segment,
                            current_path,
                            visibility.as_str(),
                            level,
                            format_datetime(&now),
                        ],
                    )?;

                    let id = tx.last_insert_rowid();
                    let root_id = match parent.as_ref() {
                        Some(p) => p.root_id,
                        None => {
                            tx.execute(
                                "UPDATE namespaces SET root_id = id WHERE id = ?1",
                                params![id],
                            )?;
                            id
                        }
                    };

                    Namespace {
                        id,
                        user_id,
                        root_id,
                        parent_id: parent.as_ref().map(|p| p.id),
                        name: segment.to_string(),
                        path: current_path.clone(),
                        description: None,
                        visibility,
                        level,
                        created_at: now,
                    }
                }
            };

            parent = Some(ns);
        }

        tx.commit()?;

        parent.ok_or_else(|| Error::BadRequest("Path cannot be empty".to_string()))
    }

    fn list_namespaces(&self, user_id: i64) -> Result<Vec<Namespace>> {
        let conn = self.conn();
        // Collaborator grants are tree-wide, so shared trees are matched on
        // the root pointer: every descendant carries its root's id.
        let mut stmt = conn.prepare(&format!(
            "SELECT {NAMESPACE_COLS} FROM namespaces
             WHERE user_id = ?1
                OR root_id IN (SELECT namespace_id FROM collaborators WHERE user_id = ?1)
             ORDER BY user_id, path",
        ))?;

        let rows = stmt.query_map(params![user_id], namespace_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_namespace(&self, ns: &Namespace) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE namespaces SET name = ?1, path = ?2, description = ?3, visibility = ?4
             WHERE id = ?5",
            params![
                ns.name,
                ns.path,
                ns.description,
                ns.visibility.as_str(),
                ns.id
            ],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn cascade_visibility(&self, root_id: i64, visibility: Visibility) -> Result<()> {
        // The denormalized root pointer lets one set-based update cover the
        // whole tree, root included.
        self.conn().execute(
            "UPDATE namespaces SET visibility = ?1 WHERE root_id = ?2",
            params![visibility.as_str(), root_id],
        )?;
        Ok(())
    }

    fn rename_namespace_paths(&self, user_id: i64, old_path: &str, new_path: &str) -> Result<()> {
        let old_prefix = format!("{old_path}/");

        self.conn().execute(
            "UPDATE namespaces SET path = ?1 || substr(path, ?2)
             WHERE user_id = ?3 AND path LIKE ?4",
            params![
                new_path,
                old_prefix.len() as i64,
                user_id,
                format!("{old_prefix}%"),
            ],
        )?;
        Ok(())
    }

    fn delete_namespace(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM namespaces WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // Collaborator operations

    fn get_collaborator(&self, namespace_id: i64, user_id: i64) -> Result<Option<Collaborator>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT namespace_id, user_id, created_at FROM collaborators
             WHERE namespace_id = ?1 AND user_id = ?2",
            params![namespace_id, user_id],
            collaborator_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_collaborators(&self, namespace_id: i64) -> Result<Vec<Collaborator>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT namespace_id, user_id, created_at FROM collaborators
             WHERE namespace_id = ?1 ORDER BY user_id",
        )?;

        let rows = stmt.query_map(params![namespace_id], collaborator_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn delete_collaborator(&self, namespace_id: i64, user_id: i64) -> Result<bool> {
        let rows = self.conn().execute(
            "DELETE FROM collaborators WHERE namespace_id = ?1 AND user_id = ?2",
            params![namespace_id, user_id],
        )?;
        Ok(rows > 0)
    }

    // Invite operations

    fn create_invite(
        &self,
        namespace_id: i64,
        inviter_id: i64,
        invitee_id: i64,
    ) -> Result<Invite> {
        let conn = self.conn();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO invites (namespace_id, inviter_id, invitee_id, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![namespace_id, inviter_id, invitee_id, format_datetime(&now)],
        )?;

        Ok(Invite {
            id: conn.last_insert_rowid(),
            namespace_id,
            inviter_id,
            invitee_id,
            created_at: now,
        })
    }

    fn get_invite(&self, id: i64) -> Result<Option<Invite>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, namespace_id, inviter_id, invitee_id, created_at
             FROM invites WHERE id = ?1",
            params![id],
            invite_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_invite_for(&self, namespace_id: i64, invitee_id: i64) -> Result<Option<Invite>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, namespace_id, inviter_id, invitee_id, created_at
             FROM invites WHERE namespace_id = ?1 AND invitee_id = ?2",
            params![namespace_id, invitee_id],
            invite_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_invites_for(&self, invitee_id: i64) -> Result<Vec<Invite>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, namespace_id, inviter_id, invitee_id, created_at
             FROM invites WHERE invitee_id = ?1 ORDER BY id",
        )?;

        let rows = stmt.query_map(params![invitee_id], invite_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn accept_invite(&self, id: i64) -> Result<Option<Collaborator>> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let invite = tx
            .query_row(
                "SELECT id, namespace_id, inviter_id, invitee_id, created_at
                 FROM invites WHERE id = ?1",
                params![id],
                invite_from_row,
            )
            .optional()?;

        let Some(invite) = invite else {
            return Ok(None);
        };

        let now = Utc::now();
        tx.execute(
            "INSERT INTO collaborators (namespace_id, user_id, created_at)
             VALUES (?1, ?2, ?3)",
            params![invite.namespace_id, invite.invitee_id, format_datetime(&now)],
        )?;
        tx.execute("DELETE FROM invites WHERE id = ?1", params![id])?;

        tx.commit()?;

        Ok(Some(Collaborator {
            namespace_id: invite.namespace_id,
            user_id: invite.invitee_id,
            created_at: now,
        }))
    }

    fn delete_invite(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM invites WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // Token operations

    fn create_token(&self, token: &Token) -> Result<()> {
        self.conn().execute(
            "INSERT INTO tokens (id, token_hash, token_lookup, is_admin, user_id, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                token.id,
                token.token_hash,
                token.token_lookup,
                token.is_admin,
                token.user_id,
                format_datetime(&token.created_at),
                token.expires_at.as_ref().map(format_datetime),
            ],
        )?;
        Ok(())
    }

    fn get_token_by_id(&self, id: &str) -> Result<Option<Token>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, token_hash, token_lookup, is_admin, user_id, created_at, expires_at, last_used_at
             FROM tokens WHERE id = ?1",
            params![id],
            token_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_token_by_lookup(&self, lookup: &str) -> Result<Option<Token>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, token_hash, token_lookup, is_admin, user_id, created_at, expires_at, last_used_at
             FROM tokens WHERE token_lookup = ?1",
            params![lookup],
            token_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_user_tokens(&self, user_id: i64) -> Result<Vec<Token>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, token_hash, token_lookup, is_admin, user_id, created_at, expires_at, last_used_at
             FROM tokens WHERE user_id = ?1 ORDER BY created_at",
        )?;

        let rows = stmt.query_map(params![user_id], token_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn delete_token(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM tokens WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    fn update_token_last_used(&self, id: &str) -> Result<()> {
        self.conn().execute(
            "UPDATE tokens SET last_used_at = ?1 WHERE id = ?2",
            params![format_datetime(&Utc::now()), id],
        )?;
        Ok(())
    }

    fn has_admin_token(&self) -> Result<bool> {
        let conn = self.conn();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM tokens WHERE is_admin = 1",
            [],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    // Build operations

    fn create_build(&self, build: &NewBuild) -> Result<Build> {
        let conn = self.conn();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO builds (user_id, namespace_id, manifest, status, note, created_at)
             VALUES (?1, ?2, ?3, 'queued', ?4, ?5)",
            params![
                build.user_id,
                build.namespace_id,
                build.manifest,
                build.note,
                format_datetime(&now),
            ],
        )?;

        Ok(Build {
            id: conn.last_insert_rowid(),
            user_id: build.user_id,
            namespace_id: build.namespace_id,
            manifest: build.manifest.to_string(),
            status: "queued".to_string(),
            note: build.note.map(str::to_string),
            created_at: now,
        })
    }

    fn get_build(&self, id: i64) -> Result<Option<Build>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, user_id, namespace_id, manifest, status, note, created_at
             FROM builds WHERE id = ?1",
            params![id],
            build_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_builds(&self, user_id: i64) -> Result<Vec<Build>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT id, user_id, namespace_id, manifest, status, note, created_at
             FROM builds WHERE {SHARED_SCOPE} ORDER BY id DESC",
        ))?;

        let rows = stmt.query_map(params![user_id], build_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Object operations

    fn create_object(&self, object: &NewObject) -> Result<Object> {
        let conn = self.conn();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO objects (user_id, namespace_id, name, size, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                object.user_id,
                object.namespace_id,
                object.name,
                object.size,
                format_datetime(&now),
            ],
        )?;

        Ok(Object {
            id: conn.last_insert_rowid(),
            user_id: object.user_id,
            namespace_id: object.namespace_id,
            name: object.name.to_string(),
            size: object.size,
            created_at: now,
        })
    }

    fn get_object(&self, id: i64) -> Result<Option<Object>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, user_id, namespace_id, name, size, created_at
             FROM objects WHERE id = ?1",
            params![id],
            object_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_objects(&self, user_id: i64) -> Result<Vec<Object>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT id, user_id, namespace_id, name, size, created_at
             FROM objects WHERE {SHARED_SCOPE} ORDER BY name",
        ))?;

        let rows = stmt.query_map(params![user_id], object_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn delete_object(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM objects WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // Variable operations

    fn create_variable(&self, variable: &NewVariable) -> Result<Variable> {
        let conn = self.conn();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO variables (user_id, namespace_id, key, value, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                variable.user_id,
                variable.namespace_id,
                variable.key,
                variable.value,
                format_datetime(&now),
            ],
        )?;

        Ok(Variable {
            id: conn.last_insert_rowid(),
            user_id: variable.user_id,
            namespace_id: variable.namespace_id,
            key: variable.key.to_string(),
            value: variable.value.to_string(),
            created_at: now,
        })
    }

    fn get_variable(&self, id: i64) -> Result<Option<Variable>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, user_id, namespace_id, key, value, created_at
             FROM variables WHERE id = ?1",
            params![id],
            variable_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_variables(&self, user_id: i64) -> Result<Vec<Variable>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT id, user_id, namespace_id, key, value, created_at
             FROM variables WHERE {SHARED_SCOPE} ORDER BY key",
        ))?;

        let rows = stmt.query_map(params![user_id], variable_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn delete_variable(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM variables WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // SSH key operations

    fn create_key(&self, key: &NewKey) -> Result<Key> {
        let conn = self.conn();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO ssh_keys (user_id, namespace_id, name, key, config, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                key.user_id,
                key.namespace_id,
                key.name,
                key.key,
                key.config,
                format_datetime(&now),
            ],
        )?;

        Ok(Key {
            id: conn.last_insert_rowid(),
            user_id: key.user_id,
            namespace_id: key.namespace_id,
            name: key.name.to_string(),
            key: key.key.to_string(),
            config: key.config.map(str::to_string),
            created_at: now,
        })
    }

    fn get_key(&self, id: i64) -> Result<Option<Key>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, user_id, namespace_id, name, key, config, created_at
             FROM ssh_keys WHERE id = ?1",
            params![id],
            key_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_keys(&self, user_id: i64) -> Result<Vec<Key>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT id, user_id, namespace_id, name, key, config, created_at
             FROM ssh_keys WHERE {SHARED_SCOPE} ORDER BY name",
        ))?;

        let rows = stmt.query_map(params![user_id], key_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn delete_key(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM ssh_keys WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // Image operations

    fn create_image(&self, image: &NewImage) -> Result<Image> {
        let conn = self.conn();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO images (user_id, namespace_id, name, driver, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                image.user_id,
                image.namespace_id,
                image.name,
                image.driver,
                format_datetime(&now),
            ],
        )?;

        Ok(Image {
            id: conn.last_insert_rowid(),
            user_id: image.user_id,
            namespace_id: image.namespace_id,
            name: image.name.to_string(),
            driver: image.driver.to_string(),
            created_at: now,
        })
    }

    fn get_image(&self, id: i64) -> Result<Option<Image>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, user_id, namespace_id, name, driver, created_at
             FROM images WHERE id = ?1",
            params![id],
            image_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_images(&self, user_id: i64) -> Result<Vec<Image>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT id, user_id, namespace_id, name, driver, created_at
             FROM images WHERE {SHARED_SCOPE} ORDER BY name",
        ))?;

        let rows = stmt.query_map(params![user_id], image_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn delete_image(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM images WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }
}

/// WHERE fragment selecting rows a user owns plus rows scoped to any
/// namespace tree they collaborate on. `?1` binds the user id.
const SHARED_SCOPE: &str = "(user_id = ?1
        OR namespace_id IN (
            SELECT n.id FROM namespaces n
            JOIN collaborators c ON c.namespace_id = n.root_id
            WHERE c.user_id = ?1
        ))";

fn token_from_row(row: &Row<'_>) -> rusqlite::Result<Token> {
    Ok(Token {
        id: row.get(0)?,
        token_hash: row.get(1)?,
        token_lookup: row.get(2)?,
        is_admin: row.get(3)?,
        user_id: row.get(4)?,
        created_at: parse_datetime(&row.get::<_, String>(5)?),
        expires_at: row.get::<_, Option<String>>(6)?.map(|s| parse_datetime(&s)),
        last_used_at: row.get::<_, Option<String>>(7)?.map(|s| parse_datetime(&s)),
    })
}

fn build_from_row(row: &Row<'_>) -> rusqlite::Result<Build> {
    Ok(Build {
        id: row.get(0)?,
        user_id: row.get(1)?,
        namespace_id: row.get(2)?,
        manifest: row.get(3)?,
        status: row.get(4)?,
        note: row.get(5)?,
        created_at: parse_datetime(&row.get::<_, String>(6)?),
    })
}

fn object_from_row(row: &Row<'_>) -> rusqlite::Result<Object> {
    Ok(Object {
        id: row.get(0)?,
        user_id: row.get(1)?,
        namespace_id: row.get(2)?,
        name: row.get(3)?,
        size: row.get(4)?,
        created_at: parse_datetime(&row.get::<_, String>(5)?),
    })
}

fn variable_from_row(row: &Row<'_>) -> rusqlite::Result<Variable> {
    Ok(Variable {
        id: row.get(0)?,
        user_id: row.get(1)?,
        namespace_id: row.get(2)?,
        key: row.get(3)?,
        value: row.get(4)?,
        created_at: parse_datetime(&row.get::<_, String>(5)?),
    })
}

fn key_from_row(row: &Row<'_>) -> rusqlite::Result<Key> {
    Ok(Key {
        id: row.get(0)?,
        user_id: row.get(1)?,
        namespace_id: row.get(2)?,
        name: row.get(3)?,
        key: row.get(4)?,
        config: row.get(5)?,
        created_at: parse_datetime(&row.get::<_, String>(6)?),
    })
}

fn image_from_row(row: &Row<'_>) -> rusqlite::Result<Image> {
    Ok(Image {
        id: row.get(0)?,
        user_id: row.get(1)?,
        namespace_id: row.get(2)?,
        name: row.get(3)?,
        driver: row.get(4)?,
        created_at: parse_datetime(&row.get::<_, String>(5)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

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

    #[test]
    fn test_root_namespace_self_reference() {
        let (_dir, store) = test_store();
        let user = test_user(&store, "me");

        let ns = store
            .create_namespace(&NewNamespace {
                user_id: user.id,
                parent: None,
                name: "conclave",
                path: "conclave",
                description: None,
                visibility: Visibility::Private,
                level: 0,
            })
            .unwrap();

        assert_eq!(ns.root_id, ns.id);
        assert!(ns.is_root());

        // The persisted row agrees with the returned value.
        let row = store.get_namespace(ns.id).unwrap().unwrap();
        assert_eq!(row.root_id, row.id);
        assert_eq!(row.parent_id, None);
        assert_eq!(row.level, 0);
    }

    #[test]
    fn test_child_copies_root_pointer() {
        let (_dir, store) = test_store();
        let user = test_user(&store, "me");

        let root = store
            .create_namespace(&NewNamespace {
                user_id: user.id,
                parent: None,
                name: "team",
                path: "team",
                description: None,
                visibility: Visibility::Internal,
                level: 0,
            })
            .unwrap();

        let child = store
            .create_namespace(&NewNamespace {
                user_id: user.id,
                parent: Some(&root),
                name: "project",
                path: "team/project",
                description: None,
                visibility: Visibility::Internal,
                level: 1,
            })
            .unwrap();

        assert_eq!(child.root_id, root.id);
        assert_eq!(child.parent_id, Some(root.id));
        assert_eq!(child.level, 1);
    }

    #[test]
    fn test_ensure_namespace_path_creates_chain() {
        let (_dir, store) = test_store();
        let user = test_user(&store, "me");

        let leaf = store.ensure_namespace_path(user.id, "a/b/c").unwrap();
        assert_eq!(leaf.path, "a/b/c");
        assert_eq!(leaf.level, 2);

        let root = store.get_namespace_by_path(user.id, "a").unwrap().unwrap();
        assert_eq!(root.root_id, root.id);
        assert_eq!(leaf.root_id, root.id);

        // Existing segments are reused, not duplicated.
        let again = store.ensure_namespace_path(user.id, "a/b/c").unwrap();
        assert_eq!(again.id, leaf.id);
    }

    #[test]
    fn test_ensure_namespace_path_inherits_visibility() {
        let (_dir, store) = test_store();
        let user = test_user(&store, "me");

        let root = store
            .create_namespace(&NewNamespace {
                user_id: user.id,
                parent: None,
                name: "pub",
                path: "pub",
                description: None,
                visibility: Visibility::Public,
                level: 0,
            })
            .unwrap();

        let leaf = store.ensure_namespace_path(user.id, "pub/sub/deep").unwrap();
        assert_eq!(leaf.visibility, Visibility::Public);
        assert_eq!(leaf.root_id, root.id);
    }

    #[test]
    fn test_cascade_visibility_rewrites_tree() {
        let (_dir, store) = test_store();
        let user = test_user(&store, "me");

        let leaf = store.ensure_namespace_path(user.id, "x/y/z").unwrap();
        store
            .cascade_visibility(leaf.root_id, Visibility::Public)
            .unwrap();

        for path in ["x", "x/y", "x/y/z"] {
            let ns = store.get_namespace_by_path(user.id, path).unwrap().unwrap();
            assert_eq!(ns.visibility, Visibility::Public, "{path}");
        }
    }

    #[test]
    fn test_duplicate_path_rejected() {
        let (_dir, store) = test_store();
        let user = test_user(&store, "me");

        let new = NewNamespace {
            user_id: user.id,
            parent: None,
            name: "dup",
            path: "dup",
            description: None,
            visibility: Visibility::Private,
            level: 0,
        };
        store.create_namespace(&new).unwrap();

        // The UNIQUE(user_id, path) violation maps to AlreadyExists even
        // when the insert races past any caller-side existence check.
        assert!(matches!(
            store.create_namespace(&new),
            Err(Error::AlreadyExists)
        ));
    }

    #[test]
    fn test_accept_invite_consumes_row() {
        let (_dir, store) = test_store();
        let owner = test_user(&store, "owner");
        let guest = test_user(&store, "guest");

        let root = store.ensure_namespace_path(owner.id, "shared").unwrap();
        let invite = store.create_invite(root.id, owner.id, guest.id).unwrap();

        let collab = store.accept_invite(invite.id).unwrap().unwrap();
        assert_eq!(collab.namespace_id, root.id);
        assert_eq!(collab.user_id, guest.id);
        assert!(store.get_collaborator(root.id, guest.id).unwrap().is_some());

        // The invite was deleted with the same transaction, so a second
        // accept finds nothing.
        assert!(store.accept_invite(invite.id).unwrap().is_none());
    }

    #[test]
    fn test_pending_invite_unique_per_invitee() {
        let (_dir, store) = test_store();
        let owner = test_user(&store, "owner");
        let guest = test_user(&store, "guest");

        let root = store.ensure_namespace_path(owner.id, "shared").unwrap();
        store.create_invite(root.id, owner.id, guest.id).unwrap();
        assert!(store.create_invite(root.id, owner.id, guest.id).is_err());
    }

    #[test]
    fn test_list_namespaces_includes_shared_descendants() {
        let (_dir, store) = test_store();
        let owner = test_user(&store, "owner");
        let guest = test_user(&store, "guest");

        let leaf = store.ensure_namespace_path(owner.id, "tree/sub").unwrap();
        let invite = store
            .create_invite(leaf.root_id, owner.id, guest.id)
            .unwrap();
        store.accept_invite(invite.id).unwrap().unwrap();

        // The grant covers the whole tree, so the guest sees every row in
        // it, not only the root.
        let paths: Vec<String> = store
            .list_namespaces(guest.id)
            .unwrap()
            .into_iter()
            .map(|ns| ns.path)
            .collect();
        assert_eq!(paths, ["tree", "tree/sub"]);

        // A stranger still sees nothing.
        let other = test_user(&store, "other");
        assert!(store.list_namespaces(other.id).unwrap().is_empty());
    }

    #[test]
    fn test_delete_namespace_keeps_descendants() {
        let (_dir, store) = test_store();
        let user = test_user(&store, "me");

        let leaf = store.ensure_namespace_path(user.id, "top/mid/leaf").unwrap();
        let root = store.get_namespace_by_path(user.id, "top").unwrap().unwrap();

        assert!(store.delete_namespace(root.id).unwrap());
        assert!(store.get_namespace(root.id).unwrap().is_none());
        assert!(store.get_namespace(leaf.id).unwrap().is_some());
    }

    #[test]
    fn test_every_root_pointer_targets_a_root_row() {
        let (_dir, store) = test_store();
        let user = test_user(&store, "me");

        store.ensure_namespace_path(user.id, "a/b/c").unwrap();
        store.ensure_namespace_path(user.id, "d/e").unwrap();
        store.ensure_namespace_path(user.id, "f").unwrap();

        for ns in store.list_namespaces(user.id).unwrap() {
            let root = store.get_namespace(ns.root_id).unwrap().unwrap();
            assert_eq!(root.parent_id, None, "{}", ns.path);
            assert_eq!(root.root_id, root.id);
        }
    }
}
