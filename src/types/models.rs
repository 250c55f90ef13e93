use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Visibility;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
}

/// A node in a per-owner namespace forest.
///
/// `root_id` is denormalized at write time so the authorization gate can
/// resolve the tree's root in O(1) without walking the parent chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Namespace {
    pub id: i64,
    pub user_id: i64,
    pub root_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<i64>,
    pub name: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub visibility: Visibility,
    pub level: i64,
    pub created_at: DateTime<Utc>,
}

impl Namespace {
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

#[derive(Debug)]
pub struct NewNamespace<'a> {
    pub user_id: i64,
    pub parent: Option<&'a Namespace>,
    pub name: &'a str,
    pub path: &'a str,
    pub description: Option<&'a str>,
    pub visibility: Visibility,
    pub level: i64,
}

/// Tree-wide read/limited-write grant. Always keyed on a root namespace id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collaborator {
    pub namespace_id: i64,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
}

/// A pending, single-use offer of collaboration on a namespace tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invite {
    pub id: i64,
    pub namespace_id: i64,
    pub inviter_id: i64,
    pub invitee_id: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub id: String,
    #[serde(skip)]
    pub token_hash: String,
    #[serde(skip)]
    pub token_lookup: String,
    pub is_admin: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Build {
    pub id: i64,
    pub user_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace_id: Option<i64>,
    pub manifest: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Object {
    pub id: i64,
    pub user_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace_id: Option<i64>,
    pub name: String,
    pub size: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variable {
    pub id: i64,
    pub user_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace_id: Option<i64>,
    pub key: String,
    pub value: String,
    pub created_at: DateTime<Utc>,
}

/// An SSH key made available to build environments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Key {
    pub id: i64,
    pub user_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace_id: Option<i64>,
    pub name: String,
    #[serde(skip)]
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A base image builds can run against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Image {
    pub id: i64,
    pub user_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace_id: Option<i64>,
    pub name: String,
    pub driver: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct NewBuild<'a> {
    pub user_id: i64,
    pub namespace_id: Option<i64>,
    pub manifest: &'a str,
    pub note: Option<&'a str>,
}

#[derive(Debug)]
pub struct NewObject<'a> {
    pub user_id: i64,
    pub namespace_id: Option<i64>,
    pub name: &'a str,
    pub size: i64,
}

#[derive(Debug)]
pub struct NewVariable<'a> {
    pub user_id: i64,
    pub namespace_id: Option<i64>,
    pub key: &'a str,
    pub value: &'a str,
}

#[derive(Debug)]
pub struct NewKey<'a> {
    pub user_id: i64,
    pub namespace_id: Option<i64>,
    pub name: &'a str,
    pub key: &'a str,
    pub config: Option<&'a str>,
}

#[derive(Debug)]
pub struct NewImage<'a> {
    pub user_id: i64,
    pub namespace_id: Option<i64>,
    pub name: &'a str,
    pub driver: &'a str,
}
