//! Request and response bodies for the HTTP API.

use serde::{Deserialize, Serialize};

use crate::types::Visibility;

#[derive(Debug, Deserialize)]
pub struct PaginationParams {
    pub cursor: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateNamespaceRequest {
    pub name: String,
    pub parent: Option<String>,
    pub description: Option<String>,
    pub visibility: Option<Visibility>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateNamespaceRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub visibility: Option<Visibility>,
}

#[derive(Debug, Deserialize)]
pub struct CreateInviteRequest {
    pub handle: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateBuildRequest {
    pub manifest: String,
    pub note: Option<String>,
    pub namespace: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateObjectRequest {
    pub name: String,
    #[serde(default)]
    pub size: i64,
    pub namespace: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateVariableRequest {
    pub key: String,
    pub value: String,
    pub namespace: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateKeyRequest {
    pub name: String,
    pub key: String,
    pub config: Option<String>,
    pub namespace: Option<String>,
}

fn default_driver() -> String {
    "qemu".to_string()
}

#[derive(Debug, Deserialize)]
pub struct CreateImageRequest {
    pub name: String,
    #[serde(default = "default_driver")]
    pub driver: String,
    pub namespace: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserTokenRequest {
    pub expires_in_seconds: Option<i64>,
}

/// Token metadata for list endpoints. The secret is never echoed back.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub id: String,
    pub user_id: Option<i64>,
    pub created_at: String,
    pub expires_at: Option<String>,
    pub last_used_at: Option<String>,
}

/// Returned once at creation time; the only moment the raw token exists.
#[derive(Debug, Serialize)]
pub struct CreateTokenResponse {
    pub token: String,
    #[serde(flatten)]
    pub metadata: TokenResponse,
}

impl From<&crate::types::Token> for TokenResponse {
    fn from(t: &crate::types::Token) -> Self {
        Self {
            id: t.id.clone(),
            user_id: t.user_id,
            created_at: t.created_at.to_rfc3339(),
            expires_at: t.expires_at.map(|e| e.to_rfc3339()),
            last_used_at: t.last_used_at.map(|l| l.to_rfc3339()),
        }
    }
}
