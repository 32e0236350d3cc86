//! Core account types and the typed requests consumed by the session logic.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use utoipa::ToSchema;
use uuid::Uuid;

/// Full user record as owned by the credential store.
///
/// Never serialized to clients; responses use [`SanitizedUser`].
#[derive(Clone, Debug)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    pub avatar_url: String,
    pub cover_image_url: String,
    pub refresh_token: Option<String>,
}

/// Fields required to create a new user record.
#[derive(Clone, Debug)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    pub avatar_url: String,
    pub cover_image_url: String,
}

/// User projection returned to clients.
///
/// `password_hash` and `refresh_token` are omitted by construction, not by
/// serde attributes, so they can never leak through serialization changes.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SanitizedUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar_url: String,
    pub cover_image_url: String,
}

impl From<User> for SanitizedUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            full_name: user.full_name,
            avatar_url: user.avatar_url,
            cover_image_url: user.cover_image_url,
        }
    }
}

/// Freshly issued access/refresh token pair.
#[derive(Clone, Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Registration input, validated before any external call is made.
///
/// File fields are local paths staged by the upload middleware in front of
/// the API; the media adapter turns them into durable URLs.
#[derive(Clone, Debug)]
pub struct RegisterRequest {
    pub full_name: String,
    pub email: String,
    pub username: String,
    pub password: String,
    pub avatar_path: Option<PathBuf>,
    pub cover_image_path: Option<PathBuf>,
}

/// Login input; at least one of `username`/`email` must be present.
#[derive(Clone, Debug)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: String,
}

#[derive(Clone, Debug)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

#[derive(Clone, Debug)]
pub struct UpdateProfileRequest {
    pub full_name: String,
    pub email: String,
}
