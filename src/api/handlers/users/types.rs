//! Wire types for the user endpoints.
//!
//! File fields carry the staged path produced by the upload middleware in
//! front of this service, not raw bytes.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use utoipa::ToSchema;

use crate::account::types::{
    ChangePasswordRequest, LoginRequest, RegisterRequest, SanitizedUser, UpdateProfileRequest,
};

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterBody {
    pub full_name: String,
    pub email: String,
    pub username: String,
    pub password: String,
    pub avatar_path: Option<String>,
    pub cover_image_path: Option<String>,
}

impl From<RegisterBody> for RegisterRequest {
    fn from(body: RegisterBody) -> Self {
        Self {
            full_name: body.full_name,
            email: body.email,
            username: body.username,
            password: body.password,
            avatar_path: body.avatar_path.map(PathBuf::from),
            cover_image_path: body.cover_image_path.map(PathBuf::from),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginBody {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: String,
}

impl From<LoginBody> for LoginRequest {
    fn from(body: LoginBody) -> Self {
        Self {
            username: body.username,
            email: body.email,
            password: body.password,
        }
    }
}

/// Login and refresh responses carry the tokens in the body as well as in
/// cookies, for clients that cannot use cookies.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionBody {
    pub user: SanitizedUser,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshBody {
    pub refresh_token: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordBody {
    pub old_password: String,
    pub new_password: String,
}

impl From<ChangePasswordBody> for ChangePasswordRequest {
    fn from(body: ChangePasswordBody) -> Self {
        Self {
            old_password: body.old_password,
            new_password: body.new_password,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileBody {
    pub full_name: String,
    pub email: String,
}

impl From<UpdateProfileBody> for UpdateProfileRequest {
    fn from(body: UpdateProfileBody) -> Self {
        Self {
            full_name: body.full_name,
            email: body.email,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AvatarBody {
    pub avatar_path: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CoverImageBody {
    pub cover_image_path: Option<String>,
}
