//! Authenticated self-service endpoints for the current user.

use axum::{extract::Extension, http::HeaderMap, http::StatusCode, response::IntoResponse, Json};
use std::path::Path;
use std::sync::Arc;

use super::principal::require_auth;
use super::types::{AvatarBody, CoverImageBody, UpdateProfileBody};
use crate::account::error::AccountError;
use crate::account::service;
use crate::account::store::UserStore;
use crate::account::types::SanitizedUser;
use crate::api::response::ApiResponse;
use crate::media::MediaUploader;
use crate::token::TokenService;

#[utoipa::path(
    get,
    path = "/v1/users/me",
    responses(
        (status = 200, description = "The authenticated user's profile.", body = SanitizedUser),
        (status = 401, description = "Missing or invalid access token."),
    ),
    tag = "users"
)]
pub async fn get_me(
    headers: HeaderMap,
    store: Extension<Arc<dyn UserStore>>,
    tokens: Extension<Arc<TokenService>>,
) -> Result<impl IntoResponse, AccountError> {
    let principal = require_auth(&headers, &tokens)?;
    let user = service::current_user(store.0.as_ref(), principal.user_id).await?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::ok(user, "current user fetched")),
    ))
}

#[utoipa::path(
    patch,
    path = "/v1/users/me",
    request_body = UpdateProfileBody,
    responses(
        (status = 200, description = "Profile updated.", body = SanitizedUser),
        (status = 400, description = "Missing or invalid fields."),
        (status = 401, description = "Missing or invalid access token."),
    ),
    tag = "users"
)]
pub async fn patch_me(
    headers: HeaderMap,
    store: Extension<Arc<dyn UserStore>>,
    tokens: Extension<Arc<TokenService>>,
    Json(body): Json<UpdateProfileBody>,
) -> Result<impl IntoResponse, AccountError> {
    let principal = require_auth(&headers, &tokens)?;
    let user = service::update_profile(store.0.as_ref(), principal.user_id, body.into()).await?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::ok(user, "profile updated successfully")),
    ))
}

#[utoipa::path(
    patch,
    path = "/v1/users/me/avatar",
    request_body = AvatarBody,
    responses(
        (status = 200, description = "Avatar replaced.", body = SanitizedUser),
        (status = 400, description = "No staged file, or the upload failed."),
        (status = 401, description = "Missing or invalid access token."),
    ),
    tag = "users"
)]
pub async fn patch_avatar(
    headers: HeaderMap,
    store: Extension<Arc<dyn UserStore>>,
    tokens: Extension<Arc<TokenService>>,
    media: Extension<Arc<dyn MediaUploader>>,
    Json(body): Json<AvatarBody>,
) -> Result<impl IntoResponse, AccountError> {
    let principal = require_auth(&headers, &tokens)?;
    let user = service::update_avatar(
        store.0.as_ref(),
        media.0.as_ref(),
        principal.user_id,
        body.avatar_path.as_deref().map(Path::new),
    )
    .await?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::ok(user, "avatar updated successfully")),
    ))
}

#[utoipa::path(
    patch,
    path = "/v1/users/me/cover-image",
    request_body = CoverImageBody,
    responses(
        (status = 200, description = "Cover image replaced.", body = SanitizedUser),
        (status = 400, description = "No staged file, or the upload failed."),
        (status = 401, description = "Missing or invalid access token."),
    ),
    tag = "users"
)]
pub async fn patch_cover_image(
    headers: HeaderMap,
    store: Extension<Arc<dyn UserStore>>,
    tokens: Extension<Arc<TokenService>>,
    media: Extension<Arc<dyn MediaUploader>>,
    Json(body): Json<CoverImageBody>,
) -> Result<impl IntoResponse, AccountError> {
    let principal = require_auth(&headers, &tokens)?;
    let user = service::update_cover_image(
        store.0.as_ref(),
        media.0.as_ref(),
        principal.user_id,
        body.cover_image_path.as_deref().map(Path::new),
    )
    .await?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::ok(user, "cover image updated successfully")),
    ))
}
