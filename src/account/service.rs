//! Session endpoint logic: the decision sequences behind register, login,
//! logout, token refresh, password change, and profile updates.
//!
//! Everything here is transport-independent; axum handlers adapt HTTP
//! requests into the typed inputs and map [`AccountError`] at the boundary.

use regex::Regex;
use std::path::Path;
use tracing::debug;
use uuid::Uuid;

use super::error::AccountError;
use super::password::{hash_password, verify_password};
use super::store::{CreateOutcome, UserStore};
use super::types::{
    ChangePasswordRequest, LoginRequest, NewUser, RegisterRequest, SanitizedUser, TokenPair,
    UpdateProfileRequest, User,
};
use crate::media::MediaUploader;
use crate::token::TokenService;

/// Register a new user: validate, conflict-check, upload media, persist,
/// and return the sanitized record.
///
/// # Errors
///
/// Fails with `Validation` for blank fields or a missing avatar file,
/// `Conflict` when the username or email is taken, `Upload` when the media
/// host produces no avatar URL, and `Internal` when the created record
/// cannot be read back.
pub async fn register(
    store: &dyn UserStore,
    media: &dyn MediaUploader,
    request: RegisterRequest,
) -> Result<SanitizedUser, AccountError> {
    let blank = [
        &request.full_name,
        &request.email,
        &request.username,
        &request.password,
    ]
    .iter()
    .any(|field| field.trim().is_empty());
    if blank {
        return Err(AccountError::Validation(
            "all fields are required".to_string(),
        ));
    }

    let username = request.username.trim().to_lowercase();
    let email = request.email.trim().to_string();

    if !valid_email(&email) {
        return Err(AccountError::Validation(
            "email address is not valid".to_string(),
        ));
    }

    let existing = store
        .find_by_username_or_email(Some(&username), Some(&email))
        .await
        .map_err(AccountError::Persistence)?;
    if existing.is_some() {
        return Err(AccountError::Conflict(
            "user is already registered with this email or username".to_string(),
        ));
    }

    let Some(avatar_path) = request.avatar_path.as_deref() else {
        return Err(AccountError::Validation(
            "avatar file is required".to_string(),
        ));
    };

    let avatar = media
        .upload(avatar_path)
        .await
        .ok_or_else(|| AccountError::Upload("failed to upload avatar".to_string()))?;

    // Cover image is optional; a failed cover upload degrades to an empty
    // URL rather than failing registration.
    let cover_image_url = match request.cover_image_path.as_deref() {
        Some(path) => media
            .upload(path)
            .await
            .map(|uploaded| uploaded.url)
            .unwrap_or_default(),
        None => String::new(),
    };

    let new_user = NewUser {
        username,
        email,
        full_name: request.full_name.trim().to_string(),
        password_hash: hash_password(&request.password)?,
        avatar_url: avatar.url,
        cover_image_url,
    };

    let created = match store
        .create(new_user)
        .await
        .map_err(AccountError::Persistence)?
    {
        CreateOutcome::Created(user) => user,
        CreateOutcome::Conflict => {
            return Err(AccountError::Conflict(
                "user is already registered with this email or username".to_string(),
            ))
        }
    };

    debug!("Registered user {}", created.id);

    // Re-fetch so the response reflects exactly what was persisted.
    let persisted = store
        .find_by_id(created.id)
        .await
        .map_err(AccountError::Persistence)?
        .ok_or_else(|| {
            AccountError::Internal("something went wrong while registering the user".to_string())
        })?;

    Ok(SanitizedUser::from(persisted))
}

/// Authenticate a user by username or email plus password, rotate the
/// refresh token, and return the sanitized user with a fresh token pair.
///
/// # Errors
///
/// Fails with `Validation` when neither username nor email is supplied,
/// `NotFound` when no user matches, and `Auth` on a wrong password.
pub async fn login(
    store: &dyn UserStore,
    tokens: &TokenService,
    request: LoginRequest,
) -> Result<(SanitizedUser, TokenPair), AccountError> {
    let username = normalize_identity(request.username.as_deref()).map(|u| u.to_lowercase());
    let email = normalize_identity(request.email.as_deref());

    if username.is_none() && email.is_none() {
        return Err(AccountError::Validation(
            "username or email is required".to_string(),
        ));
    }

    let user = store
        .find_by_username_or_email(username.as_deref(), email.as_deref())
        .await
        .map_err(AccountError::Persistence)?
        .ok_or_else(|| AccountError::NotFound("user does not exist".to_string()))?;

    if !verify_password(&request.password, &user.password_hash)? {
        return Err(AccountError::Auth("incorrect password".to_string()));
    }

    let pair = tokens.rotate(store, user.id).await?;
    let logged_in = sanitized_by_id(store, user.id).await?;

    Ok((logged_in, pair))
}

/// Clear the caller's stored refresh token, revoking it.
///
/// # Errors
///
/// Fails with `Persistence` when the store write fails.
pub async fn logout(store: &dyn UserStore, user_id: Uuid) -> Result<(), AccountError> {
    store
        .set_refresh_token(user_id, None)
        .await
        .map_err(AccountError::Persistence)
}

/// Exchange a still-valid refresh token for a fresh pair.
///
/// The presented token must match the user's stored refresh token exactly;
/// once rotation replaces it, a replayed token can never succeed again.
///
/// # Errors
///
/// Fails with `Auth` for a missing, invalid, unknown, or already-rotated
/// token.
pub async fn refresh_access_token(
    store: &dyn UserStore,
    tokens: &TokenService,
    presented: Option<&str>,
) -> Result<(SanitizedUser, TokenPair), AccountError> {
    let presented = presented
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AccountError::Auth("unauthorized".to_string()))?;

    let user_id = tokens
        .verify_refresh_token(presented)
        .map_err(|_| AccountError::Auth("invalid refresh token".to_string()))?;

    let user = store
        .find_by_id(user_id)
        .await
        .map_err(AccountError::Persistence)?
        .ok_or_else(|| AccountError::Auth("invalid refresh token".to_string()))?;

    // Anti-replay: a rotated-out or cleared token never matches again.
    if user.refresh_token.as_deref() != Some(presented) {
        return Err(AccountError::Auth(
            "refresh token is expired or used".to_string(),
        ));
    }

    let pair = tokens.rotate(store, user.id).await?;
    let refreshed = sanitized_by_id(store, user.id).await?;

    Ok((refreshed, pair))
}

/// Change the caller's password after verifying the old one.
///
/// Existing refresh tokens stay valid; password change does not rotate or
/// revoke sessions.
///
/// # Errors
///
/// Fails with `Validation` on a wrong old password and `NotFound` when the
/// caller's record is gone.
pub async fn change_password(
    store: &dyn UserStore,
    user_id: Uuid,
    request: ChangePasswordRequest,
) -> Result<(), AccountError> {
    let user = require_user(store, user_id).await?;

    if !verify_password(&request.old_password, &user.password_hash)? {
        return Err(AccountError::Validation(
            "invalid old password".to_string(),
        ));
    }

    let password_hash = hash_password(&request.new_password)?;
    store
        .update_password_hash(user.id, &password_hash)
        .await
        .map_err(AccountError::Persistence)
}

/// Return the authenticated caller's sanitized record.
///
/// # Errors
///
/// Fails with `NotFound` when the caller's record is gone.
pub async fn current_user(
    store: &dyn UserStore,
    user_id: Uuid,
) -> Result<SanitizedUser, AccountError> {
    require_user(store, user_id).await.map(SanitizedUser::from)
}

/// Update the caller's full name and email.
///
/// # Errors
///
/// Fails with `Validation` when either field is blank.
pub async fn update_profile(
    store: &dyn UserStore,
    user_id: Uuid,
    request: UpdateProfileRequest,
) -> Result<SanitizedUser, AccountError> {
    if request.full_name.trim().is_empty() || request.email.trim().is_empty() {
        return Err(AccountError::Validation(
            "full name and email are required".to_string(),
        ));
    }
    if !valid_email(request.email.trim()) {
        return Err(AccountError::Validation(
            "email address is not valid".to_string(),
        ));
    }

    store
        .update_profile(user_id, request.full_name.trim(), request.email.trim())
        .await
        .map_err(AccountError::Persistence)?
        .map(SanitizedUser::from)
        .ok_or_else(|| AccountError::NotFound("user does not exist".to_string()))
}

/// Upload a new avatar and persist its URL.
///
/// # Errors
///
/// Fails with `Validation` when no file was staged and `Upload` when the
/// media host produces no URL.
pub async fn update_avatar(
    store: &dyn UserStore,
    media: &dyn MediaUploader,
    user_id: Uuid,
    avatar_path: Option<&Path>,
) -> Result<SanitizedUser, AccountError> {
    let path = avatar_path.ok_or_else(|| {
        AccountError::Validation("avatar file is required".to_string())
    })?;

    let uploaded = media
        .upload(path)
        .await
        .ok_or_else(|| AccountError::Upload("failed to upload avatar".to_string()))?;

    store
        .update_avatar_url(user_id, &uploaded.url)
        .await
        .map_err(AccountError::Persistence)?
        .map(SanitizedUser::from)
        .ok_or_else(|| AccountError::NotFound("user does not exist".to_string()))
}

/// Upload a new cover image and persist its URL.
///
/// # Errors
///
/// Fails with `Validation` when no file was staged and `Upload` when the
/// media host produces no URL.
pub async fn update_cover_image(
    store: &dyn UserStore,
    media: &dyn MediaUploader,
    user_id: Uuid,
    cover_image_path: Option<&Path>,
) -> Result<SanitizedUser, AccountError> {
    let path = cover_image_path.ok_or_else(|| {
        AccountError::Validation("cover image file is required".to_string())
    })?;

    let uploaded = media
        .upload(path)
        .await
        .ok_or_else(|| AccountError::Upload("failed to upload cover image".to_string()))?;

    store
        .update_cover_image_url(user_id, &uploaded.url)
        .await
        .map_err(AccountError::Persistence)?
        .map(SanitizedUser::from)
        .ok_or_else(|| AccountError::NotFound("user does not exist".to_string()))
}

/// Basic email format check on already-trimmed input.
fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|re| re.is_match(email))
}

fn normalize_identity(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

async fn require_user(store: &dyn UserStore, user_id: Uuid) -> Result<User, AccountError> {
    store
        .find_by_id(user_id)
        .await
        .map_err(AccountError::Persistence)?
        .ok_or_else(|| AccountError::NotFound("user does not exist".to_string()))
}

async fn sanitized_by_id(
    store: &dyn UserStore,
    user_id: Uuid,
) -> Result<SanitizedUser, AccountError> {
    store
        .find_by_id(user_id)
        .await
        .map_err(AccountError::Persistence)?
        .map(SanitizedUser::from)
        .ok_or_else(|| {
            AccountError::Internal("something went wrong while loading the user".to_string())
        })
}
