use axum::{extract::Extension, http::HeaderMap, http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;

use super::principal::require_auth;
use super::types::ChangePasswordBody;
use crate::account::error::AccountError;
use crate::account::service;
use crate::account::store::UserStore;
use crate::api::response::ApiResponse;
use crate::token::TokenService;

#[utoipa::path(
    post,
    path = "/v1/users/change-password",
    request_body = ChangePasswordBody,
    responses(
        (status = 200, description = "Password updated."),
        (status = 400, description = "Old password is incorrect."),
        (status = 401, description = "Missing or invalid access token."),
    ),
    tag = "users"
)]
pub async fn change_password(
    headers: HeaderMap,
    store: Extension<Arc<dyn UserStore>>,
    tokens: Extension<Arc<TokenService>>,
    Json(body): Json<ChangePasswordBody>,
) -> Result<impl IntoResponse, AccountError> {
    let principal = require_auth(&headers, &tokens)?;
    service::change_password(store.0.as_ref(), principal.user_id, body.into()).await?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::message("password changed successfully")),
    ))
}
