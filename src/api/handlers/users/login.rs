use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;

use super::session::auth_cookies;
use super::types::{LoginBody, SessionBody};
use crate::account::error::AccountError;
use crate::account::service;
use crate::account::store::UserStore;
use crate::api::response::ApiResponse;
use crate::api::AppConfig;
use crate::token::TokenService;

#[utoipa::path(
    post,
    path = "/v1/users/login",
    request_body = LoginBody,
    responses(
        (status = 200, description = "Authenticated; token pair issued.", body = SessionBody),
        (status = 400, description = "Neither username nor email provided."),
        (status = 401, description = "Incorrect password."),
        (status = 404, description = "No such user."),
    ),
    tag = "users"
)]
pub async fn login(
    store: Extension<Arc<dyn UserStore>>,
    tokens: Extension<Arc<TokenService>>,
    config: Extension<Arc<AppConfig>>,
    Json(body): Json<LoginBody>,
) -> Result<impl IntoResponse, AccountError> {
    let (user, pair) = service::login(store.0.as_ref(), &tokens, body.into()).await?;

    let response_headers = auth_cookies(&config, &pair)
        .map_err(|err| AccountError::Internal(format!("failed to build cookie: {err}")))?;

    Ok((
        StatusCode::OK,
        response_headers,
        Json(ApiResponse::ok(
            SessionBody {
                user,
                access_token: pair.access_token,
                refresh_token: pair.refresh_token,
            },
            "logged in successfully",
        )),
    ))
}
