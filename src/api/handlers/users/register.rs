use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;

use super::types::RegisterBody;
use crate::account::error::AccountError;
use crate::account::service;
use crate::account::store::UserStore;
use crate::account::types::SanitizedUser;
use crate::api::response::ApiResponse;
use crate::media::MediaUploader;

#[utoipa::path(
    post,
    path = "/v1/users/register",
    request_body = RegisterBody,
    responses(
        (status = 201, description = "User created.", body = SanitizedUser),
        (status = 400, description = "Missing or invalid fields, or avatar upload failed."),
        (status = 409, description = "Username or email already registered."),
    ),
    tag = "users"
)]
pub async fn register(
    store: Extension<Arc<dyn UserStore>>,
    media: Extension<Arc<dyn MediaUploader>>,
    Json(body): Json<RegisterBody>,
) -> Result<impl IntoResponse, AccountError> {
    let user = service::register(store.0.as_ref(), media.0.as_ref(), body.into()).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(user, "user registered successfully")),
    ))
}
