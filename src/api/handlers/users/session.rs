//! Session endpoints: logout and refresh-token exchange, plus the cookie
//! helpers shared with login.

use axum::{
    extract::Extension,
    http::{
        header::{InvalidHeaderValue, SET_COOKIE},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use super::principal::{extract_cookie, require_auth};
use super::types::{RefreshBody, SessionBody};
use crate::account::error::AccountError;
use crate::account::service;
use crate::account::store::UserStore;
use crate::account::types::TokenPair;
use crate::api::response::ApiResponse;
use crate::api::AppConfig;
use crate::token::TokenService;

pub const ACCESS_COOKIE: &str = "accessToken";
pub const REFRESH_COOKIE: &str = "refreshToken";

#[utoipa::path(
    post,
    path = "/v1/users/logout",
    responses(
        (status = 200, description = "Refresh token revoked and cookies cleared."),
        (status = 401, description = "Missing or invalid access token."),
    ),
    tag = "users"
)]
pub async fn logout(
    headers: HeaderMap,
    store: Extension<Arc<dyn UserStore>>,
    tokens: Extension<Arc<TokenService>>,
    config: Extension<Arc<AppConfig>>,
) -> Result<impl IntoResponse, AccountError> {
    let principal = require_auth(&headers, &tokens)?;
    service::logout(store.0.as_ref(), principal.user_id).await?;

    // Always clear both cookies, even for cookie-less bearer clients.
    let response_headers = clear_auth_cookies(&config)
        .map_err(|err| AccountError::Internal(format!("failed to build cookie: {err}")))?;

    Ok((
        StatusCode::OK,
        response_headers,
        Json(ApiResponse::message("logged out")),
    ))
}

#[utoipa::path(
    post,
    path = "/v1/users/refresh-token",
    request_body = RefreshBody,
    responses(
        (status = 200, description = "Fresh token pair issued.", body = SessionBody),
        (status = 401, description = "Missing, invalid, expired, or already-used refresh token."),
    ),
    tag = "users"
)]
pub async fn refresh_token(
    headers: HeaderMap,
    store: Extension<Arc<dyn UserStore>>,
    tokens: Extension<Arc<TokenService>>,
    config: Extension<Arc<AppConfig>>,
    body: Option<Json<RefreshBody>>,
) -> Result<impl IntoResponse, AccountError> {
    // Cookie first, body as fallback for cookie-less clients.
    let presented = extract_cookie(&headers, REFRESH_COOKIE)
        .or_else(|| body.and_then(|Json(body)| body.refresh_token));

    let (user, pair) =
        service::refresh_access_token(store.0.as_ref(), &tokens, presented.as_deref()).await?;

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
            "access token refreshed",
        )),
    ))
}

/// Build the `Set-Cookie` headers for a freshly issued token pair.
pub(super) fn auth_cookies(
    config: &AppConfig,
    pair: &TokenPair,
) -> Result<HeaderMap, InvalidHeaderValue> {
    let secure = config.cookie_secure();
    let mut headers = HeaderMap::new();
    headers.append(
        SET_COOKIE,
        session_cookie(
            ACCESS_COOKIE,
            &pair.access_token,
            config.access_ttl_seconds(),
            secure,
        )?,
    );
    headers.append(
        SET_COOKIE,
        session_cookie(
            REFRESH_COOKIE,
            &pair.refresh_token,
            config.refresh_ttl_seconds(),
            secure,
        )?,
    );
    Ok(headers)
}

fn clear_auth_cookies(config: &AppConfig) -> Result<HeaderMap, InvalidHeaderValue> {
    let secure = config.cookie_secure();
    let mut headers = HeaderMap::new();
    headers.append(SET_COOKIE, session_cookie(ACCESS_COOKIE, "", 0, secure)?);
    headers.append(SET_COOKIE, session_cookie(REFRESH_COOKIE, "", 0, secure)?);
    Ok(headers)
}

/// Build a secure `HttpOnly` cookie; `Max-Age=0` clears it.
fn session_cookie(
    name: &str,
    value: &str,
    ttl_seconds: u64,
    secure: bool,
) -> Result<HeaderValue, InvalidHeaderValue> {
    // Only mark cookies secure when the frontend is served over HTTPS.
    let mut cookie =
        format!("{name}={value}; Path=/; HttpOnly; SameSite=Lax; Max-Age={ttl_seconds}");
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> TokenPair {
        TokenPair {
            access_token: "v4.local.access".to_string(),
            refresh_token: "v4.local.refresh".to_string(),
        }
    }

    #[test]
    fn both_cookies_are_set() {
        let config = AppConfig::new("https://vidhub.dev".to_string());
        let headers = auth_cookies(&config, &pair()).expect("cookies");
        let cookies: Vec<_> = headers
            .get_all(SET_COOKIE)
            .iter()
            .map(|value| value.to_str().map(str::to_string))
            .collect::<Result<_, _>>()
            .expect("utf8");

        assert_eq!(cookies.len(), 2);
        assert!(cookies[0].starts_with("accessToken=v4.local.access;"));
        assert!(cookies[1].starts_with("refreshToken=v4.local.refresh;"));
        for cookie in &cookies {
            assert!(cookie.contains("HttpOnly"));
            assert!(cookie.contains("SameSite=Lax"));
            assert!(cookie.contains("Secure"));
        }
    }

    #[test]
    fn plain_http_frontend_omits_secure() {
        let config = AppConfig::new("http://localhost:5173".to_string());
        let headers = auth_cookies(&config, &pair()).expect("cookies");
        for value in headers.get_all(SET_COOKIE) {
            assert!(!value.to_str().expect("utf8").contains("Secure"));
        }
    }

    #[test]
    fn clearing_sets_max_age_zero() {
        let config = AppConfig::new("http://localhost:5173".to_string());
        let headers = clear_auth_cookies(&config).expect("cookies");
        for value in headers.get_all(SET_COOKIE) {
            assert!(value.to_str().expect("utf8").contains("Max-Age=0"));
        }
    }
}
