//! Authenticated principal extraction.
//!
//! Credentials are accepted from the `accessToken` cookie or from an
//! `Authorization: Bearer` header; cookie-less API clients use the latter.

use axum::http::{header::AUTHORIZATION, HeaderMap};

use super::session::ACCESS_COOKIE;
use crate::account::error::AccountError;
use crate::token::{Principal, TokenService};

/// Resolve the request's access token into a principal, or fail with 401.
///
/// # Errors
///
/// Returns `AccountError::Auth` when no token is presented or the token does
/// not verify.
pub fn require_auth(headers: &HeaderMap, tokens: &TokenService) -> Result<Principal, AccountError> {
    let token = extract_access_token(headers)
        .ok_or_else(|| AccountError::Auth("unauthorized".to_string()))?;

    tokens
        .verify_access_token(&token)
        .map_err(|_| AccountError::Auth("invalid access token".to_string()))
}

fn extract_access_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = extract_bearer_token(headers) {
        return Some(token);
    }
    extract_cookie(headers, ACCESS_COOKIE)
}

pub(super) fn extract_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let header = headers.get(axum::http::header::COOKIE)?;
    let value = header.to_str().ok()?;
    for pair in value.split(';') {
        let trimmed = pair.trim();
        let mut parts = trimmed.splitn(2, '=');
        let key = parts.next()?.trim();
        let val = parts.next()?.trim();
        if key == name {
            return Some(val.to_string());
        }
    }
    None
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use secrecy::SecretString;
    use uuid::Uuid;

    use crate::account::types::User;
    use crate::token::TokenConfig;

    fn tokens() -> TokenService {
        TokenService::new(&TokenConfig::new(
            SecretString::from("access-secret".to_string()),
            SecretString::from("refresh-secret".to_string()),
        ))
        .expect("token service")
    }

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            username: "annlee".to_string(),
            email: "a@x.com".to_string(),
            full_name: "Ann Lee".to_string(),
            password_hash: "$argon2id$stub".to_string(),
            avatar_url: "https://media.test/a.png".to_string(),
            cover_image_url: String::new(),
            refresh_token: None,
        }
    }

    #[test]
    fn cookie_and_bearer_both_authenticate() {
        let tokens = tokens();
        let user = sample_user();
        let token = tokens.issue_access_token(&user).expect("issue");

        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::COOKIE,
            HeaderValue::from_str(&format!("other=1; {ACCESS_COOKIE}={token}")).expect("cookie"),
        );
        let principal = require_auth(&headers, &tokens).expect("cookie auth");
        assert_eq!(principal.user_id, user.id);

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).expect("bearer"),
        );
        let principal = require_auth(&headers, &tokens).expect("bearer auth");
        assert_eq!(principal.user_id, user.id);
    }

    #[test]
    fn missing_or_invalid_token_is_unauthorized() {
        let tokens = tokens();

        let headers = HeaderMap::new();
        assert!(require_auth(&headers, &tokens).is_err());

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer garbage"));
        assert!(require_auth(&headers, &tokens).is_err());
    }
}
