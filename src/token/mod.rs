//! Token service: issuance, verification, and rotation of the
//! access/refresh token pair.
//!
//! Tokens are PASETO v4.local credentials. The access token carries the
//! user's identity claims and a short TTL; the refresh token carries only
//! the user id and a long TTL. A refresh token is live only while it matches
//! the `refresh_token` column on its user row, which makes rotation both
//! single-use-until-rotated and revocable by overwrite.

use anyhow::anyhow;
use pasetors::claims::{Claims, ClaimsValidationRules};
use pasetors::keys::SymmetricKey;
use pasetors::token::UntrustedToken;
use pasetors::{local, version4::V4, Local};
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::account::error::AccountError;
use crate::account::store::UserStore;
use crate::account::types::{TokenPair, User};

const DEFAULT_ACCESS_TTL_SECONDS: u64 = 15 * 60;
const DEFAULT_REFRESH_TTL_SECONDS: u64 = 10 * 24 * 60 * 60;
const DEFAULT_ISSUER: &str = "vidhub";

// Implicit assertions bind each token to its purpose, so an access token can
// never verify as a refresh token even if both keys were set to the same
// secret.
const ACCESS_ASSERTION: &[u8] = b"vidhub.access";
const REFRESH_ASSERTION: &[u8] = b"vidhub.refresh";

#[derive(Debug, Error)]
pub enum TokenError {
    /// Signature invalid, token expired, or claims malformed.
    #[error("invalid token")]
    Invalid,

    /// Signing secrets must be non-empty at startup.
    #[error("token signing secrets must not be empty")]
    EmptySecret,

    /// Claim construction or encryption failed.
    #[error("failed to issue token")]
    Issue(#[source] pasetors::errors::Error),
}

/// Token signing configuration, loaded once at startup and never mutated.
#[derive(Clone, Debug)]
pub struct TokenConfig {
    access_secret: SecretString,
    refresh_secret: SecretString,
    access_ttl_seconds: u64,
    refresh_ttl_seconds: u64,
    issuer: String,
}

impl TokenConfig {
    #[must_use]
    pub fn new(access_secret: SecretString, refresh_secret: SecretString) -> Self {
        Self {
            access_secret,
            refresh_secret,
            access_ttl_seconds: DEFAULT_ACCESS_TTL_SECONDS,
            refresh_ttl_seconds: DEFAULT_REFRESH_TTL_SECONDS,
            issuer: DEFAULT_ISSUER.to_string(),
        }
    }

    #[must_use]
    pub fn with_access_ttl_seconds(mut self, seconds: u64) -> Self {
        self.access_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_refresh_ttl_seconds(mut self, seconds: u64) -> Self {
        self.refresh_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_issuer(mut self, issuer: String) -> Self {
        self.issuer = issuer;
        self
    }
}

/// Authenticated user context decoded from a verified access token.
#[derive(Clone, Debug)]
pub struct Principal {
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
}

pub struct TokenService {
    access_key: SymmetricKey<V4>,
    refresh_key: SymmetricKey<V4>,
    access_ttl: Duration,
    refresh_ttl: Duration,
    issuer: String,
}

impl TokenService {
    /// Build the service from configuration, deriving the symmetric keys
    /// from the configured secrets.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::EmptySecret` if either secret is empty.
    pub fn new(config: &TokenConfig) -> Result<Self, TokenError> {
        if config.access_secret.expose_secret().is_empty()
            || config.refresh_secret.expose_secret().is_empty()
        {
            return Err(TokenError::EmptySecret);
        }

        Ok(Self {
            access_key: derive_key(&config.access_secret)?,
            refresh_key: derive_key(&config.refresh_secret)?,
            access_ttl: Duration::from_secs(config.access_ttl_seconds),
            refresh_ttl: Duration::from_secs(config.refresh_ttl_seconds),
            issuer: config.issuer.clone(),
        })
    }

    /// Issue a short-lived access token carrying the user's identity claims.
    ///
    /// # Errors
    ///
    /// Returns an error if claim construction or encryption fails.
    pub fn issue_access_token(&self, user: &User) -> Result<String, TokenError> {
        let mut claims = Claims::new_expires_in(&self.access_ttl).map_err(TokenError::Issue)?;
        claims.issuer(&self.issuer).map_err(TokenError::Issue)?;
        claims
            .subject(&user.id.to_string())
            .map_err(TokenError::Issue)?;
        claims
            .add_additional("username", user.username.as_str())
            .map_err(TokenError::Issue)?;
        claims
            .add_additional("email", user.email.as_str())
            .map_err(TokenError::Issue)?;
        claims
            .add_additional("fullName", user.full_name.as_str())
            .map_err(TokenError::Issue)?;

        local::encrypt(&self.access_key, &claims, None, Some(ACCESS_ASSERTION))
            .map_err(TokenError::Issue)
    }

    /// Issue a long-lived refresh token carrying only the user id.
    ///
    /// # Errors
    ///
    /// Returns an error if claim construction or encryption fails.
    pub fn issue_refresh_token(&self, user_id: Uuid) -> Result<String, TokenError> {
        let mut claims = Claims::new_expires_in(&self.refresh_ttl).map_err(TokenError::Issue)?;
        claims.issuer(&self.issuer).map_err(TokenError::Issue)?;
        claims
            .subject(&user_id.to_string())
            .map_err(TokenError::Issue)?;

        local::encrypt(&self.refresh_key, &claims, None, Some(REFRESH_ASSERTION))
            .map_err(TokenError::Issue)
    }

    /// Verify a refresh token's signature and expiry and return the user id
    /// it was issued for.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Invalid` on any verification failure.
    pub fn verify_refresh_token(&self, token: &str) -> Result<Uuid, TokenError> {
        let claims = self.decrypt(token, &self.refresh_key, REFRESH_ASSERTION)?;
        subject_uuid(&claims)
    }

    /// Verify an access token and return the principal it identifies.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Invalid` on any verification failure.
    pub fn verify_access_token(&self, token: &str) -> Result<Principal, TokenError> {
        let claims = self.decrypt(token, &self.access_key, ACCESS_ASSERTION)?;
        let user_id = subject_uuid(&claims)?;
        Ok(Principal {
            user_id,
            username: string_claim(&claims, "username")?,
            email: string_claim(&claims, "email")?,
            full_name: string_claim(&claims, "fullName")?,
        })
    }

    /// Issue a fresh token pair for `user_id` and persist the new refresh
    /// token, overwriting any prior value.
    ///
    /// This and logout are the only mutation paths for the stored refresh
    /// token. Store and issuance failures are wrapped into a generic
    /// persistence error so signing-key detail never reaches clients.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::Persistence` on any failure.
    pub async fn rotate(
        &self,
        store: &dyn UserStore,
        user_id: Uuid,
    ) -> Result<TokenPair, AccountError> {
        let user = store
            .find_by_id(user_id)
            .await
            .map_err(AccountError::Persistence)?
            .ok_or_else(|| {
                AccountError::Persistence(anyhow!("user {user_id} not found during rotation"))
            })?;

        let access_token = self
            .issue_access_token(&user)
            .map_err(|err| AccountError::Persistence(anyhow!(err)))?;
        let refresh_token = self
            .issue_refresh_token(user.id)
            .map_err(|err| AccountError::Persistence(anyhow!(err)))?;

        store
            .set_refresh_token(user.id, Some(&refresh_token))
            .await
            .map_err(AccountError::Persistence)?;

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    fn decrypt(
        &self,
        token: &str,
        key: &SymmetricKey<V4>,
        assertion: &[u8],
    ) -> Result<Claims, TokenError> {
        let mut rules = ClaimsValidationRules::new();
        rules.validate_issuer_with(&self.issuer);

        let untrusted =
            UntrustedToken::<Local, V4>::try_from(token).map_err(|_| TokenError::Invalid)?;
        let trusted = local::decrypt(key, &untrusted, &rules, None, Some(assertion))
            .map_err(|_| TokenError::Invalid)?;
        trusted
            .payload_claims()
            .cloned()
            .ok_or(TokenError::Invalid)
    }
}

fn derive_key(secret: &SecretString) -> Result<SymmetricKey<V4>, TokenError> {
    let mut hasher = Sha256::new();
    hasher.update(secret.expose_secret().as_bytes());
    let digest = hasher.finalize();
    SymmetricKey::<V4>::from(digest.as_slice()).map_err(TokenError::Issue)
}

fn subject_uuid(claims: &Claims) -> Result<Uuid, TokenError> {
    let subject = claims
        .get_claim("sub")
        .and_then(serde_json::Value::as_str)
        .ok_or(TokenError::Invalid)?;
    Uuid::parse_str(subject).map_err(|_| TokenError::Invalid)
}

fn string_claim(claims: &Claims, name: &str) -> Result<String, TokenError> {
    claims
        .get_claim(name)
        .and_then(serde_json::Value::as_str)
        .map(str::to_string)
        .ok_or(TokenError::Invalid)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> TokenConfig {
        TokenConfig::new(
            SecretString::from("access-secret".to_string()),
            SecretString::from("refresh-secret".to_string()),
        )
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
    fn empty_secret_is_rejected() {
        let config = TokenConfig::new(
            SecretString::from(String::new()),
            SecretString::from("refresh-secret".to_string()),
        );
        assert!(matches!(
            TokenService::new(&config),
            Err(TokenError::EmptySecret)
        ));
    }

    #[test]
    fn refresh_token_round_trips_user_id() {
        let service = TokenService::new(&config()).expect("service");
        let user_id = Uuid::new_v4();
        let token = service.issue_refresh_token(user_id).expect("issue");
        let decoded = service.verify_refresh_token(&token).expect("verify");
        assert_eq!(decoded, user_id);
    }

    #[test]
    fn access_token_carries_identity_claims() {
        let service = TokenService::new(&config()).expect("service");
        let user = sample_user();
        let token = service.issue_access_token(&user).expect("issue");
        let principal = service.verify_access_token(&token).expect("verify");
        assert_eq!(principal.user_id, user.id);
        assert_eq!(principal.username, "annlee");
        assert_eq!(principal.email, "a@x.com");
        assert_eq!(principal.full_name, "Ann Lee");
    }

    #[test]
    fn access_token_is_not_a_refresh_token() {
        let service = TokenService::new(&config()).expect("service");
        let user = sample_user();
        let token = service.issue_access_token(&user).expect("issue");
        assert!(matches!(
            service.verify_refresh_token(&token),
            Err(TokenError::Invalid)
        ));
    }

    #[test]
    fn token_from_another_secret_is_rejected() {
        let service = TokenService::new(&config()).expect("service");
        let other = TokenService::new(&TokenConfig::new(
            SecretString::from("other-access".to_string()),
            SecretString::from("other-refresh".to_string()),
        ))
        .expect("service");

        let token = other.issue_refresh_token(Uuid::new_v4()).expect("issue");
        assert!(matches!(
            service.verify_refresh_token(&token),
            Err(TokenError::Invalid)
        ));
    }

    #[test]
    fn tampered_token_is_rejected() {
        let service = TokenService::new(&config()).expect("service");
        let token = service.issue_refresh_token(Uuid::new_v4()).expect("issue");
        let mut tampered = token.clone();
        tampered.pop();
        assert!(service.verify_refresh_token(&tampered).is_err());
        assert!(service.verify_refresh_token("not-a-token").is_err());
    }

    #[test]
    fn expired_refresh_token_is_rejected() {
        let config = config().with_refresh_ttl_seconds(1);
        let service = TokenService::new(&config).expect("service");
        let token = service.issue_refresh_token(Uuid::new_v4()).expect("issue");
        std::thread::sleep(Duration::from_secs(2));
        assert!(matches!(
            service.verify_refresh_token(&token),
            Err(TokenError::Invalid)
        ));
    }
}
