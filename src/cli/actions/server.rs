use crate::api::{self, AppConfig};
use crate::token::TokenConfig;
use anyhow::Result;
use secrecy::SecretString;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub access_token_secret: SecretString,
    pub refresh_token_secret: SecretString,
    pub access_token_ttl_seconds: u64,
    pub refresh_token_ttl_seconds: u64,
    pub token_issuer: String,
    pub media_base_url: String,
    pub frontend_base_url: String,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the token keys cannot be derived or the server fails
/// to start.
pub async fn execute(args: Args) -> Result<()> {
    let token_config = TokenConfig::new(args.access_token_secret, args.refresh_token_secret)
        .with_access_ttl_seconds(args.access_token_ttl_seconds)
        .with_refresh_ttl_seconds(args.refresh_token_ttl_seconds)
        .with_issuer(args.token_issuer);

    // Cookie Max-Age mirrors the token TTLs so cookies and tokens expire
    // together.
    let app_config = AppConfig::new(args.frontend_base_url)
        .with_access_ttl_seconds(args.access_token_ttl_seconds)
        .with_refresh_ttl_seconds(args.refresh_token_ttl_seconds);

    api::new(
        args.port,
        args.dsn,
        &token_config,
        args.media_base_url,
        app_config,
    )
    .await
}
