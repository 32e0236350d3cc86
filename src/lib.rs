//! VidHub accounts service: user registration, login, session refresh, and
//! profile management over HTTP.

pub mod account;
pub mod api;
pub mod cli;
pub mod media;
pub mod token;

/// User-Agent for outbound HTTP calls.
pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
