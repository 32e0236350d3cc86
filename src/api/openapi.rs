use utoipa::openapi::{Contact, License, Tag};
use utoipa::OpenApi;

use super::handlers;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::health,
        handlers::users::register::register,
        handlers::users::login::login,
        handlers::users::session::logout,
        handlers::users::session::refresh_token,
        handlers::users::password::change_password,
        handlers::users::profile::get_me,
        handlers::users::profile::patch_me,
        handlers::users::profile::patch_avatar,
        handlers::users::profile::patch_cover_image,
    ),
    components(schemas(
        handlers::health::Health,
        handlers::users::types::RegisterBody,
        handlers::users::types::LoginBody,
        handlers::users::types::SessionBody,
        handlers::users::types::RefreshBody,
        handlers::users::types::ChangePasswordBody,
        handlers::users::types::UpdateProfileBody,
        handlers::users::types::AvatarBody,
        handlers::users::types::CoverImageBody,
        crate::account::types::SanitizedUser,
    ))
)]
struct ApiDoc;

/// Build the `OpenAPI` document, with info taken from Cargo.toml metadata
/// instead of the derive defaults.
#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    let mut spec = ApiDoc::openapi();

    spec.info.title = env!("CARGO_PKG_NAME").to_string();
    spec.info.version = env!("CARGO_PKG_VERSION").to_string();
    spec.info.description = optional_str(env!("CARGO_PKG_DESCRIPTION")).map(str::to_string);
    spec.info.contact = cargo_contact();
    spec.info.license = cargo_license();

    let mut users_tag = Tag::new("users");
    users_tag.description = Some("Account registration, sessions, and profile".to_string());

    let mut health_tag = Tag::new("health");
    health_tag.description = Some("Service and database health".to_string());

    spec.tags = Some(vec![users_tag, health_tag]);

    spec
}

fn cargo_contact() -> Option<Contact> {
    // Cargo authors are `;` separated and may include "Name <email>".
    let authors = env!("CARGO_PKG_AUTHORS");
    let primary = authors.split(';').next().map(str::trim)?;
    if primary.is_empty() {
        return None;
    }

    let (name, email) = parse_author(primary);
    if name.is_none() && email.is_none() {
        return None;
    }

    let mut contact = Contact::new();
    contact.name = name.map(str::to_string);
    contact.email = email.map(str::to_string);
    Some(contact)
}

fn cargo_license() -> Option<License> {
    let identifier = optional_str(env!("CARGO_PKG_LICENSE"))?;
    let mut license = License::new(identifier);
    license.identifier = Some(identifier.to_string());
    Some(license)
}

fn optional_str(value: &'static str) -> Option<&'static str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

fn parse_author(author: &str) -> (Option<&str>, Option<&str>) {
    if let Some(start) = author.find('<') {
        let name = author[..start].trim();
        let email = author[start + 1..].trim_end_matches('>').trim();
        let name = if name.is_empty() { None } else { Some(name) };
        let email = if email.is_empty() { None } else { Some(email) };
        (name, email)
    } else {
        let name = author.trim();
        (if name.is_empty() { None } else { Some(name) }, None)
    }
}
