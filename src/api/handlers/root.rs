use axum::response::{IntoResponse, Json};
use serde::Serialize;

#[derive(Serialize)]
struct Root {
    name: &'static str,
    version: &'static str,
}

// Undocumented landing route, handy for smoke checks.
pub async fn root() -> impl IntoResponse {
    Json(Root {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
    })
}
