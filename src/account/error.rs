//! Error taxonomy for account operations.
//!
//! Every business-rule failure is raised at the point of detection and
//! carried unmodified to the transport boundary, which maps each kind to a
//! status code and a `{ success: false, message }` payload.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AccountError {
    /// Bad or missing input.
    #[error("{0}")]
    Validation(String),

    /// Duplicate identity (username or email already registered).
    #[error("{0}")]
    Conflict(String),

    /// Bad credentials or an invalid/expired/replayed token.
    #[error("{0}")]
    Auth(String),

    /// Referenced user does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The media host failed to produce a durable URL.
    #[error("{0}")]
    Upload(String),

    /// Store or token-issuance failure. The source detail is logged at the
    /// boundary; clients only ever see the generic message.
    #[error("something went wrong while generating access and refresh tokens")]
    Persistence(#[source] anyhow::Error),

    /// Unexpected invariant violation, e.g. a just-created record that
    /// cannot be read back.
    #[error("{0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn display_uses_carried_message() {
        let err = AccountError::Validation("all fields are required".to_string());
        assert_eq!(err.to_string(), "all fields are required");

        let err = AccountError::Auth("incorrect password".to_string());
        assert_eq!(err.to_string(), "incorrect password");
    }

    #[test]
    fn persistence_never_exposes_source_detail() {
        let err = AccountError::Persistence(anyhow!("signing key unavailable"));
        assert!(!err.to_string().contains("signing key"));
    }
}
