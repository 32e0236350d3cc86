//! User accounts: types, credential storage, password hashing, and the
//! session endpoint logic.

pub mod error;
pub mod password;
pub mod service;
pub mod store;
pub mod types;
