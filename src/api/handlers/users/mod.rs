pub mod login;
pub mod password;
pub mod principal;
pub mod profile;
pub mod register;
pub mod session;
pub mod types;
