//! Security middleware.

pub mod auth;

pub use auth::{AuthState, GUARDIAN_KEY_HEADER};
