//! Request extractors.
//!
//! - [`auth::AuthUser`] -- the calling account, from a JWT Bearer token.

pub mod auth;
