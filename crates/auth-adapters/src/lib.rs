//! ideashare/crates/auth-adapters/src/lib.rs
//!
//! Identity adapters. Tokens are issued by an external provider; this crate
//! only verifies them and maps the subject onto a `UserId`.

pub mod error;
#[cfg(feature = "auth-jwt")]
pub mod jwt;

pub use error::AuthError;
#[cfg(feature = "auth-jwt")]
pub use jwt::{Claims, JwtAuthProvider};
