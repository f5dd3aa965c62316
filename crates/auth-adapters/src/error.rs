use domains::DomainError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Bad signature, expired, wrong audience or malformed
    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("token subject '{0}' is not a user id")]
    InvalidSubject(String),

    #[error("could not sign token: {0}")]
    Signing(String),
}

/// Callers only learn that the credential was not accepted.
impl From<AuthError> for DomainError {
    fn from(_: AuthError) -> Self {
        DomainError::Unauthenticated
    }
}
