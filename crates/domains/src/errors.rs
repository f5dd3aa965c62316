//! # DomainError
//!
//! Centralized error handling for the IdeaShare ecosystem.
//! Every port and service returns this type; adapters map their native
//! failures into it and the HTTP layer maps it onto status codes.

use thiserror::Error;

/// The primary error type for all domain operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// No viewer identity for an action that requires one
    #[error("authentication required")]
    Unauthenticated,

    /// Viewer is known but may not touch the resource (e.g. editing another author's idea)
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Resource not found (e.g., Idea, Tag, Profile)
    #[error("{0} not found with ID {1}")]
    NotFound(String, String),

    /// Malformed filter or submission input
    #[error("validation error: {0}")]
    ValidationFailed(String),

    /// Retryable I/O failure talking to the data store
    #[error("transient store failure: {0}")]
    TransientStore(String),

    /// Concurrent modification (e.g. idea deleted while being voted on)
    #[error("conflict: {0}")]
    Conflict(String),

    /// Non-retryable infrastructure failure
    #[error("internal service error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn not_found(entity: &str, id: impl ToString) -> Self {
        Self::NotFound(entity.to_string(), id.to_string())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationFailed(msg.into())
    }

    /// Only store hiccups are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransientStore(_))
    }
}

/// A specialized Result type for IdeaShare logic.
pub type Result<T> = std::result::Result<T, DomainError>;
