use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::idea::UserId;

/// Shown when an author has no profile row or no name set.
pub const UNKNOWN_AUTHOR: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Same id as the authenticated principal
    pub id: UserId,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn new(id: UserId, full_name: Option<String>, now: DateTime<Utc>) -> Self {
        Self {
            id,
            full_name,
            avatar_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(UNKNOWN_AUTHOR)
    }
}
