use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::idea::{IdeaId, UserId};

/// A per-user endorsement. At most one exists per (user, idea).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub user_id: UserId,
    pub idea_id: IdeaId,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteAction {
    Added,
    Removed,
}

impl VoteAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Removed => "removed",
        }
    }
}

/// What a toggle did, plus the counter value committed with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteOutcome {
    pub action: VoteAction,
    pub upvotes: u32,
}

/// Result of recomputing an idea's counter from its vote rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileOutcome {
    pub idea_id: IdeaId,
    pub previous: u32,
    pub actual: u32,
}

impl ReconcileOutcome {
    pub fn drifted(&self) -> bool {
        self.previous != self.actual
    }
}
