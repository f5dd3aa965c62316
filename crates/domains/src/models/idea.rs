use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::tag::{TagId, TechStackId};
use crate::errors::DomainError;

pub type IdeaId = Uuid;
/// Identity of an authenticated principal, as issued by the auth provider.
pub type UserId = Uuid;

/// Skill level an idea is aimed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Self::Beginner, Self::Intermediate, Self::Advanced];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Beginner => "Beginner",
            Self::Intermediate => "Intermediate",
            Self::Advanced => "Advanced",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| DomainError::validation(format!("unknown difficulty '{s}'")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdeaStatus {
    Draft,
    Published,
}

impl IdeaStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
        }
    }
}

impl FromStr for IdeaStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "published" => Ok(Self::Published),
            other => Err(DomainError::validation(format!("unknown idea status '{other}'"))),
        }
    }
}

/// A submitted tech-project proposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Idea {
    pub id: IdeaId,
    pub title: String,
    pub short_description: String,
    /// Markdown body, rendered by the front end
    pub full_description: String,
    pub difficulty: Difficulty,
    /// Denormalized: always equals the number of votes referencing this idea
    pub upvotes: u32,
    pub status: IdeaStatus,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Idea {
    pub fn is_published(&self) -> bool {
        self.status == IdeaStatus::Published
    }

    /// Drafts exist only for their author.
    pub fn is_visible_to(&self, viewer: Option<UserId>) -> bool {
        self.is_published() || viewer == Some(self.user_id)
    }
}

/// Many-to-many links written together with an idea row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdeaRelations {
    pub tag_ids: Vec<TagId>,
    pub tech_stack_ids: Vec<TechStackId>,
}
