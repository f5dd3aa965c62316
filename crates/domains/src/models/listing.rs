//! Filter parameters, store-level query and the hydrated views the
//! listing pipeline hands back to callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use super::idea::{Difficulty, Idea, IdeaId, IdeaStatus, UserId};
use super::profile::{UserProfile, UNKNOWN_AUTHOR};
use super::tag::{Tag, TagId};
use crate::errors::{DomainError, Result};

/// Longest accepted free-text search term.
pub const MAX_SEARCH_LEN: usize = 200;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortOrder {
    #[default]
    Newest,
    Oldest,
    MostUpvoted,
    TitleAsc,
    TitleDesc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Newest => "newest",
            Self::Oldest => "oldest",
            Self::MostUpvoted => "most-upvoted",
            Self::TitleAsc => "title-asc",
            Self::TitleDesc => "title-desc",
        }
    }

    /// Total order used for listings. Ties fall back to id ascending so
    /// consecutive pages never overlap or skip rows.
    pub fn compare(&self, a: &Idea, b: &Idea) -> Ordering {
        let primary = match self {
            Self::Newest => b.created_at.cmp(&a.created_at),
            Self::Oldest => a.created_at.cmp(&b.created_at),
            Self::MostUpvoted => b.upvotes.cmp(&a.upvotes),
            Self::TitleAsc => a.title.cmp(&b.title),
            Self::TitleDesc => b.title.cmp(&a.title),
        };
        primary.then_with(|| a.id.cmp(&b.id))
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = DomainError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "newest" => Ok(Self::Newest),
            "oldest" => Ok(Self::Oldest),
            "most-upvoted" => Ok(Self::MostUpvoted),
            "title-asc" => Ok(Self::TitleAsc),
            "title-desc" => Ok(Self::TitleDesc),
            other => Err(DomainError::validation(format!("unknown sort order '{other}'"))),
        }
    }
}

/// What the browse page asks for. `difficulty: None` means "All".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdeaFilter {
    pub search: String,
    pub difficulty: Option<Difficulty>,
    pub tag_ids: BTreeSet<TagId>,
    pub tech_stack_names: BTreeSet<String>,
    pub sort: SortOrder,
    /// 1-based
    pub page: u32,
}

impl Default for IdeaFilter {
    fn default() -> Self {
        Self {
            search: String::new(),
            difficulty: None,
            tag_ids: BTreeSet::new(),
            tech_stack_names: BTreeSet::new(),
            sort: SortOrder::default(),
            page: 1,
        }
    }
}

impl IdeaFilter {
    pub fn validate(&self) -> Result<()> {
        if self.page == 0 {
            return Err(DomainError::validation("page must be a positive integer"));
        }
        if self.search.chars().count() > MAX_SEARCH_LEN {
            return Err(DomainError::validation(format!(
                "search must be at most {MAX_SEARCH_LEN} characters"
            )));
        }
        Ok(())
    }
}

/// A filtered, ordered, ranged request against the ideas store.
/// Only published ideas are ever eligible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdeaQuery {
    /// Lower-cased, trimmed; `None` when empty
    pub search: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub tag_ids: BTreeSet<TagId>,
    pub tech_stack_names: BTreeSet<String>,
    pub sort: SortOrder,
    pub offset: u64,
    pub limit: u64,
}

impl IdeaQuery {
    pub fn for_page(filter: &IdeaFilter, page_size: u32) -> Result<Self> {
        filter.validate()?;
        if page_size == 0 {
            return Err(DomainError::validation("page size must be positive"));
        }
        let search = filter.search.trim().to_lowercase();
        Ok(Self {
            search: (!search.is_empty()).then_some(search),
            difficulty: filter.difficulty,
            tag_ids: filter.tag_ids.clone(),
            tech_stack_names: filter.tech_stack_names.clone(),
            sort: filter.sort,
            offset: u64::from(filter.page - 1) * u64::from(page_size),
            limit: u64::from(page_size),
        })
    }

    /// Search and difficulty predicates plus the published restriction.
    /// Tag and tech-stack membership needs relation data and is checked by
    /// [`IdeaQuery::matches_relations`].
    pub fn matches_row(&self, idea: &Idea) -> bool {
        if idea.status != IdeaStatus::Published {
            return false;
        }
        if let Some(d) = self.difficulty {
            if idea.difficulty != d {
                return false;
            }
        }
        match &self.search {
            Some(term) => [&idea.title, &idea.short_description, &idea.full_description]
                .iter()
                .any(|field| field.to_lowercase().contains(term.as_str())),
            None => true,
        }
    }

    /// OR semantics within each set; an empty set does not filter.
    pub fn matches_relations(&self, tag_ids: &[TagId], tech_names: &[String]) -> bool {
        let tags_ok = self.tag_ids.is_empty() || tag_ids.iter().any(|t| self.tag_ids.contains(t));
        let tech_ok = self.tech_stack_names.is_empty()
            || tech_names.iter().any(|n| self.tech_stack_names.contains(n));
        tags_ok && tech_ok
    }
}

/// One page of rows plus the size of the whole filtered set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdeaPage {
    pub rows: Vec<Idea>,
    pub total_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorSummary {
    pub id: UserId,
    pub name: String,
    pub avatar_url: Option<String>,
}

impl AuthorSummary {
    pub fn from_profile(id: UserId, profile: Option<&UserProfile>) -> Self {
        match profile {
            Some(p) => Self {
                id,
                name: p.display_name().to_string(),
                avatar_url: p.avatar_url.clone(),
            },
            None => Self::unknown(id),
        }
    }

    pub fn unknown(id: UserId) -> Self {
        Self {
            id,
            name: UNKNOWN_AUTHOR.to_string(),
            avatar_url: None,
        }
    }
}

/// An idea card: the row joined with author, tags, tech stack and the
/// viewer's vote state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdeaSummary {
    pub id: IdeaId,
    pub title: String,
    pub short_description: String,
    pub difficulty: Difficulty,
    pub upvotes: u32,
    pub created_at: DateTime<Utc>,
    pub author: AuthorSummary,
    pub tags: Vec<Tag>,
    pub tech_stack: Vec<String>,
    pub is_upvoted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdeaListing {
    pub items: Vec<IdeaSummary>,
    pub total_count: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdeaDetail {
    #[serde(flatten)]
    pub summary: IdeaSummary,
    pub full_description: String,
    pub status: IdeaStatus,
    pub updated_at: DateTime<Utc>,
}

/// Everything the profile page shows about one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileOverview {
    pub profile: UserProfile,
    pub ideas: Vec<IdeaSummary>,
    pub upvoted: Vec<IdeaSummary>,
}
