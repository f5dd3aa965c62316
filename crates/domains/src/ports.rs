//! # Ports
//!
//! Any adapter must implement these traits to be wired into the binary.
//! Services only ever talk to `Arc<dyn Port>`; the in-memory and Postgres
//! stores both satisfy every repository trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::errors::Result;
use crate::models::{
    Idea, IdeaId, IdeaPage, IdeaQuery, IdeaRelations, ReconcileOutcome, Report, Tag, TagId,
    TechStackId, TechStackItem, UserId, UserProfile, Vote, VoteOutcome,
};

/// Persistence contract for ideas and their relations.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait IdeaRepository: Send + Sync {
    /// Filter, order and range in one round trip; `total_count` covers the
    /// whole filtered set, not just the returned slice.
    async fn query_ideas(&self, query: &IdeaQuery) -> Result<IdeaPage>;

    async fn find_idea(&self, id: IdeaId) -> Result<Option<Idea>>;

    /// Newest first. Missing ids are skipped.
    async fn find_ideas(&self, ids: &[IdeaId]) -> Result<Vec<Idea>>;

    /// Newest first, all statuses.
    async fn ideas_by_author(&self, user_id: UserId) -> Result<Vec<Idea>>;

    /// Published ideas other than `id` sharing a tag or tech-stack item with it,
    /// most upvoted first.
    async fn related_ideas(&self, id: IdeaId, limit: u32) -> Result<Vec<Idea>>;

    async fn all_idea_ids(&self) -> Result<Vec<IdeaId>>;

    async fn count_ideas(&self) -> Result<u64>;

    /// Writes the idea row and its relation rows atomically.
    async fn insert_idea(&self, idea: Idea, relations: IdeaRelations) -> Result<()>;

    /// Replaces content fields and relations. The stored counter is kept.
    async fn replace_idea(&self, idea: Idea, relations: IdeaRelations) -> Result<()>;

    /// Removes the idea together with its votes, relations and reports.
    /// Returns false when nothing was deleted.
    async fn delete_idea(&self, id: IdeaId) -> Result<bool>;
}

/// Tag reference data.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait TagRepository: Send + Sync {
    /// Ordered by name.
    async fn list_tags(&self) -> Result<Vec<Tag>>;
    async fn find_tags(&self, ids: &[TagId]) -> Result<Vec<Tag>>;
    async fn tag_ids_for_idea(&self, idea_id: IdeaId) -> Result<Vec<TagId>>;
    async fn insert_tag(&self, name: &str, color: &str) -> Result<Tag>;
}

/// Tech-stack reference data, deduplicated by name.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait TechStackRepository: Send + Sync {
    /// Ordered by name.
    async fn list_tech_stacks(&self) -> Result<Vec<TechStackItem>>;
    async fn find_tech_stacks(&self, ids: &[TechStackId]) -> Result<Vec<TechStackItem>>;
    async fn tech_stack_ids_for_idea(&self, idea_id: IdeaId) -> Result<Vec<TechStackId>>;
    /// Returns one item per distinct name, creating the ones that don't exist.
    async fn upsert_tech_stacks(&self, names: &[String]) -> Result<Vec<TechStackItem>>;
}

/// Vote membership plus the counter it drives.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait VoteRepository: Send + Sync {
    async fn find_vote(&self, user_id: UserId, idea_id: IdeaId) -> Result<Option<Vote>>;

    async fn voted_idea_ids(&self, user_id: UserId) -> Result<Vec<IdeaId>>;

    /// Flips the vote and moves the idea counter by exactly one in a single
    /// transactional unit. `NotFound` when the idea does not exist or is
    /// another author's draft.
    async fn toggle_vote(&self, user_id: UserId, idea_id: IdeaId) -> Result<VoteOutcome>;

    /// Sets the counter to the number of vote rows.
    async fn reconcile_upvotes(&self, idea_id: IdeaId) -> Result<ReconcileOutcome>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn find_profile(&self, id: UserId) -> Result<Option<UserProfile>>;
    async fn upsert_profile(&self, profile: UserProfile) -> Result<UserProfile>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ReportRepository: Send + Sync {
    async fn insert_report(&self, report: Report) -> Result<()>;
}

/// Identity contract: turns a bearer credential into a viewer id.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait AuthProvider: Send + Sync {
    /// `Unauthenticated` when the credential is invalid or expired.
    fn resolve_viewer(&self, bearer_token: &str) -> Result<UserId>;

    /// Staff who may edit or delete any idea.
    fn is_admin(&self, user_id: UserId) -> bool;
}

/// Time source, injected so cache staleness can be driven from tests.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
