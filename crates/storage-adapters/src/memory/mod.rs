//! # In-memory store
//!
//! Implements every repository port over `DashMap`s. Used for local runs,
//! demos and tests.
//!
//! Lock order: an `ideas` entry guard may be held while touching `votes`,
//! relation or report maps, never the other way round. No guard is held
//! across an `.await`.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use domains::{
    DomainError, Idea, IdeaId, IdeaPage, IdeaQuery, IdeaRelations, IdeaRepository,
    ProfileRepository, ReconcileOutcome, Report, ReportRepository, Result, SortOrder, Tag, TagId,
    TagRepository, TechStackId, TechStackItem, TechStackRepository, UserId, UserProfile, Vote,
    VoteAction, VoteOutcome, VoteRepository,
};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct MemoryStore {
    ideas: DashMap<IdeaId, Idea>,
    idea_tags: DashMap<IdeaId, Vec<TagId>>,
    idea_tech_stacks: DashMap<IdeaId, Vec<TechStackId>>,
    tags: DashMap<TagId, Tag>,
    tech_stacks: DashMap<TechStackId, TechStackItem>,
    tech_by_name: DashMap<String, TechStackId>,
    votes: DashMap<(UserId, IdeaId), Vote>,
    profiles: DashMap<UserId, UserProfile>,
    reports: DashMap<Uuid, Report>,
    next_tag_id: AtomicI64,
    next_tech_id: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports are write-only through the ports; this is for inspection.
    pub fn reports_for(&self, idea_id: IdeaId) -> Vec<Report> {
        self.reports
            .iter()
            .filter(|r| r.idea_id == idea_id)
            .map(|r| r.value().clone())
            .collect()
    }

    pub fn vote_count(&self, idea_id: IdeaId) -> usize {
        self.votes.iter().filter(|v| v.key().1 == idea_id).count()
    }

    fn tag_ids_of(&self, idea_id: &IdeaId) -> Vec<TagId> {
        self.idea_tags.get(idea_id).map(|t| t.clone()).unwrap_or_default()
    }

    fn tech_ids_of(&self, idea_id: &IdeaId) -> Vec<TechStackId> {
        self.idea_tech_stacks
            .get(idea_id)
            .map(|t| t.clone())
            .unwrap_or_default()
    }

    fn tech_names_of(&self, idea_id: &IdeaId) -> Vec<String> {
        self.tech_ids_of(idea_id)
            .iter()
            .filter_map(|id| self.tech_stacks.get(id).map(|t| t.name.clone()))
            .collect()
    }

    fn snapshot(&self, keep: impl Fn(&Idea) -> bool) -> Vec<Idea> {
        self.ideas
            .iter()
            .filter(|i| keep(i.value()))
            .map(|i| i.value().clone())
            .collect()
    }

    fn write_relations(&self, id: IdeaId, relations: IdeaRelations) {
        self.idea_tags.insert(id, relations.tag_ids);
        self.idea_tech_stacks.insert(id, relations.tech_stack_ids);
    }
}

#[async_trait]
impl IdeaRepository for MemoryStore {
    async fn query_ideas(&self, query: &IdeaQuery) -> Result<IdeaPage> {
        let mut rows: Vec<Idea> = self
            .snapshot(|i| query.matches_row(i))
            .into_iter()
            .filter(|i| query.matches_relations(&self.tag_ids_of(&i.id), &self.tech_names_of(&i.id)))
            .collect();
        rows.sort_by(|a, b| query.sort.compare(a, b));

        let total_count = rows.len() as u64;
        let rows = rows
            .into_iter()
            .skip(usize::try_from(query.offset).unwrap_or(usize::MAX))
            .take(usize::try_from(query.limit).unwrap_or(usize::MAX))
            .collect();
        Ok(IdeaPage { rows, total_count })
    }

    async fn find_idea(&self, id: IdeaId) -> Result<Option<Idea>> {
        Ok(self.ideas.get(&id).map(|i| i.clone()))
    }

    async fn find_ideas(&self, ids: &[IdeaId]) -> Result<Vec<Idea>> {
        let mut rows: Vec<Idea> = ids
            .iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .filter_map(|id| self.ideas.get(id).map(|i| i.clone()))
            .collect();
        rows.sort_by(|a, b| SortOrder::Newest.compare(a, b));
        Ok(rows)
    }

    async fn ideas_by_author(&self, user_id: UserId) -> Result<Vec<Idea>> {
        let mut rows = self.snapshot(|i| i.user_id == user_id);
        rows.sort_by(|a, b| SortOrder::Newest.compare(a, b));
        Ok(rows)
    }

    async fn related_ideas(&self, id: IdeaId, limit: u32) -> Result<Vec<Idea>> {
        let tags: BTreeSet<TagId> = self.tag_ids_of(&id).into_iter().collect();
        let tech: BTreeSet<TechStackId> = self.tech_ids_of(&id).into_iter().collect();
        if tags.is_empty() && tech.is_empty() {
            return Ok(Vec::new());
        }

        let mut rows: Vec<Idea> = self
            .snapshot(|i| i.id != id && i.is_published())
            .into_iter()
            .filter(|i| {
                self.tag_ids_of(&i.id).iter().any(|t| tags.contains(t))
                    || self.tech_ids_of(&i.id).iter().any(|t| tech.contains(t))
            })
            .collect();
        rows.sort_by(|a, b| SortOrder::MostUpvoted.compare(a, b));
        rows.truncate(limit as usize);
        Ok(rows)
    }

    async fn all_idea_ids(&self) -> Result<Vec<IdeaId>> {
        let mut ids: Vec<IdeaId> = self.ideas.iter().map(|i| *i.key()).collect();
        ids.sort();
        Ok(ids)
    }

    async fn count_ideas(&self) -> Result<u64> {
        Ok(self.ideas.len() as u64)
    }

    async fn insert_idea(&self, idea: Idea, relations: IdeaRelations) -> Result<()> {
        if self.ideas.contains_key(&idea.id) {
            return Err(DomainError::Conflict(format!("idea {} already exists", idea.id)));
        }
        // Relations first so a reader that sees the row also sees its links.
        self.write_relations(idea.id, relations);
        self.ideas.insert(idea.id, idea);
        Ok(())
    }

    async fn replace_idea(&self, idea: Idea, relations: IdeaRelations) -> Result<()> {
        let mut stored = self
            .ideas
            .get_mut(&idea.id)
            .ok_or_else(|| DomainError::not_found("Idea", idea.id))?;
        self.write_relations(idea.id, relations);
        let upvotes = stored.upvotes;
        *stored = Idea { upvotes, ..idea };
        Ok(())
    }

    async fn delete_idea(&self, id: IdeaId) -> Result<bool> {
        // Removing the row first makes concurrent toggles fail with NotFound.
        if self.ideas.remove(&id).is_none() {
            return Ok(false);
        }
        self.idea_tags.remove(&id);
        self.idea_tech_stacks.remove(&id);
        self.votes.retain(|(_, idea_id), _| *idea_id != id);
        self.reports.retain(|_, r| r.idea_id != id);
        debug!(idea_id = %id, "idea removed with its relations");
        Ok(true)
    }
}

#[async_trait]
impl TagRepository for MemoryStore {
    async fn list_tags(&self) -> Result<Vec<Tag>> {
        let mut tags: Vec<Tag> = self.tags.iter().map(|t| t.value().clone()).collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(tags)
    }

    async fn find_tags(&self, ids: &[TagId]) -> Result<Vec<Tag>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.tags.get(id).map(|t| t.clone()))
            .collect())
    }

    async fn tag_ids_for_idea(&self, idea_id: IdeaId) -> Result<Vec<TagId>> {
        Ok(self.tag_ids_of(&idea_id))
    }

    async fn insert_tag(&self, name: &str, color: &str) -> Result<Tag> {
        if self.tags.iter().any(|t| t.name == name) {
            return Err(DomainError::Conflict(format!("tag '{name}' already exists")));
        }
        let tag = Tag {
            id: self.next_tag_id.fetch_add(1, Ordering::Relaxed) + 1,
            name: name.to_string(),
            color: color.to_string(),
        };
        self.tags.insert(tag.id, tag.clone());
        Ok(tag)
    }
}

#[async_trait]
impl TechStackRepository for MemoryStore {
    async fn list_tech_stacks(&self) -> Result<Vec<TechStackItem>> {
        let mut items: Vec<TechStackItem> =
            self.tech_stacks.iter().map(|t| t.value().clone()).collect();
        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(items)
    }

    async fn find_tech_stacks(&self, ids: &[TechStackId]) -> Result<Vec<TechStackItem>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.tech_stacks.get(id).map(|t| t.clone()))
            .collect())
    }

    async fn tech_stack_ids_for_idea(&self, idea_id: IdeaId) -> Result<Vec<TechStackId>> {
        Ok(self.tech_ids_of(&idea_id))
    }

    async fn upsert_tech_stacks(&self, names: &[String]) -> Result<Vec<TechStackItem>> {
        let mut seen = BTreeSet::new();
        let mut items = Vec::new();
        for name in names.iter().filter(|n| seen.insert(n.as_str())) {
            // The entry guard makes concurrent upserts of one name agree on its id.
            let id = *self.tech_by_name.entry(name.clone()).or_insert_with(|| {
                let id = self.next_tech_id.fetch_add(1, Ordering::Relaxed) + 1;
                self.tech_stacks.insert(id, TechStackItem { id, name: name.clone() });
                id
            });
            items.push(TechStackItem { id, name: name.clone() });
        }
        Ok(items)
    }
}

#[async_trait]
impl VoteRepository for MemoryStore {
    async fn find_vote(&self, user_id: UserId, idea_id: IdeaId) -> Result<Option<Vote>> {
        Ok(self.votes.get(&(user_id, idea_id)).map(|v| v.clone()))
    }

    async fn voted_idea_ids(&self, user_id: UserId) -> Result<Vec<IdeaId>> {
        let mut votes: Vec<Vote> = self
            .votes
            .iter()
            .filter(|v| v.user_id == user_id)
            .map(|v| v.value().clone())
            .collect();
        votes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(votes.into_iter().map(|v| v.idea_id).collect())
    }

    async fn toggle_vote(&self, user_id: UserId, idea_id: IdeaId) -> Result<VoteOutcome> {
        // The idea's write guard serializes every toggle on this idea.
        let mut idea = self
            .ideas
            .get_mut(&idea_id)
            .filter(|idea| idea.is_visible_to(Some(user_id)))
            .ok_or_else(|| DomainError::not_found("Idea", idea_id))?;

        let key = (user_id, idea_id);
        let action = if self.votes.remove(&key).is_some() {
            idea.upvotes = idea.upvotes.saturating_sub(1);
            VoteAction::Removed
        } else {
            self.votes.insert(
                key,
                Vote {
                    user_id,
                    idea_id,
                    created_at: Utc::now(),
                },
            );
            idea.upvotes = idea.upvotes.saturating_add(1);
            VoteAction::Added
        };
        Ok(VoteOutcome {
            action,
            upvotes: idea.upvotes,
        })
    }

    async fn reconcile_upvotes(&self, idea_id: IdeaId) -> Result<ReconcileOutcome> {
        let mut idea = self
            .ideas
            .get_mut(&idea_id)
            .ok_or_else(|| DomainError::not_found("Idea", idea_id))?;
        let actual = self.votes.iter().filter(|v| v.key().1 == idea_id).count();
        let actual = u32::try_from(actual).map_err(|_| DomainError::Internal("vote count overflow".into()))?;
        let previous = idea.upvotes;
        idea.upvotes = actual;
        Ok(ReconcileOutcome {
            idea_id,
            previous,
            actual,
        })
    }
}

#[async_trait]
impl ProfileRepository for MemoryStore {
    async fn find_profile(&self, id: UserId) -> Result<Option<UserProfile>> {
        Ok(self.profiles.get(&id).map(|p| p.clone()))
    }

    async fn upsert_profile(&self, profile: UserProfile) -> Result<UserProfile> {
        self.profiles.insert(profile.id, profile.clone());
        Ok(profile)
    }
}

#[async_trait]
impl ReportRepository for MemoryStore {
    async fn insert_report(&self, report: Report) -> Result<()> {
        // Held until the report is in so a concurrent delete cannot orphan it.
        let _idea = self
            .ideas
            .get(&report.idea_id)
            .ok_or_else(|| DomainError::not_found("Idea", report.idea_id))?;
        self.reports.insert(report.id, report);
        Ok(())
    }
}
