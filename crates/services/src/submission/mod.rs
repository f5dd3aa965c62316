//! # Submission
//!
//! Creating, editing and deleting ideas. Only authors (and admins) may
//! touch an existing idea.

use std::collections::BTreeSet;
use std::sync::Arc;

use domains::{
    Clock, Difficulty, DomainError, Idea, IdeaId, IdeaRelations, IdeaStatus, Result, TagId,
    UserProfile, Viewer,
};
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::common::retry::RetryPolicy;
use crate::listing::filter_state::LIST_SEPARATOR;
use crate::reference::ReferenceDataService;
use crate::Ports;

pub const MAX_TITLE_LEN: usize = 120;
pub const MAX_SHORT_DESCRIPTION_LEN: usize = 150;
pub const MAX_FULL_DESCRIPTION_LEN: usize = 20_000;
pub const MAX_TECH_ITEMS: usize = 10;
pub const MAX_TECH_NAME_LEN: usize = 50;

/// Form payload for a new or edited idea.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IdeaInput {
    pub title: String,
    pub short_description: String,
    pub full_description: String,
    pub difficulty: Difficulty,
    #[serde(default)]
    pub tag_ids: Vec<TagId>,
    #[serde(default)]
    pub tech_stack: Vec<String>,
    /// Defaults to published on submit and to the current status on edit
    #[serde(default)]
    pub status: Option<IdeaStatus>,
}

/// Trimmed, deduplicated and bounds-checked input.
#[derive(Debug, Clone, PartialEq, Eq)]
struct CleanInput {
    title: String,
    short_description: String,
    full_description: String,
    difficulty: Difficulty,
    tag_ids: Vec<TagId>,
    tech_stack: Vec<String>,
    status: Option<IdeaStatus>,
}

impl IdeaInput {
    fn clean(self) -> Result<CleanInput> {
        let title = required("title", &self.title, MAX_TITLE_LEN)?;
        let short_description =
            required("short description", &self.short_description, MAX_SHORT_DESCRIPTION_LEN)?;
        if self.full_description.trim().is_empty() {
            return Err(DomainError::validation("full description is required"));
        }
        if self.full_description.chars().count() > MAX_FULL_DESCRIPTION_LEN {
            return Err(DomainError::validation(format!(
                "full description must be at most {MAX_FULL_DESCRIPTION_LEN} characters"
            )));
        }

        let tag_ids: Vec<TagId> = self.tag_ids.into_iter().collect::<BTreeSet<_>>().into_iter().collect();

        let mut seen = BTreeSet::new();
        let mut tech_stack = Vec::new();
        for raw in &self.tech_stack {
            let name = required("tech stack name", raw, MAX_TECH_NAME_LEN)?;
            if name.contains(LIST_SEPARATOR) {
                return Err(DomainError::validation(format!(
                    "tech stack name '{name}' must not contain '{LIST_SEPARATOR}'"
                )));
            }
            if seen.insert(name.clone()) {
                tech_stack.push(name);
            }
        }
        if tech_stack.len() > MAX_TECH_ITEMS {
            return Err(DomainError::validation(format!(
                "at most {MAX_TECH_ITEMS} tech stack items are allowed"
            )));
        }

        Ok(CleanInput {
            title,
            short_description,
            full_description: self.full_description,
            difficulty: self.difficulty,
            tag_ids,
            tech_stack,
            status: self.status,
        })
    }
}

fn required(field: &str, value: &str, max: usize) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(format!("{field} is required")));
    }
    if trimmed.chars().count() > max {
        return Err(DomainError::validation(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(trimmed.to_string())
}

pub struct SubmissionService {
    ports: Ports,
    reference: Arc<ReferenceDataService>,
    clock: Arc<dyn Clock>,
    retry: RetryPolicy,
}

impl SubmissionService {
    pub fn new(
        ports: Ports,
        reference: Arc<ReferenceDataService>,
        clock: Arc<dyn Clock>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            ports,
            reference,
            clock,
            retry,
        }
    }

    /// Publishes a new idea with zero upvotes.
    #[instrument(skip(self, viewer, input), fields(title = %input.title))]
    pub async fn submit_idea(&self, viewer: Option<&Viewer>, input: IdeaInput) -> Result<Idea> {
        let viewer = viewer.ok_or(DomainError::Unauthenticated)?;
        let input = input.clean()?;

        // 1. Relations: tags must exist, tech names are created on demand
        let relations = self.resolve_relations(&input).await?;

        // 2. Identity: the author always gets a profile row
        self.ensure_profile(viewer).await?;

        // 3. Persistence: row and relations in one unit. Not retried, a
        //    commit we never heard back about would turn into a conflict.
        let now = self.clock.now();
        let idea = Idea {
            id: Uuid::now_v7(),
            title: input.title,
            short_description: input.short_description,
            full_description: input.full_description,
            difficulty: input.difficulty,
            upvotes: 0,
            status: input.status.unwrap_or(IdeaStatus::Published),
            user_id: viewer.id,
            created_at: now,
            updated_at: now,
        };
        self.ports.ideas.insert_idea(idea.clone(), relations).await?;

        if !input.tech_stack.is_empty() {
            self.reference.invalidate_tech_stacks().await;
        }
        info!(idea_id = %idea.id, user_id = %viewer.id, "idea submitted");
        Ok(idea)
    }

    /// Replaces content and relations; the counter and author stay.
    #[instrument(skip(self, viewer, input))]
    pub async fn update_idea(&self, viewer: Option<&Viewer>, id: IdeaId, input: IdeaInput) -> Result<Idea> {
        let viewer = viewer.ok_or(DomainError::Unauthenticated)?;
        let existing = self.load_managed(viewer, id).await?;
        let input = input.clean()?;
        let relations = self.resolve_relations(&input).await?;

        let idea = Idea {
            title: input.title,
            short_description: input.short_description,
            full_description: input.full_description,
            difficulty: input.difficulty,
            status: input.status.unwrap_or(existing.status),
            updated_at: self.clock.now(),
            ..existing
        };
        self.ports.ideas.replace_idea(idea.clone(), relations).await?;

        if !input.tech_stack.is_empty() {
            self.reference.invalidate_tech_stacks().await;
        }
        info!(idea_id = %id, user_id = %viewer.id, "idea updated");
        Ok(idea)
    }

    /// Removes the idea with its votes, relations and reports.
    #[instrument(skip(self, viewer))]
    pub async fn delete_idea(&self, viewer: Option<&Viewer>, id: IdeaId) -> Result<()> {
        let viewer = viewer.ok_or(DomainError::Unauthenticated)?;
        self.load_managed(viewer, id).await?;
        if !self.ports.ideas.delete_idea(id).await? {
            return Err(DomainError::not_found("Idea", id));
        }
        info!(idea_id = %id, user_id = %viewer.id, "idea deleted");
        Ok(())
    }

    async fn load_managed(&self, viewer: &Viewer, id: IdeaId) -> Result<Idea> {
        let idea = self
            .retry
            .run("find_idea", || self.ports.ideas.find_idea(id))
            .await?
            .ok_or_else(|| DomainError::not_found("Idea", id))?;
        if !viewer.can_manage(&idea) {
            return Err(DomainError::Forbidden(format!(
                "idea {id} belongs to another author"
            )));
        }
        Ok(idea)
    }

    async fn resolve_relations(&self, input: &CleanInput) -> Result<IdeaRelations> {
        let mut relations = IdeaRelations::default();

        if !input.tag_ids.is_empty() {
            let found = self
                .retry
                .run("find_tags", || self.ports.tags.find_tags(&input.tag_ids))
                .await?;
            if let Some(missing) = input
                .tag_ids
                .iter()
                .find(|id| !found.iter().any(|t| t.id == **id))
            {
                return Err(DomainError::validation(format!("unknown tag id {missing}")));
            }
            relations.tag_ids = input.tag_ids.clone();
        }

        if !input.tech_stack.is_empty() {
            let items = self
                .retry
                .run("upsert_tech_stacks", || {
                    self.ports.tech_stacks.upsert_tech_stacks(&input.tech_stack)
                })
                .await?;
            relations.tech_stack_ids = items.into_iter().map(|t| t.id).collect();
        }
        Ok(relations)
    }

    async fn ensure_profile(&self, viewer: &Viewer) -> Result<()> {
        let existing = self
            .retry
            .run("find_profile", || self.ports.profiles.find_profile(viewer.id))
            .await?;
        if existing.is_none() {
            let profile = UserProfile::new(viewer.id, None, self.clock.now());
            self.retry
                .run("upsert_profile", || self.ports.profiles.upsert_profile(profile.clone()))
                .await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::REFERENCE_TTL;
    use crate::test_support::{mock_ports, published_idea, MockPorts};
    use domains::{MockTagRepository, MockTechStackRepository, SystemClock, Tag, TechStackItem};

    fn input() -> IdeaInput {
        IdeaInput {
            title: "  Build a Weather App ".into(),
            short_description: "Forecasts for your city".into(),
            full_description: "## Features\n- hourly".into(),
            difficulty: Difficulty::Beginner,
            tag_ids: vec![2, 1, 2],
            tech_stack: vec!["React".into(), " React ".into(), "Node".into()],
            status: None,
        }
    }

    fn service(mocks: MockPorts) -> SubmissionService {
        let reference = ReferenceDataService::new(
            Arc::new(MockTagRepository::new()),
            Arc::new(MockTechStackRepository::new()),
            RetryPolicy::none(),
            REFERENCE_TTL,
            Arc::new(SystemClock),
        );
        SubmissionService::new(
            mocks.into_ports(),
            Arc::new(reference),
            Arc::new(SystemClock),
            RetryPolicy::immediate(3),
        )
    }

    fn known_tags(mocks: &mut MockPorts) {
        mocks.tags.expect_find_tags().returning(|ids| {
            Ok(ids
                .iter()
                .map(|id| Tag { id: *id, name: format!("tag-{id}"), color: "#000000".into() })
                .collect())
        });
    }

    #[test]
    fn test_clean_trims_and_dedups() {
        let clean = input().clean().unwrap();
        assert_eq!(clean.title, "Build a Weather App");
        assert_eq!(clean.tag_ids, vec![1, 2]);
        assert_eq!(clean.tech_stack, vec!["React", "Node"]);
    }

    #[test]
    fn test_clean_rejects_out_of_bounds_fields() {
        let mut long_short = input();
        long_short.short_description = "x".repeat(MAX_SHORT_DESCRIPTION_LEN + 1);
        assert!(long_short.clean().is_err());

        let mut blank_title = input();
        blank_title.title = "   ".into();
        assert!(blank_title.clean().is_err());

        let mut joined_tech = input();
        joined_tech.tech_stack = vec!["Qt, QML".into()];
        assert!(matches!(joined_tech.clean(), Err(DomainError::ValidationFailed(_))));

        let mut too_much_tech = input();
        too_much_tech.tech_stack = (0..=MAX_TECH_ITEMS).map(|i| format!("t{i}")).collect();
        assert!(too_much_tech.clean().is_err());
    }

    #[tokio::test]
    async fn test_submit_writes_published_idea_with_relations() {
        let viewer = Viewer::user(Uuid::now_v7());
        let mut mocks = mock_ports();
        known_tags(&mut mocks);
        mocks.tech_stacks.expect_upsert_tech_stacks().returning(|names| {
            assert_eq!(names, ["React".to_string(), "Node".to_string()]);
            Ok(vec![
                TechStackItem { id: 10, name: "React".into() },
                TechStackItem { id: 11, name: "Node".into() },
            ])
        });
        mocks.profiles.expect_find_profile().returning(|_| Ok(None));
        mocks.profiles
            .expect_upsert_profile()
            .times(1)
            .returning(|p| Ok(p));
        mocks.ideas
            .expect_insert_idea()
            .times(1)
            .withf(|idea, rel| {
                idea.upvotes == 0
                    && idea.is_published()
                    && rel.tag_ids == vec![1, 2]
                    && rel.tech_stack_ids == vec![10, 11]
            })
            .returning(|_, _| Ok(()));

        let idea = service(mocks).submit_idea(Some(&viewer), input()).await.unwrap();
        assert_eq!(idea.user_id, viewer.id);
        assert_eq!(idea.title, "Build a Weather App");
    }

    #[tokio::test]
    async fn test_submit_rejects_unknown_tag() {
        let mut mocks = mock_ports();
        mocks.tags.expect_find_tags().returning(|_| {
            Ok(vec![Tag { id: 1, name: "Web".into(), color: "#3b82f6".into() }])
        });
        mocks.ideas.expect_insert_idea().never();

        let err = service(mocks)
            .submit_idea(Some(&Viewer::user(Uuid::now_v7())), input())
            .await
            .unwrap_err();
        assert_eq!(err, DomainError::validation("unknown tag id 2"));
    }

    #[tokio::test]
    async fn test_submit_requires_viewer() {
        let err = service(mock_ports()).submit_idea(None, input()).await.unwrap_err();
        assert_eq!(err, DomainError::Unauthenticated);
    }

    #[tokio::test]
    async fn test_update_by_stranger_is_forbidden() {
        let idea = published_idea("Mine");
        let id = idea.id;
        let mut mocks = mock_ports();
        mocks.ideas.expect_find_idea().returning(move |_| Ok(Some(idea.clone())));
        mocks.ideas.expect_replace_idea().never();

        let stranger = Viewer::user(Uuid::now_v7());
        let err = service(mocks).update_idea(Some(&stranger), id, input()).await.unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_admin_update_keeps_counter_and_author() {
        let mut idea = published_idea("Old title");
        idea.upvotes = 7;
        let (id, author) = (idea.id, idea.user_id);
        let mut mocks = mock_ports();
        mocks.ideas.expect_find_idea().returning(move |_| Ok(Some(idea.clone())));
        known_tags(&mut mocks);
        mocks.tech_stacks
            .expect_upsert_tech_stacks()
            .returning(|_| Ok(vec![TechStackItem { id: 1, name: "React".into() }]));
        mocks.ideas.expect_replace_idea().times(1).returning(|_, _| Ok(()));

        let admin = Viewer::admin(Uuid::now_v7());
        let updated = service(mocks).update_idea(Some(&admin), id, input()).await.unwrap();
        assert_eq!(updated.upvotes, 7);
        assert_eq!(updated.user_id, author);
        assert_eq!(updated.title, "Build a Weather App");
    }

    #[tokio::test]
    async fn test_author_can_delete() {
        let idea = published_idea("Bye");
        let (id, author) = (idea.id, Viewer::user(idea.user_id));
        let mut mocks = mock_ports();
        mocks.ideas.expect_find_idea().returning(move |_| Ok(Some(idea.clone())));
        mocks.ideas.expect_delete_idea().times(1).returning(|_| Ok(true));

        service(mocks).delete_idea(Some(&author), id).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_of_missing_idea_is_not_found() {
        let mut mocks = mock_ports();
        mocks.ideas.expect_find_idea().returning(|_| Ok(None));
        let err = service(mocks)
            .delete_idea(Some(&Viewer::admin(Uuid::now_v7())), Uuid::now_v7())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound(..)));
    }
}
