//! Joins an idea row with its author, tags, tech stack and the viewer's
//! vote. Each lookup degrades on its own: a failed tag lookup leaves the
//! tag list empty instead of failing the page.

use domains::{AuthorSummary, Idea, IdeaSummary, Result, Tag, TechStackItem, UserId};
use futures_util::future::join_all;
use tracing::warn;

use crate::common::retry::RetryPolicy;
use crate::Ports;

pub(crate) struct Hydrator<'a> {
    pub ports: &'a Ports,
    pub retry: RetryPolicy,
}

impl Hydrator<'_> {
    pub async fn hydrate_all(&self, ideas: &[Idea], viewer: Option<UserId>) -> Vec<IdeaSummary> {
        join_all(ideas.iter().map(|idea| self.hydrate(idea, viewer))).await
    }

    pub async fn hydrate(&self, idea: &Idea, viewer: Option<UserId>) -> IdeaSummary {
        let (author, tags, tech_stack, is_upvoted) = tokio::join!(
            self.author(idea),
            self.tags(idea),
            self.tech_stack(idea),
            self.is_upvoted(idea, viewer),
        );

        IdeaSummary {
            id: idea.id,
            title: idea.title.clone(),
            short_description: idea.short_description.clone(),
            difficulty: idea.difficulty,
            upvotes: idea.upvotes,
            created_at: idea.created_at,
            author,
            tags,
            tech_stack,
            is_upvoted,
        }
    }

    async fn author(&self, idea: &Idea) -> AuthorSummary {
        match self
            .retry
            .run("find_profile", || self.ports.profiles.find_profile(idea.user_id))
            .await
        {
            Ok(profile) => AuthorSummary::from_profile(idea.user_id, profile.as_ref()),
            Err(e) => {
                warn!(idea_id = %idea.id, error = %e, "author lookup failed, showing unknown author");
                AuthorSummary::unknown(idea.user_id)
            }
        }
    }

    async fn tags(&self, idea: &Idea) -> Vec<Tag> {
        match self.load_tags(idea).await {
            Ok(mut tags) => {
                tags.sort_by(|a, b| a.name.cmp(&b.name));
                tags
            }
            Err(e) => {
                warn!(idea_id = %idea.id, error = %e, "tag lookup failed, showing no tags");
                Vec::new()
            }
        }
    }

    async fn load_tags(&self, idea: &Idea) -> Result<Vec<Tag>> {
        let ids = self
            .retry
            .run("tag_ids_for_idea", || self.ports.tags.tag_ids_for_idea(idea.id))
            .await?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.retry
            .run("find_tags", || self.ports.tags.find_tags(&ids))
            .await
    }

    async fn tech_stack(&self, idea: &Idea) -> Vec<String> {
        match self.load_tech_stack(idea).await {
            Ok(items) => {
                let mut names: Vec<String> = items.into_iter().map(|t| t.name).collect();
                names.sort();
                names
            }
            Err(e) => {
                warn!(idea_id = %idea.id, error = %e, "tech stack lookup failed, showing none");
                Vec::new()
            }
        }
    }

    async fn load_tech_stack(&self, idea: &Idea) -> Result<Vec<TechStackItem>> {
        let ids = self
            .retry
            .run("tech_stack_ids_for_idea", || {
                self.ports.tech_stacks.tech_stack_ids_for_idea(idea.id)
            })
            .await?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.retry
            .run("find_tech_stacks", || self.ports.tech_stacks.find_tech_stacks(&ids))
            .await
    }

    async fn is_upvoted(&self, idea: &Idea, viewer: Option<UserId>) -> bool {
        let Some(user_id) = viewer else {
            return false;
        };
        match self
            .retry
            .run("find_vote", || self.ports.votes.find_vote(user_id, idea.id))
            .await
        {
            Ok(vote) => vote.is_some(),
            Err(e) => {
                warn!(idea_id = %idea.id, error = %e, "vote lookup failed, showing not upvoted");
                false
            }
        }
    }
}
