//! ideashare/crates/integration-tests/src/lib.rs
//!
//! Shared fixtures: a fully wired service stack over the in-memory store.

use std::sync::Arc;
use std::time::Duration;

use domains::{Clock, Difficulty, Idea, Result, SystemClock, Tag, TagId, TagRepository, UserId, Viewer};
use services::{
    IdeaInput, ListingService, Ports, ProfileService, ReferenceDataService, RetryPolicy,
    SubmissionService, VoteService,
};
use storage_adapters::MemoryStore;
use uuid::Uuid;

pub const PAGE_SIZE: u32 = 6;

pub struct World {
    pub store: Arc<MemoryStore>,
    pub ports: Ports,
    pub listing: Arc<ListingService>,
    pub votes: VoteService,
    pub submission: SubmissionService,
    pub profiles: ProfileService,
    pub reference: Arc<ReferenceDataService>,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let ports = Ports::from_store(store.clone());
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let retry = RetryPolicy::none();

        let reference = Arc::new(ReferenceDataService::new(
            ports.tags.clone(),
            ports.tech_stacks.clone(),
            retry,
            Duration::from_secs(300),
            clock.clone(),
        ));
        let listing = Arc::new(ListingService::new(ports.clone(), retry, PAGE_SIZE));

        Self {
            votes: VoteService::new(ports.ideas.clone(), ports.votes.clone(), retry),
            submission: SubmissionService::new(ports.clone(), reference.clone(), clock.clone(), retry),
            profiles: ProfileService::new(ports.clone(), listing.clone(), clock, retry),
            listing,
            reference,
            ports,
            store,
        }
    }

    pub async fn tag(&self, name: &str) -> Tag {
        self.store
            .insert_tag(name, "#3b82f6")
            .await
            .unwrap_or_else(|e| panic!("inserting tag {name}: {e}"))
    }

    pub async fn submit(&self, author: &Viewer, input: IdeaInput) -> Result<Idea> {
        self.submission.submit_idea(Some(author), input).await
    }
}

pub fn viewer() -> Viewer {
    Viewer::user(Uuid::now_v7())
}

pub fn users(n: usize) -> Vec<UserId> {
    (0..n).map(|_| Uuid::now_v7()).collect()
}

pub fn idea_input(title: &str, difficulty: Difficulty, tag_ids: &[TagId], tech: &[&str]) -> IdeaInput {
    IdeaInput {
        title: title.to_string(),
        short_description: format!("{title}, briefly"),
        full_description: format!("# {title}\n\nWhat it does and how to start."),
        difficulty,
        tag_ids: tag_ids.to_vec(),
        tech_stack: tech.iter().map(|t| t.to_string()).collect(),
        status: None,
    }
}
