//! ideashare/crates/services/src/lib.rs
//!
//! Application logic for IdeaShare. Services hold `Arc<dyn Port>` handles
//! and never know which store sits behind them.

pub mod common;
pub mod listing;
pub mod profiles;
pub mod reference;
pub mod reports;
pub mod submission;
pub mod voting;

use std::sync::Arc;

use domains::{
    IdeaRepository, ProfileRepository, ReportRepository, TagRepository, TechStackRepository,
    VoteRepository,
};

pub use common::pagination::{page_numbers, total_pages, PageItem};
pub use common::retry::RetryPolicy;
pub use listing::filter_state::FilterBarState;
pub use listing::sequencer::{ListingSequencer, Ticket};
pub use listing::ListingService;
pub use profiles::ProfileService;
pub use reference::ReferenceDataService;
pub use reports::ReportService;
pub use submission::{IdeaInput, SubmissionService};
pub use voting::optimistic::{OptimisticVote, VoteView};
pub use voting::{ReconcileReport, VoteService};

/// Storage handles shared by every service.
#[derive(Clone)]
pub struct Ports {
    pub ideas: Arc<dyn IdeaRepository>,
    pub tags: Arc<dyn TagRepository>,
    pub tech_stacks: Arc<dyn TechStackRepository>,
    pub votes: Arc<dyn VoteRepository>,
    pub profiles: Arc<dyn ProfileRepository>,
    pub reports: Arc<dyn ReportRepository>,
}

impl Ports {
    /// Wires a store that implements every repository trait.
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: IdeaRepository
            + TagRepository
            + TechStackRepository
            + VoteRepository
            + ProfileRepository
            + ReportRepository
            + 'static,
    {
        Self {
            ideas: store.clone(),
            tags: store.clone(),
            tech_stacks: store.clone(),
            votes: store.clone(),
            profiles: store.clone(),
            reports: store,
        }
    }
}
