//! # Listing Engine
//!
//! Filter, sort and paginate ideas at the query layer, then hydrate each row
//! of the page. Counters and vote state are always read fresh.

pub mod filter_state;
mod hydrate;
pub mod sequencer;

use domains::{
    DomainError, Idea, IdeaDetail, IdeaFilter, IdeaId, IdeaListing, IdeaQuery, IdeaSummary,
    Result, UserId, Viewer,
};
use tracing::instrument;

use crate::common::pagination::total_pages;
use crate::common::retry::RetryPolicy;
use crate::Ports;
use hydrate::Hydrator;

/// Ideas per browse page.
pub const DEFAULT_PAGE_SIZE: u32 = 6;

/// Upper bound on the "similar ideas" sidebar.
pub const SIMILAR_IDEAS_LIMIT: u32 = 6;

pub struct ListingService {
    ports: Ports,
    retry: RetryPolicy,
    page_size: u32,
}

impl ListingService {
    pub fn new(ports: Ports, retry: RetryPolicy, page_size: u32) -> Self {
        Self {
            ports,
            retry,
            page_size: page_size.max(1),
        }
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// One page of published ideas matching `filter`, plus the size of the
    /// whole filtered set.
    #[instrument(skip(self, filter), fields(page = filter.page, sort = %filter.sort))]
    pub async fn list_ideas(&self, filter: &IdeaFilter, viewer: Option<UserId>) -> Result<IdeaListing> {
        let query = IdeaQuery::for_page(filter, self.page_size)?;
        let page = self
            .retry
            .run("query_ideas", || self.ports.ideas.query_ideas(&query))
            .await?;

        let items = self.hydrator().hydrate_all(&page.rows, viewer).await;
        Ok(IdeaListing {
            items,
            total_count: page.total_count,
            page: filter.page,
            page_size: self.page_size,
            total_pages: total_pages(page.total_count, self.page_size),
        })
    }

    /// Full detail for one idea. Drafts are only visible to their author.
    #[instrument(skip(self, viewer))]
    pub async fn get_idea(&self, id: IdeaId, viewer: Option<&Viewer>) -> Result<IdeaDetail> {
        let idea = self.load_visible(id, viewer).await?;
        let summary = self.hydrator().hydrate(&idea, viewer.map(|v| v.id)).await;
        Ok(IdeaDetail {
            summary,
            full_description: idea.full_description,
            status: idea.status,
            updated_at: idea.updated_at,
        })
    }

    /// Other published ideas sharing a tag or a tech-stack item.
    #[instrument(skip(self, viewer))]
    pub async fn similar_ideas(&self, id: IdeaId, viewer: Option<&Viewer>) -> Result<Vec<IdeaSummary>> {
        self.load_visible(id, viewer).await?;
        let related = self
            .retry
            .run("related_ideas", || self.ports.ideas.related_ideas(id, SIMILAR_IDEAS_LIMIT))
            .await?;
        Ok(self.summarize(&related, viewer.map(|v| v.id)).await)
    }

    /// Hydrates rows that were loaded elsewhere (profile pages).
    pub async fn summarize(&self, ideas: &[Idea], viewer: Option<UserId>) -> Vec<IdeaSummary> {
        self.hydrator().hydrate_all(ideas, viewer).await
    }

    async fn load_visible(&self, id: IdeaId, viewer: Option<&Viewer>) -> Result<Idea> {
        let idea = self
            .retry
            .run("find_idea", || self.ports.ideas.find_idea(id))
            .await?
            .ok_or_else(|| DomainError::not_found("Idea", id))?;

        if !idea.is_visible_to(viewer.map(|v| v.id)) {
            return Err(DomainError::not_found("Idea", id));
        }
        Ok(idea)
    }

    fn hydrator(&self) -> Hydrator<'_> {
        Hydrator {
            ports: &self.ports,
            retry: self.retry,
        }
    }
}
