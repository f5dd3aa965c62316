//! Profile pages: who a user is, what they posted and what they upvoted.

use std::sync::Arc;

use domains::{Clock, DomainError, Idea, ProfileOverview, Result, UserId, UserProfile, Viewer};
use tracing::{info, instrument};

use crate::common::retry::RetryPolicy;
use crate::listing::ListingService;
use crate::Ports;

pub const MAX_FULL_NAME_LEN: usize = 100;

pub struct ProfileService {
    ports: Ports,
    listing: Arc<ListingService>,
    clock: Arc<dyn Clock>,
    retry: RetryPolicy,
}

impl ProfileService {
    pub fn new(ports: Ports, listing: Arc<ListingService>, clock: Arc<dyn Clock>, retry: RetryPolicy) -> Self {
        Self {
            ports,
            listing,
            clock,
            retry,
        }
    }

    /// Drafts are listed only when the owner is looking.
    #[instrument(skip(self, viewer))]
    pub async fn profile_overview(&self, user_id: UserId, viewer: Option<&Viewer>) -> Result<ProfileOverview> {
        let profile = self
            .retry
            .run("find_profile", || self.ports.profiles.find_profile(user_id))
            .await?
            .ok_or_else(|| DomainError::not_found("Profile", user_id))?;
        let viewer_id = viewer.map(|v| v.id);
        let is_owner = viewer_id == Some(user_id);

        let authored: Vec<Idea> = self
            .retry
            .run("ideas_by_author", || self.ports.ideas.ideas_by_author(user_id))
            .await?
            .into_iter()
            .filter(|i| is_owner || i.is_published())
            .collect();

        let voted_ids = self
            .retry
            .run("voted_idea_ids", || self.ports.votes.voted_idea_ids(user_id))
            .await?;
        let upvoted: Vec<Idea> = if voted_ids.is_empty() {
            Vec::new()
        } else {
            self.retry
                .run("find_ideas", || self.ports.ideas.find_ideas(&voted_ids))
                .await?
                .into_iter()
                .filter(|i| i.is_published() || viewer_id == Some(i.user_id))
                .collect()
        };

        let (ideas, upvoted) = tokio::join!(
            self.listing.summarize(&authored, viewer_id),
            self.listing.summarize(&upvoted, viewer_id),
        );
        Ok(ProfileOverview {
            profile,
            ideas,
            upvoted,
        })
    }

    /// Upserts the viewer's own profile. A blank name clears it.
    #[instrument(skip(self, viewer, full_name, avatar_url))]
    pub async fn update_profile(
        &self,
        viewer: Option<&Viewer>,
        full_name: Option<String>,
        avatar_url: Option<String>,
    ) -> Result<UserProfile> {
        let viewer = viewer.ok_or(DomainError::Unauthenticated)?;
        let full_name = full_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        if let Some(name) = &full_name {
            if name.chars().count() > MAX_FULL_NAME_LEN {
                return Err(DomainError::validation(format!(
                    "full name must be at most {MAX_FULL_NAME_LEN} characters"
                )));
            }
        }

        let now = self.clock.now();
        let existing = self
            .retry
            .run("find_profile", || self.ports.profiles.find_profile(viewer.id))
            .await?;
        let profile = match existing {
            Some(p) => UserProfile {
                full_name,
                avatar_url: avatar_url.filter(|a| !a.trim().is_empty()),
                updated_at: now,
                ..p
            },
            None => UserProfile {
                avatar_url: avatar_url.filter(|a| !a.trim().is_empty()),
                ..UserProfile::new(viewer.id, full_name, now)
            },
        };
        let saved = self
            .retry
            .run("upsert_profile", || self.ports.profiles.upsert_profile(profile.clone()))
            .await?;
        info!(user_id = %viewer.id, "profile updated");
        Ok(saved)
    }
}
