//! # Vote Toggle
//!
//! Flips a viewer's upvote and keeps the idea counter in lockstep with the
//! vote rows. The store performs both writes as one unit; this layer only
//! enforces identity and exposes the repair path.

pub mod optimistic;

use std::sync::Arc;

use domains::{
    DomainError, IdeaId, IdeaRepository, ReconcileOutcome, Result, UserId, VoteOutcome,
    VoteRepository,
};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::common::retry::RetryPolicy;

/// Summary of a full counter repair pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub checked: usize,
    pub repaired: Vec<ReconcileOutcome>,
}

pub struct VoteService {
    ideas: Arc<dyn IdeaRepository>,
    votes: Arc<dyn VoteRepository>,
    retry: RetryPolicy,
}

impl VoteService {
    pub fn new(ideas: Arc<dyn IdeaRepository>, votes: Arc<dyn VoteRepository>, retry: RetryPolicy) -> Self {
        Self { ideas, votes, retry }
    }

    /// Adds the viewer's vote if absent, removes it if present.
    ///
    /// Not retried: a toggle that reached the store before the connection
    /// dropped would flip back on a second attempt.
    #[instrument(skip(self))]
    pub async fn toggle_upvote(&self, idea_id: IdeaId, viewer: Option<UserId>) -> Result<VoteOutcome> {
        let user_id = viewer.ok_or(DomainError::Unauthenticated)?;
        let outcome = self.votes.toggle_vote(user_id, idea_id).await?;
        info!(
            %idea_id,
            %user_id,
            action = outcome.action.as_str(),
            upvotes = outcome.upvotes,
            "vote toggled"
        );
        Ok(outcome)
    }

    /// Resets one counter to the number of vote rows.
    #[instrument(skip(self))]
    pub async fn reconcile_upvotes(&self, idea_id: IdeaId) -> Result<ReconcileOutcome> {
        let outcome = self
            .retry
            .run("reconcile_upvotes", || self.votes.reconcile_upvotes(idea_id))
            .await?;
        if outcome.drifted() {
            warn!(
                %idea_id,
                previous = outcome.previous,
                actual = outcome.actual,
                "upvote counter drifted, repaired"
            );
        }
        Ok(outcome)
    }

    /// Repairs every idea. Ideas deleted mid-pass are skipped.
    #[instrument(skip(self))]
    pub async fn reconcile_all(&self) -> Result<ReconcileReport> {
        let ids = self
            .retry
            .run("all_idea_ids", || self.ideas.all_idea_ids())
            .await?;

        let mut report = ReconcileReport::default();
        for id in ids {
            match self.reconcile_upvotes(id).await {
                Ok(outcome) => {
                    report.checked += 1;
                    if outcome.drifted() {
                        report.repaired.push(outcome);
                    }
                }
                Err(DomainError::NotFound(..)) => continue,
                Err(e) => return Err(e),
            }
        }
        info!(checked = report.checked, repaired = report.repaired.len(), "reconcile pass finished");
        Ok(report)
    }
}
