//! Viewer-raised moderation flags. Reports are write-only from here;
//! reviewing them happens outside this service.

use std::sync::Arc;

use domains::{
    Clock, DomainError, IdeaId, Report, ReportReason, ReportStatus, Result, Viewer,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::common::retry::RetryPolicy;
use crate::Ports;

pub const MAX_REPORT_DESCRIPTION_LEN: usize = 1000;

pub struct ReportService {
    ports: Ports,
    clock: Arc<dyn Clock>,
    retry: RetryPolicy,
}

impl ReportService {
    pub fn new(ports: Ports, clock: Arc<dyn Clock>, retry: RetryPolicy) -> Self {
        Self { ports, clock, retry }
    }

    #[instrument(skip(self, viewer, description), fields(reason = reason.as_str()))]
    pub async fn report_idea(
        &self,
        viewer: Option<&Viewer>,
        idea_id: IdeaId,
        reason: ReportReason,
        description: Option<String>,
    ) -> Result<Report> {
        let viewer = viewer.ok_or(DomainError::Unauthenticated)?;

        let description = description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        if let Some(d) = &description {
            if d.chars().count() > MAX_REPORT_DESCRIPTION_LEN {
                return Err(DomainError::validation(format!(
                    "report description must be at most {MAX_REPORT_DESCRIPTION_LEN} characters"
                )));
            }
        }

        self.retry
            .run("find_idea", || self.ports.ideas.find_idea(idea_id))
            .await?
            .filter(|idea| idea.is_visible_to(Some(viewer.id)))
            .ok_or_else(|| DomainError::not_found("Idea", idea_id))?;

        let now = self.clock.now();
        let report = Report {
            id: Uuid::now_v7(),
            idea_id,
            user_id: viewer.id,
            reason,
            description,
            status: ReportStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        self.ports.reports.insert_report(report.clone()).await?;
        info!(report_id = %report.id, %idea_id, "idea reported");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{mock_ports, published_idea};
    use domains::{IdeaStatus, SystemClock};

    #[tokio::test]
    async fn test_report_is_stored_as_pending() {
        let idea = published_idea("Spammy");
        let id = idea.id;
        let mut mocks = mock_ports();
        mocks.ideas.expect_find_idea().returning(move |_| Ok(Some(idea.clone())));
        mocks.reports
            .expect_insert_report()
            .times(1)
            .withf(|r| r.status == ReportStatus::Pending && r.description.is_none())
            .returning(|_| Ok(()));
        let svc = ReportService::new(mocks.into_ports(), Arc::new(SystemClock), RetryPolicy::none());

        let viewer = Viewer::user(Uuid::now_v7());
        let report = svc
            .report_idea(Some(&viewer), id, ReportReason::Spam, Some("   ".into()))
            .await
            .unwrap();
        assert_eq!(report.user_id, viewer.id);
        assert_eq!(report.reason, ReportReason::Spam);
    }

    #[tokio::test]
    async fn test_report_on_missing_idea_is_not_found() {
        let mut mocks = mock_ports();
        mocks.ideas.expect_find_idea().returning(|_| Ok(None));
        mocks.reports.expect_insert_report().never();
        let svc = ReportService::new(mocks.into_ports(), Arc::new(SystemClock), RetryPolicy::none());

        let err = svc
            .report_idea(Some(&Viewer::user(Uuid::now_v7())), Uuid::now_v7(), ReportReason::Other, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound(..)));
    }

    #[tokio::test]
    async fn test_foreign_draft_cannot_be_reported() {
        let mut draft = published_idea("Unfinished");
        draft.status = IdeaStatus::Draft;
        let (id, author) = (draft.id, draft.user_id);
        let mut mocks = mock_ports();
        mocks.ideas.expect_find_idea().returning(move |_| Ok(Some(draft.clone())));
        mocks.reports.expect_insert_report().times(1).returning(|_| Ok(()));
        let svc = ReportService::new(mocks.into_ports(), Arc::new(SystemClock), RetryPolicy::none());

        let err = svc
            .report_idea(Some(&Viewer::user(Uuid::now_v7())), id, ReportReason::Spam, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound(..)));

        // the author still sees it, so the one allowed insert is theirs
        let report = svc
            .report_idea(Some(&Viewer::user(author)), id, ReportReason::Other, None)
            .await
            .unwrap();
        assert_eq!(report.user_id, author);
    }

    #[tokio::test]
    async fn test_overlong_description_is_rejected() {
        let svc = ReportService::new(mock_ports().into_ports(), Arc::new(SystemClock), RetryPolicy::none());
        let err = svc
            .report_idea(
                Some(&Viewer::user(Uuid::now_v7())),
                Uuid::now_v7(),
                ReportReason::Offensive,
                Some("x".repeat(MAX_REPORT_DESCRIPTION_LEN + 1)),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::ValidationFailed(_)));
    }
}
