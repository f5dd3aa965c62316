//! Tags and tech-stack names served through the reference cache.

use std::sync::Arc;
use std::time::Duration;

use domains::{Clock, Result, Tag, TagRepository, TechStackRepository};

use crate::common::cache::ReferenceCache;
use crate::common::retry::RetryPolicy;

/// Default staleness window for tags and tech stacks.
pub const REFERENCE_TTL: Duration = Duration::from_secs(5 * 60);

pub struct ReferenceDataService {
    tags: Arc<dyn TagRepository>,
    tech_stacks: Arc<dyn TechStackRepository>,
    retry: RetryPolicy,
    tag_cache: ReferenceCache<Vec<Tag>>,
    tech_cache: ReferenceCache<Vec<String>>,
}

impl ReferenceDataService {
    pub fn new(
        tags: Arc<dyn TagRepository>,
        tech_stacks: Arc<dyn TechStackRepository>,
        retry: RetryPolicy,
        ttl: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            tags,
            tech_stacks,
            retry,
            tag_cache: ReferenceCache::new("tags", ttl, clock.clone()),
            tech_cache: ReferenceCache::new("tech_stacks", ttl, clock),
        }
    }

    /// All tags, ordered by name.
    pub async fn tags(&self) -> Result<Vec<Tag>> {
        self.tag_cache
            .get_or_refresh(|| self.retry.run("list_tags", || self.tags.list_tags()))
            .await
    }

    /// All tech-stack names, ordered by name.
    pub async fn tech_stack_names(&self) -> Result<Vec<String>> {
        self.tech_cache
            .get_or_refresh(|| async {
                let items = self
                    .retry
                    .run("list_tech_stacks", || self.tech_stacks.list_tech_stacks())
                    .await?;
                Ok(items.into_iter().map(|t| t.name).collect())
            })
            .await
    }

    /// Called after a submission created new tech-stack items.
    pub async fn invalidate_tech_stacks(&self) {
        self.tech_cache.invalidate().await;
    }

    pub async fn invalidate_all(&self) {
        self.tag_cache.invalidate().await;
        self.tech_cache.invalidate().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::{DomainError, MockTagRepository, MockTechStackRepository, SystemClock, TechStackItem};

    fn service(tags: MockTagRepository, tech: MockTechStackRepository) -> ReferenceDataService {
        ReferenceDataService::new(
            Arc::new(tags),
            Arc::new(tech),
            RetryPolicy::immediate(3),
            REFERENCE_TTL,
            Arc::new(SystemClock),
        )
    }

    #[tokio::test]
    async fn test_tags_are_fetched_once_within_window() {
        let mut tags = MockTagRepository::new();
        tags.expect_list_tags().times(1).returning(|| {
            Ok(vec![Tag { id: 1, name: "Web".into(), color: "#3b82f6".into() }])
        });
        let svc = service(tags, MockTechStackRepository::new());

        assert_eq!(svc.tags().await.unwrap().len(), 1);
        assert_eq!(svc.tags().await.unwrap()[0].name, "Web");
    }

    #[tokio::test]
    async fn test_tech_names_retry_transient_failures() {
        let mut tech = MockTechStackRepository::new();
        let mut seq = mockall::Sequence::new();
        tech.expect_list_tech_stacks()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Err(DomainError::TransientStore("reset".into())));
        tech.expect_list_tech_stacks()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(vec![TechStackItem { id: 1, name: "React".into() }]));
        let svc = service(MockTagRepository::new(), tech);

        assert_eq!(svc.tech_stack_names().await.unwrap(), vec!["React"]);
    }

    #[tokio::test]
    async fn test_invalidate_refetches_tech_names() {
        let mut tech = MockTechStackRepository::new();
        tech.expect_list_tech_stacks().times(2).returning(|| Ok(vec![]));
        let svc = service(MockTagRepository::new(), tech);

        svc.tech_stack_names().await.unwrap();
        svc.invalidate_tech_stacks().await;
        svc.tech_stack_names().await.unwrap();
    }
}
