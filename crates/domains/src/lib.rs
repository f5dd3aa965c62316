//! ideashare/crates/domains/src/lib.rs
//!
//! The central domain types and interface definitions for IdeaShare.

pub mod errors;
pub mod models;
pub mod ports;

// Re-exporting for easier access in other crates
pub use errors::*;
pub use models::*;
pub use ports::*;

#[cfg(test)]
mod tests {
    use super::models::*;
    use super::DomainError;
    use chrono::{Duration, Utc};
    use std::collections::BTreeSet;
    use uuid::Uuid;

    fn idea(title: &str, upvotes: u32, age_mins: i64) -> Idea {
        let now = Utc::now();
        Idea {
            id: Uuid::now_v7(),
            title: title.to_string(),
            short_description: "short".to_string(),
            full_description: "full".to_string(),
            difficulty: Difficulty::Beginner,
            upvotes,
            status: IdeaStatus::Published,
            user_id: Uuid::now_v7(),
            created_at: now - Duration::minutes(age_mins),
            updated_at: now,
        }
    }

    #[test]
    fn test_difficulty_parses_case_insensitively() {
        assert_eq!("beginner".parse::<Difficulty>().unwrap(), Difficulty::Beginner);
        assert_eq!("Advanced".parse::<Difficulty>().unwrap(), Difficulty::Advanced);
        assert!(matches!(
            "expert".parse::<Difficulty>(),
            Err(DomainError::ValidationFailed(_))
        ));
    }

    #[test]
    fn test_sort_order_round_trips_through_str() {
        for s in ["newest", "oldest", "most-upvoted", "title-asc", "title-desc"] {
            assert_eq!(s.parse::<SortOrder>().unwrap().as_str(), s);
        }
        let json = serde_json::to_string(&SortOrder::MostUpvoted).unwrap();
        assert_eq!(json, "\"most-upvoted\"");
    }

    #[test]
    fn test_sort_ties_break_on_id() {
        let mut a = idea("Same", 3, 0);
        a.id = Uuid::from_u128(1);
        let mut b = a.clone();
        b.id = Uuid::from_u128(2);
        for order in [SortOrder::MostUpvoted, SortOrder::TitleAsc, SortOrder::TitleDesc] {
            assert_eq!(order.compare(&a, &b), std::cmp::Ordering::Less);
        }
    }

    #[test]
    fn test_newest_puts_recent_first() {
        let old = idea("Old", 0, 60);
        let new = idea("New", 0, 1);
        assert_eq!(SortOrder::Newest.compare(&new, &old), std::cmp::Ordering::Less);
        assert_eq!(SortOrder::Oldest.compare(&old, &new), std::cmp::Ordering::Less);
    }

    #[test]
    fn test_query_rejects_page_zero() {
        let filter = IdeaFilter { page: 0, ..Default::default() };
        assert!(matches!(
            IdeaQuery::for_page(&filter, 6),
            Err(DomainError::ValidationFailed(_))
        ));
    }

    #[test]
    fn test_query_computes_range() {
        let filter = IdeaFilter { page: 3, ..Default::default() };
        let q = IdeaQuery::for_page(&filter, 6).unwrap();
        assert_eq!((q.offset, q.limit), (12, 6));
        assert_eq!(q.search, None);
    }

    #[test]
    fn test_search_matches_any_text_field_ignoring_case() {
        let filter = IdeaFilter { search: "  WEATHER ".into(), ..Default::default() };
        let q = IdeaQuery::for_page(&filter, 6).unwrap();
        assert!(q.matches_row(&idea("Build a Weather App", 0, 0)));

        let mut in_body = idea("Something", 0, 0);
        in_body.full_description = "uses a weather API".into();
        assert!(q.matches_row(&in_body));
        assert!(!q.matches_row(&idea("Todo list", 0, 0)));
    }

    #[test]
    fn test_drafts_never_match() {
        let q = IdeaQuery::for_page(&IdeaFilter::default(), 6).unwrap();
        let mut draft = idea("Draft", 0, 0);
        draft.status = IdeaStatus::Draft;
        assert!(!q.matches_row(&draft));
    }

    #[test]
    fn test_relation_filters_use_or_within_a_set() {
        let filter = IdeaFilter {
            tag_ids: BTreeSet::from([1, 2]),
            ..Default::default()
        };
        let q = IdeaQuery::for_page(&filter, 6).unwrap();
        assert!(q.matches_relations(&[2, 9], &[]));
        assert!(!q.matches_relations(&[3], &[]));

        let open = IdeaQuery::for_page(&IdeaFilter::default(), 6).unwrap();
        assert!(open.matches_relations(&[], &[]));
    }

    #[test]
    fn test_author_falls_back_to_unknown() {
        let id = Uuid::now_v7();
        let blank = UserProfile::new(id, Some("  ".into()), Utc::now());
        assert_eq!(AuthorSummary::from_profile(id, Some(&blank)).name, UNKNOWN_AUTHOR);
        assert_eq!(AuthorSummary::from_profile(id, None).name, UNKNOWN_AUTHOR);
    }
}
